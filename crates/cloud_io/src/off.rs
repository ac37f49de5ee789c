//! OFF (Object File Format) mesh parsing.
//!
//! Accepted header shapes:
//!   OFF            OFF V F E        V F E
//!   V F E          <vertices...>    <vertices...>
//!   <vertices...>
//!
//! Vertex lines use their first three numbers; face lines are `k i0 .. ik-1`.
//! Blank lines and `#` comments are skipped anywhere.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{CloudError, CloudResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffMesh {
    pub positions: Vec<[f64; 3]>,
    pub faces: Vec<Vec<u32>>,
}

pub fn read_off<P: AsRef<Path>>(path: P) -> CloudResult<OffMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CloudError::opening(path, e))?;
    parse_off(BufReader::new(file))
}

/// Yields significant lines: comments stripped, blanks dropped.
struct Records<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> Records<R> {
    fn next_record(&mut self) -> CloudResult<Option<String>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line?;
            let body = line.split('#').next().unwrap_or("").trim();
            if !body.is_empty() {
                return Ok(Some(body.to_string()));
            }
        }
        Ok(None)
    }

    fn require(&mut self, what: &str) -> CloudResult<String> {
        self.next_record()?
            .ok_or_else(|| CloudError::parse(format!("unexpected end of OFF data, expected {what}")))
    }
}

pub fn parse_off<R: BufRead>(reader: R) -> CloudResult<OffMesh> {
    let mut records = Records {
        lines: reader.lines(),
        line_no: 0,
    };

    let first = records.require("OFF header")?;
    let counts_line = match first.strip_prefix("OFF") {
        Some(rest) if rest.trim().is_empty() => records.require("vertex/face counts")?,
        Some(rest) => rest.trim().to_string(),
        None => first,
    };

    let mut counts = counts_line.split_whitespace();
    let num_vertices: usize = counts
        .next()
        .ok_or_else(|| CloudError::parse("missing vertex count"))?
        .parse()
        .map_err(|_| CloudError::parse(format!("bad vertex count in `{counts_line}`")))?;
    let num_faces: usize = match counts.next() {
        Some(tok) => tok
            .parse()
            .map_err(|_| CloudError::parse(format!("bad face count in `{counts_line}`")))?,
        None => 0,
    };

    let mut positions = Vec::with_capacity(num_vertices);
    for _ in 0..num_vertices {
        let line = records.require("vertex line")?;
        let coords: Vec<f64> = line
            .split_whitespace()
            .take(3)
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| {
                CloudError::parse(format!("bad vertex on line {}: `{line}`", records.line_no))
            })?;

        match coords.as_slice() {
            &[x, y, z] => positions.push([x, y, z]),
            _ => {
                return Err(CloudError::parse(format!(
                    "vertex on line {} has fewer than 3 coordinates",
                    records.line_no
                )))
            }
        }
    }

    let mut faces = Vec::with_capacity(num_faces);
    for _ in 0..num_faces {
        let line = records.require("face line")?;
        let mut tokens = line.split_whitespace();
        let arity: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| CloudError::parse(format!("bad face on line {}", records.line_no)))?;

        // Trailing per-face color values after the indices are ignored.
        let indices: Vec<u32> = tokens
            .take(arity)
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| CloudError::parse(format!("bad face index on line {}", records.line_no)))?;

        if indices.len() != arity {
            return Err(CloudError::parse(format!(
                "face on line {} lists {} of {arity} indices",
                records.line_no,
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= num_vertices) {
            return Err(CloudError::parse(format!(
                "face on line {} references vertex {bad} of {num_vertices}",
                records.line_no
            )));
        }

        faces.push(indices);
    }

    Ok(OffMesh { positions, faces })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_BODY: &str = "0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n3 0 1 2\n";

    #[test]
    fn header_on_separate_line() {
        let text = format!("OFF\n4 2 0\n{SQUARE_BODY}");
        let mesh = parse_off(text.as_bytes()).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2, 3], vec![0, 1, 2]]);
    }

    #[test]
    fn header_and_counts_on_one_line() {
        let text = format!("OFF 4 2 0\n{SQUARE_BODY}");
        let mesh = parse_off(text.as_bytes()).unwrap();
        assert_eq!(mesh.positions[2], [1.0, 1.0, 0.0]);
        assert_eq!(mesh.faces.len(), 2);
    }

    #[test]
    fn counts_without_keyword_and_comments() {
        let text = format!("# exported\n4 2 0\n\n{SQUARE_BODY}");
        let mesh = parse_off(text.as_bytes()).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.faces.len(), 2);
    }

    #[test]
    fn vertices_only() {
        let mesh = parse_off("OFF\n2\n0 0 0\n1 2 3 0.5\n".as_bytes()).unwrap();
        assert_eq!(mesh.positions, vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]);
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn truncated_and_bad_indices_fail() {
        assert!(parse_off("OFF\n3 0 0\n0 0 0\n".as_bytes()).is_err());
        assert!(parse_off("OFF\n1 1 0\n0 0 0\n3 0 1 2\n".as_bytes()).is_err());
        assert!(parse_off("".as_bytes()).is_err());
    }
}
