//! ASCII PCD (Point Cloud Library) reading.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{CloudError, CloudResult, PointCloud};

pub fn read_pcd<P: AsRef<Path>>(path: P) -> CloudResult<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CloudError::opening(path, e))?;
    parse_pcd(BufReader::new(file))
}

/// Parse an ASCII PCD stream. Recognised fields: `x y z`, `normal_x normal_y
/// normal_z`, and a packed `rgb`/`rgba`. Other fields are skipped.
pub fn parse_pcd<R: BufRead>(reader: R) -> CloudResult<PointCloud> {
    let mut lines = reader.lines();
    let mut fields: Vec<String> = Vec::new();
    let mut types: Vec<String> = Vec::new();
    let mut declared_points: Option<usize> = None;

    loop {
        let line = lines
            .next()
            .ok_or_else(|| CloudError::parse("PCD header ended before DATA"))??;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default().to_ascii_uppercase();
        match key.as_str() {
            "FIELDS" => fields = tokens.map(str::to_string).collect(),
            "TYPE" => types = tokens.map(str::to_string).collect(),
            "POINTS" => {
                declared_points = tokens.next().and_then(|t| t.parse().ok());
            }
            "DATA" => {
                let mode = tokens.next().unwrap_or_default();
                if !mode.eq_ignore_ascii_case("ascii") {
                    return Err(CloudError::UnsupportedFormat {
                        extension: format!("pcd ({mode})"),
                    });
                }
                break;
            }
            _ => {}
        }
    }

    let column = |name: &str| fields.iter().position(|f| f == name);
    let (ix, iy, iz) = match (column("x"), column("y"), column("z")) {
        (Some(x), Some(y), Some(z)) => (x, y, z),
        _ => return Err(CloudError::shape("PCD has no x/y/z fields")),
    };
    let normal_cols = match (column("normal_x"), column("normal_y"), column("normal_z")) {
        (Some(a), Some(b), Some(c)) => Some([a, b, c]),
        _ => None,
    };
    let rgb_col = column("rgb").or_else(|| column("rgba"));
    let rgb_is_float = rgb_col
        .and_then(|c| types.get(c))
        .map_or(true, |t| t.eq_ignore_ascii_case("F"));

    let mut positions = Vec::with_capacity(declared_points.unwrap_or(0));
    let mut normals = Vec::new();
    let mut colors = Vec::new();

    for line in lines {
        let line = line?;
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.is_empty() {
            continue;
        }
        if values.len() < fields.len() {
            return Err(CloudError::parse(format!(
                "PCD record has {} values for {} fields",
                values.len(),
                fields.len()
            )));
        }

        let num = |col: usize| -> CloudResult<f64> {
            values[col]
                .parse::<f64>()
                .map_err(|_| CloudError::parse(format!("bad PCD value `{}`", values[col])))
        };

        positions.push([num(ix)?, num(iy)?, num(iz)?]);

        if let Some([a, b, c]) = normal_cols {
            normals.push([num(a)?, num(b)?, num(c)?]);
        }

        if let Some(col) = rgb_col {
            let packed = if rgb_is_float {
                values[col]
                    .parse::<f32>()
                    .map_err(|_| CloudError::parse(format!("bad PCD rgb `{}`", values[col])))?
                    .to_bits()
            } else {
                num(col)? as u32
            };
            colors.push([(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]);
        }
    }

    if let Some(n) = declared_points {
        if n != positions.len() {
            log::warn!("PCD header declares {n} points, read {}", positions.len());
        }
    }

    Ok(PointCloud {
        colors: rgb_col.map(|_| colors),
        normals: normal_cols.map(|_| normals),
        positions,
    })
}
