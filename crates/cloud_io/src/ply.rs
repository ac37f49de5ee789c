//! PLY reading (any encoding, via ply-rs) and writing (hand-rolled, double precision).

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Ply, Property};

use crate::{CloudData, CloudError, CloudResult, PointCloud};

/// Payload encoding used by [`write_ply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlyEncoding {
    #[default]
    BinaryLittleEndian,
    Ascii,
}

impl PlyEncoding {
    fn header_name(self) -> &'static str {
        match self {
            PlyEncoding::BinaryLittleEndian => "binary_little_endian",
            PlyEncoding::Ascii => "ascii",
        }
    }
}

/// Fast path: prefer mmap; fall back to a buffered read.
#[cfg(feature = "mmap")]
pub fn read_ply<P: AsRef<Path>>(path: P) -> CloudResult<CloudData> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CloudError::opening(path, e))?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    let mut bytes: &[u8] = &map;
    parse_ply(&mut bytes)
}

#[cfg(not(feature = "mmap"))]
pub fn read_ply<P: AsRef<Path>>(path: P) -> CloudResult<CloudData> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CloudError::opening(path, e))?;
    let mut reader = std::io::BufReader::new(file);
    parse_ply(&mut reader)
}

/// Parse a whole PLY stream. Colors and normals are reported only when the
/// vertex element declares them.
pub fn parse_ply<R: Read>(reader: &mut R) -> CloudResult<CloudData> {
    let parser = Parser::<DefaultElement>::new();
    let ply: Ply<DefaultElement> = parser
        .read_ply(reader)
        .map_err(|e| CloudError::parse(format!("failed to read PLY: {e}")))?;

    let declares = |name: &str| {
        ply.header
            .elements
            .get("vertex")
            .map_or(false, |def| def.properties.contains_key(name))
    };
    let has_normals = declares("nx") && declares("ny") && declares("nz");
    let has_colors = declares("red") && declares("green") && declares("blue");

    let empty = Vec::new();
    let vertices = ply.payload.get("vertex").unwrap_or(&empty);

    let mut positions = Vec::with_capacity(vertices.len());
    let mut normals = Vec::with_capacity(if has_normals { vertices.len() } else { 0 });
    let mut colors = Vec::with_capacity(if has_colors { vertices.len() } else { 0 });

    for (index, element) in vertices.iter().enumerate() {
        let coord = |key: &str| {
            scalar(element, key)
                .ok_or_else(|| CloudError::parse(format!("vertex {index} lacks numeric `{key}`")))
        };
        positions.push([coord("x")?, coord("y")?, coord("z")?]);

        if has_normals {
            normals.push([coord("nx")?, coord("ny")?, coord("nz")?]);
        }

        if has_colors {
            let chan = |key: &str| {
                channel(element, key).ok_or_else(|| {
                    CloudError::parse(format!("vertex {index} lacks numeric `{key}`"))
                })
            };
            colors.push([chan("red")?, chan("green")?, chan("blue")?]);
        }
    }

    let faces = ply.payload.get("face").map(|elements| {
        elements
            .iter()
            .map(index_list)
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
    });

    Ok(CloudData {
        cloud: PointCloud {
            positions,
            colors: has_colors.then_some(colors),
            normals: has_normals.then_some(normals),
        },
        faces: faces.filter(|f| !f.is_empty()),
    })
}

fn scalar(element: &DefaultElement, key: &str) -> Option<f64> {
    let value = match element.get(key)? {
        Property::Char(v) => f64::from(*v),
        Property::UChar(v) => f64::from(*v),
        Property::Short(v) => f64::from(*v),
        Property::UShort(v) => f64::from(*v),
        Property::Int(v) => f64::from(*v),
        Property::UInt(v) => f64::from(*v),
        Property::Float(v) => f64::from(*v),
        Property::Double(v) => *v,
        _ => return None,
    };
    Some(value)
}

/// Color channel; float channels are taken as normalized [0, 1].
fn channel(element: &DefaultElement, key: &str) -> Option<u8> {
    match element.get(key)? {
        Property::UChar(v) => Some(*v),
        Property::Float(v) => Some((v.clamp(0.0, 1.0) * 255.0).round() as u8),
        Property::Double(v) => Some((v.clamp(0.0, 1.0) * 255.0).round() as u8),
        _ => scalar(element, key).map(|v| v.clamp(0.0, 255.0) as u8),
    }
}

fn index_list(element: &DefaultElement) -> Vec<u32> {
    for key in ["vertex_indices", "vertex_index"] {
        if let Some(prop) = element.get(key) {
            return match prop {
                Property::ListInt(v) => v.iter().map(|&i| i as u32).collect(),
                Property::ListUInt(v) => v.clone(),
                Property::ListUChar(v) => v.iter().map(|&i| u32::from(i)).collect(),
                Property::ListChar(v) => v.iter().map(|&i| i as u32).collect(),
                Property::ListShort(v) => v.iter().map(|&i| i as u32).collect(),
                Property::ListUShort(v) => v.iter().map(|&i| u32::from(i)).collect(),
                _ => continue,
            };
        }
    }
    Vec::new()
}

pub fn write_ply<P: AsRef<Path>>(
    path: P,
    cloud: &PointCloud,
    encoding: PlyEncoding,
) -> CloudResult<()> {
    cloud.validate()?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_ply_to(&mut writer, cloud, encoding)?;
    writer.flush()?;

    Ok(())
}

/// Serialize `cloud` into any writer.
pub fn write_ply_to<W: Write>(
    w: &mut W,
    cloud: &PointCloud,
    encoding: PlyEncoding,
) -> CloudResult<()> {
    cloud.validate()?;

    writeln!(w, "ply")?;
    writeln!(w, "format {} 1.0", encoding.header_name())?;
    writeln!(w, "comment generated by surfgen cloud_io")?;
    writeln!(w, "element vertex {}", cloud.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(w, "property double {axis}")?;
    }
    if cloud.has_normals() {
        for axis in ["nx", "ny", "nz"] {
            writeln!(w, "property double {axis}")?;
        }
    }
    if cloud.has_colors() {
        for chan in ["red", "green", "blue"] {
            writeln!(w, "property uchar {chan}")?;
        }
    }
    writeln!(w, "end_header")?;

    match encoding {
        PlyEncoding::BinaryLittleEndian => write_binary_records(w, cloud)?,
        PlyEncoding::Ascii => write_ascii_records(w, cloud)?,
    }

    Ok(())
}

fn write_binary_records<W: Write>(w: &mut W, cloud: &PointCloud) -> std::io::Result<()> {
    // Positions only: the record block is the position array itself.
    if cfg!(target_endian = "little") && !cloud.has_normals() && !cloud.has_colors() {
        return w.write_all(bytemuck::cast_slice(&cloud.positions));
    }

    for (index, p) in cloud.positions.iter().enumerate() {
        write_f64x3(w, p)?;

        if let Some(normals) = &cloud.normals {
            write_f64x3(w, &normals[index])?;
        }

        if let Some(colors) = &cloud.colors {
            w.write_all(&colors[index])?;
        }
    }

    Ok(())
}

fn write_ascii_records<W: Write>(w: &mut W, cloud: &PointCloud) -> std::io::Result<()> {
    for (index, p) in cloud.positions.iter().enumerate() {
        write!(w, "{} {} {}", p[0], p[1], p[2])?;

        if let Some(normals) = &cloud.normals {
            let n = normals[index];
            write!(w, " {} {} {}", n[0], n[1], n[2])?;
        }

        if let Some(colors) = &cloud.colors {
            let c = colors[index];
            write!(w, " {} {} {}", c[0], c[1], c[2])?;
        }

        writeln!(w)?;
    }

    Ok(())
}

#[inline]
fn write_f64x3<W: Write>(w: &mut W, v: &[f64; 3]) -> std::io::Result<()> {
    w.write_all(&v[0].to_le_bytes())?;
    w.write_all(&v[1].to_le_bytes())?;
    w.write_all(&v[2].to_le_bytes())
}
