use downsampler_core::PointCloud;
use std::fs;
use std::io;
use std::path::Path;

/// Reads a PCD file (ASCII or binary).
///
/// `x`, `y` and `z` are required; `intensity` is optional and defaults to
/// zero. Numeric fields may be float (`F`, 4 or 8 bytes) or integer (`I`/`U`,
/// 1, 2, 4 or 8 bytes). Any other fields are skipped.
pub fn read_pcd(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let raw = fs::read(path)?;
    parse_pcd(&raw)
}

/// Parses PCD content already held in memory.
pub fn parse_pcd(raw: &[u8]) -> io::Result<PointCloud> {
    let data_offset = find_data_line_end(raw).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "PCD file missing DATA line")
    })?;
    let header_str = std::str::from_utf8(&raw[..data_offset]).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "PCD header is not valid UTF-8")
    })?;
    let header = PcdHeader::parse(header_str)?;
    let layout = header.layout()?;

    match header.data {
        DataFormat::Ascii => read_pcd_ascii(&raw[data_offset..], &header, &layout),
        DataFormat::Binary => read_pcd_binary(&raw[data_offset..], &header, &layout),
    }
}

/// Writes a PCD file in ASCII format with `x y z intensity` as doubles.
pub fn write_pcd(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let mut out = header_text(cloud.len(), "ascii");
    for p in cloud.iter_points() {
        out.push_str(&format!("{} {} {} {}\n", p.x, p.y, p.z, p.intensity));
    }
    fs::write(path, out)
}

/// Writes a PCD file in binary format with `x y z intensity` as
/// little-endian doubles.
pub fn write_pcd_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let header = header_text(cloud.len(), "binary");
    let header_bytes = header.as_bytes();
    let point_size = 4 * 8;
    let mut buf = Vec::with_capacity(header_bytes.len() + cloud.len() * point_size);
    buf.extend_from_slice(header_bytes);

    for p in cloud.iter_points() {
        buf.extend_from_slice(&p.x.to_le_bytes());
        buf.extend_from_slice(&p.y.to_le_bytes());
        buf.extend_from_slice(&p.z.to_le_bytes());
        buf.extend_from_slice(&p.intensity.to_le_bytes());
    }

    fs::write(path, buf)
}

fn header_text(num_points: usize, data: &str) -> String {
    let mut out = String::new();
    out.push_str("# .PCD v0.7 - Point Cloud Data file format\n");
    out.push_str("VERSION 0.7\n");
    out.push_str("FIELDS x y z intensity\n");
    out.push_str("SIZE 8 8 8 8\n");
    out.push_str("TYPE F F F F\n");
    out.push_str("COUNT 1 1 1 1\n");
    out.push_str(&format!("WIDTH {}\n", num_points));
    out.push_str("HEIGHT 1\n");
    out.push_str("VIEWPOINT 0 0 0 1 0 0 0\n");
    out.push_str(&format!("POINTS {}\n", num_points));
    out.push_str(&format!("DATA {}\n", data));
    out
}

// --- Internal helpers ---

#[derive(Debug, PartialEq)]
enum DataFormat {
    Ascii,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScalarKind {
    Float,
    Signed,
    Unsigned,
}

#[derive(Debug)]
struct PcdHeader {
    fields: Vec<String>,
    sizes: Vec<usize>,
    kinds: Vec<ScalarKind>,
    counts: Vec<usize>,
    points: usize,
    data: DataFormat,
}

/// Where one field lives inside a point record.
#[derive(Debug, Clone, Copy)]
struct FieldSlot {
    /// Byte offset in a binary record.
    byte_offset: usize,
    /// Token index in an ASCII line.
    token: usize,
    size: usize,
    kind: ScalarKind,
}

#[derive(Debug)]
struct PointLayout {
    x: FieldSlot,
    y: FieldSlot,
    z: FieldSlot,
    intensity: Option<FieldSlot>,
    record_size: usize,
}

impl PcdHeader {
    fn parse(header: &str) -> io::Result<Self> {
        let mut fields = Vec::new();
        let mut sizes = Vec::new();
        let mut kinds = Vec::new();
        let mut counts = Vec::new();
        let mut points = None;
        let mut width = None;
        let mut height = None;
        let mut data = None;

        for line in header.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let Some((&key, values)) = parts.split_first() else {
                continue;
            };
            match key {
                "FIELDS" => fields = values.iter().map(|s| s.to_string()).collect(),
                "SIZE" => sizes = parse_numbers(key, values)?,
                "COUNT" => counts = parse_numbers(key, values)?,
                "TYPE" => {
                    kinds = values
                        .iter()
                        .map(|t| match *t {
                            "F" => Ok(ScalarKind::Float),
                            "I" => Ok(ScalarKind::Signed),
                            "U" => Ok(ScalarKind::Unsigned),
                            other => Err(invalid(format!("unsupported PCD TYPE: {}", other))),
                        })
                        .collect::<io::Result<_>>()?;
                }
                "POINTS" => points = parse_numbers(key, values)?.first().copied(),
                "WIDTH" => width = parse_numbers(key, values)?.first().copied(),
                "HEIGHT" => height = parse_numbers(key, values)?.first().copied(),
                "DATA" => {
                    data = Some(match values.first().copied() {
                        Some("ascii") => DataFormat::Ascii,
                        Some("binary") => DataFormat::Binary,
                        other => {
                            return Err(io::Error::new(
                                io::ErrorKind::Unsupported,
                                format!("unsupported PCD DATA format: {}", other.unwrap_or("")),
                            ))
                        }
                    });
                }
                _ => {}
            }
        }

        if fields.is_empty() {
            fields = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        }
        let n = fields.len();
        if sizes.is_empty() {
            sizes = vec![4; n];
        }
        if kinds.is_empty() {
            kinds = vec![ScalarKind::Float; n];
        }
        if counts.is_empty() {
            counts = vec![1; n];
        }
        if sizes.len() != n || kinds.len() != n || counts.len() != n {
            return Err(invalid(format!(
                "PCD header declares {} fields but {} sizes, {} types, {} counts",
                n,
                sizes.len(),
                kinds.len(),
                counts.len()
            )));
        }

        let points = match (points, width) {
            (Some(points), _) => points,
            (None, Some(w)) => w.checked_mul(height.unwrap_or(1)).ok_or_else(|| {
                invalid("PCD WIDTH x HEIGHT overflows the point count".to_string())
            })?,
            (None, None) => {
                return Err(invalid("PCD file missing POINTS/WIDTH header".to_string()))
            }
        };
        let data = data.ok_or_else(|| invalid("PCD file missing DATA line".to_string()))?;

        Ok(Self {
            fields,
            sizes,
            kinds,
            counts,
            points,
            data,
        })
    }

    fn layout(&self) -> io::Result<PointLayout> {
        let mut slots = Vec::with_capacity(self.fields.len());
        let mut byte_offset = 0;
        let mut token = 0;
        for i in 0..self.fields.len() {
            let size = self.sizes[i];
            let kind = self.kinds[i];
            let valid = match kind {
                ScalarKind::Float => size == 4 || size == 8,
                _ => matches!(size, 1 | 2 | 4 | 8),
            };
            if !valid {
                return Err(invalid(format!(
                    "unsupported size {} for field {}",
                    size, self.fields[i]
                )));
            }
            let count = self.counts[i];
            if count == 0 {
                return Err(invalid(format!("zero COUNT for field {}", self.fields[i])));
            }
            slots.push(FieldSlot {
                byte_offset,
                token,
                size,
                kind,
            });
            byte_offset = size
                .checked_mul(count)
                .and_then(|bytes| byte_offset.checked_add(bytes))
                .ok_or_else(|| invalid("PCD record size overflows".to_string()))?;
            token += count;
        }

        let find = |name: &str| self.fields.iter().position(|f| f == name).map(|i| slots[i]);
        match (find("x"), find("y"), find("z")) {
            (Some(x), Some(y), Some(z)) => Ok(PointLayout {
                x,
                y,
                z,
                intensity: find("intensity"),
                record_size: byte_offset,
            }),
            _ => Err(invalid("PCD file missing x, y, z fields".to_string())),
        }
    }
}

fn parse_numbers(key: &str, values: &[&str]) -> io::Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            v.parse::<usize>()
                .map_err(|e| invalid(format!("invalid {} value {}: {}", key, v, e)))
        })
        .collect()
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Finds the byte offset just past the newline ending the DATA line.
fn find_data_line_end(raw: &[u8]) -> Option<usize> {
    let data_marker = b"DATA";
    for i in 0..raw.len().saturating_sub(data_marker.len() - 1) {
        if (i == 0 || raw[i - 1] == b'\n') && raw[i..].starts_with(data_marker) {
            if let Some(offset) = raw[i..].iter().position(|&b| b == b'\n') {
                return Some(i + offset + 1);
            }
            return Some(raw.len());
        }
    }
    None
}

fn read_pcd_ascii(body: &[u8], header: &PcdHeader, layout: &PointLayout) -> io::Result<PointCloud> {
    let content = std::str::from_utf8(body)
        .map_err(|e| invalid(format!("invalid UTF-8: {}", e)))?;

    // POINTS is untrusted; the shortest data line `0 0 0\n` is 6 bytes.
    let mut cloud = PointCloud::with_capacity(header.points.min(body.len() / 6));
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let value = |slot: FieldSlot| -> io::Result<f64> {
            let tok = parts
                .get(slot.token)
                .ok_or_else(|| invalid(format!("short PCD data line: {:?}", line)))?;
            tok.parse::<f64>()
                .map_err(|e| invalid(format!("invalid PCD value {:?}: {}", tok, e)))
        };

        cloud.x.push(value(layout.x)?);
        cloud.y.push(value(layout.y)?);
        cloud.z.push(value(layout.z)?);
        cloud.intensity.push(match layout.intensity {
            Some(slot) => value(slot)?,
            None => 0.0,
        });
    }

    Ok(cloud)
}

fn read_pcd_binary(body: &[u8], header: &PcdHeader, layout: &PointLayout) -> io::Result<PointCloud> {
    if layout.record_size == 0 {
        return Err(invalid("PCD record size is zero".to_string()));
    }
    let expected_size = header.points.checked_mul(layout.record_size).ok_or_else(|| {
        invalid(format!(
            "binary PCD size overflows: {} points x {} bytes",
            header.points, layout.record_size
        ))
    })?;
    if body.len() < expected_size {
        return Err(invalid(format!(
            "binary PCD data too short: have {} bytes, expected {} ({} points x {} bytes)",
            body.len(),
            expected_size,
            header.points,
            layout.record_size
        )));
    }

    let mut cloud = PointCloud::with_capacity(header.points);
    for record in body.chunks_exact(layout.record_size).take(header.points) {
        cloud.x.push(read_scalar(record, layout.x));
        cloud.y.push(read_scalar(record, layout.y));
        cloud.z.push(read_scalar(record, layout.z));
        cloud
            .intensity
            .push(layout.intensity.map_or(0.0, |slot| read_scalar(record, slot)));
    }

    Ok(cloud)
}

fn read_scalar(record: &[u8], slot: FieldSlot) -> f64 {
    let bytes = &record[slot.byte_offset..slot.byte_offset + slot.size];
    let mut buf = [0u8; 8];
    buf[..slot.size].copy_from_slice(bytes);
    match (slot.kind, slot.size) {
        (ScalarKind::Float, 4) => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        (ScalarKind::Float, _) => f64::from_le_bytes(buf),
        (ScalarKind::Unsigned, _) => u64::from_le_bytes(buf) as f64,
        (ScalarKind::Signed, size) => {
            // sign-extend from the field width
            let shift = 64 - 8 * size as u32;
            ((i64::from_le_bytes(buf) << shift) >> shift) as f64
        }
    }
}
