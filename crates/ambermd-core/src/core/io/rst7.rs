use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

const FIELD_WIDTH: usize = 12;
const NETCDF_MAGIC: &[u8; 3] = b"CDF";

#[derive(Debug, Error)]
pub enum CoordinateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Binary (NetCDF) restart files cannot be read as ASCII coordinates")]
    Binary,
}

/// An ASCII Amber restart/inpcrd file.
#[derive(Debug, Clone, PartialEq)]
pub struct AmberCoordinates {
    pub title: String,
    pub time: Option<f64>,
    pub positions: Vec<Point3<f64>>,
    pub velocities: Option<Vec<Point3<f64>>>,
    /// Box lengths followed by angles, when the system is periodic.
    pub box_dimensions: Option<[f64; 6]>,
}

impl AmberCoordinates {
    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether the file at `path` starts with the NetCDF signature.
    pub fn is_netcdf<P: AsRef<Path>>(path: P) -> Result<bool, CoordinateError> {
        let mut magic = [0u8; 3];
        let mut file = File::open(path)?;
        match file.read_exact(&mut magic) {
            Ok(()) => Ok(&magic == NETCDF_MAGIC),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CoordinateError> {
        let path = path.as_ref();
        if Self::is_netcdf(path)? {
            return Err(CoordinateError::Binary);
        }
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }

    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, CoordinateError> {
        let mut lines = reader.lines();

        let title = lines
            .next()
            .transpose()?
            .ok_or_else(|| parse_error(1, "file is empty"))?
            .trim_end()
            .to_string();

        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| parse_error(2, "missing atom count line"))?;
        let mut header_fields = header.split_whitespace();
        let natom: usize = header_fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| parse_error(2, "invalid atom count"))?;
        let time = header_fields.next().and_then(|s| s.parse().ok());

        // Positions and velocities plus the box must stay addressable.
        let coordinate_len = natom
            .checked_mul(6)
            .and_then(|n| n.checked_add(6))
            .map(|_| natom * 3)
            .ok_or_else(|| parse_error(2, format!("atom count {} is out of range", natom)))?;

        let mut values: Vec<f64> = Vec::new();
        for (offset, line_res) in lines.enumerate() {
            let line = line_res?;
            let line_num = offset + 3;
            let chars: Vec<char> = line.trim_end().chars().collect();
            for chunk in chars.chunks(FIELD_WIDTH) {
                let field: String = chunk.iter().collect();
                let field = field.trim();
                if field.is_empty() {
                    continue;
                }
                let value = field.parse().map_err(|_| {
                    parse_error(line_num, format!("invalid coordinate value '{}'", field))
                })?;
                values.push(value);
            }
        }

        let (positions, velocities, box_dimensions) = match values.len() {
            n if n == coordinate_len => (&values[..], None, None),
            n if n == coordinate_len + 6 => (
                &values[..coordinate_len],
                None,
                Some(&values[coordinate_len..]),
            ),
            n if n == coordinate_len * 2 => (
                &values[..coordinate_len],
                Some(&values[coordinate_len..]),
                None,
            ),
            n if n == coordinate_len * 2 + 6 => (
                &values[..coordinate_len],
                Some(&values[coordinate_len..coordinate_len * 2]),
                Some(&values[coordinate_len * 2..]),
            ),
            n => {
                return Err(parse_error(
                    3,
                    format!(
                        "expected coordinates for {} atoms but found {} values",
                        natom, n
                    ),
                ));
            }
        };

        let box_dimensions = box_dimensions.map(|b| [b[0], b[1], b[2], b[3], b[4], b[5]]);

        Ok(Self {
            title,
            time,
            positions: to_points(positions),
            velocities: velocities.map(to_points),
            box_dimensions,
        })
    }
}

fn to_points(values: &[f64]) -> Vec<Point3<f64>> {
    values
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect()
}

fn parse_error(line: usize, message: impl Into<String>) -> CoordinateError {
    CoordinateError::Parse {
        line,
        message: message.into(),
    }
}

/// Renders an ASCII restart file, for tests that need coordinates on disk.
#[cfg(test)]
pub(crate) fn render_rst7(natom: usize, with_box: bool) -> String {
    let mut out = format!("test\n{:>6}\n", natom);
    let mut values: Vec<f64> = (0..natom * 3).map(|i| i as f64 * 0.5).collect();
    if with_box {
        values.extend([30.0, 30.0, 30.0, 90.0, 90.0, 90.0]);
    }
    for chunk in values.chunks(6) {
        for value in chunk {
            out.push_str(&format!("{:>12.7}", value));
        }
        out.push('\n');
    }
    out
}
