use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

const POINTER_NATOM: usize = 0;
const POINTER_NRES: usize = 11;

#[derive(Debug, Error)]
pub enum Parm7Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Missing required section %FLAG {0}")]
    MissingSection(&'static str),
    #[error("Inconsistent topology: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Integer,
    Text,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldFormat {
    kind: FieldKind,
    width: usize,
}

impl FieldFormat {
    // Accepts Fortran edit descriptors such as `10I8`, `20a4` or `5E16.8`.
    fn parse(descriptor: &str) -> Option<Self> {
        let descriptor = descriptor.trim();
        let letter_pos = descriptor.find(|c: char| c.is_ascii_alphabetic())?;
        let kind = match descriptor[letter_pos..].chars().next()?.to_ascii_uppercase() {
            'I' => FieldKind::Integer,
            'A' => FieldKind::Text,
            'E' | 'F' | 'D' | 'G' => FieldKind::Real,
            _ => return None,
        };
        let width_str: String = descriptor[letter_pos + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let width = width_str.parse().ok().filter(|&w: &usize| w > 0)?;
        Some(Self { kind, width })
    }
}

#[derive(Debug, Clone)]
struct Section {
    format: FieldFormat,
    values: Vec<String>,
    line: usize,
}

/// One residue of an Amber topology, with its 1-based index and atom range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyResidue<'a> {
    pub index: usize,
    pub name: &'a str,
    /// Zero-based, half-open atom index range.
    pub atoms: Range<usize>,
}

/// The subset of an Amber `parm7` topology needed to build atom selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmberTopology {
    pub title: String,
    atom_names: Vec<String>,
    residue_labels: Vec<String>,
    /// 1-based index of the first atom of each residue.
    residue_pointers: Vec<usize>,
}

impl AmberTopology {
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, Parm7Error> {
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }

    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, Parm7Error> {
        let sections = read_sections(reader)?;

        let title = sections
            .get("TITLE")
            .or_else(|| sections.get("CTITLE"))
            .map(|s| s.values.join("").trim().to_string())
            .unwrap_or_default();

        let pointers = integer_section(&sections, "POINTERS")?;
        let natom = pointer(&pointers, POINTER_NATOM)?;
        let nres = pointer(&pointers, POINTER_NRES)?;

        let atom_names = text_section(&sections, "ATOM_NAME")?;
        let residue_labels = text_section(&sections, "RESIDUE_LABEL")?;
        let residue_pointers = integer_section(&sections, "RESIDUE_POINTER")?;

        if atom_names.len() != natom {
            return Err(Parm7Error::Inconsistent(format!(
                "POINTERS declares {} atoms but ATOM_NAME has {}",
                natom,
                atom_names.len()
            )));
        }
        if residue_labels.len() != nres || residue_pointers.len() != nres {
            return Err(Parm7Error::Inconsistent(format!(
                "POINTERS declares {} residues but RESIDUE_LABEL has {} and RESIDUE_POINTER has {}",
                nres,
                residue_labels.len(),
                residue_pointers.len()
            )));
        }
        let monotonic = residue_pointers.first().is_none_or(|&first| first == 1)
            && residue_pointers.windows(2).all(|w| w[0] < w[1])
            && residue_pointers.last().is_none_or(|&last| last <= natom);
        if !monotonic {
            return Err(Parm7Error::Inconsistent(
                "RESIDUE_POINTER must start at 1 and increase strictly within the atom count"
                    .to_string(),
            ));
        }

        Ok(Self {
            title,
            atom_names,
            residue_labels,
            residue_pointers,
        })
    }

    pub fn atom_count(&self) -> usize {
        self.atom_names.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residue_labels.len()
    }

    pub fn atom_name(&self, index: usize) -> Option<&str> {
        self.atom_names.get(index).map(String::as_str)
    }

    pub fn residues(&self) -> impl Iterator<Item = TopologyResidue<'_>> {
        self.residue_labels
            .iter()
            .enumerate()
            .map(move |(i, label)| TopologyResidue {
                index: i + 1,
                name: label.as_str(),
                atoms: self.residue_atom_range(i),
            })
    }

    fn residue_atom_range(&self, residue: usize) -> Range<usize> {
        let start = self.residue_pointers[residue] - 1;
        let end = self
            .residue_pointers
            .get(residue + 1)
            .map(|&next| next - 1)
            .unwrap_or(self.atom_names.len());
        start..end
    }
}

fn read_sections(reader: &mut impl BufRead) -> Result<HashMap<String, Section>, Parm7Error> {
    let mut sections: HashMap<String, Section> = HashMap::new();
    let mut current: Option<(String, Option<Section>, usize)> = None;

    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let line_num = line_num + 1;

        if let Some(rest) = line.strip_prefix("%FLAG") {
            if let Some((name, Some(section), _)) = current.take() {
                sections.insert(name, section);
            }
            current = Some((rest.trim().to_string(), None, line_num));
            continue;
        }

        if let Some(rest) = line.strip_prefix("%FORMAT") {
            let Some((_, slot, flag_line)) = current.as_mut() else {
                return Err(Parm7Error::Parse {
                    line: line_num,
                    message: "%FORMAT without a preceding %FLAG".to_string(),
                });
            };
            let descriptor = rest.trim().trim_start_matches('(').trim_end_matches(')');
            let format = FieldFormat::parse(descriptor).ok_or_else(|| Parm7Error::Parse {
                line: line_num,
                message: format!("unsupported format descriptor '{}'", descriptor),
            })?;
            *slot = Some(Section {
                format,
                values: Vec::new(),
                line: *flag_line,
            });
            continue;
        }

        if line.starts_with('%') {
            // %VERSION and %COMMENT lines carry no data.
            continue;
        }

        if let Some((_, Some(section), _)) = current.as_mut() {
            let width = section.format.width;
            let chars: Vec<char> = line.trim_end_matches(['\r', '\n']).chars().collect();
            for chunk in chars.chunks(width) {
                let field: String = chunk.iter().collect();
                if section.format.kind == FieldKind::Text {
                    section.values.push(field);
                } else if !field.trim().is_empty() {
                    section.values.push(field.trim().to_string());
                }
            }
        }
    }

    if let Some((name, Some(section), _)) = current {
        sections.insert(name, section);
    }

    Ok(sections)
}

fn integer_section(
    sections: &HashMap<String, Section>,
    name: &'static str,
) -> Result<Vec<usize>, Parm7Error> {
    let section = sections.get(name).ok_or(Parm7Error::MissingSection(name))?;
    if section.format.kind != FieldKind::Integer {
        return Err(Parm7Error::Parse {
            line: section.line,
            message: format!("%FLAG {} must use an integer format", name),
        });
    }
    section
        .values
        .iter()
        .map(|value| {
            value.parse().map_err(|_| Parm7Error::Parse {
                line: section.line,
                message: format!("invalid integer '{}' in %FLAG {}", value, name),
            })
        })
        .collect()
}

fn text_section(
    sections: &HashMap<String, Section>,
    name: &'static str,
) -> Result<Vec<String>, Parm7Error> {
    let section = sections.get(name).ok_or(Parm7Error::MissingSection(name))?;
    let mut values: Vec<String> = section.values.iter().map(|v| v.trim().to_string()).collect();
    // The last line may be shorter than a full record; drop padding fields.
    while values.last().is_some_and(|v| v.is_empty()) {
        values.pop();
    }
    Ok(values)
}

fn pointer(pointers: &[usize], index: usize) -> Result<usize, Parm7Error> {
    pointers.get(index).copied().ok_or_else(|| {
        Parm7Error::Inconsistent(format!(
            "POINTERS has {} entries, expected at least {}",
            pointers.len(),
            index + 1
        ))
    })
}

/// Test fixtures shared by the selection, descriptor and workflow tests.
#[cfg(test)]
pub(crate) mod fixtures {
    /// Renders a minimal but well-formed `parm7` from `(residue, atom names)` pairs.
    pub fn render_parm7(residues: &[(&str, &[&str])]) -> String {
        let atom_names: Vec<&str> = residues
            .iter()
            .flat_map(|(_, atoms)| atoms.iter().copied())
            .collect();
        let labels: Vec<&str> = residues.iter().map(|(name, _)| *name).collect();
        let mut pointers = Vec::new();
        let mut next = 1;
        for (_, atoms) in residues {
            pointers.push(next);
            next += atoms.len();
        }

        let mut header = vec![0usize; 31];
        header[0] = atom_names.len();
        header[11] = labels.len();

        let mut out = String::from("%VERSION  VERSION_STAMP = V0001.000\n");
        out.push_str("%FLAG TITLE\n%FORMAT(20a4)\ntest system\n");
        out.push_str("%FLAG POINTERS\n%FORMAT(10I8)\n");
        out.push_str(&int_block(&header));
        out.push_str("%FLAG ATOM_NAME\n%FORMAT(20a4)\n");
        out.push_str(&text_block(&atom_names));
        out.push_str("%FLAG RESIDUE_LABEL\n%FORMAT(20a4)\n");
        out.push_str(&text_block(&labels));
        out.push_str("%FLAG RESIDUE_POINTER\n%FORMAT(10I8)\n");
        out.push_str(&int_block(&pointers));
        out
    }

    fn int_block(values: &[usize]) -> String {
        let mut out = String::new();
        for chunk in values.chunks(10) {
            for value in chunk {
                out.push_str(&format!("{:>8}", value));
            }
            out.push('\n');
        }
        out
    }

    fn text_block(values: &[&str]) -> String {
        let mut out = String::new();
        for chunk in values.chunks(20) {
            for value in chunk {
                out.push_str(&format!("{:<4}", value));
            }
            out.push('\n');
        }
        out
    }
}
