use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::bond::BondOrder;
use crate::core::models::ids::{AtomId, ChainId, ResidueId};
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// Records preceding the coordinates (CRYST1, REMARK, ...), kept verbatim.
    pub header_lines: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_optional_float(line: &str, start: usize, end: usize, default: f64) -> f64 {
    slice_and_trim(line, start, end).parse().unwrap_or(default)
}

pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut system = MolecularSystem::new();
        let mut metadata = PdbMetadata::default();
        let mut serial_map: HashMap<usize, AtomId> = HashMap::new();
        let mut conect: Vec<(usize, usize)> = Vec::new();

        let mut current: Option<(ChainId, isize, String)> = None;
        let mut current_residue: Option<ResidueId> = None;
        let mut seen_atoms = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }
                    seen_atoms = true;

                    let serial_str = slice_and_trim(&line, 6, 11);
                    let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "7-11".into(),
                            value: serial_str.into(),
                        },
                    })?;
                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }
                    let res_name = slice_and_trim(&line, 17, 21);
                    let chain_char = line
                        .get(21..22)
                        .and_then(|s| s.chars().next())
                        .filter(|c| !c.is_whitespace())
                        .unwrap_or('A');
                    let res_seq_str = slice_and_trim(&line, 22, 26);
                    let res_seq: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "23-26".into(),
                            value: res_seq_str.into(),
                        },
                    })?;
                    let x = parse_float(&line, line_num, 30, 38)?;
                    let y = parse_float(&line, line_num, 38, 46)?;
                    let z = parse_float(&line, line_num, 46, 54)?;

                    let chain_id = system.add_chain(chain_char);
                    let key = (chain_id, res_seq, res_name.to_string());
                    if current.as_ref() != Some(&key) {
                        current_residue = system.add_residue(
                            chain_id,
                            res_seq,
                            res_name,
                            record_type == "HETATM",
                        );
                        current = Some(key);
                    }
                    let Some(residue_id) = current_residue else {
                        continue;
                    };

                    let mut atom = Atom::new(name, residue_id, Point3::new(x, y, z));
                    atom.serial = serial;
                    atom.occupancy = parse_optional_float(&line, 54, 60, 1.0);
                    atom.b_factor = parse_optional_float(&line, 60, 66, 0.0);
                    atom.element = slice_and_trim(&line, 76, 78).to_string();

                    if let Some(atom_id) = system.add_atom_to_residue(residue_id, atom) {
                        serial_map.insert(serial, atom_id);
                    }
                }
                "CONECT" => {
                    let fields: Vec<usize> = (6..line.len())
                        .step_by(5)
                        .filter_map(|start| slice_and_trim(&line, start, start + 5).parse().ok())
                        .collect();
                    if let Some((&origin, partners)) = fields.split_first() {
                        for &partner in partners {
                            conect.push((origin.min(partner), origin.max(partner)));
                        }
                    }
                }
                "TER" => current = None,
                "END" | "ENDMDL" => break,
                _ => {
                    if !seen_atoms && !line.trim().is_empty() {
                        metadata.header_lines.push(line);
                    }
                }
            }
        }

        if !seen_atoms {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }

        conect.sort_unstable();
        conect.dedup();
        for (a1, a2) in conect {
            if let (Some(&id1), Some(&id2)) = (serial_map.get(&a1), serial_map.get(&a2)) {
                system.add_bond(id1, id2, BondOrder::Single);
            }
        }

        Ok((system, metadata))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }

        let mut serials: HashMap<AtomId, usize> = HashMap::new();
        let mut serial = 0usize;

        for (_, chain) in system.chains_in_order() {
            let mut wrote_any = false;
            for &residue_id in chain.residues() {
                let Some(residue) = system.residue(residue_id) else {
                    continue;
                };
                let record_type = if residue.hetero { "HETATM" } else { "ATOM" };
                for &atom_id in residue.atoms() {
                    let Some(atom) = system.atom(atom_id) else {
                        continue;
                    };
                    serial += 1;
                    serials.insert(atom_id, serial);
                    let element = atom.element_symbol();
                    writeln!(
                        writer,
                        "{:<6}{:>5} {}{:1}{}{:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                        record_type,
                        serial,
                        format_atom_name(&atom.name, &element),
                        ' ',
                        format_residue_name(&residue.name),
                        chain.id,
                        residue.number,
                        ' ',
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        atom.occupancy,
                        atom.b_factor,
                        element.to_uppercase(),
                    )?;
                    wrote_any = true;
                }
            }
            if wrote_any {
                writeln!(writer, "TER")?;
            }
        }

        let mut partners: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for bond in system.bonds() {
            if let (Some(&s1), Some(&s2)) = (serials.get(&bond.atom1_id), serials.get(&bond.atom2_id))
            {
                partners.entry(s1).or_default().push(s2);
                partners.entry(s2).or_default().push(s1);
            }
        }
        for (origin, mut bonded) in partners {
            bonded.sort_unstable();
            for chunk in bonded.chunks(4) {
                write!(writer, "CONECT{:>5}", origin)?;
                for partner in chunk {
                    write!(writer, "{:>5}", partner)?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }

    fn write_system_to(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let metadata = PdbMetadata {
            header_lines: vec!["REMARK   1 Generated by ambermd".to_string()],
        };
        Self::write_to(system, &metadata, writer)
    }
}

// Four-character names fill columns 13-16; shorter names of one-letter
// elements start in column 14.
fn format_atom_name(name: &str, element: &str) -> String {
    if name.len() >= 4 || element.len() > 1 {
        format!("{:<4}", name)
    } else {
        format!(" {:<3}", name)
    }
}

// Residue names occupy columns 18-21; three-letter names are right-aligned
// in 18-20 leaving 21 blank.
fn format_residue_name(name: &str) -> String {
    if name.len() <= 3 {
        format!("{:>3} ", name)
    } else {
        format!("{:<4}", name)
    }
}
