use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::bond::BondOrder;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const DEFAULT_CHAIN: char = 'A';

#[derive(Debug, Clone, PartialEq)]
pub struct Mol2Metadata {
    pub molecule_name: String,
    pub molecule_type: String,
    pub charge_type: String,
}

impl Default for Mol2Metadata {
    fn default() -> Self {
        Self {
            molecule_name: "MOL".to_string(),
            molecule_type: "SMALL".to_string(),
            charge_type: "NO_CHARGES".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Mol2Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Missing required section: {0}")]
    MissingSection(&'static str),
}

impl Mol2Error {
    fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Molecule,
    Atom,
    Bond,
    Other,
}

pub struct Mol2File;

impl MolecularFile for Mol2File {
    type Metadata = Mol2Metadata;
    type Error = Mol2Error;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut system = MolecularSystem::new();
        let mut metadata = Mol2Metadata::default();
        let chain_id = system.add_chain(DEFAULT_CHAIN);

        let mut section = Section::Other;
        let mut molecule_line = 0usize;
        let mut seen_molecule = false;
        let mut seen_atoms = false;
        let mut id_map: HashMap<usize, AtomId> = HashMap::new();
        let mut residues: HashMap<(isize, String), ResidueId> = HashMap::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();

            if trimmed.starts_with("@<TRIPOS>") {
                section = match trimmed.to_ascii_uppercase().as_str() {
                    "@<TRIPOS>MOLECULE" => {
                        seen_molecule = true;
                        molecule_line = 0;
                        Section::Molecule
                    }
                    "@<TRIPOS>ATOM" => {
                        seen_atoms = true;
                        Section::Atom
                    }
                    "@<TRIPOS>BOND" => Section::Bond,
                    _ => Section::Other,
                };
                continue;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match section {
                Section::Molecule => {
                    match molecule_line {
                        0 => metadata.molecule_name = trimmed.to_string(),
                        2 => metadata.molecule_type = trimmed.to_string(),
                        3 => metadata.charge_type = trimmed.to_string(),
                        _ => {}
                    }
                    molecule_line += 1;
                }
                Section::Atom => {
                    let parts: Vec<&str> = trimmed.split_whitespace().collect();
                    if parts.len() < 6 {
                        return Err(Mol2Error::parse(line_num, "invalid ATOM line"));
                    }
                    let serial: usize = parts[0]
                        .parse()
                        .map_err(|_| Mol2Error::parse(line_num, "invalid atom id in ATOM line"))?;
                    let coord = |idx: usize, axis: &str| -> Result<f64, Mol2Error> {
                        parts[idx].parse().map_err(|_| {
                            Mol2Error::parse(
                                line_num,
                                format!("invalid {axis} coordinate in ATOM line"),
                            )
                        })
                    };
                    let position = Point3::new(coord(2, "x")?, coord(3, "y")?, coord(4, "z")?);

                    let subst_id: isize = parts.get(6).and_then(|s| s.parse().ok()).unwrap_or(1);
                    let subst_name = parts
                        .get(7)
                        .copied()
                        .unwrap_or(metadata.molecule_name.as_str())
                        .to_string();

                    let key = (subst_id, subst_name.clone());
                    let residue_id = match residues.get(&key) {
                        Some(&id) => id,
                        None => {
                            let id = system
                                .add_residue(chain_id, subst_id, &subst_name, true)
                                .ok_or_else(|| {
                                    Mol2Error::parse(line_num, "failed to create residue")
                                })?;
                            residues.insert(key, id);
                            id
                        }
                    };

                    let mut atom = Atom::new(parts[1], residue_id, position);
                    atom.serial = serial;
                    atom.element = element_from_sybyl_type(parts[5]);
                    if let Some(atom_id) = system.add_atom_to_residue(residue_id, atom) {
                        id_map.insert(serial, atom_id);
                    }
                }
                Section::Bond => {
                    let parts: Vec<&str> = trimmed.split_whitespace().collect();
                    if parts.len() < 4 {
                        return Err(Mol2Error::parse(line_num, "invalid BOND line"));
                    }
                    let lookup = |field: &str| -> Result<AtomId, Mol2Error> {
                        field
                            .parse::<usize>()
                            .ok()
                            .and_then(|serial| id_map.get(&serial).copied())
                            .ok_or_else(|| {
                                Mol2Error::parse(line_num, "bond references unknown atom id")
                            })
                    };
                    let a1 = lookup(parts[1])?;
                    let a2 = lookup(parts[2])?;
                    let order: BondOrder = parts[3].parse().unwrap_or_default();
                    system.add_bond(a1, a2, order);
                }
                Section::Other => {}
            }
        }

        if !seen_molecule {
            return Err(Mol2Error::MissingSection("@<TRIPOS>MOLECULE"));
        }
        if !seen_atoms {
            return Err(Mol2Error::MissingSection("@<TRIPOS>ATOM"));
        }

        Ok((system, metadata))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let mut serials: HashMap<AtomId, usize> = HashMap::new();
        let mut subst_ids: HashMap<ResidueId, usize> = HashMap::new();

        writeln!(writer, "@<TRIPOS>MOLECULE")?;
        writeln!(writer, "{}", metadata.molecule_name)?;
        writeln!(
            writer,
            "{:>5} {:>5} {:>5} 0 0",
            system.atom_count(),
            system.bonds().len(),
            system.residue_count()
        )?;
        writeln!(writer, "{}", metadata.molecule_type)?;
        writeln!(writer, "{}", metadata.charge_type)?;
        writeln!(writer)?;

        writeln!(writer, "@<TRIPOS>ATOM")?;
        for (atom_id, atom) in system.atoms_in_order() {
            let serial = serials.len() + 1;
            serials.insert(atom_id, serial);
            let next_subst = subst_ids.len() + 1;
            let subst_id = *subst_ids.entry(atom.residue_id).or_insert(next_subst);
            let residue_name = system
                .residue(atom.residue_id)
                .map(|r| r.name.as_str())
                .unwrap_or("MOL");
            writeln!(
                writer,
                "{:>7} {:<8} {:>10.4} {:>10.4} {:>10.4} {:<6} {:>3} {:<8} {:>8.4}",
                serial,
                atom.name,
                atom.position.x,
                atom.position.y,
                atom.position.z,
                atom.element_symbol(),
                subst_id,
                residue_name,
                0.0
            )?;
        }

        writeln!(writer, "@<TRIPOS>BOND")?;
        let mut index = 0;
        for bond in system.bonds() {
            if let (Some(s1), Some(s2)) = (serials.get(&bond.atom1_id), serials.get(&bond.atom2_id))
            {
                index += 1;
                writeln!(
                    writer,
                    "{:>6} {:>5} {:>5} {}",
                    index,
                    s1,
                    s2,
                    bond.order.mol2_code()
                )?;
            }
        }

        Ok(())
    }

    fn write_system_to(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let molecule_name = system
            .residues_in_order()
            .next()
            .map(|(_, residue)| residue.name.clone())
            .unwrap_or_else(|| "MOL".to_string());
        let metadata = Mol2Metadata {
            molecule_name,
            ..Mol2Metadata::default()
        };
        Self::write_to(system, &metadata, writer)
    }
}

// SYBYL types look like "C.3", "N.ar" or bare element symbols such as "Cl".
fn element_from_sybyl_type(atom_type: &str) -> String {
    let base = atom_type.split('.').next().unwrap_or(atom_type);
    let mut chars = base.chars().filter(|c| c.is_ascii_alphabetic());
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) => {
            format!("{}{}", first.to_ascii_uppercase(), second.to_ascii_lowercase())
        }
        (Some(first), None) => first.to_ascii_uppercase().to_string(),
        _ => String::new(),
    }
}
