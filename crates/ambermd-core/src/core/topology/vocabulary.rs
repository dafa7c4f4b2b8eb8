use phf::{Set, phf_set};

#[rustfmt::skip]
static PROTEIN_RESIDUES: Set<&'static str> = phf_set! {
    // --- Standard amino acids ---
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE",
    "LEU", "LYS", "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
    // --- Protonation / bonding variants ---
    "HID", "HIE", "HIN", "HIP", "HSD", "HSE", "HSP", "CYX", "CYM", "ASH",
    "GLH", "LYN", "LYH", "GL4", "AS4", "HYP",
    // --- Capping groups ---
    "ACE", "NME", "NHE",
};

#[rustfmt::skip]
static NUCLEIC_RESIDUES: Set<&'static str> = phf_set! {
    "A", "C", "G", "U", "A5", "C5", "G5", "U5", "A3", "C3", "G3", "U3",
    "RA", "RC", "RG", "RU", "RA5", "RC5", "RG5", "RU5", "RA3", "RC3", "RG3", "RU3",
    "DA", "DC", "DG", "DT", "DA5", "DC5", "DG5", "DT5", "DA3", "DC3", "DG3", "DT3",
    "OHE",
};

#[rustfmt::skip]
static SOLVENT_RESIDUES: Set<&'static str> = phf_set! {
    // --- Water ---
    "WAT", "HOH", "TIP", "SOL",
    // --- Ions ---
    "AG", "AL", "Ag", "BA", "BR", "Be", "CA", "CD", "CE", "CL", "CO", "CR",
    "CS", "CU", "CU1", "Cl-", "Cs+", "Cu+", "EU", "EU3", "FE", "FE2", "GD3",
    "HE+", "HG", "HZ+", "Hg", "IN", "IOD", "K", "K+", "LA", "LI", "LU", "MG",
    "MN", "NA", "NH4", "NI", "Na+", "Nd", "PB", "PD", "PR", "PT", "Pt", "RB",
    "Rb+", "SM", "SR", "Sm", "Sn", "TB", "TL", "Tl", "Tm", "U4+", "V2+", "Y",
    "YB2", "ZN", "Zn",
};

static BACKBONE_ATOM_NAMES: Set<&'static str> = phf_set! { "N", "CA", "C", "O" };

/// Residue name used by CHARMM-style water models in Amber topologies.
pub const CHARMM_WATER_RESIDUE: &str = "TIP3";

/// Backbone atom names, in the order they appear in selection masks.
pub const BACKBONE_MASK_ATOMS: [&str; 4] = ["CA", "C", "N", "O"];

pub fn is_protein_residue(name: &str) -> bool {
    let name = name.trim();
    if PROTEIN_RESIDUES.contains(name) {
        return true;
    }
    // Terminal variants carry an N/C prefix on a four-character label (e.g. NALA, CGLY).
    name.len() == 4
        && (name.starts_with('N') || name.starts_with('C'))
        && PROTEIN_RESIDUES.contains(&name[1..])
}

pub fn is_nucleic_residue(name: &str) -> bool {
    NUCLEIC_RESIDUES.contains(name.trim())
}

/// Whether a residue belongs to the polymer solute (protein or nucleic acid).
pub fn is_polymer_residue(name: &str) -> bool {
    is_protein_residue(name) || is_nucleic_residue(name)
}

/// Whether a residue is water or a monatomic/small ion that is stripped
/// before parameterization.
pub fn is_solvent_residue(name: &str) -> bool {
    SOLVENT_RESIDUES.contains(name.trim())
}

/// Whether the system builder's stock force fields cover the residue, i.e.
/// it does not need to be parameterized as a ligand.
pub fn is_supported_residue(name: &str) -> bool {
    is_polymer_residue(name) || is_solvent_residue(name)
}

pub fn is_backbone_atom(atom_name: &str) -> bool {
    BACKBONE_ATOM_NAMES.contains(atom_name.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_protein_residues_and_terminal_variants() {
        assert!(is_protein_residue("ALA"));
        assert!(is_protein_residue("HIE"));
        assert!(is_protein_residue(" NME "));
        assert!(is_protein_residue("NALA"));
        assert!(is_protein_residue("CGLY"));
        assert!(!is_protein_residue("MOL"));
        assert!(!is_protein_residue("NMOL"));
    }

    #[test]
    fn recognizes_nucleic_residues() {
        assert!(is_nucleic_residue("DA5"));
        assert!(is_nucleic_residue("U"));
        assert!(!is_nucleic_residue("DX"));
    }

    #[test]
    fn solvent_and_ions_are_supported_but_not_polymer() {
        for name in ["WAT", "HOH", "Na+", "Cl-", "ZN", "TIP"] {
            assert!(is_solvent_residue(name), "{name} should be solvent");
            assert!(is_supported_residue(name));
            assert!(!is_polymer_residue(name));
        }
    }

    #[test]
    fn ligands_are_not_supported() {
        assert!(!is_supported_residue("LIG"));
        assert!(!is_supported_residue("ATP"));
    }

    #[test]
    fn backbone_atoms_are_n_ca_c_o() {
        for name in BACKBONE_MASK_ATOMS {
            assert!(is_backbone_atom(name));
        }
        assert!(!is_backbone_atom("CB"));
        assert!(!is_backbone_atom("OXT"));
        assert!(!is_backbone_atom("H"));
    }
}
