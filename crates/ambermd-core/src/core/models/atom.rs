use super::ids::ResidueId;
use nalgebra::Point3;

/// Represents a single atom read from a structure file.
///
/// Atoms only carry what the preparation stage needs to split, filter and
/// rewrite a structure: identity, parent residue, element and position.
/// Force-field parameters live in the topology produced by the external
/// system builder, never here.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The serial number of the atom in the source file.
    pub serial: usize,
    /// The name of the atom (e.g., "CA", "N", "O1").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The element symbol (e.g., "C", "Cl"). Empty when the file did not provide one.
    pub element: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Occupancy column of PDB records.
    pub occupancy: f64,
    /// Temperature factor column of PDB records.
    pub b_factor: f64,
}

impl Atom {
    /// Creates a new `Atom` with default values for the optional columns.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            serial: 0,
            name: name.to_string(),
            residue_id,
            element: String::new(),
            position,
            occupancy: 1.0,
            b_factor: 0.0,
        }
    }

    /// Returns the element symbol, inferring it from the atom name if the file
    /// left the element column blank.
    pub fn element_symbol(&self) -> String {
        if !self.element.is_empty() {
            return self.element.clone();
        }
        self.name
            .trim()
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase().to_string())
            .unwrap_or_else(|| "X".to_string())
    }

    /// Whether the atom is a hydrogen, using the same name-prefix rule as the
    /// `@H=` selection of the simulation engine.
    pub fn is_hydrogen(&self) -> bool {
        is_hydrogen_name(&self.name)
    }
}

pub fn is_hydrogen_name(atom_name: &str) -> bool {
    atom_name.trim().starts_with('H')
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_residue_id() -> ResidueId {
        ResidueId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn new_atom_has_defaults() {
        let atom = Atom::new("CA", dummy_residue_id(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.name, "CA");
        assert_eq!(atom.serial, 0);
        assert!(atom.element.is_empty());
        assert_eq!(atom.occupancy, 1.0);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn element_symbol_prefers_explicit_column() {
        let mut atom = Atom::new("CL1", dummy_residue_id(), Point3::origin());
        atom.element = "Cl".to_string();
        assert_eq!(atom.element_symbol(), "Cl");
    }

    #[test]
    fn element_symbol_falls_back_to_name() {
        let atom = Atom::new("1HB", dummy_residue_id(), Point3::origin());
        assert_eq!(atom.element_symbol(), "H");
    }

    #[test]
    fn hydrogen_detection_follows_name_prefix() {
        assert!(is_hydrogen_name("H"));
        assert!(is_hydrogen_name(" HA2"));
        assert!(!is_hydrogen_name("CA"));
        assert!(!is_hydrogen_name("OH"));
    }
}
