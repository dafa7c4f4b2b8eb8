use super::ids::{AtomId, ChainId};

/// A residue as read from a structure file. Atoms keep their file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub number: isize,
    pub name: String,
    pub chain_id: ChainId,
    /// Read from `HETATM` records.
    pub hetero: bool,
    pub(crate) atoms: Vec<AtomId>,
}

impl Residue {
    pub(crate) fn new(number: isize, name: &str, chain_id: ChainId, hetero: bool) -> Self {
        Self {
            number,
            name: name.to_string(),
            chain_id,
            hetero,
            atoms: Vec::new(),
        }
    }

    pub(crate) fn push_atom(&mut self, atom_id: AtomId) {
        self.atoms.push(atom_id);
    }

    pub(crate) fn detach_atom(&mut self, atom_id: AtomId) {
        self.atoms.retain(|&id| id != atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The residue name as compared against the recognized vocabulary: trimmed
    /// and cut to its first three characters.
    pub fn short_name(&self) -> &str {
        let trimmed = self.name.trim();
        match trimmed.char_indices().nth(3) {
            Some((idx, _)) => &trimmed[..idx],
            None => trimmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn atom_id(n: u64) -> AtomId {
        AtomId::from(KeyData::from_ffi(n))
    }

    fn chain_id() -> ChainId {
        ChainId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn atoms_keep_insertion_order() {
        let mut residue = Residue::new(7, "LIG", chain_id(), true);
        assert!(residue.is_empty());
        residue.push_atom(atom_id(3));
        residue.push_atom(atom_id(1));
        residue.push_atom(atom_id(2));
        assert_eq!(residue.atoms(), &[atom_id(3), atom_id(1), atom_id(2)]);
        assert!(residue.hetero);
    }

    #[test]
    fn detaching_an_unknown_atom_is_a_no_op() {
        let mut residue = Residue::new(1, "HOH", chain_id(), true);
        residue.push_atom(atom_id(10));
        residue.detach_atom(atom_id(11));
        assert_eq!(residue.atoms(), &[atom_id(10)]);
        residue.detach_atom(atom_id(10));
        assert!(residue.is_empty());
    }

    #[test]
    fn short_name_truncates_to_three_characters() {
        assert_eq!(Residue::new(1, "NALA", chain_id(), false).short_name(), "NAL");
        assert_eq!(Residue::new(1, " MOL ", chain_id(), true).short_name(), "MOL");
        assert_eq!(Residue::new(1, "WAT", chain_id(), true).short_name(), "WAT");
        assert_eq!(Residue::new(1, "K", chain_id(), true).short_name(), "K");
    }
}
