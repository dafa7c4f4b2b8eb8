use super::atom::Atom;
use super::bond::{Bond, BondOrder};
use super::chain::Chain;
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

/// Represents a complete molecular structure with atoms, residues, chains, and bonds.
///
/// This is the in-memory form of an input structure during system preparation.
/// It keeps chains in file order and residues/atoms in insertion order, so a
/// structure written back out preserves the layout of the one read in.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains.
    chains: SlotMap<ChainId, Chain>,
    /// Chains in the order they were first encountered.
    chain_order: Vec<ChainId>,
    /// List of all bonds in the system.
    bonds: Vec<Bond>,
    /// Lookup map for finding residues by chain, residue number and name.
    residue_id_map: HashMap<(ChainId, isize, String), ResidueId>,
    /// Lookup map for finding chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
    /// Cached adjacency list for bond connectivity, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl MolecularSystem {
    /// Creates a new, empty molecular system.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn find_residue(&self, chain_id: ChainId, number: isize, name: &str) -> Option<ResidueId> {
        self.residue_id_map
            .get(&(chain_id, number, name.to_string()))
            .copied()
    }

    /// Returns the chains in file order.
    pub fn chains_in_order(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(move |&id| self.chains.get(id).map(|chain| (id, chain)))
    }

    /// Returns every residue, chain by chain, in file order.
    pub fn residues_in_order(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.chains_in_order().flat_map(move |(_, chain)| {
            chain
                .residues()
                .iter()
                .filter_map(move |&id| self.residues.get(id).map(|residue| (id, residue)))
        })
    }

    /// Returns every atom, residue by residue, in file order.
    pub fn atoms_in_order(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.residues_in_order().flat_map(move |(_, residue)| {
            residue
                .atoms()
                .iter()
                .filter_map(move |&id| self.atoms.get(id).map(|atom| (id, atom)))
        })
    }

    /// Adds a new chain to the system or returns the existing one.
    ///
    /// This method is idempotent; if a chain with the given ID already exists,
    /// it returns the existing chain ID without creating a duplicate.
    pub fn add_chain(&mut self, id: char) -> ChainId {
        if let Some(&existing) = self.chain_id_map.get(&id) {
            return existing;
        }
        let chain_id = self.chains.insert(Chain::new(id));
        self.chain_id_map.insert(id, chain_id);
        self.chain_order.push(chain_id);
        chain_id
    }

    /// Adds a new residue to a chain or returns the existing one.
    ///
    /// # Return
    ///
    /// Returns `None` if the chain doesn't exist.
    pub fn add_residue(
        &mut self,
        chain_id: ChainId,
        number: isize,
        name: &str,
        hetero: bool,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, number, name.to_string());

        let residue_id = *self.residue_id_map.entry(key).or_insert_with(|| {
            let residue = Residue::new(number, name, chain_id, hetero);
            self.residues.insert(residue)
        });

        if !chain.residues.contains(&residue_id) {
            chain.residues.push(residue_id);
        }

        Some(residue_id)
    }

    /// Adds an atom to a specific residue.
    ///
    /// # Return
    ///
    /// Returns `None` if the residue doesn't exist.
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }

        let atom_id = self.atoms.insert(Atom { residue_id, ..atom });
        self.bond_adjacency.insert(atom_id, Vec::new());
        self.residues.get_mut(residue_id)?.push_atom(atom_id);

        Some(atom_id)
    }

    /// Adds a bond between two atoms. Adding an existing bond is a no-op.
    ///
    /// # Return
    ///
    /// Returns `None` if either atom doesn't exist or the atoms are identical.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }

        if let Some(neighbors) = self.bond_adjacency.get(atom1_id) {
            if neighbors.contains(&atom2_id) {
                return Some(());
            }
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// Removes an atom together with its bonds and its residue membership.
    fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;

        if let Some(residue) = self.residues.get_mut(atom.residue_id) {
            residue.detach_atom(atom_id);
        }

        self.bonds.retain(|bond| !bond.contains(atom_id));

        let neighbors = self.bond_adjacency.remove(atom_id).unwrap_or_default();
        for neighbor_id in neighbors {
            if let Some(adjacency) = self.bond_adjacency.get_mut(neighbor_id) {
                adjacency.retain(|&id| id != atom_id);
            }
        }

        Some(atom)
    }

    /// Removes a residue and all of its atoms, returning how many atoms went
    /// with it.
    pub fn remove_residue(&mut self, residue_id: ResidueId) -> Option<usize> {
        let residue = self.residues.remove(residue_id)?;

        for &atom_id in residue.atoms() {
            self.remove_atom(atom_id);
        }
        if let Some(chain) = self.chains.get_mut(residue.chain_id) {
            chain.residues.retain(|&id| id != residue_id);
        }
        self.residue_id_map
            .remove(&(residue.chain_id, residue.number, residue.name));

        Some(residue.atoms.len())
    }

    /// Removes every residue for which `predicate` returns `false`.
    ///
    /// Chains left without residues are dropped as well.
    ///
    /// # Return
    ///
    /// The number of atoms removed.
    pub fn retain_residues<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Residue) -> bool,
    {
        let doomed: Vec<ResidueId> = self
            .residues_in_order()
            .filter(|(_, residue)| !predicate(residue))
            .map(|(id, _)| id)
            .collect();

        let mut removed_atoms = 0;
        for residue_id in doomed {
            removed_atoms += self.remove_residue(residue_id).unwrap_or(0);
        }

        let empty_chains: Vec<ChainId> = self
            .chains_in_order()
            .filter(|(_, chain)| chain.residues().is_empty())
            .map(|(id, _)| id)
            .collect();
        for chain_id in empty_chains {
            if let Some(chain) = self.chains.remove(chain_id) {
                self.chain_id_map.remove(&chain.id);
            }
            self.chain_order.retain(|&id| id != chain_id);
        }

        removed_atoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    struct TestRefs {
        chain_a_id: ChainId,
        gly_id: ResidueId,
        gly_n_id: AtomId,
        gly_ca_id: AtomId,
        lig_id: ResidueId,
        lig_c1_id: AtomId,
    }

    fn create_standard_test_system() -> (MolecularSystem, TestRefs) {
        let mut system = MolecularSystem::new();

        let chain_a_id = system.add_chain('A');
        let gly_id = system.add_residue(chain_a_id, 1, "GLY", false).unwrap();
        let gly_n_id = system
            .add_atom_to_residue(gly_id, Atom::new("N", gly_id, Point3::new(0.0, 0.0, 0.0)))
            .unwrap();
        let gly_ca_id = system
            .add_atom_to_residue(gly_id, Atom::new("CA", gly_id, Point3::new(1.4, 0.0, 0.0)))
            .unwrap();
        system
            .add_bond(gly_n_id, gly_ca_id, BondOrder::Single)
            .unwrap();

        let chain_b_id = system.add_chain('B');
        let lig_id = system.add_residue(chain_b_id, 1, "LIG", true).unwrap();
        let lig_c1_id = system
            .add_atom_to_residue(lig_id, Atom::new("C1", lig_id, Point3::new(5.0, 0.0, 0.0)))
            .unwrap();

        let refs = TestRefs {
            chain_a_id,
            gly_id,
            gly_n_id,
            gly_ca_id,
            lig_id,
            lig_c1_id,
        };
        (system, refs)
    }

    #[test]
    fn system_creation_and_access() {
        let (system, refs) = create_standard_test_system();

        assert_eq!(system.atom_count(), 3);
        assert_eq!(system.residue_count(), 2);
        assert_eq!(system.chains_in_order().count(), 2);
        assert_eq!(system.bonds().len(), 1);
        assert!(!system.chains_in_order().any(|(_, chain)| chain.id == 'C'));

        let found_gly = system.find_residue(refs.chain_a_id, 1, "GLY").unwrap();
        assert_eq!(found_gly, refs.gly_id);
        assert_eq!(system.residue(refs.gly_id).unwrap().name, "GLY");
        assert_eq!(system.atom(refs.gly_n_id).unwrap().name, "N");
        assert_eq!(system.atom(refs.lig_c1_id).unwrap().residue_id, refs.lig_id);
    }

    #[test]
    fn iteration_preserves_file_order() {
        let (system, _) = create_standard_test_system();
        let names: Vec<_> = system
            .atoms_in_order()
            .map(|(_, atom)| atom.name.as_str())
            .collect();
        assert_eq!(names, vec!["N", "CA", "C1"]);
    }

    #[test]
    fn atom_removal_updates_bonds_and_residue() {
        let (mut system, refs) = create_standard_test_system();

        let removed = system.remove_atom(refs.gly_n_id).unwrap();
        assert_eq!(removed.name, "N");
        assert!(system.bonds().is_empty());
        assert!(system.bond_adjacency[refs.gly_ca_id].is_empty());
        assert!(!system.bond_adjacency.contains_key(refs.gly_n_id));
        assert_eq!(system.residue(refs.gly_id).unwrap().atoms(), &[refs.gly_ca_id]);
    }

    #[test]
    fn idempotent_add_bond_does_not_create_duplicates() {
        let (mut system, refs) = create_standard_test_system();
        system
            .add_bond(refs.gly_ca_id, refs.gly_n_id, BondOrder::Single)
            .unwrap();
        assert_eq!(system.bonds().len(), 1);
        assert!(
            system
                .add_bond(refs.gly_n_id, refs.gly_n_id, BondOrder::Single)
                .is_none()
        );
    }

    #[test]
    fn retain_residues_drops_residues_and_empty_chains() {
        let (mut system, refs) = create_standard_test_system();

        let removed = system.retain_residues(|residue| residue.name != "LIG");

        assert_eq!(removed, 1);
        assert!(system.residue(refs.lig_id).is_none());
        assert!(system.atom(refs.lig_c1_id).is_none());
        assert!(!system.chain_id_map.contains_key(&'B'));
        assert_eq!(system.chains_in_order().count(), 1);
        assert_eq!(system.atom_count(), 2);
    }
}
