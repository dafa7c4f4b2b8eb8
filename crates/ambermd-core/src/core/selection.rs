use crate::core::io::parm7::AmberTopology;
use crate::core::models::atom::is_hydrogen_name;
use crate::core::topology::vocabulary::{BACKBONE_MASK_ATOMS, is_backbone_atom};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionScope {
    /// Every non-hydrogen atom.
    Heavy,
    /// The N, CA, C and O atoms.
    Backbone,
}

/// An atom selection over the leading solute residues `1..=last_residue`.
///
/// Renders to the engine's ambmask syntax and can be evaluated against a
/// parsed topology, so the atoms a restraint will act on are countable before
/// any job runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomSelection {
    pub last_residue: usize,
    pub scope: SelectionScope,
    /// Free-form fragment OR-ed onto the rendered mask. Opaque to evaluation.
    pub extra: Option<String>,
}

impl AtomSelection {
    pub fn heavy(last_residue: usize) -> Self {
        Self {
            last_residue,
            scope: SelectionScope::Heavy,
            extra: None,
        }
    }

    pub fn backbone(last_residue: usize) -> Self {
        Self {
            last_residue,
            scope: SelectionScope::Backbone,
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: Option<&str>) -> Self {
        self.extra = extra
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .map(str::to_string);
        self
    }

    pub fn to_mask(&self) -> String {
        let base = match self.scope {
            SelectionScope::Heavy => format!(":1-{}&!@H=", self.last_residue),
            SelectionScope::Backbone => {
                format!(":1-{}@{}", self.last_residue, BACKBONE_MASK_ATOMS.join(","))
            }
        };
        match &self.extra {
            Some(extra) => format!("{}|{}", base, extra),
            None => base,
        }
    }

    /// Whether an atom of the residue at 1-based `residue_index` is selected by
    /// the base selection.
    pub fn matches(&self, residue_index: usize, atom_name: &str) -> bool {
        if residue_index == 0 || residue_index > self.last_residue {
            return false;
        }
        match self.scope {
            SelectionScope::Heavy => !is_hydrogen_name(atom_name),
            SelectionScope::Backbone => is_backbone_atom(atom_name),
        }
    }

    /// Zero-based indices of the topology atoms matched by the base selection.
    ///
    /// The `extra` fragment is engine syntax and is not evaluated.
    pub fn select(&self, topology: &AmberTopology) -> Vec<usize> {
        topology
            .residues()
            .take_while(|residue| residue.index <= self.last_residue)
            .flat_map(|residue| {
                let index = residue.index;
                residue.atoms.filter(move |&atom| {
                    topology
                        .atom_name(atom)
                        .is_some_and(|name| self.matches(index, name))
                })
            })
            .collect()
    }

    pub fn count(&self, topology: &AmberTopology) -> usize {
        self.select(topology).len()
    }
}

impl fmt::Display for AtomSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_mask())
    }
}
