use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::io::parm7::AmberTopology;
use crate::core::io::rst7::AmberCoordinates;
use crate::core::selection::AtomSelection;
use crate::core::topology::vocabulary::{CHARMM_WATER_RESIDUE, is_polymer_residue};
use crate::engine::error::EngineError;

/// The restraint masks handed to the stages, already combined with any
/// user-supplied fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestraintMasks {
    pub heavy: String,
    pub backbone: String,
}

/// What the pipeline needs to know about a prepared system.
///
/// Built once from a topology/coordinate pair and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDescriptor {
    topology: PathBuf,
    coordinates: PathBuf,
    atom_count: usize,
    protein_residue_count: usize,
    protein_atom_count: usize,
    heavy_atom_count: usize,
    backbone_atom_count: usize,
    heavy_mask: String,
    backbone_mask: String,
    charmm_water: bool,
}

impl SystemDescriptor {
    /// Parses `topology` and checks `coordinates` against it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StructureParse`] if either file is malformed,
    /// if their atom counts differ, or if the topology does not start with at
    /// least one protein or nucleic-acid residue.
    pub fn build(
        topology: impl AsRef<Path>,
        coordinates: impl AsRef<Path>,
    ) -> Result<Self, EngineError> {
        let topology_path = topology.as_ref();
        let coordinates_path = coordinates.as_ref();

        let parsed = AmberTopology::read_from_path(topology_path)
            .map_err(|e| EngineError::structure(topology_path, e))?;

        check_coordinates(coordinates_path, parsed.atom_count())?;

        let protein_residues: Vec<_> = parsed
            .residues()
            .take_while(|residue| is_polymer_residue(residue.name))
            .collect();
        if protein_residues.is_empty() {
            return Err(EngineError::structure(
                topology_path,
                "topology contains no protein residues",
            ));
        }
        let protein_residue_count = protein_residues.len();
        let protein_atom_count = protein_residues.iter().map(|r| r.atoms.len()).sum();

        let charmm_water = parsed
            .residues()
            .any(|residue| residue.name == CHARMM_WATER_RESIDUE);

        let heavy = AtomSelection::heavy(protein_residue_count);
        let backbone = AtomSelection::backbone(protein_residue_count);
        let heavy_atom_count = heavy.count(&parsed);
        let backbone_atom_count = backbone.count(&parsed);

        info!(
            residues = protein_residue_count,
            atoms = protein_atom_count,
            heavy = heavy_atom_count,
            backbone = backbone_atom_count,
            "Identified solute"
        );

        Ok(Self {
            topology: topology_path.to_path_buf(),
            coordinates: coordinates_path.to_path_buf(),
            atom_count: parsed.atom_count(),
            protein_residue_count,
            protein_atom_count,
            heavy_atom_count,
            backbone_atom_count,
            heavy_mask: heavy.to_mask(),
            backbone_mask: backbone.to_mask(),
            charmm_water,
        })
    }

    pub fn topology(&self) -> &Path {
        &self.topology
    }

    pub fn coordinates(&self) -> &Path {
        &self.coordinates
    }

    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    pub fn protein_residue_count(&self) -> usize {
        self.protein_residue_count
    }

    pub fn protein_atom_count(&self) -> usize {
        self.protein_atom_count
    }

    /// Atoms matched by [`heavy_mask`](Self::heavy_mask).
    pub fn heavy_atom_count(&self) -> usize {
        self.heavy_atom_count
    }

    /// Atoms matched by [`backbone_mask`](Self::backbone_mask).
    pub fn backbone_atom_count(&self) -> usize {
        self.backbone_atom_count
    }

    pub fn heavy_mask(&self) -> &str {
        &self.heavy_mask
    }

    pub fn backbone_mask(&self) -> &str {
        &self.backbone_mask
    }

    pub fn has_charmm_water(&self) -> bool {
        self.charmm_water
    }

    pub fn heavy_selection(&self) -> AtomSelection {
        AtomSelection::heavy(self.protein_residue_count)
    }

    pub fn backbone_selection(&self) -> AtomSelection {
        AtomSelection::backbone(self.protein_residue_count)
    }

    /// The masks to restrain with, each OR-ed with `extra` when given.
    pub fn masks_with(&self, extra: Option<&str>) -> RestraintMasks {
        RestraintMasks {
            heavy: self.heavy_selection().with_extra(extra).to_mask(),
            backbone: self.backbone_selection().with_extra(extra).to_mask(),
        }
    }
}

fn check_coordinates(path: &Path, expected_atoms: usize) -> Result<(), EngineError> {
    let is_binary = AmberCoordinates::is_netcdf(path).map_err(|e| EngineError::structure(path, e))?;
    if is_binary {
        debug!(path = %path.display(), "Skipping atom-count check for NetCDF restart");
        return Ok(());
    }
    let coordinates =
        AmberCoordinates::read_from_path(path).map_err(|e| EngineError::structure(path, e))?;
    if coordinates.atom_count() != expected_atoms {
        return Err(EngineError::structure(
            path,
            format!(
                "coordinates hold {} atoms but the topology defines {}",
                coordinates.atom_count(),
                expected_atoms
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::parm7::fixtures::render_parm7;
    use crate::core::io::rst7::render_rst7;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const ALA: (&str, &[&str]) = ("ALA", &["N", "H", "CA", "HA", "CB", "HB1", "C", "O"]);
    const GLY: (&str, &[&str]) = ("GLY", &["N", "H", "CA", "HA2", "HA3", "C", "O"]);
    const LIG: (&str, &[&str]) = ("MOL", &["C1", "O1", "H1"]);
    const WAT: (&str, &[&str]) = ("WAT", &["O", "H1", "H2"]);

    fn write_system(residues: &[(&str, &[&str])]) -> (TempDir, PathBuf, PathBuf) {
        let dir = tempdir().unwrap();
        let parm7 = dir.path().join("x.parm7");
        let rst7 = dir.path().join("x.rst7");
        let natom = residues.iter().map(|(_, atoms)| atoms.len()).sum();
        fs::write(&parm7, render_parm7(residues)).unwrap();
        fs::write(&rst7, render_rst7(natom, true)).unwrap();
        (dir, parm7, rst7)
    }

    #[test]
    fn derives_masks_and_counts_from_leading_protein_residues() {
        let (_dir, parm7, rst7) = write_system(&[ALA, GLY, ALA, LIG, WAT, WAT]);
        let descriptor = SystemDescriptor::build(&parm7, &rst7).unwrap();

        assert_eq!(descriptor.protein_residue_count(), 3);
        assert_eq!(descriptor.protein_atom_count(), 23);
        assert_eq!(descriptor.atom_count(), 32);
        assert_eq!(descriptor.heavy_mask(), ":1-3&!@H=");
        assert_eq!(descriptor.backbone_mask(), ":1-3@CA,C,N,O");
        // ALA: N CA CB C O, GLY: N CA C O
        assert_eq!(descriptor.heavy_atom_count(), 14);
        assert_eq!(descriptor.backbone_atom_count(), 12);
        assert!(!descriptor.has_charmm_water());
    }

    #[test]
    fn selections_reproduce_the_counts_on_the_parsed_topology() {
        let (_dir, parm7, rst7) = write_system(&[ALA, GLY, LIG]);
        let descriptor = SystemDescriptor::build(&parm7, &rst7).unwrap();
        let topology = AmberTopology::read_from_path(&parm7).unwrap();

        let heavy = descriptor.heavy_selection();
        assert_eq!(heavy.to_mask(), descriptor.heavy_mask());
        assert_eq!(heavy.count(&topology), 9);
        assert_eq!(descriptor.backbone_selection().count(&topology), 8);
    }

    #[test]
    fn building_twice_gives_identical_masks() {
        let (_dir, parm7, rst7) = write_system(&[ALA, GLY, WAT]);
        let first = SystemDescriptor::build(&parm7, &rst7).unwrap();
        let second = SystemDescriptor::build(&parm7, &rst7).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.heavy_mask().as_bytes(), second.heavy_mask().as_bytes());
    }

    #[test]
    fn extra_fragment_is_or_ed_into_both_masks() {
        let (_dir, parm7, rst7) = write_system(&[ALA, LIG]);
        let descriptor = SystemDescriptor::build(&parm7, &rst7).unwrap();
        let masks = descriptor.masks_with(Some(":MOL&!@H="));
        assert_eq!(masks.heavy, ":1-1&!@H=|:MOL&!@H=");
        assert_eq!(masks.backbone, ":1-1@CA,C,N,O|:MOL&!@H=");
        assert_eq!(descriptor.masks_with(None).heavy, descriptor.heavy_mask());
    }

    #[test]
    fn charmm_water_is_detected() {
        let (_dir, parm7, rst7) = write_system(&[ALA, ("TIP3", &["OH2", "H1", "H2"])]);
        assert!(SystemDescriptor::build(&parm7, &rst7).unwrap().has_charmm_water());
    }

    #[test]
    fn topology_without_protein_is_rejected() {
        let (_dir, parm7, rst7) = write_system(&[LIG, WAT]);
        let err = SystemDescriptor::build(&parm7, &rst7).unwrap_err();
        assert!(matches!(err, EngineError::StructureParse { .. }));
    }

    #[test]
    fn coordinate_atom_count_must_match() {
        let (dir, parm7, _) = write_system(&[ALA]);
        let short = dir.path().join("short.rst7");
        fs::write(&short, render_rst7(3, false)).unwrap();
        let err = SystemDescriptor::build(&parm7, &short).unwrap_err();
        match err {
            EngineError::StructureParse { path, message } => {
                assert_eq!(path, short);
                assert!(message.contains("3 atoms"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn absurd_coordinate_header_is_a_structure_parse_error() {
        let (dir, parm7, _) = write_system(&[ALA]);
        let huge = dir.path().join("huge.rst7");
        fs::write(&huge, "huge\n4000000000000000000\n   1.0000000   2.0000000   3.0000000\n")
            .unwrap();
        assert!(matches!(
            SystemDescriptor::build(&parm7, &huge),
            Err(EngineError::StructureParse { .. })
        ));
    }

    #[test]
    fn netcdf_coordinates_skip_the_count_check() {
        let (dir, parm7, _) = write_system(&[ALA]);
        let binary = dir.path().join("step9.rst7");
        fs::write(&binary, b"CDF\x01binary").unwrap();
        assert!(SystemDescriptor::build(&parm7, &binary).is_ok());
    }

    #[test]
    fn malformed_topology_is_a_structure_parse_error() {
        let (dir, _, rst7) = write_system(&[ALA]);
        let bad = dir.path().join("bad.parm7");
        fs::write(&bad, "%FLAG TITLE\n%FORMAT(20a4)\nnothing\n").unwrap();
        assert!(matches!(
            SystemDescriptor::build(&bad, &rst7),
            Err(EngineError::StructureParse { .. })
        ));
    }
}
