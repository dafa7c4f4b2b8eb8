use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::core::io::mol2::{Mol2Error, Mol2File};
use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::traits::MolecularFile;
use crate::core::topology::vocabulary::{is_solvent_residue, is_supported_residue};
use crate::engine::config::PreparationConfig;
use crate::engine::context::WorkflowContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::runner::RunOptions;
use crate::engine::toolchain::Tool;

pub const PROTEIN_FILE: &str = "pro.pdb";
pub const LIGAND_FILE: &str = "mol.mol2";
pub const LEAP_INPUT: &str = "leap.in";

const SINGLE_LIGAND_ONLY: &str =
    "Only a single ligand system is supported, or you can prepare your own system.";
const LIGAND_CHARGE_HINT: &str =
    "Perhaps you should check the charge of the ligand and the correctness of the hydrogen atom.";

/// A complex split into its receptor and its single ligand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitStructure {
    pub protein: PathBuf,
    pub ligand: PathBuf,
    pub ligand_name: String,
    pub protein_atoms: usize,
    pub ligand_atoms: usize,
    /// Water and ion atoms dropped before splitting.
    pub solvent_atoms: usize,
}

/// Splits a protein-ligand complex PDB into `pro.pdb` and `mol.mol2` inside
/// `workdir`.
///
/// Water and ions are stripped first. Every remaining residue whose name
/// (cut to three characters) the stock force fields do not cover is taken to
/// be the ligand; exactly one such name must exist.
///
/// # Errors
///
/// [`EngineError::UnsupportedSystem`] when there is no ligand or more than one
/// distinct ligand name, [`EngineError::StructureParse`] for a malformed PDB.
#[instrument(skip_all, name = "split_structure")]
pub fn split_structure(workdir: &Path, complex: &Path) -> Result<SplitStructure, EngineError> {
    let (mut system, _) = PdbFile::read_from_path(complex).map_err(|e| pdb_error(complex, e))?;
    let solvent_atoms = system.retain_residues(|residue| !is_solvent_residue(residue.short_name()));

    let ligand_names: BTreeSet<String> = system
        .residues_in_order()
        .map(|(_, residue)| residue.short_name())
        .filter(|name| !is_supported_residue(name))
        .map(str::to_string)
        .collect();
    debug!(?ligand_names, "Non-standard residues");

    let ligand_name = match ligand_names.len() {
        0 => {
            return Err(EngineError::UnsupportedSystem(format!(
                "no ligand residue found in '{}'",
                complex.display()
            )));
        }
        1 => ligand_names.into_iter().next().unwrap_or_default(),
        _ => return Err(EngineError::UnsupportedSystem(SINGLE_LIGAND_ONLY.to_string())),
    };

    let mut ligand = system.clone();
    let ligand_atoms = system.retain_residues(|residue| residue.short_name() != ligand_name);
    let protein_atoms = ligand.retain_residues(|residue| residue.short_name() == ligand_name);

    let protein_path = workdir.join(PROTEIN_FILE);
    let ligand_path = workdir.join(LIGAND_FILE);
    PdbFile::write_system_to_path(&system, &protein_path)
        .map_err(|e| pdb_error(&protein_path, e))?;
    Mol2File::write_system_to_path(&ligand, &ligand_path)
        .map_err(|e| mol2_error(&ligand_path, e))?;

    info!(
        ligand = %ligand_name,
        protein_atoms,
        ligand_atoms,
        solvent_atoms,
        "Split complex into receptor and ligand"
    );

    Ok(SplitStructure {
        protein: protein_path,
        ligand: ligand_path,
        ligand_name,
        protein_atoms,
        ligand_atoms,
        solvent_atoms,
    })
}

/// A solvated, neutralized system ready for the MD protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSystem {
    pub topology: PathBuf,
    pub coordinates: PathBuf,
}

/// Parameterizes the ligand, cleans the protein and builds the solvated
/// complex topology with the system builder.
///
/// Outputs `<protein stem>_<ligand stem>.parm7` and `.rst7` in the working
/// directory.
#[instrument(skip_all, name = "build_topology")]
pub fn build_topology(
    ctx: &WorkflowContext<'_>,
    protein: &Path,
    ligand: &Path,
    config: &PreparationConfig,
) -> Result<PreparedSystem, EngineError> {
    let protein = ctx.absolute(protein)?;
    let ligand = ctx.absolute(ligand)?;
    let protein_stem = file_stem(&protein)?;
    let ligand_stem = file_stem(&ligand)?;
    let cleaned = format!("_{}", file_name(&protein)?);
    let runner = ctx.runner();

    info!(protein = %protein.display(), "Cleaning protein");
    let pdb4amber = ctx
        .command(Tool::Pdb4amber)?
        .arg("-i")
        .path_arg(&protein)
        .arg("-o")
        .arg(&cleaned)
        .args(["-y", "-d", "-p"]);
    runner.run(&pdb4amber)?;

    info!(
        ligand = %ligand.display(),
        charge = config.ligand_charge,
        multiplicity = config.ligand_multiplicity,
        "Parameterizing ligand"
    );
    let acpype = ctx
        .command(Tool::Acpype)?
        .arg("-i")
        .path_arg(&ligand)
        .arg("-c")
        .arg(config.ligand_charge.to_string())
        .arg("-m")
        .arg(config.ligand_multiplicity.to_string());
    runner.run_with(&acpype, RunOptions::with_message(LIGAND_CHARGE_HINT))?;

    let system_stem = format!("{}_{}", protein_stem, ligand_stem);
    let prepared = PreparedSystem {
        topology: ctx.workdir.join(format!("{}.parm7", system_stem)),
        coordinates: ctx.workdir.join(format!("{}.rst7", system_stem)),
    };

    let leap_in = render_leap_input(config, &cleaned, ligand_stem, &system_stem);
    debug!("System builder input:\n{}", leap_in);
    ctx.write_input(ctx.workdir, LEAP_INPUT, &leap_in)?;

    info!("Building solvated complex");
    let tleap = ctx.command(Tool::Tleap)?.args(["-f", LEAP_INPUT]);
    runner.run(&tleap)?;

    for path in [&prepared.topology, &prepared.coordinates] {
        if !path.is_file() {
            return Err(EngineError::MissingArtifact {
                stage: Tool::Tleap.name().to_string(),
                path: path.clone(),
            });
        }
    }
    info!(topology = %prepared.topology.display(), "System prepared");
    Ok(prepared)
}

/// Splits the complex when no ligand file is given, then builds the topology.
pub fn prepare_complex(
    ctx: &WorkflowContext<'_>,
    protein: &Path,
    ligand: Option<&Path>,
    config: &PreparationConfig,
) -> Result<PreparedSystem, EngineError> {
    ctx.reporter.report(Progress::PhaseStart {
        name: "Preparing System",
    });
    let prepared = match ligand {
        Some(ligand) => build_topology(ctx, protein, ligand, config)?,
        None => {
            let complex = ctx.absolute(protein)?;
            let split = split_structure(ctx.workdir, &complex)?;
            build_topology(ctx, &split.protein, &split.ligand, config)?
        }
    };
    ctx.reporter.report(Progress::PhaseFinish);
    Ok(prepared)
}

fn render_leap_input(
    config: &PreparationConfig,
    cleaned_protein: &str,
    ligand_stem: &str,
    system_stem: &str,
) -> String {
    let mut out = String::new();
    // Writes to a String cannot fail.
    let _ = write_leap_input(&mut out, config, cleaned_protein, ligand_stem, system_stem);
    out
}

fn write_leap_input(
    out: &mut String,
    config: &PreparationConfig,
    cleaned_protein: &str,
    ligand_stem: &str,
    system_stem: &str,
) -> std::fmt::Result {
    for force_field in &config.force_fields {
        writeln!(out, "source {}", force_field)?;
    }
    writeln!(out, "pro = loadpdb {}", cleaned_protein)?;
    writeln!(out, "loadamberparams {0}.acpype/{0}_AC.frcmod", ligand_stem)?;
    writeln!(out, "mol = loadmol2 {0}.acpype/{0}_bcc_gaff2.mol2", ligand_stem)?;
    writeln!(out, "com = combine{{pro mol}}")?;
    writeln!(out, "solvatebox com {} {:?}", config.water_box, config.box_margin)?;
    writeln!(out, "addions2 com Na+ 0")?;
    writeln!(out, "addions2 com Cl- 0")?;
    writeln!(out, "saveamberparm com {0}.parm7 {0}.rst7", system_stem)?;
    writeln!(out, "quit")
}

fn file_stem(path: &Path) -> Result<&str, EngineError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| EngineError::structure(path, "file name is not valid UTF-8"))
}

fn file_name(path: &Path) -> Result<&str, EngineError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| EngineError::structure(path, "file name is not valid UTF-8"))
}

fn pdb_error(path: &Path, error: PdbError) -> EngineError {
    match error {
        PdbError::Io(source) => EngineError::io(path, source),
        other => EngineError::structure(path, other),
    }
}

fn mol2_error(path: &Path, error: Mol2Error) -> EngineError {
    match error {
        Mol2Error::Io(source) => EngineError::io(path, source),
        other => EngineError::structure(path, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::PreparationConfigBuilder;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::runner::testing::RecordingExecutor;
    use crate::engine::toolchain::{ToolNames, Toolchain};
    use std::fs;
    use tempfile::tempdir;

    const COMPLEX: &str = "\
ATOM      1  N   ALA A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  C   ALA A   1      13.149   6.232  -5.148  1.00  0.00           C
ATOM      4  O   ALA A   1      13.743   6.017  -6.196  1.00  0.00           O
ATOM      5  N   GLY A   2      13.777   6.630  -4.040  1.00  0.00           N
ATOM      6  CA  GLY A   2      15.218   6.818  -3.993  1.00  0.00           C
TER
HETATM    7  C1  LIG B   1       5.000   1.000   1.000  1.00  0.00           C
HETATM    8  O1  LIG B   1       6.200   1.000   1.000  1.00  0.00           O
HETATM    9  H1  LIG B   1       4.500   1.900   1.000  1.00  0.00           H
HETATM   10  O   HOH W   1       0.000   0.000   0.000  1.00  0.00           O
HETATM   11 NA    NA I   1       9.000   9.000   9.000  1.00  0.00          NA
CONECT    7    8    9
CONECT    8    7
CONECT    9    7
END
";

    fn prep_config() -> PreparationConfig {
        PreparationConfigBuilder::new()
            .ligand_charge(-1)
            .ligand_multiplicity(1)
            .build()
            .unwrap()
    }

    #[test]
    fn split_separates_protein_ligand_and_solvent() {
        let dir = tempdir().unwrap();
        let complex = dir.path().join("complex.pdb");
        fs::write(&complex, COMPLEX).unwrap();

        let split = split_structure(dir.path(), &complex).unwrap();

        assert_eq!(split.ligand_name, "LIG");
        assert_eq!(split.protein_atoms, 6);
        assert_eq!(split.ligand_atoms, 3);
        assert_eq!(split.solvent_atoms, 2);
        assert_eq!(split.protein_atoms + split.ligand_atoms + split.solvent_atoms, 11);

        let (protein, _) = PdbFile::read_from_path(&split.protein).unwrap();
        assert_eq!(protein.atom_count(), 6);
        assert!(
            protein
                .residues_in_order()
                .all(|(_, r)| r.name == "ALA" || r.name == "GLY")
        );

        let (ligand, _) = Mol2File::read_from_path(&split.ligand).unwrap();
        assert_eq!(ligand.atom_count(), 3);
        assert_eq!(ligand.bonds().len(), 2);
        let names: Vec<_> = ligand.atoms_in_order().map(|(_, a)| a.name.clone()).collect();
        assert_eq!(names, vec!["C1", "O1", "H1"]);
    }

    #[test]
    fn two_distinct_ligands_are_unsupported() {
        let dir = tempdir().unwrap();
        let complex = dir.path().join("complex.pdb");
        let second = "HETATM   12  C1  DRG C   1       7.000   1.000   1.000  1.00  0.00           C\n";
        fs::write(&complex, COMPLEX.replace("CONECT    7", &format!("{second}CONECT    7"))).unwrap();

        let err = split_structure(dir.path(), &complex).unwrap_err();
        match err {
            EngineError::UnsupportedSystem(message) => assert_eq!(message, SINGLE_LIGAND_ONLY),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join(PROTEIN_FILE).exists());
    }

    #[test]
    fn protein_without_ligand_is_unsupported() {
        let dir = tempdir().unwrap();
        let complex = dir.path().join("apo.pdb");
        let apo: String = COMPLEX
            .lines()
            .filter(|line| !line.contains("LIG") && !line.starts_with("CONECT"))
            .map(|line| format!("{line}\n"))
            .collect();
        fs::write(&complex, apo).unwrap();

        assert!(matches!(
            split_structure(dir.path(), &complex),
            Err(EngineError::UnsupportedSystem(_))
        ));
    }

    #[test]
    fn malformed_complex_is_a_structure_parse_error() {
        let dir = tempdir().unwrap();
        let complex = dir.path().join("broken.pdb");
        fs::write(&complex, "ATOM      1  N   ALA A   1      xx.xxx   6.134  -6.504\n").unwrap();
        assert!(matches!(
            split_structure(dir.path(), &complex),
            Err(EngineError::StructureParse { .. })
        ));
    }

    #[test]
    fn build_topology_runs_cleaner_parameterizer_and_builder_in_order() {
        let dir = tempdir().unwrap();
        let workdir = dir.path().to_path_buf();
        let hook_dir = workdir.clone();
        let executor = RecordingExecutor::new().with_hook(move |command| {
            if command.program_name() == "tleap" {
                fs::write(hook_dir.join("pro_mol.parm7"), "").unwrap();
                fs::write(hook_dir.join("pro_mol.rst7"), "").unwrap();
            }
        });
        let toolchain = Toolchain::unresolved(&ToolNames::default(), Tool::PREPARATION);
        let reporter = ProgressReporter::new();
        let ctx = WorkflowContext::new(&workdir, &toolchain, &executor, &reporter);

        let protein = workdir.join("pro.pdb");
        let ligand = workdir.join("mol.mol2");
        let prepared = build_topology(&ctx, &protein, &ligand, &prep_config()).unwrap();

        assert_eq!(prepared.topology, workdir.join("pro_mol.parm7"));
        assert_eq!(prepared.coordinates, workdir.join("pro_mol.rst7"));

        let calls = executor.calls();
        let programs: Vec<_> = calls.iter().map(|c| c.program_name()).collect();
        assert_eq!(programs, vec!["pdb4amber", "acpype", "tleap"]);
        assert_eq!(calls[0].flag_value("-o"), Some("_pro.pdb"));
        assert_eq!(calls[0].args[4..], ["-y", "-d", "-p"]);
        assert_eq!(calls[1].flag_value("-i"), Some(ligand.to_str().unwrap()));
        assert_eq!(calls[1].flag_value("-c"), Some("-1"));
        assert_eq!(calls[1].flag_value("-m"), Some("1"));
        assert_eq!(calls[2].args, ["-f", "leap.in"]);

        let leap_in = fs::read_to_string(workdir.join(LEAP_INPUT)).unwrap();
        assert_eq!(
            leap_in,
            "source leaprc.protein.ff14SB\n\
             source leaprc.DNA.OL15\n\
             source leaprc.RNA.OL3\n\
             source leaprc.water.tip3p\n\
             source leaprc.gaff2\n\
             pro = loadpdb _pro.pdb\n\
             loadamberparams mol.acpype/mol_AC.frcmod\n\
             mol = loadmol2 mol.acpype/mol_bcc_gaff2.mol2\n\
             com = combine{pro mol}\n\
             solvatebox com TIP3PBOX 10.0\n\
             addions2 com Na+ 0\n\
             addions2 com Cl- 0\n\
             saveamberparm com pro_mol.parm7 pro_mol.rst7\n\
             quit\n"
        );
    }

    #[test]
    fn ligand_parameterization_failure_carries_the_charge_hint() {
        let dir = tempdir().unwrap();
        let executor = RecordingExecutor::new().fail_on("acpype");
        let toolchain = Toolchain::unresolved(&ToolNames::default(), Tool::PREPARATION);
        let reporter = ProgressReporter::new();
        let ctx = WorkflowContext::new(dir.path(), &toolchain, &executor, &reporter);

        let err = build_topology(
            &ctx,
            &dir.path().join("pro.pdb"),
            &dir.path().join("mol.mol2"),
            &prep_config(),
        )
        .unwrap_err();

        match err {
            EngineError::JobExecution { message, .. } => assert_eq!(message, LIGAND_CHARGE_HINT),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.calls().len(), 2);
        assert!(!dir.path().join(LEAP_INPUT).exists());
    }

    #[test]
    fn builder_without_outputs_is_a_missing_artifact() {
        let dir = tempdir().unwrap();
        let executor = RecordingExecutor::new();
        let toolchain = Toolchain::unresolved(&ToolNames::default(), Tool::PREPARATION);
        let reporter = ProgressReporter::new();
        let ctx = WorkflowContext::new(dir.path(), &toolchain, &executor, &reporter);

        let err = build_topology(
            &ctx,
            &dir.path().join("pro.pdb"),
            &dir.path().join("mol.mol2"),
            &prep_config(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MissingArtifact { ref stage, .. } if stage == "tleap"));
    }

    #[test]
    fn prepare_complex_splits_when_no_ligand_is_given() {
        let dir = tempdir().unwrap();
        let workdir = dir.path().to_path_buf();
        let complex = workdir.join("complex.pdb");
        fs::write(&complex, COMPLEX).unwrap();
        let hook_dir = workdir.clone();
        let executor = RecordingExecutor::new().with_hook(move |command| {
            if command.program_name() == "tleap" {
                fs::write(hook_dir.join("pro_mol.parm7"), "").unwrap();
                fs::write(hook_dir.join("pro_mol.rst7"), "").unwrap();
            }
        });
        let toolchain = Toolchain::unresolved(&ToolNames::default(), Tool::PREPARATION);
        let reporter = ProgressReporter::new();
        let ctx = WorkflowContext::new(&workdir, &toolchain, &executor, &reporter);

        let prepared = prepare_complex(&ctx, &complex, None, &prep_config()).unwrap();

        assert_eq!(prepared.topology, workdir.join("pro_mol.parm7"));
        assert!(workdir.join(PROTEIN_FILE).is_file());
        assert!(workdir.join(LIGAND_FILE).is_file());
        assert_eq!(
            executor.calls()[0].flag_value("-i"),
            Some(workdir.join(PROTEIN_FILE).to_str().unwrap())
        );
    }
}
