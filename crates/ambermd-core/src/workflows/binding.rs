use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::equilibrate::{self, ProductionPlan, SimulationResult};
use super::prepare::{self, PreparedSystem};
use crate::core::descriptor::SystemDescriptor;
use crate::engine::config::{FreeEnergyConfig, PreparationConfig, SimulationConfig};
use crate::engine::context::WorkflowContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::runner::CommandSpec;
use crate::engine::toolchain::Tool;

pub const PARMED_INPUT: &str = "parmed.in";
pub const CPPTRAJ_INPUT: &str = "cpptraj.in";
pub const MMPBSA_DIR: &str = "MMPBSA";
pub const MMPBSA_INPUT: &str = "mmpbsa.in";
pub const INDEX_FILE: &str = "index.ndx";

const RESULTS_FILE: &str = "FINAL_RESULTS_MMPBSA.dat";
const DECOMPOSITION_FILE: &str = "FINAL_DECOMP_MMPBSA.dat";

// Default GROMACS index groups: 1 is the protein, 13 the ligand (`Other`).
const RECEPTOR_GROUP: &str = "1";
const LIGAND_GROUP: &str = "13";

const MMPBSA_SETTINGS: &str = "\
&general
  startframe=1, endframe=99999, verbose=2, interval=1,
/
&gb
  igb=5,
/
&pb
  istrng=0.1500, inp=1, radiopt=0,
/
&decomp
  idecomp=2, dec_verbose=3,
  print_res=\"within 4\",
/
";

/// Files produced by the MM-PBSA decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeEnergyResult {
    pub output_dir: PathBuf,
    pub gromacs_topology: PathBuf,
    pub reference_structure: PathBuf,
    pub trajectory: PathBuf,
    pub results: PathBuf,
    pub decomposition: PathBuf,
}

/// Converts the production run to GROMACS formats and runs the per-residue
/// MM-PBSA decomposition on it.
///
/// `coordinates` provides the reference frame, `trajectory` the production
/// frames. Everything is written next to `topology` except the MM-PBSA
/// inputs and outputs, which go to `MMPBSA/` under the working directory.
#[instrument(skip_all, name = "binding_free_energy")]
pub fn compute_binding_free_energy(
    ctx: &WorkflowContext<'_>,
    topology: &Path,
    coordinates: &Path,
    trajectory: &Path,
    descriptor: &SystemDescriptor,
    config: &FreeEnergyConfig,
) -> Result<FreeEnergyResult, EngineError> {
    let topology = ctx.absolute(topology)?;
    let coordinates = ctx.absolute(coordinates)?;
    let trajectory = ctx.absolute(trajectory)?;
    let runner = ctx.runner();

    let gromacs_topology = topology.with_extension("top");
    let reference_structure = topology.with_extension("pdb");
    let xtc = topology.with_extension("xtc");

    if gromacs_topology.is_file() {
        debug!(path = %gromacs_topology.display(), "Reusing GROMACS topology");
    } else {
        info!("Converting topology to GROMACS format");
        let script = format!(
            "parm {}\nloadRestrt {}\ngromber {}\n",
            topology.display(),
            coordinates.display(),
            gromacs_topology.display()
        );
        ctx.write_input(ctx.workdir, PARMED_INPUT, &script)?;
        runner.run(&ctx.command(Tool::Parmed)?.args(["-i", PARMED_INPUT]))?;
        require(Tool::Parmed, &gromacs_topology)?;
    }

    info!("Re-imaging trajectory");
    let solute = format!(":1-{}", descriptor.protein_residue_count());
    let script = format!(
        "parm {top}\n\
         trajin {rst}\n\
         trajout {pdb}\n\
         go\n\
         trajin {nc}\n\
         unwrap {solute}\n\
         center {solute} mass origin\n\
         image center origin familiar\n\
         trajout {xtc}\n\
         go\n\
         exit\n",
        top = topology.display(),
        rst = coordinates.display(),
        pdb = reference_structure.display(),
        nc = trajectory.display(),
        solute = solute,
        xtc = xtc.display(),
    );
    debug!("Trajectory processing input:\n{}", script);
    ctx.write_input(ctx.workdir, CPPTRAJ_INPUT, &script)?;
    runner.run(&ctx.command(Tool::Cpptraj)?.args(["-i", CPPTRAJ_INPUT]))?;
    require(Tool::Cpptraj, &reference_structure)?;
    require(Tool::Cpptraj, &xtc)?;

    let output_dir = ctx.workdir.join(MMPBSA_DIR);
    fs::create_dir_all(&output_dir).map_err(|e| EngineError::io(&output_dir, e))?;

    let make_ndx = CommandSpec::new(ctx.toolchain.path(Tool::Gmx)?, &output_dir)
        .args(["make_ndx", "-f"])
        .path_arg(&reference_structure)
        .args(["-o", INDEX_FILE])
        .stdin("q\n");
    runner.run(&make_ndx)?;

    ctx.write_input(&output_dir, MMPBSA_INPUT, MMPBSA_SETTINGS)?;

    info!(processes = config.processes, "Running MM-PBSA decomposition");
    let mmpbsa = CommandSpec::new(ctx.toolchain.path(Tool::Mpirun)?, &output_dir)
        .arg("-np")
        .arg(config.processes.to_string())
        .path_arg(ctx.toolchain.path(Tool::GmxMmpbsa)?)
        .args(["MPI", "-O", "-i", MMPBSA_INPUT, "-cs"])
        .path_arg(&reference_structure)
        .args(["-ci", INDEX_FILE, "-cg", RECEPTOR_GROUP, LIGAND_GROUP, "-ct"])
        .path_arg(&xtc)
        .arg("-cp")
        .path_arg(&gromacs_topology)
        .arg("-nogui");
    runner.run(&mmpbsa)?;

    let results = output_dir.join(RESULTS_FILE);
    if !results.is_file() {
        warn!(path = %results.display(), "MM-PBSA finished without a results file");
    }

    Ok(FreeEnergyResult {
        decomposition: output_dir.join(DECOMPOSITION_FILE),
        results,
        output_dir,
        gromacs_topology,
        reference_structure,
        trajectory: xtc,
    })
}

fn require(tool: Tool, path: &Path) -> Result<(), EngineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(EngineError::MissingArtifact {
            stage: tool.name().to_string(),
            path: path.to_path_buf(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct BindingResult {
    pub prepared: PreparedSystem,
    pub simulation: SimulationResult,
    pub free_energy: FreeEnergyResult,
}

/// Prepares a protein-ligand complex, runs the MD protocol on it and
/// computes the binding free energy of the production trajectory.
///
/// Without `ligand` the complex in `protein` is split first.
#[instrument(skip_all, name = "binding_workflow")]
pub fn run(
    ctx: &WorkflowContext<'_>,
    protein: &Path,
    ligand: Option<&Path>,
    simulation: &SimulationConfig,
    preparation: &PreparationConfig,
    free_energy: &FreeEnergyConfig,
) -> Result<BindingResult, EngineError> {
    let prepared = prepare::prepare_complex(ctx, protein, ligand, preparation)?;

    ctx.reporter.report(Progress::PhaseStart {
        name: "Analyzing System",
    });
    let descriptor = SystemDescriptor::build(&prepared.topology, &prepared.coordinates)?;
    let masks = descriptor.masks_with(simulation.extra_mask.as_deref());
    ctx.reporter.report(Progress::PhaseFinish);

    let simulation = equilibrate::run_protocol(
        ctx,
        descriptor,
        &masks,
        simulation,
        ProductionPlan::BINDING,
    )?;

    ctx.reporter.report(Progress::PhaseStart {
        name: "Computing Binding Free Energy",
    });
    let free_energy = compute_binding_free_energy(
        ctx,
        &prepared.topology,
        &simulation.relaxed_coordinates,
        &simulation.trajectory,
        &simulation.descriptor,
        free_energy,
    )?;
    ctx.reporter.report(Progress::PhaseFinish);

    info!(results = %free_energy.results.display(), "Binding free energy workflow complete");
    Ok(BindingResult {
        prepared,
        simulation,
        free_energy,
    })
}
