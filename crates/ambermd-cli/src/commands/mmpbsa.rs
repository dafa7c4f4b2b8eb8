use crate::cli::{Cli, MmpbsaArgs};
use crate::config::build_mmpbsa_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ambermd::{
    engine::{
        context::WorkflowContext,
        progress::ProgressReporter,
        runner::ProcessExecutor,
        toolchain::{Tool, Toolchain},
    },
    workflows,
};
use tracing::{info, warn};

pub async fn run(cli: &Cli, args: &MmpbsaArgs) -> Result<()> {
    let config = build_mmpbsa_config(cli, args)?;

    info!("Resolving external tools...");
    let toolchain = Toolchain::resolve(&config.tools, Tool::BINDING)?;

    super::ensure_input(&config.protein, "protein")?;
    if let Some(ligand) = &config.ligand {
        super::ensure_input(ligand, "ligand")?;
    }
    super::prepare_workdir(&config.workdir)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let executor = ProcessExecutor;
    let ctx = WorkflowContext::new(&config.workdir, &toolchain, &executor, &reporter);

    println!(
        "Starting MM-PBSA workflow ({} K, {} ns production, {} MPI processes)...",
        config.simulation.temperature,
        config.simulation.production_ns,
        config.free_energy.processes
    );
    info!("Invoking the core binding free-energy workflow...");

    let result = tokio::task::block_in_place(|| {
        workflows::binding::run(
            &ctx,
            &config.protein,
            config.ligand.as_deref(),
            &config.simulation,
            &config.preparation,
            &config.free_energy,
        )
    })?;

    let free_energy = &result.free_energy;
    if free_energy.results.is_file() {
        println!(
            "✓ Binding free energy written to: {}",
            free_energy.results.display()
        );
        println!(
            "  Per-residue decomposition: {}",
            free_energy.decomposition.display()
        );
    } else {
        warn!("MM-PBSA finished without a results file.");
        println!(
            "Warning: no results file found in {}",
            free_energy.output_dir.display()
        );
    }
    println!(
        "  Production trajectory: {}",
        result.simulation.trajectory.display()
    );

    Ok(())
}
