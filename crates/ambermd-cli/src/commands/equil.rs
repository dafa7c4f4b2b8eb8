use crate::cli::{Cli, EquilArgs};
use crate::config::build_equil_config;
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
use tracing::info;

pub async fn run(cli: &Cli, args: &EquilArgs) -> Result<()> {
    let config = build_equil_config(cli, args)?;

    info!("Resolving external tools...");
    let toolchain = Toolchain::resolve(&config.tools, Tool::EQUILIBRATION)?;

    super::ensure_input(&config.topology, "topology")?;
    super::ensure_input(&config.coordinates, "coordinates")?;
    super::prepare_workdir(&config.workdir)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let executor = ProcessExecutor;
    let ctx = WorkflowContext::new(&config.workdir, &toolchain, &executor, &reporter);

    println!(
        "Starting equilibration ({} K, {} ns production)...",
        config.simulation.temperature, config.simulation.production_ns
    );
    info!("Invoking the core equilibration workflow...");

    let result = tokio::task::block_in_place(|| {
        workflows::equilibrate::run(
            &ctx,
            &config.topology,
            &config.coordinates,
            &config.simulation,
        )
    })?;

    println!(
        "✓ Final coordinates written to: {}",
        result.final_coordinates.display()
    );
    println!("  Trajectory: {}", result.trajectory.display());

    Ok(())
}
