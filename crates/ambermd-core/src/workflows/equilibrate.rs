use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::core::descriptor::{RestraintMasks, SystemDescriptor};
use crate::engine::config::SimulationConfig;
pub use crate::engine::config::STEPS_PER_NS;
use crate::engine::context::WorkflowContext;
use crate::engine::error::EngineError;
use crate::engine::pipeline::{ExecutionContext, Pipeline};
use crate::engine::progress::Progress;
use crate::engine::stage::{ArtifactRef, StageId, StageSpec};
use crate::engine::toolchain::Tool;

const HEATING_STEPS: u64 = 15_000;
const HEATING_TAUTP: f64 = 0.5;
const BACKBONE_RELAX_STEPS: u64 = 10_000;
const LONG_TIME_STEP: f64 = 0.002;
const COM_REMOVAL_INTERVAL: u64 = 1000;
const PRODUCTION_TRAJECTORY_INTERVAL: u64 = 50_000;

/// Which restart file the production stage restrains against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestraintAnchor {
    /// The fully minimized structure (`step5`).
    Minimized,
    /// The last relaxation stage (`step9`).
    Relaxed,
}

/// How the production stage is named and anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionPlan {
    pub name: &'static str,
    pub anchor: RestraintAnchor,
}

impl ProductionPlan {
    pub const EQUILIBRATION: Self = Self {
        name: "Md",
        anchor: RestraintAnchor::Minimized,
    };

    pub const BINDING: Self = Self {
        name: "md",
        anchor: RestraintAnchor::Relaxed,
    };
}

/// The stages later steps need to refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolStages {
    pub minimized: StageId,
    pub relaxed: StageId,
    pub production: StageId,
}

/// Builds the restraint-relaxation protocol followed by one production stage.
///
/// Restraints loosen stage by stage from heavy atoms at 5.0 kcal/mol/Å² to
/// none. From `step7` on, restraints are measured against the minimized
/// `step5` structure rather than the previous restart.
pub fn build_protocol(
    masks: &RestraintMasks,
    config: &SimulationConfig,
    plan: ProductionPlan,
) -> Result<(Pipeline, ProtocolStages), EngineError> {
    use ArtifactRef::{Initial, Stage};

    let t = config.temperature;
    let cut = config.cutoff;
    let mut p = Pipeline::new();

    let step1 = p.push(
        StageSpec::minimization("step1", Initial, Initial)
            .restrained(&masks.heavy, 5.0)
            .cutoff(cut),
    )?;
    let step2 = p.push(
        StageSpec::nvt("step2", Stage(step1), Stage(step1), t)
            .restrained(&masks.heavy, 5.0)
            .steps(HEATING_STEPS)
            .tautp(HEATING_TAUTP)
            .heating_from(0.0)
            .cutoff(cut),
    )?;
    let step3 = p.push(
        StageSpec::minimization("step3", Stage(step2), Stage(step2))
            .restrained(&masks.heavy, 2.0)
            .cutoff(cut),
    )?;
    let step4 = p.push(
        StageSpec::minimization("step4", Stage(step3), Stage(step3))
            .restrained(&masks.backbone, 0.1)
            .cutoff(cut),
    )?;
    let step5 = p.push(StageSpec::minimization("step5", Stage(step4), Stage(step4)).cutoff(cut))?;
    let step6 = p.push(
        StageSpec::npt("step6", Stage(step5), Stage(step5), t)
            .restrained(&masks.heavy, 1.0)
            .cutoff(cut),
    )?;
    let step7 = p.push(
        StageSpec::npt("step7", Stage(step6), Stage(step5), t)
            .restarting()
            .restrained(&masks.heavy, 0.5)
            .cutoff(cut),
    )?;
    let step8 = p.push(
        StageSpec::npt("step8", Stage(step7), Stage(step5), t)
            .restarting()
            .restrained(&masks.backbone, 0.5)
            .steps(BACKBONE_RELAX_STEPS)
            .cutoff(cut),
    )?;
    let step9 = p.push(
        StageSpec::npt("step9", Stage(step8), Stage(step5), t)
            .restarting()
            .time_step(LONG_TIME_STEP)
            .com_removal(COM_REMOVAL_INTERVAL)
            .cutoff(cut),
    )?;

    let anchor = match plan.anchor {
        RestraintAnchor::Minimized => step5,
        RestraintAnchor::Relaxed => step9,
    };
    let production = p.push(
        StageSpec::npt(plan.name, Stage(step9), Stage(anchor), t)
            .restarting()
            .time_step(LONG_TIME_STEP)
            .com_removal(COM_REMOVAL_INTERVAL)
            .steps(config.production_ns * STEPS_PER_NS)
            .trajectory_interval(PRODUCTION_TRAJECTORY_INTERVAL)
            .cutoff(cut),
    )?;

    Ok((
        p,
        ProtocolStages {
            minimized: step5,
            relaxed: step9,
            production,
        },
    ))
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub descriptor: SystemDescriptor,
    /// Restart file of the last relaxation stage.
    pub relaxed_coordinates: PathBuf,
    /// Restart file of the production stage.
    pub final_coordinates: PathBuf,
    pub trajectory: PathBuf,
}

/// Equilibrates a prepared system and runs production MD.
#[instrument(skip_all, name = "equilibration_workflow")]
pub fn run(
    ctx: &WorkflowContext<'_>,
    topology: &Path,
    coordinates: &Path,
    config: &SimulationConfig,
) -> Result<SimulationResult, EngineError> {
    let topology = ctx.absolute(topology)?;
    let coordinates = ctx.absolute(coordinates)?;

    ctx.reporter.report(Progress::PhaseStart {
        name: "Analyzing System",
    });
    let descriptor = SystemDescriptor::build(&topology, &coordinates)?;
    let masks = descriptor.masks_with(config.extra_mask.as_deref());
    info!(heavy = %masks.heavy, backbone = %masks.backbone, "Restraint masks");
    ctx.reporter.report(Progress::PhaseFinish);

    run_protocol(ctx, descriptor, &masks, config, ProductionPlan::EQUILIBRATION)
}

/// Runs the protocol for an already described system.
pub(crate) fn run_protocol(
    ctx: &WorkflowContext<'_>,
    descriptor: SystemDescriptor,
    masks: &RestraintMasks,
    config: &SimulationConfig,
    plan: ProductionPlan,
) -> Result<SimulationResult, EngineError> {
    let (mut pipeline, stages) = build_protocol(masks, config, plan)?;
    let engine = ctx.toolchain.path(Tool::Engine)?;

    ctx.reporter.report(Progress::PhaseStart {
        name: "Running MD Protocol",
    });
    info!(
        stages = pipeline.len(),
        production_ns = config.production_ns,
        temperature = config.temperature,
        "Starting MD protocol"
    );

    let exec = ExecutionContext {
        runner: ctx.runner(),
        engine,
        workdir: ctx.workdir,
        topology: descriptor.topology(),
        initial_coordinates: descriptor.coordinates(),
        charmm_water: descriptor.has_charmm_water(),
        reporter: ctx.reporter,
    };
    let final_coordinates = pipeline.execute(&exec)?;
    ctx.reporter.report(Progress::PhaseFinish);

    let relaxed_coordinates = pipeline
        .stage(stages.relaxed)
        .map(|spec| ctx.workdir.join(spec.output_artifact()))
        .ok_or_else(|| EngineError::InvalidPipeline("relaxation stage is missing".to_string()))?;
    let trajectory = pipeline
        .stage(stages.production)
        .and_then(|spec| spec.trajectory_file())
        .map(|name| ctx.workdir.join(name))
        .ok_or_else(|| {
            EngineError::InvalidPipeline("production stage writes no trajectory".to_string())
        })?;

    info!(output = %final_coordinates.display(), "MD protocol complete");
    Ok(SimulationResult {
        descriptor,
        relaxed_coordinates,
        final_coordinates,
        trajectory,
    })
}
