use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::runner::JobRunner;
use super::stage::{ArtifactRef, StageId, StageSpec, StageState};

/// Everything a pipeline needs from the outside world to run its stages.
pub struct ExecutionContext<'a> {
    pub runner: JobRunner<'a>,
    pub engine: &'a Path,
    pub workdir: &'a Path,
    pub topology: &'a Path,
    pub initial_coordinates: &'a Path,
    pub charmm_water: bool,
    pub reporter: &'a ProgressReporter<'a>,
}

/// An ordered chain of stages connected through their restart files.
///
/// Every stage starts from the restart file of the stage declared right
/// before it (the first from the initial coordinates). Restraint references
/// may point at any earlier stage.
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: SlotMap<StageId, StageSpec>,
    states: SecondaryMap<StageId, StageState>,
    order: Vec<StageId>,
    names: HashSet<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage after validating how it is wired into the chain.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPipeline`] if the name is empty or already
    /// used, if the reference is not the previous stage's output, or if the
    /// restraint reference names a stage that has not been declared.
    pub fn push(&mut self, spec: StageSpec) -> Result<StageId, EngineError> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::InvalidPipeline(
                "stage names must not be empty".to_string(),
            ));
        }
        if self.names.contains(&spec.name) {
            return Err(EngineError::InvalidPipeline(format!(
                "duplicate stage name '{}'",
                spec.name
            )));
        }

        let expected = match self.order.last() {
            Some(&previous) => ArtifactRef::Stage(previous),
            None => ArtifactRef::Initial,
        };
        if spec.reference != expected {
            return Err(EngineError::InvalidPipeline(format!(
                "stage '{}' must start from {}",
                spec.name,
                self.describe(expected)
            )));
        }
        if let ArtifactRef::Stage(id) = spec.restraint_reference {
            if !self.stages.contains_key(id) {
                return Err(EngineError::InvalidPipeline(format!(
                    "stage '{}' uses restraint coordinates of an undeclared stage",
                    spec.name
                )));
            }
        }

        self.names.insert(spec.name.clone());
        let id = self.stages.insert(spec);
        self.states.insert(id, StageState::Pending);
        self.order.push(id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn stage(&self, id: StageId) -> Option<&StageSpec> {
        self.stages.get(id)
    }

    pub fn state(&self, id: StageId) -> Option<StageState> {
        self.states.get(id).copied()
    }

    pub fn last(&self) -> Option<StageId> {
        self.order.last().copied()
    }

    /// Stages in execution order.
    pub fn stages(&self) -> impl Iterator<Item = (StageId, &StageSpec)> {
        self.order
            .iter()
            .filter_map(move |&id| self.stages.get(id).map(|spec| (id, spec)))
    }

    /// Resolves an artifact reference to a path, relative to the working
    /// directory for stage outputs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPipeline`] for a stage that does not
    /// belong to this pipeline.
    pub fn artifact_path(&self, artifact: ArtifactRef, initial: &Path) -> Result<PathBuf, EngineError> {
        match artifact {
            ArtifactRef::Initial => Ok(initial.to_path_buf()),
            ArtifactRef::Stage(id) => self
                .stages
                .get(id)
                .map(|spec| PathBuf::from(spec.output_artifact()))
                .ok_or_else(|| {
                    EngineError::InvalidPipeline("reference to a stage outside this pipeline".to_string())
                }),
        }
    }

    fn describe(&self, artifact: ArtifactRef) -> String {
        match artifact {
            ArtifactRef::Initial => "the initial coordinates".to_string(),
            ArtifactRef::Stage(id) => self
                .stages
                .get(id)
                .map(|spec| format!("'{}'", spec.output_artifact()))
                .unwrap_or_else(|| "an undeclared stage".to_string()),
        }
    }

    /// Runs every stage in order and returns the last restart file.
    ///
    /// A pipeline runs once. The first failure marks its stage `Failed` and
    /// aborts the run; later stages stay `Pending`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPipeline`] if the pipeline is empty or
    /// any stage has already left `Pending`.
    #[instrument(skip_all, name = "pipeline")]
    pub fn execute(&mut self, ctx: &ExecutionContext<'_>) -> Result<PathBuf, EngineError> {
        if self.order.is_empty() {
            return Err(EngineError::InvalidPipeline(
                "pipeline has no stages".to_string(),
            ));
        }
        if let Some((_, spec)) = self
            .stages()
            .find(|&(id, _)| self.states.get(id) != Some(&StageState::Pending))
        {
            return Err(EngineError::InvalidPipeline(format!(
                "stage '{}' has already run; a pipeline cannot be executed twice",
                spec.name
            )));
        }

        ctx.reporter.report(Progress::TaskStart {
            total_steps: self.order.len() as u64,
        });

        let order = self.order.clone();
        let mut final_artifact = PathBuf::new();
        for id in order {
            match self.run_stage(id, ctx) {
                Ok(artifact) => {
                    self.states.insert(id, StageState::Succeeded);
                    final_artifact = artifact;
                    ctx.reporter.report(Progress::TaskIncrement);
                }
                Err(e) => {
                    self.states.insert(id, StageState::Failed);
                    ctx.reporter.report(Progress::TaskFinish);
                    return Err(e);
                }
            }
        }

        ctx.reporter.report(Progress::TaskFinish);
        Ok(final_artifact)
    }

    fn run_stage(&mut self, id: StageId, ctx: &ExecutionContext<'_>) -> Result<PathBuf, EngineError> {
        let spec = self
            .stages
            .get(id)
            .ok_or_else(|| EngineError::InvalidPipeline("unknown stage".to_string()))?;
        self.states.insert(id, StageState::Running);

        info!(stage = %spec.name, kind = ?spec.kind, "Running stage");
        ctx.reporter.message(format!("Running {}", spec.name));

        let input_path = ctx.workdir.join(spec.input_file());
        let mdin = spec.render_mdin(ctx.charmm_water);
        debug!(stage = %spec.name, "Engine input:\n{}", mdin);
        fs::write(&input_path, mdin).map_err(|e| EngineError::io(&input_path, e))?;

        let reference = self.artifact_path(spec.reference, ctx.initial_coordinates)?;
        let restraint_reference =
            self.artifact_path(spec.restraint_reference, ctx.initial_coordinates)?;
        let command = spec.command(
            ctx.engine,
            ctx.workdir,
            ctx.topology,
            &reference,
            &restraint_reference,
        );
        ctx.runner.run(&command)?;

        let artifact = ctx.workdir.join(spec.output_artifact());
        if !artifact.is_file() {
            return Err(EngineError::MissingArtifact {
                stage: spec.name.clone(),
                path: artifact,
            });
        }
        info!(stage = %spec.name, "Stage finished");
        Ok(artifact)
    }
}
