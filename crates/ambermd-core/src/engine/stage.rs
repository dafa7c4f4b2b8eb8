use slotmap::new_key_type;
use std::fmt::Write;
use std::path::Path;

use super::runner::CommandSpec;
use crate::core::topology::vocabulary::CHARMM_WATER_RESIDUE;

new_key_type! {
    /// Handle of a stage inside a [`Pipeline`](super::pipeline::Pipeline).
    pub struct StageId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Minimization,
    /// NVT dynamics.
    ConstantTemperatureVolume,
    /// NPT dynamics.
    ConstantTemperaturePressure,
}

impl StageKind {
    pub fn is_dynamics(self) -> bool {
        !matches!(self, StageKind::Minimization)
    }

    fn title(self) -> &'static str {
        match self {
            StageKind::Minimization => "Minimization",
            StageKind::ConstantTemperatureVolume => "NVT",
            StageKind::ConstantTemperaturePressure => "NPT",
        }
    }
}

/// Where a stage reads coordinates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRef {
    /// The prepared input coordinates the pipeline starts from.
    Initial,
    /// The restart file written by an earlier stage.
    Stage(StageId),
}

/// Positional restraint: selection mask and force constant in kcal/mol/Å².
#[derive(Debug, Clone, PartialEq)]
pub struct Restraint {
    pub mask: String,
    pub force_constant: f64,
}

impl Restraint {
    pub fn new(mask: impl Into<String>, force_constant: f64) -> Self {
        Self {
            mask: mask.into(),
            force_constant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

pub const MIN_MAX_CYCLES: u64 = 1000;
pub const MIN_STEEPEST_DESCENT_CYCLES: u64 = 10;
pub const DYNAMICS_STEPS: u64 = 5000;
pub const DYNAMICS_TIME_STEP: f64 = 0.001;
pub const DYNAMICS_TAUTP: f64 = 1.0;
const PRESSURE_BAR: f64 = 1.0;
const PRESSURE_RELAXATION: f64 = 2.0;

/// Parameters of one minimization or dynamics job.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    /// Unique name, also the stem of every file the stage writes.
    pub name: String,
    pub kind: StageKind,
    /// Starting coordinates (`-c`).
    pub reference: ArtifactRef,
    /// Coordinates the restraints pull towards (`-ref`).
    pub restraint_reference: ArtifactRef,
    pub restraint: Option<Restraint>,
    /// `maxcyc` for minimization, `nstlim` for dynamics.
    pub steps: u64,
    pub steepest_descent_cycles: u64,
    /// Time step in ps.
    pub time_step: f64,
    pub temperature: f64,
    /// Starting temperature when velocities are not read from the restart.
    pub initial_temperature: Option<f64>,
    /// Temperature-coupling time constant in ps.
    pub tautp: f64,
    pub com_removal_interval: Option<u64>,
    /// Continue from the velocities of the reference restart file.
    pub restart: bool,
    pub trajectory_interval: u64,
    pub print_interval: u64,
    pub restart_interval: u64,
    pub cutoff: f64,
}

impl StageSpec {
    pub fn minimization(
        name: impl Into<String>,
        reference: ArtifactRef,
        restraint_reference: ArtifactRef,
    ) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Minimization,
            reference,
            restraint_reference,
            restraint: None,
            steps: MIN_MAX_CYCLES,
            steepest_descent_cycles: MIN_STEEPEST_DESCENT_CYCLES,
            time_step: DYNAMICS_TIME_STEP,
            temperature: 0.0,
            initial_temperature: None,
            tautp: DYNAMICS_TAUTP,
            com_removal_interval: None,
            restart: false,
            trajectory_interval: 500,
            print_interval: 50,
            restart_interval: 500,
            cutoff: 8.0,
        }
    }

    pub fn nvt(
        name: impl Into<String>,
        reference: ArtifactRef,
        restraint_reference: ArtifactRef,
        temperature: f64,
    ) -> Self {
        Self::dynamics(
            name,
            StageKind::ConstantTemperatureVolume,
            reference,
            restraint_reference,
            temperature,
        )
    }

    pub fn npt(
        name: impl Into<String>,
        reference: ArtifactRef,
        restraint_reference: ArtifactRef,
        temperature: f64,
    ) -> Self {
        Self::dynamics(
            name,
            StageKind::ConstantTemperaturePressure,
            reference,
            restraint_reference,
            temperature,
        )
    }

    fn dynamics(
        name: impl Into<String>,
        kind: StageKind,
        reference: ArtifactRef,
        restraint_reference: ArtifactRef,
        temperature: f64,
    ) -> Self {
        Self {
            kind,
            steps: DYNAMICS_STEPS,
            temperature,
            initial_temperature: Some(temperature),
            trajectory_interval: 5000,
            print_interval: 5000,
            restart_interval: 5000,
            ..Self::minimization(name, reference, restraint_reference)
        }
    }

    pub fn restrained(mut self, mask: impl Into<String>, force_constant: f64) -> Self {
        self.restraint = Some(Restraint::new(mask, force_constant));
        self
    }

    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    pub fn time_step(mut self, dt: f64) -> Self {
        self.time_step = dt;
        self
    }

    pub fn tautp(mut self, tautp: f64) -> Self {
        self.tautp = tautp;
        self
    }

    /// Starts the thermostat from `kelvin` instead of the target temperature.
    pub fn heating_from(mut self, kelvin: f64) -> Self {
        self.initial_temperature = Some(kelvin);
        self
    }

    pub fn com_removal(mut self, interval: u64) -> Self {
        self.com_removal_interval = Some(interval);
        self
    }

    pub fn restarting(mut self) -> Self {
        self.restart = true;
        self.initial_temperature = None;
        self
    }

    pub fn trajectory_interval(mut self, interval: u64) -> Self {
        self.trajectory_interval = interval;
        self
    }

    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn input_file(&self) -> String {
        format!("{}.in", self.name)
    }

    pub fn output_artifact(&self) -> String {
        format!("{}.rst7", self.name)
    }

    pub fn trajectory_file(&self) -> Option<String> {
        (self.trajectory_interval > 0).then(|| format!("{}.nc", self.name))
    }

    /// Renders the engine input (`&cntrl` namelist) for this stage.
    pub fn render_mdin(&self, charmm_water: bool) -> String {
        let mut out = String::new();
        // Writes to a String cannot fail.
        let _ = self.write_mdin(&mut out, charmm_water);
        out
    }

    fn write_mdin(&self, out: &mut String, charmm_water: bool) -> std::fmt::Result {
        writeln!(out, "{}: {}", self.kind.title(), self.name)?;
        writeln!(out, "&cntrl")?;

        match self.kind {
            StageKind::Minimization => {
                writeln!(
                    out,
                    "   imin=1, ntmin=2, maxcyc={}, ncyc={},",
                    self.steps, self.steepest_descent_cycles
                )?;
                writeln!(out, "   ntb=1, cut={},", real(self.cutoff))?;
            }
            kind => {
                if self.restart {
                    writeln!(out, "   imin=0, irest=1, ntx=5,")?;
                } else {
                    writeln!(out, "   imin=0, irest=0, ntx=1,")?;
                }
                writeln!(
                    out,
                    "   nstlim={}, dt={},",
                    self.steps,
                    real(self.time_step)
                )?;
                writeln!(out, "   ntc=2, ntf=2, cut={},", real(self.cutoff))?;
                if kind == StageKind::ConstantTemperaturePressure {
                    writeln!(
                        out,
                        "   ntb=2, ntp=1, barostat=1, pres0={}, taup={},",
                        real(PRESSURE_BAR),
                        real(PRESSURE_RELAXATION)
                    )?;
                } else {
                    writeln!(out, "   ntb=1, ntp=0,")?;
                }
                write!(
                    out,
                    "   ntt=1, tautp={}, temp0={},",
                    real(self.tautp),
                    real(self.temperature)
                )?;
                match self.initial_temperature {
                    Some(tempi) if !self.restart => writeln!(out, " tempi={},", real(tempi))?,
                    _ => writeln!(out)?,
                }
                if let Some(nscm) = self.com_removal_interval {
                    writeln!(out, "   nscm={},", nscm)?;
                }
            }
        }

        writeln!(
            out,
            "   ntpr={}, ntwx={}, ntwr={}, ioutfm=1, ntxo=2,",
            self.print_interval, self.trajectory_interval, self.restart_interval
        )?;

        if charmm_water {
            writeln!(
                out,
                "   WATNAM = '{}', OWTNM = 'OH2',",
                CHARMM_WATER_RESIDUE
            )?;
        }

        match &self.restraint {
            Some(restraint) => writeln!(
                out,
                "   ntr=1, restraintmask=\"{}\", restraint_wt={},",
                restraint.mask,
                real(restraint.force_constant)
            )?,
            None => writeln!(out, "   ntr=0,")?,
        }

        writeln!(out, "&end")
    }

    /// The engine command line for this stage. Paths are relative to `workdir`
    /// unless given absolute.
    pub fn command(
        &self,
        engine: &Path,
        workdir: &Path,
        topology: &Path,
        reference: &Path,
        restraint_reference: &Path,
    ) -> CommandSpec {
        let mut command = CommandSpec::new(engine, workdir)
            .args(["-O", "-i"])
            .arg(self.input_file())
            .arg("-o")
            .arg(format!("{}.out", self.name))
            .arg("-p")
            .path_arg(topology)
            .arg("-c")
            .path_arg(reference)
            .arg("-r")
            .arg(self.output_artifact())
            .arg("-ref")
            .path_arg(restraint_reference);
        if let Some(trajectory) = self.trajectory_file() {
            command = command.arg("-x").arg(trajectory);
        }
        command.arg("-inf").arg(format!("{}.mdinfo", self.name))
    }
}

// Fortran namelists need a decimal point to read a value as real.
fn real(value: f64) -> String {
    format!("{:?}", value)
}
