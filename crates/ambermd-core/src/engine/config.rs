use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

pub const DEFAULT_CUTOFF: f64 = 8.0;
pub const DEFAULT_BOX_MARGIN: f64 = 10.0;
pub const DEFAULT_WATER_BOX: &str = "TIP3PBOX";

/// Production MD steps per nanosecond at a 2 fs time step.
pub const STEPS_PER_NS: u64 = 500_000;

/// `nstlim` is a default-kind Fortran integer in the MD engines.
pub const MAX_ENGINE_STEPS: u64 = i32::MAX as u64;

pub const DEFAULT_FORCE_FIELDS: [&str; 5] = [
    "leaprc.protein.ff14SB",
    "leaprc.DNA.OL15",
    "leaprc.RNA.OL3",
    "leaprc.water.tip3p",
    "leaprc.gaff2",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Target temperature in Kelvin.
    pub temperature: f64,
    /// Production length in nanoseconds.
    pub production_ns: u64,
    /// Non-bonded cutoff in Angstroms.
    pub cutoff: f64,
    /// Selection fragment OR-ed into every restraint mask.
    pub extra_mask: Option<String>,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    temperature: Option<f64>,
    production_ns: Option<u64>,
    cutoff: Option<f64>,
    extra_mask: Option<String>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn production_ns(mut self, ns: u64) -> Self {
        self.production_ns = Some(ns);
        self
    }
    pub fn cutoff(mut self, angstroms: f64) -> Self {
        self.cutoff = Some(angstroms);
        self
    }
    pub fn extra_mask(mut self, mask: Option<String>) -> Self {
        self.extra_mask = mask;
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let temperature = self
            .temperature
            .ok_or(ConfigError::MissingParameter("temperature"))?;
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "temperature",
                reason: format!("must be a positive number of Kelvin, got {}", temperature),
            });
        }
        let production_ns = self
            .production_ns
            .ok_or(ConfigError::MissingParameter("production_ns"))?;
        if production_ns == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "production_ns",
                reason: "production length must be at least 1 ns".to_string(),
            });
        }
        if production_ns
            .checked_mul(STEPS_PER_NS)
            .is_none_or(|steps| steps > MAX_ENGINE_STEPS)
        {
            return Err(ConfigError::InvalidValue {
                parameter: "production_ns",
                reason: format!(
                    "{} ns exceeds the engine limit of {} steps",
                    production_ns, MAX_ENGINE_STEPS
                ),
            });
        }
        let cutoff = self.cutoff.unwrap_or(DEFAULT_CUTOFF);
        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "cutoff",
                reason: format!("must be positive, got {}", cutoff),
            });
        }
        Ok(SimulationConfig {
            temperature,
            production_ns,
            cutoff,
            extra_mask: self.extra_mask.filter(|mask| !mask.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparationConfig {
    /// `leaprc` files sourced by the system builder, in order.
    pub force_fields: Vec<String>,
    pub water_box: String,
    /// Minimum solute-to-box-edge distance in Angstroms.
    pub box_margin: f64,
    /// Net charge of the ligand.
    pub ligand_charge: i32,
    /// Spin multiplicity of the ligand.
    pub ligand_multiplicity: u32,
}

#[derive(Default)]
pub struct PreparationConfigBuilder {
    force_fields: Option<Vec<String>>,
    water_box: Option<String>,
    box_margin: Option<f64>,
    ligand_charge: Option<i32>,
    ligand_multiplicity: Option<u32>,
}

impl PreparationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_fields(mut self, force_fields: Vec<String>) -> Self {
        self.force_fields = Some(force_fields);
        self
    }
    pub fn water_box(mut self, water_box: impl Into<String>) -> Self {
        self.water_box = Some(water_box.into());
        self
    }
    pub fn box_margin(mut self, angstroms: f64) -> Self {
        self.box_margin = Some(angstroms);
        self
    }
    pub fn ligand_charge(mut self, charge: i32) -> Self {
        self.ligand_charge = Some(charge);
        self
    }
    pub fn ligand_multiplicity(mut self, multiplicity: u32) -> Self {
        self.ligand_multiplicity = Some(multiplicity);
        self
    }

    pub fn build(self) -> Result<PreparationConfig, ConfigError> {
        let force_fields = self.force_fields.unwrap_or_else(|| {
            DEFAULT_FORCE_FIELDS
                .iter()
                .map(|ff| ff.to_string())
                .collect()
        });
        if force_fields.is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "force_fields",
                reason: "at least one force field must be sourced".to_string(),
            });
        }
        let box_margin = self.box_margin.unwrap_or(DEFAULT_BOX_MARGIN);
        if !(box_margin.is_finite() && box_margin > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "box_margin",
                reason: format!("must be positive, got {}", box_margin),
            });
        }
        let ligand_multiplicity = self
            .ligand_multiplicity
            .ok_or(ConfigError::MissingParameter("ligand_multiplicity"))?;
        if ligand_multiplicity == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "ligand_multiplicity",
                reason: "multiplicity starts at 1".to_string(),
            });
        }
        Ok(PreparationConfig {
            force_fields,
            water_box: self
                .water_box
                .unwrap_or_else(|| DEFAULT_WATER_BOX.to_string()),
            box_margin,
            ligand_charge: self
                .ligand_charge
                .ok_or(ConfigError::MissingParameter("ligand_charge"))?,
            ligand_multiplicity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeEnergyConfig {
    /// MPI process count for the decomposition job.
    pub processes: usize,
}

#[derive(Default)]
pub struct FreeEnergyConfigBuilder {
    processes: Option<usize>,
}

impl FreeEnergyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processes(mut self, processes: Option<usize>) -> Self {
        self.processes = processes;
        self
    }

    /// Defaults to half the available cores, never below one.
    pub fn build(self) -> Result<FreeEnergyConfig, ConfigError> {
        let processes = match self.processes {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    parameter: "processes",
                    reason: "at least one process is required".to_string(),
                });
            }
            Some(n) => n,
            None => default_process_count(),
        };
        Ok(FreeEnergyConfig { processes })
    }
}

pub fn default_process_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / 2).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_builder_requires_temperature_and_length() {
        assert_eq!(
            SimulationConfigBuilder::new().production_ns(10).build(),
            Err(ConfigError::MissingParameter("temperature"))
        );
        assert_eq!(
            SimulationConfigBuilder::new().temperature(300.0).build(),
            Err(ConfigError::MissingParameter("production_ns"))
        );
    }

    #[test]
    fn simulation_builder_applies_defaults_and_drops_blank_mask() {
        let config = SimulationConfigBuilder::new()
            .temperature(303.15)
            .production_ns(100)
            .extra_mask(Some("  ".to_string()))
            .build()
            .unwrap();
        assert_eq!(config.cutoff, DEFAULT_CUTOFF);
        assert_eq!(config.extra_mask, None);
    }

    #[test]
    fn simulation_builder_rejects_nonsense_values() {
        let err = SimulationConfigBuilder::new()
            .temperature(-1.0)
            .production_ns(1)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "temperature",
                ..
            }
        ));
        let err = SimulationConfigBuilder::new()
            .temperature(300.0)
            .production_ns(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "production_ns",
                ..
            }
        ));
    }

    #[test]
    fn production_length_is_bounded_by_the_engine_step_counter() {
        let build = |ns| {
            SimulationConfigBuilder::new()
                .temperature(300.0)
                .production_ns(ns)
                .build()
        };
        assert_eq!(build(4294).unwrap().production_ns, 4294);
        for ns in [4295, u64::MAX / 100_000, u64::MAX] {
            assert!(matches!(
                build(ns),
                Err(ConfigError::InvalidValue {
                    parameter: "production_ns",
                    ..
                })
            ));
        }
    }

    #[test]
    fn preparation_builder_uses_stock_force_fields() {
        let config = PreparationConfigBuilder::new()
            .ligand_charge(-1)
            .ligand_multiplicity(1)
            .build()
            .unwrap();
        assert_eq!(config.force_fields.len(), 5);
        assert_eq!(config.force_fields[0], "leaprc.protein.ff14SB");
        assert_eq!(config.water_box, "TIP3PBOX");
        assert_eq!(config.box_margin, 10.0);
        assert_eq!(config.ligand_charge, -1);
    }

    #[test]
    fn preparation_builder_rejects_zero_multiplicity() {
        let err = PreparationConfigBuilder::new()
            .ligand_charge(0)
            .ligand_multiplicity(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "ligand_multiplicity",
                ..
            }
        ));
    }

    #[test]
    fn free_energy_process_count_is_never_zero() {
        assert!(FreeEnergyConfigBuilder::new().build().unwrap().processes >= 1);
        assert_eq!(
            FreeEnergyConfigBuilder::new()
                .processes(Some(6))
                .build()
                .unwrap()
                .processes,
            6
        );
        assert!(
            FreeEnergyConfigBuilder::new()
                .processes(Some(0))
                .build()
                .is_err()
        );
    }
}
