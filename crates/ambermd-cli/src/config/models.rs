use ambermd::engine::config::{FreeEnergyConfig, PreparationConfig, SimulationConfig};
use ambermd::engine::toolchain::ToolNames;
use std::path::PathBuf;

pub struct EquilConfig {
    pub workdir: PathBuf,
    pub topology: PathBuf,
    pub coordinates: PathBuf,
    pub tools: ToolNames,
    pub simulation: SimulationConfig,
}

pub struct MmpbsaConfig {
    pub workdir: PathBuf,
    pub protein: PathBuf,
    pub ligand: Option<PathBuf>,
    pub tools: ToolNames,
    pub simulation: SimulationConfig,
    pub preparation: PreparationConfig,
    pub free_energy: FreeEnergyConfig,
}
