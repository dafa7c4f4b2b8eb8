use crate::error::{CliError, Result};
use ambermd::engine::toolchain::ToolNames;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSimulationConfig {
    pub temperature: Option<f64>,
    pub production_ns: Option<u64>,
    pub cutoff: Option<f64>,
    /// Shorthand for `tools.engine`; wins when both are given.
    pub engine: Option<String>,
    pub extra_mask: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePreparationConfig {
    pub force_fields: Option<Vec<String>>,
    pub water_box: Option<String>,
    pub box_margin: Option<f64>,
    pub ligand_charge: Option<i32>,
    pub ligand_multiplicity: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileFreeEnergyConfig {
    pub processes: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub tools: Option<ToolNames>,
    pub simulation: Option<FileSimulationConfig>,
    pub preparation: Option<FilePreparationConfig>,
    pub free_energy: Option<FileFreeEnergyConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
