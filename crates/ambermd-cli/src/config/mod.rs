mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_equil_config, build_mmpbsa_config};
pub use models::{EquilConfig, MmpbsaConfig};
