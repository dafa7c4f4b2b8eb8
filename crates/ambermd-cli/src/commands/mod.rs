use crate::error::{CliError, Result};
use std::path::Path;
use tracing::debug;

pub mod equil;
pub mod mmpbsa;

fn ensure_input(path: &Path, kind: &str) -> Result<()> {
    if !path.is_file() {
        return Err(CliError::Argument(format!(
            "{} file does not exist: {}",
            kind,
            path.display()
        )));
    }
    Ok(())
}

fn prepare_workdir(workdir: &Path) -> Result<()> {
    debug!("Using working directory {:?}", workdir);
    std::fs::create_dir_all(workdir)?;
    Ok(())
}
