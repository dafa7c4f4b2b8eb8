use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::EngineError;

/// External programs the workflows drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    /// The MD engine (`pmemd.cuda`, `pmemd`, `sander`, ...).
    Engine,
    Tleap,
    Cpptraj,
    Pdb4amber,
    Acpype,
    Parmed,
    Gmx,
    GmxMmpbsa,
    Mpirun,
}

impl Tool {
    pub const EQUILIBRATION: &'static [Tool] = &[Tool::Engine];

    pub const PREPARATION: &'static [Tool] = &[Tool::Pdb4amber, Tool::Acpype, Tool::Tleap];

    pub const BINDING: &'static [Tool] = &[
        Tool::Pdb4amber,
        Tool::Acpype,
        Tool::Tleap,
        Tool::Engine,
        Tool::Parmed,
        Tool::Cpptraj,
        Tool::Gmx,
        Tool::GmxMmpbsa,
        Tool::Mpirun,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Engine => "engine",
            Tool::Tleap => "tleap",
            Tool::Cpptraj => "cpptraj",
            Tool::Pdb4amber => "pdb4amber",
            Tool::Acpype => "acpype",
            Tool::Parmed => "parmed",
            Tool::Gmx => "gmx",
            Tool::GmxMmpbsa => "gmx_MMPBSA",
            Tool::Mpirun => "mpirun",
        }
    }
}

/// Executable names (or paths) for each tool, as configured by the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ToolNames {
    pub engine: String,
    pub tleap: String,
    pub cpptraj: String,
    pub pdb4amber: String,
    pub acpype: String,
    pub parmed: String,
    pub gmx: String,
    pub gmx_mmpbsa: String,
    pub mpirun: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            engine: "pmemd.cuda".to_string(),
            tleap: "tleap".to_string(),
            cpptraj: "cpptraj".to_string(),
            pdb4amber: "pdb4amber".to_string(),
            acpype: "acpype".to_string(),
            parmed: "parmed".to_string(),
            gmx: "gmx".to_string(),
            gmx_mmpbsa: "gmx_MMPBSA".to_string(),
            mpirun: "mpirun".to_string(),
        }
    }
}

impl ToolNames {
    pub fn executable(&self, tool: Tool) -> &str {
        match tool {
            Tool::Engine => &self.engine,
            Tool::Tleap => &self.tleap,
            Tool::Cpptraj => &self.cpptraj,
            Tool::Pdb4amber => &self.pdb4amber,
            Tool::Acpype => &self.acpype,
            Tool::Parmed => &self.parmed,
            Tool::Gmx => &self.gmx,
            Tool::GmxMmpbsa => &self.gmx_mmpbsa,
            Tool::Mpirun => &self.mpirun,
        }
    }
}

/// Resolved executable paths for a set of tools.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    paths: HashMap<Tool, PathBuf>,
}

impl Toolchain {
    /// Locates every tool in `required` on `PATH` (or at the configured path).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingDependency`] for the first tool that
    /// cannot be found.
    pub fn resolve(names: &ToolNames, required: &[Tool]) -> Result<Self, EngineError> {
        let mut paths = HashMap::with_capacity(required.len());
        for &tool in required {
            let executable = names.executable(tool);
            let path = which::which(executable).map_err(|_| EngineError::MissingDependency {
                tool: tool.name(),
                executable: executable.to_string(),
            })?;
            debug!(tool = tool.name(), path = %path.display(), "Resolved external tool");
            paths.insert(tool, path);
        }
        Ok(Self { paths })
    }

    /// Uses the configured names verbatim, without looking anything up.
    pub fn unresolved(names: &ToolNames, tools: &[Tool]) -> Self {
        let paths = tools
            .iter()
            .map(|&tool| (tool, PathBuf::from(names.executable(tool))))
            .collect();
        Self { paths }
    }

    pub fn path(&self, tool: Tool) -> Result<&Path, EngineError> {
        self.paths
            .get(&tool)
            .map(PathBuf::as_path)
            .ok_or(EngineError::MissingDependency {
                tool: tool.name(),
                executable: String::new(),
            })
    }

    pub fn contains(&self, tool: Tool) -> bool {
        self.paths.contains_key(&tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_match_the_amber_distribution() {
        let names = ToolNames::default();
        assert_eq!(names.executable(Tool::Engine), "pmemd.cuda");
        assert_eq!(names.executable(Tool::GmxMmpbsa), "gmx_MMPBSA");
    }

    #[test]
    fn missing_executable_is_a_missing_dependency() {
        let names = ToolNames {
            engine: "definitely-not-an-md-engine-xyz".to_string(),
            ..ToolNames::default()
        };
        let err = Toolchain::resolve(&names, Tool::EQUILIBRATION).unwrap_err();
        match err {
            EngineError::MissingDependency { tool, executable } => {
                assert_eq!(tool, "engine");
                assert_eq!(executable, "definitely-not-an-md-engine-xyz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn resolves_existing_executables() {
        let names = ToolNames {
            engine: "sh".to_string(),
            ..ToolNames::default()
        };
        let toolchain = Toolchain::resolve(&names, &[Tool::Engine]).unwrap();
        assert!(toolchain.path(Tool::Engine).unwrap().is_absolute());
        assert!(!toolchain.contains(Tool::Tleap));
        assert!(toolchain.path(Tool::Tleap).is_err());
    }

    #[test]
    fn unresolved_toolchain_uses_names_verbatim() {
        let toolchain = Toolchain::unresolved(&ToolNames::default(), Tool::BINDING);
        assert_eq!(
            toolchain.path(Tool::Mpirun).unwrap(),
            Path::new("mpirun")
        );
    }
}
