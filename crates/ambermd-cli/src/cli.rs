use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "AmberMD CLI - Staged Amber molecular-dynamics workflows: restraint-relaxation equilibration, production MD and MM-PBSA binding free energies.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Directory in which every job runs and every generated file is written
    #[arg(short, long, global = true, value_name = "DIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Configuration file in TOML format
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.cutoff=10.0
    #[arg(short = 'S', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,

    /// Number of MPI processes for the MM-PBSA decomposition.
    /// Defaults to half the available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub processes: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Equilibrate a prepared system and run production MD.
    Equil(EquilArgs),
    /// Prepare a protein-ligand complex, simulate it and compute its MM-PBSA binding free energy.
    Mmpbsa(MmpbsaArgs),
}

/// Arguments for the `equil` subcommand.
#[derive(Args, Debug)]
pub struct EquilArgs {
    /// Amber topology of the prepared system.
    #[arg(short = 'p', long, required = true, value_name = "PATH")]
    pub parm7: PathBuf,

    /// Amber coordinates of the prepared system.
    #[arg(short = 'c', long, required = true, value_name = "PATH")]
    pub rst7: PathBuf,

    /// Simulation temperature in Kelvin [default: 303.15]
    #[arg(short = 't', long = "temp", value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Production MD length in nanoseconds [default: 100]
    #[arg(short = 'n', long = "ns", value_name = "NS")]
    pub production_ns: Option<u64>,

    /// Extra selection OR-ed into every restraint mask (e.g. ':MOL').
    #[arg(long, value_name = "MASK")]
    pub addmask: Option<String>,
}

/// Arguments for the `mmpbsa` subcommand.
#[derive(Args, Debug)]
pub struct MmpbsaArgs {
    /// Protein PDB file. Without --mol2 it must contain exactly one ligand,
    /// which is split off automatically.
    #[arg(short = 'p', long, required = true, value_name = "PATH")]
    pub protein: PathBuf,

    /// Ligand MOL2 file.
    #[arg(short = 'm', long = "mol2", value_name = "PATH")]
    pub ligand: Option<PathBuf>,

    /// Simulation temperature in Kelvin [default: 303.15]
    #[arg(short = 't', long = "temp", value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Production MD length in nanoseconds [default: 100]
    #[arg(short = 'n', long = "ns", value_name = "NS")]
    pub production_ns: Option<u64>,

    /// Net charge of the ligand [default: 0]
    #[arg(long, value_name = "INT", allow_negative_numbers = true)]
    pub charge: Option<i32>,

    /// Spin multiplicity of the ligand [default: 1]
    #[arg(long, value_name = "INT")]
    pub multiplicity: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equil_requires_topology_and_coordinates() {
        assert!(Cli::try_parse_from(["ambermd", "equil", "-p", "x.parm7"]).is_err());

        let cli = Cli::try_parse_from(["ambermd", "equil", "-p", "x.parm7", "-c", "x.rst7"])
            .unwrap();
        let Commands::Equil(args) = cli.command else {
            panic!("expected equil");
        };
        assert_eq!(args.parm7, PathBuf::from("x.parm7"));
        assert_eq!(args.rst7, PathBuf::from("x.rst7"));
        assert_eq!(args.temperature, None);
        assert_eq!(cli.workdir, PathBuf::from("."));
    }

    #[test]
    fn mmpbsa_accepts_negative_charge_and_optional_ligand() {
        let cli = Cli::try_parse_from([
            "ambermd", "mmpbsa", "-p", "complex.pdb", "--charge", "-1", "-n", "5",
        ])
        .unwrap();
        let Commands::Mmpbsa(args) = cli.command else {
            panic!("expected mmpbsa");
        };
        assert_eq!(args.charge, Some(-1));
        assert_eq!(args.production_ns, Some(5));
        assert!(args.ligand.is_none());
    }

    #[test]
    fn global_flags_may_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "ambermd",
            "equil",
            "--parm7",
            "a.parm7",
            "--rst7",
            "a.rst7",
            "-vv",
            "-w",
            "run1",
            "-S",
            "simulation.cutoff=9.0",
            "-S",
            "tools.engine=sander",
            "-j",
            "8",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.workdir, PathBuf::from("run1"));
        assert_eq!(cli.set_values.len(), 2);
        assert_eq!(cli.processes, Some(8));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(
            Cli::try_parse_from(["ambermd", "-q", "-v", "equil", "-p", "a", "-c", "b"]).is_err()
        );
    }
}
