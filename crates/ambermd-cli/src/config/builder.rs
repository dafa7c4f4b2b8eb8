use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{EquilConfig, MmpbsaConfig};
use crate::cli::{Cli, EquilArgs, MmpbsaArgs};
use crate::error::{CliError, Result};
use ambermd::engine::config::{
    FreeEnergyConfigBuilder, PreparationConfigBuilder, SimulationConfig, SimulationConfigBuilder,
};
use ambermd::engine::toolchain::ToolNames;
use std::str::FromStr;

pub fn build_equil_config(cli: &Cli, args: &EquilArgs) -> Result<EquilConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(cli)?;

    let tools = take_tools(&mut file_config);
    let simulation = build_simulation(
        &mut file_config,
        &defaults,
        args.temperature,
        args.production_ns,
        args.addmask.clone(),
    )?;

    Ok(EquilConfig {
        workdir: cli.workdir.clone(),
        topology: args.parm7.clone(),
        coordinates: args.rst7.clone(),
        tools,
        simulation,
    })
}

pub fn build_mmpbsa_config(cli: &Cli, args: &MmpbsaArgs) -> Result<MmpbsaConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(cli)?;

    let tools = take_tools(&mut file_config);
    let simulation = build_simulation(
        &mut file_config,
        &defaults,
        args.temperature,
        args.production_ns,
        None,
    )?;

    let prep_file = file_config.preparation.take().unwrap_or_default();
    let mut preparation = PreparationConfigBuilder::new()
        .ligand_charge(
            args.charge
                .or(prep_file.ligand_charge)
                .unwrap_or(defaults.ligand_charge),
        )
        .ligand_multiplicity(
            args.multiplicity
                .or(prep_file.ligand_multiplicity)
                .unwrap_or(defaults.ligand_multiplicity),
        );
    if let Some(force_fields) = prep_file.force_fields {
        preparation = preparation.force_fields(force_fields);
    }
    if let Some(water_box) = prep_file.water_box {
        preparation = preparation.water_box(water_box);
    }
    if let Some(box_margin) = prep_file.box_margin {
        preparation = preparation.box_margin(box_margin);
    }
    let preparation = preparation
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let fe_file = file_config.free_energy.take().unwrap_or_default();
    let free_energy = FreeEnergyConfigBuilder::new()
        .processes(cli.processes.or(fe_file.processes))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(MmpbsaConfig {
        workdir: cli.workdir.clone(),
        protein: args.protein.clone(),
        ligand: args.ligand.clone(),
        tools,
        simulation,
        preparation,
        free_energy,
    })
}

fn load_file_config(cli: &Cli) -> Result<FileConfig> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    apply_set_values(file_config, &cli.set_values)
}

fn take_tools(file_config: &mut FileConfig) -> ToolNames {
    let mut tools = file_config.tools.take().unwrap_or_default();
    if let Some(engine) = file_config
        .simulation
        .as_mut()
        .and_then(|sim| sim.engine.take())
    {
        tools.engine = engine;
    }
    tools
}

fn build_simulation(
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
    temperature: Option<f64>,
    production_ns: Option<u64>,
    extra_mask: Option<String>,
) -> Result<SimulationConfig> {
    let sim_file = file_config.simulation.take().unwrap_or_default();

    let mut builder = SimulationConfigBuilder::new()
        .temperature(
            temperature
                .or(sim_file.temperature)
                .unwrap_or(defaults.temperature),
        )
        .production_ns(
            production_ns
                .or(sim_file.production_ns)
                .unwrap_or(defaults.production_ns),
        )
        .extra_mask(extra_mask.or(sim_file.extra_mask));
    if let Some(cutoff) = sim_file.cutoff {
        builder = builder.cutoff(cutoff);
    }

    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let parts: Vec<_> = kv_pair.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        }
        let key = parts[0];
        let value_str = parts[1];

        if let Some(tool) = key.strip_prefix("tools.") {
            let tools = config.tools.get_or_insert_with(Default::default);
            let slot = match tool {
                "engine" => &mut tools.engine,
                "tleap" => &mut tools.tleap,
                "cpptraj" => &mut tools.cpptraj,
                "pdb4amber" => &mut tools.pdb4amber,
                "acpype" => &mut tools.acpype,
                "parmed" => &mut tools.parmed,
                "gmx" => &mut tools.gmx,
                "gmx-mmpbsa" => &mut tools.gmx_mmpbsa,
                "mpirun" => &mut tools.mpirun,
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            };
            *slot = value_str.to_string();
            continue;
        }

        match key {
            "simulation.temperature" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .temperature = Some(parse_value(key, value_str, "float")?);
            }
            "simulation.production-ns" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .production_ns = Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.cutoff" => {
                config.simulation.get_or_insert_with(Default::default).cutoff =
                    Some(parse_value(key, value_str, "float")?);
            }
            "simulation.engine" => {
                config.simulation.get_or_insert_with(Default::default).engine =
                    Some(value_str.to_string());
            }
            "simulation.extra-mask" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .extra_mask = Some(value_str.to_string());
            }
            "preparation.force-fields" => {
                config
                    .preparation
                    .get_or_insert_with(Default::default)
                    .force_fields = Some(
                    value_str
                        .split(',')
                        .map(str::trim)
                        .filter(|ff| !ff.is_empty())
                        .map(str::to_string)
                        .collect(),
                );
            }
            "preparation.water-box" => {
                config
                    .preparation
                    .get_or_insert_with(Default::default)
                    .water_box = Some(value_str.to_string());
            }
            "preparation.box-margin" => {
                config
                    .preparation
                    .get_or_insert_with(Default::default)
                    .box_margin = Some(parse_value(key, value_str, "float")?);
            }
            "preparation.ligand-charge" => {
                config
                    .preparation
                    .get_or_insert_with(Default::default)
                    .ligand_charge = Some(parse_value(key, value_str, "integer")?);
            }
            "preparation.ligand-multiplicity" => {
                config
                    .preparation
                    .get_or_insert_with(Default::default)
                    .ligand_multiplicity = Some(parse_value(key, value_str, "integer")?);
            }
            "free-energy.processes" => {
                config
                    .free_energy
                    .get_or_insert_with(Default::default)
                    .processes = Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
