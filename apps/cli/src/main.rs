#![deny(warnings)]

//! Headless CLI for running the studio's simulators from the shell.
//!
//! Scenarios:
//! - `viability`: Monte Carlo viability of a financed project
//! - `pyrolysis`: yield simulation against the built-in catalog
//! - `preset`: merge a named YAML preset over the default form state

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use pyrolysis::{simulate, Catalog, Feedstock, SimulationInputs};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use studio_core::{CatalystId, Composition, HeatSourceId, Mixture, ModeId};
use studio_econ::{run_viability, FinancialScenario, MonteCarloConfig, TaskRecord};
use studio_forms::{PresetLibrary, StudioConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// `--key value` pairs after the program name.
struct Args {
    values: BTreeMap<String, String>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut it = std::env::args().skip(1);
        while let Some(arg) = it.next() {
            let Some(key) = arg.strip_prefix("--") else {
                bail!("unexpected argument: {arg}");
            };
            let value = it
                .next()
                .ok_or_else(|| anyhow!("missing value for --{key}"))?;
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(s) => s
                .parse()
                .map_err(|e| anyhow!("invalid value for --{key}: {e}")),
            None => Ok(default),
        }
    }
}

fn run_viability_scenario(args: &Args) -> Result<()> {
    let scenario = FinancialScenario {
        asset_value: args.parsed("asset", Decimal::new(300_000, 0))?,
        capital_to_raise: args.parsed("capital", Decimal::new(100_000, 0))?,
        production_costs: args.parsed("costs", Decimal::new(160_000, 0))?,
        years: args.parsed("years", 5)?,
        asset_uncertainty_pct: args.parsed("asset-uncertainty", 10.0)?,
        cost_uncertainty_pct: args.parsed("cost-uncertainty", 10.0)?,
    };
    let defaults = MonteCarloConfig::default();
    let cfg = MonteCarloConfig {
        iterations: args.parsed("iterations", defaults.iterations)?,
        cost_of_capital: args.parsed("cost-of-capital", defaults.cost_of_capital)?,
        seed: args.parsed("seed", defaults.seed)?,
    };
    info!(?scenario, ?cfg, "running viability analysis");
    let report = run_viability(&scenario, &cfg)?;
    println!("{}", report.summary());
    match args.get("date") {
        Some(d) => {
            let created = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("invalid --date {d}"))?;
            let title = args.get("title").unwrap_or("Viability study");
            let task = TaskRecord::from_report(title, created, scenario, report);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn parse_feedstock(args: &Args) -> Result<Feedstock> {
    if let Some(mix) = args.get("mix") {
        let mut entries = Vec::new();
        for part in mix.split(',') {
            let (id, pct) = part
                .split_once(':')
                .ok_or_else(|| anyhow!("mixture entries look like id:percent, got {part}"))?;
            let pct: f64 = pct
                .trim()
                .parse()
                .with_context(|| format!("invalid percentage in {part}"))?;
            entries.push((id.trim().to_string(), pct));
        }
        return Ok(Feedstock::Advanced(Mixture::new(entries)?));
    }
    let composition = match args.get("composition") {
        Some(c) => {
            let v = c
                .split(',')
                .map(|x| x.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .context("composition must be three numbers")?;
            let [cel, hemi, lig] = v.as_slice() else {
                bail!("composition must be three numbers, got {}", v.len());
            };
            Composition::new(*cel, *hemi, *lig)?
        }
        None => Composition::default(),
    };
    Ok(Feedstock::Simple(composition))
}

fn run_pyrolysis_scenario(args: &Args) -> Result<()> {
    let catalog = Catalog::builtin();
    let inputs = SimulationInputs {
        feedstock: parse_feedstock(args)?,
        mode_id: ModeId::new(args.get("mode").unwrap_or("rapida")),
        heat_source_id: HeatSourceId::new(args.get("heat").unwrap_or("solar_concentrada")),
        catalyst_id: args.get("catalyst").map(CatalystId::new),
        temperature_c: args.parsed("temp", 500.0)?,
        residence_time_s: args.parsed("time", 1.5)?,
        oxygen_pct: args.parsed("o2", 0.0)?,
    };
    info!(mode = %inputs.mode_id, heat = %inputs.heat_source_id, "running pyrolysis simulation");
    let result = simulate(&catalog, &inputs);
    match &result.yields {
        Some(y) => println!(
            "Yields | liquid: {:.1}% | solid: {:.1}% | gas: {:.1}%{}",
            y.liquid,
            y.solid,
            y.gas,
            y.wax.map(|w| format!(" | wax: {w:.1}%")).unwrap_or_default()
        ),
        None => println!("No result: check mode, heat source, catalyst and feedstock ids"),
    }
    for line in &result.insights {
        println!("- {line}");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_preset_scenario(args: &Args) -> Result<()> {
    let path = args
        .get("presets")
        .ok_or_else(|| anyhow!("--presets <file.yaml> is required"))?;
    let name = args
        .get("preset")
        .ok_or_else(|| anyhow!("--preset <name> is required"))?;
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let library = PresetLibrary::from_yaml_str(&text)?;
    let payload = match args.get("payload") {
        Some(p) => Some(
            serde_json::from_str::<serde_json::Value>(p).context("invalid --payload json")?,
        ),
        None => None,
    };
    let config = library.apply(name, &StudioConfig::default(), payload.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Directives from `RUST_LOG` when they parse, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    // Logging setup
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    let scenario = args.get("scenario").unwrap_or("viability");
    info!(scenario, "starting CLI");
    match scenario {
        "viability" => run_viability_scenario(&args),
        "pyrolysis" => run_pyrolysis_scenario(&args),
        "preset" => run_preset_scenario(&args),
        other => bail!("unknown scenario {other}; expected viability, pyrolysis or preset"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_honours_directives() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(
            log_filter(Some("pyrolysis=debug")).to_string(),
            "pyrolysis=debug"
        );
        assert_eq!(log_filter(Some("pyrolysis=loud")).to_string(), "info");
    }
}
