use crate::analysis::{FrenchDrainAnalysis, SoakwellAnalysis};
use crate::error::Result;
use crate::french_drain::FrenchDrainResult;
use crate::mass_balance::MassBalanceRecord;
use crate::simulation::{Regime, SimulationResult};
use crate::solver::{ConfigurationResult, SolverReport};

use csv::Writer;
use std::path::Path;

/// Storm names end up in file names, so keep them to a safe alphabet.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[derive(serde::Serialize)]
struct SeriesOutput {
    time_min: f64,
    inflow_rate: f64,
    stored_volume: f64,
    outflow_rate: f64,
    overflow_rate: f64,
    water_level: f64,
    cumulative_inflow: f64,
    cumulative_outflow: f64,
    regime: Regime,
    recorded: bool,
}

pub fn write_series(result: &SimulationResult, storm: &str, path: &Path) -> Result<()> {
    let filepath = path.join(format!("series_{}.csv", file_stem(storm)));
    let mut wtr = Writer::from_path(filepath)?;
    for i in 0..result.len() {
        wtr.serialize(SeriesOutput {
            time_min: result.time_min[i],
            inflow_rate: result.inflow_rate[i],
            stored_volume: result.stored_volume[i],
            outflow_rate: result.outflow_rate[i],
            overflow_rate: result.overflow_rate[i],
            water_level: result.water_level[i],
            cumulative_inflow: result.cumulative_inflow[i],
            cumulative_outflow: result.cumulative_outflow[i],
            regime: result.regime[i],
            recorded: i < result.recorded_len,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct FrenchDrainSeriesOutput {
    time_min: f64,
    inflow_rate: f64,
    pipe_flow: f64,
    stored_volume: f64,
    pipe_storage: f64,
    water_level: f64,
    infiltration_rate: f64,
    overflow_rate: f64,
}

pub fn write_french_drain_series(
    result: &FrenchDrainResult,
    storm: &str,
    path: &Path,
) -> Result<()> {
    let filepath = path.join(format!("french_drain_{}.csv", file_stem(storm)));
    let mut wtr = Writer::from_path(filepath)?;
    for i in 0..result.len() {
        wtr.serialize(FrenchDrainSeriesOutput {
            time_min: result.time_min[i],
            inflow_rate: result.inflow_rate[i],
            pipe_flow: result.pipe_flow[i],
            stored_volume: result.stored_volume[i],
            pipe_storage: result.pipe_storage[i],
            water_level: result.water_level[i],
            infiltration_rate: result.infiltration_rate[i],
            overflow_rate: result.overflow_rate[i],
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct MassBalanceOutput<'a> {
    device: &'a str,
    storm: &'a str,
    total_inflow: f64,
    total_outflow: f64,
    total_overflow: f64,
    final_stored: f64,
    error: f64,
    error_percent: f64,
    within_tolerance: bool,
    emptying_time_minutes: Option<f64>,
}

impl<'a> MassBalanceOutput<'a> {
    fn new(
        device: &'a str,
        storm: &'a str,
        record: &MassBalanceRecord,
        emptying_time_minutes: Option<f64>,
    ) -> Self {
        Self {
            device,
            storm,
            total_inflow: record.total_inflow,
            total_outflow: record.total_outflow,
            total_overflow: record.total_overflow,
            final_stored: record.final_stored,
            error: record.error,
            error_percent: record.error_percent,
            within_tolerance: record.is_within_tolerance(),
            emptying_time_minutes,
        }
    }
}

pub fn write_mass_balance(
    soakwells: &[SoakwellAnalysis],
    drains: &[FrenchDrainAnalysis],
    path: &Path,
) -> Result<()> {
    let mut wtr = Writer::from_path(path.join("mass_balance.csv"))?;
    for a in soakwells.iter() {
        wtr.serialize(MassBalanceOutput::new(
            "soakwell",
            &a.storm,
            &a.mass_balance,
            a.emptying_time.minutes(),
        ))?;
    }
    for a in drains.iter() {
        wtr.serialize(MassBalanceOutput::new(
            "french_drain",
            &a.storm,
            &a.mass_balance,
            None,
        ))?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct ConfigurationOutput<'a> {
    configuration: String,
    product_code: &'a str,
    diameter: f64,
    depth: f64,
    units: usize,
    unit_volume: f64,
    total_volume: f64,
    total_cost: f64,
    feasible: bool,
    worst_case_storm: Option<&'a str>,
    worst_case_water_level: Option<f64>,
}

fn write_configurations(report: &SolverReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path.join("solver_configurations.csv"))?;
    for c in report.configurations.iter() {
        let worst = c.worst_scenario();
        wtr.serialize(ConfigurationOutput {
            configuration: c.configuration.name(),
            product_code: &c.configuration.unit.product_code,
            diameter: c.configuration.unit.diameter,
            depth: c.configuration.unit.depth,
            units: c.configuration.units,
            unit_volume: c.configuration.unit.capacity_m3,
            total_volume: c.configuration.total_volume(),
            total_cost: c.configuration.total_cost(),
            feasible: c.feasible,
            worst_case_storm: worst.map(|s| s.storm.as_str()),
            worst_case_water_level: worst.map(|s| s.peak_water_level),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct ScenarioOutput<'a> {
    configuration: String,
    storm: &'a str,
    peak_overflow: f64,
    peak_water_level: f64,
    emptying_time_minutes: Option<f64>,
    passes: bool,
    error: Option<&'a str>,
}

fn write_scenarios(report: &SolverReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path.join("solver_scenarios.csv"))?;
    for c in report.configurations.iter() {
        for s in c.scenarios.iter() {
            wtr.serialize(ScenarioOutput {
                configuration: c.configuration.name(),
                storm: &s.storm,
                peak_overflow: s.peak_overflow,
                peak_water_level: s.peak_water_level,
                emptying_time_minutes: s.emptying_time.minutes(),
                passes: s.passes,
                error: s.error.as_deref(),
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct RankedOutput<'a> {
    rank: usize,
    configuration: String,
    product_code: &'a str,
    units: usize,
    total_volume: f64,
    total_cost: f64,
    worst_case_storm: Option<&'a str>,
    worst_case_water_level: Option<f64>,
}

fn write_ranked(report: &SolverReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path.join("solver_ranked.csv"))?;
    for (i, c) in report.ranked_by_cost().into_iter().enumerate() {
        let worst = c.worst_scenario();
        wtr.serialize(RankedOutput {
            rank: i + 1,
            configuration: c.configuration.name(),
            product_code: &c.configuration.unit.product_code,
            units: c.configuration.units,
            total_volume: c.configuration.total_volume(),
            total_cost: c.configuration.total_cost(),
            worst_case_storm: worst.map(|s| s.storm.as_str()),
            worst_case_water_level: worst.map(|s| s.peak_water_level),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct RecommendationOutput<'a> {
    criterion: &'a str,
    configuration: String,
    product_code: &'a str,
    units: usize,
    total_volume: f64,
    total_cost: f64,
}

fn write_recommendations(report: &SolverReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path.join("solver_recommendations.csv"))?;
    let r = &report.recommendations;
    let criteria: [(&str, Option<usize>); 3] = [
        ("min_cost", r.min_cost),
        ("min_volume", r.min_volume),
        ("min_units", r.min_units),
    ];
    for (criterion, index) in criteria {
        let c: &ConfigurationResult = match report.recommended(index) {
            Some(c) => c,
            None => continue,
        };
        wtr.serialize(RecommendationOutput {
            criterion,
            configuration: c.configuration.name(),
            product_code: &c.configuration.unit.product_code,
            units: c.configuration.units,
            total_volume: c.configuration.total_volume(),
            total_cost: c.configuration.total_cost(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct SolverSummaryOutput {
    tested: usize,
    viable: usize,
    skipped: usize,
    unavailable: usize,
    cancelled: bool,
    cache_hits: usize,
    cache_misses: usize,
}

fn write_solver_summary(report: &SolverReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path.join("solver_summary.csv"))?;
    wtr.serialize(SolverSummaryOutput {
        tested: report.tested,
        viable: report.viable,
        skipped: report.skipped,
        unavailable: report.unavailable,
        cancelled: report.cancelled,
        cache_hits: report.cache_hits,
        cache_misses: report.cache_misses,
    })?;
    wtr.flush()?;
    Ok(())
}

pub fn generate_analysis_outputs(
    soakwells: &[SoakwellAnalysis],
    drains: &[FrenchDrainAnalysis],
    path: &Path,
) -> Result<()> {
    for a in soakwells.iter() {
        write_series(&a.result, &a.storm, path)?;
    }
    for a in drains.iter() {
        write_french_drain_series(&a.result, &a.storm, path)?;
    }
    write_mass_balance(soakwells, drains, path)?;
    Ok(())
}

pub fn generate_solver_outputs(report: &SolverReport, path: &Path) -> Result<()> {
    write_configurations(report, path)?;
    write_scenarios(report, path)?;
    write_ranked(report, path)?;
    write_recommendations(report, path)?;
    write_solver_summary(report, path)?;
    Ok(())
}
