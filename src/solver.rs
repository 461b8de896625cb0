//! Design-space search over standard soakwell sizes and quantities.
//!
//! Every candidate configuration is checked against every storm scenario.
//! Configurations are independent, so they are evaluated in parallel on a
//! bounded pool and collected back in encounter order (diameter, depth,
//! quantity). Cancellation and the time budget are only observed between
//! configurations.

use crate::cache::{self, SimulationCache};
use crate::catalog::{ManufacturerCatalog, UnitSpecification};
use crate::device::{Soakwell, SoilParameters};
use crate::error::{Result, SoakwellError};
use crate::extension::{self, EmptyingTime, ExtensionOptions};
use crate::scaling;
use crate::storm::StormScenario;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Candidate diameters (m)
    pub diameters: Vec<f64>,
    /// Candidate depths (m)
    pub depths: Vec<f64>,
    /// Quantities `1..=max_units` are tried for every size
    pub max_units: usize,
    /// Worker threads, all available cores when `None`
    pub threads: Option<usize>,
    pub time_budget: Option<Duration>,
    pub extension: ExtensionOptions,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            diameters: vec![0.9, 1.2, 1.5, 1.8, 2.1, 2.4],
            depths: vec![0.9, 1.2, 1.5, 1.8],
            max_units: 10,
            threads: None,
            time_budget: None,
            extension: ExtensionOptions::default(),
        }
    }
}

/// Shared flag to stop a sweep from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the solver keeps from one simulated (size, quantity, storm) run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub peak_overflow: f64,
    pub peak_water_level: f64,
    pub peak_stored_volume: f64,
    pub total_overflow: f64,
    pub emptying_time: EmptyingTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub storm: String,
    pub peak_overflow: f64,
    pub peak_water_level: f64,
    pub emptying_time: EmptyingTime,
    pub passes: bool,
    /// Reason the evaluation failed, if it did
    pub error: Option<String>,
}

impl ScenarioResult {
    fn evaluated(storm: &str, summary: &ScenarioSummary) -> Self {
        Self {
            storm: storm.to_string(),
            peak_overflow: summary.peak_overflow,
            peak_water_level: summary.peak_water_level,
            emptying_time: summary.emptying_time,
            passes: summary.peak_overflow == 0.0,
            error: None,
        }
    }

    fn failed(storm: &str, error: &SoakwellError) -> Self {
        Self {
            storm: storm.to_string(),
            peak_overflow: f64::INFINITY,
            peak_water_level: 0.0,
            emptying_time: EmptyingTime::Indeterminate,
            passes: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub unit: UnitSpecification,
    pub units: usize,
}

impl Configuration {
    pub fn name(&self) -> String {
        format!(
            "{}x {:.1}m ⌀ x {:.1}m deep",
            self.units, self.unit.diameter, self.unit.depth
        )
    }

    pub fn total_volume(&self) -> f64 {
        self.unit.capacity_m3 * self.units as f64
    }

    pub fn total_cost(&self) -> f64 {
        self.unit.price * self.units as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationResult {
    pub configuration: Configuration,
    pub scenarios: Vec<ScenarioResult>,
    /// Zero overflow in every scenario
    pub feasible: bool,
    /// Scenario with the highest peak water level
    pub worst_case: Option<usize>,
}

impl ConfigurationResult {
    pub fn worst_scenario(&self) -> Option<&ScenarioResult> {
        self.worst_case.map(|i| &self.scenarios[i])
    }
}

/// Indices into `SolverReport::configurations`, ties kept in encounter
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recommendations {
    pub min_cost: Option<usize>,
    pub min_volume: Option<usize>,
    pub min_units: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverReport {
    pub configurations: Vec<ConfigurationResult>,
    pub recommendations: Recommendations,
    pub tested: usize,
    pub viable: usize,
    /// Candidates not evaluated because the sweep stopped early
    pub skipped: usize,
    /// Size combinations absent from the catalog
    pub unavailable: usize,
    pub cancelled: bool,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl SolverReport {
    pub fn viable_configurations(
        &self,
    ) -> impl Iterator<Item = &ConfigurationResult> {
        self.configurations.iter().filter(|c| c.feasible)
    }

    /// Feasible configurations from cheapest to most expensive. Equal
    /// costs keep candidate order.
    pub fn ranked_by_cost(&self) -> Vec<&ConfigurationResult> {
        let mut ranked: Vec<&ConfigurationResult> = self.viable_configurations().collect();
        ranked.sort_by(|a, b| {
            a.configuration
                .total_cost()
                .total_cmp(&b.configuration.total_cost())
        });
        ranked
    }

    pub fn recommended(&self, index: Option<usize>) -> Option<&ConfigurationResult> {
        index.map(|i| &self.configurations[i])
    }
}

fn select_min<F>(configurations: &[ConfigurationResult], metric: F) -> Option<usize>
where
    F: Fn(&Configuration) -> f64,
{
    let mut best: Option<(usize, f64)> = None;
    for (index, c) in configurations.iter().enumerate() {
        if !c.feasible {
            continue;
        }
        let value = metric(&c.configuration);
        match best {
            Some((_, current)) if value >= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

pub fn recommend(configurations: &[ConfigurationResult]) -> Recommendations {
    Recommendations {
        min_cost: select_min(configurations, |c| c.total_cost()),
        min_volume: select_min(configurations, |c| c.total_volume()),
        min_units: select_min(configurations, |c| c.units as f64),
    }
}

pub struct DesignSolver<'a, C: ManufacturerCatalog> {
    catalog: &'a C,
    soil: SoilParameters,
    options: SolverOptions,
    cache: Arc<SimulationCache<ScenarioSummary>>,
    cancellation: CancellationToken,
}

impl<'a, C: ManufacturerCatalog> DesignSolver<'a, C> {
    pub fn new(
        catalog: &'a C,
        soil: SoilParameters,
        options: SolverOptions,
        cache: Arc<SimulationCache<ScenarioSummary>>,
    ) -> Self {
        Self {
            catalog,
            soil,
            options,
            cache,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Catalogued sizes crossed with every quantity, and the number of
    /// size combinations the catalog does not carry.
    pub fn candidates(&self) -> (Vec<Configuration>, usize) {
        let mut configurations = Vec::<Configuration>::new();
        let mut unavailable = 0;
        for diameter in self.options.diameters.iter() {
            for depth in self.options.depths.iter() {
                match self.catalog.lookup(*diameter, *depth) {
                    Some(unit) => {
                        for units in 1..=self.options.max_units {
                            configurations.push(Configuration {
                                unit: unit.clone(),
                                units,
                            });
                        }
                    }
                    None => unavailable += 1,
                }
            }
        }
        (configurations, unavailable)
    }

    fn summarize(
        &self,
        unit: &Soakwell,
        units: usize,
        storm: &StormScenario,
    ) -> Result<ScenarioSummary> {
        let key = cache::simulation_key(
            unit,
            &self.soil,
            &self.options.extension,
            units,
            &storm.hydrograph,
        );
        self.cache.get_or_try_insert_with(key, || {
            let r = scaling::simulate_units(
                &storm.hydrograph,
                unit,
                &self.soil,
                units,
                &self.options.extension,
            )?;
            Ok(ScenarioSummary {
                peak_overflow: r.peak_overflow(),
                peak_water_level: r.peak_water_level(),
                peak_stored_volume: r.peak_stored_volume(),
                total_overflow: r.total_overflow(),
                emptying_time: extension::emptying_time(&r),
            })
        })
    }

    fn evaluate(
        &self,
        configuration: &Configuration,
        storms: &[StormScenario],
    ) -> ConfigurationResult {
        let unit = Soakwell::new(configuration.unit.diameter, configuration.unit.depth);
        let scenarios: Vec<ScenarioResult> = storms
            .iter()
            .map(|storm| {
                let summary = match &unit {
                    Ok(u) => self.summarize(u, configuration.units, storm),
                    Err(e) => return ScenarioResult::failed(&storm.name, e),
                };
                match summary {
                    Ok(s) => ScenarioResult::evaluated(&storm.name, &s),
                    Err(e) => {
                        debug!("{} failed on {}: {e}", configuration.name(), storm.name);
                        ScenarioResult::failed(&storm.name, &e)
                    }
                }
            })
            .collect();

        let feasible = scenarios.iter().all(|s| s.passes);
        let mut worst_case: Option<(usize, f64)> = None;
        for (index, s) in scenarios.iter().enumerate() {
            match worst_case {
                Some((_, level)) if s.peak_water_level <= level => {}
                _ => worst_case = Some((index, s.peak_water_level)),
            }
        }
        ConfigurationResult {
            configuration: configuration.clone(),
            scenarios,
            feasible,
            worst_case: worst_case.map(|(index, _)| index),
        }
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        if self.cancellation.is_cancelled() {
            return true;
        }
        match deadline {
            Some(d) if Instant::now() >= d => {
                self.cancellation.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn solve(&self, storms: &[StormScenario]) -> Result<SolverReport> {
        if storms.is_empty() {
            return Err(SoakwellError::InvalidParameter(
                "the solver needs at least one storm scenario".to_string(),
            ));
        }
        let (candidates, unavailable) = self.candidates();
        let deadline = self.options.time_budget.map(|b| Instant::now() + b);
        let hits_before = self.cache.hits();
        let misses_before = self.cache.misses();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads.unwrap_or(0))
            .build()?;
        let evaluated: Vec<Option<ConfigurationResult>> = pool.install(|| {
            candidates
                .par_iter()
                .map(|c| {
                    if self.should_stop(deadline) {
                        None
                    } else {
                        Some(self.evaluate(c, storms))
                    }
                })
                .collect()
        });

        let skipped = evaluated.iter().filter(|r| r.is_none()).count();
        let configurations: Vec<ConfigurationResult> =
            evaluated.into_iter().flatten().collect();
        let tested = configurations.len();
        let viable = configurations.iter().filter(|c| c.feasible).count();
        let recommendations = recommend(&configurations);
        info!(
            "Solver tested {tested} configurations, {viable} viable, {skipped} skipped"
        );

        Ok(SolverReport {
            configurations,
            recommendations,
            tested,
            viable,
            skipped,
            unavailable,
            cancelled: skipped > 0,
            cache_hits: self.cache.hits() - hits_before,
            cache_misses: self.cache.misses() - misses_before,
        })
    }
}
