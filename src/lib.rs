pub mod analysis;
pub mod cache;
pub mod catalog;
pub mod device;
pub mod error;
pub mod extension;
pub mod french_drain;
pub mod hydrograph;
pub mod input;
mod log;
pub mod mass_balance;
pub mod output;
pub mod scaling;
pub mod simulation;
pub mod sizing;
pub mod solver;
pub mod storm;
pub mod utils;
use ::log::{info, warn};
use input::Input;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub fn run(input_args: &InputArgs) -> Result<(), Box<dyn Error>> {
    log::init();
    log::show_greeting();

    let begin = Instant::now();
    let input = Input::build(&input_args.path)?;
    let config = &input.config;
    let path = Path::new(&input_args.path);

    log::input_reading_line(&input_args.path);

    let soil = config.soil.build()?;
    let extension = config.extension.build()?;

    // a storm that fails to load is left out, the rest still run
    let mut storms = Vec::<storm::StormScenario>::with_capacity(input.storms.len());
    for storm_input in input.storms.iter() {
        match storm_input.build(path) {
            Ok(s) => storms.push(s),
            Err(e) => warn!("Skipping storm '{}': {e}", storm_input.name),
        }
    }
    info!("Loaded {} of {} storms", storms.len(), input.storms.len());

    if let Some(sizing_input) = &config.sizing {
        let volume = sizing::inflow_volume(
            sizing_input.runoff_coefficient,
            sizing_input.intensity_mm_hr,
            sizing_input.area_m2,
            sizing_input.duration_hours,
        );
        let design = sizing::design(
            volume,
            &soil,
            sizing_input.duration_hours * 60.0,
            sizing_input.height,
        )?;
        log::sizing_summary(&design);
    }

    let mut soakwell_analyses = Vec::<analysis::SoakwellAnalysis>::new();
    if let Some(soakwell_input) = &config.soakwell {
        let unit = soakwell_input.build()?;
        log::analysis_greeting(
            &format!(
                "{} soakwell(s) of {:.2} m x {:.2} m",
                soakwell_input.units, unit.diameter, unit.max_height
            ),
            storms.len(),
        );
        log::analysis_table_header();
        log::analysis_table_divider();
        for s in storms.iter() {
            match analysis::analyze_soakwell(s, &unit, &soil, soakwell_input.units, &extension) {
                Ok(a) => {
                    log::soakwell_table_row(&a);
                    soakwell_analyses.push(a);
                }
                Err(e) => warn!("Soakwell analysis failed for '{}': {e}", s.name),
            }
        }
    }

    let mut drain_analyses = Vec::<analysis::FrenchDrainAnalysis>::new();
    if let Some(drain_input) = &config.french_drain {
        let drain = drain_input.build()?;
        log::analysis_greeting(
            &format!("{:.1} m French drain", drain.length),
            storms.len(),
        );
        log::analysis_table_header();
        log::analysis_table_divider();
        for s in storms.iter() {
            match analysis::analyze_french_drain(s, &drain, &soil, &extension) {
                Ok(a) => {
                    log::french_drain_table_row(&a);
                    drain_analyses.push(a);
                }
                Err(e) => warn!("French drain analysis failed for '{}': {e}", s.name),
            }
        }
    }

    log::output_generation_line(&input_args.path);
    output::generate_analysis_outputs(&soakwell_analyses, &drain_analyses, path)?;

    if let Some(solver_input) = &config.solver {
        let options = solver_input.build(extension)?;
        let cache = Arc::new(cache::SimulationCache::new(solver_input.cache_capacity));
        let design_solver =
            solver::DesignSolver::new(&input.catalog, soil, options, cache);
        let solver_begin = Instant::now();
        log::solver_greeting(design_solver.candidates().0.len(), storms.len());
        let report = design_solver.solve(&storms)?;
        log::solver_summary(&report, solver_begin.elapsed());
        output::generate_solver_outputs(&report, path)?;
    }

    log::show_farewell(begin.elapsed());

    Ok(())
}

/// Command line of the `soakwell` binary: the directory holding
/// `config.json` and `storms.json`, where the CSV outputs are also written.
pub struct InputArgs {
    pub path: String,
}

impl InputArgs {
    pub fn build(args: &[String]) -> Result<Self, &'static str> {
        match args.get(1) {
            Some(path) => Ok(Self { path: path.clone() }),
            None => Err("missing input directory (expected: soakwell <INPUT_DIR>)"),
        }
    }
}
