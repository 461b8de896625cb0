use crate::analysis::{FrenchDrainAnalysis, SoakwellAnalysis};
use crate::sizing::SoakwellDesign;
use crate::solver::SolverReport;
use chrono::{DateTime, Utc};
use log::{Level, LevelFilter, Metadata, Record};
use std::time::Duration;

/// Timestamped logger writing to stdout next to the console tables.
pub struct RunLogger;

static RUN_LOGGER: RunLogger = RunLogger;

impl log::Log for RunLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now: DateTime<Utc> = Utc::now();
            println!(
                "[{}] {} - {}",
                now.to_rfc3339(),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Installs the logger. Later calls are ignored.
pub fn init() {
    if log::set_logger(&RUN_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

pub fn show_greeting() {
    println!(
        "\nsoakwell-rs v{} - storage and infiltration analysis",
        env!("CARGO_PKG_VERSION")
    );
}

pub fn input_reading_line(path: &str) {
    println!("\nReading input files from '{path}'");
}

pub fn output_generation_line(path: &str) {
    println!("\nWriting outputs to '{path}'");
}

pub fn show_farewell(time: Duration) {
    println!(
        "\nTotal running time: {:.2} s",
        time.as_millis() as f64 / 1000.0
    )
}

pub fn sizing_summary(design: &SoakwellDesign) {
    println!("\n# Sizing estimate");
    println!("- Required volume: {:.2} m³", design.volume_required);
    println!("- Diameter: {:.2} m", design.diameter);
    match design.emptying_time_hours {
        Some(t) => println!("- Emptying time: {:.2} h", t),
        None => println!("- Emptying time: not applicable"),
    }
    if let Some(alt) = design.alternative {
        println!(
            "- Alternative: {} soakwells of {:.2} m ({:.2} m³ each)",
            alt.units, alt.diameter_per_unit, alt.volume_per_unit
        );
    }
}

/// Helper function for displaying the greeting data for the analysis
pub fn analysis_greeting(device: &str, num_storms: usize) {
    println!("\n# Analysing {device}");
    println!("- Storms: {num_storms}\n");
}

/// Helper function for displaying the analysis table header
pub fn analysis_table_header() {
    println!(
        "{0: ^16} | {1: ^14} | {2: ^14} | {3: ^14} | {4: ^12}",
        "storm", "overflow (m³)", "peak level (m)", "emptying (min)", "balance (%)"
    )
}

/// Helper function for displaying a divider for the analysis table
pub fn analysis_table_divider() {
    println!(
        "------------------------------------------------------------------------------------"
    )
}

/// Helper function for displaying a row of soakwell results
pub fn soakwell_table_row(analysis: &SoakwellAnalysis) {
    let emptying = match analysis.emptying_time.minutes() {
        Some(m) => format!("{m:.1}"),
        None => "-".to_string(),
    };
    println!(
        "{0: >16} | {1: >14.4} | {2: >14.4} | {3: >14} | {4: >12.6}",
        analysis.storm,
        analysis.result.total_overflow(),
        analysis.result.peak_water_level(),
        emptying,
        analysis.mass_balance.error_percent
    )
}

/// Helper function for displaying a row of French drain results
pub fn french_drain_table_row(analysis: &FrenchDrainAnalysis) {
    println!(
        "{0: >16} | {1: >14.4} | {2: >14.4} | {3: >14} | {4: >12.6}",
        analysis.storm,
        analysis.performance.total_overflow,
        analysis.performance.max_water_level,
        "-",
        analysis.mass_balance.error_percent
    )
}

/// Helper function for displaying the greeting data for the solver
pub fn solver_greeting(num_candidates: usize, num_storms: usize) {
    println!("\n# Solving");
    println!("- Configurations: {num_candidates}");
    println!("- Storms: {num_storms}\n");
}

pub fn solver_summary(report: &SolverReport, time: Duration) {
    println!(
        "Tested: {} | Viable: {} | Skipped: {} | Not catalogued: {}",
        report.tested, report.viable, report.skipped, report.unavailable
    );
    let criteria = [
        ("Lowest cost", report.recommendations.min_cost),
        ("Smallest volume", report.recommendations.min_volume),
        ("Fewest units", report.recommendations.min_units),
    ];
    for (label, index) in criteria {
        if let Some(c) = report.recommended(index) {
            println!(
                "- {label}: {} ({:.2} m³, ${:.2})",
                c.configuration.name(),
                c.configuration.total_volume(),
                c.configuration.total_cost()
            );
        }
    }
    println!(
        "\nSolver time: {:.2} s",
        time.as_millis() as f64 / 1000.0
    )
}
