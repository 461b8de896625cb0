use crate::catalog::{CatalogEntry, TableCatalog};
use crate::device::{FrenchDrain, Soakwell, SoilParameters};
use crate::error::{Result, SoakwellError};
use crate::extension::ExtensionOptions;
use crate::hydrograph::InflowHydrograph;
use crate::solver::SolverOptions;
use crate::storm::{DesignStorm, StormScenario, StormShape};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize)]
pub struct SoilInput {
    pub ks: f64,
    pub sr: f64,
}

impl SoilInput {
    pub fn build(&self) -> Result<SoilParameters> {
        SoilParameters::new(self.ks, self.sr)
    }
}

fn default_extend_to_hours() -> f64 {
    24.0
}

fn default_emptying_interval_minutes() -> f64 {
    5.0
}

fn default_inflow_threshold() -> f64 {
    0.001
}

#[derive(Deserialize)]
pub struct ExtensionInput {
    #[serde(default = "default_extend_to_hours")]
    pub extend_to_hours: f64,
    #[serde(default = "default_emptying_interval_minutes")]
    pub emptying_interval_minutes: f64,
    #[serde(default = "default_inflow_threshold")]
    pub inflow_threshold: f64,
}

impl Default for ExtensionInput {
    fn default() -> Self {
        Self {
            extend_to_hours: default_extend_to_hours(),
            emptying_interval_minutes: default_emptying_interval_minutes(),
            inflow_threshold: default_inflow_threshold(),
        }
    }
}

impl ExtensionInput {
    pub fn build(&self) -> Result<ExtensionOptions> {
        ExtensionOptions::new(
            self.extend_to_hours,
            self.emptying_interval_minutes,
            self.inflow_threshold,
        )
    }
}

#[derive(Deserialize)]
pub struct SoakwellInput {
    pub diameter: f64,
    pub depth: f64,
    pub units: usize,
}

impl SoakwellInput {
    pub fn build(&self) -> Result<Soakwell> {
        Soakwell::new(self.diameter, self.depth)
    }
}

#[derive(Deserialize)]
pub struct FrenchDrainInput {
    pub trench_width: f64,
    pub trench_depth: f64,
    pub length: f64,
    pub porosity: f64,
    pub pipe_diameter: f64,
    pub pipe_slope: f64,
    pub pipe_roughness: f64,
}

impl FrenchDrainInput {
    pub fn build(&self) -> Result<FrenchDrain> {
        FrenchDrain::new(
            self.trench_width,
            self.trench_depth,
            self.length,
            self.porosity,
            self.pipe_diameter,
            self.pipe_slope,
            self.pipe_roughness,
        )
    }
}

#[derive(Deserialize)]
pub struct SolverInput {
    pub diameters: Vec<f64>,
    pub depths: Vec<f64>,
    pub max_units: usize,
    pub cache_capacity: usize,
    pub threads: Option<usize>,
    pub time_budget_seconds: Option<f64>,
}

impl SolverInput {
    pub fn build(&self, extension: ExtensionOptions) -> Result<SolverOptions> {
        if self.max_units == 0 {
            return Err(SoakwellError::InvalidParameter(
                "solver max_units must be at least 1".to_string(),
            ));
        }
        let time_budget = match self.time_budget_seconds {
            Some(s) if s.is_finite() && s >= 0.0 => Some(Duration::from_secs_f64(s)),
            Some(s) => {
                return Err(SoakwellError::InvalidParameter(format!(
                    "solver time budget must be non-negative, got {s}"
                )))
            }
            None => None,
        };
        Ok(SolverOptions {
            diameters: self.diameters.clone(),
            depths: self.depths.clone(),
            max_units: self.max_units,
            threads: self.threads,
            time_budget,
            extension,
        })
    }
}

/// Rational-method design inputs for the closed-form sizing estimate.
#[derive(Deserialize)]
pub struct SizingInput {
    pub runoff_coefficient: f64,
    pub intensity_mm_hr: f64,
    pub area_m2: f64,
    pub duration_hours: f64,
    pub height: Option<f64>,
}

#[derive(Deserialize)]
pub struct Config {
    pub soil: SoilInput,
    #[serde(default)]
    pub extension: ExtensionInput,
    pub soakwell: Option<SoakwellInput>,
    pub french_drain: Option<FrenchDrainInput>,
    pub solver: Option<SolverInput>,
    pub sizing: Option<SizingInput>,
}

pub fn read_config_input(filepath: &Path) -> Result<Config> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: Config = serde_json::from_str(&contents)?;
    Ok(parsed)
}

#[derive(Deserialize)]
pub struct DesignStormInput {
    pub intensity_mm_hr: f64,
    pub duration_hours: f64,
    pub catchment_area_m2: f64,
    pub runoff_coefficient: f64,
    pub shape: String,
}

impl DesignStormInput {
    pub fn build(&self) -> Result<DesignStorm> {
        DesignStorm::new(
            self.intensity_mm_hr,
            self.duration_hours,
            self.catchment_area_m2,
            self.runoff_coefficient,
            self.shape.parse::<StormShape>()?,
        )
    }
}

/// A storm given either as a hydrograph file or as a design storm.
#[derive(Deserialize)]
pub struct StormInput {
    pub name: String,
    pub aep: Option<String>,
    pub file: Option<String>,
    pub design: Option<DesignStormInput>,
}

pub fn read_storms_input(filepath: &Path) -> Result<Vec<StormInput>> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: Vec<StormInput> = serde_json::from_str(&contents)?;
    Ok(parsed)
}

#[derive(Deserialize)]
struct HydrographRow {
    time_min: f64,
    flow: f64,
}

/// Reads a two-column `time_min,flow` CSV file.
pub fn read_hydrograph_csv(filepath: &Path) -> Result<InflowHydrograph> {
    let mut rdr = csv::Reader::from_path(filepath)?;
    let mut time_min = Vec::<f64>::new();
    let mut flow = Vec::<f64>::new();
    for row in rdr.deserialize() {
        let row: HydrographRow = row?;
        time_min.push(row.time_min);
        flow.push(row.flow);
    }
    InflowHydrograph::new(time_min, flow)
}

impl StormInput {
    pub fn build(&self, path: &Path) -> Result<StormScenario> {
        let hydrograph = match (&self.file, &self.design) {
            (Some(file), None) => read_hydrograph_csv(&path.join(file))?,
            (None, Some(design)) => design.build()?.hydrograph()?,
            _ => {
                return Err(SoakwellError::InvalidParameter(format!(
                    "storm '{}' needs exactly one of 'file' or 'design'",
                    self.name
                )))
            }
        };
        Ok(StormScenario::new(
            &self.name,
            self.aep.as_deref(),
            hydrograph,
        ))
    }
}

pub fn read_catalog_input(filepath: &Path) -> Result<TableCatalog> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: Vec<CatalogEntry> = serde_json::from_str(&contents)?;
    Ok(TableCatalog::new(parsed))
}

pub struct Input {
    pub config: Config,
    pub storms: Vec<StormInput>,
    pub catalog: TableCatalog,
}

impl Input {
    /// Reads the input directory. The catalog is only required when the
    /// solver is configured.
    pub fn build(path: &str) -> Result<Self> {
        let root = Path::new(path);
        let config = read_config_input(&root.join("config.json"))?;
        let storms = read_storms_input(&root.join("storms.json"))?;
        let catalog = if config.solver.is_some() {
            read_catalog_input(&root.join("catalog.json"))?
        } else {
            TableCatalog::default()
        };
        Ok(Self {
            config,
            storms,
            catalog,
        })
    }
}
