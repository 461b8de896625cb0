//! N identical parallel units sharing the total inflow equally, simulated
//! once per unit and scaled back up.

use crate::device::{SoilParameters, StorageUnit};
use crate::error::{Result, SoakwellError};
use crate::extension::{self, ExtensionOptions};
use crate::hydrograph::InflowHydrograph;
use crate::simulation::SimulationResult;

fn scale_series(series: &mut [f64], n: f64) {
    series.iter_mut().for_each(|v| *v *= n);
}

/// Multiplies every volume and flow-rate series of a per-unit run by
/// `units`. Water level and maximum height are per-unit quantities and are
/// left untouched.
pub fn scale(result: &SimulationResult, units: usize) -> Result<SimulationResult> {
    if units == 0 {
        return Err(SoakwellError::InvalidParameter(
            "unit count must be at least 1".to_string(),
        ));
    }
    let n = units as f64;
    let mut scaled = result.clone();
    scale_series(&mut scaled.inflow_rate, n);
    scale_series(&mut scaled.stored_volume, n);
    scale_series(&mut scaled.outflow_rate, n);
    scale_series(&mut scaled.overflow_rate, n);
    scale_series(&mut scaled.cumulative_inflow, n);
    scale_series(&mut scaled.cumulative_outflow, n);
    scaled.max_volume *= n;
    scaled.units = result.units * units;
    Ok(scaled)
}

/// Splits the inflow across `units`, runs the extended simulation for one
/// unit and scales the result to the whole system.
pub fn simulate_units<U: StorageUnit>(
    hydrograph: &InflowHydrograph,
    unit: &U,
    soil: &SoilParameters,
    units: usize,
    options: &ExtensionOptions,
) -> Result<SimulationResult> {
    let per_unit = hydrograph.split(units)?;
    let result = extension::simulate_extended(&per_unit, unit, soil, options)?;
    scale(&result, units)
}
