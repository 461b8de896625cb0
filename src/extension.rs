//! Extends a run past the recorded storm with zero-inflow samples so the
//! whole draining trajectory is observed, and derives the emptying time.

use crate::device::{SoilParameters, StorageUnit};
use crate::error::{Result, SoakwellError};
use crate::hydrograph::InflowHydrograph;
use crate::simulation::{self, SimulationResult};
use crate::utils;
use serde::Serialize;

/// Fraction of the peak stored volume at which a unit counts as emptied.
pub const EMPTIED_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtensionOptions {
    /// Simulated horizon, measured on the hydrograph clock (hours)
    pub horizon_hours: f64,
    /// Spacing of the synthetic zero-inflow samples (minutes)
    pub interval_minutes: f64,
    /// Flow (m³/s) above which a sample counts as significant inflow
    pub inflow_threshold: f64,
}

impl ExtensionOptions {
    pub fn new(
        horizon_hours: f64,
        interval_minutes: f64,
        inflow_threshold: f64,
    ) -> Result<Self> {
        if !horizon_hours.is_finite() || horizon_hours < 0.0 {
            return Err(SoakwellError::InvalidParameter(format!(
                "extension horizon must be finite and non-negative, got {horizon_hours}"
            )));
        }
        if !interval_minutes.is_finite() || interval_minutes <= 0.0 {
            return Err(SoakwellError::InvalidParameter(format!(
                "extension interval must be positive, got {interval_minutes}"
            )));
        }
        if !inflow_threshold.is_finite() || inflow_threshold < 0.0 {
            return Err(SoakwellError::InvalidParameter(format!(
                "inflow threshold must be non-negative, got {inflow_threshold}"
            )));
        }
        Ok(Self {
            horizon_hours,
            interval_minutes,
            inflow_threshold,
        })
    }

    pub fn horizon_minutes(&self) -> f64 {
        self.horizon_hours * 60.0
    }
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        Self {
            horizon_hours: 24.0,
            interval_minutes: 5.0,
            inflow_threshold: 0.001,
        }
    }
}

/// Appends zero-inflow samples every `interval_minutes` after the end of
/// the record, up to the horizon, when the last significant inflow happens
/// before the horizon. Returns the hydrograph unchanged otherwise.
pub fn extend(
    hydrograph: &InflowHydrograph,
    options: &ExtensionOptions,
) -> InflowHydrograph {
    let horizon = options.horizon_minutes();
    let last_inflow = hydrograph.last_significant_inflow_time(options.inflow_threshold);
    if last_inflow >= horizon {
        return hydrograph.clone();
    }

    let end = hydrograph.end_time();
    let mut times = Vec::<f64>::new();
    let mut k = 1.0;
    loop {
        let t = end + k * options.interval_minutes;
        if t > horizon {
            break;
        }
        times.push(t);
        k += 1.0;
    }
    if times.is_empty() {
        return hydrograph.clone();
    }
    let zeros = vec![0.0; times.len()];
    hydrograph.extended_with(&times, &zeros)
}

/// Simulates the extended hydrograph, stopping once the unit is empty
/// inside the synthetic tail.
pub fn simulate_extended<U: StorageUnit>(
    hydrograph: &InflowHydrograph,
    unit: &U,
    soil: &SoilParameters,
    options: &ExtensionOptions,
) -> Result<SimulationResult> {
    let extended = extend(hydrograph, options);
    simulation::integrate(&extended, unit, soil, Some(hydrograph.len()))
}

/// Time from the peak stored volume down to `EMPTIED_FRACTION` of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EmptyingTime {
    /// Minutes between the peak and the first step at or below the
    /// threshold. Zero for a unit that never stored anything.
    Drained { minutes: f64 },
    /// The threshold was not reached within the simulated horizon.
    Indeterminate,
}

impl EmptyingTime {
    pub fn minutes(&self) -> Option<f64> {
        match self {
            EmptyingTime::Drained { minutes } => Some(*minutes),
            EmptyingTime::Indeterminate => None,
        }
    }
}

pub fn emptying_time(result: &SimulationResult) -> EmptyingTime {
    let peak_index = match utils::first_peak_index(&result.stored_volume) {
        Some(index) => index,
        None => return EmptyingTime::Indeterminate,
    };
    let threshold = EMPTIED_FRACTION * result.stored_volume[peak_index];
    result.stored_volume[peak_index..]
        .iter()
        .position(|v| *v <= threshold)
        .map(|offset| EmptyingTime::Drained {
            minutes: result.time_min[peak_index + offset]
                - result.time_min[peak_index],
        })
        .unwrap_or(EmptyingTime::Indeterminate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Soakwell;

    fn storm() -> InflowHydrograph {
        InflowHydrograph::new(
            vec![0.0, 5.0, 10.0, 15.0, 20.0],
            vec![0.0, 0.002, 0.004, 0.002, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_extend_appends_zero_samples_to_horizon() {
        let options = ExtensionOptions::new(1.0, 5.0, 0.001).unwrap();
        let extended = extend(&storm(), &options);
        assert_eq!(extended.len(), 5 + 8);
        assert_eq!(extended.end_time(), 60.0);
        assert!(extended.flow()[5..].iter().all(|q| *q == 0.0));
        assert_eq!(&extended.time_min()[..5], storm().time_min());
    }

    #[test]
    fn test_extend_keeps_time_increasing() {
        // significant inflow ends at 5 min but the record runs to 20 min
        let h = InflowHydrograph::new(
            vec![0.0, 5.0, 10.0, 20.0],
            vec![0.0, 0.01, 0.0, 0.0],
        )
        .unwrap();
        let options = ExtensionOptions::new(0.5, 5.0, 0.001).unwrap();
        let extended = extend(&h, &options);
        assert_eq!(extended.time_min(), &[0.0, 5.0, 10.0, 20.0, 25.0, 30.0]);
    }

    #[test]
    fn test_extend_noop_past_horizon() {
        let options = ExtensionOptions::new(0.25, 5.0, 0.001).unwrap();
        let h = storm();
        assert_eq!(extend(&h, &options), h);
    }

    #[test]
    fn test_rejects_bad_options() {
        assert!(ExtensionOptions::new(24.0, 0.0, 0.001).is_err());
        assert!(ExtensionOptions::new(-1.0, 5.0, 0.001).is_err());
        assert!(ExtensionOptions::new(24.0, 5.0, f64::NAN).is_err());
    }

    #[test]
    fn test_overflow_pulse_has_finite_emptying_time() {
        let sw = Soakwell::square(0.9).unwrap();
        let soil = SoilParameters::new(1e-4, 1.0).unwrap();
        let h = InflowHydrograph::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 0.01, 0.01, 0.0],
        )
        .unwrap();
        let r = simulate_extended(&h, &sw, &soil, &ExtensionOptions::default())
            .unwrap();
        assert!(r.peak_overflow() > 0.0);
        assert_eq!(r.recorded_len, 4);
        match emptying_time(&r) {
            EmptyingTime::Drained { minutes } => assert!(minutes > 0.0),
            EmptyingTime::Indeterminate => panic!("unit should drain"),
        }
    }

    #[test]
    fn test_emptying_time_indeterminate_without_soil_loss() {
        let sw = Soakwell::square(1.2).unwrap();
        let soil = SoilParameters::new(0.0, 1.0).unwrap();
        let r = simulate_extended(&storm(), &sw, &soil, &ExtensionOptions::default())
            .unwrap();
        assert_eq!(emptying_time(&r), EmptyingTime::Indeterminate);
        assert_eq!(r.time_min.last().copied(), Some(24.0 * 60.0));
    }

    #[test]
    fn test_emptying_time_zero_when_never_filled() {
        let sw = Soakwell::square(1.2).unwrap();
        let h = InflowHydrograph::new(vec![0.0, 5.0], vec![0.0, 0.0]).unwrap();
        let r = simulate_extended(&h, &sw, &SoilParameters::default(), &ExtensionOptions::default())
            .unwrap();
        assert_eq!(emptying_time(&r), EmptyingTime::Drained { minutes: 0.0 });
        assert_eq!(emptying_time(&r).minutes(), Some(0.0));
    }

    #[test]
    fn test_early_termination_inside_tail() {
        let sw = Soakwell::square(0.6).unwrap();
        let soil = SoilParameters::new(1e-2, 1.0).unwrap();
        let r = simulate_extended(&storm(), &sw, &soil, &ExtensionOptions::default())
            .unwrap();
        assert!(r.time_min.last().copied().unwrap() < 24.0 * 60.0);
        assert!(r.final_stored_volume() < crate::simulation::NEGLIGIBLE_VOLUME);
    }
}
