//! Storage-infiltration volume balance for a single storage unit.
//!
//! Each step holds the inflow of sample `i` over `(t[i-1], t[i]]`, drains
//! the unit at a rate proportional to the water level at the start of the
//! step, spills anything above capacity as overflow and never lets the
//! stored volume go negative.

use crate::device::{SoilParameters, StorageUnit};
use crate::error::{Result, SoakwellError};
use crate::hydrograph::InflowHydrograph;
use crate::utils;
use serde::Serialize;

/// Stored volume (m³) below which a unit receiving no inflow is treated
/// as empty for early termination.
pub const NEGLIGIBLE_VOLUME: f64 = 1e-6;

/// What the unit is doing over a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Regime {
    Empty,
    Filling,
    AtCapacity,
    Draining,
}

/// Full per-step series of a run. Step 0 is the initial empty state.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub time_min: Vec<f64>,
    pub inflow_rate: Vec<f64>,
    pub stored_volume: Vec<f64>,
    pub outflow_rate: Vec<f64>,
    pub overflow_rate: Vec<f64>,
    pub water_level: Vec<f64>,
    pub cumulative_inflow: Vec<f64>,
    pub cumulative_outflow: Vec<f64>,
    pub regime: Vec<Regime>,
    /// Capacity of everything the series represents
    pub max_volume: f64,
    pub max_height: f64,
    /// Number of leading samples that came from the recorded hydrograph
    pub recorded_len: usize,
    /// Number of identical parallel units the series represents
    pub units: usize,
}

impl SimulationResult {
    fn with_capacity(n: usize, max_volume: f64, max_height: f64) -> Self {
        Self {
            time_min: Vec::with_capacity(n),
            inflow_rate: Vec::with_capacity(n),
            stored_volume: Vec::with_capacity(n),
            outflow_rate: Vec::with_capacity(n),
            overflow_rate: Vec::with_capacity(n),
            water_level: Vec::with_capacity(n),
            cumulative_inflow: Vec::with_capacity(n),
            cumulative_outflow: Vec::with_capacity(n),
            regime: Vec::with_capacity(n),
            max_volume,
            max_height,
            recorded_len: n,
            units: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.time_min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_min.is_empty()
    }

    pub fn peak_overflow(&self) -> f64 {
        utils::peak(&self.overflow_rate)
    }

    pub fn peak_water_level(&self) -> f64 {
        utils::peak(&self.water_level)
    }

    pub fn peak_stored_volume(&self) -> f64 {
        utils::peak(&self.stored_volume)
    }

    pub fn final_stored_volume(&self) -> f64 {
        self.stored_volume.last().copied().unwrap_or(0.0)
    }

    /// Overflowed volume (m³) over the whole run.
    pub fn total_overflow(&self) -> f64 {
        utils::integrate_rate(&self.time_min, &self.overflow_rate)
    }

    /// Whether any step reached the given regime.
    pub fn visits(&self, regime: Regime) -> bool {
        self.regime.contains(&regime)
    }
}

/// Runs the volume balance over the whole hydrograph.
pub fn simulate<U: StorageUnit>(
    hydrograph: &InflowHydrograph,
    unit: &U,
    soil: &SoilParameters,
) -> Result<SimulationResult> {
    integrate(hydrograph, unit, soil, None)
}

/// Runs the volume balance, stopping at the first step at or after
/// `early_stop_from` where the unit is empty and receives no inflow.
pub(crate) fn integrate<U: StorageUnit>(
    hydrograph: &InflowHydrograph,
    unit: &U,
    soil: &SoilParameters,
    early_stop_from: Option<usize>,
) -> Result<SimulationResult> {
    let area = unit.planform_area();
    let max_height = unit.max_height();
    if !(area.is_finite() && area > 0.0) {
        return Err(SoakwellError::NumericDegeneracy(format!(
            "planform area must be positive, got {area}"
        )));
    }
    if !(max_height.is_finite() && max_height > 0.0) {
        return Err(SoakwellError::NumericDegeneracy(format!(
            "maximum height must be positive, got {max_height}"
        )));
    }
    let max_volume = unit.max_volume();
    let max_outflow_rate = unit.max_outflow_rate(soil);

    let time_min = hydrograph.time_min();
    let inflow_rates = hydrograph.flow();
    let n = hydrograph.len();

    let mut result = SimulationResult::with_capacity(n, max_volume, max_height);
    result.time_min.push(time_min[0]);
    result.inflow_rate.push(inflow_rates[0]);
    result.stored_volume.push(0.0);
    result.outflow_rate.push(0.0);
    result.overflow_rate.push(0.0);
    result.water_level.push(0.0);
    result.cumulative_inflow.push(0.0);
    result.cumulative_outflow.push(0.0);
    result.regime.push(Regime::Empty);

    for i in 1..n {
        let dt = (time_min[i] - time_min[i - 1]) * utils::SECONDS_PER_MINUTE;
        let inflow = inflow_rates[i];
        let current_volume = result.stored_volume[i - 1];

        let current_level = current_volume / area;
        let water_level = current_level.min(max_height);
        let outflow_rate = if current_volume > 0.0 {
            max_outflow_rate * (current_level / max_height).min(1.0)
        } else {
            0.0
        };

        let volume_in = inflow * dt;
        let volume_out = outflow_rate * dt;
        let mut new_volume = current_volume + volume_in - volume_out;

        let overflow_rate = if new_volume > max_volume {
            let spilled = new_volume - max_volume;
            new_volume = max_volume;
            spilled / dt
        } else {
            0.0
        };
        new_volume = new_volume.max(0.0);

        let regime = if overflow_rate > 0.0 || new_volume >= max_volume {
            Regime::AtCapacity
        } else if new_volume <= 0.0 {
            Regime::Empty
        } else if new_volume > current_volume {
            Regime::Filling
        } else {
            Regime::Draining
        };

        result.time_min.push(time_min[i]);
        result.inflow_rate.push(inflow);
        result.stored_volume.push(new_volume);
        result.outflow_rate.push(outflow_rate);
        result.overflow_rate.push(overflow_rate);
        result.water_level.push(water_level);
        result
            .cumulative_inflow
            .push(result.cumulative_inflow[i - 1] + volume_in);
        result
            .cumulative_outflow
            .push(result.cumulative_outflow[i - 1] + volume_out);
        result.regime.push(regime);

        if let Some(from) = early_stop_from {
            if i >= from && new_volume < NEGLIGIBLE_VOLUME && inflow == 0.0 {
                break;
            }
        }
    }

    result.recorded_len = early_stop_from.unwrap_or(n).min(result.len());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Soakwell;
    use crate::mass_balance;
    use rand::prelude::*;
    use rand_distr::LogNormal;
    use rand_xoshiro::Xoshiro256Plus;

    fn minutes(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    fn pulse_then_dry(pulse_flow: f64, pulse_steps: usize, n: usize) -> InflowHydrograph {
        let flow = (0..n)
            .map(|i| if i >= 1 && i <= pulse_steps { pulse_flow } else { 0.0 })
            .collect();
        InflowHydrograph::new(minutes(n), flow).unwrap()
    }

    fn triangular(peak: f64, duration_min: usize) -> InflowHydrograph {
        let half = duration_min as f64 / 2.0;
        let flow = (0..=duration_min)
            .map(|i| {
                let t = i as f64;
                if t <= half {
                    peak * t / half
                } else {
                    peak * (duration_min as f64 - t) / half
                }
            })
            .collect();
        InflowHydrograph::new(minutes(duration_min + 1), flow).unwrap()
    }

    #[test]
    fn test_zero_inflow_stays_empty() {
        let h = InflowHydrograph::new(minutes(50), vec![0.0; 50]).unwrap();
        let sw = Soakwell::square(1.2).unwrap();
        let r = simulate(&h, &sw, &SoilParameters::default()).unwrap();
        assert_eq!(r.len(), 50);
        assert!(r.stored_volume.iter().all(|v| *v == 0.0));
        assert!(r.outflow_rate.iter().all(|v| *v == 0.0));
        assert!(r.overflow_rate.iter().all(|v| *v == 0.0));
        assert!(r.regime.iter().all(|g| *g == Regime::Empty));
    }

    #[test]
    fn test_first_sample_is_not_integrated() {
        let h = InflowHydrograph::new(vec![0.0, 1.0], vec![10.0, 0.0]).unwrap();
        let sw = Soakwell::square(1.2).unwrap();
        let r = simulate(&h, &sw, &SoilParameters::default()).unwrap();
        assert_eq!(r.final_stored_volume(), 0.0);
        assert_eq!(r.cumulative_inflow, vec![0.0, 0.0]);
    }

    #[test]
    fn test_filling_volume_matches_inflow_without_soil_loss() {
        let h = pulse_then_dry(0.001, 5, 10);
        let sw = Soakwell::square(1.2).unwrap();
        let soil = SoilParameters::new(0.0, 1.0).unwrap();
        let r = simulate(&h, &sw, &soil).unwrap();
        assert!((r.final_stored_volume() - 0.3).abs() < 1e-12);
        assert!(r.outflow_rate.iter().all(|q| *q == 0.0));
    }

    #[test]
    fn test_overflow_only_while_above_capacity() {
        let sw = Soakwell::square(1.2).unwrap();
        let soil = SoilParameters::default();
        // 0.01 m³/s for 10 minutes = 6 m³ against ~1.36 m³ of storage
        let h = pulse_then_dry(0.01, 10, 600);
        let r = simulate(&h, &sw, &soil).unwrap();
        assert!(r.peak_overflow() > 0.0);
        for i in 1..r.len() {
            let unclamped = r.stored_volume[i - 1] + r.inflow_rate[i] * 60.0
                - r.outflow_rate[i] * 60.0;
            if unclamped > r.max_volume {
                assert!(r.overflow_rate[i] > 0.0, "step {i}");
                assert_eq!(r.stored_volume[i], r.max_volume);
            } else {
                assert_eq!(r.overflow_rate[i], 0.0, "step {i}");
            }
        }
        // no overflow once the pulse has passed
        assert!(r.overflow_rate[11..].iter().all(|q| *q == 0.0));
    }

    #[test]
    fn test_all_four_regimes_are_reached() {
        let sw = Soakwell::square(0.9).unwrap();
        let soil = SoilParameters::new(1e-4, 1.0).unwrap();
        let h = pulse_then_dry(0.002, 10, 2000);
        let r = simulate(&h, &sw, &soil).unwrap();
        assert!(r.visits(Regime::Empty));
        assert!(r.visits(Regime::Filling));
        assert!(r.visits(Regime::AtCapacity));
        assert!(r.visits(Regime::Draining));
        assert_eq!(r.regime[0], Regime::Empty);
        assert_eq!(r.regime[1], Regime::Filling);
        assert_eq!(r.regime[10], Regime::AtCapacity);
        assert_eq!(r.regime[11], Regime::Draining);
        assert_eq!(*r.regime.last().unwrap(), Regime::Draining);
    }

    #[test]
    fn test_large_step_drains_to_empty() {
        let sw = Soakwell::square(0.6).unwrap();
        let soil = SoilParameters::new(1e-2, 1.0).unwrap();
        let h = InflowHydrograph::new(
            vec![0.0, 1.0, 600.0, 1200.0],
            vec![0.0, 0.001, 0.0, 0.0],
        )
        .unwrap();
        let r = simulate(&h, &sw, &soil).unwrap();
        assert_eq!(r.stored_volume[2], 0.0);
        assert_eq!(r.regime[2], Regime::Empty);
        assert_eq!(r.outflow_rate[3], 0.0);
    }

    #[test]
    fn test_boundedness_and_monotone_capacity() {
        let sw = Soakwell::new(1.2, 1.5).unwrap();
        let soil = SoilParameters::default();
        let h = triangular(0.02, 120);
        let r = simulate(&h, &sw, &soil).unwrap();
        for i in 0..r.len() {
            assert!(r.stored_volume[i] >= 0.0);
            assert!(r.stored_volume[i] <= r.max_volume);
            assert!(r.water_level[i] >= 0.0);
            assert!(r.water_level[i] <= r.max_height);
        }
        let mut pairs: Vec<(f64, f64)> = r
            .water_level
            .iter()
            .copied()
            .zip(r.outflow_rate.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            assert!(w[1].1 >= w[0].1);
        }
    }

    #[test]
    fn test_conservation_for_smooth_hydrograph() {
        let sw = Soakwell::square(1.5).unwrap();
        let soil = SoilParameters::new(5e-5, 1.0).unwrap();
        let r = simulate(&triangular(0.005, 180), &sw, &soil).unwrap();
        let record = mass_balance::audit(&r);
        assert!(record.total_inflow > 0.0);
        assert!(record.error_percent.abs() < 1e-6);
        assert!(record.warning.is_none());
    }

    #[test]
    fn test_random_hydrographs_respect_invariants() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let peaks = LogNormal::new(-5.0, 1.0).unwrap();
        let sw = Soakwell::square(1.2).unwrap();
        let soil = SoilParameters::default();
        for _ in 0..20 {
            let n = 60;
            let flow: Vec<f64> = (0..n)
                .map(|i| {
                    let shape = (std::f64::consts::PI * i as f64 / n as f64).sin();
                    shape.max(0.0) * peaks.sample(&mut rng)
                })
                .collect();
            let h = InflowHydrograph::new(minutes(n), flow).unwrap();
            let r = simulate(&h, &sw, &soil).unwrap();
            assert!(r.stored_volume.iter().all(|v| *v >= 0.0 && *v <= r.max_volume));
            let record = mass_balance::audit(&r);
            assert!(record.error.abs() <= 1e-9 * record.total_inflow.max(1.0));
        }
    }

    #[test]
    fn test_early_stop_truncates_after_drain() {
        let sw = Soakwell::square(0.6).unwrap();
        let soil = SoilParameters::new(1e-2, 1.0).unwrap();
        let h = pulse_then_dry(0.0005, 2, 500);
        let r = integrate(&h, &sw, &soil, Some(10)).unwrap();
        assert!(r.len() < 500);
        assert!(r.final_stored_volume() < NEGLIGIBLE_VOLUME);
        assert_eq!(r.recorded_len, 10);
    }
}
