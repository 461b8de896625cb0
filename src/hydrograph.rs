use crate::error::{Result, SoakwellError};
use crate::utils;
use xxhash_rust::xxh3::xxh3_64;

/// An ordered inflow time series: time in minutes, flow in m³/s.
///
/// Construction is the only place samples are validated, so every
/// hydrograph handed to the simulator is non-empty, finite, strictly
/// increasing in time and non-negative in flow.
#[derive(Debug, Clone, PartialEq)]
pub struct InflowHydrograph {
    time_min: Vec<f64>,
    flow: Vec<f64>,
    fingerprint: u64,
}

impl InflowHydrograph {
    pub fn new(time_min: Vec<f64>, flow: Vec<f64>) -> Result<Self> {
        if time_min.is_empty() && flow.is_empty() {
            return Err(SoakwellError::EmptyHydrograph);
        }
        if time_min.len() != flow.len() {
            return Err(SoakwellError::LengthMismatch {
                times: time_min.len(),
                flows: flow.len(),
            });
        }
        for (index, (t, q)) in time_min.iter().zip(flow.iter()).enumerate() {
            if !t.is_finite() || !q.is_finite() {
                return Err(SoakwellError::NonFiniteSample { index });
            }
            if *q < 0.0 {
                return Err(SoakwellError::NegativeFlow { index, value: *q });
            }
            if index > 0 && *t <= time_min[index - 1] {
                return Err(SoakwellError::NonMonotonicTime { index });
            }
        }
        let fingerprint = fingerprint(&time_min, &flow);
        Ok(Self {
            time_min,
            flow,
            fingerprint,
        })
    }

    /// Builds a hydrograph from `(time_min, flow)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let (time_min, flow) = pairs.iter().copied().unzip();
        Self::new(time_min, flow)
    }

    pub fn len(&self) -> usize {
        self.time_min.len()
    }

    /// Always `false` for a constructed hydrograph.
    pub fn is_empty(&self) -> bool {
        self.time_min.is_empty()
    }

    pub fn time_min(&self) -> &[f64] {
        &self.time_min
    }

    pub fn flow(&self) -> &[f64] {
        &self.flow
    }

    /// Canonical hash of the samples, used as the hydrograph identity in
    /// simulation cache keys.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn start_time(&self) -> f64 {
        self.time_min[0]
    }

    pub fn end_time(&self) -> f64 {
        self.time_min[self.time_min.len() - 1]
    }

    pub fn peak_flow(&self) -> f64 {
        utils::peak(&self.flow)
    }

    /// Inflow volume (m³) integrated with the simulator's discretization.
    pub fn total_volume(&self) -> f64 {
        utils::integrate_rate(&self.time_min, &self.flow)
    }

    /// Time of the last sample whose flow exceeds `threshold`, or the end
    /// of the record when no sample does.
    pub fn last_significant_inflow_time(&self, threshold: f64) -> f64 {
        self.flow
            .iter()
            .rposition(|q| *q > threshold)
            .map(|index| self.time_min[index])
            .unwrap_or_else(|| self.end_time())
    }

    /// The share of this hydrograph received by one of `units` identical
    /// parallel units.
    pub fn split(&self, units: usize) -> Result<Self> {
        if units == 0 {
            return Err(SoakwellError::InvalidParameter(
                "unit count must be at least 1".to_string(),
            ));
        }
        let n = units as f64;
        let flow: Vec<f64> = self.flow.iter().map(|q| q / n).collect();
        let fingerprint = fingerprint(&self.time_min, &flow);
        Ok(Self {
            time_min: self.time_min.clone(),
            flow,
            fingerprint,
        })
    }

    /// Appends samples after the current end. Callers are responsible for
    /// keeping time increasing and flow non-negative.
    pub(crate) fn extended_with(&self, time_min: &[f64], flow: &[f64]) -> Self {
        let mut times = self.time_min.clone();
        let mut flows = self.flow.clone();
        times.extend_from_slice(time_min);
        flows.extend_from_slice(flow);
        let fingerprint = fingerprint(&times, &flows);
        Self {
            time_min: times,
            flow: flows,
            fingerprint,
        }
    }
}

fn fingerprint(time_min: &[f64], flow: &[f64]) -> u64 {
    let mut bytes = Vec::<u8>::with_capacity(16 * time_min.len());
    for (t, q) in time_min.iter().zip(flow.iter()) {
        bytes.extend_from_slice(&t.to_le_bytes());
        bytes.extend_from_slice(&q.to_le_bytes());
    }
    xxh3_64(&bytes)
}
