use crate::error::{Result, SoakwellError};
use crate::hydrograph::InflowHydrograph;
use std::str::FromStr;

/// A named hydrograph the solver tests every configuration against.
#[derive(Debug, Clone, PartialEq)]
pub struct StormScenario {
    pub name: String,
    /// Annual exceedance probability label, e.g. "1% AEP"
    pub aep: Option<String>,
    pub hydrograph: InflowHydrograph,
}

impl StormScenario {
    pub fn new(
        name: &str,
        aep: Option<&str>,
        hydrograph: InflowHydrograph,
    ) -> Self {
        Self {
            name: name.to_string(),
            aep: aep.map(|a| a.to_string()),
            hydrograph,
        }
    }

    pub fn label(&self) -> String {
        match &self.aep {
            Some(aep) => format!("{} ({})", self.name, aep),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StormShape {
    /// Linear rise to the peak at 40 % of the duration, linear recession
    Triangular,
    /// Constant flow at 60 % of the peak
    Uniform,
}

impl FromStr for StormShape {
    type Err = SoakwellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "triangular" => Ok(StormShape::Triangular),
            "uniform" => Ok(StormShape::Uniform),
            _ => Err(SoakwellError::InvalidParameter(format!(
                "unknown storm shape '{s}'"
            ))),
        }
    }
}

/// Sampling interval of synthetic hydrographs (s).
pub const DESIGN_STORM_STEP_SECONDS: f64 = 30.0;

/// Share of the duration at which a triangular storm peaks.
const TRIANGULAR_PEAK_FRACTION: f64 = 0.4;

/// Share of the peak flow held by a uniform storm.
const UNIFORM_PEAK_FRACTION: f64 = 0.6;

/// Synthetic storm built from a rainfall intensity over a catchment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesignStorm {
    pub intensity_mm_hr: f64,
    pub duration_hours: f64,
    pub catchment_area_m2: f64,
    pub runoff_coefficient: f64,
    pub shape: StormShape,
}

impl DesignStorm {
    pub fn new(
        intensity_mm_hr: f64,
        duration_hours: f64,
        catchment_area_m2: f64,
        runoff_coefficient: f64,
        shape: StormShape,
    ) -> Result<Self> {
        for (name, value) in [
            ("rainfall intensity", intensity_mm_hr),
            ("storm duration", duration_hours),
            ("catchment area", catchment_area_m2),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SoakwellError::InvalidParameter(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&runoff_coefficient) {
            return Err(SoakwellError::InvalidParameter(format!(
                "runoff coefficient must be within [0, 1], got {runoff_coefficient}"
            )));
        }
        Ok(Self {
            intensity_mm_hr,
            duration_hours,
            catchment_area_m2,
            runoff_coefficient,
            shape,
        })
    }

    /// Runoff rate (m³/s) at the peak rainfall intensity.
    pub fn peak_flow(&self) -> f64 {
        let intensity_ms = self.intensity_mm_hr / (1000.0 * 3600.0);
        intensity_ms * self.catchment_area_m2 * self.runoff_coefficient
    }

    fn flow_at(&self, t: f64) -> f64 {
        let peak = self.peak_flow();
        match self.shape {
            StormShape::Triangular => {
                let duration = self.duration_hours * 3600.0;
                let peak_time = TRIANGULAR_PEAK_FRACTION * duration;
                let flow = if t <= peak_time {
                    peak * t / peak_time
                } else {
                    peak * (1.0 - (t - peak_time) / (duration - peak_time))
                };
                flow.max(0.0)
            }
            StormShape::Uniform => UNIFORM_PEAK_FRACTION * peak,
        }
    }

    pub fn hydrograph(&self) -> Result<InflowHydrograph> {
        let duration = self.duration_hours * 3600.0;
        let steps = (duration / DESIGN_STORM_STEP_SECONDS).floor() as usize;
        let (time_min, flow) = (0..=steps)
            .map(|i| {
                let t = i as f64 * DESIGN_STORM_STEP_SECONDS;
                (t / 60.0, self.flow_at(t))
            })
            .unzip();
        InflowHydrograph::new(time_min, flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!(
            StormShape::from_str("Triangular").unwrap(),
            StormShape::Triangular
        );
        assert_eq!("uniform".parse::<StormShape>().unwrap(), StormShape::Uniform);
        assert!("chicago".parse::<StormShape>().is_err());
    }

    #[test]
    fn test_peak_flow() {
        // 20 mm/h on 1500 m² at C = 0.7
        let storm =
            DesignStorm::new(20.0, 2.0, 1500.0, 0.7, StormShape::Triangular)
                .unwrap();
        let expected = 20.0 / 3.6e6 * 1500.0 * 0.7;
        assert!((storm.peak_flow() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_triangular_hydrograph() {
        let storm =
            DesignStorm::new(20.0, 2.0, 1500.0, 0.7, StormShape::Triangular)
                .unwrap();
        let h = storm.hydrograph().unwrap();
        assert_eq!(h.len(), 241);
        assert_eq!(h.end_time(), 120.0);
        assert_eq!(h.flow()[0], 0.0);
        // peak at 48 minutes, sample 96
        assert!((h.flow()[96] - storm.peak_flow()).abs() < 1e-15);
        assert!(h.flow()[240].abs() < 1e-15);
    }

    #[test]
    fn test_uniform_hydrograph() {
        let storm =
            DesignStorm::new(30.0, 1.0, 100.0, 1.0, StormShape::Uniform).unwrap();
        let h = storm.hydrograph().unwrap();
        assert!(h.flow().iter().all(|q| *q == 0.6 * storm.peak_flow()));
    }

    #[test]
    fn test_rejects_invalid_design_storm() {
        assert!(DesignStorm::new(0.0, 1.0, 100.0, 0.5, StormShape::Uniform).is_err());
        assert!(DesignStorm::new(10.0, 1.0, 100.0, 1.5, StormShape::Uniform).is_err());
    }

    #[test]
    fn test_label() {
        let h = InflowHydrograph::new(vec![0.0, 1.0], vec![0.0, 0.1]).unwrap();
        assert_eq!(StormScenario::new("10y", Some("10% AEP"), h.clone()).label(), "10y (10% AEP)");
        assert_eq!(StormScenario::new("10y", None, h).label(), "10y");
    }
}
