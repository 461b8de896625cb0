use crate::error::{Result, SoakwellError};
use serde::Serialize;
use std::f64::consts::PI;

/// Soil properties shared by every device in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoilParameters {
    /// Saturated hydraulic conductivity (m/s)
    pub ks: f64,
    /// Soil moderation factor
    pub sr: f64,
}

impl SoilParameters {
    pub fn new(ks: f64, sr: f64) -> Result<Self> {
        if !ks.is_finite() || ks < 0.0 {
            return Err(SoakwellError::InvalidParameter(format!(
                "ks must be finite and non-negative, got {ks}"
            )));
        }
        if !sr.is_finite() || sr <= 0.0 {
            return Err(SoakwellError::InvalidParameter(format!(
                "Sr must be finite and positive, got {sr}"
            )));
        }
        Ok(Self { ks, sr })
    }
}

impl Default for SoilParameters {
    fn default() -> Self {
        Self { ks: 1e-5, sr: 1.0 }
    }
}

fn check_dimension(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SoakwellError::NumericDegeneracy(format!(
            "{name} must be finite and positive, got {value}"
        )));
    }
    Ok(())
}

/// A storage unit with a constant planform, as seen by the simulator.
pub trait StorageUnit {
    /// Area (m²) that converts stored volume into water level.
    fn planform_area(&self) -> f64;

    /// Level (m) at which the unit is full.
    fn max_height(&self) -> f64;

    /// Outflow rate (m³/s) when the unit is full.
    fn max_outflow_rate(&self, soil: &SoilParameters) -> f64;

    fn max_volume(&self) -> f64 {
        self.planform_area() * self.max_height()
    }
}

/// A buried cylindrical chamber.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Soakwell {
    pub diameter: f64,
    pub max_height: f64,
}

impl Soakwell {
    pub fn new(diameter: f64, max_height: f64) -> Result<Self> {
        check_dimension("soakwell diameter", diameter)?;
        check_dimension("soakwell height", max_height)?;
        Ok(Self {
            diameter,
            max_height,
        })
    }

    /// A soakwell as deep as it is wide.
    pub fn square(diameter: f64) -> Result<Self> {
        Self::new(diameter, diameter)
    }

    pub fn base_area(&self) -> f64 {
        PI * (self.diameter / 2.0).powi(2)
    }

    /// Wall area of the infiltration surface. The wall is taken at a
    /// height equal to the diameter (d ≈ H sizing assumption).
    pub fn wall_area(&self) -> f64 {
        PI * self.diameter * self.diameter
    }
}

impl StorageUnit for Soakwell {
    fn planform_area(&self) -> f64 {
        self.base_area()
    }

    fn max_height(&self) -> f64 {
        self.max_height
    }

    fn max_outflow_rate(&self, soil: &SoilParameters) -> f64 {
        soil.ks * (self.base_area() + self.wall_area()) / soil.sr
    }
}

/// A perforated-pipe-and-gravel-trench system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrenchDrain {
    pub trench_width: f64,
    pub trench_depth: f64,
    pub length: f64,
    /// Void ratio of the aggregate fill
    pub porosity: f64,
    pub pipe_diameter: f64,
    /// Longitudinal pipe gradient (m/m)
    pub pipe_slope: f64,
    /// Manning's n of the pipe
    pub pipe_roughness: f64,
}

impl FrenchDrain {
    pub fn new(
        trench_width: f64,
        trench_depth: f64,
        length: f64,
        porosity: f64,
        pipe_diameter: f64,
        pipe_slope: f64,
        pipe_roughness: f64,
    ) -> Result<Self> {
        check_dimension("trench width", trench_width)?;
        check_dimension("trench depth", trench_depth)?;
        check_dimension("trench length", length)?;
        check_dimension("aggregate porosity", porosity)?;
        if porosity > 1.0 {
            return Err(SoakwellError::InvalidParameter(format!(
                "aggregate porosity must not exceed 1, got {porosity}"
            )));
        }
        check_dimension("pipe diameter", pipe_diameter)?;
        check_dimension("pipe slope", pipe_slope)?;
        check_dimension("pipe roughness", pipe_roughness)?;
        Ok(Self {
            trench_width,
            trench_depth,
            length,
            porosity,
            pipe_diameter,
            pipe_slope,
            pipe_roughness,
        })
    }

    /// 600 mm x 900 mm trench of 40 mm aggregate around a 300 mm concrete
    /// pipe laid at 0.5 %.
    pub fn reference(length: f64) -> Result<Self> {
        Self::new(0.6, 0.9, length, 0.35, 0.3, 0.005, 0.012)
    }

    pub fn pipe_area(&self) -> f64 {
        PI * (self.pipe_diameter / 2.0).powi(2)
    }

    /// Full-bore capacity (m³/s) of the conveyance pipe from Manning's
    /// equation.
    pub fn pipe_capacity(&self) -> f64 {
        let area = self.pipe_area();
        let hydraulic_radius = area / (PI * self.pipe_diameter);
        (1.0 / self.pipe_roughness)
            * area
            * hydraulic_radius.powf(2.0 / 3.0)
            * self.pipe_slope.sqrt()
    }

    /// Effective storage (m³) per metre of trench.
    pub fn storage_per_metre(&self) -> f64 {
        self.trench_width * self.trench_depth * self.porosity
    }

    /// Infiltration rate (m³/s) into the native soil for the whole trench,
    /// through the base and both walls up to `level`.
    pub fn infiltration_rate(&self, level: f64, soil: &SoilParameters) -> f64 {
        if level <= 0.0 {
            return 0.0;
        }
        let level = level.min(self.trench_depth);
        soil.ks * (self.trench_width + 2.0 * level) * self.length / soil.sr
    }
}

impl StorageUnit for FrenchDrain {
    fn planform_area(&self) -> f64 {
        self.trench_width * self.length * self.porosity
    }

    fn max_height(&self) -> f64 {
        self.trench_depth
    }

    fn max_outflow_rate(&self, soil: &SoilParameters) -> f64 {
        self.infiltration_rate(self.trench_depth, soil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soakwell_volume() {
        let sw = Soakwell::new(1.2, 1.5).unwrap();
        let expected = PI * 0.36 * 1.5;
        assert!((sw.max_volume() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_soakwell_max_outflow_rate() {
        let sw = Soakwell::square(1.0).unwrap();
        let soil = SoilParameters::new(1e-5, 2.0).unwrap();
        let area = PI * 0.25 + PI;
        assert!((sw.max_outflow_rate(&soil) - 1e-5 * area / 2.0).abs() < 1e-18);
    }

    #[test]
    fn test_rejects_degenerate_soakwell() {
        assert!(matches!(
            Soakwell::new(0.0, 1.0),
            Err(SoakwellError::NumericDegeneracy(_))
        ));
        assert!(Soakwell::new(1.0, -1.0).is_err());
        assert!(Soakwell::new(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_rejects_invalid_soil() {
        assert!(SoilParameters::new(-1e-5, 1.0).is_err());
        assert!(SoilParameters::new(1e-5, 0.0).is_err());
        assert!(SoilParameters::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn test_reference_french_drain() {
        let drain = FrenchDrain::reference(100.0).unwrap();
        assert!((drain.storage_per_metre() - 0.189).abs() < 1e-12);
        assert!((drain.max_volume() - 18.9).abs() < 1e-9);
    }

    #[test]
    fn test_pipe_capacity_matches_manning() {
        let drain = FrenchDrain::reference(100.0).unwrap();
        let q = drain.pipe_capacity();
        assert!(q > 0.07 && q < 0.08, "pipe capacity {q}");
    }

    #[test]
    fn test_infiltration_rate_grows_with_level() {
        let drain = FrenchDrain::reference(100.0).unwrap();
        let soil = SoilParameters::new(4.63e-5, 1.0).unwrap();
        assert_eq!(drain.infiltration_rate(0.0, &soil), 0.0);
        let low = drain.infiltration_rate(0.2, &soil);
        let high = drain.infiltration_rate(0.5, &soil);
        assert!(high > low);
        assert_eq!(
            drain.infiltration_rate(5.0, &soil),
            drain.max_outflow_rate(&soil)
        );
    }

    #[test]
    fn test_rejects_porosity_above_one() {
        assert!(FrenchDrain::new(0.6, 0.9, 10.0, 1.5, 0.3, 0.005, 0.012).is_err());
    }
}
