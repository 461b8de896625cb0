//! Closed-form soakwell sizing after Argue (2004), as used for a first
//! estimate before a time-stepping check.

use crate::device::SoilParameters;
use crate::error::{Result, SoakwellError};
use log::warn;
use serde::Serialize;
use std::f64::consts::PI;

/// Largest diameter (m) accepted for a single soakwell before the design
/// is split into several units.
pub const MAX_SINGLE_DIAMETER: f64 = 3.5;

/// Diameter (m) from which the emptying time formula no longer applies.
const EMPTYING_FORMULA_LIMIT: f64 = 4.0;

/// Rational-method runoff volume (m³) from runoff coefficient, rainfall
/// intensity (mm/h), contributing area (m²) and duration (h).
pub fn inflow_volume(
    runoff_coefficient: f64,
    intensity_mm_hr: f64,
    area_m2: f64,
    duration_hours: f64,
) -> f64 {
    runoff_coefficient * intensity_mm_hr * area_m2 * duration_hours / 1000.0
}

/// Soakwell diameter (m) storing `volume` m³ over a storm time base of
/// `duration_min` minutes, assuming a depth close to the diameter.
pub fn diameter(volume: f64, soil: &SoilParameters, duration_min: f64) -> Result<f64> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(SoakwellError::InvalidParameter(format!(
            "storage volume must be non-negative, got {volume}"
        )));
    }
    if !duration_min.is_finite() || duration_min <= 0.0 {
        return Err(SoakwellError::InvalidParameter(format!(
            "storm duration must be positive, got {duration_min}"
        )));
    }
    let t = duration_min * 60.0;
    let denominator = PI + 120.0 * soil.ks * t / soil.sr;
    Ok((4.0 * volume / denominator).sqrt())
}

/// Analytical emptying time (h). `None` when the diameter is outside the
/// range where the formula holds.
pub fn emptying_time_hours(diameter: f64) -> Result<Option<f64>> {
    if !diameter.is_finite() || diameter <= 0.0 {
        return Err(SoakwellError::InvalidParameter(format!(
            "diameter must be positive, got {diameter}"
        )));
    }
    if diameter >= EMPTYING_FORMULA_LIMIT {
        return Ok(None);
    }
    Ok(Some(4.6 * diameter / (EMPTYING_FORMULA_LIMIT / diameter).log10()))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MultipleSoakwellDesign {
    pub units: usize,
    pub volume_per_unit: f64,
    pub diameter_per_unit: f64,
    pub total_volume: f64,
    pub max_diameter: f64,
}

/// Splits the volume across identical soakwells when a single one would
/// be wider than `max_diameter`. `None` when one soakwell is enough.
pub fn multiple_soakwells(
    volume: f64,
    max_diameter: f64,
    soil: &SoilParameters,
    duration_min: f64,
) -> Result<Option<MultipleSoakwellDesign>> {
    let single = diameter(volume, soil, duration_min)?;
    if single <= max_diameter {
        return Ok(None);
    }
    let capped_volume = volume * (max_diameter / single).powi(2);
    let units = (volume / capped_volume).ceil() as usize;
    let volume_per_unit = volume / units as f64;
    Ok(Some(MultipleSoakwellDesign {
        units,
        volume_per_unit,
        diameter_per_unit: diameter(volume_per_unit, soil, duration_min)?,
        total_volume: volume,
        max_diameter,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoakwellDesign {
    pub diameter: f64,
    pub volume_required: f64,
    pub emptying_time_hours: Option<f64>,
    pub height: Option<f64>,
    pub alternative: Option<MultipleSoakwellDesign>,
}

pub fn design(
    volume: f64,
    soil: &SoilParameters,
    duration_min: f64,
    height: Option<f64>,
) -> Result<SoakwellDesign> {
    let d = diameter(volume, soil, duration_min)?;
    if let Some(h) = height {
        if h > 0.0 && ((d / h) - 1.0).abs() > 0.2 {
            warn!(
                "Diameter to height ratio {:.2} departs from the d = H assumption",
                d / h
            );
        }
    }
    let emptying_time_hours = if d > 0.0 {
        emptying_time_hours(d)?
    } else {
        Some(0.0)
    };
    Ok(SoakwellDesign {
        diameter: d,
        volume_required: volume,
        emptying_time_hours,
        height,
        alternative: multiple_soakwells(volume, MAX_SINGLE_DIAMETER, soil, duration_min)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflow_volume() {
        // 0.9 · 50 mm/h · 400 m² · 1 h
        assert!((inflow_volume(0.9, 50.0, 400.0, 1.0) - 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_diameter() {
        let soil = SoilParameters::default();
        let d = diameter(10.0, &soil, 60.0).unwrap();
        let expected = (40.0 / (PI + 120.0 * 1e-5 * 3600.0)).sqrt();
        assert!((d - expected).abs() < 1e-12);
        assert!((d - 2.3153).abs() < 1e-3);
        assert_eq!(diameter(0.0, &soil, 60.0).unwrap(), 0.0);
        assert!(diameter(10.0, &soil, 0.0).is_err());
    }

    #[test]
    fn test_emptying_time() {
        let t = emptying_time_hours(2.0).unwrap().unwrap();
        assert!((t - 9.2 / 2f64.log10()).abs() < 1e-12);
        assert_eq!(emptying_time_hours(4.0).unwrap(), None);
        assert!(emptying_time_hours(0.0).is_err());
    }

    #[test]
    fn test_multiple_soakwells() {
        let soil = SoilParameters::default();
        assert!(multiple_soakwells(10.0, 3.5, &soil, 60.0).unwrap().is_none());
        let alt = multiple_soakwells(100.0, 3.5, &soil, 60.0).unwrap().unwrap();
        assert_eq!(alt.units, 5);
        assert!((alt.volume_per_unit - 20.0).abs() < 1e-12);
        assert!(alt.diameter_per_unit <= 3.5);
    }

    #[test]
    fn test_design() {
        let soil = SoilParameters::default();
        let d = design(10.0, &soil, 60.0, Some(2.4)).unwrap();
        assert!(d.alternative.is_none());
        assert!(d.emptying_time_hours.unwrap() > 0.0);
        assert!(design(100.0, &soil, 60.0, None).unwrap().alternative.is_some());
    }
}
