use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Manufacturer data for one standard soakwell size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSpecification {
    pub diameter: f64,
    pub depth: f64,
    pub capacity_m3: f64,
    pub weight_kg: f64,
    pub price: f64,
    pub product_code: String,
}

/// Lookup of standard unit sizes. Shared read-only by solver workers.
pub trait ManufacturerCatalog: Send + Sync {
    /// Specification of the `(diameter, depth)` size in metres, or `None`
    /// when the size is not manufactured.
    fn lookup(&self, diameter: f64, depth: f64) -> Option<UnitSpecification>;
}

/// One row of a manufacturer table, with sizes in millimetres.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub diameter_mm: u32,
    pub depth_mm: u32,
    /// Nominal capacity, derived from the geometry when missing
    pub capacity_m3: Option<f64>,
    pub weight_kg: f64,
    pub price: f64,
    pub product_code: String,
}

/// Catalog backed by an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    entries: Vec<CatalogEntry>,
}

fn to_millimetres(metres: f64) -> Option<u32> {
    let mm = (metres * 1000.0).round();
    if mm.is_finite() && mm >= 0.0 && mm <= u32::MAX as f64 {
        Some(mm as u32)
    } else {
        None
    }
}

impl TableCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ManufacturerCatalog for TableCatalog {
    fn lookup(&self, diameter: f64, depth: f64) -> Option<UnitSpecification> {
        let diameter_mm = to_millimetres(diameter)?;
        let depth_mm = to_millimetres(depth)?;
        self.entries
            .iter()
            .find(|e| e.diameter_mm == diameter_mm && e.depth_mm == depth_mm)
            .map(|e| {
                let d = e.diameter_mm as f64 / 1000.0;
                let h = e.depth_mm as f64 / 1000.0;
                UnitSpecification {
                    diameter: d,
                    depth: h,
                    capacity_m3: e
                        .capacity_m3
                        .unwrap_or_else(|| PI * (d / 2.0).powi(2) * h),
                    weight_kg: e.weight_kg,
                    price: e.price,
                    product_code: e.product_code.clone(),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableCatalog {
        TableCatalog::new(vec![
            CatalogEntry {
                diameter_mm: 1200,
                depth_mm: 1200,
                capacity_m3: None,
                weight_kg: 620.0,
                price: 451.0,
                product_code: "SW1212".to_string(),
            },
            CatalogEntry {
                diameter_mm: 900,
                depth_mm: 900,
                capacity_m3: Some(0.57),
                weight_kg: 330.0,
                price: 286.0,
                product_code: "SW0909".to_string(),
            },
        ])
    }

    #[test]
    fn test_lookup_standard_size() {
        let spec = table().lookup(1.2, 1.2).unwrap();
        assert_eq!(spec.product_code, "SW1212");
        assert_eq!(spec.price, 451.0);
        assert!((spec.capacity_m3 - PI * 0.36 * 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_lookup_rounds_to_millimetres() {
        // 0.3 * 3 is not exactly 0.9 in floating point
        let spec = table().lookup(0.3 * 3.0, 0.9).unwrap();
        assert_eq!(spec.capacity_m3, 0.57);
    }

    #[test]
    fn test_lookup_missing_size() {
        assert!(table().lookup(1.5, 1.2).is_none());
        assert!(table().lookup(f64::NAN, 1.2).is_none());
        assert!(TableCatalog::default().is_empty());
    }
}
