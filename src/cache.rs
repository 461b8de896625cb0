//! Bounded cache of per-unit simulation summaries shared by solver workers.

use crate::device::{Soakwell, SoilParameters};
use crate::error::Result;
use crate::extension::ExtensionOptions;
use crate::hydrograph::InflowHydrograph;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use xxhash_rust::xxh3::xxh3_64;

/// Canonical hash of everything a soakwell run depends on.
pub fn simulation_key(
    unit: &Soakwell,
    soil: &SoilParameters,
    options: &ExtensionOptions,
    units: usize,
    hydrograph: &InflowHydrograph,
) -> u64 {
    let mut bytes = Vec::<u8>::with_capacity(80);
    for value in [
        unit.diameter,
        unit.max_height,
        soil.ks,
        soil.sr,
        options.horizon_hours,
        options.interval_minutes,
        options.inflow_threshold,
    ] {
        bytes.extend_from_slice(&value.to_bits().to_le_bytes());
    }
    bytes.extend_from_slice(&(units as u64).to_le_bytes());
    bytes.extend_from_slice(&hydrograph.fingerprint().to_le_bytes());
    xxh3_64(&bytes)
}

struct Entries<V> {
    values: HashMap<u64, V>,
    order: VecDeque<u64>,
}

/// First-in first-out cache with a fixed number of entries. A capacity of
/// zero disables caching.
pub struct SimulationCache<V: Clone> {
    capacity: usize,
    entries: Mutex<Entries<V>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<V: Clone> SimulationCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries {
                values: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Entries<V>> {
        // values are plain data, a panicked writer leaves them usable
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: u64) -> Option<V> {
        let value = self.entries().values.get(&key).cloned();
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    pub fn insert(&self, key: u64, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries();
        if entries.values.insert(key, value).is_some() {
            return;
        }
        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.values.remove(&oldest);
            }
        }
    }

    /// Returns the cached value or computes, stores and returns it. The
    /// computation runs without holding the lock, so two workers may
    /// compute the same key concurrently.
    pub fn get_or_try_insert_with<F>(&self, key: u64, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SoakwellError;

    #[test]
    fn test_evicts_oldest_entry() {
        let cache = SimulationCache::<f64>::new(2);
        cache.insert(1, 1.0);
        cache.insert(2, 2.0);
        cache.insert(3, 3.0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(3), Some(3.0));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = SimulationCache::<f64>::new(0);
        cache.insert(1, 1.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_try_insert_with_computes_once() {
        let cache = SimulationCache::<f64>::new(4);
        let mut calls = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with(7, || {
                    calls += 1;
                    Ok(42.0)
                })
                .unwrap();
            assert_eq!(v, 42.0);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = SimulationCache::<f64>::new(4);
        let r = cache.get_or_try_insert_with(1, || {
            Err(SoakwellError::NumericDegeneracy("zero area".to_string()))
        });
        assert!(r.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_depends_on_every_input() {
        let sw = Soakwell::square(1.2).unwrap();
        let soil = SoilParameters::default();
        let options = ExtensionOptions::default();
        let h = InflowHydrograph::new(vec![0.0, 1.0], vec![0.0, 0.1]).unwrap();
        let base = simulation_key(&sw, &soil, &options, 1, &h);
        assert_eq!(base, simulation_key(&sw, &soil, &options, 1, &h));
        assert_ne!(base, simulation_key(&sw, &soil, &options, 2, &h));
        let deeper = Soakwell::new(1.2, 1.5).unwrap();
        assert_ne!(base, simulation_key(&deeper, &soil, &options, 1, &h));
        let other = InflowHydrograph::new(vec![0.0, 1.0], vec![0.0, 0.2]).unwrap();
        assert_ne!(base, simulation_key(&sw, &soil, &options, 1, &other));
    }
}
