// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side sensor registry.
//!
//! The sensor map is fixed at startup and never resized; only each cell's
//! `value` changes afterwards, guarded by a per-sensor lock. Readers that
//! snapshot values for the catalog take the same lock, so a snapshot is
//! internally consistent per sensor.

use airmon::wire::{CatalogEntry, Reading};
use airmon::SensorSpec;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// One sensor: static definition plus its latest generated value.
#[derive(Debug)]
pub struct SensorCell {
    spec: SensorSpec,
    value: Mutex<f64>,
}

impl SensorCell {
    fn new(spec: SensorSpec) -> Self {
        // Start mid-range so the invariant min <= value <= max holds
        // before the first generation tick.
        let initial = (spec.min + spec.max) / 2.0;
        Self {
            spec,
            value: Mutex::new(initial),
        }
    }

    /// Static definition.
    pub fn spec(&self) -> &SensorSpec {
        &self.spec
    }

    /// Latest generated value.
    pub fn value(&self) -> f64 {
        *self.value.lock()
    }

    /// Run one generation step: draw uniformly from `[min, max]` and
    /// replace the stored value. Returns the new value.
    pub fn generate(&self, rng: &mut impl Rng) -> f64 {
        let value = rng.gen_range(self.spec.min..=self.spec.max);
        *self.value.lock() = value;
        value
    }

    /// Current reading in wire form.
    pub fn reading(&self) -> Reading {
        Reading {
            id: self.spec.id.clone(),
            value: self.value(),
            unit: self.spec.unit.clone(),
        }
    }

    fn catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            id: self.spec.id.clone(),
            name: self.spec.name.clone(),
            location: self.spec.location.clone(),
            value: self.value(),
            unit: self.spec.unit.clone(),
        }
    }
}

/// Fixed set of sensors established at startup.
#[derive(Debug, Default)]
pub struct SensorRegistry {
    cells: HashMap<String, Arc<SensorCell>>,
}

impl SensorRegistry {
    /// Build the registry from configured sensor definitions.
    pub fn from_specs(specs: Vec<SensorSpec>) -> Self {
        let cells = specs
            .into_iter()
            .map(|spec| (spec.id.clone(), Arc::new(SensorCell::new(spec))))
            .collect();
        Self { cells }
    }

    /// Look up a sensor by id.
    pub fn get(&self, id: &str) -> Option<&Arc<SensorCell>> {
        self.cells.get(id)
    }

    /// All sensor cells, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = &Arc<SensorCell>> {
        self.cells.values()
    }

    /// All sensor ids, sorted for deterministic sampling and output.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.cells.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no sensors are configured.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Snapshot every sensor into its wire form, sorted by id.
    ///
    /// Values are read under each cell's lock; the map itself is read-only
    /// so no map-level lock is needed.
    pub fn catalog_snapshot(&self) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> =
            self.cells.values().map(|cell| cell.catalog_entry()).collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }
}
