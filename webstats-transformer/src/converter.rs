// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Dimension id converters
//!
//! [`InMemoryDimensionConverter`] assigns surrogate ids on first sight, the
//! way the dimension tables do with insert-if-absent. [`CachedDimensionConverter`]
//! fronts any converter with a bounded cache.

use dashmap::DashMap;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;
use webstats_core::{DimensionConverter, DimensionKind, DimensionValue, StatsError, StatsResult};

/// Insert-if-absent id assignment, ids counted per dimension kind from 1
#[derive(Debug, Default)]
pub struct InMemoryDimensionConverter {
    ids: DashMap<DimensionValue, i32>,
    next_ids: DashMap<DimensionKind, AtomicI32>,
}

impl InMemoryDimensionConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-assign an id, e.g. from an existing dimension table
    pub fn seed(&self, value: DimensionValue, id: i32) {
        let next = self.next_ids.entry(value.kind()).or_insert_with(|| AtomicI32::new(1));
        next.fetch_max(id.saturating_add(1), Ordering::SeqCst);
        drop(next);
        self.ids.insert(value, id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All assignments sorted by kind, then id
    pub fn snapshot(&self) -> Vec<DimensionAssignment> {
        let mut assignments: Vec<DimensionAssignment> = self
            .ids
            .iter()
            .map(|entry| DimensionAssignment {
                kind: entry.key().kind(),
                value: entry.key().canonical(),
                id: *entry.value(),
            })
            .collect();
        assignments.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.id.cmp(&b.id)));
        assignments
    }
}

impl DimensionConverter for InMemoryDimensionConverter {
    fn resolve(&self, value: &DimensionValue) -> StatsResult<i32> {
        if let Some(id) = self.ids.get(value) {
            return Ok(*id);
        }

        let entry = self.ids.entry(value.clone()).or_try_insert_with(|| {
            let next = self
                .next_ids
                .entry(value.kind())
                .or_insert_with(|| AtomicI32::new(1));
            let id = next.fetch_add(1, Ordering::SeqCst);
            if id <= 0 {
                return Err(StatsError::Lookup {
                    dimension: value.to_string(),
                    reason: "id space exhausted".to_string(),
                });
            }
            Ok(id)
        })?;
        trace!(dimension = %value, id = *entry, "assigned dimension id");
        Ok(*entry)
    }
}

/// One row of a dimension table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionAssignment {
    pub kind: DimensionKind,
    pub value: String,
    pub id: i32,
}

/// Bounded cache in front of another converter
pub struct CachedDimensionConverter<C> {
    inner: C,
    cache: Cache<DimensionValue, i32>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<C: DimensionConverter> CachedDimensionConverter<C> {
    pub fn new(inner: C, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(max_capacity).build(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn stats(&self) -> ConverterCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        ConverterCacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

impl<C: DimensionConverter> DimensionConverter for CachedDimensionConverter<C> {
    fn resolve(&self, value: &DimensionValue) -> StatsResult<i32> {
        if let Some(id) = self.cache.get(value) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(id);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let id = self.inner.resolve(value)?;
        self.cache.insert(value.clone(), id);
        Ok(id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use webstats_core::{BrowserDimension, KpiKind, PlatformDimension};

    #[test]
    fn test_ids_are_stable_and_per_kind() {
        let converter = InMemoryDimensionConverter::new();
        let java = DimensionValue::from(PlatformDimension::new("java"));
        let all = DimensionValue::from(PlatformDimension::all());
        let chrome = DimensionValue::from(BrowserDimension::all_versions("chrome"));

        assert_eq!(converter.resolve(&java).unwrap(), 1);
        assert_eq!(converter.resolve(&all).unwrap(), 2);
        assert_eq!(converter.resolve(&chrome).unwrap(), 1);
        assert_eq!(converter.resolve(&java).unwrap(), 1);
        assert_eq!(converter.len(), 3);
    }

    #[test]
    fn test_literal_all_gets_its_own_id() {
        let converter = InMemoryDimensionConverter::new();
        let literal = converter
            .resolve(&PlatformDimension::new("all").into())
            .unwrap();
        let generalized = converter.resolve(&PlatformDimension::all().into()).unwrap();
        assert_ne!(literal, generalized);
    }

    #[test]
    fn test_seeded_ids_are_kept() {
        let converter = InMemoryDimensionConverter::new();
        converter.seed(KpiKind::ActiveUser.into(), 10);
        assert_eq!(converter.resolve(&KpiKind::ActiveUser.into()).unwrap(), 10);
        assert_eq!(converter.resolve(&KpiKind::Sessions.into()).unwrap(), 11);

        let snapshot = converter.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].value, "active_user");
        assert_eq!(snapshot[1].id, 11);
    }

    #[test]
    fn test_cache_counts_hits_and_misses() {
        let cached = CachedDimensionConverter::new(InMemoryDimensionConverter::new(), 100);
        let java: DimensionValue = PlatformDimension::new("java").into();

        let first = cached.resolve(&java).unwrap();
        let second = cached.resolve(&java).unwrap();
        assert_eq!(first, second);

        let stats = cached.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(cached.inner().len(), 1);
    }
}
