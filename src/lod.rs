//! Level of detail - viewer distance to clustering threshold
//!
//! The threshold is a step function over a fixed, ascending table of
//! distance breakpoints. It changes only when the viewer crosses one.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use crate::cluster::{cluster, Cluster};
use crate::normalize::CatalogEntry;

/// Levels at or beyond `min_distance` cluster with `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    pub min_distance: f64,
    pub threshold: f64,
}

/// Near: almost no grouping. Far: aggressive grouping.
pub fn default_levels() -> Vec<LodLevel> {
    vec![
        LodLevel { min_distance: 0.0, threshold: 2.0 },
        LodLevel { min_distance: 250.0, threshold: 15.0 },
        LodLevel { min_distance: 500.0, threshold: 40.0 },
        LodLevel { min_distance: 900.0, threshold: 80.0 },
    ]
}

pub fn validate_levels(levels: &[LodLevel]) -> anyhow::Result<()> {
    let first = levels
        .first()
        .ok_or_else(|| anyhow::anyhow!("LOD table is empty"))?;
    if first.min_distance != 0.0 {
        anyhow::bail!("first LOD level must start at distance 0, got {}", first.min_distance);
    }
    for pair in levels.windows(2) {
        if pair[1].min_distance <= pair[0].min_distance {
            anyhow::bail!(
                "LOD breakpoints must be strictly increasing ({} then {})",
                pair[0].min_distance,
                pair[1].min_distance
            );
        }
    }
    if levels.iter().any(|l| !l.threshold.is_finite() || l.threshold < 0.0) {
        anyhow::bail!("LOD thresholds must be finite and non-negative");
    }
    Ok(())
}

/// Index of the level selected by `distance`
pub fn level_index(levels: &[LodLevel], distance: f64) -> usize {
    levels
        .iter()
        .rposition(|l| distance >= l.min_distance)
        .unwrap_or(0)
}

/// Threshold selected by `distance`
pub fn threshold_for(levels: &[LodLevel], distance: f64) -> f64 {
    levels
        .get(level_index(levels, distance))
        .map(|l| l.threshold)
        .unwrap_or(0.0)
}

/// Tracks the active level as the viewer moves
#[derive(Debug, Clone)]
pub struct LodTracker {
    levels: Vec<LodLevel>,
    current: usize,
}

impl LodTracker {
    pub fn new(levels: Vec<LodLevel>, distance: f64) -> Self {
        let current = level_index(&levels, distance);
        Self { levels, current }
    }

    pub fn threshold(&self) -> f64 {
        self.levels
            .get(self.current)
            .map(|l| l.threshold)
            .unwrap_or(0.0)
    }

    /// Returns the new threshold only when a breakpoint was crossed
    pub fn update(&mut self, distance: f64) -> Option<f64> {
        let next = level_index(&self.levels, distance);
        if next == self.current {
            return None;
        }
        tracing::debug!("LOD level {} -> {} at distance {:.1}", self.current, next, distance);
        self.current = next;
        Some(self.threshold())
    }
}

/// Identifies one clustering input: entry contents, visible ids, threshold bits
type CacheKey = (u64, BTreeSet<String>, u64);

/// Memoizes the last clustering. The key covers the entry set as well, so a
/// fresh ingestion never reuses clusters built from the old catalog.
#[derive(Debug, Default)]
pub struct ClusterCache {
    key: Option<CacheKey>,
    clusters: Vec<Cluster>,
}

/// Order-sensitive hash of the fields clustering reads
fn fingerprint(entries: &[CatalogEntry]) -> u64 {
    let mut hasher = DefaultHasher::new();
    entries.len().hash(&mut hasher);
    for e in entries {
        e.id().hash(&mut hasher);
        e.hex().hash(&mut hasher);
    }
    hasher.finish()
}

impl ClusterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute from scratch when the key changed, otherwise reuse
    pub fn get_or_compute(
        &mut self,
        entries: &[CatalogEntry],
        visible_ids: &BTreeSet<String>,
        threshold: f64,
    ) -> &[Cluster] {
        let key = (fingerprint(entries), visible_ids.clone(), threshold.to_bits());
        if self.key.as_ref() != Some(&key) {
            self.clusters = cluster(entries, visible_ids, threshold);
            self.key = Some(key);
        }
        &self.clusters
    }

    /// Last computed clusters, if any
    pub fn cached(&self) -> Option<&[Cluster]> {
        self.key.as_ref().map(|_| self.clusters.as_slice())
    }

    /// Drop the memo so the next call always recomputes
    pub fn invalidate(&mut self) {
        self.key = None;
        self.clusters.clear();
    }
}
