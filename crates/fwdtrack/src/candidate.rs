use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::hit::Hit;

/// Unfitted hit chain spanning the tracking stations, outer station first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackCandidate {
    pub hits: Vec<Hit>,
}

impl TrackCandidate {
    pub fn new(hits: Vec<Hit>) -> Self {
        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hit_ids(&self) -> Vec<u32> {
        self.hits.iter().map(|h| h.id).collect()
    }

    pub fn sectors(&self) -> Vec<i32> {
        self.hits.iter().map(|h| h.sector).collect()
    }

    /// True when two candidates share at least one hit id.
    pub fn shares_hit_with(&self, other: &TrackCandidate) -> bool {
        self.hits
            .iter()
            .any(|a| other.hits.iter().any(|b| a.id == b.id))
    }

    /// Chain length normalized by the expected number of stations.
    pub fn quality(&self, expected_max_hits: usize) -> f64 {
        self.len() as f64 / expected_max_hits.max(1) as f64
    }

    /// Sectors strictly decreasing along the chain.
    pub fn has_monotonic_sectors(&self) -> bool {
        self.hits.windows(2).all(|w| w[0].sector > w[1].sector)
    }

    /// True when no two hits sit in the same detector volume.
    pub fn has_distinct_volumes(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.hits.len());
        self.hits.iter().all(|h| seen.insert(h.volume))
    }
}
