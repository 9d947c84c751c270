//! Hits, truth tracks, the station layout and the per-event hit pool.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::candidate::TrackCandidate;

/// A single detector measurement for one event.
///
/// Hits are created by a [`crate::HitSource`] and never mutated afterwards.
/// Graph structures refer to them by index, so `Hit` is a small `Copy` value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Event-scoped unique id.
    pub id: u32,
    /// Global position `[x, y, z]` in cm.
    pub position: [f64; 3],
    /// Station bucket used for the segment search.
    pub sector: i32,
    /// Normalized detector volume id (see [`StationLayout::resolve`]).
    pub volume: i32,
    /// Truth track id, if the hit came from a simulated particle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truth_id: Option<i32>,
    /// Planar (x, y) measurement covariance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariance: Option<[[f64; 2]; 2]>,
}

impl Hit {
    /// Construct a hit without truth or covariance information.
    pub fn new(id: u32, position: [f64; 3], sector: i32, volume: i32) -> Self {
        Self {
            id,
            position,
            sector,
            volume,
            truth_id: None,
            covariance: None,
        }
    }

    /// Attach a truth track id. Id `0` is the "no truth" marker and is dropped.
    pub fn with_truth(mut self, truth_id: i32) -> Self {
        self.truth_id = (truth_id != 0).then_some(truth_id);
        self
    }

    /// Attach a planar covariance matrix.
    pub fn with_covariance(mut self, covariance: [[f64; 2]; 2]) -> Self {
        self.covariance = Some(covariance);
        self
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.position[0]
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.position[1]
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.position[2]
    }

    /// Transverse distance from the beam axis.
    #[inline]
    pub fn rho(&self) -> f64 {
        self.x().hypot(self.y())
    }

    /// Azimuth in (−π, π].
    #[inline]
    pub fn phi(&self) -> f64 {
        self.y().atan2(self.x())
    }

    pub fn point(&self) -> Vector3<f64> {
        Vector3::new(self.x(), self.y(), self.z())
    }
}

/// Truth-level particle summary. Only used for diagnostics and truth-seeded
/// finding, never by the combinatorial search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McTrack {
    pub id: i32,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub charge: i32,
    /// Id of the vertex the particle originates from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_vertex: Option<i32>,
    /// Ids of the hits this particle produced in the current event.
    #[serde(default)]
    pub hit_ids: Vec<u32>,
}

// ── Station layout ─────────────────────────────────────────────────────────

/// Sector and normalized volume of a hit after layout lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationId {
    pub sector: i32,
    pub volume: i32,
}

/// Detector numbering scheme: maps raw volume ids to search sectors.
///
/// Positive volume ids are looked up in `volume_sectors`. Non-positive ids are
/// sign-tagged: volume `v` lands in sector `|v|` and is renumbered to
/// `|v| + tagged_volume_offset` so the origin of the hit stays recoverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationLayout {
    /// Sector for each positive volume id (index = volume id).
    pub volume_sectors: Vec<i32>,
    /// Offset added to `|v|` for sign-tagged volume ids.
    pub tagged_volume_offset: i32,
    /// Nominal z (cm) of each station, innermost first.
    pub station_z: Vec<f64>,
}

impl Default for StationLayout {
    fn default() -> Self {
        Self {
            volume_sectors: vec![0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 5, 6],
            tagged_volume_offset: 9,
            station_z: vec![93.3, 140.0, 186.6, 280.9, 303.7, 326.6, 349.4],
        }
    }
}

impl StationLayout {
    /// Resolve a raw volume id to `(sector, normalized volume)`.
    ///
    /// Returns `None` for positive ids beyond the lookup table and for tagged
    /// ids whose renumbering does not fit in an `i32`.
    pub fn resolve(&self, raw_volume: i32) -> Option<StationId> {
        if raw_volume > 0 {
            let sector = *self.volume_sectors.get(raw_volume as usize)?;
            Some(StationId {
                sector,
                volume: raw_volume,
            })
        } else {
            let sector = raw_volume.checked_abs()?;
            Some(StationId {
                sector,
                volume: sector.checked_add(self.tagged_volume_offset)?,
            })
        }
    }

    /// Number of stations described by `station_z`.
    pub fn n_stations(&self) -> usize {
        self.station_z.len()
    }
}

// ── Hit pool ───────────────────────────────────────────────────────────────

/// Outcome of removing the hits of accepted tracks from the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalStats {
    pub removed: usize,
    /// Hits referenced by a track but not present in the pool.
    pub missing: usize,
}

/// Residual hits of one event, bucketed by sector in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitPool {
    sectors: BTreeMap<i32, Vec<Hit>>,
}

impl HitPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from hits, keeping the input order within each sector.
    pub fn from_hits(hits: impl IntoIterator<Item = Hit>) -> Self {
        let mut pool = Self::new();
        for hit in hits {
            pool.insert(hit);
        }
        pool
    }

    pub fn insert(&mut self, hit: Hit) {
        self.sectors.entry(hit.sector).or_default().push(hit);
    }

    /// Total number of hits across all sectors.
    pub fn n_hits(&self) -> usize {
        self.sectors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.n_hits() == 0
    }

    /// Sectors with their hits, ascending by sector id.
    pub fn sectors(&self) -> impl Iterator<Item = (i32, &[Hit])> + '_ {
        self.sectors.iter().map(|(&s, hits)| (s, hits.as_slice()))
    }

    /// Hits in one sector (empty when the sector is unknown).
    pub fn hits_in(&self, sector: i32) -> &[Hit] {
        self.sectors.get(&sector).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All hits, ascending by sector, then insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Hit> + '_ {
        self.sectors.values().flatten()
    }

    pub fn contains(&self, hit: &Hit) -> bool {
        self.hits_in(hit.sector).iter().any(|h| h.id == hit.id)
    }

    /// Remove the given hits (matched by id within their sector).
    ///
    /// A hit that is not in the pool is logged and counted as missing.
    pub fn remove_hits<'a>(&mut self, hits: impl IntoIterator<Item = &'a Hit>) -> RemovalStats {
        let mut stats = RemovalStats::default();
        for hit in hits {
            let bucket = self.sectors.get_mut(&hit.sector);
            let pos = bucket
                .as_ref()
                .and_then(|b| b.iter().position(|h| h.id == hit.id));
            match (bucket, pos) {
                (Some(bucket), Some(pos)) => {
                    bucket.remove(pos);
                    stats.removed += 1;
                }
                _ => {
                    tracing::error!(
                        hit_id = hit.id,
                        sector = hit.sector,
                        "hit on track but not in hit pool"
                    );
                    stats.missing += 1;
                }
            }
        }
        self.sectors.retain(|_, hits| !hits.is_empty());
        stats
    }

    /// Remove every hit of the given candidates.
    pub fn remove_track_hits(&mut self, candidates: &[TrackCandidate]) -> RemovalStats {
        self.remove_hits(candidates.iter().flat_map(|c| c.hits.iter()))
    }
}
