//! Second-pass refit with supplementary hits from other detector planes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fit::{FitCounters, FitResult, TrackFitter};
use crate::geometry::wrap_delta_phi;
use crate::hit::Hit;

/// Supplementary-hit refit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefitConfig {
    pub enabled: bool,
    /// z (cm) of each supplementary plane; the index is the plane id.
    pub plane_z: Vec<f64>,
    /// Azimuth window (rad) around the projected track position.
    pub max_delta_phi: f64,
}

impl Default for RefitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            plane_z: vec![93.3, 140.0, 186.6],
            max_delta_phi: 0.5,
        }
    }
}

/// Supplementary hits of one event grouped by plane id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplementaryHits {
    pub planes: BTreeMap<usize, Vec<Hit>>,
}

impl SupplementaryHits {
    pub fn insert(&mut self, plane: usize, hit: Hit) {
        self.planes.entry(plane).or_default().push(hit);
    }

    pub fn on_plane(&self, plane: usize) -> &[Hit] {
        self.planes.get(&plane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn n_hits(&self) -> usize {
        self.planes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.n_hits() == 0
    }
}

/// What happened to one track in the refit pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefitOutcome {
    /// The original fit did not converge.
    NotConverged,
    /// Some plane had zero or several matching hits.
    Ambiguous { hits_per_plane: Vec<usize> },
    Refitted {
        added_hit_ids: Vec<u32>,
        result: FitResult,
    },
}

/// Hits within the azimuth window around a projected position.
pub fn hits_near(hits: &[Hit], projected: [f64; 3], max_delta_phi: f64) -> Vec<Hit> {
    let projected_phi = projected[1].atan2(projected[0]);
    hits.iter()
        .filter(|h| wrap_delta_phi(h.phi(), projected_phi).abs() < max_delta_phi)
        .copied()
        .collect()
}

/// Try to extend one fitted track with one supplementary hit per plane.
///
/// The refit is attempted only when every plane yields exactly one hit
/// inside the window.
pub fn refit_track<F: TrackFitter + ?Sized>(
    fitter: &mut F,
    fit: &FitResult,
    supplementary: &SupplementaryHits,
    config: &RefitConfig,
    counters: &mut FitCounters,
) -> RefitOutcome {
    let FitResult::Converged { state } = fit else {
        tracing::warn!("original track fit did not converge, skipping refit");
        return RefitOutcome::NotConverged;
    };
    counters.possible_refits += 1;

    let mut matches: Vec<Vec<Hit>> = Vec::with_capacity(config.plane_z.len());
    for (plane, &z) in config.plane_z.iter().enumerate() {
        let found = match fitter.project_to_plane(state, z) {
            Some(p) => hits_near(supplementary.on_plane(plane), p, config.max_delta_phi),
            None => {
                tracing::warn!(plane, z, "failed to project track to plane");
                Vec::new()
            }
        };
        matches.push(found);
    }
    let hits_per_plane: Vec<usize> = matches.iter().map(Vec::len).collect();
    tracing::debug!(?hits_per_plane, "supplementary hits near track");
    if hits_per_plane.iter().any(|&n| n != 1) {
        return RefitOutcome::Ambiguous { hits_per_plane };
    }

    let extra: Vec<Hit> = matches.into_iter().flatten().collect();
    let result = fitter.refit_with_extra_hits(state, &extra);
    counters.record_refit(&result);
    tracing::debug!(
        pt_before = state.pt(),
        pt_after = result.pt(),
        status = ?result.status(),
        "track refitted with supplementary hits"
    );
    RefitOutcome::Refitted {
        added_hit_ids: extra.iter().map(|h| h.id).collect(),
        result,
    }
}
