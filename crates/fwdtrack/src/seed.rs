//! Seed-state estimation from a hit chain.
//!
//! The transverse radius is averaged over circle fits through triplets of the
//! hits on the outer stations; direction comes from the two innermost of
//! those hits, position from the hit closest to the interaction point.

use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::{eta_from_theta, SimpleCircle, PT_PER_CM};
use crate::hit::Hit;

/// Seed-estimator constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Normalized volume ids of the outer stations, innermost first.
    pub outer_volumes: [i32; 4],
    /// Fits with a radius at or below this (cm) count as failed.
    pub min_radius: f64,
    /// Radius (cm) used when every fit failed.
    pub fallback_radius: f64,
    /// Magnetic field multiplier in `pt = R · K · field_scale`.
    pub field_scale: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            outer_volumes: [9, 10, 11, 12],
            min_radius: 10.0,
            fallback_radius: 10.0,
            field_scale: 5.0,
        }
    }
}

/// Initial position and momentum handed to the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedState {
    /// Position (cm) of the hit closest to the interaction point along z.
    pub position: [f64; 3],
    /// Momentum (GeV/c).
    pub momentum: [f64; 3],
    /// Mean transverse radius (cm) of the valid circle fits.
    pub radius: f64,
    /// Number of circle fits that contributed to `radius`.
    pub n_valid_fits: usize,
}

impl SeedState {
    pub fn position_vec(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }

    pub fn momentum_vec(&self) -> Vector3<f64> {
        Vector3::from(self.momentum)
    }

    pub fn pt(&self) -> f64 {
        self.momentum[0].hypot(self.momentum[1])
    }

    pub fn phi(&self) -> f64 {
        self.momentum[1].atan2(self.momentum[0])
    }

    pub fn theta(&self) -> f64 {
        self.pt().atan2(self.momentum[2])
    }

    pub fn eta(&self) -> f64 {
        eta_from_theta(self.theta())
    }

    /// True when no circle fit succeeded and the fallback radius was used.
    pub fn used_fallback(&self) -> bool {
        self.n_valid_fits == 0
    }
}

/// Estimate the seed state of a hit chain.
///
/// Returns `None` only for an empty chain.
pub fn estimate_seed(hits: &[Hit], config: &SeedConfig) -> Option<SeedState> {
    let closest = hits
        .iter()
        .min_by(|a, b| a.z().abs().total_cmp(&b.z().abs()))?;

    let mut by_volume: HashMap<i32, &Hit> = HashMap::new();
    for hit in hits {
        by_volume.insert(hit.volume.abs(), hit);
    }

    let [v0, v1, v2, v3] = config.outer_volumes;
    let triplets = [[v3, v2, v1], [v3, v2, v0], [v3, v1, v0], [v2, v1, v0]];
    let mut sum = 0.0;
    let mut n_valid = 0;
    for triplet in triplets {
        let radius = fit_triplet(&by_volume, triplet);
        tracing::debug!(volumes = ?triplet, radius = ?radius, "seed circle fit");
        if let Some(r) = radius.filter(|&r| r > config.min_radius) {
            sum += r;
            n_valid += 1;
        }
    }
    let radius = if n_valid > 0 {
        sum / n_valid as f64
    } else {
        tracing::debug!(fallback = config.fallback_radius, "no valid seed circle fit");
        config.fallback_radius
    };

    let (inner, outer) = direction_hits(hits, &by_volume, &config.outer_volumes)?;
    let d = outer.point() - inner.point();
    let phi = d.y.atan2(d.x);
    let rxy = d.x.hypot(d.y);
    let pt = radius * PT_PER_CM * config.field_scale;
    let pz = if rxy > 0.0 {
        pt * d.z / rxy
    } else {
        tracing::warn!("seed direction has no transverse component");
        0.0
    };

    let seed = SeedState {
        position: closest.position,
        momentum: [pt * phi.cos(), pt * phi.sin(), pz],
        radius,
        n_valid_fits: n_valid,
    };
    tracing::debug!(
        pt = seed.pt(),
        eta = seed.eta(),
        phi = seed.phi(),
        n_valid_fits = n_valid,
        "seed estimated"
    );
    Some(seed)
}

fn fit_triplet(by_volume: &HashMap<i32, &Hit>, volumes: [i32; 3]) -> Option<f64> {
    let a = by_volume.get(&volumes[0])?;
    let b = by_volume.get(&volumes[1])?;
    let c = by_volume.get(&volumes[2])?;
    SimpleCircle::through([a.x(), a.y()], [b.x(), b.y()], [c.x(), c.y()])
        .map(|circle| circle.radius)
        .filter(|r| r.is_finite())
}

/// The two innermost outer-station hits, or the two hits closest to the
/// interaction point when fewer than two outer stations are present.
fn direction_hits<'a>(
    hits: &'a [Hit],
    by_volume: &HashMap<i32, &'a Hit>,
    outer_volumes: &[i32; 4],
) -> Option<(&'a Hit, &'a Hit)> {
    let present: Vec<&Hit> = outer_volumes
        .iter()
        .filter_map(|v| by_volume.get(v).copied())
        .collect();
    if let [first, second, ..] = present.as_slice() {
        return Some((*first, *second));
    }
    let mut by_z: Vec<&Hit> = hits.iter().collect();
    by_z.sort_by(|a, b| a.z().abs().total_cmp(&b.z().abs()));
    match by_z.as_slice() {
        [first, second, ..] => Some((*first, *second)),
        [only] => Some((*only, *only)),
        [] => None,
    }
}
