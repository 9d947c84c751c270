//! Synthetic events for unit tests.
//!
//! Tracks cross the seven default stations (sectors 1..=7, innermost first);
//! hit volumes are `sector + 5`, so sectors 4..=7 land on the outer-station
//! volumes 9..=12 the seed estimator looks for.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::Rng;

use crate::hit::{Hit, McTrack, StationLayout};

pub(crate) fn station_z() -> Vec<f64> {
    StationLayout::default().station_z
}

pub(crate) fn volume_of(sector: i32) -> i32 {
    sector + 5
}

/// Straight line from the origin with transverse slopes `(tx, ty) = (x/z, y/z)`.
///
/// One hit on each of the given sectors; ids start at `first_id` and follow
/// the sector order.
pub(crate) fn straight_track(first_id: u32, slope: [f64; 2], sectors: &[i32], truth: i32) -> Vec<Hit> {
    let zs = station_z();
    sectors
        .iter()
        .enumerate()
        .map(|(k, &s)| {
            let z = zs[(s - 1) as usize];
            Hit::new(
                first_id + k as u32,
                [slope[0] * z, slope[1] * z, z],
                s,
                volume_of(s),
            )
            .with_truth(truth)
        })
        .collect()
}

/// Straight track at azimuth `phi` and transverse slope `r_over_z` over all
/// seven stations.
pub(crate) fn straight_track_at(first_id: u32, phi: f64, r_over_z: f64, truth: i32) -> Vec<Hit> {
    let slope = [r_over_z * phi.cos(), r_over_z * phi.sin()];
    straight_track(first_id, slope, &[1, 2, 3, 4, 5, 6, 7], truth)
}

/// Helix from the origin: transverse circle of `radius` (cm) leaving along
/// `phi0`, turning `z / z_per_rad` radians by station z.
pub(crate) fn helix_track(first_id: u32, radius: f64, phi0: f64, z_per_rad: f64, truth: i32) -> Vec<Hit> {
    let (c, s) = (phi0.cos(), phi0.sin());
    station_z()
        .iter()
        .enumerate()
        .map(|(k, &z)| {
            let t = z / z_per_rad;
            let (lx, ly) = (radius * t.sin(), radius * (1.0 - t.cos()));
            let sector = k as i32 + 1;
            Hit::new(
                first_id + k as u32,
                [c * lx - s * ly, s * lx + c * ly, z],
                sector,
                volume_of(sector),
            )
            .with_truth(truth)
        })
        .collect()
}

/// Uniform noise hits on random stations, without truth.
pub(crate) fn noise_hits(rng: &mut StdRng, first_id: u32, n: usize) -> Vec<Hit> {
    let zs = station_z();
    (0..n)
        .map(|k| {
            let sector = rng.gen_range(1..=zs.len() as i32);
            let z = zs[(sector - 1) as usize];
            let r = rng.gen_range(0.02..0.15) * z;
            let phi = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
            Hit::new(
                first_id + k as u32,
                [r * phi.cos(), r * phi.sin(), z],
                sector,
                volume_of(sector),
            )
        })
        .collect()
}

/// Truth tracks for every truth id present in `hits`.
pub(crate) fn truth_for(hits: &[Hit]) -> BTreeMap<i32, McTrack> {
    let mut out: BTreeMap<i32, McTrack> = BTreeMap::new();
    for hit in hits {
        let Some(id) = hit.truth_id else {
            continue;
        };
        out.entry(id)
            .or_insert_with(|| McTrack {
                id,
                pt: 0.0,
                eta: 0.0,
                phi: 0.0,
                charge: 1,
                start_vertex: None,
                hit_ids: Vec::new(),
            })
            .hit_ids
            .push(hit.id);
    }
    out
}
