//! Hopfield-network subset selection of track candidates.
//!
//! Candidates that share a hit conflict. The network anneals towards a set of
//! high-quality, mutually compatible candidates; a deterministic repair pass
//! then guarantees that the accepted set is hit-disjoint.

mod hopfield;

use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::candidate::TrackCandidate;

use hopfield::{Annealing, HopfieldNetwork};

/// Subset selector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetConfig {
    /// Run the selector. When off, every candidate is fitted and no hits are
    /// removed from the pool.
    pub active: bool,
    /// Minimum number of hits of an enumerated candidate.
    pub min_hits_on_track: usize,
    /// Weight of the quality reward relative to the unit conflict penalty.
    pub omega: f64,
    /// Stop once the largest activation change of a sweep is below this.
    pub stable_threshold: f64,
    pub initial_temp: f64,
    /// Temperature the annealing converges to.
    pub inf_temp: f64,
    /// Activation at or above which a candidate is accepted.
    pub activation_threshold: f64,
    /// Upper bound on the number of sweeps.
    pub max_sweeps: usize,
    /// Chain length that maps to quality 1.
    pub expected_max_hits: usize,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            active: true,
            min_hits_on_track: 7,
            omega: 0.75,
            stable_threshold: 0.1,
            initial_temp: 2.1,
            inf_temp: 0.1,
            activation_threshold: 0.5,
            max_sweeps: 1000,
            expected_max_hits: 7,
        }
    }
}

/// Outcome of subset selection.
#[derive(Debug, Clone)]
pub struct Subset<T> {
    /// Accepted items, in input order. Pairwise compatible.
    pub accepted: Vec<T>,
    /// Rejected items, in input order.
    pub rejected: Vec<T>,
    /// Final activation of every input item.
    pub activations: Vec<f64>,
    pub n_sweeps: usize,
    /// False when `max_sweeps` was reached before the network was stable.
    pub converged: bool,
    /// Items above the activation threshold dropped by the repair pass.
    pub n_repaired: usize,
    /// Items below the activation threshold accepted because they conflict
    /// with nothing kept.
    pub n_admitted: usize,
}

/// Select the best compatible subset of `items`.
///
/// `compatible` must be symmetric. The random generator drives the initial
/// activations and the update order, so a seeded generator gives
/// reproducible results.
pub fn calculate_best_set<T, R>(
    items: Vec<T>,
    compatible: impl Fn(&T, &T) -> bool,
    quality: impl Fn(&T) -> f64,
    config: &SubsetConfig,
    rng: &mut R,
) -> Subset<T>
where
    R: Rng + ?Sized,
{
    let n = items.len();
    if n == 0 {
        return Subset {
            accepted: Vec::new(),
            rejected: Vec::new(),
            activations: Vec::new(),
            n_sweeps: 0,
            converged: true,
            n_repaired: 0,
            n_admitted: 0,
        };
    }

    let qualities: Vec<f64> = items.iter().map(&quality).collect();
    let mut conflicts = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            if !compatible(&items[i], &items[j]) {
                conflicts[(i, j)] = 1.0;
                conflicts[(j, i)] = 1.0;
            }
        }
    }

    let annealing = Annealing {
        initial_temp: config.initial_temp,
        inf_temp: config.inf_temp,
        stable_threshold: config.stable_threshold,
    };
    let mut net = HopfieldNetwork::new(&conflicts, &qualities, config.omega, annealing, rng);
    let mut n_sweeps = 0;
    let mut converged = false;
    while n_sweeps < config.max_sweeps {
        let change = net.sweep(rng);
        n_sweeps += 1;
        if net.is_stable(change) {
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!(n_sweeps, "subset selector hit the sweep limit before stabilizing");
    }

    let activations: Vec<f64> = net.states().iter().copied().collect();
    let repaired = repair(&activations, &qualities, &conflicts, config.activation_threshold);
    tracing::debug!(
        n_candidates = n,
        n_sweeps,
        final_temp = net.temperature(),
        n_repaired = repaired.n_repaired,
        n_admitted = repaired.n_admitted,
        "subset selection finished"
    );

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for (item, keep) in items.into_iter().zip(repaired.keep) {
        if keep {
            accepted.push(item);
        } else {
            rejected.push(item);
        }
    }
    Subset {
        accepted,
        rejected,
        activations,
        n_sweeps,
        converged,
        n_repaired: repaired.n_repaired,
        n_admitted: repaired.n_admitted,
    }
}

struct Repair {
    keep: Vec<bool>,
    n_repaired: usize,
    n_admitted: usize,
}

/// Hard disjointness pass.
///
/// Items are visited by activation (descending), then quality (descending),
/// then input index; an item is kept unless it conflicts with one kept
/// earlier. Items above `threshold` come first in that order, so the ones
/// below it are only admitted into the gaps the network left.
fn repair(activations: &[f64], qualities: &[f64], conflicts: &DMatrix<f64>, threshold: f64) -> Repair {
    let mut order: Vec<usize> = (0..activations.len()).collect();
    order.sort_by(|&a, &b| {
        activations[b]
            .total_cmp(&activations[a])
            .then(qualities[b].total_cmp(&qualities[a]))
            .then(a.cmp(&b))
    });

    let mut out = Repair {
        keep: vec![false; activations.len()],
        n_repaired: 0,
        n_admitted: 0,
    };
    let mut kept: Vec<usize> = Vec::with_capacity(order.len());
    for i in order {
        let above = activations[i] >= threshold;
        if kept.iter().any(|&k| conflicts[(i, k)] != 0.0) {
            if above {
                out.n_repaired += 1;
            }
            continue;
        }
        if !above {
            out.n_admitted += 1;
        }
        out.keep[i] = true;
        kept.push(i);
    }
    out
}

/// Subset selection of track candidates: conflict = shared hit id, quality =
/// length / `expected_max_hits`.
pub fn select_tracks<R: Rng + ?Sized>(
    candidates: Vec<TrackCandidate>,
    config: &SubsetConfig,
    rng: &mut R,
) -> Subset<TrackCandidate> {
    calculate_best_set(
        candidates,
        |a, b| !a.shares_hit_with(b),
        |c| c.quality(config.expected_max_hits),
        config,
        rng,
    )
}
