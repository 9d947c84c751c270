//! Boundary to the external track fitter.
//!
//! The tracker never sees a fitter's own error types: every call returns a
//! [`FitResult`]. [`StraightLineFitter`] is a dependency-free implementation
//! used by the command-line tool and the tests.

use serde::{Deserialize, Serialize};

use crate::hit::Hit;
use crate::seed::SeedState;

/// Fitted track parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedState {
    /// Momentum (GeV/c) at the reference position.
    pub momentum: [f64; 3],
    /// Reference position (cm).
    pub position: [f64; 3],
    /// Hits used by the fit.
    pub hits: Vec<Hit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chi2_ndf: Option<f64>,
}

impl FittedState {
    pub fn pt(&self) -> f64 {
        self.momentum[0].hypot(self.momentum[1])
    }
}

/// Outcome of a fit or refit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitResult {
    Converged { state: FittedState },
    NotConverged { state: FittedState },
    Failed { reason: String },
}

/// Status part of a [`FitResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Converged,
    NotConverged,
    Failed,
}

impl FitResult {
    pub fn status(&self) -> FitStatus {
        match self {
            Self::Converged { .. } => FitStatus::Converged,
            Self::NotConverged { .. } => FitStatus::NotConverged,
            Self::Failed { .. } => FitStatus::Failed,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    pub fn state(&self) -> Option<&FittedState> {
        match self {
            Self::Converged { state } | Self::NotConverged { state } => Some(state),
            Self::Failed { .. } => None,
        }
    }

    /// Fitted transverse momentum, 0 for a failed fit.
    pub fn pt(&self) -> f64 {
        self.state().map_or(0.0, FittedState::pt)
    }
}

/// External track fit.
pub trait TrackFitter {
    /// Fit a hit chain starting from a seed.
    fn fit(&mut self, hits: &[Hit], seed: &SeedState) -> FitResult;

    /// Track position on the plane `z = const`, if the track reaches it.
    fn project_to_plane(&self, state: &FittedState, z: f64) -> Option<[f64; 3]>;

    /// Refit an existing fit with additional hits.
    fn refit_with_extra_hits(&mut self, state: &FittedState, extra: &[Hit]) -> FitResult;
}

/// Fitter settings owned by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    /// Submit accepted candidates to the fitter.
    pub enabled: bool,
    /// Fits with a transverse momentum above this (GeV/c) count as good.
    pub good_fit_min_pt: f64,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            good_fit_min_pt: 0.1,
        }
    }
}

/// Per-event fit bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitCounters {
    pub seeds: usize,
    pub attempted_fits: usize,
    pub good_fits: usize,
    pub bad_fits: usize,
    pub converged_fits: usize,
    pub possible_refits: usize,
    pub attempted_refits: usize,
    pub good_refits: usize,
    pub bad_refits: usize,
}

impl FitCounters {
    pub fn record_fit(&mut self, result: &FitResult, good_fit_min_pt: f64) {
        self.attempted_fits += 1;
        if result.pt() > good_fit_min_pt {
            self.good_fits += 1;
        } else {
            self.bad_fits += 1;
        }
        if result.is_converged() {
            self.converged_fits += 1;
        }
    }

    pub fn record_refit(&mut self, result: &FitResult) {
        self.attempted_refits += 1;
        if result.is_converged() {
            self.good_refits += 1;
        } else {
            self.bad_refits += 1;
        }
    }

    pub fn merge(&mut self, other: &FitCounters) {
        self.seeds += other.seeds;
        self.attempted_fits += other.attempted_fits;
        self.good_fits += other.good_fits;
        self.bad_fits += other.bad_fits;
        self.converged_fits += other.converged_fits;
        self.possible_refits += other.possible_refits;
        self.attempted_refits += other.attempted_refits;
        self.good_refits += other.good_refits;
        self.bad_refits += other.bad_refits;
    }
}

// ── Straight-line reference fitter ─────────────────────────────────────────

/// Takes the seed momentum as the fit result and propagates along a straight
/// line from the seed position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightLineFitter {
    /// Seeds below this transverse momentum (GeV/c) do not converge.
    pub min_pt: f64,
}

impl Default for StraightLineFitter {
    fn default() -> Self {
        Self { min_pt: 0.01 }
    }
}

impl StraightLineFitter {
    pub fn new(min_pt: f64) -> Self {
        Self { min_pt }
    }
}

impl TrackFitter for StraightLineFitter {
    fn fit(&mut self, hits: &[Hit], seed: &SeedState) -> FitResult {
        if hits.is_empty() {
            return FitResult::Failed {
                reason: "no hits to fit".to_string(),
            };
        }
        if seed.momentum.iter().any(|p| !p.is_finite()) {
            return FitResult::Failed {
                reason: "non-finite seed momentum".to_string(),
            };
        }
        let state = FittedState {
            momentum: seed.momentum,
            position: seed.position,
            hits: hits.to_vec(),
            chi2_ndf: None,
        };
        if seed.pt() >= self.min_pt {
            FitResult::Converged { state }
        } else {
            FitResult::NotConverged { state }
        }
    }

    fn project_to_plane(&self, state: &FittedState, z: f64) -> Option<[f64; 3]> {
        let [px, py, pz] = state.momentum;
        if pz == 0.0 {
            return None;
        }
        let t = (z - state.position[2]) / pz;
        Some([state.position[0] + t * px, state.position[1] + t * py, z])
    }

    fn refit_with_extra_hits(&mut self, state: &FittedState, extra: &[Hit]) -> FitResult {
        let mut hits = state.hits.clone();
        hits.extend_from_slice(extra);
        hits.sort_by(|a, b| b.z().total_cmp(&a.z()));
        FitResult::Converged {
            state: FittedState {
                hits,
                ..state.clone()
            },
        }
    }
}
