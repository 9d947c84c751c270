use serde::{Deserialize, Serialize};

use crate::criteria::CriteriaDump;
use crate::fit::{FitCounters, FitResult};
use crate::refit::RefitOutcome;
use crate::seed::SeedState;

use super::truth::{QualitySummary, TruthMatch};

pub const RESULTS_SCHEMA_V1: &str = "fwdtrack.results.v1";

/// One accepted candidate with its seed and fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedTrack {
    /// Hit ids, outer station first.
    pub hit_ids: Vec<u32>,
    pub sectors: Vec<i32>,
    /// Iteration that found the track.
    pub iteration: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedState>,
    /// `None` when the fitter is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refit: Option<RefitOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truth: Option<TruthMatch>,
}

impl ReconstructedTrack {
    pub fn n_hits(&self) -> usize {
        self.hit_ids.len()
    }

    /// Fitted transverse momentum, if a fit produced a state.
    pub fn fitted_pt(&self) -> Option<f64> {
        self.fit.as_ref()?.state().map(|s| s.pt())
    }
}

/// Stage counters of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    pub index: usize,
    pub hits_before: usize,
    pub hits_after: usize,
    /// Fewer hits than a track needs; no stage ran.
    pub starved: bool,
    /// One-hit segments and their links.
    pub n_segments: usize,
    pub n_connections: usize,
    /// Lengthened segments and their links.
    pub n_long_segments: usize,
    pub n_long_connections: usize,
    pub automaton_rounds: usize,
    pub n_cleaned: usize,
    pub n_candidates: usize,
    pub n_accepted: usize,
    pub n_rejected: usize,
    /// Candidates above the activation threshold dropped by the repair pass.
    pub n_repaired: usize,
    /// Candidates below the threshold accepted into free hits.
    pub n_admitted: usize,
    pub selector_sweeps: usize,
    pub selector_converged: bool,
    pub hits_removed: usize,
}

/// Everything the tracker produced for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResult {
    pub event: u64,
    /// Station hits loaded for the event.
    pub n_hits: usize,
    pub tracks: Vec<ReconstructedTrack>,
    pub iterations: Vec<IterationReport>,
    pub fit_counters: FitCounters,
    /// Present when the source provides truth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualitySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<CriteriaDump>,
}

impl EventResult {
    /// Hits left in the pool after the last iteration.
    pub fn residual_hits(&self) -> usize {
        self.iterations.last().map_or(self.n_hits, |it| it.hits_after)
    }
}

/// Output document of a tracking run (`fwdtrack.results.v1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: String,
    pub n_events: usize,
    pub n_tracks: usize,
    pub fit_counters: FitCounters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualitySummary>,
    pub events: Vec<EventResult>,
}

impl RunSummary {
    /// Totals over `events`. Per-event criteria dumps are moved out and
    /// merged into the returned dump.
    pub fn from_events(mut events: Vec<EventResult>) -> (Self, Option<CriteriaDump>) {
        let mut fit_counters = FitCounters::default();
        let mut quality: Option<QualitySummary> = None;
        let mut criteria: Option<CriteriaDump> = None;
        for ev in &mut events {
            fit_counters.merge(&ev.fit_counters);
            if let Some(q) = &ev.quality {
                quality.get_or_insert_with(QualitySummary::default).merge(q);
            }
            if let Some(dump) = ev.criteria.take() {
                match criteria.as_mut() {
                    Some(all) => all.merge(dump),
                    None => criteria = Some(dump),
                }
            }
        }
        let summary = Self {
            schema_version: RESULTS_SCHEMA_V1.to_string(),
            n_events: events.len(),
            n_tracks: events.iter().map(|e| e.tracks.len()).sum(),
            fit_counters,
            quality,
            events,
        };
        (summary, criteria)
    }
}
