//! fwdtrack: combinatorial track finding for layered forward detectors.
//!
//! Hits are bucketed into sectors (one per tracking station). Every event is
//! processed in one or more iterations over the residual hit pool:
//!
//! 1. **Segments**: one-hit segments linked across neighbouring stations
//!    when every two-hit criterion accepts the pair.
//! 2. **Lengthening**: links become two-hit segments, linked again with the
//!    three-hit criteria.
//! 3. **Automaton**: chain-length states are propagated to a fixed point and
//!    segments on no long enough chain are pruned.
//! 4. **Candidates**: maximal chains with enough hits are enumerated.
//! 5. **Selection**: a Hopfield network picks a hit-disjoint, high-quality
//!    subset; its hits leave the pool.
//!
//! Accepted candidates get a seed estimate from circle fits through the outer
//! stations and are handed to a [`TrackFitter`]. An optional second pass
//! refits converged tracks with hits from supplementary planes.
//!
//! # Public API
//! - [`ForwardTracker`] with [`TrackerConfig`] as the entry point
//! - [`HitSource`] implementations ([`EventFileSource`], [`MemorySource`])
//! - [`TrackFitter`] as the fit boundary, [`StraightLineFitter`] as reference
//! - the building blocks ([`SegmentBuilder`], [`Automaton`], the selector,
//!   [`estimate_seed`]) for callers that drive the stages themselves

mod automaton;
mod candidate;
mod config;
mod criteria;
mod error;
mod fit;
mod geometry;
mod hit;
mod refit;
mod seed;
mod selector;
mod source;
mod tracker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use automaton::{
    Automaton, LengthenStats, SectorConnector, Segment, SegmentBuilder, SegmentId,
    StationConnector,
};
pub use candidate::TrackCandidate;
pub use config::{
    FinderMode, IterationConfig, IterationOverride, SegmentBuilderConfig, ThreeHitConfig,
    TrackerConfig,
};
pub use criteria::{
    CriteriaDump, CriteriaRecorder, CriteriaSet, Criterion, CriterionConfig, CriterionKind,
    CriterionSamples, GeometricCriterion, Window, CRITERIA_DUMP_SCHEMA,
};
pub use error::{ConfigError, CriterionError, TrackerError};
pub use fit::{
    FitCounters, FitResult, FitStatus, FittedState, FitterConfig, StraightLineFitter, TrackFitter,
};
pub use geometry::{SimpleCircle, PT_PER_CM};
pub use hit::{Hit, HitPool, McTrack, RemovalStats, StationId, StationLayout};
pub use refit::{refit_track, RefitConfig, RefitOutcome, SupplementaryHits};
pub use seed::{estimate_seed, SeedConfig, SeedState};
pub use selector::{calculate_best_set, select_tracks, Subset, SubsetConfig};
pub use source::{
    EventFileSource, EventRecord, HitSource, MemoryEvent, MemorySource, RawHit, RawPlaneHit,
    RawTruthTrack, EVENTS_SCHEMA_V1,
};
pub use tracker::{
    match_track, EventResult, ForwardTracker, IterationReport, QualitySummary,
    ReconstructedTrack, RunSummary, TruthMatch, MIN_POOL_HITS, RESULTS_SCHEMA_V1,
};
