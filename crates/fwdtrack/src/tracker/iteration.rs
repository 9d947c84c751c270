//! One pass of segment building, automaton and subset selection.

use rand::Rng;

use crate::automaton::{SegmentBuilder, StationConnector};
use crate::candidate::TrackCandidate;
use crate::config::IterationConfig;
use crate::criteria::{CriteriaRecorder, CriteriaSet};
use crate::hit::HitPool;
use crate::selector::select_tracks;

use super::result::IterationReport;
use super::MIN_POOL_HITS;

pub(super) struct IterationOutcome {
    pub report: IterationReport,
    /// Candidates to fit, hit-disjoint when the selector ran.
    pub accepted: Vec<TrackCandidate>,
}

/// Run one iteration over the residual pool.
///
/// Hits of accepted candidates leave the pool whatever their later fit
/// outcome. With the selector disabled every candidate is returned and the
/// pool is left untouched.
pub(super) fn run<R: Rng + ?Sized>(
    index: usize,
    pool: &mut HitPool,
    config: &IterationConfig,
    field_scale: f64,
    mut recorder: Option<&mut CriteriaRecorder>,
    rng: &mut R,
) -> IterationOutcome {
    let hits_before = pool.n_hits();
    let mut report = IterationReport {
        index,
        hits_before,
        hits_after: hits_before,
        ..IterationReport::default()
    };
    if hits_before < MIN_POOL_HITS {
        tracing::info!(iteration = index, n_hits = hits_before, "not enough hits left, skipping iteration");
        report.starved = true;
        return IterationOutcome {
            report,
            accepted: Vec::new(),
        };
    }

    let min_hits = config.subset.min_hits_on_track;

    let mut automaton = {
        let mut builder = SegmentBuilder::new(pool);
        builder.add_criteria(CriteriaSet::from_config(&config.segment_builder.criteria, field_scale));
        builder.add_sector_connector(StationConnector::new(config.segment_builder.connector_distance));
        builder.build_one_hit_automaton(recorder.as_deref_mut())
    };
    report.n_segments = automaton.n_segments();
    report.n_connections = automaton.n_connections();

    automaton.clear_criteria();
    automaton.add_criteria(CriteriaSet::from_config(&config.three_hit.criteria, field_scale));
    let stats = automaton.lengthen_segments(recorder.as_deref_mut());
    report.n_long_segments = stats.n_segments;
    report.n_long_connections = stats.n_connections;

    if config.three_hit.do_automaton {
        report.automaton_rounds = automaton.do_automaton();
        if config.three_hit.clean_bad_states {
            report.n_cleaned = automaton.clean_bad_states(min_hits);
        }
    }

    let candidates = automaton.get_tracks(min_hits);
    report.n_candidates = candidates.len();

    let accepted = if config.subset.active {
        let subset = select_tracks(candidates, &config.subset, rng);
        report.n_rejected = subset.rejected.len();
        report.n_repaired = subset.n_repaired;
        report.n_admitted = subset.n_admitted;
        report.selector_sweeps = subset.n_sweeps;
        report.selector_converged = subset.converged;
        let removal = pool.remove_track_hits(&subset.accepted);
        report.hits_removed = removal.removed;
        subset.accepted
    } else {
        tracing::debug!(iteration = index, "subset selector inactive, keeping every candidate");
        candidates
    };
    report.n_accepted = accepted.len();
    report.hits_after = pool.n_hits();

    tracing::info!(
        "iteration {}: {} hits, {} segments / {} links, {} long segments / {} links, {} candidates, {} accepted, {} rejected, {} hits left",
        index,
        hits_before,
        report.n_segments,
        report.n_connections,
        report.n_long_segments,
        report.n_long_connections,
        report.n_candidates,
        report.n_accepted,
        report.n_rejected,
        report.hits_after,
    );
    IterationOutcome { report, accepted }
}
