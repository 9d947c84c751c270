//! Event processing: iterations, fitting and result assembly.
//!
//! For every event the tracker loads the hit pool, runs the configured
//! iterations (or builds truth candidates in truth mode), estimates a seed
//! for every accepted candidate, hands it to the fitter, optionally refits
//! with supplementary hits and finally matches tracks to truth.

mod iteration;
mod result;
mod truth;

pub use result::{EventResult, IterationReport, ReconstructedTrack, RunSummary, RESULTS_SCHEMA_V1};
pub use truth::{match_track, truth_candidates, QualitySummary, TruthMatch, MATCH_MIN_PURITY};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::candidate::TrackCandidate;
use crate::config::{FinderMode, TrackerConfig};
use crate::criteria::CriteriaRecorder;
use crate::error::{ConfigError, TrackerError};
use crate::fit::{FitCounters, TrackFitter};
use crate::refit::{refit_track, SupplementaryHits};
use crate::seed::estimate_seed;
use crate::source::HitSource;

/// An iteration with fewer hits in the pool is skipped.
pub const MIN_POOL_HITS: usize = 4;

/// Smallest truth track turned into a candidate in truth mode.
pub const MIN_TRUTH_TRACK_HITS: usize = 4;

/// Forward track finder over a [`HitSource`].
#[derive(Debug, Clone)]
pub struct ForwardTracker {
    config: TrackerConfig,
}

impl ForwardTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Reconstruct one event.
    ///
    /// The selector random generator is seeded from `rng_seed` and the event
    /// id, so results do not depend on which other events ran before.
    pub fn process_event<S, F>(&self, source: &S, event: u64, fitter: &mut F) -> Result<EventResult, TrackerError>
    where
        S: HitSource + ?Sized,
        F: TrackFitter + ?Sized,
    {
        let mut pool = source.load(event)?;
        let initial = pool.clone();
        let truth = source.truth_tracks(event)?;
        let supplementary = if self.config.refit.enabled {
            source.load_supplementary(event)?
        } else {
            SupplementaryHits::default()
        };
        let n_hits = pool.n_hits();
        tracing::info!(event, n_hits, n_truth_tracks = truth.len(), "processing event");

        let mut rng = StdRng::seed_from_u64(self.config.rng_seed.wrapping_add(event));
        let mut recorder = self.config.save_criteria_values.then(CriteriaRecorder::new);

        let mut found: Vec<(usize, TrackCandidate)> = Vec::new();
        let mut iterations = Vec::with_capacity(self.config.n_iterations);
        match self.config.mode {
            FinderMode::Combinatorial => {
                for index in 0..self.config.n_iterations {
                    let it_config = self.config.iteration(index);
                    let outcome = iteration::run(
                        index,
                        &mut pool,
                        &it_config,
                        self.config.seed.field_scale,
                        recorder.as_mut(),
                        &mut rng,
                    );
                    found.extend(outcome.accepted.into_iter().map(|c| (index, c)));
                    iterations.push(outcome.report);
                }
            }
            FinderMode::Truth => {
                let candidates = truth_candidates(&pool, &truth, MIN_TRUTH_TRACK_HITS);
                let removal = pool.remove_track_hits(&candidates);
                tracing::info!(n_candidates = candidates.len(), "truth-seeded candidates");
                iterations.push(IterationReport {
                    index: 0,
                    hits_before: n_hits,
                    hits_after: pool.n_hits(),
                    n_candidates: candidates.len(),
                    n_accepted: candidates.len(),
                    hits_removed: removal.removed,
                    ..IterationReport::default()
                });
                found.extend(candidates.into_iter().map(|c| (0, c)));
            }
        }

        let mut fit_counters = FitCounters::default();
        let tracks: Vec<ReconstructedTrack> = found
            .into_iter()
            .map(|(index, candidate)| {
                self.reconstruct(index, &candidate, fitter, &supplementary, &mut fit_counters)
            })
            .collect();

        let quality = (!truth.is_empty())
            .then(|| QualitySummary::evaluate(&initial, &truth, &tracks, self.findable_min_hits()));
        if let Some(q) = &quality {
            tracing::info!(
                "event {}: {} tracks ({} clean), {}/{} findable truth tracks matched",
                event,
                q.n_tracks,
                q.n_clean,
                q.n_matched,
                q.n_findable,
            );
        }
        tracing::info!(
            event,
            n_tracks = tracks.len(),
            residual_hits = pool.n_hits(),
            good_fits = fit_counters.good_fits,
            "event done"
        );

        Ok(EventResult {
            event,
            n_hits,
            tracks,
            iterations,
            fit_counters,
            quality,
            criteria: recorder.map(CriteriaRecorder::into_dump),
        })
    }

    /// Process `max_events` events starting at `first` (all remaining events
    /// when `max_events` is `None`).
    pub fn process_range<S, F>(
        &self,
        source: &S,
        fitter: &mut F,
        first: u64,
        max_events: Option<usize>,
    ) -> Result<Vec<EventResult>, TrackerError>
    where
        S: HitSource + ?Sized,
        F: TrackFitter + ?Sized,
    {
        let n_events = source.n_events() as u64;
        if first >= n_events {
            return Err(TrackerError::UnknownEvent(first));
        }
        let last = match max_events {
            Some(m) => first.saturating_add(m as u64).min(n_events),
            None => n_events,
        };
        tracing::info!(first, last, n_events, "processing event range");

        let mut results = Vec::with_capacity((last - first) as usize);
        for event in first..last {
            results.push(self.process_event(source, event, fitter)?);
        }
        let n_tracks: usize = results.iter().map(|r| r.tracks.len()).sum();
        tracing::info!("processed {} events, {} tracks", results.len(), n_tracks);
        Ok(results)
    }

    fn reconstruct<F: TrackFitter + ?Sized>(
        &self,
        iteration: usize,
        candidate: &TrackCandidate,
        fitter: &mut F,
        supplementary: &SupplementaryHits,
        counters: &mut FitCounters,
    ) -> ReconstructedTrack {
        let seed = estimate_seed(&candidate.hits, &self.config.seed);
        if seed.is_some() {
            counters.seeds += 1;
        }
        let fit = match &seed {
            Some(seed) if self.config.fitter.enabled => {
                let result = fitter.fit(&candidate.hits, seed);
                counters.record_fit(&result, self.config.fitter.good_fit_min_pt);
                tracing::debug!(
                    n_hits = candidate.len(),
                    status = ?result.status(),
                    pt = result.pt(),
                    "candidate fitted"
                );
                Some(result)
            }
            _ => None,
        };
        let refit = match &fit {
            Some(fit) if self.config.refit.enabled => Some(refit_track(
                fitter,
                fit,
                supplementary,
                &self.config.refit,
                counters,
            )),
            _ => None,
        };

        ReconstructedTrack {
            hit_ids: candidate.hit_ids(),
            sectors: candidate.sectors(),
            iteration,
            seed,
            fit,
            refit,
            truth: match_track(&candidate.hits),
        }
    }

    /// Hits a truth track needs on distinct sectors to count as findable.
    fn findable_min_hits(&self) -> usize {
        match self.config.mode {
            FinderMode::Truth => MIN_TRUTH_TRACK_HITS,
            FinderMode::Combinatorial => (0..self.config.n_iterations)
                .map(|i| self.config.iteration(i).subset.min_hits_on_track)
                .min()
                .unwrap_or(MIN_POOL_HITS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationOverride;
    use crate::fit::{FitStatus, StraightLineFitter};
    use crate::hit::Hit;
    use crate::refit::RefitOutcome;
    use crate::source::{MemoryEvent, MemorySource};
    use crate::test_utils::{helix_track, noise_hits, straight_track, straight_track_at, truth_for};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn source_of(hits: Vec<Hit>) -> MemorySource {
        let mut event = MemoryEvent::from_hits(hits);
        event.truth = truth_for(&event.hits);
        MemorySource::new(vec![event])
    }

    fn run(config: TrackerConfig, hits: Vec<Hit>) -> EventResult {
        let tracker = ForwardTracker::new(config).expect("valid config");
        let mut fitter = StraightLineFitter::default();
        tracker
            .process_event(&source_of(hits), 0, &mut fitter)
            .expect("event")
    }

    fn assert_disjoint(result: &EventResult) {
        let mut seen = HashSet::new();
        for track in &result.tracks {
            for id in &track.hit_ids {
                assert!(seen.insert(*id), "hit {id} used twice");
            }
        }
    }

    #[test]
    fn single_straight_track_is_found_whole() {
        let hits = straight_track_at(0, 0.4, 0.12, 1);
        let result = run(TrackerConfig::default(), hits);

        assert_eq!(result.tracks.len(), 1);
        let track = &result.tracks[0];
        assert_eq!(track.n_hits(), 7);
        assert_eq!(track.sectors, vec![7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(track.hit_ids, vec![6, 5, 4, 3, 2, 1, 0]);
        assert_eq!(result.iterations[0].n_candidates, 1);
        assert_eq!(result.residual_hits(), 0);
        assert_eq!(track.fit.as_ref().map(|f| f.status()), Some(FitStatus::Converged));
        assert_eq!(result.fit_counters.seeds, 1);
        assert_eq!(result.fit_counters.attempted_fits, 1);
    }

    #[test]
    fn two_separated_tracks_are_both_accepted() {
        let mut hits = straight_track_at(0, 0.3, 0.1, 1);
        hits.extend(straight_track_at(7, 0.3 + std::f64::consts::PI, 0.1, 2));
        let result = run(TrackerConfig::default(), hits);

        assert_eq!(result.tracks.len(), 2);
        assert!(result.tracks.iter().all(|t| t.n_hits() == 7));
        assert_disjoint(&result);
        assert_eq!(result.residual_hits(), 0);

        let q = result.quality.expect("truth available");
        assert_eq!(q.n_findable, 2);
        assert_eq!(q.n_matched, 2);
        assert_eq!(q.n_clean, 2);
    }

    #[test]
    fn broken_pair_leaves_a_short_chain() {
        let mut hits = straight_track(0, [0.1, 0.0], &[1, 2, 3, 4, 5], 1);
        // Rotate the outermost hit 45 degrees away in azimuth.
        let z = hits[4].z();
        let r = 0.1 * z;
        let phi = std::f64::consts::FRAC_PI_4;
        hits[4].position = [r * phi.cos(), r * phi.sin(), z];

        let strict = run(TrackerConfig::default(), hits.clone());
        assert!(strict.tracks.is_empty());
        assert_eq!(strict.iterations[0].n_accepted, 0);
        assert_eq!(strict.residual_hits(), 5);

        let mut config = TrackerConfig::default();
        config.default_iteration.subset.min_hits_on_track = 4;
        let loose = run(config, hits);
        assert_eq!(loose.tracks.len(), 1);
        assert_eq!(loose.tracks[0].sectors, vec![4, 3, 2, 1]);
        assert_eq!(loose.residual_hits(), 1);
    }

    #[test]
    fn disabling_criteria_links_every_reachable_pair() {
        let mut config = TrackerConfig::default();
        config.default_iteration.segment_builder.criteria.clear();
        config.default_iteration.three_hit.criteria.clear();
        config.default_iteration.subset.active = false;

        let mut hits = straight_track(0, [0.1, 0.0], &[1, 2, 3, 4], 1);
        hits.extend(straight_track(4, [-0.1, 0.0], &[1, 2, 3, 4], 2));
        let result = run(config.clone(), hits);
        let report = &result.iterations[0];
        assert_eq!(report.n_connections, 3 * 4);
        assert_eq!(report.n_long_segments, 12);
        assert_eq!(report.n_long_connections, 16);
        // min_hits 7 > 4 stations: nothing survives.
        assert_eq!(report.n_candidates, 0);
    }

    #[test]
    fn inactive_selector_keeps_pool() {
        let mut config = TrackerConfig::default();
        config.default_iteration.subset.active = false;
        let mut hits = straight_track_at(0, 0.3, 0.1, 1);
        hits.extend(straight_track_at(7, 2.0, 0.1, 2));
        let result = run(config, hits);
        assert_eq!(result.tracks.len(), 2);
        let report = &result.iterations[0];
        assert_eq!(report.hits_after, report.hits_before);
        assert_eq!(report.hits_removed, 0);
    }

    #[test]
    fn pool_shrinks_across_iterations() {
        let mut config = TrackerConfig::default();
        config.n_iterations = 3;
        let mut relaxed = config.default_iteration.subset.clone();
        relaxed.min_hits_on_track = 5;
        config.iterations.insert(
            1,
            IterationOverride {
                subset: Some(relaxed),
                ..IterationOverride::default()
            },
        );

        let mut hits = straight_track_at(0, 0.2, 0.1, 1);
        hits.extend(straight_track(7, [-0.1, 0.02], &[1, 2, 3, 4, 5], 2));
        let result = run(config, hits);

        let reports = &result.iterations;
        assert_eq!(reports.len(), 3);
        for r in reports {
            assert!(r.hits_after <= r.hits_before);
            if r.n_accepted > 0 {
                assert!(r.hits_after < r.hits_before);
            }
        }
        assert_eq!(reports[0].n_accepted, 1);
        assert_eq!(reports[0].hits_after, 5);
        assert_eq!(reports[1].n_accepted, 1);
        assert_eq!(reports[1].hits_after, 0);
        assert!(reports[2].starved);
        assert_eq!(result.tracks.iter().map(|t| t.iteration).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn starved_pool_skips_iteration() {
        let hits = straight_track(0, [0.1, 0.0], &[1, 2, 3], 1);
        let result = run(TrackerConfig::default(), hits);
        assert!(result.iterations[0].starved);
        assert_eq!(result.iterations[0].n_segments, 0);
        assert!(result.tracks.is_empty());
    }

    #[test]
    fn accepted_tracks_stay_disjoint_in_noise() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut hits = Vec::new();
        for k in 0..4 {
            let phi = -2.5 + 1.6 * k as f64;
            hits.extend(straight_track_at(7 * k as u32, phi, 0.06 + 0.02 * k as f64, k + 1));
        }
        hits.extend(noise_hits(&mut rng, 100, 40));

        let mut config = TrackerConfig::default();
        config.default_iteration.subset.min_hits_on_track = 5;
        let result = run(config, hits);
        assert_disjoint(&result);
        for track in &result.tracks {
            let mut sectors = track.sectors.clone();
            sectors.dedup();
            assert_eq!(sectors.len(), track.sectors.len());
            assert!(track.sectors.windows(2).all(|w| w[0] > w[1]));
        }
    }

    #[test]
    fn truth_mode_fits_truth_tracks() {
        let mut config = TrackerConfig::default();
        config.mode = FinderMode::Truth;
        let mut hits = helix_track(0, 400.0, 0.5, 300.0, 1);
        hits.extend(straight_track(20, [0.0, 0.1], &[1, 2, 3], 2));
        let result = run(config, hits);

        assert_eq!(result.tracks.len(), 1);
        let track = &result.tracks[0];
        assert_eq!(track.truth.map(|m| m.truth_id), Some(1));
        let seed = track.seed.expect("seed");
        assert!(!seed.used_fallback());
        assert_eq!(result.residual_hits(), 3);
    }

    #[test]
    fn refit_extends_converged_tracks() {
        let mut config = TrackerConfig::default();
        config.refit.enabled = true;
        config.refit.plane_z = vec![40.0, 60.0];

        let slope = [0.1, 0.05];
        let hits = straight_track(0, slope, &[1, 2, 3, 4, 5, 6, 7], 1);
        let mut event = MemoryEvent::from_hits(hits);
        for (plane, z) in [40.0, 60.0].into_iter().enumerate() {
            let id = 100 + plane as u32;
            event
                .supplementary
                .insert(plane, Hit::new(id, [slope[0] * z, slope[1] * z, z], -1, 0));
        }
        let source = MemorySource::new(vec![event]);

        let tracker = ForwardTracker::new(config).expect("config");
        let mut fitter = StraightLineFitter::default();
        let result = tracker.process_event(&source, 0, &mut fitter).expect("event");

        assert_eq!(result.tracks.len(), 1);
        match &result.tracks[0].refit {
            Some(RefitOutcome::Refitted { added_hit_ids, .. }) => {
                assert_eq!(added_hit_ids, &vec![100, 101]);
            }
            other => panic!("unexpected refit outcome {other:?}"),
        }
        assert_eq!(result.fit_counters.good_refits, 1);
        // No truth tracks in this source.
        assert!(result.quality.is_none());
    }

    #[test]
    fn criteria_values_are_recorded_on_request() {
        let mut config = TrackerConfig::default();
        config.save_criteria_values = true;
        let result = run(config, straight_track_at(0, 1.0, 0.1, 3));
        let dump = result.criteria.expect("criteria dump");
        assert_eq!(dump.criteria["Crit2_RZRatio"].values.len(), 6);
        assert!(dump.criteria["Crit2_RZRatio"].truth_ids.iter().all(|t| *t == Some(3)));
        assert_eq!(dump.criteria["Crit3_3DAngle"].values.len(), 5);
    }

    #[test]
    fn event_results_are_reproducible() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut hits = straight_track_at(0, 0.1, 0.1, 1);
        hits.extend(straight_track_at(7, 1.9, 0.08, 2));
        hits.extend(noise_hits(&mut rng, 50, 20));
        let mut config = TrackerConfig::default();
        config.default_iteration.subset.min_hits_on_track = 4;
        let a = run(config.clone(), hits.clone());
        let b = run(config, hits);
        assert_eq!(a, b);
    }

    #[test]
    fn range_processing_respects_bounds() {
        let events: Vec<MemoryEvent> = (0..3)
            .map(|k| MemoryEvent::from_hits(straight_track_at(0, k as f64, 0.1, 1)))
            .collect();
        let source = MemorySource::new(events);
        let tracker = ForwardTracker::new(TrackerConfig::default()).expect("config");
        let mut fitter = StraightLineFitter::default();

        let all = tracker.process_range(&source, &mut fitter, 0, None).expect("range");
        assert_eq!(all.len(), 3);
        let tail = tracker.process_range(&source, &mut fitter, 1, Some(10)).expect("range");
        assert_eq!(tail.iter().map(|r| r.event).collect::<Vec<_>>(), vec![1, 2]);
        assert!(matches!(
            tracker.process_range(&source, &mut fitter, 3, None),
            Err(TrackerError::UnknownEvent(3))
        ));

        let (summary, criteria) = RunSummary::from_events(all);
        assert_eq!(summary.n_events, 3);
        assert_eq!(summary.n_tracks, 3);
        assert_eq!(summary.fit_counters.attempted_fits, 3);
        assert!(criteria.is_none());
    }

    #[test]
    fn empty_pool_is_not_an_error() {
        let result = run(TrackerConfig::default(), Vec::new());
        assert!(result.tracks.is_empty());
        assert!(result.iterations[0].starved);
        assert_eq!(result.n_hits, 0);
    }
}
