//! Truth-seeded candidates and truth matching of reconstructed tracks.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::candidate::TrackCandidate;
use crate::hit::{Hit, HitPool, McTrack};

use super::result::ReconstructedTrack;

/// Purity a track needs to count as a match of its dominant truth track.
pub const MATCH_MIN_PURITY: f64 = 0.5;

/// Dominant truth contributor of a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthMatch {
    pub truth_id: i32,
    /// Hits from `truth_id` over all hits of the track.
    pub purity: f64,
    pub n_matched: usize,
}

/// Most frequent truth id among `hits`; ties go to the smaller id.
///
/// `None` when no hit carries truth.
pub fn match_track(hits: &[Hit]) -> Option<TruthMatch> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for id in hits.iter().filter_map(|h| h.truth_id) {
        *counts.entry(id).or_default() += 1;
    }
    let (truth_id, n_matched) = counts
        .into_iter()
        .fold(None, |best: Option<(i32, usize)>, (id, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((id, n)),
        })?;
    Some(TruthMatch {
        truth_id,
        purity: n_matched as f64 / hits.len() as f64,
        n_matched,
    })
}

/// Candidates built directly from truth tracks.
///
/// A truth track qualifies with at least `min_hits` pool hits, all on
/// distinct volumes. Hits are ordered outer sector first.
pub fn truth_candidates(
    pool: &HitPool,
    truth: &BTreeMap<i32, McTrack>,
    min_hits: usize,
) -> Vec<TrackCandidate> {
    let by_id: HashMap<u32, &Hit> = pool.iter().map(|h| (h.id, h)).collect();
    let mut out = Vec::new();
    for track in truth.values() {
        let mut hits: Vec<Hit> = track
            .hit_ids
            .iter()
            .filter_map(|id| by_id.get(id).copied().copied())
            .collect();
        if hits.len() < min_hits {
            continue;
        }
        hits.sort_by(|a, b| b.sector.cmp(&a.sector).then(b.z().total_cmp(&a.z())));
        let candidate = TrackCandidate::new(hits);
        if !candidate.has_distinct_volumes() {
            tracing::debug!(truth_id = track.id, "truth track revisits a volume, skipping");
            continue;
        }
        out.push(candidate);
    }
    out
}

/// Reconstruction quality of one event (or a sum of events).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub n_tracks: usize,
    /// Tracks with purity 1.
    pub n_clean: usize,
    /// Truth tracks with enough hits on distinct sectors to be found.
    pub n_findable: usize,
    /// Findable truth tracks matched by at least one track.
    pub n_matched: usize,
    /// `n_matched / n_findable`, 0 when nothing is findable.
    pub efficiency: f64,
}

impl QualitySummary {
    pub fn evaluate(
        pool: &HitPool,
        truth: &BTreeMap<i32, McTrack>,
        tracks: &[ReconstructedTrack],
        min_hits: usize,
    ) -> Self {
        let sector_of: HashMap<u32, i32> = pool.iter().map(|h| (h.id, h.sector)).collect();
        let findable: BTreeSet<i32> = truth
            .values()
            .filter(|t| {
                let sectors: BTreeSet<i32> = t
                    .hit_ids
                    .iter()
                    .filter_map(|id| sector_of.get(id).copied())
                    .collect();
                sectors.len() >= min_hits
            })
            .map(|t| t.id)
            .collect();
        let matched: BTreeSet<i32> = tracks
            .iter()
            .filter_map(|t| t.truth)
            .filter(|m| m.purity >= MATCH_MIN_PURITY && findable.contains(&m.truth_id))
            .map(|m| m.truth_id)
            .collect();

        let mut summary = Self {
            n_tracks: tracks.len(),
            n_clean: tracks
                .iter()
                .filter(|t| t.truth.is_some_and(|m| m.purity >= 1.0))
                .count(),
            n_findable: findable.len(),
            n_matched: matched.len(),
            efficiency: 0.0,
        };
        summary.update_efficiency();
        summary
    }

    pub fn merge(&mut self, other: &QualitySummary) {
        self.n_tracks += other.n_tracks;
        self.n_clean += other.n_clean;
        self.n_findable += other.n_findable;
        self.n_matched += other.n_matched;
        self.update_efficiency();
    }

    fn update_efficiency(&mut self) {
        self.efficiency = if self.n_findable > 0 {
            self.n_matched as f64 / self.n_findable as f64
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{straight_track, straight_track_at, truth_for};
    use approx::assert_relative_eq;

    #[test]
    fn dominant_contributor_and_purity() {
        let mut hits = straight_track_at(0, 0.0, 0.1, 3);
        hits[0] = hits[0].with_truth(8);
        hits[1] = hits[1].with_truth(8);
        let m = match_track(&hits).expect("match");
        assert_eq!(m.truth_id, 3);
        assert_eq!(m.n_matched, 5);
        assert_relative_eq!(m.purity, 5.0 / 7.0);

        let tie = [hits[0], hits[2]];
        assert_eq!(match_track(&tie).map(|m| m.truth_id), Some(3));
        assert!(match_track(&straight_track_at(0, 0.0, 0.1, 0)).is_none());
    }

    #[test]
    fn truth_candidates_need_enough_distinct_volumes() {
        let mut hits = straight_track_at(0, 0.0, 0.1, 1);
        hits.extend(straight_track(10, [0.0, 0.1], &[1, 2, 3], 2));
        // Two hits of track 3 on the same station.
        let mut doubled = straight_track(20, [-0.1, 0.0], &[1, 2, 3, 4], 3);
        doubled.extend(straight_track(30, [-0.1, 0.01], &[4], 3));
        hits.extend(doubled);

        let pool = HitPool::from_hits(hits.iter().copied());
        let truth = truth_for(&hits);
        let cands = truth_candidates(&pool, &truth, 4);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].sectors(), vec![7, 6, 5, 4, 3, 2, 1]);
        assert!(cands[0].has_monotonic_sectors());
    }

    #[test]
    fn quality_counts_findable_and_matched() {
        let a = straight_track_at(0, 0.0, 0.1, 1);
        let b = straight_track_at(10, 3.0, 0.1, 2);
        let c = straight_track(20, [0.0, -0.1], &[1, 2], 3);
        let hits: Vec<Hit> = a.iter().chain(&b).chain(&c).copied().collect();
        let pool = HitPool::from_hits(hits.iter().copied());
        let truth = truth_for(&hits);

        let track = ReconstructedTrack {
            hit_ids: a.iter().map(|h| h.id).collect(),
            sectors: a.iter().map(|h| h.sector).collect(),
            iteration: 0,
            seed: None,
            fit: None,
            refit: None,
            truth: match_track(&a),
        };
        let q = QualitySummary::evaluate(&pool, &truth, &[track], 7);
        assert_eq!(q.n_tracks, 1);
        assert_eq!(q.n_clean, 1);
        assert_eq!(q.n_findable, 2);
        assert_eq!(q.n_matched, 1);
        assert_relative_eq!(q.efficiency, 0.5);

        let mut total = q.clone();
        total.merge(&q);
        assert_eq!(total.n_findable, 4);
        assert_relative_eq!(total.efficiency, 0.5);
    }
}
