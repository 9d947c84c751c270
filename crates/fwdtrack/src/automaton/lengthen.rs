use std::collections::HashMap;

use crate::criteria::CriteriaRecorder;

use super::{Automaton, SegmentId};

/// Counters of one lengthening pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthenStats {
    /// Segments created (one per link of the previous graph).
    pub n_segments: usize,
    /// Links between the new segments that passed the criteria.
    pub n_connections: usize,
    /// Candidate links tested.
    pub n_tested: usize,
}

impl Automaton {
    /// Replace the graph by one whose segments are one hit longer.
    ///
    /// Every alive link `P -> C` becomes a segment `P.hits + [C.last]`. Two
    /// new segments built from `P -> C` and `C -> D` overlap in all but one
    /// hit at each end; they are linked when the current criteria accept
    /// them as (parent, child). The old segments are subsumed and dropped.
    pub fn lengthen_segments(&mut self, mut recorder: Option<&mut CriteriaRecorder>) -> LengthenStats {
        let mut next = Automaton::new();
        next.criteria = std::mem::take(&mut self.criteria);

        let mut by_link: HashMap<(SegmentId, SegmentId), SegmentId> = HashMap::new();
        let mut created: Vec<(SegmentId, SegmentId, SegmentId)> = Vec::new();
        for (pid, parent) in self.segments() {
            for cid in self.alive_children(pid) {
                let child = &self.segments[cid.0];
                let Some(last) = child.hits.last() else {
                    continue;
                };
                let mut hits = parent.hits.clone();
                hits.push(*last);
                let nid = next.add_segment(hits);
                by_link.insert((pid, cid), nid);
                created.push((pid, cid, nid));
            }
        }

        let mut stats = LengthenStats {
            n_segments: created.len(),
            ..LengthenStats::default()
        };
        for &(_, cid, nid) in &created {
            for did in self.alive_children(cid) {
                let Some(&lower) = by_link.get(&(cid, did)) else {
                    continue;
                };
                stats.n_tested += 1;
                let accepted = next.criteria.accepts(
                    &next.segments[nid.0].hits,
                    &next.segments[lower.0].hits,
                    recorder.as_deref_mut(),
                );
                if accepted {
                    next.connect(nid, lower);
                    stats.n_connections += 1;
                }
            }
        }

        tracing::debug!(
            n_segments = stats.n_segments,
            n_connections = stats.n_connections,
            n_tested = stats.n_tested,
            "segments lengthened"
        );
        *self = next;
        stats
    }
}
