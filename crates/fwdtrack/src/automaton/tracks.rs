use crate::candidate::TrackCandidate;
use crate::hit::Hit;

use super::{Automaton, SegmentId};

impl Automaton {
    /// All maximal chains with at least `min_hits` hits.
    ///
    /// Walks down from every alive segment without alive parents, in id
    /// order, children in link order. A chain contributes the full hit list
    /// of its first segment and the last hit of every following segment, so
    /// hits are ordered outer station first.
    pub fn get_tracks(&self, min_hits: usize) -> Vec<TrackCandidate> {
        let mut tracks = Vec::new();
        let mut path: Vec<SegmentId> = Vec::new();
        for (id, _) in self.segments() {
            if self.alive_parents(id).next().is_some() {
                continue;
            }
            self.walk(id, &mut path, min_hits, &mut tracks);
        }
        tracing::debug!(n_tracks = tracks.len(), min_hits, "tracks enumerated");
        tracks
    }

    fn walk(
        &self,
        id: SegmentId,
        path: &mut Vec<SegmentId>,
        min_hits: usize,
        out: &mut Vec<TrackCandidate>,
    ) {
        path.push(id);
        let mut leaf = true;
        for child in self.alive_children(id) {
            leaf = false;
            self.walk(child, path, min_hits, out);
        }
        if leaf {
            let hits = self.chain_hits(path);
            if hits.len() >= min_hits {
                out.push(TrackCandidate::new(hits));
            }
        }
        path.pop();
    }

    fn chain_hits(&self, path: &[SegmentId]) -> Vec<Hit> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let mut hits = self.segments[first.0].hits.clone();
        hits.extend(
            rest.iter()
                .filter_map(|id| self.segments[id.0].hits.last().copied()),
        );
        hits
    }
}
