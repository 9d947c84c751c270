use super::{Automaton, SegmentId};

impl Automaton {
    pub fn reset_states(&mut self) {
        for seg in &mut self.segments {
            seg.inner_state = 0;
            seg.outer_state = 0;
        }
        self.states_valid = false;
    }

    /// Propagate chain-length states until nothing changes.
    ///
    /// In every round a segment raises its inner state by one when one of its
    /// children has the same inner state (symmetrically for parents and the
    /// outer state). All updates of a round read the previous round's values.
    /// At the fixed point the inner (outer) state is the number of links on
    /// the longest chain below (above) the segment. The number of rounds is
    /// bounded by the longest chain, so the loop always terminates; the guard
    /// only protects against a corrupted graph.
    ///
    /// Returns the number of rounds that changed at least one state.
    pub fn do_automaton(&mut self) -> usize {
        self.reset_states();
        let n = self.segments.len();
        let mut rounds = 0;
        for _ in 0..=n {
            let mut inner: Vec<u32> = self.segments.iter().map(|s| s.inner_state).collect();
            let mut outer: Vec<u32> = self.segments.iter().map(|s| s.outer_state).collect();
            let mut changed = false;
            for i in (0..n).filter(|&i| self.alive[i]) {
                let id = SegmentId(i);
                let seg = &self.segments[i];
                if self
                    .alive_children(id)
                    .any(|c| self.segments[c.0].inner_state == seg.inner_state)
                {
                    inner[i] += 1;
                    changed = true;
                }
                if self
                    .alive_parents(id)
                    .any(|p| self.segments[p.0].outer_state == seg.outer_state)
                {
                    outer[i] += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            for (seg, (i, o)) in self.segments.iter_mut().zip(inner.into_iter().zip(outer)) {
                seg.inner_state = i;
                seg.outer_state = o;
            }
            rounds += 1;
        }
        self.states_valid = true;
        tracing::debug!(rounds, "automaton states converged");
        rounds
    }

    /// Remove segments that lie on no chain of at least `min_hits` hits.
    ///
    /// Runs [`Automaton::do_automaton`] first when states are stale. A chain
    /// through a segment has at most `len + inner + outer` hits, so only
    /// segments that cannot end up in a long enough track are removed.
    ///
    /// Returns the number of removed segments.
    pub fn clean_bad_states(&mut self, min_hits: usize) -> usize {
        if !self.states_valid {
            self.do_automaton();
        }
        let mut removed = 0;
        for i in 0..self.segments.len() {
            if self.alive[i] && self.segments[i].longest_chain_hits() < min_hits {
                self.alive[i] = false;
                removed += 1;
            }
        }
        if removed > 0 {
            let alive = &self.alive;
            for seg in &mut self.segments {
                seg.children.retain(|c| alive[c.0]);
                seg.parents.retain(|p| alive[p.0]);
            }
        }
        tracing::debug!(removed, remaining = self.n_segments(), "bad states cleaned");
        removed
    }
}
