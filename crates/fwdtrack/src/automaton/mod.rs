//! Segment graph and the cellular automaton over it.
//!
//! Segments live in an arena and are addressed by [`SegmentId`]. Links go
//! from a parent (outer stations) to a child (inner stations), so the graph
//! is acyclic by construction. Removed segments are flagged dead instead of
//! being erased, which keeps ids stable for the whole iteration.
//!
//! Stages, in the order the iteration controller runs them:
//!
//! 1. [`SegmentBuilder`] creates one-hit segments and links them with the
//!    two-hit criteria.
//! 2. [`Automaton::lengthen_segments`] turns every link into a longer
//!    segment and links those with the three-hit criteria.
//! 3. [`Automaton::do_automaton`] propagates chain-length states.
//! 4. [`Automaton::clean_bad_states`] prunes segments on no long chain.
//! 5. [`Automaton::get_tracks`] enumerates maximal chains.

mod builder;
mod lengthen;
mod relax;
mod tracks;

pub use builder::{SectorConnector, SegmentBuilder, StationConnector};
pub use lengthen::LengthenStats;

use serde::Serialize;

use crate::criteria::CriteriaSet;
use crate::hit::Hit;

/// Index of a segment in the automaton arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SegmentId(pub usize);

/// Node of the segment graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// Hits, outer station first.
    pub hits: Vec<Hit>,
    pub parents: Vec<SegmentId>,
    pub children: Vec<SegmentId>,
    /// Longest chain of links below this segment.
    pub inner_state: u32,
    /// Longest chain of links above this segment.
    pub outer_state: u32,
}

impl Segment {
    fn new(hits: Vec<Hit>) -> Self {
        Self {
            hits,
            parents: Vec::new(),
            children: Vec::new(),
            inner_state: 0,
            outer_state: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hit count of the longest chain through this segment (valid after
    /// [`Automaton::do_automaton`]).
    pub fn longest_chain_hits(&self) -> usize {
        self.hits.len() + self.inner_state as usize + self.outer_state as usize
    }
}

/// Segment graph plus the criteria used by the next lengthening pass.
#[derive(Debug, Default)]
pub struct Automaton {
    segments: Vec<Segment>,
    alive: Vec<bool>,
    criteria: CriteriaSet,
    states_valid: bool,
}

impl Automaton {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_segment(&mut self, hits: Vec<Hit>) -> SegmentId {
        let id = SegmentId(self.segments.len());
        self.segments.push(Segment::new(hits));
        self.alive.push(true);
        self.states_valid = false;
        id
    }

    pub(crate) fn connect(&mut self, parent: SegmentId, child: SegmentId) {
        self.segments[parent.0].children.push(child);
        self.segments[child.0].parents.push(parent);
        self.states_valid = false;
    }

    /// Drop the criteria used by lengthening.
    pub fn clear_criteria(&mut self) {
        self.criteria.clear();
    }

    /// Replace the criteria used by the next lengthening pass.
    pub fn add_criteria(&mut self, criteria: CriteriaSet) {
        self.criteria = criteria;
    }

    pub fn criteria(&self) -> &CriteriaSet {
        &self.criteria
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.0)
    }

    pub fn is_alive(&self, id: SegmentId) -> bool {
        self.alive.get(id.0).copied().unwrap_or(false)
    }

    /// Alive segments in id order.
    pub fn segments(&self) -> impl Iterator<Item = (SegmentId, &Segment)> + '_ {
        self.segments
            .iter()
            .enumerate()
            .filter(|(i, _)| self.alive[*i])
            .map(|(i, s)| (SegmentId(i), s))
    }

    /// Number of alive segments.
    pub fn n_segments(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Number of links between alive segments.
    pub fn n_connections(&self) -> usize {
        self.segments()
            .map(|(_, s)| s.children.iter().filter(|c| self.alive[c.0]).count())
            .sum()
    }

    fn alive_children(&self, id: SegmentId) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.alive[c.0])
    }

    fn alive_parents(&self, id: SegmentId) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments[id.0]
            .parents
            .iter()
            .copied()
            .filter(|p| self.alive[p.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_segments_are_hidden_from_counts() {
        let mut a = Automaton::new();
        let h = |id| Hit::new(id, [0.0; 3], id as i32, 0);
        let s0 = a.add_segment(vec![h(2)]);
        let s1 = a.add_segment(vec![h(1)]);
        let s2 = a.add_segment(vec![h(0)]);
        a.connect(s0, s1);
        a.connect(s1, s2);
        assert_eq!(a.n_segments(), 3);
        assert_eq!(a.n_connections(), 2);

        a.alive[s2.0] = false;
        assert_eq!(a.n_segments(), 2);
        assert_eq!(a.n_connections(), 1);
        assert!(!a.is_alive(s2));
        assert!(!a.is_alive(SegmentId(99)));
    }
}
