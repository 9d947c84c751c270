use std::collections::{BTreeSet, HashMap};

use crate::criteria::{CriteriaRecorder, CriteriaSet};
use crate::hit::HitPool;

use super::{Automaton, SegmentId};

/// Tells the builder which inner sectors a sector may link to.
pub trait SectorConnector {
    fn target_sectors(&self, sector: i32) -> BTreeSet<i32>;
}

/// Links a station to the next `distance` inner stations (never below 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationConnector {
    pub distance: u32,
}

impl StationConnector {
    pub fn new(distance: u32) -> Self {
        Self { distance }
    }
}

impl SectorConnector for StationConnector {
    fn target_sectors(&self, sector: i32) -> BTreeSet<i32> {
        (1..=self.distance as i32)
            .map(|step| sector - step)
            .filter(|&t| t >= 0)
            .collect()
    }
}

/// Builds the one-hit segment automaton from a hit pool.
pub struct SegmentBuilder<'a> {
    pool: &'a HitPool,
    criteria: CriteriaSet,
    connectors: Vec<Box<dyn SectorConnector + 'a>>,
}

impl<'a> SegmentBuilder<'a> {
    pub fn new(pool: &'a HitPool) -> Self {
        Self {
            pool,
            criteria: CriteriaSet::new(),
            connectors: Vec::new(),
        }
    }

    pub fn add_criteria(&mut self, criteria: CriteriaSet) {
        self.criteria = criteria;
    }

    pub fn add_sector_connector(&mut self, connector: impl SectorConnector + 'a) {
        self.connectors.push(Box::new(connector));
    }

    /// One segment per hit; a link from every outer hit to every reachable
    /// inner hit that passes all two-hit criteria.
    pub fn build_one_hit_automaton(&self, mut recorder: Option<&mut CriteriaRecorder>) -> Automaton {
        let mut automaton = Automaton::new();
        let mut ids: HashMap<i32, Vec<SegmentId>> = HashMap::new();
        for (sector, hits) in self.pool.sectors() {
            let sector_ids = hits
                .iter()
                .map(|hit| automaton.add_segment(vec![*hit]))
                .collect();
            ids.insert(sector, sector_ids);
        }

        for (sector, outer_hits) in self.pool.sectors() {
            let targets: BTreeSet<i32> = self
                .connectors
                .iter()
                .flat_map(|c| c.target_sectors(sector))
                .collect();
            for target in targets {
                if target >= sector {
                    tracing::warn!(sector, target, "connector target is not an inner sector, skipping");
                    continue;
                }
                let inner_hits = self.pool.hits_in(target);
                if inner_hits.is_empty() {
                    continue;
                }
                for (i, outer) in outer_hits.iter().enumerate() {
                    for (j, inner) in inner_hits.iter().enumerate() {
                        let accepted = self.criteria.accepts(
                            std::slice::from_ref(outer),
                            std::slice::from_ref(inner),
                            recorder.as_deref_mut(),
                        );
                        if accepted {
                            automaton.connect(ids[&sector][i], ids[&target][j]);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            n_segments = automaton.n_segments(),
            n_connections = automaton.n_connections(),
            "one-hit automaton built"
        );
        automaton
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{CriterionKind, GeometricCriterion};
    use crate::hit::Hit;

    struct Backwards;

    impl SectorConnector for Backwards {
        fn target_sectors(&self, sector: i32) -> BTreeSet<i32> {
            [sector + 1].into_iter().collect()
        }
    }

    fn pool() -> HitPool {
        // Two hits per station on stations 1..=3.
        let mut hits = Vec::new();
        for s in 1..=3 {
            for k in 0..2 {
                let z = 100.0 * s as f64;
                let x = if k == 0 { 0.1 * z } else { -0.1 * z };
                hits.push(Hit::new(hits.len() as u32, [x, 0.0, z], s, s));
            }
        }
        HitPool::from_hits(hits)
    }

    #[test]
    fn station_connector_respects_distance_and_floor() {
        let c = StationConnector::new(2);
        assert_eq!(c.target_sectors(5).into_iter().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(c.target_sectors(1).into_iter().collect::<Vec<_>>(), vec![0]);
        assert!(StationConnector::new(0).target_sectors(5).is_empty());
    }

    #[test]
    fn without_criteria_every_reachable_pair_links() {
        let pool = pool();
        let mut builder = SegmentBuilder::new(&pool);
        builder.add_sector_connector(StationConnector::new(1));
        let a = builder.build_one_hit_automaton(None);
        assert_eq!(a.n_segments(), 6);
        // 3->2 and 2->1, 2x2 pairs each.
        assert_eq!(a.n_connections(), 8);

        let mut builder = SegmentBuilder::new(&pool);
        builder.add_sector_connector(StationConnector::new(2));
        assert_eq!(builder.build_one_hit_automaton(None).n_connections(), 12);
    }

    #[test]
    fn criteria_filter_links() {
        let pool = pool();
        let mut criteria = CriteriaSet::new();
        criteria.push(GeometricCriterion::new(CriterionKind::DeltaPhi, 0.0, 1.0));
        let mut builder = SegmentBuilder::new(&pool);
        builder.add_criteria(criteria);
        builder.add_sector_connector(StationConnector::new(1));
        let a = builder.build_one_hit_automaton(None);
        // Only same-side pairs survive.
        assert_eq!(a.n_connections(), 4);
        for (_, seg) in a.segments() {
            for child in &seg.children {
                let c = a.segment(*child).expect("child");
                assert!(seg.hits[0].sector > c.hits[0].sector);
                assert_eq!(seg.hits[0].x().signum(), c.hits[0].x().signum());
            }
        }
    }

    #[test]
    fn outward_targets_are_skipped() {
        let pool = pool();
        let mut builder = SegmentBuilder::new(&pool);
        builder.add_sector_connector(Backwards);
        assert_eq!(builder.build_one_hit_automaton(None).n_connections(), 0);
    }
}
