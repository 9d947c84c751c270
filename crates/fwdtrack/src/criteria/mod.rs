//! Segment compatibility criteria.
//!
//! A criterion scores a (parent, child) pair of segments and accepts it when
//! the score falls inside a `[min, max]` window. Segments are passed as hit
//! slices ordered outer station first:
//!
//! - two-hit stage: `parent = [outer]`, `child = [inner]`;
//! - three-hit stage: `parent = [a, b]`, `child = [b, c]` with `a` outermost.
//!
//! [`CriteriaSet`] applies an ordered list of criteria in conjunction and
//! stops at the first rejection.

mod recorder;
mod three_hit;
mod two_hit;

pub use recorder::{CriteriaDump, CriteriaRecorder, CriterionSamples, CRITERIA_DUMP_SCHEMA};

use serde::{Deserialize, Serialize};

use crate::error::CriterionError;
use crate::hit::Hit;

/// Closed acceptance interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub min: f64,
    pub max: f64,
}

impl Window {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `NaN` is never contained.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Pairwise compatibility test between two adjacent segments.
pub trait Criterion: std::fmt::Debug + Send + Sync {
    /// Name used in configuration and diagnostic dumps.
    fn name(&self) -> &str;

    /// Number of hits each segment must carry.
    fn hits_per_segment(&self) -> usize;

    /// Scalar feature of the pair.
    fn value(&self, parent: &[Hit], child: &[Hit]) -> Result<f64, CriterionError>;

    fn window(&self) -> Window;

    /// Whether a computed value passes this criterion.
    fn accepts(&self, value: f64) -> bool {
        self.window().contains(value)
    }
}

/// Built-in geometric criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriterionKind {
    RzRatio,
    StraightTrackRatio,
    DeltaPhi,
    DeltaRho,
    HelixWithIp,
    Angle3d,
    Angle2d,
    ChangeRzRatio,
    Pt,
    IpCircleDist,
}

impl CriterionKind {
    pub const ALL: [Self; 10] = [
        Self::RzRatio,
        Self::StraightTrackRatio,
        Self::DeltaPhi,
        Self::DeltaRho,
        Self::HelixWithIp,
        Self::Angle3d,
        Self::Angle2d,
        Self::ChangeRzRatio,
        Self::Pt,
        Self::IpCircleDist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::RzRatio => "Crit2_RZRatio",
            Self::StraightTrackRatio => "Crit2_StraightTrackRatio",
            Self::DeltaPhi => "Crit2_DeltaPhi",
            Self::DeltaRho => "Crit2_DeltaRho",
            Self::HelixWithIp => "Crit2_HelixWithIP",
            Self::Angle3d => "Crit3_3DAngle",
            Self::Angle2d => "Crit3_2DAngle",
            Self::ChangeRzRatio => "Crit3_ChangeRZRatio",
            Self::Pt => "Crit3_PT",
            Self::IpCircleDist => "Crit3_IPCircleDist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn hits_per_segment(self) -> usize {
        match self {
            Self::RzRatio
            | Self::StraightTrackRatio
            | Self::DeltaPhi
            | Self::DeltaRho
            | Self::HelixWithIp => 1,
            Self::Angle3d | Self::Angle2d | Self::ChangeRzRatio | Self::Pt | Self::IpCircleDist => 2,
        }
    }

    /// Short description for `fwdtrack criteria`.
    pub fn description(self) -> &'static str {
        match self {
            Self::RzRatio => "3D distance over |dz| between the two hits",
            Self::StraightTrackRatio => "(rho/z) of the outer hit over (rho/z) of the inner hit",
            Self::DeltaPhi => "azimuth difference in degrees, wrapped to [0, 180]",
            Self::DeltaRho => "rho of the outer hit minus rho of the inner hit",
            Self::HelixWithIp => "ratio of turning angle per z on the circle through the IP",
            Self::Angle3d => "3D angle between consecutive hit displacements (deg)",
            Self::Angle2d => "transverse angle between consecutive hit displacements (deg)",
            Self::ChangeRzRatio => "RZ ratio of the outer pair over that of the inner pair",
            Self::Pt => "transverse momentum of the circle through the three hits",
            Self::IpCircleDist => "distance of the interaction point from the three-hit circle",
        }
    }
}

/// One of the built-in criteria with its acceptance window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricCriterion {
    pub kind: CriterionKind,
    pub window: Window,
    /// Multiplier applied to [`crate::PT_PER_CM`] for `Crit3_PT`.
    pub field_scale: f64,
}

impl GeometricCriterion {
    pub fn new(kind: CriterionKind, min: f64, max: f64) -> Self {
        Self {
            kind,
            window: Window::new(min, max),
            field_scale: 5.0,
        }
    }

    pub fn with_field_scale(mut self, field_scale: f64) -> Self {
        self.field_scale = field_scale;
        self
    }
}

fn check_lengths(expected: usize, parent: &[Hit], child: &[Hit]) -> Result<(), CriterionError> {
    if parent.len() != expected || child.len() != expected {
        return Err(CriterionError::BadSegmentLength {
            expected,
            got: (parent.len(), child.len()),
        });
    }
    Ok(())
}

impl Criterion for GeometricCriterion {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn hits_per_segment(&self) -> usize {
        self.kind.hits_per_segment()
    }

    fn value(&self, parent: &[Hit], child: &[Hit]) -> Result<f64, CriterionError> {
        check_lengths(self.kind.hits_per_segment(), parent, child)?;
        match self.kind {
            CriterionKind::RzRatio => two_hit::rz_ratio(&parent[0], &child[0]),
            CriterionKind::StraightTrackRatio => two_hit::straight_track_ratio(&parent[0], &child[0]),
            CriterionKind::DeltaPhi => Ok(two_hit::delta_phi_deg(&parent[0], &child[0])),
            CriterionKind::DeltaRho => Ok(parent[0].rho() - child[0].rho()),
            CriterionKind::HelixWithIp => two_hit::helix_with_ip(&parent[0], &child[0]),
            CriterionKind::Angle3d => three_hit::angle_3d_deg(&parent[0], &parent[1], &child[1]),
            CriterionKind::Angle2d => three_hit::angle_2d_deg(&parent[0], &parent[1], &child[1]),
            CriterionKind::ChangeRzRatio => {
                three_hit::change_rz_ratio(&parent[0], &parent[1], &child[1])
            }
            CriterionKind::Pt => {
                three_hit::pt(&parent[0], &parent[1], &child[1], self.field_scale)
            }
            CriterionKind::IpCircleDist => {
                three_hit::ip_circle_dist(&parent[0], &parent[1], &child[1])
            }
        }
    }

    fn window(&self) -> Window {
        self.window
    }
}

// ── Configuration entries ──────────────────────────────────────────────────

/// Criterion entry as written in the tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionConfig {
    pub name: String,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CriterionConfig {
    pub fn new(kind: CriterionKind, min: f64, max: f64) -> Self {
        Self {
            name: kind.name().to_string(),
            min,
            max,
            active: true,
        }
    }
}

// ── Criteria set ───────────────────────────────────────────────────────────

/// Ordered conjunction of criteria for one stage.
#[derive(Debug, Default)]
pub struct CriteriaSet {
    criteria: Vec<Box<dyn Criterion>>,
}

impl CriteriaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from configuration entries.
    ///
    /// Inactive entries and unknown names are skipped (logged), so an empty
    /// configuration yields an empty set that accepts every pair.
    pub fn from_config(entries: &[CriterionConfig], field_scale: f64) -> Self {
        let mut set = Self::new();
        for entry in entries {
            if !entry.active {
                tracing::info!(criterion = %entry.name, "criterion inactive, skipping");
                continue;
            }
            let Some(kind) = CriterionKind::from_name(&entry.name) else {
                tracing::warn!(criterion = %entry.name, "unknown criterion name, skipping");
                continue;
            };
            tracing::debug!(
                criterion = %entry.name,
                min = entry.min,
                max = entry.max,
                "criterion enabled"
            );
            set.push(GeometricCriterion::new(kind, entry.min, entry.max).with_field_scale(field_scale));
        }
        set
    }

    pub fn push(&mut self, criterion: impl Criterion + 'static) {
        self.criteria.push(Box::new(criterion));
    }

    pub fn clear(&mut self) {
        self.criteria.clear();
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.criteria.iter().map(|c| c.name())
    }

    /// Evaluate all criteria in order, stopping at the first rejection.
    ///
    /// A criterion that cannot compute a value rejects the pair. When a
    /// recorder is supplied, every computed value is recorded.
    pub fn accepts(
        &self,
        parent: &[Hit],
        child: &[Hit],
        mut recorder: Option<&mut CriteriaRecorder>,
    ) -> bool {
        for criterion in &self.criteria {
            let value = match criterion.value(parent, child) {
                Ok(v) => v,
                Err(err) => {
                    tracing::trace!(criterion = criterion.name(), %err, "pair rejected");
                    return false;
                }
            };
            if let Some(rec) = recorder.as_deref_mut() {
                rec.record(criterion.name(), value, parent, child);
            }
            if !criterion.accepts(value) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: u32, x: f64, y: f64, z: f64) -> Hit {
        Hit::new(id, [x, y, z], 0, 0)
    }

    #[test]
    fn names_round_trip_through_kind() {
        for kind in CriterionKind::ALL {
            assert_eq!(CriterionKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(CriterionKind::from_name("Crit2_Bogus"), None);
    }

    #[test]
    fn wrong_segment_length_is_an_error() {
        let c = GeometricCriterion::new(CriterionKind::Angle3d, 0.0, 10.0);
        let a = hit(0, 1.0, 0.0, 10.0);
        let err = c.value(&[a], &[a]).unwrap_err();
        assert_eq!(
            err,
            CriterionError::BadSegmentLength {
                expected: 2,
                got: (1, 1)
            }
        );
    }

    #[test]
    fn set_is_a_short_circuit_conjunction() {
        let outer = hit(0, 20.0, 0.0, 200.0);
        let inner = hit(1, 10.0, 0.0, 100.0);

        let mut set = CriteriaSet::new();
        assert!(set.accepts(&[outer], &[inner], None));

        set.push(GeometricCriterion::new(CriterionKind::StraightTrackRatio, 0.9, 1.1));
        assert!(set.accepts(&[outer], &[inner], None));

        set.push(GeometricCriterion::new(CriterionKind::DeltaRho, 50.0, 60.0));
        let mut rec = CriteriaRecorder::new();
        assert!(!set.accepts(&[outer], &[inner], Some(&mut rec)));
        assert_eq!(rec.n_samples("Crit2_StraightTrackRatio"), 1);
        assert_eq!(rec.n_samples("Crit2_DeltaRho"), 1);

        // First criterion rejects, second is never evaluated.
        let far = hit(2, 0.0, 80.0, 200.0);
        let mut rec = CriteriaRecorder::new();
        assert!(!set.accepts(&[far], &[inner], Some(&mut rec)));
        assert_eq!(rec.n_samples("Crit2_DeltaRho"), 0);
    }

    #[test]
    fn config_skips_inactive_and_unknown_entries() {
        let entries = vec![
            CriterionConfig::new(CriterionKind::RzRatio, 0.9, 1.3),
            CriterionConfig {
                name: "Crit2_DeltaPhi".into(),
                min: 0.0,
                max: 5.0,
                active: false,
            },
            CriterionConfig {
                name: "Crit2_Nonsense".into(),
                min: 0.0,
                max: 1.0,
                active: true,
            },
        ];
        let set = CriteriaSet::from_config(&entries, 5.0);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Crit2_RZRatio"]);
    }
}
