//! Tracker configuration.
//!
//! Every section has defaults, so a JSON file only needs the values it
//! changes. Per-iteration overrides replace whole stage sections; stages an
//! override leaves out fall back to `default_iteration`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::criteria::{CriterionConfig, CriterionKind};
use crate::error::{ConfigError, TrackerError};
use crate::fit::FitterConfig;
use crate::hit::StationLayout;
use crate::refit::RefitConfig;
use crate::seed::SeedConfig;
use crate::selector::SubsetConfig;

/// How candidates are formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinderMode {
    /// Segment automaton plus subset selection.
    #[default]
    Combinatorial,
    /// Truth tracks become candidates directly (fitter validation).
    Truth,
}

/// Two-hit segment formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentBuilderConfig {
    pub criteria: Vec<CriterionConfig>,
    /// Number of inner stations a hit may link to.
    pub connector_distance: u32,
}

impl Default for SegmentBuilderConfig {
    fn default() -> Self {
        Self {
            criteria: vec![
                CriterionConfig::new(CriterionKind::RzRatio, 0.9, 1.27),
                CriterionConfig::new(CriterionKind::DeltaPhi, 0.0, 30.0),
                CriterionConfig::new(CriterionKind::StraightTrackRatio, 0.9, 1.1),
                CriterionConfig {
                    active: false,
                    ..CriterionConfig::new(CriterionKind::HelixWithIp, 0.9, 1.1)
                },
            ],
            connector_distance: 1,
        }
    }
}

/// Lengthening to three-hit segments and the automaton passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreeHitConfig {
    pub criteria: Vec<CriterionConfig>,
    pub do_automaton: bool,
    /// Only applies when `do_automaton` is set.
    pub clean_bad_states: bool,
}

impl Default for ThreeHitConfig {
    fn default() -> Self {
        Self {
            criteria: vec![
                CriterionConfig::new(CriterionKind::Angle3d, 0.0, 30.0),
                CriterionConfig::new(CriterionKind::Angle2d, 0.0, 30.0),
                CriterionConfig::new(CriterionKind::ChangeRzRatio, 0.8, 1.21),
                CriterionConfig {
                    active: false,
                    ..CriterionConfig::new(CriterionKind::Pt, 0.05, 100.0)
                },
                CriterionConfig {
                    active: false,
                    ..CriterionConfig::new(CriterionKind::IpCircleDist, 0.0, 5.0)
                },
            ],
            do_automaton: true,
            clean_bad_states: true,
        }
    }
}

/// Fully resolved settings of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationConfig {
    pub segment_builder: SegmentBuilderConfig,
    pub three_hit: ThreeHitConfig,
    pub subset: SubsetConfig,
}

/// Per-iteration override; missing sections use the default iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IterationOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_builder: Option<SegmentBuilderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_hit: Option<ThreeHitConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset: Option<SubsetConfig>,
}

/// Top-level tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub mode: FinderMode,
    pub n_iterations: usize,
    pub default_iteration: IterationConfig,
    /// Overrides keyed by iteration index.
    pub iterations: BTreeMap<usize, IterationOverride>,
    pub layout: StationLayout,
    pub seed: SeedConfig,
    pub fitter: FitterConfig,
    pub refit: RefitConfig,
    /// Record every criterion value for the criteria dump.
    pub save_criteria_values: bool,
    /// Base seed of the per-event selector random generator.
    pub rng_seed: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: FinderMode::Combinatorial,
            n_iterations: 1,
            default_iteration: IterationConfig::default(),
            iterations: BTreeMap::new(),
            layout: StationLayout::default(),
            seed: SeedConfig::default(),
            fitter: FitterConfig::default(),
            refit: RefitConfig::default(),
            save_criteria_values: false,
            rng_seed: 0x5eed,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, TrackerError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Parse and validate.
    pub fn from_json_str(data: &str) -> Result<Self, TrackerError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Settings of iteration `index` with overrides applied.
    pub fn iteration(&self, index: usize) -> IterationConfig {
        let base = &self.default_iteration;
        let Some(ov) = self.iterations.get(&index) else {
            return base.clone();
        };
        IterationConfig {
            segment_builder: ov
                .segment_builder
                .clone()
                .unwrap_or_else(|| base.segment_builder.clone()),
            three_hit: ov.three_hit.clone().unwrap_or_else(|| base.three_hit.clone()),
            subset: ov.subset.clone().unwrap_or_else(|| base.subset.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_iterations == 0 {
            return Err(out_of_range("n_iterations", 0.0));
        }
        for (&index, _) in self.iterations.range(self.n_iterations..) {
            tracing::warn!(index, n_iterations = self.n_iterations, "override for an iteration that never runs");
        }
        for index in 0..self.n_iterations {
            validate_iteration(&self.iteration(index), index)?;
        }

        let seed = &self.seed;
        if !(seed.min_radius >= 0.0) {
            return Err(out_of_range("seed.min_radius", seed.min_radius));
        }
        if !(seed.fallback_radius > 0.0) {
            return Err(out_of_range("seed.fallback_radius", seed.fallback_radius));
        }
        if !seed.field_scale.is_finite() || seed.field_scale == 0.0 {
            return Err(out_of_range("seed.field_scale", seed.field_scale));
        }
        if !(self.refit.max_delta_phi > 0.0) {
            return Err(out_of_range("refit.max_delta_phi", self.refit.max_delta_phi));
        }
        if !self.fitter.good_fit_min_pt.is_finite() {
            return Err(out_of_range("fitter.good_fit_min_pt", self.fitter.good_fit_min_pt));
        }
        Ok(())
    }
}

fn out_of_range(field: &str, value: f64) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        value,
    }
}

fn validate_windows(entries: &[CriterionConfig]) -> Result<(), ConfigError> {
    for c in entries {
        if !c.min.is_finite() || !c.max.is_finite() || c.min > c.max {
            return Err(ConfigError::InvalidWindow {
                name: c.name.clone(),
                min: c.min,
                max: c.max,
            });
        }
    }
    Ok(())
}

fn validate_iteration(it: &IterationConfig, index: usize) -> Result<(), ConfigError> {
    validate_windows(&it.segment_builder.criteria)?;
    validate_windows(&it.three_hit.criteria)?;

    let field = |name: &str| format!("iterations[{index}].subset.{name}");
    let s = &it.subset;
    if s.min_hits_on_track == 0 {
        return Err(ConfigError::OutOfRange {
            field: field("min_hits_on_track"),
            value: 0.0,
        });
    }
    if s.expected_max_hits == 0 {
        return Err(ConfigError::OutOfRange {
            field: field("expected_max_hits"),
            value: 0.0,
        });
    }
    if !(s.initial_temp > 0.0) {
        return Err(ConfigError::OutOfRange {
            field: field("initial_temp"),
            value: s.initial_temp,
        });
    }
    if !(s.inf_temp > 0.0) {
        return Err(ConfigError::OutOfRange {
            field: field("inf_temp"),
            value: s.inf_temp,
        });
    }
    if !(0.0..=1.0).contains(&s.omega) {
        return Err(ConfigError::OutOfRange {
            field: field("omega"),
            value: s.omega,
        });
    }
    if !(s.activation_threshold > 0.0 && s.activation_threshold < 1.0) {
        return Err(ConfigError::OutOfRange {
            field: field("activation_threshold"),
            value: s.activation_threshold,
        });
    }
    if !(s.stable_threshold > 0.0) {
        return Err(ConfigError::OutOfRange {
            field: field("stable_threshold"),
            value: s.stable_threshold,
        });
    }
    Ok(())
}
