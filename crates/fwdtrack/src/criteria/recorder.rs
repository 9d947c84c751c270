//! Recording of criterion values for cut tuning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hit::Hit;

pub const CRITERIA_DUMP_SCHEMA: &str = "fwdtrack.criteria.v1";

/// Values recorded for one criterion.
///
/// `truth_ids[i]` is the common truth id of the hits behind `values[i]`, or
/// `None` when the hits do not all come from one particle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionSamples {
    pub values: Vec<f64>,
    pub truth_ids: Vec<Option<i32>>,
}

/// Collects every computed criterion value while enabled.
#[derive(Debug, Clone, Default)]
pub struct CriteriaRecorder {
    samples: BTreeMap<String, CriterionSamples>,
}

impl CriteriaRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, value: f64, parent: &[Hit], child: &[Hit]) {
        let entry = self.samples.entry(name.to_string()).or_default();
        entry.values.push(value);
        entry.truth_ids.push(common_truth_id(parent.iter().chain(child)));
    }

    pub fn n_samples(&self, name: &str) -> usize {
        self.samples.get(name).map_or(0, |s| s.values.len())
    }

    /// Fold another recorder's samples into this one.
    pub fn merge(&mut self, other: CriteriaRecorder) {
        for (name, s) in other.samples {
            let entry = self.samples.entry(name).or_default();
            entry.values.extend(s.values);
            entry.truth_ids.extend(s.truth_ids);
        }
    }

    pub fn into_dump(self) -> CriteriaDump {
        CriteriaDump {
            schema_version: CRITERIA_DUMP_SCHEMA.to_string(),
            criteria: self.samples,
        }
    }
}

/// Serialized criteria values (`fwdtrack.criteria.v1`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaDump {
    pub schema_version: String,
    pub criteria: BTreeMap<String, CriterionSamples>,
}

impl CriteriaDump {
    /// Append the samples of another dump (e.g. the next event).
    pub fn merge(&mut self, other: CriteriaDump) {
        for (name, s) in other.criteria {
            let entry = self.criteria.entry(name).or_default();
            entry.values.extend(s.values);
            entry.truth_ids.extend(s.truth_ids);
        }
    }

    pub fn n_samples(&self) -> usize {
        self.criteria.values().map(|s| s.values.len()).sum()
    }
}

fn common_truth_id<'a>(mut hits: impl Iterator<Item = &'a Hit>) -> Option<i32> {
    let first = hits.next()?.truth_id?;
    hits.all(|h| h.truth_id == Some(first)).then_some(first)
}
