//! Event hit sources.
//!
//! Event files follow `fwdtrack.events.v1`: a list of events, each holding raw
//! hits (with detector volume ids), optional supplementary-plane hits and
//! optional truth tracks. Raw volume ids are mapped to sectors through the
//! [`StationLayout`] when an event is loaded.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TrackerError};
use crate::hit::{Hit, HitPool, McTrack, StationLayout};
use crate::refit::SupplementaryHits;

pub const EVENTS_SCHEMA_V1: &str = "fwdtrack.events.v1";

/// Supplies hits and truth information per event.
pub trait HitSource {
    fn n_events(&self) -> usize;

    /// Hits of the tracking stations, bucketed by sector.
    fn load(&self, event: u64) -> Result<HitPool, TrackerError>;

    /// Truth tracks keyed by id; empty when the source has no truth.
    fn truth_tracks(&self, event: u64) -> Result<BTreeMap<i32, McTrack>, TrackerError>;

    /// Hits of the supplementary planes used by the refit pass.
    fn load_supplementary(&self, event: u64) -> Result<SupplementaryHits, TrackerError>;
}

/// Raw station hit as stored in an event file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHit {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Detector volume id; non-positive ids are sign-tagged.
    pub volume: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truth: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cov: Option<[[f64; 2]; 2]>,
}

/// Raw supplementary-plane hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPlaneHit {
    pub plane: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truth: Option<i32>,
}

/// Truth track as stored in an event file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTruthTrack {
    pub id: i32,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub charge: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventRecord {
    #[serde(default)]
    pub hits: Vec<RawHit>,
    #[serde(default)]
    pub supplementary: Vec<RawPlaneHit>,
    #[serde(default)]
    pub truth_tracks: Vec<RawTruthTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventFileSpecV1 {
    schema_version: String,
    events: Vec<EventRecord>,
}

/// Hit source backed by an `fwdtrack.events.v1` document.
#[derive(Debug, Clone)]
pub struct EventFileSource {
    events: Vec<EventRecord>,
    layout: StationLayout,
}

impl EventFileSource {
    /// In-memory source.
    pub fn new(events: Vec<EventRecord>, layout: StationLayout) -> Self {
        Self { events, layout }
    }

    pub fn from_json_file(path: &Path, layout: StationLayout) -> Result<Self, TrackerError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data, layout)
    }

    pub fn from_json_str(data: &str, layout: StationLayout) -> Result<Self, TrackerError> {
        let spec: EventFileSpecV1 = serde_json::from_str(data)?;
        if spec.schema_version != EVENTS_SCHEMA_V1 {
            return Err(ConfigError::UnsupportedSchema {
                found: spec.schema_version,
                expected: EVENTS_SCHEMA_V1,
            }
            .into());
        }
        Ok(Self::new(spec.events, layout))
    }

    /// Serialize events back to a versioned document.
    pub fn to_json_string(&self) -> Result<String, TrackerError> {
        let spec = EventFileSpecV1 {
            schema_version: EVENTS_SCHEMA_V1.to_string(),
            events: self.events.clone(),
        };
        Ok(serde_json::to_string_pretty(&spec)?)
    }

    fn record(&self, event: u64) -> Result<&EventRecord, TrackerError> {
        usize::try_from(event)
            .ok()
            .and_then(|i| self.events.get(i))
            .ok_or(TrackerError::UnknownEvent(event))
    }

    /// Station hits with their file-order ids; hits whose volume id the
    /// layout cannot resolve are dropped with a warning.
    fn station_hits(&self, record: &EventRecord) -> Vec<Hit> {
        let mut hits = Vec::with_capacity(record.hits.len());
        for (i, raw) in record.hits.iter().enumerate() {
            let Some(station) = self.layout.resolve(raw.volume) else {
                tracing::warn!(volume = raw.volume, hit = i, "volume id not resolvable by the layout, skipping hit");
                continue;
            };
            let mut hit = Hit::new(i as u32, [raw.x, raw.y, raw.z], station.sector, station.volume)
                .with_truth(raw.truth.unwrap_or(0));
            if let Some(cov) = raw.cov {
                hit = hit.with_covariance(cov);
            }
            hits.push(hit);
        }
        hits
    }
}

impl HitSource for EventFileSource {
    fn n_events(&self) -> usize {
        self.events.len()
    }

    fn load(&self, event: u64) -> Result<HitPool, TrackerError> {
        let record = self.record(event)?;
        let pool = HitPool::from_hits(self.station_hits(record));
        tracing::debug!(event, n_hits = pool.n_hits(), "event hits loaded");
        Ok(pool)
    }

    fn truth_tracks(&self, event: u64) -> Result<BTreeMap<i32, McTrack>, TrackerError> {
        let record = self.record(event)?;
        let mut tracks: BTreeMap<i32, McTrack> = record
            .truth_tracks
            .iter()
            .map(|t| {
                let track = McTrack {
                    id: t.id,
                    pt: t.pt,
                    eta: t.eta,
                    phi: t.phi,
                    charge: t.charge,
                    start_vertex: t.vertex,
                    hit_ids: Vec::new(),
                };
                (t.id, track)
            })
            .collect();
        for hit in self.station_hits(record) {
            if let Some(track) = hit.truth_id.and_then(|id| tracks.get_mut(&id)) {
                track.hit_ids.push(hit.id);
            }
        }
        Ok(tracks)
    }

    fn load_supplementary(&self, event: u64) -> Result<SupplementaryHits, TrackerError> {
        let record = self.record(event)?;
        let offset = record.hits.len();
        let mut out = SupplementaryHits::default();
        for (j, raw) in record.supplementary.iter().enumerate() {
            let hit = Hit::new((offset + j) as u32, [raw.x, raw.y, raw.z], raw.plane as i32, 0)
                .with_truth(raw.truth.unwrap_or(0));
            out.insert(raw.plane, hit);
        }
        Ok(out)
    }
}

// ── In-memory source ───────────────────────────────────────────────────────

/// One event of a [`MemorySource`], with hits already resolved to sectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryEvent {
    pub hits: Vec<Hit>,
    pub supplementary: SupplementaryHits,
    /// Truth tracks; `hit_ids` are filled from the hits when loaded.
    pub truth: BTreeMap<i32, McTrack>,
}

impl MemoryEvent {
    pub fn from_hits(hits: Vec<Hit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }
}

/// Hit source over events built in code (tests, benches, demos).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    events: Vec<MemoryEvent>,
}

impl MemorySource {
    pub fn new(events: Vec<MemoryEvent>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: MemoryEvent) {
        self.events.push(event);
    }

    fn event(&self, event: u64) -> Result<&MemoryEvent, TrackerError> {
        usize::try_from(event)
            .ok()
            .and_then(|i| self.events.get(i))
            .ok_or(TrackerError::UnknownEvent(event))
    }
}

impl HitSource for MemorySource {
    fn n_events(&self) -> usize {
        self.events.len()
    }

    fn load(&self, event: u64) -> Result<HitPool, TrackerError> {
        Ok(HitPool::from_hits(self.event(event)?.hits.iter().copied()))
    }

    fn truth_tracks(&self, event: u64) -> Result<BTreeMap<i32, McTrack>, TrackerError> {
        let ev = self.event(event)?;
        let mut tracks = ev.truth.clone();
        for track in tracks.values_mut() {
            track.hit_ids.clear();
        }
        for hit in &ev.hits {
            if let Some(track) = hit.truth_id.and_then(|id| tracks.get_mut(&id)) {
                track.hit_ids.push(hit.id);
            }
        }
        Ok(tracks)
    }

    fn load_supplementary(&self, event: u64) -> Result<SupplementaryHits, TrackerError> {
        Ok(self.event(event)?.supplementary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "schema_version": "fwdtrack.events.v1",
        "events": [
            {
                "hits": [
                    {"x": 1.0, "y": 0.0, "z": 93.3, "volume": 5, "truth": 3},
                    {"x": 2.0, "y": 0.0, "z": 280.9, "volume": 9, "truth": 3},
                    {"x": 2.5, "y": 0.0, "z": 303.7, "volume": 40},
                    {"x": 0.5, "y": 0.5, "z": 140.0, "volume": -2,
                     "cov": [[0.01, 0.0], [0.0, 0.02]]}
                ],
                "supplementary": [
                    {"plane": 1, "x": 1.4, "y": 0.0, "z": 140.0, "truth": 3}
                ],
                "truth_tracks": [
                    {"id": 3, "pt": 0.4, "eta": 3.1, "phi": 0.0, "charge": -1, "vertex": 1}
                ]
            },
            {}
        ]
    }"#;

    #[test]
    fn loads_and_maps_volumes_to_sectors() {
        let src = EventFileSource::from_json_str(DOC, StationLayout::default()).expect("parse");
        assert_eq!(src.n_events(), 2);

        let pool = src.load(0).expect("event 0");
        // Volume 40 is outside the table.
        assert_eq!(pool.n_hits(), 3);
        assert_eq!(pool.hits_in(1)[0].id, 0);
        assert_eq!(pool.hits_in(3)[0].volume, 9);
        let tagged = pool.hits_in(2)[0];
        assert_eq!(tagged.volume, 11);
        assert!(tagged.covariance.is_some());

        assert!(src.load(1).expect("event 1").is_empty());
        assert!(matches!(src.load(2), Err(TrackerError::UnknownEvent(2))));
    }

    #[test]
    fn truth_tracks_collect_their_hits() {
        let src = EventFileSource::from_json_str(DOC, StationLayout::default()).expect("parse");
        let truth = src.truth_tracks(0).expect("truth");
        assert_eq!(truth[&3].hit_ids, vec![0, 1]);
        assert_eq!(truth[&3].start_vertex, Some(1));

        let supp = src.load_supplementary(0).expect("supplementary");
        assert_eq!(supp.on_plane(1).len(), 1);
        assert_eq!(supp.on_plane(1)[0].id, 4);
        assert!(supp.on_plane(0).is_empty());
    }

    #[test]
    fn rejects_other_schema_versions() {
        let doc = r#"{"schema_version": "fwdtrack.events.v0", "events": []}"#;
        let err = EventFileSource::from_json_str(doc, StationLayout::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported schema"));
    }

    #[test]
    fn overflowing_volume_id_is_skipped() {
        let doc = r#"{
            "schema_version": "fwdtrack.events.v1",
            "events": [{"hits": [
                {"x": 1.0, "y": 0.0, "z": 93.3, "volume": -2147483648},
                {"x": 1.0, "y": 0.0, "z": 93.3, "volume": 5}
            ]}]
        }"#;
        let src = EventFileSource::from_json_str(doc, StationLayout::default()).expect("parse");
        let pool = src.load(0).expect("event 0");
        assert_eq!(pool.n_hits(), 1);
        assert_eq!(pool.hits_in(1)[0].id, 1);
    }

    #[test]
    fn document_round_trips() {
        let src = EventFileSource::from_json_str(DOC, StationLayout::default()).expect("parse");
        let text = src.to_json_string().expect("serialize");
        let again = EventFileSource::from_json_str(&text, StationLayout::default()).expect("reparse");
        assert_eq!(again.n_events(), 2);
        assert_eq!(again.load(0).expect("event").n_hits(), 3);
    }

    #[test]
    fn memory_source_fills_truth_hit_ids() {
        let hits = vec![
            Hit::new(0, [1.0, 0.0, 93.3], 1, 6).with_truth(2),
            Hit::new(1, [2.0, 0.0, 140.0], 2, 7).with_truth(2),
            Hit::new(2, [0.0, 3.0, 140.0], 2, 7),
        ];
        let mut event = MemoryEvent::from_hits(hits);
        event.truth.insert(
            2,
            McTrack {
                id: 2,
                pt: 1.0,
                eta: 3.0,
                phi: 0.0,
                charge: 1,
                start_vertex: None,
                hit_ids: vec![99],
            },
        );
        let src = MemorySource::new(vec![event]);
        assert_eq!(src.load(0).expect("pool").n_hits(), 3);
        assert_eq!(src.truth_tracks(0).expect("truth")[&2].hit_ids, vec![0, 1]);
        assert!(src.load_supplementary(0).expect("supplementary").is_empty());
        assert!(matches!(src.load(1), Err(TrackerError::UnknownEvent(1))));
    }
}
