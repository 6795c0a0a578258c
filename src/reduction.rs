// src/reduction.rs
//! Replayable record of collapse operations.
//!
//! One record captures everything needed to reverse a single edge collapse.
//! The log serialises to compact JSON with short field names and must
//! round-trip losslessly; neighbour sets are stored as sorted lists so the
//! encoding is stable.

use serde::{Deserialize, Serialize};

use crate::vertex_graph::PolygonKey;

/// One reversible collapse, plus the triangle fan viewers animate during
/// level-of-detail playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionRecord {
    /// 1-based reduction iteration.
    #[serde(rename = "i")]
    pub iteration: u32,

    /// Name of the midpoint vertex the collapse created.
    #[serde(rename = "n")]
    pub midpoint: String,

    #[serde(rename = "l")]
    pub left: String,

    #[serde(rename = "lc")]
    pub left_coords: [f64; 3],

    /// Left endpoint's neighbours at collapse time, sorted.
    #[serde(rename = "ln")]
    pub left_neighbours: Vec<String>,

    #[serde(rename = "r")]
    pub right: String,

    #[serde(rename = "rc")]
    pub right_coords: [f64; 3],

    #[serde(rename = "rn")]
    pub right_neighbours: Vec<String>,

    /// Canonical triangles incident to either endpoint before the collapse.
    #[serde(rename = "polys")]
    pub polygons: Vec<PolygonKey>,
}

/// Ordered, append-only log of collapses. Non-empty means the owning model
/// is in its reduced state; a successful reproduce clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReductionLog {
    records: Vec<ReductionRecord>,
}

impl ReductionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ReductionRecord) {
        self.records.push(record);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReductionRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Compact JSON, suitable for embedding in a single OBJ comment.
    pub fn to_compact_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ReductionRecord {
        ReductionRecord {
            iteration: 1,
            midpoint: "m1".to_string(),
            left: "1".to_string(),
            left_coords: [0.0, 0.0, 0.0],
            left_neighbours: vec!["2".to_string(), "3".to_string()],
            right: "2".to_string(),
            right_coords: [1.0, 0.0, 0.0],
            right_neighbours: vec!["1".to_string(), "3".to_string()],
            polygons: vec![["1".to_string(), "2".to_string(), "3".to_string()]],
        }
    }

    #[test]
    fn test_record_uses_short_keys() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        for key in ["\"i\":", "\"n\":", "\"l\":", "\"lc\":", "\"ln\":", "\"r\":", "\"rc\":", "\"rn\":", "\"polys\":"] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
        assert!(!json.contains("iteration"));
        assert!(!json.contains("neighbours"));
    }

    #[test]
    fn test_log_round_trips_losslessly() {
        let mut log = ReductionLog::new();
        log.push(sample_record());
        let json = log.to_compact_json().unwrap();
        let restored = ReductionLog::from_json(&json).unwrap();
        assert_eq!(restored, log);
    }

    #[test]
    fn test_log_serialises_as_plain_array() {
        let mut log = ReductionLog::new();
        log.push(sample_record());
        let json = log.to_compact_json().unwrap();
        assert!(json.starts_with('['));
        assert!(json.ends_with(']'));
    }

    #[test]
    fn test_clear_empties_the_log() {
        let mut log = ReductionLog::new();
        log.push(sample_record());
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
    }
}
