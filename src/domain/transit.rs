// ============================================================
// Layer 3 — Transit Domain Types
// ============================================================
// A transit is one observed dip in a star's brightness.
// Several transits can belong to the same star system, which
// is why splitting must happen per star, not per row.
//
// Example:
//   ra=291.93423, dec=48.141651  →  "291.93423_48.141651"
//   every transit sharing these coordinates shares the key.

use serde::{Deserialize, Serialize};

/// Identifies the star system a transit belongs to.
/// Only used to keep a system on one side of a split.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StarGroupKey(String);

impl StarGroupKey {
    /// Build the key from the raw coordinate strings.
    /// Falls back to the transit id when a coordinate is blank,
    /// so the row becomes a group of its own.
    pub fn from_coordinates(ra: Option<&str>, dec: Option<&str>, transit_id: &str) -> Self {
        match (ra.map(str::trim), dec.map(str::trim)) {
            (Some(ra), Some(dec)) if !ra.is_empty() && !dec.is_empty() => {
                Self(format!("{ra}_{dec}"))
            }
            _ => Self(format!("transit:{transit_id}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The scored outcome for a single input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub transit_id: String,
    /// "1" for planet, "0" for false positive
    pub prediction: String,
    /// Probability of the planet class, in [0, 1]
    pub confidence: f64,
}

impl PredictionResult {
    pub fn new(transit_id: impl Into<String>, is_planet: bool, confidence: f64) -> Self {
        Self {
            transit_id: transit_id.into(),
            prediction: if is_planet { "1" } else { "0" }.to_string(),
            confidence,
        }
    }

    pub fn is_planet(&self) -> bool {
        self.prediction == "1"
    }
}
