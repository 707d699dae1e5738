use chrono::{DateTime, Utc};

use crate::models::{Anchor, AnchorKind};

pub const DEFAULT_CONFIDENCE_CAP: f64 = 0.65;

/// Static mapping from anchor kind to confidence increment, plus the
/// aggregate ceiling. The cap applies to the SUM of increments, never
/// to a single increment.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceTable {
    cap: f64,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self {
            cap: DEFAULT_CONFIDENCE_CAP,
        }
    }
}

impl ConfidenceTable {
    #[must_use]
    pub fn new(cap: f64) -> Self {
        Self { cap }
    }

    #[must_use]
    pub fn increment(self, kind: AnchorKind) -> f64 {
        match kind {
            AnchorKind::Geofence => 0.15,
            AnchorKind::GeofenceExit => 0.15,
            AnchorKind::Nfc => 0.25,
            AnchorKind::NfcExit => 0.15,
            AnchorKind::WifiBssid => 0.10,
        }
    }

    #[must_use]
    pub fn anchor(self, kind: AnchorKind, observed_at: DateTime<Utc>) -> Anchor {
        Anchor {
            kind,
            confidence_increment: self.increment(kind),
            observed_at,
        }
    }

    /// Capped sum over the current anchor set. Confidence is always
    /// re-derived from here, never mutated in place.
    #[must_use]
    pub fn aggregate(self, anchors: &[Anchor]) -> f64 {
        let sum: f64 = anchors
            .iter()
            .map(|anchor| anchor.confidence_increment)
            .sum();
        sum.min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors_of(kinds: &[AnchorKind]) -> Vec<Anchor> {
        let table = ConfidenceTable::default();
        kinds
            .iter()
            .map(|kind| table.anchor(*kind, Utc::now()))
            .collect()
    }

    #[test]
    fn aggregate_is_plain_sum_below_cap() {
        let table = ConfidenceTable::default();
        let anchors = anchors_of(&[AnchorKind::Geofence, AnchorKind::Nfc]);
        assert!((table.aggregate(&anchors) - 0.40).abs() < 1e-9);
    }

    #[test]
    fn aggregate_caps_the_sum_not_each_increment() {
        let table = ConfidenceTable::default();
        let anchors = anchors_of(&[
            AnchorKind::Geofence,
            AnchorKind::Nfc,
            AnchorKind::WifiBssid,
            AnchorKind::NfcExit,
        ]);
        // 0.15 + 0.25 + 0.10 + 0.15 = 0.65 exactly at the ceiling
        assert!((table.aggregate(&anchors) - 0.65).abs() < 1e-9);

        let over = anchors_of(&[
            AnchorKind::Geofence,
            AnchorKind::GeofenceExit,
            AnchorKind::Nfc,
            AnchorKind::WifiBssid,
            AnchorKind::NfcExit,
        ]);
        assert!((table.aggregate(&over) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn custom_cap_is_honored() {
        let table = ConfidenceTable::new(0.30);
        let anchors = anchors_of(&[AnchorKind::Geofence, AnchorKind::Nfc]);
        assert!((table.aggregate(&anchors) - 0.30).abs() < 1e-9);
    }
}
