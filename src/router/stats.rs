//! Router Statistics
//!
//! Dispatch outcome counters, reported when the router stops.

use std::collections::BTreeMap;

use serde::Serialize;

// == Router Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    /// Dispatches that got a matching reply
    pub answered: u64,
    /// Dispatches that timed out or hit an I/O error
    pub failed: u64,
    /// Ticks skipped because the probe did not get `UP`
    pub skipped: u64,
    /// How often each target was chosen
    pub selections: BTreeMap<String, u64>,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_selection(&mut self, target: &str) {
        *self.selections.entry(target.to_string()).or_insert(0) += 1;
    }

    pub fn record_answered(&mut self) {
        self.answered += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Every selection, whatever its outcome.
    pub fn total_dispatches(&self) -> u64 {
        self.selections.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = RouterStats::new();
        assert_eq!(stats.answered, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.total_dispatches(), 0);
    }

    #[test]
    fn test_selections_per_target() {
        let mut stats = RouterStats::new();
        stats.record_selection("a:1");
        stats.record_selection("b:2");
        stats.record_selection("a:1");

        assert_eq!(stats.selections["a:1"], 2);
        assert_eq!(stats.selections["b:2"], 1);
        assert_eq!(stats.total_dispatches(), 3);
    }

    #[test]
    fn test_serializes_as_json() {
        let mut stats = RouterStats::new();
        stats.record_answered();
        stats.record_selection("127.0.0.1:8080");

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["answered"], 1);
        assert_eq!(json["selections"]["127.0.0.1:8080"], 1);
    }
}
