//! Sequenced snapshot storage.
//!
//! Every refresh request is stamped with a per-kind sequence number when it
//! is issued. A response only replaces the stored snapshot if its number is
//! higher than the last one applied, so a slow older response can never
//! overwrite a newer one regardless of completion order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::models::{ClusterPoint, StatisticsSnapshot, TopIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Clusters,
    Issues,
    Statistics,
}

impl SnapshotKind {
    pub const ALL: [SnapshotKind; 3] = [
        SnapshotKind::Clusters,
        SnapshotKind::Issues,
        SnapshotKind::Statistics,
    ];
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SnapshotKind::Clusters => "clusters",
            SnapshotKind::Issues => "issues",
            SnapshotKind::Statistics => "statistics",
        };
        f.write_str(name)
    }
}

/// A complete snapshot as delivered by one fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotPayload {
    Clusters(Vec<ClusterPoint>),
    Issues(Vec<TopIssue>),
    Statistics(StatisticsSnapshot),
}

impl SnapshotPayload {
    pub fn kind(&self) -> SnapshotKind {
        match self {
            SnapshotPayload::Clusters(_) => SnapshotKind::Clusters,
            SnapshotPayload::Issues(_) => SnapshotKind::Issues,
            SnapshotPayload::Statistics(_) => SnapshotKind::Statistics,
        }
    }
}

/// Hands out increasing sequence numbers for one snapshot kind.
#[derive(Debug, Default)]
pub struct Sequencer {
    last: u64,
}

impl Sequencer {
    pub fn next(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}

/// The latest applied snapshot of one kind.
#[derive(Debug, Default)]
pub struct SnapshotSlot<T> {
    value: T,
    applied_seq: Option<u64>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> SnapshotSlot<T> {
    /// Replaces the value wholesale if `seq` is newer than the last applied
    /// sequence. Returns whether it was applied.
    pub fn apply(&mut self, seq: u64, value: T) -> bool {
        if self.applied_seq.is_some_and(|applied| seq <= applied) {
            return false;
        }
        self.value = value;
        self.applied_seq = Some(seq);
        self.updated_at = Some(Utc::now());
        true
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn is_loaded(&self) -> bool {
        self.applied_seq.is_some()
    }

    pub fn applied_seq(&self) -> Option<u64> {
        self.applied_seq
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_sequence_replaces() {
        let mut slot: SnapshotSlot<Vec<u32>> = SnapshotSlot::default();
        assert!(!slot.is_loaded());

        assert!(slot.apply(1, vec![1]));
        assert!(slot.apply(2, vec![2, 2]));
        assert_eq!(slot.get(), &vec![2, 2]);
        assert_eq!(slot.applied_seq(), Some(2));
        assert!(slot.updated_at().is_some());
    }

    #[test]
    fn test_late_older_response_is_dropped() {
        let mut slot: SnapshotSlot<&str> = SnapshotSlot::default();
        assert!(slot.apply(5, "fresh"));
        assert!(!slot.apply(4, "stale"));
        assert!(!slot.apply(5, "duplicate"));
        assert_eq!(*slot.get(), "fresh");
    }

    #[test]
    fn test_gaps_are_allowed() {
        let mut slot: SnapshotSlot<u8> = SnapshotSlot::default();
        assert!(slot.apply(3, 3));
        assert!(slot.apply(9, 9));
        assert_eq!(*slot.get(), 9);
    }

    #[test]
    fn test_sequencer_is_monotonic() {
        let mut seq = Sequencer::default();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
    }

    #[test]
    fn test_payload_kind_and_display() {
        assert_eq!(
            SnapshotPayload::Statistics(StatisticsSnapshot::default()).kind(),
            SnapshotKind::Statistics
        );
        assert_eq!(SnapshotKind::Clusters.to_string(), "clusters");
    }
}
