use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CatalogueItem, Counter, Entity, ProgressionRecord, ReferenceTables, Series};

/// Monotonically increasing snapshot counter assigned by the producer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct SnapshotVersion(pub u64);

impl Display for SnapshotVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Everything one recomputation pass reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: SnapshotVersion,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
    #[serde(default)]
    pub counters: Vec<Counter>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub progression: Vec<ProgressionRecord>,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub catalogue: Vec<CatalogueItem>,
}

impl Snapshot {
    #[must_use]
    pub fn empty(version: SnapshotVersion, captured_at: OffsetDateTime) -> Self {
        Self {
            version,
            captured_at,
            counters: Vec::new(),
            entities: Vec::new(),
            progression: Vec::new(),
            series: Vec::new(),
            catalogue: Vec::new(),
        }
    }

    /// Every record-level invariant violation, in input order. The engine tolerates all
    /// of them; callers decide whether to surface them.
    #[must_use]
    pub fn validation_issues(&self, tables: &ReferenceTables) -> Vec<String> {
        let counter_issues = self
            .counters
            .iter()
            .filter_map(|counter| counter.validate(&tables.tier_sequence).err());
        let record_issues = self.progression.iter().filter_map(|record| record.validate().err());
        counter_issues.chain(record_issues).map(|err| err.to_string()).collect()
    }
}
