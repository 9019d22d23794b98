//! Pure progression analytics over one immutable snapshot of player records.
//!
//! Every public computation here is total: malformed or missing input degrades to a
//! documented default instead of an error. [`EngineError`] is only produced by the
//! explicit `validate` helpers that callers opt into.

mod aggregate;
mod board;
mod classify;
mod memo;
mod model;
mod overlap;
mod recommend;
mod roster;
mod snapshot;
mod tables;
mod threshold;

pub use aggregate::{
    aggregate, entity_rollups, item_percent, level_progress, mean_of_series, mean_percent,
    ratio_of_sums, series_table, series_view, EntitySeriesRollup, SeriesFilter, SeriesProgress,
    SeriesSlot, SeriesSort, SeriesView, SubItemView,
};
pub use board::{
    challenge_board, class_mastery, counter_members, BoardEntry, BoardFilter, BoardSort,
    ClassMasteryLine, CounterMembers, NamedId, ParentProgress, SortDirection,
};
pub use classify::{
    categories_for, classify, classify_all, group_rules, team_pool, CategoryRule,
    Classification, EntityCategory, Predicate, TeamCandidate,
};
pub use memo::VersionedMemo;
pub use model::{
    CatalogueItem, Counter, CounterId, Entity, EntityId, IdListType, ItemId, ProgressionRecord,
    Rarity, Series, SubItem,
};
pub use overlap::{
    collection_summary, count_groups, overlap_table, queue_contribution, summarize,
    CollectionKey, CollectionLine, OverlapRow, OverlapSort, OverlapSummary, ProjectedCount,
};
pub use recommend::{
    candidate_cost, default_recommendation_tie_breakers, recommend, CandidateCost,
    EligibilityPolicy, LevelThresholdPolicy, ProgressionIndex, Recommendation,
    RecommendationOutcome, RecommendationReport,
};
pub use roster::{
    entity_detail, mastery_table, EntityDetail, GroupMembership, MasteryRow, MasterySort,
    RosterFilter, TrackedChallenge,
};
pub use snapshot::{Snapshot, SnapshotVersion};
pub use tables::{
    ClassMasteryCounters, CollectionCounterIds, LevelCostTable, QualifyingLevel,
    ReferenceTables, DEFAULT_MILESTONE_SUM_LEN, DEFAULT_REQUIREMENT_TIER, DEFAULT_TIER_SEQUENCE,
    DEFAULT_TRACKED_CHALLENGES,
};
pub use threshold::{
    progress_percent, requirement_gauge, resolve, span, Gauge, ResolutionStatus, TierResolution,
};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("config error: {0}")]
    Config(String),
}

/// Clamp a percentage into `[0, 100]`, mapping non-finite values to 0.
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Round a non-negative amount up to a whole count. Non-finite and negative values are 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ceil_to_u32(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let ceiled = value.ceil();
    if ceiled >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    ceiled as u32
}

/// Saturating `usize` to `u32` conversion for collection sizes.
#[must_use]
pub fn count_to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_percent_bounds_and_nan() {
        assert!((clamp_percent(150.0) - 100.0).abs() < f64::EPSILON);
        assert!(clamp_percent(-3.0).abs() < f64::EPSILON);
        assert!(clamp_percent(f64::NAN).abs() < f64::EPSILON);
        assert!((clamp_percent(42.5) - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ceil_to_u32_rounds_up_and_saturates() {
        assert_eq!(ceil_to_u32(3.0), 3);
        assert_eq!(ceil_to_u32(2.01), 3);
        assert_eq!(ceil_to_u32(0.0), 0);
        assert_eq!(ceil_to_u32(-4.5), 0);
        assert_eq!(ceil_to_u32(f64::INFINITY), 0);
        assert_eq!(ceil_to_u32(1e20), u32::MAX);
    }
}
