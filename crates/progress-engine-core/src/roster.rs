//! Per-entity views: the mastery roster and the detail card.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::matches_archetypes;
use crate::{
    categories_for, count_to_u32, group_rules, level_progress, mean_of_series, series_view, summarize,
    CatalogueItem, Counter, CounterId, Entity, EntityId, ProgressionIndex, ProgressionRecord,
    ReferenceTables, Series, SeriesView, SortDirection,
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MasterySort {
    #[default]
    Level,
    Points,
}

impl MasterySort {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::Points => "points",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "level" => Some(Self::Level),
            "points" => Some(Self::Points),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct RosterFilter {
    /// Case-insensitive substring over the entity name.
    pub search: String,
    /// Keep entities carrying any of these archetypes; empty keeps everyone.
    pub archetypes: Vec<String>,
    pub sort: MasterySort,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasteryRow {
    pub entity_id: EntityId,
    pub name: String,
    pub archetypes: Vec<String>,
    pub level: u32,
    pub points: i64,
    pub points_since_last_level: i64,
    pub points_until_next_level: i64,
    pub level_progress: f64,
    pub is_max_level: bool,
}

impl MasteryRow {
    fn new(entity_id: EntityId, entity: Option<&Entity>, record: &ProgressionRecord) -> Self {
        Self {
            entity_id,
            name: entity.map_or_else(String::new, |entity| entity.name.clone()),
            archetypes: entity.map_or_else(Vec::new, |entity| entity.archetypes.clone()),
            level: record.level,
            points: record.points,
            points_since_last_level: record.points_since_last_level,
            points_until_next_level: record.points_until_next_level,
            level_progress: level_progress(record),
            is_max_level: record.is_max_level(),
        }
    }
}

/// Every known entity with its mastery record, filtered and sorted.
///
/// The chosen sort key is compared first and the other key second, both in `direction`.
/// Name and id break any remaining tie.
#[must_use]
pub fn mastery_table(entities: &[Entity], index: &ProgressionIndex, filter: &RosterFilter) -> Vec<MasteryRow> {
    let by_id = entities.iter().map(|entity| (entity.id, entity)).collect::<BTreeMap<_, _>>();
    let needle = filter.search.trim().to_lowercase();

    let mut rows = index
        .roster()
        .map(|entity_id| MasteryRow::new(entity_id, by_id.get(&entity_id).copied(), &index.record(entity_id)))
        .filter(|row| needle.is_empty() || row.name.to_lowercase().contains(&needle))
        .filter(|row| matches_archetypes(by_id.get(&row.entity_id).copied(), &filter.archetypes))
        .collect::<Vec<_>>();

    rows.sort_by(|lhs, rhs| {
        let by_level = lhs.level.cmp(&rhs.level);
        let by_points = lhs.points.cmp(&rhs.points);
        let keys = match filter.sort {
            MasterySort::Level => by_level.then(by_points),
            MasterySort::Points => by_points.then(by_level),
        };
        filter
            .direction
            .apply(keys)
            .then_with(|| lhs.name.cmp(&rhs.name))
            .then_with(|| lhs.entity_id.cmp(&rhs.entity_id))
    });
    rows
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TrackedChallenge {
    pub counter_id: CounterId,
    pub name: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct GroupMembership {
    pub group: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDetail {
    pub mastery: MasteryRow,
    pub series: Vec<SeriesView>,
    pub series_progress: Option<f64>,
    pub items_owned: u32,
    pub items_total: u32,
    pub challenges: Vec<TrackedChallenge>,
    pub challenges_completed: u32,
    /// Share of the listed challenges completed by this entity; 0 when none are listed.
    pub challenge_percent: f64,
    pub groups: Vec<GroupMembership>,
}

/// Everything the detail card shows for one entity.
///
/// Tracked challenges absent from `counters` are skipped. Groups are the capstone groups
/// present in `counters`, each listing the member counters whose population includes
/// the entity.
#[must_use]
pub fn entity_detail(
    entity: &Entity,
    record: &ProgressionRecord,
    counters: &[Counter],
    series: &[Series],
    catalogue: &[CatalogueItem],
    tables: &ReferenceTables,
) -> EntityDetail {
    let mut views = series
        .iter()
        .filter(|entry| entry.owner_id == entity.id)
        .map(|entry| series_view(entry, tables.milestone_sum_len))
        .collect::<Vec<_>>();
    views.sort_by(|lhs, rhs| lhs.slot.cmp(&rhs.slot).then_with(|| lhs.name.cmp(&rhs.name)));

    let items = summarize(catalogue, |item| item.owner_id).remove(&entity.id).unwrap_or_default();

    let by_id = counters.iter().map(|counter| (counter.id, counter)).collect::<BTreeMap<_, _>>();
    let challenges = tables
        .tracked_challenges
        .iter()
        .filter_map(|counter_id| by_id.get(counter_id))
        .map(|counter| TrackedChallenge {
            counter_id: counter.id,
            name: counter.name.clone(),
            completed: counter.has_completed(entity.id),
        })
        .collect::<Vec<_>>();
    let challenges_completed = count_to_u32(challenges.iter().filter(|challenge| challenge.completed).count());
    let challenge_percent = if challenges.is_empty() {
        0.0
    } else {
        f64::from(challenges_completed) / f64::from(count_to_u32(challenges.len())) * 100.0
    };

    let group_names = counters
        .iter()
        .filter_map(|counter| counter.capstone_group.as_deref())
        .collect::<BTreeSet<_>>();
    let groups = group_names
        .into_iter()
        .map(|group| GroupMembership {
            group: group.to_string(),
            members: categories_for(entity, &group_rules(counters, group)),
        })
        .collect();

    EntityDetail {
        mastery: MasteryRow::new(entity.id, Some(entity), record),
        series_progress: mean_of_series(&views),
        series: views,
        items_owned: items.owned,
        items_total: items.total(),
        challenges,
        challenges_completed,
        challenge_percent,
        groups,
    }
}
