use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    clamp_percent, finite_or_zero, requirement_gauge, resolve, CatalogueItem, Counter, CounterId, Entity,
    EntityId, Gauge, IdListType, ItemId, ReferenceTables,
};

const LEGACY_CATEGORY: &str = "LEGACY";
const MASTER_POINTS: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BoardSort {
    Name,
    #[default]
    Progress,
}

impl BoardSort {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Progress => "progress",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Orient an ascending comparison.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct BoardFilter {
    /// Case-insensitive substring over name and description.
    pub search: String,
    pub hide_legacy: bool,
    pub hide_capstone: bool,
    /// Hide counters worth at least 100 points or already at their next target.
    pub hide_masters: bool,
    pub sort: BoardSort,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParentProgress {
    pub counter_id: CounterId,
    pub name: String,
    pub tier: String,
    pub current: f64,
    pub target: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardEntry {
    pub counter_id: CounterId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub current_tier: String,
    pub tier_index: Option<usize>,
    pub current: f64,
    pub next_threshold: f64,
    pub percent: f64,
    pub points_awarded: u32,
    pub is_capstone: bool,
    pub parent: Option<ParentProgress>,
}

/// Board target: next tier, then the requirement tier, then the current tier, then the
/// counter's own value.
fn board_target(counter: &Counter, tables: &ReferenceTables) -> f64 {
    let resolution = resolve(counter, &tables.tier_sequence);
    counter
        .threshold(&resolution.next_tier)
        .or_else(|| counter.threshold(&tables.requirement_tier))
        .or_else(|| counter.threshold(&counter.current_tier))
        .unwrap_or_else(|| finite_or_zero(counter.current_value))
}

fn percent_of(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 100.0;
    }
    clamp_percent(current / target * 100.0)
}

fn matches_search(counter: &Counter, needle: &str) -> bool {
    needle.is_empty()
        || counter.name.to_lowercase().contains(needle)
        || counter.description.to_lowercase().contains(needle)
}

fn is_listed(counter: &Counter, filter: &BoardFilter, needle: &str) -> bool {
    if filter.hide_legacy && counter.category == LEGACY_CATEGORY {
        return false;
    }
    if filter.hide_capstone && counter.is_capstone {
        return false;
    }
    matches_search(counter, needle)
}

/// Still below master-level points and short of its next target.
fn is_open(entry: &BoardEntry) -> bool {
    entry.points_awarded < MASTER_POINTS && entry.current < entry.next_threshold
}

fn cmp_progress(lhs: &BoardEntry, rhs: &BoardEntry) -> Ordering {
    if lhs.percent >= 100.0 && rhs.percent >= 100.0 {
        return lhs.tier_index.cmp(&rhs.tier_index).then_with(|| lhs.percent.total_cmp(&rhs.percent));
    }
    lhs.percent.total_cmp(&rhs.percent).then_with(|| lhs.tier_index.cmp(&rhs.tier_index))
}

/// Filtered, sorted challenge board with parent progress attached.
#[must_use]
pub fn challenge_board(counters: &[Counter], tables: &ReferenceTables, filter: &BoardFilter) -> Vec<BoardEntry> {
    let by_id = counters.iter().map(|counter| (counter.id, counter)).collect::<BTreeMap<_, _>>();
    let needle = filter.search.trim().to_lowercase();

    let mut entries = counters
        .iter()
        .filter(|counter| is_listed(counter, filter, &needle))
        .map(|counter| {
            let current = finite_or_zero(counter.current_value);
            let next_threshold = board_target(counter, tables);
            let parent = counter.parent_id.and_then(|parent_id| by_id.get(&parent_id)).map(|parent| {
                let target = board_target(parent, tables);
                let parent_current = finite_or_zero(parent.current_value);
                ParentProgress {
                    counter_id: parent.id,
                    name: parent.name.clone(),
                    tier: parent.current_tier.clone(),
                    current: parent_current,
                    target,
                    percent: percent_of(parent_current, target),
                }
            });
            BoardEntry {
                counter_id: counter.id,
                name: counter.name.clone(),
                description: counter.description.clone(),
                category: counter.category.clone(),
                current_tier: counter.current_tier.clone(),
                tier_index: tables.tier_index(&counter.current_tier),
                current,
                next_threshold,
                percent: percent_of(current, next_threshold),
                points_awarded: counter.points_awarded,
                is_capstone: counter.is_capstone,
                parent,
            }
        })
        .filter(|entry| !filter.hide_masters || is_open(entry))
        .collect::<Vec<_>>();

    entries.sort_by(|lhs, rhs| {
        let primary = match filter.sort {
            BoardSort::Name => lhs.name.cmp(&rhs.name),
            BoardSort::Progress => cmp_progress(lhs, rhs),
        };
        filter
            .direction
            .apply(primary)
            .then_with(|| lhs.name.cmp(&rhs.name))
            .then_with(|| lhs.counter_id.cmp(&rhs.counter_id))
    });
    entries
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassMasteryLine {
    pub class: String,
    pub level7: Option<Gauge>,
    pub level10: Option<Gauge>,
}

/// Per-class mastery gauges against the requirement tier. Missing counters stay `None`.
#[must_use]
pub fn class_mastery(counters: &[Counter], tables: &ReferenceTables) -> Vec<ClassMasteryLine> {
    let by_id = counters.iter().map(|counter| (counter.id, counter)).collect::<BTreeMap<_, _>>();
    let gauge = |counter_id: CounterId| {
        by_id
            .get(&counter_id)
            .map(|counter| requirement_gauge(counter, &tables.requirement_tier))
    };
    tables
        .class_mastery
        .iter()
        .map(|line| ClassMasteryLine {
            class: line.class.clone(),
            level7: gauge(line.level7),
            level10: gauge(line.level10),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct NamedId {
    pub id: u64,
    pub name: String,
}

/// A counter's completed and still-available ids, resolved to display names.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CounterMembers {
    pub counter_id: CounterId,
    pub name: String,
    pub id_list_type: IdListType,
    pub completed: Vec<NamedId>,
    pub available: Vec<NamedId>,
}

/// Resolve the counter's id lists by their list type, sorted by name then id.
///
/// Champion ids name entities, skin ids name catalogue items. Ids that resolve to
/// nothing, and ids of untyped lists, fall back to the number itself.
#[must_use]
pub fn counter_members(counter: &Counter, entities: &[Entity], catalogue: &[CatalogueItem]) -> CounterMembers {
    let entity_names = entities
        .iter()
        .map(|entity| (entity.id, entity.name.as_str()))
        .collect::<BTreeMap<_, _>>();
    let item_names = catalogue
        .iter()
        .map(|item| (item.id, item.name.as_str()))
        .collect::<BTreeMap<_, _>>();

    let resolve_names = |ids: &[EntityId]| {
        let mut named = ids
            .iter()
            .map(|entity_id| {
                let id = u64::from(entity_id.0);
                let name = match counter.id_list_type {
                    IdListType::Champion => entity_names.get(entity_id).copied(),
                    IdListType::ChampionSkin => item_names.get(&ItemId(id)).copied(),
                    IdListType::None => None,
                };
                NamedId { id, name: name.map_or_else(|| id.to_string(), ToString::to_string) }
            })
            .collect::<Vec<_>>();
        named.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name).then_with(|| lhs.id.cmp(&rhs.id)));
        named
    };

    CounterMembers {
        counter_id: counter.id,
        name: counter.name.clone(),
        id_list_type: counter.id_list_type,
        completed: resolve_names(&counter.completed_ids),
        available: resolve_names(&counter.eligible_ids),
    }
}
