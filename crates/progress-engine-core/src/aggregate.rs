use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    clamp_percent, count_to_u32, finite_or_zero, Entity, EntityId, ProgressionRecord, Series, SortDirection,
    SubItem,
};

/// `current / target` as a percentage capped at 100; 0 when there is no target.
#[must_use]
pub fn item_percent(current: f64, target: f64) -> f64 {
    if target.is_nan() || target <= 0.0 {
        return 0.0;
    }
    clamp_percent(finite_or_zero(current) / target * 100.0)
}

/// Unweighted mean of percentages. An empty slice is 0.
#[must_use]
pub fn mean_percent(percents: &[f64]) -> f64 {
    if percents.is_empty() {
        return 0.0;
    }
    let sum: f64 = percents.iter().copied().map(clamp_percent).sum();
    clamp_percent(sum / f64::from(count_to_u32(percents.len())))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeriesProgress {
    NotOwned,
    Owned { percent: f64 },
}

impl SeriesProgress {
    #[must_use]
    pub fn percent(self) -> Option<f64> {
        match self {
            Self::NotOwned => None,
            Self::Owned { percent } => Some(percent),
        }
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.percent().is_some_and(|percent| percent >= 100.0)
    }
}

/// Fold a series into one progress value.
///
/// Ownership decides between "not owned" and a percentage; an owned series without items
/// is 0%.
#[must_use]
pub fn aggregate(series: &Series, milestone_sum_len: usize) -> SeriesProgress {
    if series.owned_count == 0 {
        return SeriesProgress::NotOwned;
    }
    let percents = series
        .items
        .iter()
        .map(|item| item_percent(item.current_value, item.target(milestone_sum_len)))
        .collect::<Vec<_>>();
    SeriesProgress::Owned { percent: mean_percent(&percents) }
}

/// Display slot a series occupies on the entity row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSlot {
    Starter,
    Series1,
    Series2,
}

impl SeriesSlot {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.contains('1') {
            Self::Series1
        } else if name.contains('2') {
            Self::Series2
        } else {
            Self::Starter
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Series1 => "series1",
            Self::Series2 => "series2",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "starter" => Some(Self::Starter),
            "series1" => Some(Self::Series1),
            "series2" => Some(Self::Series2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubItemView {
    pub name: String,
    pub description: String,
    pub current: f64,
    pub target: f64,
    pub percent: f64,
    pub is_retired: bool,
}

impl SubItemView {
    fn from_item(item: &SubItem, milestone_sum_len: usize) -> Self {
        let target = item.target(milestone_sum_len);
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            current: finite_or_zero(item.current_value),
            target,
            percent: item_percent(item.current_value, target),
            is_retired: item.is_retired,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesView {
    pub owner_id: EntityId,
    pub name: String,
    pub slot: SeriesSlot,
    pub owned_count: u32,
    pub progress: SeriesProgress,
    pub items: Vec<SubItemView>,
}

#[must_use]
pub fn series_view(series: &Series, milestone_sum_len: usize) -> SeriesView {
    SeriesView {
        owner_id: series.owner_id,
        name: series.name.clone(),
        slot: SeriesSlot::from_name(&series.name),
        owned_count: series.owned_count,
        progress: aggregate(series, milestone_sum_len),
        items: series
            .items
            .iter()
            .map(|item| SubItemView::from_item(item, milestone_sum_len))
            .collect(),
    }
}

/// Group-of-groups style one: mean of the owned series' percentages.
///
/// `None` when no series is owned.
#[must_use]
pub fn mean_of_series(views: &[SeriesView]) -> Option<f64> {
    let owned = views.iter().filter_map(|view| view.progress.percent()).collect::<Vec<_>>();
    if owned.is_empty() {
        return None;
    }
    Some(mean_percent(&owned))
}

/// Group-of-groups style two: summed currents over summed targets, across every sub-item.
#[must_use]
pub fn ratio_of_sums(views: &[SeriesView]) -> f64 {
    let (current, target) = views
        .iter()
        .flat_map(|view| view.items.iter())
        .fold((0.0, 0.0), |(current, target), item| (current + item.current, target + item.target));
    item_percent(current, target)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySeriesRollup {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub series: Vec<SeriesView>,
    pub mean_progress: Option<f64>,
    pub total_ratio: f64,
    pub any_complete: bool,
}

/// One rollup per entity that owns at least one series, ordered by entity id.
#[must_use]
pub fn entity_rollups(
    entities: &[Entity],
    series: &[Series],
    milestone_sum_len: usize,
) -> Vec<EntitySeriesRollup> {
    let names = entities
        .iter()
        .map(|entity| (entity.id, entity.name.as_str()))
        .collect::<BTreeMap<_, _>>();

    let mut grouped: BTreeMap<EntityId, Vec<SeriesView>> = BTreeMap::new();
    for entry in series {
        grouped.entry(entry.owner_id).or_default().push(series_view(entry, milestone_sum_len));
    }

    grouped
        .into_iter()
        .map(|(entity_id, mut views)| {
            views.sort_by(|lhs, rhs| lhs.slot.cmp(&rhs.slot).then_with(|| lhs.name.cmp(&rhs.name)));
            EntitySeriesRollup {
                entity_id,
                entity_name: names.get(&entity_id).map_or_else(String::new, |name| (*name).to_string()),
                mean_progress: mean_of_series(&views),
                total_ratio: ratio_of_sums(&views),
                any_complete: views.iter().any(|view| view.progress.is_complete()),
                series: views,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSort {
    Entity,
    #[default]
    Starter,
    Series1,
    Series2,
}

impl SeriesSort {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self.slot() {
            Some(slot) => slot.as_str(),
            None => "entity",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value == "entity" {
            return Some(Self::Entity);
        }
        SeriesSlot::parse(value).map(|slot| match slot {
            SeriesSlot::Starter => Self::Starter,
            SeriesSlot::Series1 => Self::Series1,
            SeriesSlot::Series2 => Self::Series2,
        })
    }

    #[must_use]
    pub fn slot(self) -> Option<SeriesSlot> {
        match self {
            Self::Entity => None,
            Self::Starter => Some(SeriesSlot::Starter),
            Self::Series1 => Some(SeriesSlot::Series1),
            Self::Series2 => Some(SeriesSlot::Series2),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct SeriesFilter {
    /// Case-insensitive substring over the entity name.
    pub search: String,
    /// Keep entities carrying any of these archetypes; empty keeps everyone.
    pub archetypes: Vec<String>,
    /// Drop entities with at least one complete series.
    pub hide_completed: bool,
    pub sort: SeriesSort,
    pub direction: SortDirection,
}

/// Progress of the first series in `slot`; missing or unowned series count as 0.
fn slot_percent(rollup: &EntitySeriesRollup, slot: SeriesSlot) -> f64 {
    rollup
        .series
        .iter()
        .find(|view| view.slot == slot)
        .and_then(|view| view.progress.percent())
        .unwrap_or(0.0)
}

pub(crate) fn matches_archetypes(entity: Option<&Entity>, archetypes: &[String]) -> bool {
    archetypes.is_empty()
        || entity.is_some_and(|entity| archetypes.iter().any(|archetype| entity.has_archetype(archetype)))
}

/// Filter and sort entity rollups for the series table.
#[must_use]
pub fn series_table(
    rollups: &[EntitySeriesRollup],
    entities: &[Entity],
    filter: &SeriesFilter,
) -> Vec<EntitySeriesRollup> {
    let by_id = entities.iter().map(|entity| (entity.id, entity)).collect::<BTreeMap<_, _>>();
    let needle = filter.search.trim().to_lowercase();

    let mut rows = rollups
        .iter()
        .filter(|rollup| needle.is_empty() || rollup.entity_name.to_lowercase().contains(&needle))
        .filter(|rollup| matches_archetypes(by_id.get(&rollup.entity_id).copied(), &filter.archetypes))
        .filter(|rollup| !filter.hide_completed || !rollup.any_complete)
        .cloned()
        .collect::<Vec<_>>();

    rows.sort_by(|lhs, rhs| {
        let primary = match filter.sort.slot() {
            None => lhs.entity_name.cmp(&rhs.entity_name),
            Some(slot) => slot_percent(lhs, slot).total_cmp(&slot_percent(rhs, slot)),
        };
        filter
            .direction
            .apply(primary)
            .then_with(|| lhs.entity_name.cmp(&rhs.entity_name))
            .then_with(|| lhs.entity_id.cmp(&rhs.entity_id))
    });
    rows
}

/// Progress through the current level: `since / (since + until)`, 100 at the cap.
#[must_use]
pub fn level_progress(record: &ProgressionRecord) -> f64 {
    let since = record.points_since_last_level.max(0);
    let until = record.points_until_next_level.max(0);
    let Some(denominator) = since.checked_add(until) else {
        return 0.0;
    };
    if denominator == 0 {
        return 100.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let percent = since as f64 / denominator as f64 * 100.0;
    clamp_percent(percent)
}
