//! Owned / queued / unowned accounting over the cosmetic catalogue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    ceil_to_u32, count_to_u32, finite_or_zero, CatalogueItem, Counter, CounterId, Entity, EntityId,
    Rarity, ReferenceTables, SortDirection,
};

/// Per-group counts. An item that is both owned and queued counts as owned only.
///
/// `owned + unowned` equals the group size, and so does
/// `owned + queued + unowned_after_queue`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct OverlapSummary {
    pub owned: u32,
    pub queued: u32,
    pub unowned: u32,
    pub unowned_after_queue: u32,
    pub effective_total: u32,
}

impl OverlapSummary {
    fn add(&mut self, item: &CatalogueItem) {
        if item.owned {
            self.owned += 1;
        } else {
            self.unowned += 1;
            if item.in_queue {
                self.queued += 1;
            } else {
                self.unowned_after_queue += 1;
            }
        }
        self.effective_total = self.owned + self.queued;
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.owned + self.unowned
    }
}

/// Partition the non-base items by `key_fn` and count each group.
#[must_use]
pub fn summarize<K, F>(items: &[CatalogueItem], key_fn: F) -> BTreeMap<K, OverlapSummary>
where
    K: Ord,
    F: Fn(&CatalogueItem) -> K,
{
    let mut groups: BTreeMap<K, OverlapSummary> = BTreeMap::new();
    for item in items.iter().filter(|item| !item.is_base) {
        groups.entry(key_fn(item)).or_default().add(item);
    }
    groups
}

/// Number of groups whose effective total satisfies `predicate`.
#[must_use]
pub fn count_groups<K>(groups: &BTreeMap<K, OverlapSummary>, predicate: impl Fn(u32) -> bool) -> u32 {
    count_to_u32(groups.values().filter(|summary| predicate(summary.effective_total)).count())
}

/// Non-base items that are queued, not owned, and match `predicate`.
#[must_use]
pub fn queue_contribution(items: &[CatalogueItem], predicate: impl Fn(&CatalogueItem) -> bool) -> u32 {
    count_to_u32(
        items
            .iter()
            .filter(|item| !item.is_base && item.is_pending() && predicate(item))
            .count(),
    )
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapSort {
    Entity,
    Total,
    #[default]
    Owned,
    Queued,
    OwnedPlusQueued,
    Unowned,
}

impl OverlapSort {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Total => "total",
            Self::Owned => "owned",
            Self::Queued => "queued",
            Self::OwnedPlusQueued => "owned_plus_queued",
            Self::Unowned => "unowned",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "entity" => Some(Self::Entity),
            "total" => Some(Self::Total),
            "owned" => Some(Self::Owned),
            "queued" => Some(Self::Queued),
            "owned_plus_queued" => Some(Self::OwnedPlusQueued),
            "unowned" => Some(Self::Unowned),
            _ => None,
        }
    }

    fn key(self, summary: &OverlapSummary) -> u32 {
        match self {
            Self::Entity => 0,
            Self::Total => summary.total(),
            Self::Owned => summary.owned,
            Self::Queued => summary.queued,
            Self::OwnedPlusQueued => summary.effective_total,
            Self::Unowned => summary.unowned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OverlapRow {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub summary: OverlapSummary,
}

/// One row per roster entity plus any other item owner, sorted by `sort`.
///
/// Entities without non-base items get an all-zero summary. Ties fall back to name,
/// then id.
#[must_use]
pub fn overlap_table(
    items: &[CatalogueItem],
    entities: &[Entity],
    sort: OverlapSort,
    direction: SortDirection,
) -> Vec<OverlapRow> {
    let mut groups = summarize(items, |item| item.owner_id);
    let mut rows = entities
        .iter()
        .map(|entity| OverlapRow {
            entity_id: entity.id,
            entity_name: entity.name.clone(),
            summary: groups.remove(&entity.id).unwrap_or_default(),
        })
        .collect::<Vec<_>>();
    rows.extend(groups.into_iter().map(|(entity_id, summary)| OverlapRow {
        entity_id,
        entity_name: String::new(),
        summary,
    }));

    rows.sort_by(|lhs, rhs| {
        let primary = match sort {
            OverlapSort::Entity => lhs.entity_name.cmp(&rhs.entity_name),
            _ => sort.key(&lhs.summary).cmp(&sort.key(&rhs.summary)),
        };
        direction
            .apply(primary)
            .then_with(|| lhs.entity_name.cmp(&rhs.entity_name))
            .then_with(|| lhs.entity_id.cmp(&rhs.entity_id))
    });
    rows
}

/// `current (+queued) = projected`, kept as three numbers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProjectedCount {
    pub current: f64,
    pub queued: u32,
    pub projected: f64,
}

impl ProjectedCount {
    #[must_use]
    pub fn new(current: f64, queued: u32) -> Self {
        let current = finite_or_zero(current);
        Self { current, queued, projected: current + f64::from(queued) }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKey {
    Total,
    Victorious,
    Legacy,
    Epic,
    Legendary,
    Mythic,
    Ultimate,
    Champions5Plus,
    Champions15Plus,
}

impl CollectionKey {
    pub const ALL: [Self; 9] = [
        Self::Total,
        Self::Victorious,
        Self::Legacy,
        Self::Epic,
        Self::Legendary,
        Self::Mythic,
        Self::Ultimate,
        Self::Champions5Plus,
        Self::Champions15Plus,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Victorious => "victorious",
            Self::Legacy => "legacy",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
            Self::Mythic => "mythic",
            Self::Ultimate => "ultimate",
            Self::Champions5Plus => "champions_5plus",
            Self::Champions15Plus => "champions_15plus",
        }
    }

    #[must_use]
    pub fn counter_id(self, tables: &ReferenceTables) -> CounterId {
        let ids = &tables.collection;
        match self {
            Self::Total => ids.total,
            Self::Victorious => ids.victorious,
            Self::Legacy => ids.legacy,
            Self::Epic => ids.epic,
            Self::Legendary => ids.legendary,
            Self::Mythic => ids.mythic,
            Self::Ultimate => ids.ultimate,
            Self::Champions5Plus => ids.champions_5plus,
            Self::Champions15Plus => ids.champions_15plus,
        }
    }

    fn rarity(self) -> Option<Rarity> {
        match self {
            Self::Epic => Some(Rarity::Epic),
            Self::Legendary => Some(Rarity::Legendary),
            Self::Mythic => Some(Rarity::Mythic),
            Self::Ultimate => Some(Rarity::Ultimate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionLine {
    pub key: CollectionKey,
    pub counter_id: CounterId,
    pub name: String,
    pub projection: ProjectedCount,
    pub requirement: Option<f64>,
}

fn queued_for(
    key: CollectionKey,
    current: f64,
    items: &[CatalogueItem],
    per_entity: &BTreeMap<EntityId, OverlapSummary>,
) -> u32 {
    let groups_beyond = |min: u32| {
        let reached = f64::from(count_groups(per_entity, |effective| effective >= min));
        ceil_to_u32(reached - finite_or_zero(current))
    };
    match key {
        CollectionKey::Total => queue_contribution(items, |_| true),
        CollectionKey::Victorious => 0,
        CollectionKey::Legacy => queue_contribution(items, |item| item.is_legacy),
        CollectionKey::Champions5Plus => groups_beyond(5),
        CollectionKey::Champions15Plus => groups_beyond(15),
        CollectionKey::Epic | CollectionKey::Legendary | CollectionKey::Mythic | CollectionKey::Ultimate => {
            let rarity = key.rarity();
            queue_contribution(items, |item| Some(item.rarity()) == rarity)
        }
    }
}

/// One projection line per tracked collection counter present in `counters`.
///
/// An empty catalogue yields no lines.
#[must_use]
pub fn collection_summary(
    counters: &[Counter],
    items: &[CatalogueItem],
    tables: &ReferenceTables,
) -> Vec<CollectionLine> {
    if items.is_empty() {
        return Vec::new();
    }
    let per_entity = summarize(items, |item| item.owner_id);
    let by_id = counters.iter().map(|counter| (counter.id, counter)).collect::<BTreeMap<_, _>>();

    CollectionKey::ALL
        .iter()
        .filter_map(|key| {
            let counter_id = key.counter_id(tables);
            let counter = by_id.get(&counter_id)?;
            let queued = queued_for(*key, counter.current_value, items, &per_entity);
            Some(CollectionLine {
                key: *key,
                counter_id,
                name: counter.name.clone(),
                projection: ProjectedCount::new(counter.current_value, queued),
                requirement: counter
                    .threshold(&tables.requirement_tier)
                    .or_else(|| counter.highest_threshold()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::IdListType;

    fn item(id: u64, owner: u32, owned: bool, in_queue: bool) -> CatalogueItem {
        CatalogueItem {
            id: crate::ItemId(id),
            owner_id: EntityId(owner),
            name: format!("item-{id}"),
            is_base: false,
            rarity: "kNoRarity".to_string(),
            is_legacy: false,
            owned,
            in_queue,
        }
    }

    fn collection_counter(id: CounterId, current_value: f64) -> Counter {
        Counter {
            id,
            name: format!("collection-{id}"),
            description: String::new(),
            current_value,
            current_tier: "GOLD".to_string(),
            thresholds: [("MASTER".to_string(), 40.0)].into_iter().collect(),
            eligible_ids: vec![],
            completed_ids: vec![],
            id_list_type: IdListType::ChampionSkin,
            category: "COLLECTION".to_string(),
            is_capstone: false,
            capstone_group: None,
            parent_id: None,
            points_awarded: 0,
        }
    }

    // Test IDs: OVL-001
    #[test]
    fn owned_and_queued_counts_as_owned_only() {
        let items = vec![
            item(1, 1, true, false),
            item(2, 1, true, false),
            item(3, 1, true, true),
            item(4, 1, false, true),
            item(5, 1, false, false),
        ];
        let groups = summarize(&items, |item| item.owner_id);
        let summary = groups[&EntityId(1)];
        assert_eq!(summary.owned, 3);
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.unowned, 2);
        assert_eq!(summary.unowned_after_queue, 1);
        assert_eq!(summary.effective_total, 4);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn base_items_are_excluded_from_every_total() {
        let mut base = item(1, 1, true, false);
        base.is_base = true;
        let items = vec![base, item(2, 2, false, true)];
        let overlaps = overlap_table(&items, &[], OverlapSort::Owned, SortDirection::Desc);
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].entity_id, EntityId(2));
        assert_eq!(queue_contribution(&items, |_| true), 1);
    }

    #[test]
    fn overlap_table_covers_roster_and_sorts_by_column() {
        let entities = vec![
            Entity { id: EntityId(1), name: "Ahri".to_string(), archetypes: vec![] },
            Entity { id: EntityId(2), name: "Garen".to_string(), archetypes: vec![] },
            Entity { id: EntityId(3), name: "Lux".to_string(), archetypes: vec![] },
        ];
        let items = vec![
            item(1, 1, true, false),
            item(2, 1, false, true),
            item(3, 1, false, true),
            item(4, 2, true, false),
            item(5, 2, true, false),
            item(6, 9, false, false),
        ];
        let ids = |rows: &[OverlapRow]| rows.iter().map(|row| row.entity_id.0).collect::<Vec<_>>();

        let by_owned = overlap_table(&items, &entities, OverlapSort::default(), SortDirection::Desc);
        assert_eq!(ids(&by_owned), vec![2, 1, 9, 3]);
        assert!(by_owned[2].entity_name.is_empty());
        assert_eq!(by_owned[3].summary, OverlapSummary::default());

        let by_effective = overlap_table(&items, &entities, OverlapSort::OwnedPlusQueued, SortDirection::Desc);
        assert_eq!(ids(&by_effective), vec![1, 2, 9, 3]);

        let by_unowned = overlap_table(&items, &entities, OverlapSort::Unowned, SortDirection::Asc);
        assert_eq!(ids(&by_unowned), vec![2, 3, 9, 1]);

        let by_name = overlap_table(&items, &entities, OverlapSort::Entity, SortDirection::Asc);
        assert_eq!(ids(&by_name), vec![9, 1, 2, 3]);
        assert_eq!(OverlapSort::parse(OverlapSort::OwnedPlusQueued.as_str()), Some(OverlapSort::OwnedPlusQueued));
    }

    #[test]
    fn rollups_count_groups_over_effective_threshold() {
        let mut items = Vec::new();
        for id in 0..5 {
            items.push(item(id, 1, id < 3, id >= 3));
        }
        items.push(item(10, 2, true, false));
        let groups = summarize(&items, |item| item.owner_id);
        assert_eq!(count_groups(&groups, |effective| effective >= 5), 1);
        assert_eq!(count_groups(&groups, |effective| effective >= 1), 2);
    }

    #[test]
    fn collection_summary_projects_each_tracked_counter() {
        let tables = ReferenceTables::default();
        let ids = tables.collection.clone();
        let mut epic_queued = item(1, 1, false, true);
        epic_queued.rarity = "kEpic".to_string();
        let mut legacy_queued = item(2, 1, false, true);
        legacy_queued.is_legacy = true;
        let mut items = vec![epic_queued, legacy_queued, item(3, 1, true, true)];
        for id in 10..14 {
            items.push(item(id, 2, true, false));
        }
        items.push(item(14, 2, false, true));

        let counters = vec![
            collection_counter(ids.total, 5.0),
            collection_counter(ids.epic, 0.0),
            collection_counter(ids.legacy, 0.0),
            collection_counter(ids.victorious, 2.0),
            collection_counter(ids.champions_5plus, 0.0),
        ];
        let lines = collection_summary(&counters, &items, &tables);
        let line = |key: CollectionKey| {
            lines
                .iter()
                .find(|line| line.key == key)
                .unwrap_or_else(|| panic!("missing line for {}", key.as_str()))
        };

        assert_eq!(lines.len(), 5);
        assert_eq!(line(CollectionKey::Total).projection, ProjectedCount::new(5.0, 3));
        assert_eq!(line(CollectionKey::Epic).projection.queued, 1);
        assert_eq!(line(CollectionKey::Legacy).projection.queued, 1);
        assert_eq!(line(CollectionKey::Victorious).projection.queued, 0);
        assert_eq!(line(CollectionKey::Champions5Plus).projection.queued, 1);
        assert_eq!(line(CollectionKey::Total).requirement, Some(40.0));
        assert!((line(CollectionKey::Total).projection.projected - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn champions_line_saturates_at_zero() {
        let tables = ReferenceTables::default();
        let counters = vec![collection_counter(tables.collection.champions_15plus, 3.0)];
        let lines = collection_summary(&counters, &[item(1, 1, true, false)], &tables);
        assert_eq!(lines[0].projection.queued, 0);
    }

    #[test]
    fn empty_catalogue_has_no_lines() {
        let tables = ReferenceTables::default();
        let counters = vec![collection_counter(tables.collection.total, 5.0)];
        assert!(collection_summary(&counters, &[], &tables).is_empty());
    }

    // Test IDs: OVL-002
    proptest! {
        #[test]
        fn property_each_item_counts_once(flags in proptest::collection::vec((any::<bool>(), any::<bool>(), 0_u32..4), 0..40)) {
            let items = flags
                .iter()
                .zip(0_u64..)
                .map(|((owned, in_queue, owner), id)| item(id, *owner, *owned, *in_queue))
                .collect::<Vec<_>>();
            for summary in summarize(&items, |item| item.owner_id).values() {
                prop_assert_eq!(summary.owned + summary.unowned, summary.total());
                prop_assert_eq!(summary.owned + summary.queued + summary.unowned_after_queue, summary.total());
                prop_assert_eq!(summary.effective_total, summary.owned + summary.queued);
                prop_assert!(summary.queued <= summary.unowned);
            }
            let grand_total: u32 = summarize(&items, |_| ()).values().map(OverlapSummary::total).sum();
            prop_assert_eq!(grand_total, count_to_u32(items.len()));
        }
    }
}
