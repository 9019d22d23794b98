use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use progress_engine_core::{
    challenge_board, class_mastery, classify_all, collection_summary, counter_members,
    entity_detail, entity_rollups, group_rules, mastery_table, overlap_table, progress_percent,
    recommend, resolve, series_table, team_pool, BoardEntry, BoardFilter, ClassMasteryLine,
    Classification, CollectionLine, CounterId, CounterMembers, EntityDetail, EntityId,
    EntitySeriesRollup, LevelThresholdPolicy, MasteryRow, OverlapRow, OverlapSort, Predicate,
    ProgressionIndex, RecommendationReport, ReferenceTables, RosterFilter, SeriesFilter, Snapshot,
    SnapshotVersion, SortDirection, TeamCandidate, TierResolution, VersionedMemo,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{info, warn};

pub const API_CONTRACT_VERSION: &str = "api.v1";

/// Read reference tables from YAML. Missing fields keep their built-in defaults.
///
/// # Errors
/// Returns an error when the file cannot be read, is not valid YAML, or the tables fail
/// validation.
pub fn load_reference_tables(path: &Path) -> Result<ReferenceTables> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read reference tables {}", path.display()))?;
    let tables: ReferenceTables = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse reference tables {}", path.display()))?;
    tables.validate().map_err(|err| anyhow!("{}: {err}", path.display()))?;
    Ok(tables)
}

/// Read a snapshot from JSON.
///
/// # Errors
/// Returns an error when the file cannot be read or does not decode as a snapshot.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse snapshot {}", path.display()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterProgress {
    pub resolution: TierResolution,
    pub percent: f64,
}

/// Every derived view for one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardView {
    pub api_contract_version: String,
    pub snapshot_id: String,
    pub snapshot_version: Option<SnapshotVersion>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub captured_at: Option<OffsetDateTime>,
    pub warnings: Vec<String>,
    pub counters: Vec<CounterProgress>,
    pub mastery: Vec<MasteryRow>,
    pub series: Vec<EntitySeriesRollup>,
    pub recommendations: RecommendationReport,
    pub overlaps: Vec<OverlapRow>,
    pub collection: Vec<CollectionLine>,
    pub class_mastery: Vec<ClassMasteryLine>,
    pub categories: BTreeMap<String, Vec<Classification>>,
}

impl DashboardView {
    /// View shown before any snapshot has arrived.
    #[must_use]
    pub fn empty(tables: &ReferenceTables) -> Self {
        let policy = LevelThresholdPolicy::from_tables(tables);
        Self {
            api_contract_version: API_CONTRACT_VERSION.to_string(),
            snapshot_id: "snap_none".to_string(),
            snapshot_version: None,
            captured_at: None,
            warnings: Vec::new(),
            counters: Vec::new(),
            mastery: Vec::new(),
            series: Vec::new(),
            recommendations: recommend(&[], &ProgressionIndex::default(), &policy, tables),
            overlaps: Vec::new(),
            collection: Vec::new(),
            class_mastery: class_mastery(&[], tables),
            categories: BTreeMap::new(),
        }
    }
}

/// Stable fingerprint of a snapshot's full contents, independent of record order.
///
/// # Errors
/// Returns an error when a record cannot be encoded as JSON.
pub fn compute_snapshot_id(snapshot: &Snapshot) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(snapshot.version.0.to_string().as_bytes());
    hasher.update(snapshot.captured_at.unix_timestamp().to_string().as_bytes());

    let mut parts = encoded_records("c", &snapshot.counters)?;
    parts.extend(encoded_records("e", &snapshot.entities)?);
    parts.extend(encoded_records("p", &snapshot.progression)?);
    parts.extend(encoded_records("s", &snapshot.series)?);
    parts.extend(encoded_records("i", &snapshot.catalogue)?);
    parts.sort_unstable();

    for value in parts {
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }

    let digest = hasher.finalize();
    let digest_hex = format!("{digest:x}");
    Ok(format!("snap_{}", &digest_hex[..16]))
}

fn encoded_records<T: Serialize>(kind: &str, records: &[T]) -> Result<Vec<String>> {
    records
        .iter()
        .map(|record| {
            let encoded = serde_json::to_string(record)
                .with_context(|| format!("failed to encode `{kind}` record for snapshot id"))?;
            Ok(format!("{kind}:{encoded}"))
        })
        .collect()
}

/// Capstone group names present in the snapshot, sorted.
fn capstone_groups(snapshot: &Snapshot) -> BTreeSet<String> {
    snapshot
        .counters
        .iter()
        .filter_map(|counter| counter.capstone_group.clone())
        .collect()
}

fn build_view(
    snapshot: &Snapshot,
    tables: &ReferenceTables,
    policy: &LevelThresholdPolicy,
) -> Result<DashboardView> {
    let warnings = snapshot.validation_issues(tables);
    for issue in &warnings {
        warn!(snapshot_version = %snapshot.version, %issue, "snapshot validation issue");
    }

    let counters = snapshot
        .counters
        .iter()
        .map(|counter| {
            let resolution = resolve(counter, &tables.tier_sequence);
            let percent = progress_percent(counter, &resolution);
            CounterProgress { resolution, percent }
        })
        .collect::<Vec<_>>();

    let index = ProgressionIndex::new(&snapshot.progression, &snapshot.entities);
    let categories = capstone_groups(snapshot)
        .into_iter()
        .map(|group| {
            let rules = group_rules(&snapshot.counters, &group);
            (group, classify_all(&snapshot.entities, &rules))
        })
        .collect();

    let view = DashboardView {
        api_contract_version: API_CONTRACT_VERSION.to_string(),
        snapshot_id: compute_snapshot_id(snapshot)?,
        snapshot_version: Some(snapshot.version),
        captured_at: Some(snapshot.captured_at),
        warnings,
        counters,
        mastery: mastery_table(&snapshot.entities, &index, &RosterFilter::default()),
        series: entity_rollups(&snapshot.entities, &snapshot.series, tables.milestone_sum_len),
        recommendations: recommend(&snapshot.counters, &index, policy, tables),
        overlaps: overlap_table(
            &snapshot.catalogue,
            &snapshot.entities,
            OverlapSort::default(),
            SortDirection::default(),
        ),
        collection: collection_summary(&snapshot.counters, &snapshot.catalogue, tables),
        class_mastery: class_mastery(&snapshot.counters, tables),
        categories,
    };
    info!(
        snapshot_id = %view.snapshot_id,
        counters = view.counters.len(),
        recommendations = view.recommendations.recommendations.len(),
        "dashboard view built"
    );
    Ok(view)
}

/// Builds dashboard views and keeps the latest one until the snapshot version changes.
#[derive(Debug)]
pub struct DashboardApi {
    tables: ReferenceTables,
    policy: LevelThresholdPolicy,
    memo: VersionedMemo<DashboardView>,
}

impl DashboardApi {
    /// # Errors
    /// Returns an error when the tables fail validation.
    pub fn new(tables: ReferenceTables) -> Result<Self> {
        tables.validate().context("invalid reference tables")?;
        let policy = LevelThresholdPolicy::from_tables(&tables);
        Ok(Self { tables, policy, memo: VersionedMemo::new() })
    }

    /// # Errors
    /// Returns an error when the YAML file cannot be loaded or validated.
    pub fn from_tables_path(path: &Path) -> Result<Self> {
        Self::new(load_reference_tables(path)?)
    }

    #[must_use]
    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    #[must_use]
    pub fn memo(&self) -> &VersionedMemo<DashboardView> {
        &self.memo
    }

    /// Derived views for `snapshot`, recomputed only when its version changes.
    ///
    /// # Errors
    /// Returns an error when the snapshot fingerprint cannot be computed. The previously
    /// cached view is kept.
    pub fn view(&mut self, snapshot: &Snapshot) -> Result<&DashboardView> {
        let Self { tables, policy, memo } = self;
        memo.try_get_or_compute(snapshot.version, || build_view(snapshot, tables, policy))
    }

    /// Like [`Self::view`], but yields the empty view when no snapshot is available.
    ///
    /// # Errors
    /// Same as [`Self::view`].
    pub fn view_or_empty(&mut self, snapshot: Option<&Snapshot>) -> Result<DashboardView> {
        match snapshot {
            Some(snapshot) => Ok(self.view(snapshot)?.clone()),
            None => Ok(DashboardView::empty(&self.tables)),
        }
    }

    #[must_use]
    pub fn recommendations(&self, snapshot: &Snapshot) -> RecommendationReport {
        let index = ProgressionIndex::new(&snapshot.progression, &snapshot.entities);
        recommend(&snapshot.counters, &index, &self.policy, &self.tables)
    }

    #[must_use]
    pub fn board(&self, snapshot: &Snapshot, filter: &BoardFilter) -> Vec<BoardEntry> {
        challenge_board(&snapshot.counters, &self.tables, filter)
    }

    #[must_use]
    pub fn mastery(&self, snapshot: &Snapshot, filter: &RosterFilter) -> Vec<MasteryRow> {
        let index = ProgressionIndex::new(&snapshot.progression, &snapshot.entities);
        mastery_table(&snapshot.entities, &index, filter)
    }

    #[must_use]
    pub fn series_table(&self, snapshot: &Snapshot, filter: &SeriesFilter) -> Vec<EntitySeriesRollup> {
        let rollups = entity_rollups(&snapshot.entities, &snapshot.series, self.tables.milestone_sum_len);
        series_table(&rollups, &snapshot.entities, filter)
    }

    #[must_use]
    pub fn overlap_table(
        &self,
        snapshot: &Snapshot,
        sort: OverlapSort,
        direction: SortDirection,
    ) -> Vec<OverlapRow> {
        overlap_table(&snapshot.catalogue, &snapshot.entities, sort, direction)
    }

    /// Detail card for one entity.
    ///
    /// # Errors
    /// Returns an error when the entity is not in the snapshot.
    pub fn entity_detail(&self, snapshot: &Snapshot, entity_id: EntityId) -> Result<EntityDetail> {
        let entity = snapshot
            .entities
            .iter()
            .find(|entity| entity.id == entity_id)
            .ok_or_else(|| anyhow!("entity {entity_id} is not in snapshot {}", snapshot.version))?;
        let index = ProgressionIndex::new(&snapshot.progression, &snapshot.entities);
        Ok(entity_detail(
            entity,
            &index.record(entity_id),
            &snapshot.counters,
            &snapshot.series,
            &snapshot.catalogue,
            &self.tables,
        ))
    }

    /// Completed and available members of one counter, by display name.
    ///
    /// # Errors
    /// Returns an error when the counter is not in the snapshot.
    pub fn counter_members(&self, snapshot: &Snapshot, counter_id: CounterId) -> Result<CounterMembers> {
        let counter = snapshot
            .counters
            .iter()
            .find(|counter| counter.id == counter_id)
            .ok_or_else(|| anyhow!("counter {counter_id} is not in snapshot {}", snapshot.version))?;
        Ok(counter_members(counter, &snapshot.entities, &snapshot.catalogue))
    }

    /// Team pool over the selected counters' populations plus an optional archetype.
    ///
    /// # Errors
    /// Returns an error when a selected counter is not in the snapshot.
    pub fn team(
        &self,
        snapshot: &Snapshot,
        selected: &[CounterId],
        archetype: Option<&str>,
    ) -> Result<Vec<TeamCandidate>> {
        let mut predicates = selected
            .iter()
            .map(|counter_id| {
                snapshot
                    .counters
                    .iter()
                    .find(|counter| counter.id == *counter_id)
                    .map(Predicate::member_of)
                    .ok_or_else(|| anyhow!("counter {counter_id} is not in snapshot {}", snapshot.version))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(archetype) = archetype {
            predicates.push(Predicate::HasArchetype { archetype: archetype.to_string() });
        }
        Ok(team_pool(&snapshot.entities, &predicates))
    }
}

/// Presentation-side state keyed by entity, joined onto derived rows after each
/// recomputation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewOverlay {
    expanded: BTreeSet<EntityId>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverlayRow<'a> {
    #[serde(flatten)]
    pub rollup: &'a EntitySeriesRollup,
    pub is_expanded: bool,
}

impl ViewOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the expansion flag and return the new state.
    pub fn toggle(&mut self, entity_id: EntityId) -> bool {
        if self.expanded.remove(&entity_id) {
            false
        } else {
            self.expanded.insert(entity_id);
            true
        }
    }

    #[must_use]
    pub fn is_expanded(&self, entity_id: EntityId) -> bool {
        self.expanded.contains(&entity_id)
    }

    /// Drop state for entities that no longer appear in `rollups`.
    pub fn retain_known(&mut self, rollups: &[EntitySeriesRollup]) {
        let known = rollups.iter().map(|rollup| rollup.entity_id).collect::<BTreeSet<_>>();
        self.expanded.retain(|entity_id| known.contains(entity_id));
    }

    #[must_use]
    pub fn join<'a>(&self, rollups: &'a [EntitySeriesRollup]) -> Vec<OverlayRow<'a>> {
        rollups
            .iter()
            .map(|rollup| OverlayRow { rollup, is_expanded: self.is_expanded(rollup.entity_id) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use progress_engine_core::{
        CatalogueItem, Counter, Entity, IdListType, ItemId, ProgressionRecord, Series, SubItem,
    };
    use time::macros::datetime;

    use super::*;

    fn unique_temp_path(extension: &str) -> PathBuf {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        std::env::temp_dir().join(format!("pdash-api-{}-{nanos}.{extension}", std::process::id()))
    }

    fn mk_counter(id: u64, name: &str, current_value: f64, eligible: &[u32]) -> Counter {
        Counter {
            id: CounterId(id),
            name: name.to_string(),
            description: String::new(),
            current_value,
            current_tier: "GOLD".to_string(),
            thresholds: [("PLATINUM".to_string(), 5.0), ("MASTER".to_string(), 10.0)].into_iter().collect(),
            eligible_ids: eligible.iter().copied().map(EntityId).collect(),
            completed_ids: vec![],
            id_list_type: IdListType::Champion,
            category: "VETERANCY".to_string(),
            is_capstone: false,
            capstone_group: None,
            parent_id: None,
            points_awarded: 10,
        }
    }

    fn fixture_snapshot(version: u64) -> Snapshot {
        let mut region = mk_counter(303_501, "Demacia", 0.0, &[1]);
        region.capstone_group = Some("Globetrotter".to_string());
        Snapshot {
            version: SnapshotVersion(version),
            captured_at: datetime!(2026-03-01 12:00:00 UTC),
            counters: vec![mk_counter(401_201, "Assassin mastery", 3.0, &[1, 2, 3]), region],
            entities: vec![
                Entity { id: EntityId(1), name: "Garen".to_string(), archetypes: vec!["Fighter".to_string()] },
                Entity { id: EntityId(2), name: "Zed".to_string(), archetypes: vec!["Assassin".to_string()] },
            ],
            progression: vec![ProgressionRecord {
                entity_id: EntityId(2),
                level: 6,
                points: 21_600,
                points_since_last_level: 100,
                points_until_next_level: 400,
            }],
            series: vec![Series {
                owner_id: EntityId(2),
                name: "Series 1".to_string(),
                owned_count: 1,
                items: vec![SubItem {
                    name: "Kills".to_string(),
                    description: String::new(),
                    current_value: 5.0,
                    milestones: vec![10.0],
                    is_retired: false,
                }],
            }],
            catalogue: vec![CatalogueItem {
                id: ItemId(2_001),
                owner_id: EntityId(2),
                name: "Shockblade Zed".to_string(),
                is_base: false,
                rarity: "kEpic".to_string(),
                is_legacy: false,
                owned: false,
                in_queue: true,
            }],
        }
    }

    // Test IDs: TAPI-001
    #[test]
    fn view_is_memoized_per_snapshot_version() -> Result<()> {
        let mut api = DashboardApi::new(ReferenceTables::default())?;
        let snapshot = fixture_snapshot(1);

        let first_id = api.view(&snapshot)?.snapshot_id.clone();
        let second_id = api.view(&snapshot)?.snapshot_id.clone();
        assert_eq!(first_id, second_id);
        assert_eq!(api.memo().hits(), 1);
        assert_eq!(api.memo().recomputes(), 1);

        let next = fixture_snapshot(2);
        let view = api.view(&next)?;
        assert_eq!(view.snapshot_version, Some(SnapshotVersion(2)));
        assert_ne!(view.snapshot_id, first_id);
        assert_eq!(api.memo().recomputes(), 2);
        Ok(())
    }

    // Test IDs: TAPI-002
    #[test]
    fn view_carries_every_derived_section() -> Result<()> {
        let mut api = DashboardApi::new(ReferenceTables::default())?;
        let view = api.view(&fixture_snapshot(1))?.clone();

        assert!(view.snapshot_id.starts_with("snap_"));
        assert_eq!(view.snapshot_id.len(), "snap_".len() + 16);
        assert_eq!(view.counters.len(), 2);
        assert_eq!(view.series.len(), 1);
        assert_eq!(view.recommendations.recommendations.len(), 1);
        assert_eq!(view.recommendations.recommendations[0].selected[0].entity_id, EntityId(2));
        assert_eq!(view.overlaps.len(), 2);
        let zed_overlap = view
            .overlaps
            .iter()
            .find(|row| row.entity_id == EntityId(2))
            .unwrap_or_else(|| panic!("overlap row for entity 2"));
        assert_eq!(zed_overlap.summary.queued, 1);
        assert_eq!(view.mastery.len(), 2);
        assert_eq!(view.mastery[0].entity_id, EntityId(2));
        assert!((view.mastery[0].level_progress - 20.0).abs() < 1e-9);
        assert_eq!(view.categories["Globetrotter"][0].category.label(), Some("Demacia"));
        assert!(view.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn missing_snapshot_yields_empty_view() -> Result<()> {
        let mut api = DashboardApi::new(ReferenceTables::default())?;
        let view = api.view_or_empty(None)?;
        assert_eq!(view.snapshot_version, None);
        assert!(view.counters.is_empty());
        assert!(view.recommendations.recommendations.is_empty());
        assert!(view.mastery.is_empty());
        assert_eq!(view.class_mastery.len(), 6);
        assert!(view.class_mastery.iter().all(|line| line.level7.is_none()));
        Ok(())
    }

    #[test]
    fn snapshot_id_ignores_record_order() -> Result<()> {
        let snapshot = fixture_snapshot(4);
        let mut reversed = snapshot.clone();
        reversed.counters.reverse();
        assert_eq!(compute_snapshot_id(&snapshot)?, compute_snapshot_id(&reversed)?);
        Ok(())
    }

    // Test IDs: TAPI-003
    #[test]
    fn snapshot_id_covers_every_record_field() -> Result<()> {
        let snapshot = fixture_snapshot(4);
        let baseline = compute_snapshot_id(&snapshot)?;

        let mut thresholds = snapshot.clone();
        thresholds.counters[0].thresholds.insert("MASTER".to_string(), 12.0);
        assert_ne!(compute_snapshot_id(&thresholds)?, baseline);

        let mut members = snapshot.clone();
        members.counters[0].completed_ids.push(EntityId(1));
        assert_ne!(compute_snapshot_id(&members)?, baseline);

        let mut milestones = snapshot.clone();
        milestones.series[0].items[0].milestones.push(20.0);
        assert_ne!(compute_snapshot_id(&milestones)?, baseline);

        let mut archetypes = snapshot.clone();
        archetypes.entities[0].archetypes.push("Tank".to_string());
        assert_ne!(compute_snapshot_id(&archetypes)?, baseline);

        let mut rarity = snapshot;
        rarity.catalogue[0].rarity = "kLegendary".to_string();
        assert_ne!(compute_snapshot_id(&rarity)?, baseline);
        Ok(())
    }

    #[test]
    fn tables_sort_and_filter_through_the_api() -> Result<()> {
        let api = DashboardApi::new(ReferenceTables::default())?;
        let snapshot = fixture_snapshot(1);

        let by_points = RosterFilter { sort: progress_engine_core::MasterySort::Points, ..RosterFilter::default() };
        let mastery = api.mastery(&snapshot, &by_points);
        assert_eq!(mastery.iter().map(|row| row.entity_id).collect::<Vec<_>>(), vec![EntityId(2), EntityId(1)]);

        let fighters = RosterFilter { archetypes: vec!["Fighter".to_string()], ..RosterFilter::default() };
        assert_eq!(api.mastery(&snapshot, &fighters)[0].name, "Garen");

        let hidden = SeriesFilter { search: "gar".to_string(), ..SeriesFilter::default() };
        assert!(api.series_table(&snapshot, &hidden).is_empty());
        assert_eq!(api.series_table(&snapshot, &SeriesFilter::default())[0].entity_id, EntityId(2));

        let by_queued = api.overlap_table(&snapshot, OverlapSort::Queued, SortDirection::Desc);
        assert_eq!(by_queued[0].entity_id, EntityId(2));
        Ok(())
    }

    #[test]
    fn detail_and_members_resolve_known_ids() -> Result<()> {
        let api = DashboardApi::new(ReferenceTables::default())?;
        let snapshot = fixture_snapshot(1);

        let detail = api.entity_detail(&snapshot, EntityId(2))?;
        assert_eq!(detail.mastery.level, 6);
        assert_eq!(detail.series_progress, Some(50.0));
        assert_eq!((detail.items_owned, detail.items_total), (0, 1));
        assert_eq!(detail.groups.len(), 1);
        assert!(api.entity_detail(&snapshot, EntityId(42)).is_err());

        let members = api.counter_members(&snapshot, CounterId(401_201))?;
        assert_eq!(members.id_list_type, IdListType::Champion);
        let names = members.available.iter().map(|member| member.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["3", "Garen", "Zed"]);
        assert!(api.counter_members(&snapshot, CounterId(7)).is_err());
        Ok(())
    }

    #[test]
    fn yaml_tables_override_defaults() -> Result<()> {
        let path = unique_temp_path("yaml");
        std::fs::write(&path, "milestone_sum_len: 3\nrequirement_tier: DIAMOND\n")?;
        let tables = load_reference_tables(&path)?;
        assert_eq!(tables.milestone_sum_len, 3);
        assert_eq!(tables.requirement_tier, "DIAMOND");
        assert_eq!(tables.tier_sequence.len(), 10);

        std::fs::write(&path, "requirement_tier: LEGEND\n")?;
        let Err(err) = load_reference_tables(&path) else {
            panic!("unknown requirement tier should fail");
        };
        assert!(err.to_string().contains("LEGEND"));

        let _ = std::fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn snapshot_file_round_trips_through_loader() -> Result<()> {
        let path = unique_temp_path("json");
        std::fs::write(&path, serde_json::to_string(&fixture_snapshot(9))?)?;
        let loaded = load_snapshot(&path)?;
        assert_eq!(loaded, fixture_snapshot(9));
        let _ = std::fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn team_rejects_unknown_counter_and_filters_by_archetype() -> Result<()> {
        let api = DashboardApi::new(ReferenceTables::default())?;
        let snapshot = fixture_snapshot(1);
        assert!(api.team(&snapshot, &[CounterId(1)], None).is_err());

        let pool = api.team(&snapshot, &[CounterId(401_201)], Some("assassin"))?;
        assert_eq!(pool[0].name, "Zed");
        assert!(pool[0].available);
        assert!(!pool[1].available);
        Ok(())
    }

    #[test]
    fn overlay_survives_recompute_and_prunes_stale_keys() -> Result<()> {
        let mut api = DashboardApi::new(ReferenceTables::default())?;
        let mut overlay = ViewOverlay::new();
        assert!(overlay.toggle(EntityId(2)));
        assert!(overlay.toggle(EntityId(7)));

        let rows = api.view(&fixture_snapshot(1))?.series.clone();
        overlay.retain_known(&rows);
        let joined = overlay.join(&rows);
        assert!(joined[0].is_expanded);
        assert!(!overlay.is_expanded(EntityId(7)));

        let rows = api.view(&fixture_snapshot(2))?.series.clone();
        assert!(overlay.join(&rows)[0].is_expanded);
        assert!(!overlay.toggle(EntityId(2)));
        Ok(())
    }
}
