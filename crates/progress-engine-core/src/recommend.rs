use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ceil_to_u32, count_to_u32, resolve, span, Counter, CounterId, Entity, EntityId,
    LevelCostTable, ProgressionRecord, ReferenceTables,
};

/// Lookup of progression records by entity, plus the roster of known entities.
#[derive(Debug, Clone, Default)]
pub struct ProgressionIndex {
    records: BTreeMap<EntityId, ProgressionRecord>,
    roster: BTreeSet<EntityId>,
}

impl ProgressionIndex {
    /// Later records for the same entity replace earlier ones.
    #[must_use]
    pub fn new(records: &[ProgressionRecord], entities: &[Entity]) -> Self {
        let records = records
            .iter()
            .map(|record| (record.entity_id, record.clone()))
            .collect::<BTreeMap<_, _>>();
        let roster = entities
            .iter()
            .map(|entity| entity.id)
            .chain(records.keys().copied())
            .collect();
        Self { records, roster }
    }

    /// The entity's record, or an untouched level-0 stand-in.
    #[must_use]
    pub fn record(&self, entity_id: EntityId) -> ProgressionRecord {
        self.records
            .get(&entity_id)
            .cloned()
            .unwrap_or_else(|| ProgressionRecord::untouched(entity_id))
    }

    pub fn roster(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.roster.iter().copied()
    }
}

/// Decides which entities can count toward a counter and what level they must reach.
pub trait EligibilityPolicy {
    /// `None` excludes the counter from recommendations.
    fn qualifying_level(&self, counter: &Counter) -> Option<u32>;

    /// Entities that would advance the counter once qualified and have not qualified
    /// yet. Completed entities are removed by the solver.
    fn eligible_entities(&self, counter: &Counter, index: &ProgressionIndex) -> BTreeSet<EntityId>;
}

/// Entities qualify by reaching a fixed level per counter.
#[derive(Debug, Clone, Default)]
pub struct LevelThresholdPolicy {
    levels: BTreeMap<CounterId, u32>,
}

impl LevelThresholdPolicy {
    #[must_use]
    pub fn from_tables(tables: &ReferenceTables) -> Self {
        Self {
            levels: tables
                .qualifying_levels
                .iter()
                .map(|entry| (entry.counter_id, entry.level))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_level(mut self, counter_id: CounterId, level: u32) -> Self {
        self.levels.insert(counter_id, level);
        self
    }
}

impl EligibilityPolicy for LevelThresholdPolicy {
    fn qualifying_level(&self, counter: &Counter) -> Option<u32> {
        if !counter.tracks_population() {
            return None;
        }
        self.levels.get(&counter.id).copied()
    }

    fn eligible_entities(&self, counter: &Counter, index: &ProgressionIndex) -> BTreeSet<EntityId> {
        let Some(qualifying_level) = self.qualifying_level(counter) else {
            return BTreeSet::new();
        };
        let population = if counter.eligible_ids.is_empty() {
            index.roster().collect::<BTreeSet<_>>()
        } else {
            counter.eligible_ids.iter().copied().collect()
        };
        population
            .into_iter()
            .filter(|entity_id| index.record(*entity_id).level < qualifying_level)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct CandidateCost {
    pub entity_id: EntityId,
    pub level: u32,
    pub cost: i64,
}

impl CandidateCost {
    fn cmp(lhs: &Self, rhs: &Self) -> Ordering {
        lhs.cost.cmp(&rhs.cost).then_with(|| lhs.entity_id.cmp(&rhs.entity_id))
    }
}

/// Points an entity needs to reach `qualifying_level`.
///
/// The remainder of the current level plus every full level strictly between the current
/// level and the qualifying level. Entities already at or past it cost nothing.
#[must_use]
pub fn candidate_cost(record: &ProgressionRecord, qualifying_level: u32, costs: &LevelCostTable) -> i64 {
    if record.level >= qualifying_level {
        return 0;
    }
    (record.level + 1..qualifying_level)
        .map(|level| costs.cost_to_advance(level).max(0))
        .fold(record.points_until_next_level.max(0), i64::saturating_add)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Feasible { total_cost: i64 },
    Infeasible { shortfall: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub rank: usize,
    pub counter_id: CounterId,
    pub counter_name: String,
    pub current_tier: String,
    pub next_tier: String,
    pub distance: f64,
    pub deficit: u32,
    pub qualifying_level: u32,
    pub has_enough_entities: bool,
    pub selected: Vec<CandidateCost>,
    pub outcome: RecommendationOutcome,
}

impl Recommendation {
    fn cmp(lhs: &Self, rhs: &Self) -> Ordering {
        let primary = match (lhs.outcome, rhs.outcome) {
            (
                RecommendationOutcome::Feasible { total_cost: lhs_cost },
                RecommendationOutcome::Feasible { total_cost: rhs_cost },
            ) => lhs_cost
                .cmp(&rhs_cost)
                .then_with(|| lhs.deficit.cmp(&rhs.deficit))
                .then_with(|| lhs.counter_id.cmp(&rhs.counter_id)),
            (RecommendationOutcome::Feasible { .. }, RecommendationOutcome::Infeasible { .. }) => {
                Ordering::Less
            }
            (RecommendationOutcome::Infeasible { .. }, RecommendationOutcome::Feasible { .. }) => {
                Ordering::Greater
            }
            (
                RecommendationOutcome::Infeasible { shortfall: lhs_shortfall },
                RecommendationOutcome::Infeasible { shortfall: rhs_shortfall },
            ) => lhs_shortfall
                .cmp(&rhs_shortfall)
                .then_with(|| lhs.counter_id.cmp(&rhs.counter_id)),
        };
        primary.then_with(|| lhs.counter_name.cmp(&rhs.counter_name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationReport {
    pub ruleset_version: String,
    pub tie_breakers: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub ordering_trace: Vec<String>,
}

impl RecommendationReport {
    pub fn feasible(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|entry| entry.has_enough_entities)
    }

    pub fn infeasible(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|entry| !entry.has_enough_entities)
    }
}

#[must_use]
pub fn default_recommendation_tie_breakers() -> Vec<String> {
    vec![
        "feasible before infeasible".to_string(),
        "total_cost asc".to_string(),
        "deficit asc".to_string(),
        "shortfall asc".to_string(),
        "counter_id asc".to_string(),
        "candidate cost asc, entity_id asc".to_string(),
    ]
}

fn recommend_counter(
    counter: &Counter,
    index: &ProgressionIndex,
    policy: &impl EligibilityPolicy,
    tables: &ReferenceTables,
) -> Option<Recommendation> {
    let qualifying_level = policy.qualifying_level(counter)?;

    let resolution = resolve(counter, &tables.tier_sequence);
    let counter_span = span(counter);
    let in_scope = resolution.distance > 0.0 && resolution.distance < counter_span;
    if !in_scope {
        debug!(counter_id = %counter.id, distance = resolution.distance, span = counter_span, "counter out of recommendation scope");
        return None;
    }

    let deficit = ceil_to_u32(resolution.distance);
    let mut candidates = policy
        .eligible_entities(counter, index)
        .into_iter()
        .filter(|entity_id| !counter.has_completed(*entity_id))
        .map(|entity_id| {
            let record = index.record(entity_id);
            CandidateCost {
                entity_id,
                level: record.level,
                cost: candidate_cost(&record, qualifying_level, &tables.level_costs),
            }
        })
        .collect::<Vec<_>>();
    candidates.sort_by(CandidateCost::cmp);

    let available = count_to_u32(candidates.len());
    let (selected, outcome) = if available >= deficit {
        let selected = candidates
            .into_iter()
            .take(usize::try_from(deficit).unwrap_or(usize::MAX))
            .collect::<Vec<_>>();
        let total_cost = selected.iter().map(|candidate| candidate.cost).fold(0_i64, i64::saturating_add);
        (selected, RecommendationOutcome::Feasible { total_cost })
    } else {
        let shortfall = deficit - available;
        debug!(counter_id = %counter.id, deficit, available, shortfall, "counter is infeasible");
        (candidates, RecommendationOutcome::Infeasible { shortfall })
    };

    Some(Recommendation {
        rank: 0,
        counter_id: counter.id,
        counter_name: counter.name.clone(),
        current_tier: resolution.current_tier,
        next_tier: resolution.next_tier,
        distance: resolution.distance,
        deficit,
        qualifying_level,
        has_enough_entities: matches!(outcome, RecommendationOutcome::Feasible { .. }),
        selected,
        outcome,
    })
}

/// Rank near-complete counters by the cheapest way to close their gap.
///
/// Input order never affects the result.
#[must_use]
pub fn recommend(
    counters: &[Counter],
    index: &ProgressionIndex,
    policy: &impl EligibilityPolicy,
    tables: &ReferenceTables,
) -> RecommendationReport {
    let mut recommendations = counters
        .iter()
        .filter_map(|counter| recommend_counter(counter, index, policy, tables))
        .collect::<Vec<_>>();
    recommendations.sort_by(Recommendation::cmp);
    for (position, entry) in recommendations.iter_mut().enumerate() {
        entry.rank = position + 1;
    }
    debug!(counters = counters.len(), ranked = recommendations.len(), "recommendations ranked");

    RecommendationReport {
        ruleset_version: "recommend.v1".to_string(),
        tie_breakers: default_recommendation_tie_breakers(),
        recommendations,
        ordering_trace: vec![
            "filter: qualifying level defined by eligibility policy".to_string(),
            "filter: 0 < distance < span".to_string(),
            "exclude: completed entities".to_string(),
            "select: cheapest deficit candidates".to_string(),
            "sort: feasibility, cost, deterministic tie-breakers".to_string(),
        ],
    }
}
