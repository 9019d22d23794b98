//! Static reference data supplied once at process start.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{CounterId, EngineError};

/// Canonical tier ladder, lowest to highest.
pub const DEFAULT_TIER_SEQUENCE: [&str; 10] = [
    "NONE",
    "IRON",
    "BRONZE",
    "SILVER",
    "GOLD",
    "PLATINUM",
    "DIAMOND",
    "MASTER",
    "GRANDMASTER",
    "CHALLENGER",
];

/// Tier whose threshold is treated as a counter's "requirement" in gauges.
pub const DEFAULT_REQUIREMENT_TIER: &str = "MASTER";

/// Number of leading milestones summed into a collectible's target.
pub const DEFAULT_MILESTONE_SUM_LEN: usize = 5;

/// Counters listed on an entity's detail card.
pub const DEFAULT_TRACKED_CHALLENGES: [u64; 9] =
    [101_301, 120_002, 202_303, 210_001, 210_002, 401_106, 505_001, 602_002, 602_001];

/// Points needed to advance one level, indexed from level 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LevelCostTable {
    /// `per_level[0]` is the cost of going from level 1 to level 2.
    pub per_level: Vec<i64>,
    /// Cost for every level past the end of `per_level`.
    pub beyond: i64,
}

impl Default for LevelCostTable {
    fn default() -> Self {
        Self { per_level: vec![600, 1_200, 2_400, 2_400, 3_000, 11_000], beyond: 11_000 }
    }
}

impl LevelCostTable {
    /// Points required to go from `level` to `level + 1`. Level 0 is an untouched entity,
    /// which reaches level 1 for free.
    #[must_use]
    pub fn cost_to_advance(&self, level: u32) -> i64 {
        let Some(index) = level.checked_sub(1) else {
            return 0;
        };
        usize::try_from(index)
            .ok()
            .and_then(|index| self.per_level.get(index).copied())
            .unwrap_or(self.beyond)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassMasteryCounters {
    pub class: String,
    pub level7: CounterId,
    pub level10: CounterId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualifyingLevel {
    pub counter_id: CounterId,
    pub level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollectionCounterIds {
    pub total: CounterId,
    pub legacy: CounterId,
    pub victorious: CounterId,
    pub epic: CounterId,
    pub legendary: CounterId,
    pub mythic: CounterId,
    pub ultimate: CounterId,
    pub champions_5plus: CounterId,
    pub champions_15plus: CounterId,
}

impl Default for CollectionCounterIds {
    fn default() -> Self {
        Self {
            total: CounterId(510_001),
            legacy: CounterId(510_005),
            victorious: CounterId(510_006),
            epic: CounterId(510_010),
            legendary: CounterId(510_009),
            mythic: CounterId(510_008),
            ultimate: CounterId(510_007),
            champions_5plus: CounterId(510_004),
            champions_15plus: CounterId(510_003),
        }
    }
}

fn default_class_mastery() -> Vec<ClassMasteryCounters> {
    ["Assassin", "Fighter", "Mage", "Marksman", "Support", "Tank"]
        .iter()
        .zip(0_u64..)
        .map(|(class, offset)| ClassMasteryCounters {
            class: (*class).to_string(),
            level7: CounterId(401_201 + offset),
            level10: CounterId(401_207 + offset),
        })
        .collect()
}

fn default_qualifying_levels(classes: &[ClassMasteryCounters]) -> Vec<QualifyingLevel> {
    classes
        .iter()
        .flat_map(|line| {
            [
                QualifyingLevel { counter_id: line.level7, level: 7 },
                QualifyingLevel { counter_id: line.level10, level: 10 },
            ]
        })
        .collect()
}

/// Every static lookup the engine consults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReferenceTables {
    pub tier_sequence: Vec<String>,
    pub requirement_tier: String,
    pub milestone_sum_len: usize,
    pub level_costs: LevelCostTable,
    pub class_mastery: Vec<ClassMasteryCounters>,
    pub qualifying_levels: Vec<QualifyingLevel>,
    pub collection: CollectionCounterIds,
    pub tracked_challenges: Vec<CounterId>,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        let class_mastery = default_class_mastery();
        let qualifying_levels = default_qualifying_levels(&class_mastery);
        Self {
            tier_sequence: DEFAULT_TIER_SEQUENCE.iter().map(ToString::to_string).collect(),
            requirement_tier: DEFAULT_REQUIREMENT_TIER.to_string(),
            milestone_sum_len: DEFAULT_MILESTONE_SUM_LEN,
            level_costs: LevelCostTable::default(),
            class_mastery,
            qualifying_levels,
            collection: CollectionCounterIds::default(),
            tracked_challenges: DEFAULT_TRACKED_CHALLENGES.iter().copied().map(CounterId).collect(),
        }
    }
}

impl ReferenceTables {
    #[must_use]
    pub fn tier_index(&self, tier: &str) -> Option<usize> {
        self.tier_sequence.iter().position(|known| known == tier)
    }

    /// # Errors
    /// Returns [`EngineError::Config`] when the tier ladder is empty or repeats a name,
    /// the requirement tier is unknown, the milestone rule sums nothing, or a level cost
    /// is negative.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tier_sequence.is_empty() {
            return Err(EngineError::Config("tier_sequence MUST be non-empty".to_string()));
        }

        let mut seen = BTreeSet::new();
        for tier in &self.tier_sequence {
            if tier.trim().is_empty() {
                return Err(EngineError::Config("tier names MUST be non-empty".to_string()));
            }
            if !seen.insert(tier.as_str()) {
                return Err(EngineError::Config(format!("tier `{tier}` appears more than once")));
            }
        }

        if self.tier_index(&self.requirement_tier).is_none() {
            return Err(EngineError::Config(format!(
                "requirement_tier `{}` is not in the tier sequence",
                self.requirement_tier
            )));
        }

        if self.milestone_sum_len == 0 {
            return Err(EngineError::Config("milestone_sum_len MUST be >= 1".to_string()));
        }

        if self.level_costs.beyond < 0 || self.level_costs.per_level.iter().any(|cost| *cost < 0) {
            return Err(EngineError::Config("level costs MUST be non-negative".to_string()));
        }

        Ok(())
    }
}
