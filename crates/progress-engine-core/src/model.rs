use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct CounterId(pub u64);

impl Display for CounterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the ids in a counter's eligible/completed lists refer to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IdListType {
    #[default]
    None,
    Champion,
    ChampionSkin,
}

fn default_tier() -> String {
    "NONE".to_string()
}

/// A progression metric with a current value and tiered thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Counter {
    pub id: CounterId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default = "default_tier")]
    pub current_tier: String,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    #[serde(default)]
    pub eligible_ids: Vec<EntityId>,
    #[serde(default)]
    pub completed_ids: Vec<EntityId>,
    #[serde(default)]
    pub id_list_type: IdListType,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_capstone: bool,
    #[serde(default)]
    pub capstone_group: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CounterId>,
    #[serde(default)]
    pub points_awarded: u32,
}

impl Counter {
    #[must_use]
    pub fn threshold(&self, tier: &str) -> Option<f64> {
        self.thresholds.get(tier).copied().filter(|value| value.is_finite())
    }

    /// Largest finite declared threshold, regardless of tier order.
    #[must_use]
    pub fn highest_threshold(&self) -> Option<f64> {
        self.thresholds.values().copied().filter(|value| value.is_finite()).reduce(f64::max)
    }

    /// Whether the counter advances through a population of entities.
    #[must_use]
    pub fn tracks_population(&self) -> bool {
        !self.eligible_ids.is_empty() || !self.completed_ids.is_empty()
    }

    #[must_use]
    pub fn has_completed(&self, entity_id: EntityId) -> bool {
        self.completed_ids.contains(&entity_id)
    }

    #[must_use]
    pub fn applies_to(&self, entity_id: EntityId) -> bool {
        self.eligible_ids.contains(&entity_id) || self.completed_ids.contains(&entity_id)
    }

    /// Check the counter against the canonical tier order.
    ///
    /// # Errors
    /// Returns [`EngineError::Validation`] when the current value is negative or
    /// non-finite, a threshold names a tier outside `tier_sequence`, or thresholds
    /// decrease along the canonical order.
    pub fn validate(&self, tier_sequence: &[String]) -> Result<(), EngineError> {
        if !self.current_value.is_finite() || self.current_value < 0.0 {
            return Err(EngineError::Validation(format!(
                "counter {} current_value MUST be a non-negative number",
                self.id
            )));
        }

        for (tier, value) in &self.thresholds {
            if !tier_sequence.iter().any(|known| known == tier) {
                return Err(EngineError::Validation(format!(
                    "counter {} threshold tier `{tier}` is not in the tier sequence",
                    self.id
                )));
            }
            if !value.is_finite() {
                return Err(EngineError::Validation(format!(
                    "counter {} threshold for `{tier}` MUST be finite",
                    self.id
                )));
            }
        }

        let mut previous: Option<(&str, f64)> = None;
        for tier in tier_sequence {
            let Some(value) = self.threshold(tier) else {
                continue;
            };
            if let Some((previous_tier, previous_value)) = previous {
                if value < previous_value {
                    return Err(EngineError::Validation(format!(
                        "counter {} thresholds MUST be non-decreasing: {tier}={value} < {previous_tier}={previous_value}",
                        self.id
                    )));
                }
            }
            previous = Some((tier.as_str(), value));
        }

        Ok(())
    }
}

/// A trackable roster member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub archetypes: Vec<String>,
}

impl Entity {
    #[must_use]
    pub fn has_archetype(&self, archetype: &str) -> bool {
        self.archetypes.iter().any(|tag| tag.eq_ignore_ascii_case(archetype))
    }
}

/// Per-entity level progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressionRecord {
    pub entity_id: EntityId,
    pub level: u32,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub points_since_last_level: i64,
    #[serde(default)]
    pub points_until_next_level: i64,
}

impl ProgressionRecord {
    /// Stand-in for an entity that has never progressed.
    #[must_use]
    pub fn untouched(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            level: 0,
            points: 0,
            points_since_last_level: 0,
            points_until_next_level: 0,
        }
    }

    /// A zero until-next marks the level cap. Level 0 is excluded: that is the untouched
    /// stand-in, whose zero until-next means "no data" rather than "capped".
    #[must_use]
    pub fn is_max_level(&self) -> bool {
        self.level > 0 && self.points_until_next_level <= 0
    }

    /// # Errors
    /// Returns [`EngineError::Validation`] when points since the last level are negative.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.points_since_last_level < 0 {
            return Err(EngineError::Validation(format!(
                "entity {} points_since_last_level MUST be >= 0",
                self.entity_id
            )));
        }
        Ok(())
    }
}

/// One collectible tracker inside a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub current_value: f64,
    /// Static milestone table; the target is the sum of its leading entries.
    #[serde(default)]
    pub milestones: Vec<f64>,
    #[serde(default)]
    pub is_retired: bool,
}

impl SubItem {
    #[must_use]
    pub fn target(&self, milestone_sum_len: usize) -> f64 {
        self.milestones
            .iter()
            .take(milestone_sum_len)
            .copied()
            .filter(|value| value.is_finite())
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub owner_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub owned_count: u32,
    #[serde(default)]
    pub items: Vec<SubItem>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    NoRarity,
    Epic,
    Legendary,
    Mythic,
    Ultimate,
}

impl Rarity {
    /// Parse a client rarity tag such as `kEpic`; unknown tags are treated as no rarity.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim_start_matches('k').to_ascii_lowercase().as_str() {
            "epic" => Self::Epic,
            "legendary" => Self::Legendary,
            "mythic" => Self::Mythic,
            "ultimate" => Self::Ultimate,
            _ => Self::NoRarity,
        }
    }
}

fn default_rarity_tag() -> String {
    "kNoRarity".to_string()
}

/// A cosmetic that can be owned, or obtained through the exchange queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogueItem {
    pub id: ItemId,
    pub owner_id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_base: bool,
    #[serde(default = "default_rarity_tag")]
    pub rarity: String,
    #[serde(default)]
    pub is_legacy: bool,
    #[serde(default)]
    pub owned: bool,
    #[serde(default)]
    pub in_queue: bool,
}

impl CatalogueItem {
    #[must_use]
    pub fn rarity(&self) -> Rarity {
        Rarity::from_tag(&self.rarity)
    }

    /// Queued and not already owned.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.in_queue && !self.owned
    }
}
