use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Counter, CounterId, Entity, EntityId};

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Entity appears in a counter's eligible population.
    MemberOf { counter_id: CounterId, members: BTreeSet<EntityId> },
    /// Entity carries the archetype tag (case-insensitive).
    HasArchetype { archetype: String },
}

impl Predicate {
    #[must_use]
    pub fn member_of(counter: &Counter) -> Self {
        Self::MemberOf {
            counter_id: counter.id,
            members: counter.eligible_ids.iter().copied().collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Self::MemberOf { members, .. } => members.contains(&entity.id),
            Self::HasArchetype { archetype } => entity.has_archetype(archetype),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CategoryRule {
    pub label: String,
    pub predicates: Vec<Predicate>,
}

impl CategoryRule {
    /// A rule with no predicates never matches.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        !self.predicates.is_empty() && self.predicates.iter().all(|predicate| predicate.matches(entity))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntityCategory {
    Labeled { label: String },
    Uncategorized,
}

impl EntityCategory {
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Labeled { label } => Some(label.as_str()),
            Self::Uncategorized => None,
        }
    }
}

/// First matching rule wins.
#[must_use]
pub fn classify(entity: &Entity, rules: &[CategoryRule]) -> EntityCategory {
    rules
        .iter()
        .find(|rule| rule.matches(entity))
        .map_or(EntityCategory::Uncategorized, |rule| EntityCategory::Labeled { label: rule.label.clone() })
}

/// Every matching label, in rule order.
#[must_use]
pub fn categories_for(entity: &Entity, rules: &[CategoryRule]) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.matches(entity))
        .map(|rule| rule.label.clone())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Classification {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub category: EntityCategory,
}

#[must_use]
pub fn classify_all(entities: &[Entity], rules: &[CategoryRule]) -> Vec<Classification> {
    let mut classified = entities
        .iter()
        .map(|entity| Classification {
            entity_id: entity.id,
            entity_name: entity.name.clone(),
            category: classify(entity, rules),
        })
        .collect::<Vec<_>>();
    classified.sort_by_key(|entry| entry.entity_id);
    classified
}

/// One membership rule per non-capstone counter in `group`, ordered by counter id and
/// labelled with the counter name.
#[must_use]
pub fn group_rules(counters: &[Counter], group: &str) -> Vec<CategoryRule> {
    let mut members = counters
        .iter()
        .filter(|counter| !counter.is_capstone && counter.capstone_group.as_deref() == Some(group))
        .collect::<Vec<_>>();
    members.sort_by_key(|counter| counter.id);
    members
        .into_iter()
        .map(|counter| CategoryRule {
            label: counter.name.clone(),
            predicates: vec![Predicate::member_of(counter)],
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TeamCandidate {
    pub entity_id: EntityId,
    pub name: String,
    pub available: bool,
}

/// Mark every entity that satisfies all `predicates`. With no predicates everyone is
/// available. Available entities sort first, then by name.
#[must_use]
pub fn team_pool(entities: &[Entity], predicates: &[Predicate]) -> Vec<TeamCandidate> {
    let mut pool = entities
        .iter()
        .map(|entity| TeamCandidate {
            entity_id: entity.id,
            name: entity.name.clone(),
            available: predicates.iter().all(|predicate| predicate.matches(entity)),
        })
        .collect::<Vec<_>>();
    pool.sort_by(|lhs, rhs| {
        rhs.available
            .cmp(&lhs.available)
            .then_with(|| lhs.name.cmp(&rhs.name))
            .then_with(|| lhs.entity_id.cmp(&rhs.entity_id))
    });
    pool
}
