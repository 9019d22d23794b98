use serde::{Deserialize, Serialize};

use crate::{clamp_percent, finite_or_zero, Counter, CounterId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Below the next threshold.
    Progressing,
    /// At or past the next threshold; advances on the next refresh.
    ReadyToAdvance,
    /// Already on the terminal tier.
    Terminal,
    /// Declared tier is not in the tier sequence.
    Unresolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierResolution {
    pub counter_id: CounterId,
    pub current_tier: String,
    pub next_tier: String,
    pub next_threshold: f64,
    pub distance: f64,
    pub status: ResolutionStatus,
}

/// Resolve a counter's position on the tier ladder.
///
/// The next threshold falls back to the highest declared threshold when the next tier
/// has no entry, then to the counter's own value when nothing is declared. A tier that
/// is not in `tier_sequence` resolves to itself with zero distance.
#[must_use]
pub fn resolve(counter: &Counter, tier_sequence: &[String]) -> TierResolution {
    let current_value = finite_or_zero(counter.current_value);
    let position = tier_sequence.iter().position(|tier| *tier == counter.current_tier);

    let Some(position) = position else {
        return TierResolution {
            counter_id: counter.id,
            current_tier: counter.current_tier.clone(),
            next_tier: counter.current_tier.clone(),
            next_threshold: current_value,
            distance: 0.0,
            status: ResolutionStatus::Unresolved,
        };
    };

    let is_terminal = position + 1 >= tier_sequence.len();
    let next_tier = if is_terminal {
        tier_sequence[tier_sequence.len() - 1].clone()
    } else {
        tier_sequence[position + 1].clone()
    };

    let next_threshold = counter
        .threshold(&next_tier)
        .or_else(|| counter.highest_threshold())
        .unwrap_or(current_value);
    let distance = (next_threshold - current_value).max(0.0);

    let status = if is_terminal {
        ResolutionStatus::Terminal
    } else if distance <= 0.0 {
        ResolutionStatus::ReadyToAdvance
    } else {
        ResolutionStatus::Progressing
    };

    TierResolution {
        counter_id: counter.id,
        current_tier: counter.current_tier.clone(),
        next_tier,
        next_threshold,
        distance,
        status,
    }
}

/// Full range of the counter: its highest declared threshold, or 0 without thresholds.
#[must_use]
pub fn span(counter: &Counter) -> f64 {
    counter.highest_threshold().unwrap_or(0.0).max(0.0)
}

/// Percentage of the way to the resolved next threshold, clamped to `[0, 100]`.
#[must_use]
pub fn progress_percent(counter: &Counter, resolution: &TierResolution) -> f64 {
    if resolution.next_threshold <= 0.0 {
        return 100.0;
    }
    clamp_percent(finite_or_zero(counter.current_value) / resolution.next_threshold * 100.0)
}

/// Current value measured against one fixed tier (e.g. the MASTER requirement).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gauge {
    pub counter_id: CounterId,
    pub current: f64,
    pub requirement: Option<f64>,
    pub percent: f64,
}

#[must_use]
pub fn requirement_gauge(counter: &Counter, requirement_tier: &str) -> Gauge {
    let current = finite_or_zero(counter.current_value);
    let requirement = counter.threshold(requirement_tier).or_else(|| counter.highest_threshold());
    let percent = match requirement {
        Some(requirement) if requirement > 0.0 => clamp_percent(current / requirement * 100.0),
        Some(_) => 100.0,
        None => 0.0,
    };
    Gauge { counter_id: counter.id, current, requirement, percent }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::IdListType;

    fn sequence(tiers: &[&str]) -> Vec<String> {
        tiers.iter().map(ToString::to_string).collect()
    }

    fn mk_counter(current_value: f64, current_tier: &str, thresholds: &[(&str, f64)]) -> Counter {
        Counter {
            id: CounterId(101),
            name: "Fixture".to_string(),
            description: String::new(),
            current_value,
            current_tier: current_tier.to_string(),
            thresholds: thresholds.iter().map(|(tier, value)| ((*tier).to_string(), *value)).collect(),
            eligible_ids: vec![],
            completed_ids: vec![],
            id_list_type: IdListType::None,
            category: String::new(),
            is_capstone: false,
            capstone_group: None,
            parent_id: None,
            points_awarded: 0,
        }
    }

    #[test]
    fn bronze_counter_resolves_to_silver_distance() {
        let counter =
            mk_counter(47.0, "BRONZE", &[("BRONZE", 10.0), ("SILVER", 50.0), ("GOLD", 100.0)]);
        let resolution = resolve(&counter, &sequence(&["BRONZE", "SILVER", "GOLD"]));
        assert_eq!(resolution.next_tier, "SILVER");
        assert!((resolution.next_threshold - 50.0).abs() < f64::EPSILON);
        assert!((resolution.distance - 3.0).abs() < f64::EPSILON);
        assert_eq!(resolution.status, ResolutionStatus::Progressing);
    }

    #[test]
    fn sparse_table_falls_back_to_highest_threshold() {
        let counter = mk_counter(47.0, "BRONZE", &[("BRONZE", 10.0), ("GOLD", 100.0)]);
        let resolution = resolve(&counter, &sequence(&["BRONZE", "SILVER", "GOLD"]));
        assert_eq!(resolution.next_tier, "SILVER");
        assert!((resolution.next_threshold - 100.0).abs() < f64::EPSILON);
        assert!((resolution.distance - 53.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counter_without_thresholds_falls_back_to_current_value() {
        let counter = mk_counter(12.0, "BRONZE", &[]);
        let resolution = resolve(&counter, &sequence(&["BRONZE", "SILVER"]));
        assert!((resolution.next_threshold - 12.0).abs() < f64::EPSILON);
        assert!(resolution.distance.abs() < f64::EPSILON);
        assert_eq!(resolution.status, ResolutionStatus::ReadyToAdvance);
    }

    #[test]
    fn terminal_tier_stays_on_terminal() {
        let counter = mk_counter(120.0, "GOLD", &[("GOLD", 100.0)]);
        let resolution = resolve(&counter, &sequence(&["BRONZE", "SILVER", "GOLD"]));
        assert_eq!(resolution.next_tier, "GOLD");
        assert!(resolution.distance.abs() < f64::EPSILON);
        assert_eq!(resolution.status, ResolutionStatus::Terminal);
    }

    #[test]
    fn unknown_tier_resolves_with_zero_distance() {
        let counter = mk_counter(5.0, "LEGEND", &[("GOLD", 100.0)]);
        let resolution = resolve(&counter, &sequence(&["BRONZE", "SILVER", "GOLD"]));
        assert_eq!(resolution.status, ResolutionStatus::Unresolved);
        assert_eq!(resolution.next_tier, "LEGEND");
        assert!(resolution.distance.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_sequence_is_unresolved() {
        let counter = mk_counter(5.0, "GOLD", &[("GOLD", 100.0)]);
        let resolution = resolve(&counter, &[]);
        assert_eq!(resolution.status, ResolutionStatus::Unresolved);
    }

    #[test]
    fn progress_percent_clamps_and_handles_zero_threshold() {
        let counter = mk_counter(150.0, "BRONZE", &[("SILVER", 100.0)]);
        let tiers = sequence(&["BRONZE", "SILVER"]);
        let resolution = resolve(&counter, &tiers);
        assert!((progress_percent(&counter, &resolution) - 100.0).abs() < f64::EPSILON);

        let zero = mk_counter(0.0, "BRONZE", &[]);
        let resolution = resolve(&zero, &tiers);
        assert!((progress_percent(&zero, &resolution) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn requirement_gauge_measures_against_requirement_tier() {
        let counter = mk_counter(30.0, "GOLD", &[("GOLD", 20.0), ("MASTER", 120.0)]);
        let gauge = requirement_gauge(&counter, "MASTER");
        assert_eq!(gauge.requirement, Some(120.0));
        assert!((gauge.percent - 25.0).abs() < 1e-9);

        let bare = mk_counter(30.0, "GOLD", &[]);
        let gauge = requirement_gauge(&bare, "MASTER");
        assert_eq!(gauge.requirement, None);
        assert!(gauge.percent.abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn property_distance_is_never_negative(
            current in 0.0_f64..10_000.0,
            tier_index in 0_usize..5,
            raw_thresholds in proptest::collection::vec(0.0_f64..10_000.0, 0..5),
        ) {
            let tiers = sequence(&["IRON", "BRONZE", "SILVER", "GOLD", "MASTER"]);
            let mut sorted = raw_thresholds;
            sorted.sort_by(f64::total_cmp);
            let thresholds = tiers
                .iter()
                .zip(sorted)
                .map(|(tier, value)| (tier.as_str(), value))
                .collect::<Vec<_>>();
            let counter = mk_counter(current, &tiers[tier_index], &thresholds);
            let resolution = resolve(&counter, &tiers);
            prop_assert!(resolution.distance >= 0.0);
            let percent = progress_percent(&counter, &resolution);
            prop_assert!((0.0..=100.0).contains(&percent));
        }
    }
}
