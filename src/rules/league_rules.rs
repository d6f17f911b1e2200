use std::str::FromStr;

use poise::serenity_prelude::UserId;
use serde_json::{json, Value};

use crate::models::ComparisonMode;

use super::{Rules, RulesError};

pub const APPROVAL_PATH: &str = "running.require_approval";
pub const COMPARISON_MODE_PATH: &str = "running.comparison_mode";
pub const DISTANCE_PATH: &str = "running.distance_m";
pub const FIXED_PAIRS_PATH: &str = "doubles.pairs";

pub const DEFAULT_DISTANCE_M: f64 = 5000.0;

/// A doubles partnership configured ahead of the season.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FixedPair {
    pub first: UserId,
    pub second: UserId,
}

impl FixedPair {
    pub fn new(first: UserId, second: UserId) -> FixedPair {
        FixedPair { first, second }
    }

    pub fn members(&self) -> [UserId; 2] {
        [self.first, self.second]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunningRules {
    /// Runs wait for an organizer's review before they count.
    pub require_approval: bool,
    pub comparison_mode: ComparisonMode,
    pub distance_m: f64,
}

impl Default for RunningRules {
    fn default() -> Self {
        RunningRules {
            require_approval: false,
            comparison_mode: ComparisonMode::default(),
            distance_m: DEFAULT_DISTANCE_M,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DoublesRules {
    pub fixed_pairs: Vec<FixedPair>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeagueRules {
    pub running: RunningRules,
    pub doubles: DoublesRules,
}

impl LeagueRules {
    pub fn resolve(rules: &Rules) -> Result<LeagueRules, RulesError> {
        let defaults = RunningRules::default();

        let require_approval = rules
            .bool_at(APPROVAL_PATH)?
            .unwrap_or(defaults.require_approval);

        let comparison_mode = match rules.string_at(COMPARISON_MODE_PATH)? {
            None => defaults.comparison_mode,
            Some(mode) => ComparisonMode::from_str(mode).map_err(|_| RulesError::InvalidValue {
                path: COMPARISON_MODE_PATH.to_string(),
                message: format!(
                    "unknown comparison mode `{mode}`, expected `absolute_performance` or `personal_progress`"
                ),
            })?,
        };

        let distance_m = match rules.number_at(DISTANCE_PATH)? {
            None => defaults.distance_m,
            Some(distance) if distance.is_finite() && distance > 0.0 => distance,
            Some(distance) => {
                return Err(RulesError::InvalidValue {
                    path: DISTANCE_PATH.to_string(),
                    message: format!("distance must be positive, got {distance}"),
                })
            }
        };

        let fixed_pairs = match rules.array_at(FIXED_PAIRS_PATH)? {
            None => Vec::new(),
            Some(pairs) => pairs
                .iter()
                .enumerate()
                .map(|(index, pair)| parse_pair(index, pair))
                .collect::<Result<_, _>>()?,
        };

        Ok(LeagueRules {
            running: RunningRules {
                require_approval,
                comparison_mode,
                distance_m,
            },
            doubles: DoublesRules { fixed_pairs },
        })
    }
}

impl Rules {
    pub fn set_fixed_pairs(&mut self, pairs: &[FixedPair]) -> Result<(), RulesError> {
        let pairs = pairs
            .iter()
            .map(|pair| json!([pair.first.get(), pair.second.get()]))
            .collect();
        self.set_at(FIXED_PAIRS_PATH, Value::Array(pairs))
    }
}

fn parse_pair(index: usize, pair: &Value) -> Result<FixedPair, RulesError> {
    let invalid = |message: &str| RulesError::InvalidValue {
        path: format!("{FIXED_PAIRS_PATH}[{index}]"),
        message: message.to_string(),
    };

    let members = pair
        .as_array()
        .ok_or_else(|| invalid("a pair must be an array of two user ids"))?;

    let ids = members
        .iter()
        .map(|member| member.as_u64().filter(|id| *id > 0).map(UserId::new))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("user ids must be positive integers"))?;

    match ids.as_slice() {
        [first, second] => Ok(FixedPair::new(*first, *second)),
        _ => Err(invalid("a pair must have exactly two members")),
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::UserId;
    use serde_json::json;
    use test_log::test;

    use crate::{models::ComparisonMode, rules::Rules};

    use super::{FixedPair, LeagueRules, DEFAULT_DISTANCE_M};

    #[test]
    fn defaults_for_empty_rules() {
        let resolved = LeagueRules::resolve(&Rules::default()).unwrap();

        assert!(!resolved.running.require_approval);
        assert_eq!(
            resolved.running.comparison_mode,
            ComparisonMode::AbsolutePerformance
        );
        assert_eq!(resolved.running.distance_m, DEFAULT_DISTANCE_M);
        assert!(resolved.doubles.fixed_pairs.is_empty());
    }

    #[test]
    fn reads_configured_values() {
        let rules = Rules::from(json!({
            "running": {
                "require_approval": true,
                "comparison_mode": "personal_progress",
                "distance_m": 10000,
            },
            "doubles": { "pairs": [[1, 2], [3, 4]] },
        }));

        let resolved = LeagueRules::resolve(&rules).unwrap();
        assert!(resolved.running.require_approval);
        assert_eq!(
            resolved.running.comparison_mode,
            ComparisonMode::PersonalProgress
        );
        assert_eq!(resolved.running.distance_m, 10000.0);
        assert_eq!(
            resolved.doubles.fixed_pairs,
            vec![
                FixedPair::new(UserId::new(1), UserId::new(2)),
                FixedPair::new(UserId::new(3), UserId::new(4)),
            ]
        );
    }

    #[test]
    fn rejects_unknown_comparison_mode() {
        let rules = Rules::from(json!({ "running": { "comparison_mode": "fastest" } }));
        assert!(LeagueRules::resolve(&rules).is_err());
    }

    #[test]
    fn rejects_non_positive_distance() {
        let rules = Rules::from(json!({ "running": { "distance_m": 0 } }));
        assert!(LeagueRules::resolve(&rules).is_err());
    }

    #[test]
    fn rejects_malformed_pairs() {
        for pairs in [json!([[1]]), json!([[1, 2, 3]]), json!([[0, 2]]), json!([["1", "2"]])] {
            let rules = Rules::from(json!({ "doubles": { "pairs": pairs } }));
            assert!(LeagueRules::resolve(&rules).is_err(), "{pairs} should fail");
        }
    }

    #[test]
    fn fixed_pairs_are_written_back() {
        let mut rules = Rules::from(json!({ "running": { "require_approval": true } }));
        let pairs = [FixedPair::new(UserId::new(5), UserId::new(6))];
        rules.set_fixed_pairs(&pairs).unwrap();

        let resolved = LeagueRules::resolve(&rules).unwrap();
        assert_eq!(resolved.doubles.fixed_pairs, pairs.to_vec());
        assert!(resolved.running.require_approval);
    }
}
