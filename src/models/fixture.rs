use poise::serenity_prelude::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use super::{league::LeagueId, result_payload::ResultPayload, types::UtcDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FixtureId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FixtureType {
    LeagueMatch,
    TimeTrialSession,
}

/// Fixture lifecycle.
///
/// ```text
/// scheduled -> submitted -> confirmed -> finalized
///     \            \            \
///      +------------+------------+--> disputed
/// ```
///
/// `finalized` and `cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FixtureStatus {
    Scheduled,
    Submitted,
    Confirmed,
    Disputed,
    Finalized,
    Cancelled,
}

impl FixtureStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FixtureStatus::Finalized | FixtureStatus::Cancelled)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Provenance of a generated fixture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub generated_by: String,
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub reason: String,
    pub resolved_by: u64,
    pub submission_id: u64,
}

/// Free-form fixture metadata. Known keys are typed, everything else is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<ResultPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_elapsed_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_user_id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug)]
pub struct Fixture {
    pub id: FixtureId,
    pub league_id: LeagueId,
    pub week: u32,
    pub starts_at: UtcDateTime,
    pub ends_at: UtcDateTime,
    pub fixture_type: FixtureType,
    pub status: FixtureStatus,
    pub metadata: FixtureMetadata,
}

#[derive(Clone, Debug)]
pub struct NewFixture {
    pub league_id: LeagueId,
    pub week: u32,
    pub starts_at: UtcDateTime,
    pub ends_at: UtcDateTime,
    pub fixture_type: FixtureType,
    pub metadata: FixtureMetadata,
}

pub const PLAYER_ROLE: &str = "player";

#[derive(Clone, Debug, PartialEq)]
pub struct FixtureParticipant {
    pub fixture_id: FixtureId,
    pub user_id: UserId,
    pub side: Side,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{FixtureMetadata, FixtureStatus, Side};

    #[test]
    fn terminal_statuses() {
        assert!(FixtureStatus::Finalized.is_terminal());
        assert!(FixtureStatus::Cancelled.is_terminal());
        assert!(!FixtureStatus::Disputed.is_terminal());
        assert!(!FixtureStatus::Scheduled.is_terminal());
    }

    #[test]
    fn opposite_side() {
        assert_eq!(Side::A.opposite(), Side::B);
        assert_eq!(Side::B.opposite(), Side::A);
    }

    #[test]
    fn metadata_keeps_unknown_keys() {
        let raw = json!({
            "generation": { "generated_by": "schedule_generator", "algorithm": "singles_round_robin", "round": 2 },
            "court": "North 3",
        });

        let metadata: FixtureMetadata = serde_json::from_value(raw).unwrap();
        assert_eq!(metadata.generation.as_ref().unwrap().round, Some(2));
        assert_eq!(metadata.extra.get("court"), Some(&json!("North 3")));

        let back = serde_json::to_value(&metadata).unwrap();
        assert_eq!(back["court"], json!("North 3"));
        assert!(back.get("final_result").is_none());
    }
}
