use poise::serenity_prelude::UserId;
use serde::Serialize;
use strum::{Display, EnumString};

use super::{fixture::FixtureId, league::LeagueId, types::UtcDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    TimeTrial,
}

/// How timed runs are compared in standings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Lowest total time wins.
    #[default]
    AbsolutePerformance,
    /// Biggest week-over-week pace improvement wins.
    PersonalProgress,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Open,
    Closed,
    Finalized,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunningSession {
    pub id: SessionId,
    pub league_id: LeagueId,
    pub week: u32,
    pub session_type: SessionType,
    pub distance_m: f64,
    pub comparison_mode: ComparisonMode,
    pub status: SessionStatus,
    pub deadline: UtcDateTime,
    pub fixture_id: Option<FixtureId>,
}

#[derive(Clone, Debug)]
pub struct NewSession {
    pub league_id: LeagueId,
    pub week: u32,
    pub session_type: SessionType,
    pub distance_m: f64,
    pub comparison_mode: ComparisonMode,
    pub deadline: UtcDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Submitted,
    Approved,
    Rejected,
    Finalized,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRun {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub elapsed_seconds: i64,
    pub distance_m: Option<f64>,
    pub proof: Option<String>,
    pub status: RunStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<UtcDateTime>,
    pub review_note: Option<String>,
    pub submitted_at: UtcDateTime,
}

#[derive(Clone, Debug)]
pub struct NewRun {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub elapsed_seconds: i64,
    pub distance_m: Option<f64>,
    pub proof: Option<String>,
    pub status: RunStatus,
    pub submitted_at: UtcDateTime,
}
