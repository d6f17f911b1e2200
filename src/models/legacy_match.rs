use poise::serenity_prelude::UserId;

use super::{fixture::Side, league::LeagueId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId(pub u64);

/// A match recorded before the result workflow existed.
#[derive(Clone, Debug)]
pub struct LegacyMatch {
    pub id: MatchId,
    pub league_id: LeagueId,
    pub week: u32,
    pub completed: bool,
    pub winner: Option<Side>,
    pub participants: Vec<LegacyParticipant>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegacyParticipant {
    pub user_id: UserId,
    pub side: Option<Side>,
    pub score: Option<i64>,
    pub elapsed_seconds: Option<i64>,
    pub distance_m: Option<f64>,
    pub points: Option<f64>,
}
