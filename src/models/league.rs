use std::{fmt::Display, str::FromStr};

use poise::serenity_prelude::{GuildId, UserId};
use serde::Serialize;
use strum::{Display, EnumString};
use time::Date;

use crate::rules::Rules;

use super::types::UtcDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LeagueId(pub u64);

/// How results of a league are scored and ranked.
///
/// Formats the bot does not know about are kept verbatim in [`ScoringFormat::Other`]
/// so that leagues created by other tools still load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringFormat {
    TeamVsTeam,
    IndividualTime,
    IndividualPoints,
    Singles,
    Doubles,
    Other(String),
}

impl ScoringFormat {
    pub fn as_str(&self) -> &str {
        use ScoringFormat::*;

        match self {
            TeamVsTeam => "team_vs_team",
            IndividualTime => "individual_time",
            IndividualPoints => "individual_points",
            Singles => "singles",
            Doubles => "doubles",
            Other(name) => name,
        }
    }
}

impl Display for ScoringFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ScoringFormat::*;

        Ok(match s {
            "team_vs_team" => TeamVsTeam,
            "individual_time" => IndividualTime,
            "individual_points" => IndividualPoints,
            "singles" => Singles,
            "doubles" => Doubles,
            other => Other(other.to_string()),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RotationType {
    Random,
    Assigned,
}

#[derive(Clone, Debug)]
pub struct League {
    pub id: LeagueId,
    pub guild: GuildId,
    pub slug: String,
    pub display_name: String,
    pub sport: String,
    pub scoring_format: ScoringFormat,
    pub rotation_type: RotationType,
    pub season_weeks: u32,
    pub start_date: Date,
    pub rules: Rules,
    pub created_by: UserId,
}

#[derive(Debug)]
pub struct NewLeague {
    pub guild: GuildId,
    pub slug: String,
    pub display_name: String,
    pub sport: String,
    pub scoring_format: ScoringFormat,
    pub rotation_type: RotationType,
    pub season_weeks: u32,
    pub start_date: Date,
    pub rules: Rules,
    pub created_by: UserId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl MemberRole {
    /// Owners and admins organize the league.
    pub fn is_admin(self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

#[derive(Clone, Debug)]
pub struct Member {
    pub league_id: LeagueId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: UtcDateTime,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{MemberRole, ScoringFormat};

    #[test]
    fn known_formats_round_trip_through_strings() {
        for format in [
            ScoringFormat::TeamVsTeam,
            ScoringFormat::IndividualTime,
            ScoringFormat::IndividualPoints,
            ScoringFormat::Singles,
            ScoringFormat::Doubles,
        ] {
            assert_eq!(ScoringFormat::from_str(format.as_str()).unwrap(), format);
        }
    }

    #[test]
    fn unknown_format_is_kept() {
        assert_eq!(
            ScoringFormat::from_str("relay").unwrap(),
            ScoringFormat::Other("relay".to_string())
        );
    }

    #[test]
    fn admin_roles() {
        assert!(MemberRole::Owner.is_admin());
        assert!(MemberRole::Admin.is_admin());
        assert!(!MemberRole::Member.is_admin());
        assert_eq!(MemberRole::from_str("admin").unwrap(), MemberRole::Admin);
    }
}
