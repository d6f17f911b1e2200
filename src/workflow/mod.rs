//! League operations that enforce roles and state transitions on top of the repositories.

mod leagues;
mod results;
mod runs;
mod schedule;

use poise::serenity_prelude::UserId;
use thiserror::Error;
use tracing::debug;

use crate::{
    models::{League, LeagueId, Member, PayloadError},
    repository::LeagueRepository,
    rules::RulesError,
    schedule::ScheduleError,
};

pub use leagues::{CreateLeague, LeagueService, RunningRulesUpdate};
pub use results::{ResolveInput, ResultOutcome, ResultWorkflow};
pub use runs::{RunSubmission, RunWorkflow};
pub use schedule::{ScheduleService, WeekFixture};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<ScheduleError> for WorkflowError {
    fn from(value: ScheduleError) -> Self {
        WorkflowError::Validation(value.to_string())
    }
}

impl From<RulesError> for WorkflowError {
    fn from(value: RulesError) -> Self {
        WorkflowError::Validation(value.to_string())
    }
}

impl From<PayloadError> for WorkflowError {
    fn from(value: PayloadError) -> Self {
        WorkflowError::Validation(value.to_string())
    }
}

async fn load_league(leagues: &LeagueRepository, id: LeagueId) -> WorkflowResult<League> {
    leagues
        .get_league(id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound(format!("League {} does not exist", id.0)))
}

async fn require_member(
    leagues: &LeagueRepository,
    league: &League,
    user: UserId,
) -> WorkflowResult<Member> {
    match leagues.get_member(league.id, user).await? {
        Some(member) => Ok(member),
        None => {
            debug!("User {user} is not a member of league {}", league.slug);
            Err(WorkflowError::Unauthorized(format!(
                "You are not a member of {}",
                league.display_name
            )))
        }
    }
}

async fn require_admin(
    leagues: &LeagueRepository,
    league: &League,
    user: UserId,
) -> WorkflowResult<Member> {
    let member = require_member(leagues, league, user).await?;
    if member.role.is_admin() {
        Ok(member)
    } else {
        debug!("User {user} is not an admin of league {}", league.slug);
        Err(WorkflowError::Unauthorized(format!(
            "Only owners and admins of {} can do this",
            league.display_name
        )))
    }
}
