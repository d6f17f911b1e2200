mod arguments;
mod league;
mod result;
mod run;
mod schedule;
mod session;
mod standings;
mod user;

use tracing::error;

use crate::{models::League, workflow::WorkflowError, BotState};

use arguments::LeagueSlug;

pub use league::league;
pub use result::result;
pub use run::run;
pub use schedule::schedule;
pub use session::session;
pub use standings::standings;
pub use user::help;

type CommandResult = Result<(), CommandError>;
type Context<'a> = poise::Context<'a, BotState, CommandError>;
type ApplicationContext<'a> = poise::ApplicationContext<'a, BotState, CommandError>;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("{message}")]
    User { message: String },
    #[error("{message}")]
    Internal { message: String },
    #[error("{message}")]
    InvalidArgument { message: String },
    #[error(transparent)]
    Serenity(#[from] serenity::Error),
}

impl From<WorkflowError> for CommandError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::Validation(message)
            | WorkflowError::Unauthorized(message)
            | WorkflowError::Conflict(message)
            | WorkflowError::NotFound(message) => CommandError::User { message },
            WorkflowError::Storage(err) => {
                error!("Storage failure: {err:#}");
                internal_err("Could not reach the league database")
            }
        }
    }
}

fn user_err(message: impl Into<String>) -> CommandError {
    CommandError::User {
        message: message.into(),
    }
}

fn internal_err(message: impl Into<String>) -> CommandError {
    CommandError::Internal {
        message: message.into(),
    }
}

/// Looks a league up by slug in the guild the command was invoked in.
async fn guild_league(ctx: ApplicationContext<'_>, slug: &LeagueSlug) -> Result<League, CommandError> {
    let guild = ctx
        .guild_id()
        .ok_or(internal_err("This command should be executed only in a guild"))?;

    Ok(ctx.data.leagues.find_league(guild, slug.as_ref()).await?)
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use test_log::test;

    use crate::workflow::WorkflowError;

    use super::CommandError;

    #[test]
    fn rejected_preconditions_reach_the_user() {
        let error = CommandError::from(WorkflowError::Conflict("Already finalized".to_string()));
        assert!(matches!(error, CommandError::User { message } if message == "Already finalized"));
    }

    #[test]
    fn storage_failures_are_internal() {
        let error = CommandError::from(WorkflowError::Storage(anyhow!("disk is full")));
        assert!(matches!(error, CommandError::Internal { .. }));
    }
}
