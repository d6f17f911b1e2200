use poise::{CreateReply, FrameworkError};
use tracing::{debug, error, warn};

use crate::{commands::CommandError, BotState};

type LeagueFrameworkError<'a> = FrameworkError<'a, BotState, CommandError>;
type LeagueContext<'a> = poise::Context<'a, BotState, CommandError>;

/// What the invoking user gets to see about a failure.
enum Notice {
    /// The request was refused. The text is shown as is.
    Refused(String),
    /// The bot failed. The text goes below a generic apology.
    Failed(String),
}

pub async fn handle_error(error: LeagueFrameworkError<'_>) {
    let ctx = error.ctx();

    let Some(notice) = triage(error) else {
        return;
    };

    if let Some(ctx) = ctx {
        send_notice(ctx, notice).await;
    }
}

/// Logs the failure and decides what, if anything, to tell the user.
fn triage(error: LeagueFrameworkError<'_>) -> Option<Notice> {
    use FrameworkError::*;

    match error {
        Command { error, ctx, .. } => match error {
            CommandError::User { message } | CommandError::InvalidArgument { message } => {
                debug!(
                    "/{} refused for {}: {message}",
                    ctx.command().qualified_name,
                    ctx.author().name
                );
                Some(Notice::Refused(message))
            }
            CommandError::Internal { message } => {
                error!("/{} failed: {message}", ctx.command().qualified_name);
                Some(Notice::Failed(message))
            }
            CommandError::Serenity(error) => {
                error!("/{} hit a Discord error: {error}", ctx.command().qualified_name);
                Some(Notice::Failed(error.to_string()))
            }
        },

        ArgumentParse {
            error, input, ctx, ..
        } => {
            let command = &ctx.command().qualified_name;
            let hint = ctx
                .command()
                .help_text
                .clone()
                .unwrap_or_else(|| format!("Try `/help {command}` for the expected arguments."));

            Some(Notice::Refused(match input {
                Some(input) => format!("**`{input}` is not a valid argument: {error}**\n{hint}"),
                None => format!("**{error}**\n{hint}"),
            }))
        }

        GuildOnly { .. } => Some(Notice::Refused(
            "Leagues belong to servers, so use this command in one.".to_string(),
        )),

        MissingUserPermissions { ctx, .. } => {
            debug!(
                "{} lacks permissions for /{}",
                ctx.author().name,
                ctx.command().qualified_name
            );
            Some(Notice::Refused(
                "You need more server permissions to use this command.".to_string(),
            ))
        }

        MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!(
                "Missing bot permissions for /{}: {missing_permissions}",
                ctx.command().qualified_name
            );
            Some(Notice::Refused(format!(
                "Ask a server admin to grant the bot these permissions first: {missing_permissions}."
            )))
        }

        NotAnOwner { .. } => Some(Notice::Refused(
            "This command is reserved for the bot owners.".to_string(),
        )),

        CooldownHit {
            remaining_cooldown, ..
        } => Some(Notice::Refused(format!(
            "Slow down a little, this command is available again in {}s.",
            remaining_cooldown.as_secs().max(1)
        ))),

        CommandCheckFailed { error, .. } => Some(Notice::Refused(match error {
            Some(error) => format!("This command can't be used right now: {error}"),
            None => "This command can't be used right now.".to_string(),
        })),

        CommandStructureMismatch {
            description, ctx, ..
        } => {
            error!(
                "Registered /{} is out of sync with the bot: {description}",
                ctx.command.qualified_name
            );
            None
        }

        Setup { error, .. } => {
            error!("Bot setup failed: {error}");
            None
        }

        EventHandler { error, event, .. } => {
            error!("Handling {} failed: {error}", event.snake_case_name());
            None
        }

        UnknownInteraction { interaction, .. } => {
            warn!("Unknown interaction /{}", interaction.data.name);
            None
        }

        other => {
            error!("Unhandled framework error: {other}");
            None
        }
    }
}

async fn send_notice(ctx: LeagueContext<'_>, notice: Notice) {
    let content = match notice {
        Notice::Refused(message) => message,
        Notice::Failed(message) => format!(
            "Something broke on the bot's side: {message}\nTry again later, or tell a league admin if it keeps happening."
        ),
    };

    let sent = poise::send_reply(ctx, CreateReply::default().content(&content).ephemeral(true)).await;
    if let Err(send_error) = sent {
        error!("Could not deliver an error notice ({send_error}): {content}");
    }
}
