mod create;
mod membership;
mod settings;

use super::{user_err, CommandResult, Context};

/// Create, join and configure leagues.
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "create::create",
        "membership::join",
        "membership::list",
        "membership::role",
        "settings::pairs",
        "settings::rules"
    )
)]
pub async fn league(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/league` subcommands"))
}
