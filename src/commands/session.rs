use poise::CreateReply;

use crate::{
    commands::{
        arguments::LeagueSlug, guild_league, run::week_or_current, user_err, ApplicationContext,
        CommandResult, Context,
    },
    models::types::UtcDateTime,
    utils::formatting::format_elapsed,
};

#[poise::command(slash_command, guild_only, subcommands("finalize"))]
pub async fn session(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/session` subcommands"))
}

/// Close a time trial session and lock its runs into the standings. Admins only.
#[poise::command(slash_command)]
pub async fn finalize(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
    #[description = "Season week. Defaults to the current week."]
    #[min = 1]
    week: Option<u32>,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;
    let week = week_or_current(&league, week, UtcDateTime::now())?;
    let session = ctx.data.runs.session_for_week(&league, week).await?;

    let outcome = ctx
        .data
        .runs
        .finalize_session(session.id, ctx.author().id)
        .await?;

    let mut content = format!(
        "# Week {week} of {} is final\n{} runs count",
        league.display_name,
        outcome.finalized_runs.len()
    );

    let mut runs = outcome.finalized_runs;
    runs.sort_by_key(|run| run.elapsed_seconds);
    for (position, run) in runs.iter().enumerate() {
        content += &format!(
            "\n{}. <@{}> {}",
            position + 1,
            run.user_id,
            format_elapsed(run.elapsed_seconds)
        );
    }

    if outcome.requires_review {
        content += "\n\nSome runs were never reviewed and don't count.";
    }

    ctx.send(CreateReply::default().content(content)).await?;

    Ok(())
}
