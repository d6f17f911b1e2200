use poise::{
    serenity_prelude::{Mentionable, User},
    CreateReply,
};

use crate::{
    commands::{
        arguments::{LeagueSlug, RunTime, TrimmedText},
        guild_league, user_err, ApplicationContext, CommandError, CommandResult, Context,
    },
    models::{types::UtcDateTime, League},
    schedule::season_week,
    utils::formatting::{format_distance, format_elapsed},
    workflow::RunSubmission,
};

#[poise::command(slash_command, guild_only, subcommands("submit", "review"))]
pub async fn run(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/run` subcommands"))
}

/// Submit your time for a time trial session.
#[poise::command(slash_command, ephemeral)]
pub async fn submit(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
    #[description = "Your time: `24:05`, `1:02:30` or `1h 2m 30s`."] time: RunTime,
    #[description = "Season week. Defaults to the current week."]
    #[min = 1]
    week: Option<u32>,
    #[description = "Distance you ran, in kilometres. Defaults to the session distance."]
    #[min = 0.1]
    #[max = 500.0]
    distance_km: Option<f64>,
    #[description = "A link to your activity."] proof: Option<TrimmedText>,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;
    let now = UtcDateTime::now();
    let week = week_or_current(&league, week, now)?;
    let session = ctx.data.runs.session_for_week(&league, week).await?;

    let outcome = ctx
        .data
        .runs
        .submit_run(
            session.id,
            ctx.author().id,
            RunSubmission {
                elapsed_seconds: time.seconds(),
                distance_m: distance_km.map(|km| km * 1000.0),
                proof: proof.map(String::from),
            },
            now,
        )
        .await?;

    let distance = outcome.run.distance_m.unwrap_or(session.distance_m);
    let mut message = format!(
        "# Run recorded\n{} over {} in week {week}",
        format_elapsed(outcome.run.elapsed_seconds),
        format_distance(distance)
    );
    if outcome.requires_review {
        message += "\nAn admin has to approve it before it counts.";
    }

    ctx.send(CreateReply::default().content(message).ephemeral(true))
        .await?;

    Ok(())
}

/// Approve or reject a submitted run. Admins only.
#[poise::command(slash_command, ephemeral)]
pub async fn review(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
    #[description = "Season week."]
    #[min = 1]
    week: u32,
    #[description = "Whose run to review."] runner: User,
    #[description = "Whether the run counts."] approve: bool,
    #[description = "A note for the runner."] note: Option<TrimmedText>,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;
    let session = ctx.data.runs.session_for_week(&league, week).await?;

    let outcome = ctx
        .data
        .runs
        .review_run(
            session.id,
            runner.id,
            ctx.author().id,
            approve,
            note.map(String::from),
            UtcDateTime::now(),
        )
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "Run of {} in week {week} is now {}.",
                runner.mention(),
                outcome.run.status
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

pub(super) fn week_or_current(
    league: &League,
    week: Option<u32>,
    now: UtcDateTime,
) -> Result<u32, CommandError> {
    match week {
        Some(week) => Ok(week),
        None => season_week(league.start_date, league.season_weeks, now).ok_or(user_err(format!(
            "{} is not running this week, please give the week explicitly",
            league.display_name
        ))),
    }
}
