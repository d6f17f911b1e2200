use poise::CreateReply;

use crate::{
    commands::{arguments::LeagueSlug, guild_league, user_err, ApplicationContext, CommandResult, Context},
    models::{FixtureType, ScoringFormat, Side},
    utils::formatting::{format_countdown, format_distance},
    workflow::WeekFixture,
};

#[poise::command(
    slash_command,
    guild_only,
    subcommands("generate", "week")
)]
pub async fn schedule(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/schedule` subcommands"))
}

/// Generate the season schedule from the current roster. Admins only.
#[poise::command(slash_command, ephemeral)]
pub async fn generate(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;

    let outcome = ctx
        .data
        .schedule
        .generate_schedule(league.id, ctx.author().id)
        .await?;

    let mut content = format!(
        "# Schedule of {} is ready\n{} fixtures over {} weeks",
        league.display_name, outcome.fixtures_created, league.season_weeks
    );
    if outcome.sessions_created > 0 {
        content += &format!(", {} time trial sessions", outcome.sessions_created);
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Show the fixtures of a week.
#[poise::command(slash_command)]
pub async fn week(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
    #[description = "Season week, starting at 1."]
    #[min = 1]
    week: u32,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;

    let fixtures = ctx.data.schedule.week_fixtures(league.id, week).await?;

    if fixtures.is_empty() {
        ctx.send(
            CreateReply::default()
                .content(format!(
                    "# {} has nothing scheduled in week {week}",
                    league.display_name
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut content = format!("# {}, week {week}\n", league.display_name);
    for week_fixture in &fixtures {
        content += &describe_fixture(week_fixture);
    }

    if league.scoring_format == ScoringFormat::IndividualTime {
        let session = ctx.data.runs.session_for_week(&league, week).await?;
        content += &format!(
            "\nTime trial: {}, submit with `/run submit` by {}. The session is {}.",
            format_distance(session.distance_m),
            format_countdown(session.deadline),
            session.status,
        );
    }

    ctx.send(CreateReply::default().content(content)).await?;

    Ok(())
}

fn describe_fixture(week_fixture: &WeekFixture) -> String {
    let fixture = &week_fixture.fixture;
    let side = |side: Side| {
        week_fixture
            .participants
            .iter()
            .filter(|participant| participant.side == side)
            .map(|participant| format!("<@{}>", participant.user_id))
            .collect::<Vec<_>>()
            .join(" & ")
    };

    match fixture.fixture_type {
        FixtureType::LeagueMatch => format!(
            " - `#{}` {} vs {} ({})\n",
            fixture.id.0,
            side(Side::A),
            side(Side::B),
            fixture.status
        ),
        other => format!(
            " - `#{}` {other} ({}), {} participants\n",
            fixture.id.0,
            fixture.status,
            week_fixture.participants.len()
        ),
    }
}
