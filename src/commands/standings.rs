use poise::{
    serenity_prelude::{Colour, CreateEmbed},
    CreateReply,
};

use crate::{
    commands::{arguments::LeagueSlug, guild_league, ApplicationContext, CommandResult},
    models::{ComparisonMode, ScoringFormat},
    standings::{Standing, StandingsReport},
    utils::formatting::format_elapsed,
};

/// Discord caps embed descriptions, long tables are cut here.
const MAX_ROWS: usize = 50;

/// Show the current standings of a league.
#[poise::command(slash_command, guild_only)]
pub async fn standings(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;

    let report = ctx.data.standings.compute_standings(league.id).await?;

    let mut embed = CreateEmbed::new()
        .title(format!("{} standings", league.display_name))
        .colour(Colour::DARK_GREEN)
        .description(standings_table(&league.scoring_format, &report));

    if !report.team_standings.is_empty() {
        let teams = report
            .team_standings
            .iter()
            .take(MAX_ROWS)
            .map(|team| {
                format!(
                    "{}. <@{}> & <@{}> {}-{} ({}%)",
                    team.rank,
                    team.members[0],
                    team.members[1],
                    team.wins,
                    team.losses,
                    team.win_percentage
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("Teams", teams, false);
    }

    let sources = report.sources;
    embed = embed.field(
        "Counted",
        format!(
            "{} matches, {} fixtures, {} sessions",
            sources.legacy_completed_matches,
            sources.workflow_finalized_fixtures,
            sources.workflow_finalized_sessions
        ),
        false,
    );

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

fn standings_table(format: &ScoringFormat, report: &StandingsReport) -> String {
    if report.standings.is_empty() {
        return "Nobody has joined yet.".to_string();
    }

    report
        .standings
        .iter()
        .take(MAX_ROWS)
        .map(|standing| {
            format!(
                "{}. <@{}> {}",
                standing.rank,
                standing.user_id,
                standing_line(format, report.running_mode, standing)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn standing_line(
    format: &ScoringFormat,
    running_mode: Option<ComparisonMode>,
    standing: &Standing,
) -> String {
    match (format, running_mode) {
        (ScoringFormat::IndividualTime, Some(ComparisonMode::PersonalProgress)) => format!(
            "{:+.2}% over {} runs",
            standing.improvement_percent, standing.played
        ),
        (ScoringFormat::IndividualTime, _) if standing.played == 0 => "no runs".to_string(),
        (ScoringFormat::IndividualTime, _) => format!(
            "{} over {} runs",
            format_elapsed(standing.total_elapsed_seconds),
            standing.played
        ),
        (ScoringFormat::TeamVsTeam, _) => format!(
            "{} pts, {}-{}-{}, GD {:+}",
            standing.points, standing.wins, standing.draws, standing.losses, standing.goal_difference
        ),
        (ScoringFormat::IndividualPoints, _) => {
            format!("{} pts in {} matches", standing.points, standing.played)
        }
        _ => format!("{}-{}", standing.wins, standing.losses),
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::UserId;
    use test_log::test;

    use crate::{
        models::{ComparisonMode, ScoringFormat},
        standings::Standing,
    };

    use super::standing_line;

    fn standing() -> Standing {
        Standing {
            user_id: UserId::new(1),
            rank: 1,
            played: 2,
            wins: 2,
            draws: 0,
            losses: 0,
            points: 6.0,
            goal_difference: 3,
            total_elapsed_seconds: 1220,
            improvement_percent: 10.26,
        }
    }

    #[test]
    fn singles() {
        assert_eq!(standing_line(&ScoringFormat::Singles, None, &standing()), "2-0");
    }

    #[test]
    fn team_vs_team() {
        assert_eq!(
            standing_line(&ScoringFormat::TeamVsTeam, None, &standing()),
            "6 pts, 2-0-0, GD +3"
        );
    }

    #[test]
    fn absolute_performance() {
        assert_eq!(
            standing_line(
                &ScoringFormat::IndividualTime,
                Some(ComparisonMode::AbsolutePerformance),
                &standing()
            ),
            "20:20 over 2 runs"
        );
    }

    #[test]
    fn personal_progress() {
        assert_eq!(
            standing_line(
                &ScoringFormat::IndividualTime,
                Some(ComparisonMode::PersonalProgress),
                &standing()
            ),
            "+10.26% over 2 runs"
        );
    }
}
