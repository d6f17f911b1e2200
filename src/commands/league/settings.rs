use poise::CreateReply;

use crate::{
    commands::{
        arguments::{ComparisonChoice, LeagueSlug, MemberPairs},
        guild_league, user_err, ApplicationContext, CommandResult,
    },
    models::ComparisonMode,
    utils::formatting::format_distance,
    workflow::RunningRulesUpdate,
};

/// Set the fixed doubles pairs. Admins only.
#[poise::command(slash_command, rename = "pairs", ephemeral)]
pub async fn pairs(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
    #[description = "Pairs separated by commas: `@Ann @Bob, @Cid @Dan`."] pairs: MemberPairs,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;

    let stored = ctx
        .data
        .leagues
        .set_fixed_pairs(league.id, ctx.author().id, pairs.into())
        .await?;

    let list = stored.iter().fold(String::new(), |acc, pair| {
        acc + &format!(" - <@{}> & <@{}>\n", pair.first, pair.second)
    });

    ctx.send(
        CreateReply::default()
            .content(format!(
                "# {} fixed pairs of {}\n{list}",
                stored.len(),
                league.display_name
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Change how running sessions work. Admins only.
#[poise::command(slash_command, rename = "rules", ephemeral)]
pub async fn rules(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
    #[description = "Runs must be approved by an admin before they count."]
    require_approval: Option<bool>,
    #[description = "How runs are compared in standings."] comparison: Option<ComparisonChoice>,
    #[description = "Target distance of a session, in kilometres."]
    #[min = 0.1]
    #[max = 500.0]
    distance_km: Option<f64>,
) -> CommandResult {
    if require_approval.is_none() && comparison.is_none() && distance_km.is_none() {
        return Err(user_err("Nothing to change: pass at least one setting"));
    }

    let league = guild_league(ctx, &league).await?;

    let rules = ctx
        .data
        .leagues
        .update_running_rules(
            league.id,
            ctx.author().id,
            RunningRulesUpdate {
                require_approval,
                comparison_mode: comparison.map(ComparisonMode::from),
                distance_m: distance_km.map(|km| km * 1000.0),
            },
        )
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "# Running rules of {}\n\
                 - Approval required: {}\n\
                 - Comparison: {}\n\
                 - Distance: {}",
                league.display_name,
                if rules.running.require_approval { "yes" } else { "no" },
                rules.running.comparison_mode,
                format_distance(rules.running.distance_m),
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
