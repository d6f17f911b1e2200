use poise::{
    serenity_prelude::{Mentionable, User},
    CreateReply,
};

use crate::{
    commands::{
        arguments::{LeagueSlug, RoleChoice},
        guild_league, internal_err, ApplicationContext, CommandResult,
    },
    models::{types::UtcDateTime, MemberRole},
    utils::formatting::format_utc,
};

/// Join a league as a member.
#[poise::command(slash_command, rename = "join", ephemeral)]
pub async fn join(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;

    let joined = ctx
        .data
        .leagues
        .join_league(league.id, ctx.author().id, UtcDateTime::now())
        .await?;

    let message = if joined {
        format!("# Welcome to {}!", league.display_name)
    } else {
        format!("You are already a member of **{}**.", league.display_name)
    };
    ctx.send(CreateReply::default().content(message).ephemeral(true))
        .await?;

    Ok(())
}

/// List the leagues of this server.
#[poise::command(slash_command, rename = "list")]
pub async fn list(ctx: ApplicationContext<'_>) -> CommandResult {
    let guild = ctx.guild_id().ok_or(internal_err(
        "This command should be executed only in a guild",
    ))?;

    let leagues = ctx.data.leagues.list_leagues(guild).await?;

    if leagues.is_empty() {
        ctx.send(
            CreateReply::default()
                .content("# There are no leagues in this server yet")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut list = String::new();
    for league in &leagues {
        let members = ctx.data.leagues.list_members(league.id).await?;
        list += &format!(
            " - **{}** (slug: `{}`) - {} {}, {} weeks from {} UTC, {} members\n",
            league.display_name,
            league.slug,
            league.sport,
            league.scoring_format,
            league.season_weeks,
            format_utc(UtcDateTime::start_of(league.start_date)),
            members.len(),
        );
    }

    ctx.send(
        CreateReply::default()
            .content(format!("# Leagues:\n{list}"))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Make a member an admin of the league, or take admin rights away. Owner only.
#[poise::command(slash_command, rename = "role", ephemeral)]
pub async fn role(
    ctx: ApplicationContext<'_>,
    #[description = "League slug"] league: LeagueSlug,
    #[description = "The member to change the role of."] member: User,
    #[description = "The new role."] role: RoleChoice,
) -> CommandResult {
    let league = guild_league(ctx, &league).await?;
    let role = MemberRole::from(role);

    ctx.data
        .leagues
        .set_member_role(league.id, ctx.author().id, member.id, role)
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!(
                "{} is now {role} of **{}**.",
                member.mention(),
                league.display_name
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
