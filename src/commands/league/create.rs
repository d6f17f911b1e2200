use indoc::formatdoc;
use poise::{
    serenity_prelude::{
        ButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed,
        CreateInteractionResponse, CreateInteractionResponseMessage,
    },
    CreateReply,
};
use time::{Date, Duration};
use tracing::info;

use crate::{
    commands::{
        arguments::{FormatChoice, HumanDate, LeagueSlug, RotationChoice, TrimmedText},
        internal_err, ApplicationContext, CommandError, CommandResult,
    },
    models::{types::UtcDateTime, RotationType, ScoringFormat},
    schedule::week_window,
    utils::{camel_slug::slugify_camel, formatting::format_utc},
    workflow::CreateLeague,
};

/// Create a league. You become its owner.
#[allow(clippy::too_many_arguments)]
#[poise::command(
    slash_command,
    rename = "create",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn create(
    ctx: ApplicationContext<'_>,

    #[description = "The display name of the league."] display_name: TrimmedText,

    #[description = "The sport, e.g. padel, tennis, running."] sport: TrimmedText,

    #[description = "How results are scored."] format: FormatChoice,

    #[description = "The first day of week 1, e.g. 2024-09-02."] start: HumanDate,

    #[description = "Number of weeks in the season."]
    #[min = 1]
    #[max = 52]
    weeks: u32,

    #[description = "How doubles teams are formed. Defaults to random."] rotation: Option<
        RotationChoice,
    >,

    #[description = "The name of the league to use in commands. Must consist only of `A-Za-z0-9_-`."]
    slug: Option<LeagueSlug>,
) -> CommandResult {
    let guild = ctx.guild_id().ok_or(internal_err(
        "League create command should only be invoked in guilds",
    ))?;

    let scoring_format = ScoringFormat::from(format);
    let rotation_type = rotation.map(RotationType::from).unwrap_or(RotationType::Random);
    let start_date = Date::from(start);
    let slug = slug
        .map(String::from)
        .unwrap_or_else(|| slugify_camel(display_name.as_ref()));
    let (_, season_end) = week_window(start_date, weeks);

    let confirm_timeout = Duration::minutes(5);

    let create_embed = |colour: Colour| {
        CreateEmbed::new()
            .title(display_name.as_ref())
            .colour(colour)
            .field("Sport", sport.as_ref(), true)
            .field("Format", scoring_format.as_str(), true)
            .field("Rotation", rotation_type.to_string(), true)
            .field(
                "Season",
                format!(
                    "{weeks} weeks, {} UTC to {} UTC",
                    format_utc(UtcDateTime::start_of(start_date)),
                    format_utc(season_end)
                ),
                false,
            )
            .field("Slug", format!("`{slug}`"), true)
    };

    let reply = ctx
        .send(
            CreateReply::default()
                .content(formatdoc! {"
                    # Confirm league creation
                    You can find the details of the league to be created in the embed below. \
                    If you don't see the embed, check your Discord settings.

                    If you need to make an edit, then cancel and use the command again.

                    **If you don't confirm league creation in {confirm_timeout}, it will be cancelled automatically.**"
                })
                .embed(create_embed(Colour::GOLD))
                .components(vec![CreateActionRow::Buttons(vec![
                    CreateButton::new("cancel")
                        .label("Cancel")
                        .style(ButtonStyle::Secondary),
                    CreateButton::new("confirm")
                        .label("Confirm")
                        .style(ButtonStyle::Primary),
                ])])
                .ephemeral(true),
        )
        .await?;

    let interaction = reply
        .message()
        .await?
        .await_component_interaction(ctx.serenity_context())
        .author_id(ctx.author().id)
        .timeout(confirm_timeout.unsigned_abs())
        .await;

    let Some(interaction) = interaction else {
        reply
            .edit(
                ctx.into(),
                CreateReply::default()
                    .content("# Timed out!")
                    .embed(create_embed(Colour::RED))
                    .components(vec![]),
            )
            .await?;
        return Ok(());
    };

    let response = match interaction.data.custom_id.as_str() {
        "cancel" => CreateInteractionResponseMessage::new()
            .content("# Canceled!")
            .embed(create_embed(Colour::RED))
            .components(vec![]),

        "confirm" => {
            let creation_result = ctx
                .data
                .leagues
                .create_league(
                    CreateLeague {
                        guild,
                        display_name: display_name.to_string(),
                        slug: Some(slug.clone()),
                        sport: sport.to_string(),
                        scoring_format: scoring_format.clone(),
                        rotation_type,
                        season_weeks: weeks,
                        start_date,
                        creator: ctx.author().id,
                    },
                    UtcDateTime::now(),
                )
                .await;

            match creation_result {
                Ok(league) => {
                    info!(
                        "{} created league {} in guild {guild}",
                        ctx.author().name,
                        league.slug
                    );
                    CreateInteractionResponseMessage::new()
                        .content("# League created!\nMembers can now use `/league join`.")
                        .embed(create_embed(Colour::DARK_GREEN))
                        .components(vec![])
                }
                Err(err) => CreateInteractionResponseMessage::new()
                    .content(format!(
                        "# Could not create the league!\n{}",
                        CommandError::from(err)
                    ))
                    .components(vec![]),
            }
        }

        id => {
            return Err(internal_err(format!("Unknown interaction ID: {id}")));
        }
    };

    interaction
        .create_response(
            ctx.serenity_context(),
            CreateInteractionResponse::UpdateMessage(response),
        )
        .await?;

    Ok(())
}
