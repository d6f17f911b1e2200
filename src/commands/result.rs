use poise::CreateReply;

use crate::{
    commands::{
        arguments::{MemberPoints, SetScores, SideChoice, TrimmedText},
        user_err, ApplicationContext, CommandResult, Context,
    },
    models::{types::UtcDateTime, Decision, FixtureId, ResultPayload, Side, SubmissionId},
    workflow::{ResolveInput, ResultOutcome},
};

#[poise::command(
    slash_command,
    guild_only,
    subcommands("submit", "confirm", "reject", "resolve")
)]
pub async fn result(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/result` subcommands"))
}

/// Report the result of a match you played or organize.
#[allow(clippy::too_many_arguments)]
#[poise::command(slash_command, ephemeral)]
pub async fn submit(
    ctx: ApplicationContext<'_>,
    #[description = "Fixture number, as shown by `/schedule week`."] fixture: u64,
    #[description = "The winning side."] winner: Option<SideChoice>,
    #[description = "Games per set, side A first: `6-4 3-6 7-5`."] sets: Option<SetScores>,
    #[description = "Side A score."]
    #[min = 0]
    score_a: Option<i64>,
    #[description = "Side B score."]
    #[min = 0]
    score_b: Option<i64>,
    #[description = "Points per player: `@Ann 3, @Bob 1.5`."] points: Option<MemberPoints>,
    #[description = "Anything worth noting about the match."] notes: Option<TrimmedText>,
) -> CommandResult {
    let payload = build_payload(winner, sets, score_a, score_b, points, notes)
        .ok_or(user_err("Please provide a winner, set scores, side scores or points"))?;

    let outcome = ctx
        .data
        .results
        .submit_result(FixtureId(fixture), ctx.author().id, payload, UtcDateTime::now())
        .await?;

    let message = if outcome.finalized {
        format!("# Result of fixture #{fixture} is final")
    } else {
        format!(
            "# Result submitted\nThe other side can confirm it with `/result confirm submission:{}` \
             or reject it with `/result reject`.",
            submission_number(&outcome)
        )
    };
    ctx.send(CreateReply::default().content(message).ephemeral(true))
        .await?;

    Ok(())
}

/// Confirm a result reported by the other side.
#[poise::command(slash_command, ephemeral)]
pub async fn confirm(
    ctx: ApplicationContext<'_>,
    #[description = "Submission number."] submission: u64,
) -> CommandResult {
    let outcome = ctx
        .data
        .results
        .confirm_result(
            SubmissionId(submission),
            ctx.author().id,
            Decision::Confirm,
            None,
            UtcDateTime::now(),
        )
        .await?;

    let message = if outcome.finalized {
        "# Confirmed, the result is final"
    } else {
        "# Confirmed\nThe result is final once the other side confirms it too."
    };
    ctx.send(CreateReply::default().content(message).ephemeral(true))
        .await?;

    Ok(())
}

/// Dispute a result reported by the other side.
#[poise::command(slash_command, ephemeral)]
pub async fn reject(
    ctx: ApplicationContext<'_>,
    #[description = "Submission number."] submission: u64,
    #[description = "What is wrong with the result."] reason: Option<TrimmedText>,
) -> CommandResult {
    ctx.data
        .results
        .confirm_result(
            SubmissionId(submission),
            ctx.author().id,
            Decision::Reject,
            reason.map(String::from),
            UtcDateTime::now(),
        )
        .await?;

    ctx.send(
        CreateReply::default()
            .content("# Result disputed\nAn admin of the league will resolve it.")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Settle a fixture by accepting a submission or entering the result. Admins only.
#[allow(clippy::too_many_arguments)]
#[poise::command(slash_command, ephemeral)]
pub async fn resolve(
    ctx: ApplicationContext<'_>,
    #[description = "Fixture number."] fixture: u64,
    #[description = "Why the fixture is resolved this way."] reason: TrimmedText,
    #[description = "The submission to accept."] submission: Option<u64>,
    #[description = "The winning side, when entering the result."] winner: Option<SideChoice>,
    #[description = "Games per set, side A first."] sets: Option<SetScores>,
    #[description = "Side A score."]
    #[min = 0]
    score_a: Option<i64>,
    #[description = "Side B score."]
    #[min = 0]
    score_b: Option<i64>,
) -> CommandResult {
    let payload = build_payload(winner, sets, score_a, score_b, None, None);

    ctx.data
        .results
        .resolve_result(
            FixtureId(fixture),
            ctx.author().id,
            ResolveInput {
                reason: reason.into(),
                submission_id: submission.map(SubmissionId),
                payload,
            },
            UtcDateTime::now(),
        )
        .await?;

    ctx.send(
        CreateReply::default()
            .content(format!("# Fixture #{fixture} is resolved"))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// `None` when no result field was given at all.
fn build_payload(
    winner: Option<SideChoice>,
    sets: Option<SetScores>,
    score_a: Option<i64>,
    score_b: Option<i64>,
    points: Option<MemberPoints>,
    notes: Option<TrimmedText>,
) -> Option<ResultPayload> {
    if winner.is_none()
        && sets.is_none()
        && score_a.is_none()
        && score_b.is_none()
        && points.is_none()
    {
        return None;
    }

    Some(ResultPayload {
        winner: winner.map(Side::from),
        sets: sets.map(Vec::from).unwrap_or_default(),
        score_a,
        score_b,
        points: points.map(Into::into).unwrap_or_default(),
        notes: notes.map(String::from),
    })
}

fn submission_number(outcome: &ResultOutcome) -> String {
    outcome
        .submission_id
        .map(|id| id.0.to_string())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_log::test;

    use crate::{
        commands::arguments::{SetScores, SideChoice},
        models::{SetScore, Side},
    };

    use super::build_payload;

    #[test]
    fn nothing_given() {
        assert_eq!(build_payload(None, None, None, None, None, None), None);
    }

    #[test]
    fn sets_and_winner() {
        let payload = build_payload(
            Some(SideChoice::B),
            Some(SetScores::from_str("4-6 3-6").unwrap()),
            None,
            None,
            None,
            None,
        )
        .unwrap();

        assert_eq!(payload.winner, Some(Side::B));
        assert_eq!(payload.sets, vec![SetScore { a: 4, b: 6 }, SetScore { a: 3, b: 6 }]);
        assert!(payload.validate().is_ok());
    }
}
