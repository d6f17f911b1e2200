use std::{collections::HashSet, sync::Arc};

use poise::serenity_prelude::UserId;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    models::{
        types::UtcDateTime, ConfirmingSide, Decision, Fixture, FixtureId, FixtureType, League,
        NewConfirmation, NewSubmission, ResultPayload, Side, SubmissionId, SubmissionSource,
        SubmissionStatus,
    },
    repository::{
        ConfirmationEffect, FixtureRepository, LeagueRepository, ResolveTarget, ResultRepository,
    },
};

use super::{load_league, require_admin, require_member, WorkflowError, WorkflowResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultOutcome {
    pub success: bool,
    pub finalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disputed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,
}

/// What an organizer forces as the final result. Exactly one target must be given.
#[derive(Debug)]
pub struct ResolveInput {
    pub reason: String,
    pub submission_id: Option<SubmissionId>,
    pub payload: Option<ResultPayload>,
}

/// Submission, confirmation and resolution of `league_match` results.
pub struct ResultWorkflow {
    leagues: Arc<LeagueRepository>,
    fixtures: Arc<FixtureRepository>,
    results: Arc<ResultRepository>,
}

impl ResultWorkflow {
    pub fn new(
        leagues: Arc<LeagueRepository>,
        fixtures: Arc<FixtureRepository>,
        results: Arc<ResultRepository>,
    ) -> ResultWorkflow {
        ResultWorkflow {
            leagues,
            fixtures,
            results,
        }
    }

    /// Organizers' results are final right away, everybody else's wait for the other side.
    #[tracing::instrument(skip(self, payload))]
    pub async fn submit_result(
        &self,
        fixture_id: FixtureId,
        caller: UserId,
        payload: ResultPayload,
        at: UtcDateTime,
    ) -> WorkflowResult<ResultOutcome> {
        payload.validate()?;

        let (league, fixture) = self.open_match(fixture_id).await?;
        let member = require_member(&self.leagues, &league, caller).await?;

        let submission = if member.role.is_admin() {
            NewSubmission {
                fixture_id: fixture.id,
                submitted_by: caller,
                source: SubmissionSource::Organizer,
                payload,
                status: SubmissionStatus::Accepted,
                reviewed_by: Some(caller),
                review_note: None,
                submitted_at: at,
            }
        } else {
            NewSubmission {
                fixture_id: fixture.id,
                submitted_by: caller,
                source: SubmissionSource::Participant,
                payload,
                status: SubmissionStatus::Pending,
                reviewed_by: None,
                review_note: None,
                submitted_at: at,
            }
        };

        let stored = self
            .results
            .record_submission(&submission)
            .await?
            .ok_or_else(|| closed_match(fixture.id))?;
        let finalized = stored.status == SubmissionStatus::Accepted;

        if finalized {
            info!(
                "Organizer {caller} finalized fixture {} with submission {}",
                fixture.id.0, stored.id.0
            );
        } else {
            info!(
                "User {caller} submitted result {} for fixture {}",
                stored.id.0, fixture.id.0
            );
        }

        Ok(ResultOutcome {
            success: true,
            finalized,
            disputed: None,
            submission_id: Some(stored.id),
        })
    }

    /// Votes on a pending submission.
    ///
    /// A rejection disputes the fixture. A confirmation finalizes it when it comes from an
    /// organizer, or once the side opposite the submitter has confirmed. Submitters without a
    /// side need confirmations from both sides.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_result(
        &self,
        submission_id: SubmissionId,
        caller: UserId,
        decision: Decision,
        reason: Option<String>,
        at: UtcDateTime,
    ) -> WorkflowResult<ResultOutcome> {
        let submission = self
            .results
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!("Result {} does not exist", submission_id.0))
            })?;

        if submission.status != SubmissionStatus::Pending {
            debug!(
                "Submission {} is {} and can't be voted on",
                submission.id.0, submission.status
            );
            return Err(WorkflowError::Conflict(format!(
                "Result {} is already {}",
                submission.id.0, submission.status
            )));
        }

        let (league, fixture) = self.open_match(submission.fixture_id).await?;
        let member = require_member(&self.leagues, &league, caller).await?;

        if submission.submitted_by == caller {
            return Err(WorkflowError::Unauthorized(
                "You can't confirm or reject your own result".to_string(),
            ));
        }

        let participants = self.fixtures.participants(fixture.id).await?;
        let side_of = |user: UserId| {
            participants
                .iter()
                .find(|participant| participant.user_id == user)
                .map(|participant| participant.side)
        };

        let confirming_side = if member.role.is_admin() {
            ConfirmingSide::Organizer
        } else {
            match side_of(caller) {
                Some(side) => ConfirmingSide::from(side),
                None => {
                    return Err(WorkflowError::Unauthorized(
                        "Only players of this match and organizers can vote on its result"
                            .to_string(),
                    ))
                }
            }
        };

        let effect = match decision {
            Decision::Reject => ConfirmationEffect::Dispute,
            Decision::Confirm if confirming_side == ConfirmingSide::Organizer => {
                ConfirmationEffect::Finalize
            }
            Decision::Confirm => {
                let mut confirmed_by: HashSet<ConfirmingSide> = self
                    .results
                    .list_confirmations(submission.id)
                    .await?
                    .into_iter()
                    .filter(|confirmation| confirmation.decision == Decision::Confirm)
                    .map(|confirmation| confirmation.side)
                    .collect();
                confirmed_by.insert(confirming_side);

                let agreed = match side_of(submission.submitted_by) {
                    Some(side) => confirmed_by.contains(&ConfirmingSide::from(side.opposite())),
                    None => [Side::A, Side::B]
                        .into_iter()
                        .all(|side| confirmed_by.contains(&ConfirmingSide::from(side))),
                };

                if agreed {
                    ConfirmationEffect::Finalize
                } else {
                    ConfirmationEffect::AwaitOtherSide
                }
            }
        };

        let recorded = self
            .results
            .record_confirmation(
                &NewConfirmation {
                    submission_id: submission.id,
                    fixture_id: fixture.id,
                    confirmed_by: caller,
                    side: confirming_side,
                    decision,
                    reason,
                    created_at: at,
                },
                effect,
            )
            .await?;
        if recorded.is_none() {
            debug!("Result {} was settled before the vote of {caller}", submission.id.0);
            return Err(WorkflowError::Conflict(format!(
                "Result {} was settled in the meantime",
                submission.id.0
            )));
        }

        info!(
            "User {caller} voted {decision} on result {} as {confirming_side}: {effect:?}",
            submission.id.0
        );

        Ok(ResultOutcome {
            success: true,
            finalized: effect == ConfirmationEffect::Finalize,
            disputed: (effect == ConfirmationEffect::Dispute).then_some(true),
            submission_id: Some(submission.id),
        })
    }

    /// Forces a final result, from an existing submission of the fixture or an inline payload.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_result(
        &self,
        fixture_id: FixtureId,
        caller: UserId,
        input: ResolveInput,
        at: UtcDateTime,
    ) -> WorkflowResult<ResultOutcome> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::Validation(
                "A resolution needs a reason".to_string(),
            ));
        }

        let (league, fixture) = self.open_match(fixture_id).await?;
        require_admin(&self.leagues, &league, caller).await?;

        let target = match (input.submission_id, input.payload) {
            (Some(submission_id), None) => {
                let submission = self
                    .results
                    .get_submission(submission_id)
                    .await?
                    .ok_or_else(|| {
                        WorkflowError::NotFound(format!(
                            "Result {} does not exist",
                            submission_id.0
                        ))
                    })?;
                if submission.fixture_id != fixture.id {
                    return Err(WorkflowError::Validation(format!(
                        "Result {} was submitted for another match",
                        submission_id.0
                    )));
                }
                ResolveTarget::Existing(submission.id)
            }
            (None, Some(payload)) => {
                payload.validate()?;
                ResolveTarget::Inline(NewSubmission {
                    fixture_id: fixture.id,
                    submitted_by: caller,
                    source: SubmissionSource::Organizer,
                    payload,
                    status: SubmissionStatus::Accepted,
                    reviewed_by: Some(caller),
                    review_note: Some(reason.to_string()),
                    submitted_at: at,
                })
            }
            (Some(_), Some(_)) => {
                return Err(WorkflowError::Validation(
                    "Resolve with either an existing result or a new one, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(WorkflowError::Validation(
                    "Resolve needs an existing result or a new one".to_string(),
                ))
            }
        };

        let accepted = self
            .results
            .resolve(fixture.id, &target, caller, reason, at)
            .await?
            .ok_or_else(|| {
                WorkflowError::Conflict(format!(
                    "Match {} or the chosen result was settled in the meantime",
                    fixture.id.0
                ))
            })?;

        info!(
            "Organizer {caller} resolved fixture {} with result {}: {reason}",
            fixture.id.0, accepted.id.0
        );

        Ok(ResultOutcome {
            success: true,
            finalized: true,
            disputed: None,
            submission_id: Some(accepted.id),
        })
    }

    /// A `league_match` fixture that can still change, with its league.
    async fn open_match(&self, fixture_id: FixtureId) -> WorkflowResult<(League, Fixture)> {
        let fixture = self
            .fixtures
            .get_fixture(fixture_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Match {} does not exist", fixture_id.0)))?;

        if fixture.fixture_type != FixtureType::LeagueMatch {
            return Err(WorkflowError::Validation(format!(
                "Fixture {} is a time trial; submit a run instead",
                fixture.id.0
            )));
        }

        if fixture.status.is_terminal() {
            debug!("Fixture {} is {}", fixture.id.0, fixture.status);
            return Err(WorkflowError::Conflict(format!(
                "Match {} is already {}",
                fixture.id.0, fixture.status
            )));
        }

        let league = load_league(&self.leagues, fixture.league_id).await?;

        Ok((league, fixture))
    }
}

fn closed_match(fixture_id: FixtureId) -> WorkflowError {
    WorkflowError::Conflict(format!("Match {} was closed in the meantime", fixture_id.0))
}
