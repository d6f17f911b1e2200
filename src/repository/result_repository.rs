use anyhow::anyhow;
use poise::serenity_prelude::UserId;
use sqlx::{query, query_as, FromRow, Pool, Sqlite, SqliteConnection};

use crate::{
    models::{
        types::UtcDateTime, ConfirmationId, ConfirmingSide, Decision, FixtureId, FixtureStatus,
        NewConfirmation, NewSubmission, Resolution, ResultConfirmation, ResultPayload,
        ResultSubmission, SubmissionId, SubmissionSource, SubmissionStatus,
    },
    repository::conversion::DBConvertible,
};

use super::{
    conversion::{DBFromConversionError, DBToConversionError},
    fixture_repository::{claim_open_fixture, select_fixture, update_fixture},
};

#[derive(Debug)]
pub struct ResultRepository {
    pool: Pool<Sqlite>,
}

/// What a confirmation vote does to its submission and fixture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationEffect {
    /// The submission is rejected and the fixture disputed.
    Dispute,
    /// The submission is accepted and the fixture finalized with it.
    Finalize,
    /// Still waiting for the other side. The fixture moves to `confirmed`.
    AwaitOtherSide,
}

#[derive(Clone, Debug)]
pub enum ResolveTarget {
    Existing(SubmissionId),
    Inline(NewSubmission),
}

impl ResultRepository {
    pub fn new(pool: Pool<Sqlite>) -> ResultRepository {
        ResultRepository { pool }
    }

    pub async fn get_submission(
        &self,
        id: SubmissionId,
    ) -> Result<Option<ResultSubmission>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;
        let submission = select_submission(&mut *transaction, id).await?;
        transaction.commit().await?;

        Ok(submission)
    }

    pub async fn list_submissions(
        &self,
        fixture_id: FixtureId,
    ) -> Result<Vec<ResultSubmission>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let submissions = query_as::<_, SqlSubmission>(
            r#"SELECT * FROM result_submissions WHERE fixture_id = $1 ORDER BY id"#,
        )
        .bind(fixture_id.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(submissions
            .iter()
            .map(ResultSubmission::from_db)
            .collect::<Result<_, _>>()?)
    }

    pub async fn list_confirmations(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<ResultConfirmation>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let confirmations = query_as::<_, SqlConfirmation>(
            r#"SELECT * FROM result_confirmations WHERE submission_id = $1 ORDER BY id"#,
        )
        .bind(submission_id.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(confirmations
            .iter()
            .map(ResultConfirmation::from_db)
            .collect::<Result<_, _>>()?)
    }

    /// Stores a new submission, superseding the submitter's pending ones for the fixture.
    ///
    /// An accepted submission finalizes the fixture right away, otherwise a scheduled fixture
    /// moves to `submitted`. Returns `None` if the fixture is already finalized or cancelled.
    pub async fn record_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<Option<ResultSubmission>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        if claim_open_fixture(&mut *transaction, submission.fixture_id)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        query(
            r#"
                UPDATE result_submissions SET status = $1
                WHERE fixture_id = $2 AND submitted_by = $3 AND status = $4
            "#,
        )
        .bind(SubmissionStatus::Superseded.to_db()?)
        .bind(submission.fixture_id.to_db()?)
        .bind(submission.submitted_by.to_db()?)
        .bind(SubmissionStatus::Pending.to_db()?)
        .execute(&mut *transaction)
        .await?;

        let stored = insert_submission(&mut *transaction, submission).await?;

        if stored.status == SubmissionStatus::Accepted {
            supersede_others(&mut *transaction, stored.fixture_id, stored.id).await?;
            finalize_fixture(&mut *transaction, stored.fixture_id, &stored.payload, None).await?;
        } else {
            advance_fixture(
                &mut *transaction,
                stored.fixture_id,
                &[FixtureStatus::Scheduled],
                FixtureStatus::Submitted,
            )
            .await?;
        }

        transaction.commit().await?;

        Ok(Some(stored))
    }

    /// Appends a confirmation vote and applies its effect in the same transaction.
    ///
    /// Returns `None` and writes nothing if the submission is no longer pending or the fixture
    /// is no longer open.
    pub async fn record_confirmation(
        &self,
        confirmation: &NewConfirmation,
        effect: ConfirmationEffect,
    ) -> Result<Option<ResultConfirmation>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        if claim_open_fixture(&mut *transaction, confirmation.fixture_id)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let still_pending = select_submission(&mut *transaction, confirmation.submission_id)
            .await?
            .is_some_and(|submission| submission.status == SubmissionStatus::Pending);
        if !still_pending {
            return Ok(None);
        }

        let stored = query_as::<_, SqlConfirmation>(
            r#"
                INSERT INTO result_confirmations (
                    submission_id,
                    fixture_id,
                    confirmed_by,
                    side,
                    decision,
                    reason,
                    created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            "#,
        )
        .bind(confirmation.submission_id.to_db()?)
        .bind(confirmation.fixture_id.to_db()?)
        .bind(confirmation.confirmed_by.to_db()?)
        .bind(confirmation.side.to_db()?)
        .bind(confirmation.decision.to_db()?)
        .bind(&confirmation.reason)
        .bind(confirmation.created_at.to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        match effect {
            ConfirmationEffect::Dispute => {
                let rejected = review_submission(
                    &mut *transaction,
                    confirmation.submission_id,
                    &[SubmissionStatus::Pending],
                    SubmissionStatus::Rejected,
                    confirmation.confirmed_by,
                    confirmation.created_at,
                    confirmation.reason.as_deref(),
                )
                .await?;
                if rejected.is_none() {
                    return Ok(None);
                }

                advance_fixture(
                    &mut *transaction,
                    confirmation.fixture_id,
                    &[
                        FixtureStatus::Scheduled,
                        FixtureStatus::Submitted,
                        FixtureStatus::Confirmed,
                    ],
                    FixtureStatus::Disputed,
                )
                .await?;
            }
            ConfirmationEffect::Finalize => {
                let Some(accepted) = review_submission(
                    &mut *transaction,
                    confirmation.submission_id,
                    &[SubmissionStatus::Pending],
                    SubmissionStatus::Accepted,
                    confirmation.confirmed_by,
                    confirmation.created_at,
                    None,
                )
                .await?
                else {
                    return Ok(None);
                };

                supersede_others(&mut *transaction, accepted.fixture_id, accepted.id).await?;
                finalize_fixture(
                    &mut *transaction,
                    accepted.fixture_id,
                    &accepted.payload,
                    None,
                )
                .await?;
            }
            ConfirmationEffect::AwaitOtherSide => {
                advance_fixture(
                    &mut *transaction,
                    confirmation.fixture_id,
                    &[FixtureStatus::Submitted, FixtureStatus::Confirmed],
                    FixtureStatus::Confirmed,
                )
                .await?;
            }
        }

        transaction.commit().await?;

        Ok(Some(ResultConfirmation::from_db(&stored)?))
    }

    /// Force-accepts a submission for the fixture and finalizes it.
    ///
    /// Every other pending submission of the fixture is superseded. Returns `None` and writes
    /// nothing if the fixture is no longer open.
    pub async fn resolve(
        &self,
        fixture_id: FixtureId,
        target: &ResolveTarget,
        resolver: UserId,
        reason: &str,
        resolved_at: UtcDateTime,
    ) -> Result<Option<ResultSubmission>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        if claim_open_fixture(&mut *transaction, fixture_id)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let accepted = match target {
            ResolveTarget::Existing(id) => {
                let reviewed = review_submission(
                    &mut *transaction,
                    *id,
                    &[
                        SubmissionStatus::Pending,
                        SubmissionStatus::Rejected,
                        SubmissionStatus::Superseded,
                    ],
                    SubmissionStatus::Accepted,
                    resolver,
                    resolved_at,
                    Some(reason),
                )
                .await?;
                match reviewed {
                    Some(reviewed) => reviewed,
                    None => return Ok(None),
                }
            }
            ResolveTarget::Inline(submission) => {
                insert_submission(&mut *transaction, submission).await?
            }
        };

        if accepted.fixture_id != fixture_id {
            return Err(anyhow!(
                "Submission {} belongs to fixture {}, not {}",
                accepted.id.0,
                accepted.fixture_id.0,
                fixture_id.0
            ));
        }

        supersede_others(&mut *transaction, fixture_id, accepted.id).await?;
        finalize_fixture(
            &mut *transaction,
            fixture_id,
            &accepted.payload,
            Some(Resolution {
                reason: reason.to_string(),
                resolved_by: resolver.get(),
                submission_id: accepted.id.0,
            }),
        )
        .await?;

        transaction.commit().await?;

        Ok(Some(accepted))
    }
}

async fn select_submission(
    connection: &mut SqliteConnection,
    id: SubmissionId,
) -> Result<Option<ResultSubmission>, anyhow::Error> {
    let submission =
        query_as::<_, SqlSubmission>(r#"SELECT * FROM result_submissions WHERE id = $1"#)
            .bind(id.to_db()?)
            .fetch_optional(&mut *connection)
            .await?;

    match submission {
        Some(submission) => Ok(Some(ResultSubmission::from_db(&submission)?)),
        None => Ok(None),
    }
}

async fn insert_submission(
    connection: &mut SqliteConnection,
    submission: &NewSubmission,
) -> Result<ResultSubmission, anyhow::Error> {
    let reviewed_at = submission.reviewed_by.map(|_| submission.submitted_at);

    let stored = query_as::<_, SqlSubmission>(
        r#"
            INSERT INTO result_submissions (
                fixture_id,
                submitted_by,
                source,
                payload,
                status,
                reviewed_by,
                reviewed_at,
                review_note,
                submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
        "#,
    )
    .bind(submission.fixture_id.to_db()?)
    .bind(submission.submitted_by.to_db()?)
    .bind(submission.source.to_db()?)
    .bind(submission.payload.to_db()?)
    .bind(submission.status.to_db()?)
    .bind(submission.reviewed_by.to_db()?)
    .bind(reviewed_at.to_db()?)
    .bind(&submission.review_note)
    .bind(submission.submitted_at.to_db()?)
    .fetch_one(&mut *connection)
    .await?;

    Ok(ResultSubmission::from_db(&stored)?)
}

/// Moves a submission out of one of the `expected` statuses. `None` if it is in another one.
async fn review_submission(
    connection: &mut SqliteConnection,
    id: SubmissionId,
    expected: &[SubmissionStatus],
    status: SubmissionStatus,
    reviewer: UserId,
    reviewed_at: UtcDateTime,
    note: Option<&str>,
) -> Result<Option<ResultSubmission>, anyhow::Error> {
    let current = select_submission(&mut *connection, id)
        .await?
        .ok_or_else(|| anyhow!("Result submission {} does not exist", id.0))?;

    if !expected.contains(&current.status) {
        return Ok(None);
    }

    let reviewed = query_as::<_, SqlSubmission>(
        r#"
            UPDATE result_submissions
            SET status = $1, reviewed_by = $2, reviewed_at = $3, review_note = $4
            WHERE id = $5 AND status = $6
            RETURNING *
        "#,
    )
    .bind(status.to_db()?)
    .bind(reviewer.to_db()?)
    .bind(reviewed_at.to_db()?)
    .bind(note)
    .bind(id.to_db()?)
    .bind(current.status.to_db()?)
    .fetch_optional(&mut *connection)
    .await?;

    match reviewed {
        Some(reviewed) => Ok(Some(ResultSubmission::from_db(&reviewed)?)),
        None => Ok(None),
    }
}

async fn supersede_others(
    connection: &mut SqliteConnection,
    fixture_id: FixtureId,
    keep: SubmissionId,
) -> Result<(), anyhow::Error> {
    query(
        r#"
            UPDATE result_submissions SET status = $1
            WHERE fixture_id = $2 AND id <> $3 AND status = $4
        "#,
    )
    .bind(SubmissionStatus::Superseded.to_db()?)
    .bind(fixture_id.to_db()?)
    .bind(keep.to_db()?)
    .bind(SubmissionStatus::Pending.to_db()?)
    .execute(&mut *connection)
    .await?;

    Ok(())
}

async fn finalize_fixture(
    connection: &mut SqliteConnection,
    fixture_id: FixtureId,
    payload: &ResultPayload,
    resolution: Option<Resolution>,
) -> Result<(), anyhow::Error> {
    let fixture = select_fixture(&mut *connection, fixture_id)
        .await?
        .ok_or_else(|| anyhow!("Fixture {} does not exist", fixture_id.0))?;

    let mut metadata = fixture.metadata;
    metadata.final_result = Some(payload.clone());
    if resolution.is_some() {
        metadata.resolution = resolution;
    }

    update_fixture(
        &mut *connection,
        fixture_id,
        FixtureStatus::Finalized,
        &metadata,
    )
    .await
}

/// Moves the fixture to `to` if its current status is one of `from`.
async fn advance_fixture(
    connection: &mut SqliteConnection,
    fixture_id: FixtureId,
    from: &[FixtureStatus],
    to: FixtureStatus,
) -> Result<(), anyhow::Error> {
    let fixture = select_fixture(&mut *connection, fixture_id)
        .await?
        .ok_or_else(|| anyhow!("Fixture {} does not exist", fixture_id.0))?;

    if from.contains(&fixture.status) {
        update_fixture(&mut *connection, fixture_id, to, &fixture.metadata).await?;
    }

    Ok(())
}

#[derive(Debug, FromRow)]
pub struct SqlSubmission {
    id: i64,
    fixture_id: i64,
    submitted_by: i64,
    source: String,
    payload: String,
    status: String,
    reviewed_by: Option<i64>,
    reviewed_at: Option<String>,
    review_note: Option<String>,
    submitted_at: String,
}

impl DBConvertible for ResultSubmission {
    type DBType = SqlSubmission;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlSubmission {
            id: self.id.to_db()?,
            fixture_id: self.fixture_id.to_db()?,
            submitted_by: self.submitted_by.to_db()?,
            source: self.source.to_db()?,
            payload: self.payload.to_db()?,
            status: self.status.to_db()?,
            reviewed_by: self.reviewed_by.to_db()?,
            reviewed_at: self.reviewed_at.to_db()?,
            review_note: self.review_note.clone(),
            submitted_at: self.submitted_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(ResultSubmission {
            id: SubmissionId::from_db(&value.id)?,
            fixture_id: FixtureId::from_db(&value.fixture_id)?,
            submitted_by: UserId::from_db(&value.submitted_by)?,
            source: SubmissionSource::from_db(&value.source)?,
            payload: ResultPayload::from_db(&value.payload)?,
            status: SubmissionStatus::from_db(&value.status)?,
            reviewed_by: Option::<UserId>::from_db(&value.reviewed_by)?,
            reviewed_at: Option::<UtcDateTime>::from_db(&value.reviewed_at)?,
            review_note: value.review_note.clone(),
            submitted_at: UtcDateTime::from_db(&value.submitted_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SqlConfirmation {
    id: i64,
    submission_id: i64,
    fixture_id: i64,
    confirmed_by: i64,
    side: String,
    decision: String,
    reason: Option<String>,
    created_at: String,
}

impl DBConvertible for ResultConfirmation {
    type DBType = SqlConfirmation;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlConfirmation {
            id: self.id.to_db()?,
            submission_id: self.submission_id.to_db()?,
            fixture_id: self.fixture_id.to_db()?,
            confirmed_by: self.confirmed_by.to_db()?,
            side: self.side.to_db()?,
            decision: self.decision.to_db()?,
            reason: self.reason.clone(),
            created_at: self.created_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(ResultConfirmation {
            id: ConfirmationId::from_db(&value.id)?,
            submission_id: SubmissionId::from_db(&value.submission_id)?,
            fixture_id: FixtureId::from_db(&value.fixture_id)?,
            confirmed_by: UserId::from_db(&value.confirmed_by)?,
            side: ConfirmingSide::from_db(&value.side)?,
            decision: Decision::from_db(&value.decision)?,
            reason: value.reason.clone(),
            created_at: UtcDateTime::from_db(&value.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::UserId;

    use crate::{
        models::{
            types::UtcDateTime, ConfirmingSide, Decision, Fixture, FixtureStatus,
            NewConfirmation, NewSubmission, ResultPayload, Side, SubmissionSource,
            SubmissionStatus,
        },
        repository::FixtureRepository,
        test_utils::{scheduled_singles_match, test_pool},
    };

    use super::{ConfirmationEffect, ResultRepository};

    fn pending(fixture: &Fixture, by: u64, winner: Side) -> NewSubmission {
        NewSubmission {
            fixture_id: fixture.id,
            submitted_by: UserId::new(by),
            source: SubmissionSource::Participant,
            payload: ResultPayload {
                winner: Some(winner),
                ..Default::default()
            },
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            review_note: None,
            submitted_at: UtcDateTime::now(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn resubmitting_supersedes_own_pending() {
        let pool = test_pool().await;
        let (_, fixture) = scheduled_singles_match(&pool, 1, 2).await;
        let fixtures = FixtureRepository::new(pool.clone());
        let repository = ResultRepository::new(pool);

        let first = repository
            .record_submission(&pending(&fixture, 1, Side::A))
            .await
            .unwrap()
            .unwrap();
        let second = repository
            .record_submission(&pending(&fixture, 1, Side::B))
            .await
            .unwrap()
            .unwrap();

        let first = repository.get_submission(first.id).await.unwrap().unwrap();
        assert_eq!(first.status, SubmissionStatus::Superseded);
        assert_eq!(second.status, SubmissionStatus::Pending);

        let fixture = fixtures.get_fixture(fixture.id).await.unwrap().unwrap();
        assert_eq!(fixture.status, FixtureStatus::Submitted);
    }

    #[test_log::test(tokio::test)]
    async fn accepted_submission_finalizes_the_fixture() {
        let pool = test_pool().await;
        let (_, fixture) = scheduled_singles_match(&pool, 1, 2).await;
        let fixtures = FixtureRepository::new(pool.clone());
        let repository = ResultRepository::new(pool);

        let other = repository
            .record_submission(&pending(&fixture, 2, Side::B))
            .await
            .unwrap()
            .unwrap();

        let mut accepted = pending(&fixture, 1, Side::A);
        accepted.status = SubmissionStatus::Accepted;
        accepted.source = SubmissionSource::Organizer;
        accepted.reviewed_by = Some(UserId::new(1));
        let accepted = repository
            .record_submission(&accepted)
            .await
            .unwrap()
            .unwrap();
        assert!(accepted.reviewed_at.is_some());

        let other = repository.get_submission(other.id).await.unwrap().unwrap();
        assert_eq!(other.status, SubmissionStatus::Superseded);

        let fixture = fixtures.get_fixture(fixture.id).await.unwrap().unwrap();
        assert_eq!(fixture.status, FixtureStatus::Finalized);
        assert_eq!(
            fixture.metadata.final_result.as_ref().unwrap().winner,
            Some(Side::A)
        );

        let late = repository
            .record_submission(&pending(&fixture, 2, Side::B))
            .await
            .unwrap();
        assert!(late.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn votes_on_a_settled_submission_change_nothing() {
        let pool = test_pool().await;
        let (_, fixture) = scheduled_singles_match(&pool, 1, 2).await;
        let fixtures = FixtureRepository::new(pool.clone());
        let repository = ResultRepository::new(pool);

        let submission = repository
            .record_submission(&pending(&fixture, 1, Side::A))
            .await
            .unwrap()
            .unwrap();
        let vote = |decision| NewConfirmation {
            submission_id: submission.id,
            fixture_id: fixture.id,
            confirmed_by: UserId::new(2),
            side: ConfirmingSide::B,
            decision,
            reason: None,
            created_at: UtcDateTime::now(),
        };

        let rejection = repository
            .record_confirmation(&vote(Decision::Reject), ConfirmationEffect::Dispute)
            .await
            .unwrap();
        assert!(rejection.is_some());

        // The submission is rejected now, so a late confirmation must not accept it.
        let late = repository
            .record_confirmation(&vote(Decision::Confirm), ConfirmationEffect::Finalize)
            .await
            .unwrap();
        assert!(late.is_none());
        assert_eq!(repository.list_confirmations(submission.id).await.unwrap().len(), 1);

        let stored = repository.get_submission(submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Rejected);
        let fixture = fixtures.get_fixture(fixture.id).await.unwrap().unwrap();
        assert_eq!(fixture.status, FixtureStatus::Disputed);
    }
}
