use anyhow::anyhow;
use poise::serenity_prelude::UserId;
use sqlx::{query, query_as, query_scalar, FromRow, Pool, Sqlite, SqliteConnection};
use tracing::{info, warn};

use crate::{
    models::{
        types::UtcDateTime, ComparisonMode, FixtureId, FixtureMetadata, FixtureStatus,
        FixtureType, LeagueId, NewFixture, NewRun, NewSession, RunStatus, RunningSession,
        SessionId, SessionRun, SessionStatus, SessionType,
    },
    repository::conversion::DBConvertible,
};

use super::{
    conversion::{DBFromConversionError, DBToConversionError},
    fixture_repository::{insert_fixture, select_fixture, update_fixture},
};

/// How many times pairing a session with a fixture is attempted before re-reading the session.
pub const PAIRING_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub struct SessionRepository {
    pool: Pool<Sqlite>,
}

#[derive(Clone, Debug)]
pub struct FinalizedSession {
    pub session: RunningSession,
    pub runs: Vec<SessionRun>,
}

impl SessionRepository {
    pub fn new(pool: Pool<Sqlite>) -> SessionRepository {
        SessionRepository { pool }
    }

    pub async fn get_session(&self, id: SessionId) -> Result<Option<RunningSession>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;
        let session = select_session(&mut *transaction, id).await?;
        transaction.commit().await?;

        Ok(session)
    }

    pub async fn get_session_for_week(
        &self,
        league_id: LeagueId,
        week: u32,
    ) -> Result<Option<RunningSession>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let session = query_as::<_, SqlSession>(
            r#"SELECT * FROM running_sessions WHERE league_id = $1 AND week = $2"#,
        )
        .bind(league_id.to_db()?)
        .bind(week.to_db()?)
        .fetch_optional(&mut *transaction)
        .await?;

        transaction.commit().await?;

        match session {
            Some(session) => Ok(Some(RunningSession::from_db(&session)?)),
            None => Ok(None),
        }
    }

    pub async fn get_run(
        &self,
        session_id: SessionId,
        user: UserId,
    ) -> Result<Option<SessionRun>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let run = query_as::<_, SqlRun>(
            r#"SELECT * FROM session_runs WHERE session_id = $1 AND user_id = $2"#,
        )
        .bind(session_id.to_db()?)
        .bind(user.to_db()?)
        .fetch_optional(&mut *transaction)
        .await?;

        transaction.commit().await?;

        match run {
            Some(run) => Ok(Some(SessionRun::from_db(&run)?)),
            None => Ok(None),
        }
    }

    pub async fn list_runs(&self, session_id: SessionId) -> Result<Vec<SessionRun>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;
        let runs = select_runs(&mut *transaction, session_id).await?;
        transaction.commit().await?;

        Ok(runs)
    }

    /// Inserts or replaces the caller's run and opens a scheduled session.
    ///
    /// A resubmitted run loses any earlier review.
    pub async fn upsert_run(&self, run: &NewRun) -> Result<SessionRun, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let stored = query_as::<_, SqlRun>(
            r#"
                INSERT INTO session_runs (
                    session_id,
                    user_id,
                    elapsed_seconds,
                    distance_m,
                    proof,
                    status,
                    submitted_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (session_id, user_id) DO UPDATE SET
                    elapsed_seconds = excluded.elapsed_seconds,
                    distance_m = excluded.distance_m,
                    proof = excluded.proof,
                    status = excluded.status,
                    reviewed_by = NULL,
                    reviewed_at = NULL,
                    review_note = NULL,
                    submitted_at = excluded.submitted_at
                RETURNING *
            "#,
        )
        .bind(run.session_id.to_db()?)
        .bind(run.user_id.to_db()?)
        .bind(run.elapsed_seconds)
        .bind(run.distance_m)
        .bind(&run.proof)
        .bind(run.status.to_db()?)
        .bind(run.submitted_at.to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        query(r#"UPDATE running_sessions SET status = $1 WHERE id = $2 AND status = $3"#)
            .bind(SessionStatus::Open.to_db()?)
            .bind(run.session_id.to_db()?)
            .bind(SessionStatus::Scheduled.to_db()?)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(SessionRun::from_db(&stored)?)
    }

    /// Sets the review of a run. `None` if there is no such run, or if the run or its session is
    /// already finalized.
    pub async fn review_run(
        &self,
        session_id: SessionId,
        user: UserId,
        status: RunStatus,
        reviewer: UserId,
        reviewed_at: UtcDateTime,
        note: Option<&str>,
    ) -> Result<Option<SessionRun>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let reviewed = query_as::<_, SqlRun>(
            r#"
                UPDATE session_runs
                SET status = $1, reviewed_by = $2, reviewed_at = $3, review_note = $4
                WHERE session_id = $5 AND user_id = $6 AND status <> $7
                    AND EXISTS (SELECT 1 FROM running_sessions WHERE id = $5 AND status <> $8)
                RETURNING *
            "#,
        )
        .bind(status.to_db()?)
        .bind(reviewer.to_db()?)
        .bind(reviewed_at.to_db()?)
        .bind(note)
        .bind(session_id.to_db()?)
        .bind(user.to_db()?)
        .bind(RunStatus::Finalized.to_db()?)
        .bind(SessionStatus::Finalized.to_db()?)
        .fetch_optional(&mut *transaction)
        .await?;

        transaction.commit().await?;

        match reviewed {
            Some(run) => Ok(Some(SessionRun::from_db(&run)?)),
            None => Ok(None),
        }
    }

    /// Locks the session, promotes the eligible runs and finalizes its paired fixture with the
    /// best time. Returns the promoted runs, or `None` if the session was already finalized.
    pub async fn finalize_session(
        &self,
        session_id: SessionId,
        eligible: &[RunStatus],
    ) -> Result<Option<Vec<SessionRun>>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let locked = query_as::<_, SqlSession>(
            r#"
                UPDATE running_sessions SET status = $1
                WHERE id = $2 AND status <> $1
                RETURNING *
            "#,
        )
        .bind(SessionStatus::Finalized.to_db()?)
        .bind(session_id.to_db()?)
        .fetch_optional(&mut *transaction)
        .await?;

        let session = match locked {
            Some(session) => RunningSession::from_db(&session)?,
            None => {
                return match select_session(&mut *transaction, session_id).await? {
                    Some(_) => Ok(None),
                    None => Err(anyhow!("Running session {} does not exist", session_id.0)),
                }
            }
        };

        let mut promoted = Vec::new();
        for mut run in select_runs(&mut *transaction, session_id).await? {
            if !eligible.contains(&run.status) {
                continue;
            }

            query(r#"UPDATE session_runs SET status = $1 WHERE session_id = $2 AND user_id = $3"#)
                .bind(RunStatus::Finalized.to_db()?)
                .bind(session_id.to_db()?)
                .bind(run.user_id.to_db()?)
                .execute(&mut *transaction)
                .await?;

            run.status = RunStatus::Finalized;
            promoted.push(run);
        }

        if let Some(fixture_id) = session.fixture_id {
            if let Some(fixture) = select_fixture(&mut *transaction, fixture_id).await? {
                let best = select_runs(&mut *transaction, session_id)
                    .await?
                    .into_iter()
                    .filter(|run| run.status == RunStatus::Finalized)
                    .min_by_key(|run| run.elapsed_seconds);

                let mut metadata = fixture.metadata;
                metadata.best_elapsed_seconds = best.as_ref().map(|run| run.elapsed_seconds);
                metadata.best_user_id = best.as_ref().map(|run| run.user_id.get());

                update_fixture(
                    &mut *transaction,
                    fixture_id,
                    FixtureStatus::Finalized,
                    &metadata,
                )
                .await?;
            }
        }

        transaction.commit().await?;

        Ok(Some(promoted))
    }

    /// Makes sure the session has a paired fixture and returns it.
    ///
    /// The pairing is a conditional write on an empty `fixture_id`, attempted up to
    /// [`PAIRING_ATTEMPTS`] times. After that the session is re-read and whatever fixture it
    /// holds by then is returned.
    pub async fn pair_with_fixture(
        &self,
        session: &RunningSession,
        starts_at: UtcDateTime,
    ) -> Result<FixtureId, anyhow::Error> {
        for attempt in 1..=PAIRING_ATTEMPTS {
            let mut transaction = self.pool.begin().await?;

            let current = select_session(&mut *transaction, session.id)
                .await?
                .ok_or_else(|| anyhow!("Running session {} does not exist", session.id.0))?;

            if let Some(fixture_id) = current.fixture_id {
                transaction.commit().await?;
                return Ok(fixture_id);
            }

            let fixture_id = insert_fixture(
                &mut *transaction,
                &NewFixture {
                    league_id: current.league_id,
                    week: current.week,
                    starts_at,
                    ends_at: current.deadline,
                    fixture_type: FixtureType::TimeTrialSession,
                    metadata: FixtureMetadata {
                        session_id: Some(current.id.0),
                        ..Default::default()
                    },
                },
            )
            .await?;

            if attach_fixture(&mut *transaction, current.id, fixture_id).await? {
                transaction.commit().await?;
                info!(
                    "Paired running session {} with fixture {}",
                    current.id.0, fixture_id.0
                );
                return Ok(fixture_id);
            }

            transaction.rollback().await?;
            warn!(
                "Attempt {attempt} to pair running session {} lost a race",
                current.id.0
            );
        }

        self.get_session(session.id)
            .await?
            .and_then(|current| current.fixture_id)
            .ok_or_else(|| anyhow!("Could not pair running session {} with a fixture", session.id.0))
    }

    pub async fn list_finalized_sessions(
        &self,
        league_id: LeagueId,
    ) -> Result<Vec<FinalizedSession>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let sessions = query_as::<_, SqlSession>(
            r#"
                SELECT * FROM running_sessions
                WHERE league_id = $1 AND status = $2
                ORDER BY week
            "#,
        )
        .bind(league_id.to_db()?)
        .bind(SessionStatus::Finalized.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        let mut finalized = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let session = RunningSession::from_db(session)?;
            let runs = select_runs(&mut *transaction, session.id)
                .await?
                .into_iter()
                .filter(|run| run.status == RunStatus::Finalized)
                .collect();
            finalized.push(FinalizedSession { session, runs });
        }

        transaction.commit().await?;

        Ok(finalized)
    }
}

pub(super) async fn insert_session(
    connection: &mut SqliteConnection,
    session: &NewSession,
) -> Result<SessionId, anyhow::Error> {
    let id = query_scalar::<_, i64>(
        r#"
            INSERT INTO running_sessions (
                league_id,
                week,
                session_type,
                distance_m,
                comparison_mode,
                status,
                deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "#,
    )
    .bind(session.league_id.to_db()?)
    .bind(session.week.to_db()?)
    .bind(session.session_type.to_db()?)
    .bind(session.distance_m)
    .bind(session.comparison_mode.to_db()?)
    .bind(SessionStatus::Scheduled.to_db()?)
    .bind(session.deadline.to_db()?)
    .fetch_one(&mut *connection)
    .await?;

    Ok(SessionId::from_db(&id)?)
}

/// Links a fixture to a session that has none yet. Returns `false` if it already had one.
pub(super) async fn attach_fixture(
    connection: &mut SqliteConnection,
    session_id: SessionId,
    fixture_id: FixtureId,
) -> Result<bool, anyhow::Error> {
    let result = query(
        r#"UPDATE running_sessions SET fixture_id = $1 WHERE id = $2 AND fixture_id IS NULL"#,
    )
    .bind(fixture_id.to_db()?)
    .bind(session_id.to_db()?)
    .execute(&mut *connection)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn select_session(
    connection: &mut SqliteConnection,
    id: SessionId,
) -> Result<Option<RunningSession>, anyhow::Error> {
    let session = query_as::<_, SqlSession>(r#"SELECT * FROM running_sessions WHERE id = $1"#)
        .bind(id.to_db()?)
        .fetch_optional(&mut *connection)
        .await?;

    match session {
        Some(session) => Ok(Some(RunningSession::from_db(&session)?)),
        None => Ok(None),
    }
}

async fn select_runs(
    connection: &mut SqliteConnection,
    session_id: SessionId,
) -> Result<Vec<SessionRun>, anyhow::Error> {
    let runs = query_as::<_, SqlRun>(
        r#"SELECT * FROM session_runs WHERE session_id = $1 ORDER BY submitted_at, rowid"#,
    )
    .bind(session_id.to_db()?)
    .fetch_all(&mut *connection)
    .await?;

    Ok(runs
        .iter()
        .map(SessionRun::from_db)
        .collect::<Result<_, _>>()?)
}

#[derive(Debug, FromRow)]
pub struct SqlSession {
    id: i64,
    league_id: i64,
    week: i64,
    session_type: String,
    distance_m: f64,
    comparison_mode: String,
    status: String,
    deadline: String,
    fixture_id: Option<i64>,
}

impl DBConvertible for RunningSession {
    type DBType = SqlSession;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlSession {
            id: self.id.to_db()?,
            league_id: self.league_id.to_db()?,
            week: self.week.to_db()?,
            session_type: self.session_type.to_db()?,
            distance_m: self.distance_m,
            comparison_mode: self.comparison_mode.to_db()?,
            status: self.status.to_db()?,
            deadline: self.deadline.to_db()?,
            fixture_id: self.fixture_id.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(RunningSession {
            id: SessionId::from_db(&value.id)?,
            league_id: LeagueId::from_db(&value.league_id)?,
            week: u32::from_db(&value.week)?,
            session_type: SessionType::from_db(&value.session_type)?,
            distance_m: value.distance_m,
            comparison_mode: ComparisonMode::from_db(&value.comparison_mode)?,
            status: SessionStatus::from_db(&value.status)?,
            deadline: UtcDateTime::from_db(&value.deadline)?,
            fixture_id: Option::<FixtureId>::from_db(&value.fixture_id)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SqlRun {
    session_id: i64,
    user_id: i64,
    elapsed_seconds: i64,
    distance_m: Option<f64>,
    proof: Option<String>,
    status: String,
    reviewed_by: Option<i64>,
    reviewed_at: Option<String>,
    review_note: Option<String>,
    submitted_at: String,
}

impl DBConvertible for SessionRun {
    type DBType = SqlRun;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlRun {
            session_id: self.session_id.to_db()?,
            user_id: self.user_id.to_db()?,
            elapsed_seconds: self.elapsed_seconds,
            distance_m: self.distance_m,
            proof: self.proof.clone(),
            status: self.status.to_db()?,
            reviewed_by: self.reviewed_by.to_db()?,
            reviewed_at: self.reviewed_at.to_db()?,
            review_note: self.review_note.clone(),
            submitted_at: self.submitted_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(SessionRun {
            session_id: SessionId::from_db(&value.session_id)?,
            user_id: UserId::from_db(&value.user_id)?,
            elapsed_seconds: value.elapsed_seconds,
            distance_m: value.distance_m,
            proof: value.proof.clone(),
            status: RunStatus::from_db(&value.status)?,
            reviewed_by: Option::<UserId>::from_db(&value.reviewed_by)?,
            reviewed_at: Option::<UtcDateTime>::from_db(&value.reviewed_at)?,
            review_note: value.review_note.clone(),
            submitted_at: UtcDateTime::from_db(&value.submitted_at)?,
        })
    }
}
