use std::collections::BTreeMap;

use anyhow::anyhow;
use poise::serenity_prelude::UserId;
use sqlx::{query, query_as, query_scalar, FromRow, Pool, Sqlite, SqliteConnection};

use crate::{
    models::{
        types::UtcDateTime, Fixture, FixtureId, FixtureMetadata, FixtureParticipant,
        FixtureStatus, FixtureType, League, LeagueId, NewFixture, NewSession, SessionType, Side,
        PLAYER_ROLE,
    },
    repository::conversion::DBConvertible,
    rules::LeagueRules,
    schedule::{week_window, GeneratedSchedule},
};

use super::{
    conversion::{DBFromConversionError, DBToConversionError},
    session_repository::{attach_fixture, insert_session},
};

#[derive(Debug)]
pub struct FixtureRepository {
    pool: Pool<Sqlite>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatedSchedule {
    pub fixtures_created: usize,
    pub sessions_created: usize,
}

/// A finalized match together with everyone who played in it.
#[derive(Clone, Debug)]
pub struct FinalizedMatch {
    pub fixture: Fixture,
    pub participants: Vec<FixtureParticipant>,
}

impl FixtureRepository {
    pub fn new(pool: Pool<Sqlite>) -> FixtureRepository {
        FixtureRepository { pool }
    }

    /// Stores a whole generated season at once.
    ///
    /// Every session gets a paired `time_trial_session` fixture, so those count towards
    /// `fixtures_created` too. Returns `None` without writing anything if the league already
    /// has fixtures or sessions.
    pub async fn create_schedule(
        &self,
        league: &League,
        schedule: &GeneratedSchedule,
        rules: &LeagueRules,
    ) -> Result<Option<CreatedSchedule>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        // Takes the write lock before looking, so a concurrent generation waits for this one.
        lock_league(&mut *transaction, league.id).await?;

        let exists = query_scalar::<_, bool>(
            r#"
                SELECT EXISTS (SELECT 1 FROM fixtures WHERE league_id = $1)
                    OR EXISTS (SELECT 1 FROM running_sessions WHERE league_id = $1)
            "#,
        )
        .bind(league.id.to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        if exists {
            return Ok(None);
        }

        let mut created = CreatedSchedule {
            fixtures_created: 0,
            sessions_created: 0,
        };

        for intent in &schedule.fixtures {
            let (starts_at, ends_at) = week_window(league.start_date, intent.week);
            let fixture_id = insert_fixture(
                &mut *transaction,
                &NewFixture {
                    league_id: league.id,
                    week: intent.week,
                    starts_at,
                    ends_at,
                    fixture_type: FixtureType::LeagueMatch,
                    metadata: FixtureMetadata {
                        generation: Some(intent.generation()),
                        ..Default::default()
                    },
                },
            )
            .await?;

            let sides = [(Side::A, &intent.side_a), (Side::B, &intent.side_b)];
            for (side, members) in sides {
                for user in members {
                    insert_participant(&mut *transaction, fixture_id, *user, side).await?;
                }
            }

            created.fixtures_created += 1;
        }

        for intent in &schedule.sessions {
            let (starts_at, ends_at) = week_window(league.start_date, intent.week);
            let session_id = insert_session(
                &mut *transaction,
                &NewSession {
                    league_id: league.id,
                    week: intent.week,
                    session_type: SessionType::TimeTrial,
                    distance_m: rules.running.distance_m,
                    comparison_mode: rules.running.comparison_mode,
                    deadline: ends_at,
                },
            )
            .await?;

            let fixture_id = insert_fixture(
                &mut *transaction,
                &NewFixture {
                    league_id: league.id,
                    week: intent.week,
                    starts_at,
                    ends_at,
                    fixture_type: FixtureType::TimeTrialSession,
                    metadata: FixtureMetadata {
                        generation: Some(intent.generation()),
                        session_id: Some(session_id.0),
                        ..Default::default()
                    },
                },
            )
            .await?;

            attach_fixture(&mut *transaction, session_id, fixture_id).await?;

            created.sessions_created += 1;
            created.fixtures_created += 1;
        }

        transaction.commit().await?;

        Ok(Some(created))
    }

    pub async fn get_fixture(&self, id: FixtureId) -> Result<Option<Fixture>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;
        let fixture = select_fixture(&mut *transaction, id).await?;
        transaction.commit().await?;

        Ok(fixture)
    }

    pub async fn list_fixtures(
        &self,
        league_id: LeagueId,
        week: u32,
    ) -> Result<Vec<Fixture>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let fixtures = query_as::<_, SqlFixture>(
            r#"SELECT * FROM fixtures WHERE league_id = $1 AND week = $2 ORDER BY id"#,
        )
        .bind(league_id.to_db()?)
        .bind(week.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(fixtures
            .iter()
            .map(Fixture::from_db)
            .collect::<Result<_, _>>()?)
    }

    pub async fn participants(
        &self,
        fixture_id: FixtureId,
    ) -> Result<Vec<FixtureParticipant>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let participants = query_as::<_, SqlParticipant>(
            r#"
                SELECT * FROM fixture_participants
                WHERE fixture_id = $1
                ORDER BY side, rowid
            "#,
        )
        .bind(fixture_id.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(participants
            .iter()
            .map(FixtureParticipant::from_db)
            .collect::<Result<_, _>>()?)
    }

    pub async fn list_finalized_matches(
        &self,
        league_id: LeagueId,
    ) -> Result<Vec<FinalizedMatch>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let fixture_type = FixtureType::LeagueMatch.to_db()?;
        let status = FixtureStatus::Finalized.to_db()?;

        let fixtures = query_as::<_, SqlFixture>(
            r#"
                SELECT * FROM fixtures
                WHERE league_id = $1 AND fixture_type = $2 AND status = $3
                ORDER BY week, id
            "#,
        )
        .bind(league_id.to_db()?)
        .bind(&fixture_type)
        .bind(&status)
        .fetch_all(&mut *transaction)
        .await?;

        let participants = query_as::<_, SqlParticipant>(
            r#"
                SELECT p.* FROM fixture_participants p
                JOIN fixtures f ON f.id = p.fixture_id
                WHERE f.league_id = $1 AND f.fixture_type = $2 AND f.status = $3
                ORDER BY p.fixture_id, p.side, p.rowid
            "#,
        )
        .bind(league_id.to_db()?)
        .bind(&fixture_type)
        .bind(&status)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        let mut by_fixture: BTreeMap<i64, Vec<FixtureParticipant>> = BTreeMap::new();
        for participant in &participants {
            by_fixture
                .entry(participant.fixture_id)
                .or_default()
                .push(FixtureParticipant::from_db(participant)?);
        }

        fixtures
            .iter()
            .map(|fixture| -> Result<FinalizedMatch, anyhow::Error> {
                Ok(FinalizedMatch {
                    fixture: Fixture::from_db(fixture)?,
                    participants: by_fixture.remove(&fixture.id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

pub(super) async fn insert_fixture(
    connection: &mut SqliteConnection,
    fixture: &NewFixture,
) -> Result<FixtureId, anyhow::Error> {
    let id = query_scalar::<_, i64>(
        r#"
            INSERT INTO fixtures (
                league_id,
                week,
                starts_at,
                ends_at,
                fixture_type,
                status,
                metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "#,
    )
    .bind(fixture.league_id.to_db()?)
    .bind(fixture.week.to_db()?)
    .bind(fixture.starts_at.to_db()?)
    .bind(fixture.ends_at.to_db()?)
    .bind(fixture.fixture_type.to_db()?)
    .bind(FixtureStatus::Scheduled.to_db()?)
    .bind(fixture.metadata.to_db()?)
    .fetch_one(&mut *connection)
    .await?;

    Ok(FixtureId::from_db(&id)?)
}

async fn lock_league(connection: &mut SqliteConnection, id: LeagueId) -> Result<(), anyhow::Error> {
    let locked = query(r#"UPDATE leagues SET id = id WHERE id = $1"#)
        .bind(id.to_db()?)
        .execute(&mut *connection)
        .await?;

    if locked.rows_affected() == 0 {
        return Err(anyhow!("League {} does not exist", id.0));
    }

    Ok(())
}

/// Returns the fixture if it is still open, holding the write lock for the rest of the
/// transaction. Finalized and cancelled fixtures yield `None`.
pub(super) async fn claim_open_fixture(
    connection: &mut SqliteConnection,
    id: FixtureId,
) -> Result<Option<Fixture>, anyhow::Error> {
    let fixture = query_as::<_, SqlFixture>(
        r#"
            UPDATE fixtures SET status = status
            WHERE id = $1 AND status NOT IN ($2, $3)
            RETURNING *
        "#,
    )
    .bind(id.to_db()?)
    .bind(FixtureStatus::Finalized.to_db()?)
    .bind(FixtureStatus::Cancelled.to_db()?)
    .fetch_optional(&mut *connection)
    .await?;

    match fixture {
        Some(fixture) => Ok(Some(Fixture::from_db(&fixture)?)),
        None => Ok(None),
    }
}

pub(super) async fn select_fixture(
    connection: &mut SqliteConnection,
    id: FixtureId,
) -> Result<Option<Fixture>, anyhow::Error> {
    let fixture = query_as::<_, SqlFixture>(r#"SELECT * FROM fixtures WHERE id = $1"#)
        .bind(id.to_db()?)
        .fetch_optional(&mut *connection)
        .await?;

    match fixture {
        Some(fixture) => Ok(Some(Fixture::from_db(&fixture)?)),
        None => Ok(None),
    }
}

/// Writes status and metadata back. Used by the result and session repositories.
pub(super) async fn update_fixture(
    connection: &mut SqliteConnection,
    id: FixtureId,
    status: FixtureStatus,
    metadata: &FixtureMetadata,
) -> Result<(), anyhow::Error> {
    query(r#"UPDATE fixtures SET status = $1, metadata = $2 WHERE id = $3"#)
        .bind(status.to_db()?)
        .bind(metadata.to_db()?)
        .bind(id.to_db()?)
        .execute(&mut *connection)
        .await?;

    Ok(())
}

async fn insert_participant(
    connection: &mut SqliteConnection,
    fixture_id: FixtureId,
    user: UserId,
    side: Side,
) -> Result<(), anyhow::Error> {
    query(
        r#"
            INSERT INTO fixture_participants (fixture_id, user_id, side, role)
            VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(fixture_id.to_db()?)
    .bind(user.to_db()?)
    .bind(side.to_db()?)
    .bind(PLAYER_ROLE)
    .execute(&mut *connection)
    .await?;

    Ok(())
}

#[derive(Debug, FromRow)]
pub struct SqlFixture {
    id: i64,
    league_id: i64,
    week: i64,
    starts_at: String,
    ends_at: String,
    fixture_type: String,
    status: String,
    metadata: String,
}

impl DBConvertible for Fixture {
    type DBType = SqlFixture;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlFixture {
            id: self.id.to_db()?,
            league_id: self.league_id.to_db()?,
            week: self.week.to_db()?,
            starts_at: self.starts_at.to_db()?,
            ends_at: self.ends_at.to_db()?,
            fixture_type: self.fixture_type.to_db()?,
            status: self.status.to_db()?,
            metadata: self.metadata.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Fixture {
            id: FixtureId::from_db(&value.id)?,
            league_id: LeagueId::from_db(&value.league_id)?,
            week: u32::from_db(&value.week)?,
            starts_at: UtcDateTime::from_db(&value.starts_at)?,
            ends_at: UtcDateTime::from_db(&value.ends_at)?,
            fixture_type: FixtureType::from_db(&value.fixture_type)?,
            status: FixtureStatus::from_db(&value.status)?,
            metadata: FixtureMetadata::from_db(&value.metadata)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SqlParticipant {
    fixture_id: i64,
    user_id: i64,
    side: String,
    role: String,
}

impl DBConvertible for FixtureParticipant {
    type DBType = SqlParticipant;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlParticipant {
            fixture_id: self.fixture_id.to_db()?,
            user_id: self.user_id.to_db()?,
            side: self.side.to_db()?,
            role: self.role.clone(),
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(FixtureParticipant {
            fixture_id: FixtureId::from_db(&value.fixture_id)?,
            user_id: UserId::from_db(&value.user_id)?,
            side: Side::from_db(&value.side)?,
            role: value.role.clone(),
        })
    }
}
