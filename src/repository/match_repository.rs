use std::collections::BTreeMap;

use poise::serenity_prelude::UserId;
use sqlx::{query_as, FromRow, Pool, Sqlite};

use crate::{
    models::{LeagueId, LegacyMatch, LegacyParticipant, MatchId, Side},
    repository::conversion::DBConvertible,
};

use super::conversion::{DBFromConversionError, DBToConversionError};

/// Read access to matches recorded before the result workflow.
#[derive(Debug)]
pub struct MatchRepository {
    pool: Pool<Sqlite>,
}

impl MatchRepository {
    pub fn new(pool: Pool<Sqlite>) -> MatchRepository {
        MatchRepository { pool }
    }

    pub async fn list_completed_matches(
        &self,
        league_id: LeagueId,
    ) -> Result<Vec<LegacyMatch>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let matches = query_as::<_, SqlMatch>(
            r#"
                SELECT * FROM legacy_matches
                WHERE league_id = $1 AND completed = 1
                ORDER BY week, id
            "#,
        )
        .bind(league_id.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        let participants = query_as::<_, SqlMatchParticipant>(
            r#"
                SELECT p.* FROM legacy_match_participants p
                JOIN legacy_matches m ON m.id = p.match_id
                WHERE m.league_id = $1 AND m.completed = 1
                ORDER BY p.match_id, p.rowid
            "#,
        )
        .bind(league_id.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        let mut by_match: BTreeMap<i64, Vec<LegacyParticipant>> = BTreeMap::new();
        for participant in &participants {
            by_match
                .entry(participant.match_id)
                .or_default()
                .push(LegacyParticipant::from_db(participant)?);
        }

        matches
            .iter()
            .map(|row| -> Result<LegacyMatch, anyhow::Error> {
                Ok(LegacyMatch {
                    id: MatchId::from_db(&row.id)?,
                    league_id: LeagueId::from_db(&row.league_id)?,
                    week: u32::from_db(&row.week)?,
                    completed: row.completed,
                    winner: Option::<Side>::from_db(&row.winner)?,
                    participants: by_match.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }

    #[cfg(test)]
    pub async fn record_match(
        &self,
        league_id: LeagueId,
        week: u32,
        winner: Option<Side>,
        participants: &[LegacyParticipant],
    ) -> Result<MatchId, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
                INSERT INTO legacy_matches (league_id, week, completed, winner)
                VALUES ($1, $2, 1, $3)
                RETURNING id
            "#,
        )
        .bind(league_id.to_db()?)
        .bind(week.to_db()?)
        .bind(winner.to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        for participant in participants {
            sqlx::query(
                r#"
                    INSERT INTO legacy_match_participants (
                        match_id, user_id, side, score, elapsed_seconds, distance_m, points)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(id)
            .bind(participant.user_id.to_db()?)
            .bind(participant.side.to_db()?)
            .bind(participant.score)
            .bind(participant.elapsed_seconds)
            .bind(participant.distance_m)
            .bind(participant.points)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        Ok(MatchId::from_db(&id)?)
    }
}

#[derive(Debug, FromRow)]
pub struct SqlMatch {
    id: i64,
    league_id: i64,
    week: i64,
    completed: bool,
    winner: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct SqlMatchParticipant {
    match_id: i64,
    user_id: i64,
    side: Option<String>,
    score: Option<i64>,
    elapsed_seconds: Option<i64>,
    distance_m: Option<f64>,
    points: Option<f64>,
}

// The match id lives on the parent, so only the participant half converts both ways.
impl DBConvertible for LegacyParticipant {
    type DBType = SqlMatchParticipant;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlMatchParticipant {
            match_id: 0,
            user_id: self.user_id.to_db()?,
            side: self.side.to_db()?,
            score: self.score,
            elapsed_seconds: self.elapsed_seconds,
            distance_m: self.distance_m,
            points: self.points,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(LegacyParticipant {
            user_id: UserId::from_db(&value.user_id)?,
            side: Option::<Side>::from_db(&value.side)?,
            score: value.score,
            elapsed_seconds: value.elapsed_seconds,
            distance_m: value.distance_m,
            points: value.points,
        })
    }
}
