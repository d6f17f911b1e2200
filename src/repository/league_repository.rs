use poise::serenity_prelude::{GuildId, UserId};
use sqlx::{query, query_as, FromRow, Pool, Sqlite};

use crate::{
    models::{
        types::UtcDateTime, League, LeagueId, Member, MemberRole, NewLeague, RotationType,
        ScoringFormat,
    },
    repository::conversion::DBConvertible,
    rules::Rules,
};

use super::conversion::{DBFromConversionError, DBToConversionError};

#[derive(Debug)]
pub struct LeagueRepository {
    pool: Pool<Sqlite>,
}

impl LeagueRepository {
    pub fn new(pool: Pool<Sqlite>) -> LeagueRepository {
        LeagueRepository { pool }
    }

    /// Creates the league and makes its creator the owner.
    pub async fn create_league(
        &self,
        new_league: &NewLeague,
        created_at: UtcDateTime,
    ) -> Result<League, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let league = query_as::<_, SqlLeague>(
            r#"
                INSERT INTO leagues (
                    guild,
                    slug,
                    display_name,
                    sport,
                    scoring_format,
                    rotation_type,
                    season_weeks,
                    start_date,
                    rules,
                    created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            "#,
        )
        .bind(new_league.guild.to_db()?)
        .bind(&new_league.slug)
        .bind(&new_league.display_name)
        .bind(&new_league.sport)
        .bind(new_league.scoring_format.to_db()?)
        .bind(new_league.rotation_type.to_db()?)
        .bind(new_league.season_weeks.to_db()?)
        .bind(new_league.start_date.to_db()?)
        .bind(new_league.rules.to_db()?)
        .bind(new_league.created_by.to_db()?)
        .fetch_one(&mut *transaction)
        .await?;

        query(
            r#"
                INSERT INTO league_members (league_id, user_id, role, joined_at)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(league.id)
        .bind(new_league.created_by.to_db()?)
        .bind(MemberRole::Owner.to_db()?)
        .bind(created_at.to_db()?)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(League::from_db(&league)?)
    }

    pub async fn get_league(&self, id: LeagueId) -> Result<Option<League>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let league = query_as::<_, SqlLeague>(r#"SELECT * FROM leagues WHERE id = $1"#)
            .bind(id.to_db()?)
            .fetch_optional(&mut *transaction)
            .await?;

        transaction.commit().await?;

        match league {
            Some(league) => Ok(Some(League::from_db(&league)?)),
            None => Ok(None),
        }
    }

    pub async fn get_league_by_slug(
        &self,
        guild: GuildId,
        slug: &str,
    ) -> Result<Option<League>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let league =
            query_as::<_, SqlLeague>(r#"SELECT * FROM leagues WHERE guild = $1 AND slug = $2"#)
                .bind(guild.to_db()?)
                .bind(slug)
                .fetch_optional(&mut *transaction)
                .await?;

        transaction.commit().await?;

        match league {
            Some(league) => Ok(Some(League::from_db(&league)?)),
            None => Ok(None),
        }
    }

    pub async fn list_leagues(&self, guild: GuildId) -> Result<Vec<League>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let leagues = query_as::<_, SqlLeague>(
            r#"SELECT * FROM leagues WHERE guild = $1 ORDER BY start_date, display_name"#,
        )
        .bind(guild.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(leagues
            .iter()
            .map(League::from_db)
            .collect::<Result<_, _>>()?)
    }

    pub async fn update_rules(&self, id: LeagueId, rules: &Rules) -> Result<(), anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        query(r#"UPDATE leagues SET rules = $1 WHERE id = $2"#)
            .bind(rules.to_db()?)
            .bind(id.to_db()?)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(())
    }

    /// Adds a member unless they have already joined. Returns whether a row was added.
    pub async fn add_member(
        &self,
        league_id: LeagueId,
        user: UserId,
        role: MemberRole,
        joined_at: UtcDateTime,
    ) -> Result<bool, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let result = query(
            r#"
                INSERT INTO league_members (league_id, user_id, role, joined_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (league_id, user_id) DO NOTHING
            "#,
        )
        .bind(league_id.to_db()?)
        .bind(user.to_db()?)
        .bind(role.to_db()?)
        .bind(joined_at.to_db()?)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_member(
        &self,
        league_id: LeagueId,
        user: UserId,
    ) -> Result<Option<Member>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let member = query_as::<_, SqlMember>(
            r#"SELECT * FROM league_members WHERE league_id = $1 AND user_id = $2"#,
        )
        .bind(league_id.to_db()?)
        .bind(user.to_db()?)
        .fetch_optional(&mut *transaction)
        .await?;

        transaction.commit().await?;

        match member {
            Some(member) => Ok(Some(Member::from_db(&member)?)),
            None => Ok(None),
        }
    }

    /// Members in the order they joined.
    pub async fn list_members(&self, league_id: LeagueId) -> Result<Vec<Member>, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let members = query_as::<_, SqlMember>(
            r#"
                SELECT * FROM league_members
                WHERE league_id = $1
                ORDER BY joined_at, rowid
            "#,
        )
        .bind(league_id.to_db()?)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(members
            .iter()
            .map(Member::from_db)
            .collect::<Result<_, _>>()?)
    }

    pub async fn set_member_role(
        &self,
        league_id: LeagueId,
        user: UserId,
        role: MemberRole,
    ) -> Result<bool, anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        let result =
            query(r#"UPDATE league_members SET role = $1 WHERE league_id = $2 AND user_id = $3"#)
                .bind(role.to_db()?)
                .bind(league_id.to_db()?)
                .bind(user.to_db()?)
                .execute(&mut *transaction)
                .await?;

        transaction.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, FromRow)]
pub struct SqlLeague {
    id: i64,
    guild: i64,
    slug: String,
    display_name: String,
    sport: String,
    scoring_format: String,
    rotation_type: String,
    season_weeks: i64,
    start_date: String,
    rules: String,
    created_by: i64,
}

impl DBConvertible for League {
    type DBType = SqlLeague;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlLeague {
            id: self.id.to_db()?,
            guild: self.guild.to_db()?,
            slug: self.slug.clone(),
            display_name: self.display_name.clone(),
            sport: self.sport.clone(),
            scoring_format: self.scoring_format.to_db()?,
            rotation_type: self.rotation_type.to_db()?,
            season_weeks: self.season_weeks.to_db()?,
            start_date: self.start_date.to_db()?,
            rules: self.rules.to_db()?,
            created_by: self.created_by.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(League {
            id: LeagueId::from_db(&value.id)?,
            guild: GuildId::from_db(&value.guild)?,
            slug: value.slug.clone(),
            display_name: value.display_name.clone(),
            sport: value.sport.clone(),
            scoring_format: ScoringFormat::from_db(&value.scoring_format)?,
            rotation_type: RotationType::from_db(&value.rotation_type)?,
            season_weeks: u32::from_db(&value.season_weeks)?,
            start_date: time::Date::from_db(&value.start_date)?,
            rules: Rules::from_db(&value.rules)?,
            created_by: UserId::from_db(&value.created_by)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SqlMember {
    league_id: i64,
    user_id: i64,
    role: String,
    joined_at: String,
}

impl DBConvertible for Member {
    type DBType = SqlMember;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(SqlMember {
            league_id: self.league_id.to_db()?,
            user_id: self.user_id.to_db()?,
            role: self.role.to_db()?,
            joined_at: self.joined_at.to_db()?,
        })
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Member {
            league_id: LeagueId::from_db(&value.league_id)?,
            user_id: UserId::from_db(&value.user_id)?,
            role: MemberRole::from_db(&value.role)?,
            joined_at: UtcDateTime::from_db(&value.joined_at)?,
        })
    }
}
