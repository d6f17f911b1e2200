//! Fixtures shared by the database-backed tests.

use poise::serenity_prelude::{GuildId, UserId};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use time::{macros::date, Duration};

use crate::{
    models::{
        types::UtcDateTime, Fixture, League, MemberRole, NewLeague, RotationType, ScoringFormat,
    },
    repository::{FixtureRepository, LeagueRepository},
    rules::{LeagueRules, Rules},
    schedule::{Algorithm, FixtureIntent, GeneratedSchedule, SessionIntent},
};

/// A fresh in-memory database with all migrations applied.
///
/// A single connection that never expires keeps the database alive for the whole test.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("In-memory database should open");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Migrations should apply to an empty database");

    pool
}

pub fn new_league(slug: &str, creator: u64) -> NewLeague {
    NewLeague {
        guild: GuildId::new(1),
        slug: slug.to_string(),
        display_name: slug.to_string(),
        sport: "tennis".to_string(),
        scoring_format: ScoringFormat::Singles,
        rotation_type: RotationType::Random,
        season_weeks: 4,
        start_date: date!(2024 - 09 - 02),
        rules: Rules::default(),
        created_by: UserId::new(creator),
    }
}

/// A league owned by the first user, with the rest joining in order as plain members.
pub async fn league_with_members(
    pool: &SqlitePool,
    scoring_format: ScoringFormat,
    rotation_type: RotationType,
    members: &[u64],
) -> League {
    let leagues = LeagueRepository::new(pool.clone());
    let created_at = UtcDateTime::now();

    let league = leagues
        .create_league(
            &NewLeague {
                scoring_format,
                rotation_type,
                ..new_league("TestLeague", members[0])
            },
            created_at,
        )
        .await
        .unwrap();

    for (position, member) in members.iter().enumerate().skip(1) {
        leagues
            .add_member(
                league.id,
                UserId::new(*member),
                MemberRole::Member,
                created_at + Duration::seconds(position as i64),
            )
            .await
            .unwrap();
    }

    league
}

/// An `individual_time` league with sessions stored for weeks `1..=scheduled_weeks`.
pub async fn time_trial_league(pool: &SqlitePool, members: &[u64], scheduled_weeks: u32) -> League {
    let league = league_with_members(
        pool,
        ScoringFormat::IndividualTime,
        RotationType::Random,
        members,
    )
    .await;

    let schedule = GeneratedSchedule {
        fixtures: vec![],
        sessions: (1..=scheduled_weeks)
            .map(|week| SessionIntent { week })
            .collect(),
    };
    FixtureRepository::new(pool.clone())
        .create_schedule(&league, &schedule, &LeagueRules::default())
        .await
        .unwrap();

    league
}

/// A singles league with one week-1 fixture between `a` (side A, league owner) and `b`.
pub async fn scheduled_singles_match(pool: &SqlitePool, a: u64, b: u64) -> (League, Fixture) {
    let league =
        league_with_members(pool, ScoringFormat::Singles, RotationType::Random, &[a, b]).await;
    let fixture = schedule_match(pool, &league, &[a], &[b]).await;

    (league, fixture)
}

pub async fn schedule_match(
    pool: &SqlitePool,
    league: &League,
    side_a: &[u64],
    side_b: &[u64],
) -> Fixture {
    let fixtures = FixtureRepository::new(pool.clone());
    let schedule = GeneratedSchedule {
        fixtures: vec![FixtureIntent {
            week: 1,
            side_a: side_a.iter().copied().map(UserId::new).collect(),
            side_b: side_b.iter().copied().map(UserId::new).collect(),
            algorithm: Algorithm::SinglesRoundRobin,
            round: Some(1),
        }],
        sessions: vec![],
    };
    fixtures
        .create_schedule(league, &schedule, &LeagueRules::default())
        .await
        .unwrap();

    fixtures
        .list_fixtures(league.id, 1)
        .await
        .unwrap()
        .pop()
        .unwrap()
}
