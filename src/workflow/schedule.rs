use std::sync::Arc;

use poise::serenity_prelude::UserId;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    models::{Fixture, FixtureParticipant, LeagueId},
    repository::{FixtureRepository, LeagueRepository},
    rules::LeagueRules,
    schedule::generate_schedule,
};

use super::{load_league, require_admin, WorkflowError, WorkflowResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    pub fixtures_created: usize,
    pub sessions_created: usize,
}

#[derive(Clone, Debug)]
pub struct WeekFixture {
    pub fixture: Fixture,
    pub participants: Vec<FixtureParticipant>,
}

pub struct ScheduleService {
    leagues: Arc<LeagueRepository>,
    fixtures: Arc<FixtureRepository>,
}

impl ScheduleService {
    pub fn new(leagues: Arc<LeagueRepository>, fixtures: Arc<FixtureRepository>) -> ScheduleService {
        ScheduleService { leagues, fixtures }
    }

    pub async fn generate_schedule(
        &self,
        league_id: LeagueId,
        caller: UserId,
    ) -> WorkflowResult<ScheduleOutcome> {
        self.generate_schedule_with(league_id, caller, StdRng::from_entropy())
            .await
    }

    /// Generates and stores the whole season. Random doubles draw from `rng`.
    #[tracing::instrument(skip(self, rng))]
    pub async fn generate_schedule_with<R: Rng + Send>(
        &self,
        league_id: LeagueId,
        caller: UserId,
        rng: R,
    ) -> WorkflowResult<ScheduleOutcome> {
        let league = load_league(&self.leagues, league_id).await?;
        require_admin(&self.leagues, &league, caller).await?;

        let roster: Vec<UserId> = self
            .leagues
            .list_members(league.id)
            .await?
            .into_iter()
            .map(|member| member.user_id)
            .collect();
        let rules = LeagueRules::resolve(&league.rules)?;

        let schedule = generate_schedule(&league, &roster, &rules, rng)?;
        let Some(created) = self
            .fixtures
            .create_schedule(&league, &schedule, &rules)
            .await?
        else {
            debug!("League {} already has a schedule", league.slug);
            return Err(WorkflowError::Conflict(format!(
                "{} already has a schedule",
                league.display_name
            )));
        };

        info!(
            "Generated schedule for league {}: {} fixtures, {} sessions",
            league.slug, created.fixtures_created, created.sessions_created
        );

        Ok(ScheduleOutcome {
            fixtures_created: created.fixtures_created,
            sessions_created: created.sessions_created,
        })
    }

    pub async fn week_fixtures(
        &self,
        league_id: LeagueId,
        week: u32,
    ) -> WorkflowResult<Vec<WeekFixture>> {
        let league = load_league(&self.leagues, league_id).await?;
        if week < 1 || week > league.season_weeks {
            return Err(WorkflowError::Validation(format!(
                "{} runs for weeks 1 to {}",
                league.display_name, league.season_weeks
            )));
        }

        let mut week_fixtures = Vec::new();
        for fixture in self.fixtures.list_fixtures(league.id, week).await? {
            let participants = self.fixtures.participants(fixture.id).await?;
            week_fixtures.push(WeekFixture {
                fixture,
                participants,
            });
        }

        Ok(week_fixtures)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use poise::serenity_prelude::UserId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sqlx::SqlitePool;

    use crate::{
        models::{FixtureStatus, FixtureType, MemberRole, RotationType, ScoringFormat, Side},
        repository::{FixtureRepository, LeagueRepository, SessionRepository},
        test_utils::{league_with_members, test_pool},
        workflow::WorkflowError,
    };

    use super::{ScheduleOutcome, ScheduleService};

    fn service(pool: &SqlitePool) -> ScheduleService {
        ScheduleService::new(
            Arc::new(LeagueRepository::new(pool.clone())),
            Arc::new(FixtureRepository::new(pool.clone())),
        )
    }

    #[test_log::test(tokio::test)]
    async fn singles_season_is_stored_once() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::Singles,
            RotationType::Random,
            &[1, 2, 3, 4],
        )
        .await;
        let service = service(&pool);

        let outcome = service
            .generate_schedule(league.id, UserId::new(1))
            .await
            .unwrap();
        // Four weeks of two matches each.
        assert_eq!(
            outcome,
            ScheduleOutcome {
                fixtures_created: 8,
                sessions_created: 0
            }
        );

        let week = service.week_fixtures(league.id, 1).await.unwrap();
        assert_eq!(week.len(), 2);
        for entry in &week {
            assert_eq!(entry.fixture.status, FixtureStatus::Scheduled);
            assert_eq!(entry.fixture.fixture_type, FixtureType::LeagueMatch);
            assert_eq!(entry.participants.len(), 2);
            assert_eq!(entry.participants[0].side, Side::A);
            assert_eq!(entry.participants[1].side, Side::B);
        }

        let again = service.generate_schedule(league.id, UserId::new(1)).await;
        assert!(matches!(again, Err(WorkflowError::Conflict(_))));
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_generation_stores_one_season() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::Singles,
            RotationType::Random,
            &[1, 2, 3, 4],
        )
        .await;
        let service = service(&pool);

        let (first, second) = tokio::join!(
            service.generate_schedule(league.id, UserId::new(1)),
            service.generate_schedule(league.id, UserId::new(1)),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|outcome| matches!(outcome, Err(WorkflowError::Conflict(_)))));

        let mut stored = 0;
        for week in 1..=4 {
            stored += service.week_fixtures(league.id, week).await.unwrap().len();
        }
        assert_eq!(stored, 8);
    }

    #[test_log::test(tokio::test)]
    async fn only_admins_generate() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::Singles,
            RotationType::Random,
            &[1, 2, 3],
        )
        .await;
        let service = service(&pool);

        let by_member = service.generate_schedule(league.id, UserId::new(2)).await;
        assert!(matches!(by_member, Err(WorkflowError::Unauthorized(_))));

        LeagueRepository::new(pool.clone())
            .set_member_role(league.id, UserId::new(2), MemberRole::Admin)
            .await
            .unwrap();
        assert!(service
            .generate_schedule(league.id, UserId::new(2))
            .await
            .is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn random_doubles_use_the_given_rng() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::Doubles,
            RotationType::Random,
            &[1, 2, 3, 4, 5],
        )
        .await;

        let outcome = service(&pool)
            .generate_schedule_with(league.id, UserId::new(1), ChaCha8Rng::seed_from_u64(7))
            .await
            .unwrap();
        assert_eq!(outcome.fixtures_created, 4);
    }

    #[test_log::test(tokio::test)]
    async fn time_trial_season_pairs_every_session() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::IndividualTime,
            RotationType::Random,
            &[1, 2],
        )
        .await;
        let service = service(&pool);

        let outcome = service
            .generate_schedule(league.id, UserId::new(1))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ScheduleOutcome {
                fixtures_created: 4,
                sessions_created: 4
            }
        );

        let session = SessionRepository::new(pool.clone())
            .get_session_for_week(league.id, 2)
            .await
            .unwrap()
            .unwrap();
        let week = service.week_fixtures(league.id, 2).await.unwrap();
        assert_eq!(week.len(), 1);
        assert_eq!(session.fixture_id, Some(week[0].fixture.id));
        assert_eq!(
            week[0].fixture.fixture_type,
            FixtureType::TimeTrialSession
        );
    }

    #[test_log::test(tokio::test)]
    async fn unsupported_format_is_a_validation_error() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::TeamVsTeam,
            RotationType::Random,
            &[1, 2],
        )
        .await;

        let result = service(&pool).generate_schedule(league.id, UserId::new(1)).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    #[test_log::test(tokio::test)]
    async fn weeks_outside_the_season_are_rejected() {
        let pool = test_pool().await;
        let league =
            league_with_members(&pool, ScoringFormat::Singles, RotationType::Random, &[1, 2])
                .await;

        let result = service(&pool).week_fixtures(league.id, 5).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }
}
