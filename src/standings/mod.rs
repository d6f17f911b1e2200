//! Standings computed on demand from every place results are kept.
//!
//! Legacy matches, finalized workflow fixtures and finalized running sessions are normalized
//! into one shape by [`ResultSource::normalize`] and then folded by the league's scoring format.

mod ranking;
mod sources;
mod team;

use std::sync::Arc;

use poise::serenity_prelude::UserId;
use serde::Serialize;
use tracing::debug;

use crate::{
    models::{ComparisonMode, LeagueId, ScoringFormat},
    repository::{FixtureRepository, LeagueRepository, MatchRepository, SessionRepository},
    rules::LeagueRules,
    workflow::{WorkflowError, WorkflowResult},
};

pub use ranking::{rank_members, Standing};
use sources::ResultSource;
pub use team::{rank_teams, TeamStanding};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCounts {
    pub legacy_completed_matches: usize,
    pub workflow_finalized_fixtures: usize,
    pub workflow_finalized_sessions: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsReport {
    pub standings: Vec<Standing>,
    pub team_standings: Vec<TeamStanding>,
    /// Only set for `individual_time` leagues.
    pub running_mode: Option<ComparisonMode>,
    pub sources: SourceCounts,
}

pub struct StandingsService {
    leagues: Arc<LeagueRepository>,
    fixtures: Arc<FixtureRepository>,
    sessions: Arc<SessionRepository>,
    matches: Arc<MatchRepository>,
}

impl StandingsService {
    pub fn new(
        leagues: Arc<LeagueRepository>,
        fixtures: Arc<FixtureRepository>,
        sessions: Arc<SessionRepository>,
        matches: Arc<MatchRepository>,
    ) -> StandingsService {
        StandingsService {
            leagues,
            fixtures,
            sessions,
            matches,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn compute_standings(&self, league_id: LeagueId) -> WorkflowResult<StandingsReport> {
        let league = self
            .leagues
            .get_league(league_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("League {} does not exist", league_id.0)))?;
        let rules = LeagueRules::resolve(&league.rules)?;

        let roster: Vec<UserId> = self
            .leagues
            .list_members(league.id)
            .await?
            .into_iter()
            .map(|member| member.user_id)
            .collect();

        let legacy = self.matches.list_completed_matches(league.id).await?;
        let fixtures = self.fixtures.list_finalized_matches(league.id).await?;
        let sessions = self.sessions.list_finalized_sessions(league.id).await?;

        let sources = SourceCounts {
            legacy_completed_matches: legacy.len(),
            workflow_finalized_fixtures: fixtures.len(),
            workflow_finalized_sessions: sessions.len(),
        };
        debug!("Computing standings of league {} from {sources:?}", league.slug);

        let mut matches = Vec::new();
        let mut participants = Vec::new();
        let all_sources = legacy
            .into_iter()
            .map(ResultSource::Legacy)
            .chain(fixtures.into_iter().map(ResultSource::Workflow))
            .chain(sessions.into_iter().map(ResultSource::Running));
        for source in all_sources {
            let (completed, players) = source.normalize();
            matches.push(completed);
            participants.extend(players);
        }

        let comparison_mode = rules.running.comparison_mode;
        let standings = rank_members(
            &league.scoring_format,
            comparison_mode,
            &roster,
            &matches,
            &participants,
        );

        let team_standings = match league.scoring_format {
            ScoringFormat::Doubles => rank_teams(&matches, &participants),
            _ => Vec::new(),
        };

        let running_mode = match league.scoring_format {
            ScoringFormat::IndividualTime => Some(comparison_mode),
            _ => None,
        };

        Ok(StandingsReport {
            standings,
            team_standings,
            running_mode,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use poise::serenity_prelude::UserId;
    use serde_json::json;
    use sqlx::SqlitePool;

    use crate::{
        models::{
            types::UtcDateTime, ComparisonMode, LegacyParticipant, ResultPayload, RotationType,
            ScoringFormat, Side,
        },
        repository::{
            FixtureRepository, LeagueRepository, MatchRepository, ResultRepository,
            SessionRepository,
        },
        test_utils::{league_with_members, schedule_match, test_pool, time_trial_league},
        workflow::{ResultWorkflow, RunSubmission, RunWorkflow},
    };

    use super::StandingsService;

    fn service(pool: &SqlitePool) -> StandingsService {
        StandingsService::new(
            Arc::new(LeagueRepository::new(pool.clone())),
            Arc::new(FixtureRepository::new(pool.clone())),
            Arc::new(SessionRepository::new(pool.clone())),
            Arc::new(MatchRepository::new(pool.clone())),
        )
    }

    fn results(pool: &SqlitePool) -> ResultWorkflow {
        ResultWorkflow::new(
            Arc::new(LeagueRepository::new(pool.clone())),
            Arc::new(FixtureRepository::new(pool.clone())),
            Arc::new(ResultRepository::new(pool.clone())),
        )
    }

    #[test_log::test(tokio::test)]
    async fn legacy_and_workflow_results_add_up() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::Singles,
            RotationType::Random,
            &[1, 2, 3],
        )
        .await;

        MatchRepository::new(pool.clone())
            .record_match(
                league.id,
                1,
                Some(Side::B),
                &[
                    LegacyParticipant {
                        user_id: UserId::new(2),
                        side: Some(Side::A),
                        score: None,
                        elapsed_seconds: None,
                        distance_m: None,
                        points: None,
                    },
                    LegacyParticipant {
                        user_id: UserId::new(3),
                        side: Some(Side::B),
                        score: None,
                        elapsed_seconds: None,
                        distance_m: None,
                        points: None,
                    },
                ],
            )
            .await
            .unwrap();

        let fixture = schedule_match(&pool, &league, &[1], &[3]).await;
        results(&pool)
            .submit_result(
                fixture.id,
                UserId::new(1),
                ResultPayload {
                    winner: Some(Side::B),
                    ..Default::default()
                },
                UtcDateTime::now(),
            )
            .await
            .unwrap();

        let report = service(&pool).compute_standings(league.id).await.unwrap();
        assert_eq!(report.sources.legacy_completed_matches, 1);
        assert_eq!(report.sources.workflow_finalized_fixtures, 1);
        assert_eq!(report.sources.workflow_finalized_sessions, 0);
        assert_eq!(report.running_mode, None);

        let leader = &report.standings[0];
        assert_eq!(leader.user_id, UserId::new(3));
        assert_eq!((leader.wins, leader.losses), (2, 0));
        assert_eq!(report.standings.len(), 3);
    }

    #[test_log::test(tokio::test)]
    async fn finalized_sessions_rank_runners() {
        let pool = test_pool().await;
        let league = time_trial_league(&pool, &[1, 2, 3], 1).await;
        let session = SessionRepository::new(pool.clone())
            .get_session_for_week(league.id, 1)
            .await
            .unwrap()
            .unwrap();
        let runs = RunWorkflow::new(
            Arc::new(LeagueRepository::new(pool.clone())),
            Arc::new(SessionRepository::new(pool.clone())),
        );

        for (user, elapsed) in [(1, 630), (2, 590)] {
            runs.submit_run(
                session.id,
                UserId::new(user),
                RunSubmission {
                    elapsed_seconds: elapsed,
                    distance_m: None,
                    proof: None,
                },
                UtcDateTime::start_of(league.start_date),
            )
            .await
            .unwrap();
        }
        runs.finalize_session(session.id, UserId::new(1))
            .await
            .unwrap();

        let report = service(&pool).compute_standings(league.id).await.unwrap();
        assert_eq!(report.running_mode, Some(ComparisonMode::AbsolutePerformance));
        assert_eq!(report.sources.workflow_finalized_sessions, 1);

        let order: Vec<_> = report
            .standings
            .iter()
            .map(|standing| standing.user_id.get())
            .collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert!(report.team_standings.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn doubles_report_team_standings() {
        let pool = test_pool().await;
        let league = league_with_members(
            &pool,
            ScoringFormat::Doubles,
            RotationType::Assigned,
            &[1, 2, 3, 4],
        )
        .await;
        let fixture = schedule_match(&pool, &league, &[1, 2], &[3, 4]).await;
        results(&pool)
            .submit_result(
                fixture.id,
                UserId::new(1),
                ResultPayload {
                    score_a: Some(6),
                    score_b: Some(3),
                    ..Default::default()
                },
                UtcDateTime::now(),
            )
            .await
            .unwrap();

        let report = service(&pool).compute_standings(league.id).await.unwrap();
        assert_eq!(report.team_standings.len(), 2);
        assert_eq!(
            report.team_standings[0].members,
            [UserId::new(1), UserId::new(2)]
        );

        let serialized = serde_json::to_value(&report).unwrap();
        assert_eq!(serialized["sources"]["workflowFinalizedFixtures"], json!(1));
        assert!(serialized["teamStandings"][0]["winPercentage"].is_number());
    }
}
