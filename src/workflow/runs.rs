use std::sync::Arc;

use poise::serenity_prelude::UserId;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    models::{
        types::UtcDateTime, League, NewRun, RunStatus, RunningSession, SessionId, SessionRun,
        SessionStatus,
    },
    repository::{LeagueRepository, SessionRepository},
    rules::LeagueRules,
    schedule::week_window,
};

use super::{load_league, require_admin, require_member, WorkflowError, WorkflowResult};

#[derive(Clone, Debug)]
pub struct RunSubmission {
    pub elapsed_seconds: i64,
    pub distance_m: Option<f64>,
    pub proof: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub success: bool,
    pub run: SessionRun,
    pub requires_review: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOutcome {
    pub success: bool,
    pub finalized_runs: Vec<SessionRun>,
    /// Submitted runs were left out because nobody reviewed them.
    pub requires_review: bool,
}

/// Run submission, review and session finalization for time trial leagues.
pub struct RunWorkflow {
    leagues: Arc<LeagueRepository>,
    sessions: Arc<SessionRepository>,
}

impl RunWorkflow {
    pub fn new(leagues: Arc<LeagueRepository>, sessions: Arc<SessionRepository>) -> RunWorkflow {
        RunWorkflow { leagues, sessions }
    }

    /// Stores the caller's run, replacing an earlier one for the same session.
    #[tracing::instrument(skip(self))]
    pub async fn submit_run(
        &self,
        session_id: SessionId,
        caller: UserId,
        submission: RunSubmission,
        at: UtcDateTime,
    ) -> WorkflowResult<RunOutcome> {
        if submission.elapsed_seconds <= 0 {
            return Err(WorkflowError::Validation(
                "The elapsed time must be positive".to_string(),
            ));
        }
        if let Some(distance) = submission.distance_m {
            if !distance.is_finite() || distance <= 0.0 {
                return Err(WorkflowError::Validation(
                    "The distance must be positive".to_string(),
                ));
            }
        }

        let (league, session) = self.load_session(session_id).await?;
        let member = require_member(&self.leagues, &league, caller).await?;

        if matches!(
            session.status,
            SessionStatus::Closed | SessionStatus::Finalized
        ) {
            return Err(WorkflowError::Conflict(format!(
                "The week {} session is {} and takes no more runs",
                session.week, session.status
            )));
        }

        if !member.role.is_admin() && at > session.deadline {
            debug!(
                "Run by {caller} for session {} came after the deadline",
                session.id.0
            );
            return Err(WorkflowError::Conflict(format!(
                "The week {} session closed for submissions",
                session.week
            )));
        }

        let rules = LeagueRules::resolve(&league.rules)?;

        if session.fixture_id.is_none() {
            let (starts_at, _) = week_window(league.start_date, session.week);
            self.sessions.pair_with_fixture(&session, starts_at).await?;
        }

        let requires_review = rules.running.require_approval;
        let run = self
            .sessions
            .upsert_run(&NewRun {
                session_id: session.id,
                user_id: caller,
                elapsed_seconds: submission.elapsed_seconds,
                distance_m: submission.distance_m,
                proof: submission.proof,
                status: if requires_review {
                    RunStatus::Submitted
                } else {
                    RunStatus::Approved
                },
                submitted_at: at,
            })
            .await?;

        info!(
            "User {caller} submitted a {}s run for session {} ({})",
            run.elapsed_seconds, session.id.0, run.status
        );

        Ok(RunOutcome {
            success: true,
            run,
            requires_review,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn review_run(
        &self,
        session_id: SessionId,
        runner: UserId,
        caller: UserId,
        approve: bool,
        note: Option<String>,
        at: UtcDateTime,
    ) -> WorkflowResult<RunOutcome> {
        let (league, session) = self.load_session(session_id).await?;
        require_admin(&self.leagues, &league, caller).await?;

        if session.status == SessionStatus::Finalized {
            return Err(WorkflowError::Conflict(format!(
                "The week {} session is already finalized",
                session.week
            )));
        }

        let run = self
            .sessions
            .get_run(session.id, runner)
            .await?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!("<@{runner}> has no run in this session"))
            })?;
        if run.status == RunStatus::Finalized {
            return Err(WorkflowError::Conflict(format!(
                "The run of <@{runner}> is already finalized"
            )));
        }

        let status = if approve {
            RunStatus::Approved
        } else {
            RunStatus::Rejected
        };
        let run = self
            .sessions
            .review_run(session.id, runner, status, caller, at, note.as_deref())
            .await?
            .ok_or_else(|| {
                WorkflowError::Conflict(format!(
                    "The run of <@{runner}> was finalized in the meantime"
                ))
            })?;

        info!(
            "Organizer {caller} marked the run of {runner} in session {} as {status}",
            session.id.0
        );

        Ok(RunOutcome {
            success: true,
            run,
            requires_review: false,
        })
    }

    /// Locks the session and promotes its eligible runs.
    ///
    /// With approval required only approved runs count, otherwise submitted runs do too. An
    /// already finalized session promotes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn finalize_session(
        &self,
        session_id: SessionId,
        caller: UserId,
    ) -> WorkflowResult<FinalizeOutcome> {
        let (league, session) = self.load_session(session_id).await?;
        require_admin(&self.leagues, &league, caller).await?;

        if session.status == SessionStatus::Finalized {
            debug!("Session {} is already finalized", session.id.0);
            return Ok(FinalizeOutcome {
                success: true,
                finalized_runs: Vec::new(),
                requires_review: false,
            });
        }

        let rules = LeagueRules::resolve(&league.rules)?;
        let unreviewed = self
            .sessions
            .list_runs(session.id)
            .await?
            .iter()
            .any(|run| run.status == RunStatus::Submitted);

        let eligible: &[RunStatus] = if rules.running.require_approval {
            &[RunStatus::Approved]
        } else {
            &[RunStatus::Approved, RunStatus::Submitted]
        };
        let Some(finalized_runs) = self.sessions.finalize_session(session.id, eligible).await?
        else {
            debug!("Session {} was finalized in the meantime", session.id.0);
            return Ok(FinalizeOutcome {
                success: true,
                finalized_runs: Vec::new(),
                requires_review: false,
            });
        };

        info!(
            "Finalized session {} of league {} with {} runs",
            session.id.0,
            league.slug,
            finalized_runs.len()
        );

        Ok(FinalizeOutcome {
            success: true,
            finalized_runs,
            requires_review: rules.running.require_approval && unreviewed,
        })
    }

    pub async fn session_for_week(
        &self,
        league: &League,
        week: u32,
    ) -> WorkflowResult<RunningSession> {
        self.sessions
            .get_session_for_week(league.id, week)
            .await?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!(
                    "{} has no time trial session in week {week}",
                    league.display_name
                ))
            })
    }

    async fn load_session(&self, session_id: SessionId) -> WorkflowResult<(League, RunningSession)> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!("Session {} does not exist", session_id.0))
            })?;
        let league = load_league(&self.leagues, session.league_id).await?;

        Ok((league, session))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use poise::serenity_prelude::UserId;
    use serde_json::json;
    use sqlx::SqlitePool;
    use time::macros::datetime;

    use crate::{
        models::{
            types::UtcDateTime, FixtureStatus, FixtureType, League, RunStatus, RunningSession,
            SessionStatus,
        },
        repository::{FixtureRepository, LeagueRepository, SessionRepository},
        rules::APPROVAL_PATH,
        test_utils::{test_pool, time_trial_league},
        workflow::WorkflowError,
    };

    use super::{RunSubmission, RunWorkflow};

    const ORGANIZER: u64 = 9;

    fn workflow(pool: &SqlitePool) -> RunWorkflow {
        RunWorkflow::new(
            Arc::new(LeagueRepository::new(pool.clone())),
            Arc::new(SessionRepository::new(pool.clone())),
        )
    }

    fn run(elapsed_seconds: i64) -> RunSubmission {
        RunSubmission {
            elapsed_seconds,
            distance_m: None,
            proof: Some("https://example.com/activity/1".to_string()),
        }
    }

    /// During week 1, which starts on 2024-09-02.
    fn in_week_one() -> UtcDateTime {
        UtcDateTime::assume_utc(datetime!(2024-09-04 07:00:00))
    }

    async fn setup(pool: &SqlitePool) -> (League, RunningSession) {
        let league = time_trial_league(pool, &[ORGANIZER, 1, 2], 2).await;
        let session = SessionRepository::new(pool.clone())
            .get_session_for_week(league.id, 1)
            .await
            .unwrap()
            .unwrap();
        (league, session)
    }

    async fn require_approval(pool: &SqlitePool, league: &League) {
        let mut rules = league.rules.clone();
        rules.set_at(APPROVAL_PATH, json!(true)).unwrap();
        LeagueRepository::new(pool.clone())
            .update_rules(league.id, &rules)
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn runs_count_right_away_by_default() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        let workflow = workflow(&pool);

        let outcome = workflow
            .submit_run(session.id, UserId::new(1), run(630), in_week_one())
            .await
            .unwrap();
        assert!(!outcome.requires_review);
        assert_eq!(outcome.run.status, RunStatus::Approved);

        let stored = SessionRepository::new(pool.clone())
            .get_session(session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SessionStatus::Open);
    }

    #[test_log::test(tokio::test)]
    async fn resubmitting_replaces_the_run() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        let workflow = workflow(&pool);

        workflow
            .submit_run(session.id, UserId::new(1), run(630), in_week_one())
            .await
            .unwrap();
        workflow
            .submit_run(session.id, UserId::new(1), run(600), in_week_one())
            .await
            .unwrap();

        let runs = SessionRepository::new(pool.clone())
            .list_runs(session.id)
            .await
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].elapsed_seconds, 600);
    }

    #[test_log::test(tokio::test)]
    async fn only_reviewed_runs_count_when_approval_is_required() {
        let pool = test_pool().await;
        let (league, session) = setup(&pool).await;
        require_approval(&pool, &league).await;
        let workflow = workflow(&pool);

        let submitted = workflow
            .submit_run(session.id, UserId::new(1), run(590), in_week_one())
            .await
            .unwrap();
        assert!(submitted.requires_review);
        assert_eq!(submitted.run.status, RunStatus::Submitted);
        workflow
            .submit_run(session.id, UserId::new(2), run(630), in_week_one())
            .await
            .unwrap();

        let by_runner = workflow
            .review_run(
                session.id,
                UserId::new(1),
                UserId::new(2),
                true,
                None,
                in_week_one(),
            )
            .await;
        assert!(matches!(by_runner, Err(WorkflowError::Unauthorized(_))));

        let reviewed = workflow
            .review_run(
                session.id,
                UserId::new(1),
                UserId::new(ORGANIZER),
                true,
                Some("GPS track checks out".to_string()),
                in_week_one(),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.run.status, RunStatus::Approved);
        assert_eq!(reviewed.run.reviewed_by, Some(UserId::new(ORGANIZER)));

        let finalized = workflow
            .finalize_session(session.id, UserId::new(ORGANIZER))
            .await
            .unwrap();
        assert_eq!(finalized.finalized_runs.len(), 1);
        assert_eq!(finalized.finalized_runs[0].user_id, UserId::new(1));
        assert!(finalized.requires_review);

        let left_out = SessionRepository::new(pool.clone())
            .get_run(session.id, UserId::new(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(left_out.status, RunStatus::Submitted);
    }

    #[test_log::test(tokio::test)]
    async fn finalizing_twice_promotes_nothing_the_second_time() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        let workflow = workflow(&pool);

        for (user, elapsed) in [(1, 630), (2, 590)] {
            workflow
                .submit_run(session.id, UserId::new(user), run(elapsed), in_week_one())
                .await
                .unwrap();
        }

        let first = workflow
            .finalize_session(session.id, UserId::new(ORGANIZER))
            .await
            .unwrap();
        assert_eq!(first.finalized_runs.len(), 2);

        let second = workflow
            .finalize_session(session.id, UserId::new(ORGANIZER))
            .await
            .unwrap();
        assert!(second.success);
        assert!(second.finalized_runs.is_empty());

        let fixture = FixtureRepository::new(pool.clone())
            .get_fixture(session.fixture_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fixture.status, FixtureStatus::Finalized);
        assert_eq!(fixture.metadata.best_elapsed_seconds, Some(590));
        assert_eq!(fixture.metadata.best_user_id, Some(2));
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_finalizations_promote_runs_once() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        let workflow = workflow(&pool);

        for (user, elapsed) in [(1, 630), (2, 590)] {
            workflow
                .submit_run(session.id, UserId::new(user), run(elapsed), in_week_one())
                .await
                .unwrap();
        }

        let (first, second) = tokio::join!(
            workflow.finalize_session(session.id, UserId::new(ORGANIZER)),
            workflow.finalize_session(session.id, UserId::new(ORGANIZER)),
        );
        let mut promoted = [
            first.unwrap().finalized_runs.len(),
            second.unwrap().finalized_runs.len(),
        ];
        promoted.sort();
        assert_eq!(promoted, [0, 2]);
    }

    #[test_log::test(tokio::test)]
    async fn finalized_sessions_are_locked() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        let workflow = workflow(&pool);

        workflow
            .submit_run(session.id, UserId::new(1), run(630), in_week_one())
            .await
            .unwrap();
        workflow
            .finalize_session(session.id, UserId::new(ORGANIZER))
            .await
            .unwrap();

        let late_run = workflow
            .submit_run(session.id, UserId::new(2), run(600), in_week_one())
            .await;
        assert!(matches!(late_run, Err(WorkflowError::Conflict(_))));

        let late_review = workflow
            .review_run(
                session.id,
                UserId::new(1),
                UserId::new(ORGANIZER),
                false,
                None,
                in_week_one(),
            )
            .await;
        assert!(matches!(late_review, Err(WorkflowError::Conflict(_))));
    }

    #[test_log::test(tokio::test)]
    async fn deadline_binds_members_but_not_organizers() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        let workflow = workflow(&pool);
        let after_deadline = UtcDateTime::assume_utc(datetime!(2024-09-10 12:00:00));

        let late = workflow
            .submit_run(session.id, UserId::new(1), run(630), after_deadline)
            .await;
        assert!(matches!(late, Err(WorkflowError::Conflict(_))));

        assert!(workflow
            .submit_run(session.id, UserId::new(ORGANIZER), run(700), after_deadline)
            .await
            .is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn invalid_runs_are_rejected() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        let workflow = workflow(&pool);

        let zero = workflow
            .submit_run(session.id, UserId::new(1), run(0), in_week_one())
            .await;
        assert!(matches!(zero, Err(WorkflowError::Validation(_))));

        let negative_distance = workflow
            .submit_run(
                session.id,
                UserId::new(1),
                RunSubmission {
                    distance_m: Some(-5.0),
                    ..run(600)
                },
                in_week_one(),
            )
            .await;
        assert!(matches!(negative_distance, Err(WorkflowError::Validation(_))));

        let outsider = workflow
            .submit_run(session.id, UserId::new(77), run(600), in_week_one())
            .await;
        assert!(matches!(outsider, Err(WorkflowError::Unauthorized(_))));
    }

    #[test_log::test(tokio::test)]
    async fn unpaired_session_gets_a_fixture_on_first_run() {
        let pool = test_pool().await;
        let (_, session) = setup(&pool).await;
        sqlx::query("UPDATE running_sessions SET fixture_id = NULL WHERE id = $1")
            .bind(session.id.0 as i64)
            .execute(&pool)
            .await
            .unwrap();

        workflow(&pool)
            .submit_run(session.id, UserId::new(1), run(630), in_week_one())
            .await
            .unwrap();

        let paired = SessionRepository::new(pool.clone())
            .get_session(session.id)
            .await
            .unwrap()
            .unwrap();
        let fixture_id = paired.fixture_id.unwrap();
        assert_ne!(Some(fixture_id), session.fixture_id);

        let fixture = FixtureRepository::new(pool.clone())
            .get_fixture(fixture_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fixture.fixture_type, FixtureType::TimeTrialSession);
        assert_eq!(fixture.metadata.session_id, Some(session.id.0));
    }
}
