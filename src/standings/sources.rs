use poise::serenity_prelude::UserId;

use crate::{
    models::{FixtureId, LegacyMatch, MatchId, SessionId, Side},
    repository::{FinalizedMatch, FinalizedSession},
};

/// Identifies a completed match across sources, so ids from different tables never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKey {
    Legacy(MatchId),
    Workflow(FixtureId),
    Running(SessionId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletedMatch {
    pub key: MatchKey,
    pub completed: bool,
    pub week: u32,
    pub winner: Option<Side>,
    /// Aggregate side scores, when the result was recorded per side rather than per player.
    pub side_scores: Option<(i64, i64)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchParticipant {
    pub key: MatchKey,
    pub user_id: UserId,
    pub side: Option<Side>,
    pub score: Option<i64>,
    pub elapsed_seconds: Option<i64>,
    pub distance_m: Option<f64>,
    pub points: Option<f64>,
}

/// Everything standings can be computed from.
#[derive(Clone, Debug)]
pub enum ResultSource {
    Legacy(LegacyMatch),
    Workflow(FinalizedMatch),
    Running(FinalizedSession),
}

impl ResultSource {
    pub fn normalize(self) -> (CompletedMatch, Vec<MatchParticipant>) {
        match self {
            ResultSource::Legacy(legacy) => {
                let key = MatchKey::Legacy(legacy.id);
                let participants = legacy
                    .participants
                    .into_iter()
                    .map(|participant| MatchParticipant {
                        key,
                        user_id: participant.user_id,
                        side: participant.side,
                        score: participant.score,
                        elapsed_seconds: participant.elapsed_seconds,
                        distance_m: participant.distance_m,
                        points: participant.points,
                    })
                    .collect();

                (
                    CompletedMatch {
                        key,
                        completed: legacy.completed,
                        week: legacy.week,
                        winner: legacy.winner,
                        side_scores: None,
                    },
                    participants,
                )
            }
            ResultSource::Workflow(FinalizedMatch {
                fixture,
                participants,
            }) => {
                let key = MatchKey::Workflow(fixture.id);
                let result = fixture.metadata.final_result.unwrap_or_default();

                let participants = participants
                    .into_iter()
                    .map(|participant| MatchParticipant {
                        key,
                        user_id: participant.user_id,
                        side: Some(participant.side),
                        score: None,
                        elapsed_seconds: None,
                        distance_m: None,
                        points: result.points_for(participant.user_id),
                    })
                    .collect();

                (
                    CompletedMatch {
                        key,
                        completed: true,
                        week: fixture.week,
                        winner: result.resolved_winner(),
                        side_scores: result
                            .side_score(Side::A)
                            .zip(result.side_score(Side::B)),
                    },
                    participants,
                )
            }
            ResultSource::Running(FinalizedSession { session, runs }) => {
                let key = MatchKey::Running(session.id);

                // Runs without their own distance covered the session's target.
                let participants = runs
                    .into_iter()
                    .map(|run| MatchParticipant {
                        key,
                        user_id: run.user_id,
                        side: None,
                        score: None,
                        elapsed_seconds: Some(run.elapsed_seconds),
                        distance_m: run.distance_m.or(Some(session.distance_m)),
                        points: None,
                    })
                    .collect();

                (
                    CompletedMatch {
                        key,
                        completed: true,
                        week: session.week,
                        winner: None,
                        side_scores: None,
                    },
                    participants,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use map_macro::btree_map;
    use poise::serenity_prelude::UserId;
    use test_log::test;

    use crate::{
        models::{
            types::UtcDateTime, ComparisonMode, Fixture, FixtureId, FixtureMetadata,
            FixtureParticipant, FixtureStatus, FixtureType, LeagueId, LegacyMatch,
            LegacyParticipant, MatchId, ResultPayload, RunStatus, RunningSession, SessionId,
            SessionRun, SessionStatus, SessionType, SetScore, Side, PLAYER_ROLE,
        },
        repository::{FinalizedMatch, FinalizedSession},
    };

    use super::{MatchKey, ResultSource};

    fn participant(user: u64, side: Side) -> FixtureParticipant {
        FixtureParticipant {
            fixture_id: FixtureId(5),
            user_id: UserId::new(user),
            side,
            role: PLAYER_ROLE.to_string(),
        }
    }

    #[test]
    fn workflow_result_decodes_final_payload() {
        let now = UtcDateTime::now();
        let source = ResultSource::Workflow(FinalizedMatch {
            fixture: Fixture {
                id: FixtureId(5),
                league_id: LeagueId(1),
                week: 3,
                starts_at: now,
                ends_at: now,
                fixture_type: FixtureType::LeagueMatch,
                status: FixtureStatus::Finalized,
                metadata: FixtureMetadata {
                    final_result: Some(ResultPayload {
                        sets: vec![SetScore { a: 4, b: 6 }, SetScore { a: 3, b: 6 }],
                        points: btree_map! { 2 => 1.5 },
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            },
            participants: vec![participant(1, Side::A), participant(2, Side::B)],
        });

        let (completed, participants) = source.normalize();
        assert_eq!(completed.key, MatchKey::Workflow(FixtureId(5)));
        assert_eq!(completed.week, 3);
        assert_eq!(completed.winner, Some(Side::B));
        assert_eq!(completed.side_scores, None);
        assert_eq!(participants[0].points, None);
        assert_eq!(participants[1].points, Some(1.5));
        assert_eq!(participants[1].side, Some(Side::B));
    }

    #[test]
    fn running_runs_fall_back_to_session_distance() {
        let now = UtcDateTime::now();
        let run = |user: u64, distance_m: Option<f64>| SessionRun {
            session_id: SessionId(8),
            user_id: UserId::new(user),
            elapsed_seconds: 1500,
            distance_m,
            proof: None,
            status: RunStatus::Finalized,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
            submitted_at: now,
        };

        let source = ResultSource::Running(FinalizedSession {
            session: RunningSession {
                id: SessionId(8),
                league_id: LeagueId(1),
                week: 2,
                session_type: SessionType::TimeTrial,
                distance_m: 5000.0,
                comparison_mode: ComparisonMode::AbsolutePerformance,
                status: SessionStatus::Finalized,
                deadline: now,
                fixture_id: None,
            },
            runs: vec![run(1, None), run(2, Some(5200.0))],
        });

        let (completed, participants) = source.normalize();
        assert_eq!(completed.key, MatchKey::Running(SessionId(8)));
        assert_eq!(completed.winner, None);
        assert_eq!(participants[0].distance_m, Some(5000.0));
        assert_eq!(participants[1].distance_m, Some(5200.0));
        assert_eq!(participants[1].side, None);
    }

    #[test]
    fn legacy_and_workflow_keys_differ() {
        let legacy = ResultSource::Legacy(LegacyMatch {
            id: MatchId(5),
            league_id: LeagueId(1),
            week: 1,
            completed: true,
            winner: Some(Side::A),
            participants: vec![LegacyParticipant {
                user_id: UserId::new(1),
                side: Some(Side::A),
                score: Some(2),
                elapsed_seconds: None,
                distance_m: None,
                points: None,
            }],
        });

        let (completed, participants) = legacy.normalize();
        assert_eq!(completed.key, MatchKey::Legacy(MatchId(5)));
        assert_ne!(completed.key, MatchKey::Workflow(FixtureId(5)));
        assert_eq!(participants[0].score, Some(2));
    }
}
