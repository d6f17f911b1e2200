mod fixture;
mod league;
mod legacy_match;
mod result_payload;
mod session;
mod submission;

pub mod types;

pub use fixture::{
    Fixture, FixtureId, FixtureMetadata, FixtureParticipant, FixtureStatus, FixtureType,
    Generation, NewFixture, Resolution, Side, PLAYER_ROLE,
};
pub use league::{League, LeagueId, Member, MemberRole, NewLeague, RotationType, ScoringFormat};
pub use legacy_match::{LegacyMatch, LegacyParticipant, MatchId};
pub use result_payload::{PayloadError, ResultPayload, SetScore};
pub use session::{
    ComparisonMode, NewRun, NewSession, RunStatus, RunningSession, SessionId, SessionRun,
    SessionStatus, SessionType,
};
pub use submission::{
    ConfirmationId, ConfirmingSide, Decision, NewConfirmation, NewSubmission, ResultConfirmation,
    ResultSubmission, SubmissionId, SubmissionSource, SubmissionStatus,
};
