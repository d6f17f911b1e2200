mod conversion;
mod fixture_repository;
mod league_repository;
mod match_repository;
mod result_repository;
mod session_repository;

pub use fixture_repository::{FinalizedMatch, FixtureRepository};
pub use league_repository::LeagueRepository;
pub use match_repository::MatchRepository;
pub use result_repository::{ConfirmationEffect, ResolveTarget, ResultRepository};
pub use session_repository::{FinalizedSession, SessionRepository};
