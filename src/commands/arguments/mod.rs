use super::CommandError;

mod choices;
mod human_date;
mod league_slug;
mod mentions;
mod run_time;
mod set_scores;
mod trimmed_text;

pub use choices::{ComparisonChoice, FormatChoice, RoleChoice, RotationChoice, SideChoice};
pub use human_date::HumanDate;
pub use league_slug::LeagueSlug;
pub use mentions::{MemberPairs, MemberPoints};
pub use run_time::RunTime;
pub use set_scores::SetScores;
pub use trimmed_text::TrimmedText;

pub fn invalid_argument(message: String) -> CommandError {
    CommandError::InvalidArgument { message }
}
