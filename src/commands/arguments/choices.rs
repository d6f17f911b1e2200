use crate::models::{ComparisonMode, MemberRole, RotationType, ScoringFormat, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq, poise::ChoiceParameter)]
pub enum FormatChoice {
    #[name = "Singles"]
    Singles,
    #[name = "Doubles"]
    Doubles,
    #[name = "Individual time (running)"]
    IndividualTime,
    #[name = "Individual points"]
    IndividualPoints,
    #[name = "Team vs team"]
    TeamVsTeam,
}

impl From<FormatChoice> for ScoringFormat {
    fn from(value: FormatChoice) -> Self {
        match value {
            FormatChoice::Singles => ScoringFormat::Singles,
            FormatChoice::Doubles => ScoringFormat::Doubles,
            FormatChoice::IndividualTime => ScoringFormat::IndividualTime,
            FormatChoice::IndividualPoints => ScoringFormat::IndividualPoints,
            FormatChoice::TeamVsTeam => ScoringFormat::TeamVsTeam,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, poise::ChoiceParameter)]
pub enum RotationChoice {
    #[name = "Random"]
    Random,
    #[name = "Assigned pairs"]
    Assigned,
}

impl From<RotationChoice> for RotationType {
    fn from(value: RotationChoice) -> Self {
        match value {
            RotationChoice::Random => RotationType::Random,
            RotationChoice::Assigned => RotationType::Assigned,
        }
    }
}

/// Roles that can be handed out. Ownership never changes hands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, poise::ChoiceParameter)]
pub enum RoleChoice {
    #[name = "Admin"]
    Admin,
    #[name = "Member"]
    Member,
}

impl From<RoleChoice> for MemberRole {
    fn from(value: RoleChoice) -> Self {
        match value {
            RoleChoice::Admin => MemberRole::Admin,
            RoleChoice::Member => MemberRole::Member,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ComparisonChoice {
    #[name = "Absolute performance"]
    AbsolutePerformance,
    #[name = "Personal progress"]
    PersonalProgress,
}

impl From<ComparisonChoice> for ComparisonMode {
    fn from(value: ComparisonChoice) -> Self {
        match value {
            ComparisonChoice::AbsolutePerformance => ComparisonMode::AbsolutePerformance,
            ComparisonChoice::PersonalProgress => ComparisonMode::PersonalProgress,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, poise::ChoiceParameter)]
pub enum SideChoice {
    #[name = "Side A"]
    A,
    #[name = "Side B"]
    B,
}

impl From<SideChoice> for Side {
    fn from(value: SideChoice) -> Self {
        match value {
            SideChoice::A => Side::A,
            SideChoice::B => Side::B,
        }
    }
}
