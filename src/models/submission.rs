use poise::serenity_prelude::UserId;
use serde::Serialize;
use strum::{Display, EnumString};

use super::{
    fixture::{FixtureId, Side},
    result_payload::ResultPayload,
    types::UtcDateTime,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConfirmationId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    Participant,
    Organizer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Accepted,
    Rejected,
    Superseded,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResultSubmission {
    pub id: SubmissionId,
    pub fixture_id: FixtureId,
    pub submitted_by: UserId,
    pub source: SubmissionSource,
    pub payload: ResultPayload,
    pub status: SubmissionStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<UtcDateTime>,
    pub review_note: Option<String>,
    pub submitted_at: UtcDateTime,
}

// Accepted submissions are reviewed at insertion time, so the review fields live here too.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub fixture_id: FixtureId,
    pub submitted_by: UserId,
    pub source: SubmissionSource,
    pub payload: ResultPayload,
    pub status: SubmissionStatus,
    pub reviewed_by: Option<UserId>,
    pub review_note: Option<String>,
    pub submitted_at: UtcDateTime,
}

/// Who a confirmation vote speaks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConfirmingSide {
    #[strum(to_string = "A")]
    #[serde(rename = "A")]
    A,
    #[strum(to_string = "B")]
    #[serde(rename = "B")]
    B,
    Organizer,
}

impl From<Side> for ConfirmingSide {
    fn from(value: Side) -> Self {
        match value {
            Side::A => ConfirmingSide::A,
            Side::B => ConfirmingSide::B,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Confirm,
    Reject,
}

#[derive(Clone, Debug)]
pub struct ResultConfirmation {
    pub id: ConfirmationId,
    pub submission_id: SubmissionId,
    pub fixture_id: FixtureId,
    pub confirmed_by: UserId,
    pub side: ConfirmingSide,
    pub decision: Decision,
    pub reason: Option<String>,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Debug)]
pub struct NewConfirmation {
    pub submission_id: SubmissionId,
    pub fixture_id: FixtureId,
    pub confirmed_by: UserId,
    pub side: ConfirmingSide,
    pub decision: Decision,
    pub reason: Option<String>,
    pub created_at: UtcDateTime,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{ConfirmingSide, SubmissionStatus};

    #[test]
    fn confirming_side_strings() {
        assert_eq!(ConfirmingSide::A.to_string(), "A");
        assert_eq!(ConfirmingSide::Organizer.to_string(), "organizer");
        assert_eq!(
            ConfirmingSide::from_str("B").unwrap(),
            ConfirmingSide::B
        );
    }

    #[test]
    fn status_strings() {
        assert_eq!(SubmissionStatus::Superseded.to_string(), "superseded");
        assert_eq!(
            SubmissionStatus::from_str("pending").unwrap(),
            SubmissionStatus::Pending
        );
    }
}
