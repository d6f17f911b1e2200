use poise::serenity_prelude::{GuildId, UserId};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::{format_description::well_known::Iso8601, macros::format_description, Date, OffsetDateTime};

use crate::{
    models::{
        types::UtcDateTime, ComparisonMode, ConfirmationId, ConfirmingSide, Decision,
        FixtureId, FixtureMetadata, FixtureStatus, FixtureType, LeagueId, MatchId, MemberRole,
        ResultPayload, RotationType, RunStatus, ScoringFormat, SessionId, SessionStatus,
        SessionType, Side, SubmissionId, SubmissionSource, SubmissionStatus,
    },
    rules::Rules,
};

pub trait DBConvertible: Sized {
    type DBType;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError>;

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError>;
}

#[derive(Debug, Error)]
pub enum DBFromConversionError {
    #[error("Failed to parse datetime: {0}")]
    DateTime(#[from] time::error::Parse),
    #[error("Failed to parse enum variant: {0}")]
    NoSuchVariant(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(i64),
    #[error("Failed to parse JSON column: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DBToConversionError {
    #[error("Failed to format datetime")]
    DateTime(#[from] time::error::Format),
    #[error("Number is too large to store: {0}")]
    NumberOutOfRange(u64),
    #[error("Failed to write JSON column: {0}")]
    Json(#[from] serde_json::Error),
}

impl DBConvertible for UtcDateTime {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        let string = OffsetDateTime::from(*self).format(&Iso8601::DEFAULT)?;
        Ok(string)
    }

    fn from_db(db_value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        let datetime = OffsetDateTime::parse(db_value, &Iso8601::DEFAULT)?;
        Ok(UtcDateTime::from(datetime))
    }
}

impl DBConvertible for Date {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.format(format_description!("[year]-[month]-[day]"))?)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Date::parse(value, format_description!("[year]-[month]-[day]"))?)
    }
}

impl DBConvertible for u32 {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(i64::from(*self))
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        u32::try_from(*value).map_err(|_| DBFromConversionError::InvalidNumber(*value))
    }
}

macro_rules! row_id_conversion {
    ($($id:ident),* $(,)?) => {
        $(
            impl DBConvertible for $id {
                type DBType = i64;

                fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
                    i64::try_from(self.0).map_err(|_| DBToConversionError::NumberOutOfRange(self.0))
                }

                fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
                    u64::try_from(*value)
                        .map($id)
                        .map_err(|_| DBFromConversionError::InvalidNumber(*value))
                }
            }
        )*
    };
}

row_id_conversion!(LeagueId, FixtureId, SubmissionId, ConfirmationId, SessionId, MatchId);

// Discord snowflakes fit in 63 bits; zero is not a valid id.
macro_rules! snowflake_conversion {
    ($($id:ident),* $(,)?) => {
        $(
            impl DBConvertible for $id {
                type DBType = i64;

                fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
                    i64::try_from(self.get())
                        .map_err(|_| DBToConversionError::NumberOutOfRange(self.get()))
                }

                fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
                    u64::try_from(*value)
                        .ok()
                        .filter(|id| *id != 0)
                        .map($id::new)
                        .ok_or(DBFromConversionError::InvalidNumber(*value))
                }
            }
        )*
    };
}

snowflake_conversion!(UserId, GuildId);

macro_rules! text_enum_conversion {
    ($($enum:ident),* $(,)?) => {
        $(
            impl DBConvertible for $enum {
                type DBType = String;

                fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
                    Ok(self.to_string())
                }

                fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
                    value
                        .parse()
                        .map_err(|_| DBFromConversionError::NoSuchVariant(value.clone()))
                }
            }
        )*
    };
}

text_enum_conversion!(
    ScoringFormat,
    RotationType,
    MemberRole,
    FixtureType,
    FixtureStatus,
    Side,
    SubmissionSource,
    SubmissionStatus,
    ConfirmingSide,
    Decision,
    SessionType,
    SessionStatus,
    ComparisonMode,
    RunStatus,
);

impl DBConvertible for Rules {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(serde_json::to_string(self.as_value())?)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(Rules::from(serde_json::from_str::<Value>(value)?))
    }
}

impl DBConvertible for FixtureMetadata {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        json_to_db(self)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        json_from_db(value)
    }
}

impl DBConvertible for ResultPayload {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        json_to_db(self)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        json_from_db(value)
    }
}

impl<T: DBConvertible> DBConvertible for Option<T> {
    type DBType = Option<T::DBType>;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        self.as_ref().map(T::to_db).transpose()
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        value.as_ref().map(T::from_db).transpose()
    }
}

fn json_to_db<T: Serialize>(value: &T) -> Result<String, DBToConversionError> {
    Ok(serde_json::to_string(value)?)
}

fn json_from_db<T: DeserializeOwned>(value: &str) -> Result<T, DBFromConversionError> {
    Ok(serde_json::from_str(value)?)
}
