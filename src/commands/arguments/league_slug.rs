use std::{fmt::Display, str::FromStr};

use crate::{commands::CommandError, utils::camel_slug::is_valid_slug};

/// The name a league is addressed by in commands.
#[derive(Debug, PartialEq, Eq)]
pub struct LeagueSlug(String);

impl FromStr for LeagueSlug {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if is_valid_slug(s) {
            Ok(LeagueSlug(s.to_string()))
        } else {
            Err(super::invalid_argument(format!(
                "Invalid league slug: `{}`.\nIt can only contain a-z, A-Z, 0-9, a dash (-) or an underscore (_).",
                s.escape_default()
            )))
        }
    }
}

impl From<LeagueSlug> for String {
    fn from(value: LeagueSlug) -> Self {
        value.0
    }
}

impl Display for LeagueSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LeagueSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
