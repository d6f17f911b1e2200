use std::str::FromStr;

use lazy_regex::regex_captures;

use crate::{commands::CommandError, models::SetScore};

const EXAMPLE: &str = "6-4 3-6 7-5";

fn invalid_argument(message: String) -> CommandError {
    super::invalid_argument(format!(
        "{message}\nSet scores are listed side A first, e.g. `{EXAMPLE}`."
    ))
}

/// Games per set, side A first.
#[derive(Debug, PartialEq, Eq)]
pub struct SetScores(Vec<SetScore>);

impl From<SetScores> for Vec<SetScore> {
    fn from(value: SetScores) -> Self {
        value.0
    }
}

impl FromStr for SetScores {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sets = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                let (_, a, b) = regex_captures!(r"^(\d{1,3})[-:](\d{1,3})$", token)
                    .ok_or_else(|| invalid_argument(format!("Invalid set score: `{token}`.")))?;

                Ok(SetScore {
                    a: a.parse()
                        .map_err(|_| invalid_argument(format!("Invalid games count: `{a}`.")))?,
                    b: b.parse()
                        .map_err(|_| invalid_argument(format!("Invalid games count: `{b}`.")))?,
                })
            })
            .collect::<Result<Vec<_>, CommandError>>()?;

        if sets.is_empty() {
            return Err(invalid_argument("No set scores given.".to_string()));
        }

        Ok(SetScores(sets))
    }
}
