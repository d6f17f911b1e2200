use std::str::FromStr;

use lazy_regex::regex_captures;

use crate::commands::CommandError;

const EXAMPLE_1: &str = "24:05";
const EXAMPLE_2: &str = "1:02:30";
const EXAMPLE_3: &str = "1h 2m 30s";

fn invalid_argument(message: String) -> CommandError {
    super::invalid_argument(format!(
        "{message}\nRun time examples: `{EXAMPLE_1}`, `{EXAMPLE_2}`, `{EXAMPLE_3}`."
    ))
}

/// Elapsed time of a run, as a stopwatch reading or in units.
#[derive(Debug, PartialEq, Eq)]
pub struct RunTime(i64);

impl RunTime {
    pub fn seconds(&self) -> i64 {
        self.0
    }
}

impl FromStr for RunTime {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let seconds = if let Some((_, _, hours, minutes, seconds)) =
            regex_captures!(r"^((\d+):)?(\d{1,2}):(\d{2})$", s)
        {
            let hours: i64 = if hours.is_empty() {
                0
            } else {
                hours
                    .parse()
                    .map_err(|_| invalid_argument(format!("Invalid hours: `{hours}`.")))?
            };
            let minutes: i64 = minutes
                .parse()
                .map_err(|_| invalid_argument(format!("Invalid minutes: `{minutes}`.")))?;
            let seconds: i64 = seconds
                .parse()
                .map_err(|_| invalid_argument(format!("Invalid seconds: `{seconds}`.")))?;

            if seconds >= 60 || (hours > 0 && minutes >= 60) {
                return Err(invalid_argument(format!("Invalid run time: `{s}`.")));
            }

            hours * 3600 + minutes * 60 + seconds
        } else {
            parse_units(s)?
        };

        if seconds <= 0 {
            return Err(invalid_argument("A run must take some time.".to_string()));
        }

        Ok(RunTime(seconds))
    }
}

fn parse_units(s: &str) -> Result<i64, CommandError> {
    if let Some(c) = s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || c.is_ascii_whitespace()))
    {
        return Err(invalid_argument(format!(
            "Invalid character in run time: `{}`.",
            c.escape_default()
        )));
    }

    let s = s.to_ascii_lowercase();
    let mut tokens = s.split_ascii_whitespace().flat_map(|s| {
        match s.char_indices().find(|(_i, c)| !c.is_ascii_digit()) {
            Some((first_non_digit, _)) if first_non_digit > 0 => {
                vec![&s[0..first_non_digit], &s[first_non_digit..]]
            }
            _ => vec![s],
        }
    });

    let mut total = 0;
    while let Some(count) = tokens.next() {
        let unit = tokens
            .next()
            .ok_or(invalid_argument("Unexpected end of run time.".to_string()))?;
        let count: i64 = count
            .parse()
            .map_err(|_| invalid_argument(format!("Expected a number, got `{count}`.")))?;

        match unit {
            unit if "hours".starts_with(unit) => total += count * 3600,
            unit if "minutes".starts_with(unit) => total += count * 60,
            unit if "seconds".starts_with(unit) => total += count,
            unit => return Err(invalid_argument(format!("Unknown time unit: `{unit}`."))),
        }
    }

    Ok(total)
}
