use std::str::FromStr;

use lazy_regex::regex_captures;
use time::{Date, Month};

use crate::commands::CommandError;

const EXAMPLE: &str = "2024-09-02";

fn invalid_argument(message: String) -> CommandError {
    super::invalid_argument(format!("{message}\nDate example: `{EXAMPLE}`."))
}

/// A calendar date in `YYYY-MM-DD` form.
#[derive(PartialEq, Eq, Debug)]
pub struct HumanDate(Date);

impl From<HumanDate> for Date {
    fn from(value: HumanDate) -> Self {
        value.0
    }
}

impl FromStr for HumanDate {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let Some((_, year, month, day)) = regex_captures!(r"^(\d{4})-(\d{1,2})-(\d{1,2})$", s)
        else {
            return Err(invalid_argument(format!("Invalid date: `{s}`.")));
        };

        let year = year
            .parse()
            .map_err(|_| invalid_argument(format!("Invalid year: `{year}`.")))?;
        let month: u8 = month
            .parse()
            .map_err(|_| invalid_argument(format!("Invalid month: `{month}`.")))?;
        let day = day
            .parse()
            .map_err(|_| invalid_argument(format!("Invalid day: `{day}`.")))?;

        let month = Month::try_from(month)
            .map_err(|_| invalid_argument(format!("Invalid month: `{month}`.")))?;

        Ok(HumanDate(Date::from_calendar_date(year, month, day).map_err(
            |_| invalid_argument(format!("There is no such day: `{s}`.")),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_log::test;
    use time::macros::date;

    use super::{HumanDate, EXAMPLE};

    #[test]
    fn example() {
        assert_eq!(
            HumanDate::from_str(EXAMPLE).unwrap(),
            HumanDate(date!(2024 - 09 - 02))
        );
    }

    #[test]
    fn single_digit_month_and_day() {
        assert_eq!(
            HumanDate::from_str(" 2025-1-7 ").unwrap(),
            HumanDate(date!(2025 - 01 - 07))
        );
    }

    #[test]
    fn no_such_day() {
        assert!(HumanDate::from_str("2023-02-29").is_err());
    }

    #[test]
    fn month_out_of_range() {
        assert!(HumanDate::from_str("2024-13-01").is_err());
    }

    #[test]
    fn time_is_not_a_date() {
        assert!(HumanDate::from_str("15:33").is_err());
    }
}
