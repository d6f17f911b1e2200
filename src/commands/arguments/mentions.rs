use std::{collections::BTreeMap, str::FromStr};

use lazy_regex::{regex_captures, regex_find};
use poise::serenity_prelude::UserId;

use crate::{commands::CommandError, rules::FixedPair};

fn mentioned_user(token: &str) -> Result<UserId, CommandError> {
    let (_, id) = regex_captures!(r"^<@!?(\d+)>$", token).ok_or_else(|| {
        super::invalid_argument(format!("Expected a user mention, got `{token}`."))
    })?;

    id.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
        .ok_or_else(|| super::invalid_argument(format!("Invalid user mention: `{token}`.")))
}

/// Pairs of mentions separated by commas: `@Ann @Bob, @Cid @Dan`.
#[derive(Debug, PartialEq)]
pub struct MemberPairs(Vec<FixedPair>);

impl From<MemberPairs> for Vec<FixedPair> {
    fn from(value: MemberPairs) -> Self {
        value.0
    }
}

impl FromStr for MemberPairs {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pairs = s
            .split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_whitespace().collect::<Vec<_>>()[..] {
                [first, second] => Ok(FixedPair::new(
                    mentioned_user(first)?,
                    mentioned_user(second)?,
                )),
                _ => Err(super::invalid_argument(format!(
                    "A pair is exactly two members, got `{pair}`.\nExample: `@Ann @Bob, @Cid @Dan`."
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MemberPairs(pairs))
    }
}

/// Points per member: `@Ann 3, @Bob 1.5`.
#[derive(Debug, PartialEq)]
pub struct MemberPoints(BTreeMap<u64, f64>);

impl From<MemberPoints> for BTreeMap<u64, f64> {
    fn from(value: MemberPoints) -> Self {
        value.0
    }
}

impl FromStr for MemberPoints {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut points = BTreeMap::new();

        for entry in s.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let mention = regex_find!(r"^<@!?\d+>", entry).ok_or_else(|| {
                super::invalid_argument(format!(
                    "Expected `@member points`, got `{entry}`.\nExample: `@Ann 3, @Bob 1.5`."
                ))
            })?;
            let user = mentioned_user(mention)?;

            let value = entry[mention.len()..].trim();
            let value: f64 = value
                .parse()
                .ok()
                .filter(|value: &f64| value.is_finite())
                .ok_or_else(|| super::invalid_argument(format!("Invalid points: `{value}`.")))?;

            if points.insert(user.get(), value).is_some() {
                return Err(super::invalid_argument(format!(
                    "{mention} is listed more than once."
                )));
            }
        }

        if points.is_empty() {
            return Err(super::invalid_argument("No points given.".to_string()));
        }

        Ok(MemberPoints(points))
    }
}
