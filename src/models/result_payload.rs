use std::{cmp::Ordering, collections::BTreeMap};

use poise::serenity_prelude::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fixture::Side;

/// Games won by each side in one set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub a: u32,
    pub b: u32,
}

/// A proposed or accepted result of a fixture.
///
/// Which fields are meaningful depends on the league's scoring format: racket sports use
/// `winner` and `sets`, team sports use the aggregate `score_a`/`score_b`, points leagues use
/// `points` keyed by user id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<SetScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_a: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_b: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub points: BTreeMap<u64, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("The result is empty: provide a winner, set scores, side scores or points")]
    Empty,
    #[error("Set {0} is tied; a set must have a winner")]
    TiedSet(usize),
    #[error("The winner is side {winner}, but side {by_sets} won more sets")]
    WinnerContradictsSets { winner: Side, by_sets: Side },
    #[error("Side scores can't be negative")]
    NegativeScore,
    #[error("Both side scores must be given together")]
    PartialScore,
    #[error("The winner is side {winner}, but the score is {score_a}-{score_b}")]
    WinnerContradictsScores {
        winner: Side,
        score_a: i64,
        score_b: i64,
    },
    #[error("Points for user {0} are not a finite number")]
    InvalidPoints(u64),
}

impl ResultPayload {
    pub fn validate(&self) -> Result<(), PayloadError> {
        let has_scores = self.score_a.is_some() || self.score_b.is_some();
        if self.winner.is_none() && self.sets.is_empty() && !has_scores && self.points.is_empty()
        {
            return Err(PayloadError::Empty);
        }

        if let Some(index) = self.sets.iter().position(|set| set.a == set.b) {
            return Err(PayloadError::TiedSet(index + 1));
        }

        if let (Some(winner), Some(by_sets)) = (self.winner, self.winner_by_sets()) {
            if winner != by_sets {
                return Err(PayloadError::WinnerContradictsSets { winner, by_sets });
            }
        }

        match (self.score_a, self.score_b) {
            (Some(a), Some(b)) if a < 0 || b < 0 => return Err(PayloadError::NegativeScore),
            (Some(_), None) | (None, Some(_)) => return Err(PayloadError::PartialScore),
            _ => (),
        }

        if let (Some(winner), Some(score_a), Some(score_b)) =
            (self.winner, self.score_a, self.score_b)
        {
            let ahead = match winner {
                Side::A => score_a > score_b,
                Side::B => score_b > score_a,
            };
            if !ahead {
                return Err(PayloadError::WinnerContradictsScores {
                    winner,
                    score_a,
                    score_b,
                });
            }
        }

        if let Some((user, _)) = self.points.iter().find(|(_, points)| !points.is_finite()) {
            return Err(PayloadError::InvalidPoints(*user));
        }

        Ok(())
    }

    /// The explicit winner, or the one implied by sets, then by side scores.
    /// `None` means a draw or a result without a winner.
    pub fn resolved_winner(&self) -> Option<Side> {
        self.winner
            .or_else(|| self.winner_by_sets())
            .or_else(|| match (self.score_a, self.score_b) {
                (Some(a), Some(b)) => match a.cmp(&b) {
                    Ordering::Greater => Some(Side::A),
                    Ordering::Less => Some(Side::B),
                    Ordering::Equal => None,
                },
                _ => None,
            })
    }

    pub fn side_score(&self, side: Side) -> Option<i64> {
        match side {
            Side::A => self.score_a,
            Side::B => self.score_b,
        }
    }

    pub fn points_for(&self, user: UserId) -> Option<f64> {
        self.points.get(&user.get()).copied()
    }

    fn winner_by_sets(&self) -> Option<Side> {
        let won_by_a = self.sets.iter().filter(|set| set.a > set.b).count();
        let won_by_b = self.sets.iter().filter(|set| set.b > set.a).count();

        match won_by_a.cmp(&won_by_b) {
            Ordering::Greater => Some(Side::A),
            Ordering::Less => Some(Side::B),
            Ordering::Equal => None,
        }
    }
}
