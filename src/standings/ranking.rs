use std::{cmp::Ordering, collections::HashMap};

use poise::serenity_prelude::UserId;
use serde::Serialize;

use crate::models::{ComparisonMode, ScoringFormat, Side};

use super::sources::{CompletedMatch, MatchKey, MatchParticipant};

const WIN_POINTS: f64 = 3.0;
const DRAW_POINTS: f64 = 1.0;

/// Paces are compared per kilometre. Distances that can't be used count as one.
const DEFAULT_PACE_DISTANCE_M: f64 = 1000.0;

/// One member's line in the standings table.
///
/// Which counters mean something depends on the scoring format.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub user_id: UserId,
    pub rank: usize,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub points: f64,
    pub goal_difference: i64,
    pub total_elapsed_seconds: i64,
    pub improvement_percent: f64,
}

impl Standing {
    fn new(user_id: UserId) -> Standing {
        Standing {
            user_id,
            rank: 0,
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            points: 0.0,
            goal_difference: 0,
            total_elapsed_seconds: 0,
            improvement_percent: 0.0,
        }
    }
}

/// Ranks the whole roster. Members without results still get a line, and exact ties keep
/// roster order.
pub fn rank_members(
    format: &ScoringFormat,
    comparison_mode: ComparisonMode,
    roster: &[UserId],
    matches: &[CompletedMatch],
    participants: &[MatchParticipant],
) -> Vec<Standing> {
    let completed: HashMap<MatchKey, &CompletedMatch> = matches
        .iter()
        .filter(|completed| completed.completed)
        .map(|completed| (completed.key, completed))
        .collect();

    let mut table = Table::new(roster);
    match format {
        ScoringFormat::TeamVsTeam => team_vs_team(&mut table, &completed, participants),
        ScoringFormat::IndividualTime => match comparison_mode {
            ComparisonMode::AbsolutePerformance => {
                absolute_performance(&mut table, &completed, participants)
            }
            ComparisonMode::PersonalProgress => {
                personal_progress(&mut table, &completed, participants)
            }
        },
        ScoringFormat::IndividualPoints => individual_points(&mut table, &completed, participants),
        ScoringFormat::Singles | ScoringFormat::Doubles => {
            win_loss(&mut table, &completed, participants)
        }
        ScoringFormat::Other(_) => (),
    }

    let mut standings = table.rows;
    match format {
        ScoringFormat::TeamVsTeam => standings.sort_by(|a, b| {
            descending(a.points, b.points)
                .then(b.goal_difference.cmp(&a.goal_difference))
                .then(b.wins.cmp(&a.wins))
                .then(b.played.cmp(&a.played))
        }),
        ScoringFormat::IndividualTime => match comparison_mode {
            ComparisonMode::AbsolutePerformance => standings.sort_by(|a, b| {
                (a.played == 0)
                    .cmp(&(b.played == 0))
                    .then(a.total_elapsed_seconds.cmp(&b.total_elapsed_seconds))
            }),
            ComparisonMode::PersonalProgress => standings.sort_by(|a, b| {
                descending(a.improvement_percent, b.improvement_percent)
                    .then(b.wins.cmp(&a.wins))
                    .then(b.played.cmp(&a.played))
                    .then(a.total_elapsed_seconds.cmp(&b.total_elapsed_seconds))
            }),
        },
        ScoringFormat::IndividualPoints => standings.sort_by(|a, b| {
            descending(a.points, b.points).then(b.played.cmp(&a.played))
        }),
        ScoringFormat::Singles | ScoringFormat::Doubles => standings.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(a.losses.cmp(&b.losses))
                .then(b.played.cmp(&a.played))
        }),
        ScoringFormat::Other(_) => (),
    }

    for (position, standing) in standings.iter_mut().enumerate() {
        standing.rank = position + 1;
    }

    standings
}

/// Roster-ordered rows with lookup by user. Results of non-members are ignored.
struct Table {
    rows: Vec<Standing>,
    index: HashMap<UserId, usize>,
}

impl Table {
    fn new(roster: &[UserId]) -> Table {
        let mut rows = Vec::with_capacity(roster.len());
        let mut index = HashMap::with_capacity(roster.len());
        for user in roster {
            if !index.contains_key(user) {
                index.insert(*user, rows.len());
                rows.push(Standing::new(*user));
            }
        }

        Table { rows, index }
    }

    fn get_mut(&mut self, user: UserId) -> Option<&mut Standing> {
        self.index.get(&user).map(|&position| &mut self.rows[position])
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn team_vs_team(
    table: &mut Table,
    completed: &HashMap<MatchKey, &CompletedMatch>,
    participants: &[MatchParticipant],
) {
    // Per-player scores add up to the side's score.
    let mut side_totals: HashMap<(MatchKey, Side), i64> = HashMap::new();
    for participant in participants {
        if let (Some(side), Some(score)) = (participant.side, participant.score) {
            *side_totals.entry((participant.key, side)).or_default() += score;
        }
    }

    let side_score = |record: &CompletedMatch, side: Side| -> Option<i64> {
        match (record.side_scores, side) {
            (Some((a, _)), Side::A) => Some(a),
            (Some((_, b)), Side::B) => Some(b),
            (None, _) => side_totals.get(&(record.key, side)).copied(),
        }
    };

    for participant in participants {
        let (Some(record), Some(side)) = (completed.get(&participant.key), participant.side) else {
            continue;
        };
        let Some(standing) = table.get_mut(participant.user_id) else {
            continue;
        };

        let outcome = match (side_score(record, side), side_score(record, side.opposite())) {
            (Some(own), Some(other)) => {
                standing.goal_difference += own - other;
                own.cmp(&other)
            }
            _ => match record.winner {
                Some(winner) if winner == side => Ordering::Greater,
                Some(_) => Ordering::Less,
                None => Ordering::Equal,
            },
        };

        standing.played += 1;
        match outcome {
            Ordering::Greater => {
                standing.wins += 1;
                standing.points += WIN_POINTS;
            }
            Ordering::Equal => {
                standing.draws += 1;
                standing.points += DRAW_POINTS;
            }
            Ordering::Less => standing.losses += 1,
        }
    }
}

fn absolute_performance(
    table: &mut Table,
    completed: &HashMap<MatchKey, &CompletedMatch>,
    participants: &[MatchParticipant],
) {
    for participant in participants {
        if !completed.contains_key(&participant.key) {
            continue;
        }
        let (Some(elapsed), Some(standing)) = (
            participant.elapsed_seconds,
            table.get_mut(participant.user_id),
        ) else {
            continue;
        };

        standing.played += 1;
        standing.total_elapsed_seconds += elapsed;
    }
}

fn personal_progress(
    table: &mut Table,
    completed: &HashMap<MatchKey, &CompletedMatch>,
    participants: &[MatchParticipant],
) {
    struct Effort {
        week: u32,
        elapsed_seconds: i64,
        pace: f64,
    }

    let mut efforts: HashMap<UserId, Vec<Effort>> = HashMap::new();
    for participant in participants {
        let (Some(record), Some(elapsed)) = (
            completed.get(&participant.key),
            participant.elapsed_seconds,
        ) else {
            continue;
        };

        let distance_m = participant
            .distance_m
            .filter(|distance| distance.is_finite() && *distance > 0.0)
            .unwrap_or(DEFAULT_PACE_DISTANCE_M);
        let pace = elapsed as f64 / (distance_m / 1000.0);
        if !pace.is_finite() || pace <= 0.0 {
            continue;
        }

        efforts.entry(participant.user_id).or_default().push(Effort {
            week: record.week,
            elapsed_seconds: elapsed,
            pace,
        });
    }

    for (user, mut efforts) in efforts {
        let Some(standing) = table.get_mut(user) else {
            continue;
        };

        efforts.sort_by(|a, b| {
            a.week
                .cmp(&b.week)
                .then(a.elapsed_seconds.cmp(&b.elapsed_seconds))
        });

        let mut improvement = 0.0;
        for window in efforts.windows(2) {
            let (previous, current) = (window[0].pace, window[1].pace);
            improvement += (previous - current) / previous * 100.0;
            match current.partial_cmp(&previous) {
                Some(Ordering::Less) => standing.wins += 1,
                Some(Ordering::Greater) => standing.losses += 1,
                _ => (),
            }
        }

        standing.played = efforts.len() as u32;
        standing.total_elapsed_seconds = efforts.iter().map(|effort| effort.elapsed_seconds).sum();
        standing.improvement_percent = round_to_hundredths(improvement);
    }
}

fn individual_points(
    table: &mut Table,
    completed: &HashMap<MatchKey, &CompletedMatch>,
    participants: &[MatchParticipant],
) {
    for participant in participants {
        if !completed.contains_key(&participant.key) {
            continue;
        }
        let (Some(points), Some(standing)) =
            (participant.points, table.get_mut(participant.user_id))
        else {
            continue;
        };

        standing.played += 1;
        standing.points += points;
    }
}

fn win_loss(
    table: &mut Table,
    completed: &HashMap<MatchKey, &CompletedMatch>,
    participants: &[MatchParticipant],
) {
    for participant in participants {
        let (Some(record), Some(side)) = (completed.get(&participant.key), participant.side) else {
            continue;
        };
        let Some(standing) = table.get_mut(participant.user_id) else {
            continue;
        };

        standing.played += 1;
        match record.winner {
            Some(winner) if winner == side => standing.wins += 1,
            Some(_) => standing.losses += 1,
            None => standing.draws += 1,
        }
    }
}
