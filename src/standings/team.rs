use std::collections::HashMap;

use poise::serenity_prelude::UserId;
use serde::Serialize;

use crate::models::Side;

use super::sources::{CompletedMatch, MatchKey, MatchParticipant};

/// A doubles partnership's record, counted per side that fielded exactly those two players.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStanding {
    /// Ordered by user id.
    pub members: [UserId; 2],
    pub rank: usize,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_percentage: u32,
}

pub fn rank_teams(matches: &[CompletedMatch], participants: &[MatchParticipant]) -> Vec<TeamStanding> {
    let mut sides: HashMap<(MatchKey, Side), Vec<UserId>> = HashMap::new();
    for participant in participants {
        if let Some(side) = participant.side {
            sides
                .entry((participant.key, side))
                .or_default()
                .push(participant.user_id);
        }
    }

    let mut teams: Vec<TeamStanding> = Vec::new();
    let mut index: HashMap<[UserId; 2], usize> = HashMap::new();

    for record in matches.iter().filter(|record| record.completed) {
        for side in [Side::A, Side::B] {
            let Some([first, second]) = sides.get(&(record.key, side)).map(Vec::as_slice) else {
                continue;
            };
            let members = if first.get() <= second.get() {
                [*first, *second]
            } else {
                [*second, *first]
            };

            let position = *index.entry(members).or_insert_with(|| {
                teams.push(TeamStanding {
                    members,
                    rank: 0,
                    played: 0,
                    wins: 0,
                    losses: 0,
                    win_percentage: 0,
                });
                teams.len() - 1
            });

            let team = &mut teams[position];
            team.played += 1;
            match record.winner {
                Some(winner) if winner == side => team.wins += 1,
                Some(_) => team.losses += 1,
                None => (),
            }
        }
    }

    for team in &mut teams {
        team.win_percentage = (f64::from(team.wins) / f64::from(team.played) * 100.0).round() as u32;
    }

    teams.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(a.losses.cmp(&b.losses))
            .then(b.win_percentage.cmp(&a.win_percentage))
    });
    for (position, team) in teams.iter_mut().enumerate() {
        team.rank = position + 1;
    }

    teams
}
