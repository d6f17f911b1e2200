//! Season schedule generation.
//!
//! Everything here is pure: a roster and a league go in, fixture and session intents come out.
//! Persisting them is up to [`crate::workflow::ScheduleService`].

mod random_doubles;
mod round_robin;

use std::collections::HashSet;

use poise::serenity_prelude::UserId;
use rand::Rng;
use strum::{Display, EnumString};
use thiserror::Error;
use time::{Date, Duration, OffsetDateTime};

use crate::{
    models::{types::UtcDateTime, Generation, League, RotationType, ScoringFormat},
    rules::{FixedPair, LeagueRules},
};

use random_doubles::RandomDoublesSchedule;
use round_robin::CircleSchedule;

pub const GENERATED_BY: &str = "schedule_generator";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Algorithm {
    SinglesRoundRobin,
    DoublesRoundRobin,
    RandomDoubles,
    TimeTrial,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureIntent {
    pub week: u32,
    pub side_a: Vec<UserId>,
    pub side_b: Vec<UserId>,
    pub algorithm: Algorithm,
    pub round: Option<u32>,
}

impl FixtureIntent {
    pub fn generation(&self) -> Generation {
        generation(self.algorithm, self.round)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionIntent {
    pub week: u32,
}

impl SessionIntent {
    pub fn generation(&self) -> Generation {
        generation(Algorithm::TimeTrial, None)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedSchedule {
    pub fixtures: Vec<FixtureIntent>,
    pub sessions: Vec<SessionIntent>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("The season must last at least one week")]
    NoWeeks,
    #[error("A {format} schedule needs at least {required} members, but the league has {found}")]
    RosterTooSmall {
        format: String,
        required: usize,
        found: usize,
    },
    #[error("Assigned doubles need at least 2 fixed pairs, but {0} are configured")]
    TooFewPairs(usize),
    #[error("<@{0}> is in more than one fixed pair")]
    DuplicatePairMember(UserId),
    #[error("<@{0}> is in a fixed pair but is not a member of the league")]
    PairMemberNotInRoster(UserId),
    #[error("<@{0}> can't be paired with themselves")]
    SelfPair(UserId),
    #[error("Leagues scored as `{0}` have no schedule generator")]
    UnsupportedFormat(String),
}

/// Fixture intents in week order. Finite, and not restartable: generate again for a new pass.
pub enum FixtureIntents<R> {
    Singles(CircleSchedule<UserId>),
    AssignedDoubles(CircleSchedule<FixedPair>),
    RandomDoubles(RandomDoublesSchedule<UserId, R>),
    Empty,
}

impl<R: Rng> Iterator for FixtureIntents<R> {
    type Item = FixtureIntent;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FixtureIntents::Singles(schedule) => schedule.next().map(|pairing| FixtureIntent {
                week: pairing.week,
                side_a: vec![pairing.home],
                side_b: vec![pairing.away],
                algorithm: Algorithm::SinglesRoundRobin,
                round: Some(pairing.round + 1),
            }),
            FixtureIntents::AssignedDoubles(schedule) => {
                schedule.next().map(|pairing| FixtureIntent {
                    week: pairing.week,
                    side_a: pairing.home.members().to_vec(),
                    side_b: pairing.away.members().to_vec(),
                    algorithm: Algorithm::DoublesRoundRobin,
                    round: Some(pairing.round + 1),
                })
            }
            FixtureIntents::RandomDoubles(schedule) => schedule.next().map(|drawn| FixtureIntent {
                week: drawn.week,
                side_a: drawn.side_a.to_vec(),
                side_b: drawn.side_b.to_vec(),
                algorithm: Algorithm::RandomDoubles,
                round: None,
            }),
            FixtureIntents::Empty => None,
        }
    }
}

/// Checks preconditions and returns the lazy fixture iterator for a league.
///
/// `individual_time` leagues get no fixture intents here, see [`session_intents`].
pub fn fixture_intents<R: Rng>(
    league: &League,
    roster: &[UserId],
    rules: &LeagueRules,
    rng: R,
) -> Result<FixtureIntents<R>, ScheduleError> {
    let weeks = league.season_weeks;
    if weeks < 1 {
        return Err(ScheduleError::NoWeeks);
    }

    match (&league.scoring_format, league.rotation_type) {
        (ScoringFormat::Singles, _) => {
            require_roster("singles", 2, roster)?;
            Ok(FixtureIntents::Singles(CircleSchedule::new(
                roster.iter().copied(),
                weeks,
            )))
        }
        (ScoringFormat::Doubles, RotationType::Assigned) => {
            let pairs = &rules.doubles.fixed_pairs;
            validate_fixed_pairs(pairs, roster)?;
            if pairs.len() < 2 {
                return Err(ScheduleError::TooFewPairs(pairs.len()));
            }
            Ok(FixtureIntents::AssignedDoubles(CircleSchedule::new(
                pairs.iter().copied(),
                weeks,
            )))
        }
        (ScoringFormat::Doubles, RotationType::Random) => {
            require_roster("random doubles", 4, roster)?;
            Ok(FixtureIntents::RandomDoubles(RandomDoublesSchedule::new(
                roster.to_vec(),
                weeks,
                rng,
            )))
        }
        (ScoringFormat::IndividualTime, _) => {
            require_roster("time trial", 1, roster)?;
            Ok(FixtureIntents::Empty)
        }
        (format, _) => Err(ScheduleError::UnsupportedFormat(format.to_string())),
    }
}

/// One time trial session per week for `individual_time` leagues, nothing for other formats.
pub fn session_intents(league: &League) -> Vec<SessionIntent> {
    match league.scoring_format {
        ScoringFormat::IndividualTime => (1..=league.season_weeks)
            .map(|week| SessionIntent { week })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn generate_schedule<R: Rng>(
    league: &League,
    roster: &[UserId],
    rules: &LeagueRules,
    rng: R,
) -> Result<GeneratedSchedule, ScheduleError> {
    let fixtures = fixture_intents(league, roster, rules, rng)?.collect();

    Ok(GeneratedSchedule {
        fixtures,
        sessions: session_intents(league),
    })
}

/// Fixed pairs must be disjoint, made of two different people, and only contain members.
pub fn validate_fixed_pairs(pairs: &[FixedPair], roster: &[UserId]) -> Result<(), ScheduleError> {
    let roster: HashSet<UserId> = roster.iter().copied().collect();
    let mut seen = HashSet::new();

    for pair in pairs {
        if pair.first == pair.second {
            return Err(ScheduleError::SelfPair(pair.first));
        }

        for member in pair.members() {
            if !roster.contains(&member) {
                return Err(ScheduleError::PairMemberNotInRoster(member));
            }
            if !seen.insert(member) {
                return Err(ScheduleError::DuplicatePairMember(member));
            }
        }
    }

    Ok(())
}

/// Start and end of a season week. Week 1 starts at midnight UTC of the start date.
pub fn week_window(start_date: Date, week: u32) -> (UtcDateTime, UtcDateTime) {
    let starts_at =
        UtcDateTime::start_of(start_date) + Duration::weeks(i64::from(week.saturating_sub(1)));
    (starts_at, starts_at + Duration::days(7))
}

/// The season week `at` falls into, if the season is running.
pub fn season_week(start_date: Date, season_weeks: u32, at: UtcDateTime) -> Option<u32> {
    let days = (OffsetDateTime::from(at).date() - start_date).whole_days();
    if days < 0 {
        return None;
    }

    let week = u32::try_from(days / 7).ok()? + 1;
    (week <= season_weeks).then_some(week)
}

fn generation(algorithm: Algorithm, round: Option<u32>) -> Generation {
    Generation {
        generated_by: GENERATED_BY.to_string(),
        algorithm: algorithm.to_string(),
        round,
    }
}

fn require_roster(format: &str, required: usize, roster: &[UserId]) -> Result<(), ScheduleError> {
    if roster.len() < required {
        Err(ScheduleError::RosterTooSmall {
            format: format.to_string(),
            required,
            found: roster.len(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use poise::serenity_prelude::{GuildId, UserId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use test_log::test;
    use time::macros::{date, datetime};

    use crate::{
        models::{types::UtcDateTime, League, LeagueId, RotationType, ScoringFormat},
        rules::{FixedPair, LeagueRules, Rules},
    };

    use super::{generate_schedule, season_week, week_window, Algorithm, ScheduleError, GENERATED_BY};

    fn league(format: ScoringFormat, rotation: RotationType, weeks: u32) -> League {
        League {
            id: LeagueId(1),
            guild: GuildId::new(1),
            slug: "Test".to_string(),
            display_name: "Test".to_string(),
            sport: "tennis".to_string(),
            scoring_format: format,
            rotation_type: rotation,
            season_weeks: weeks,
            start_date: date!(2024 - 09 - 02),
            rules: Rules::default(),
            created_by: UserId::new(1),
        }
    }

    fn users(ids: impl IntoIterator<Item = u64>) -> Vec<UserId> {
        ids.into_iter().map(UserId::new).collect()
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    fn pairs(pairs: &[(u64, u64)]) -> LeagueRules {
        let mut rules = LeagueRules::default();
        rules.doubles.fixed_pairs = pairs
            .iter()
            .map(|&(a, b)| FixedPair::new(UserId::new(a), UserId::new(b)))
            .collect();
        rules
    }

    #[test]
    fn singles_cover_every_pair_once() {
        let league = league(ScoringFormat::Singles, RotationType::Random, 3);
        let schedule =
            generate_schedule(&league, &users(1..=4), &LeagueRules::default(), rng()).unwrap();

        assert_eq!(schedule.fixtures.len(), 6);
        assert!(schedule.sessions.is_empty());

        let distinct: HashSet<_> = schedule
            .fixtures
            .iter()
            .map(|f| {
                let (a, b) = (f.side_a[0], f.side_b[0]);
                (a.min(b), a.max(b))
            })
            .collect();
        assert_eq!(distinct.len(), 6);

        let first = &schedule.fixtures[0];
        assert_eq!(first.algorithm, Algorithm::SinglesRoundRobin);
        assert_eq!(first.round, Some(1));
        assert_eq!(first.generation().generated_by, GENERATED_BY);
        assert_eq!(first.generation().algorithm, "singles_round_robin");
    }

    #[test]
    fn odd_singles_roster_has_a_bye() {
        let league = league(ScoringFormat::Singles, RotationType::Random, 5);
        let schedule =
            generate_schedule(&league, &users(1..=5), &LeagueRules::default(), rng()).unwrap();

        for week in 1..=5 {
            assert_eq!(
                schedule.fixtures.iter().filter(|f| f.week == week).count(),
                2
            );
        }
    }

    #[test]
    fn assigned_doubles_keep_pairs_together() {
        let league = league(ScoringFormat::Doubles, RotationType::Assigned, 3);
        let rules = pairs(&[(1, 2), (3, 4), (5, 6), (7, 8)]);
        let schedule = generate_schedule(&league, &users(1..=8), &rules, rng()).unwrap();

        assert_eq!(schedule.fixtures.len(), 6);

        let configured: HashSet<Vec<UserId>> = [(1, 2), (3, 4), (5, 6), (7, 8)]
            .iter()
            .map(|&(a, b)| users([a, b]))
            .collect();
        for fixture in &schedule.fixtures {
            assert!(configured.contains(&fixture.side_a));
            assert!(configured.contains(&fixture.side_b));
            assert_eq!(fixture.algorithm, Algorithm::DoublesRoundRobin);
        }
    }

    #[test]
    fn assigned_doubles_need_two_pairs() {
        let league = league(ScoringFormat::Doubles, RotationType::Assigned, 3);
        let result = generate_schedule(&league, &users(1..=4), &pairs(&[(1, 2)]), rng());
        assert_eq!(result, Err(ScheduleError::TooFewPairs(1)));
    }

    #[test]
    fn invalid_pairs_are_rejected() {
        let league = league(ScoringFormat::Doubles, RotationType::Assigned, 3);
        let roster = users(1..=4);

        assert_eq!(
            generate_schedule(&league, &roster, &pairs(&[(1, 2), (2, 3)]), rng()),
            Err(ScheduleError::DuplicatePairMember(UserId::new(2)))
        );
        assert_eq!(
            generate_schedule(&league, &roster, &pairs(&[(1, 2), (3, 9)]), rng()),
            Err(ScheduleError::PairMemberNotInRoster(UserId::new(9)))
        );
        assert_eq!(
            generate_schedule(&league, &roster, &pairs(&[(1, 2), (3, 3)]), rng()),
            Err(ScheduleError::SelfPair(UserId::new(3)))
        );
    }

    #[test]
    fn random_doubles_bench_the_remainder() {
        let league = league(ScoringFormat::Doubles, RotationType::Random, 2);
        let schedule =
            generate_schedule(&league, &users(1..=6), &LeagueRules::default(), rng()).unwrap();

        assert_eq!(schedule.fixtures.len(), 2);
        assert!(schedule.fixtures.iter().all(|f| f.round.is_none()));
        assert!(schedule
            .fixtures
            .iter()
            .all(|f| f.side_a.len() == 2 && f.side_b.len() == 2));
    }

    #[test]
    fn random_doubles_need_four_players() {
        let league = league(ScoringFormat::Doubles, RotationType::Random, 2);
        assert!(matches!(
            generate_schedule(&league, &users(1..=3), &LeagueRules::default(), rng()),
            Err(ScheduleError::RosterTooSmall { required: 4, found: 3, .. })
        ));
    }

    #[test]
    fn time_trials_get_one_session_per_week() {
        let league = league(ScoringFormat::IndividualTime, RotationType::Random, 4);
        let schedule =
            generate_schedule(&league, &users([1]), &LeagueRules::default(), rng()).unwrap();

        assert!(schedule.fixtures.is_empty());
        assert_eq!(
            schedule.sessions.iter().map(|s| s.week).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn formats_without_generator_are_rejected() {
        for format in [ScoringFormat::TeamVsTeam, ScoringFormat::IndividualPoints] {
            let league = league(format.clone(), RotationType::Random, 4);
            assert_eq!(
                generate_schedule(&league, &users(1..=4), &LeagueRules::default(), rng()),
                Err(ScheduleError::UnsupportedFormat(format.to_string()))
            );
        }
    }

    #[test]
    fn zero_weeks_are_rejected() {
        let league = league(ScoringFormat::Singles, RotationType::Random, 0);
        assert_eq!(
            generate_schedule(&league, &users(1..=4), &LeagueRules::default(), rng()),
            Err(ScheduleError::NoWeeks)
        );
    }

    #[test]
    fn tiny_singles_roster_is_rejected() {
        let league = league(ScoringFormat::Singles, RotationType::Random, 2);
        assert!(matches!(
            generate_schedule(&league, &users([1]), &LeagueRules::default(), rng()),
            Err(ScheduleError::RosterTooSmall { required: 2, found: 1, .. })
        ));
    }

    #[test]
    fn weeks_are_seven_days_long() {
        let (start, end) = week_window(date!(2024 - 09 - 02), 3);
        assert_eq!(start, UtcDateTime::assume_utc(datetime!(2024-09-16 00:00:00)));
        assert_eq!(end, UtcDateTime::assume_utc(datetime!(2024-09-23 00:00:00)));
    }

    #[test]
    fn season_week_of_a_moment() {
        let start = date!(2024 - 09 - 02);
        let at = |moment| UtcDateTime::assume_utc(moment);

        assert_eq!(season_week(start, 4, at(datetime!(2024-09-01 23:59:59))), None);
        assert_eq!(season_week(start, 4, at(datetime!(2024-09-02 00:00:00))), Some(1));
        assert_eq!(season_week(start, 4, at(datetime!(2024-09-09 08:00:00))), Some(2));
        assert_eq!(season_week(start, 4, at(datetime!(2024-09-29 23:00:00))), Some(4));
        assert_eq!(season_week(start, 4, at(datetime!(2024-09-30 00:00:00))), None);
    }
}
