use std::vec;

use rand::{seq::SliceRandom, Rng};

/// A doubles match drawn from a shuffled roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawnMatch<T> {
    pub week: u32,
    pub side_a: [T; 2],
    pub side_b: [T; 2],
}

/// Random doubles: every week the full roster is shuffled and cut into groups of four.
///
/// The first two players of a group form side A and the last two side B. Players left over
/// after the last full group sit out that week.
pub struct RandomDoublesSchedule<T, R> {
    roster: Vec<T>,
    weeks: u32,
    week: u32,
    rng: R,
    drawn: vec::IntoIter<DrawnMatch<T>>,
}

impl<T: Clone, R: Rng> RandomDoublesSchedule<T, R> {
    pub fn new(roster: Vec<T>, weeks: u32, rng: R) -> RandomDoublesSchedule<T, R> {
        RandomDoublesSchedule {
            roster,
            weeks,
            week: 0,
            rng,
            drawn: Vec::new().into_iter(),
        }
    }

    fn draw_week(&mut self, week: u32) -> Vec<DrawnMatch<T>> {
        let mut shuffled = self.roster.clone();
        shuffled.shuffle(&mut self.rng);

        shuffled
            .chunks_exact(4)
            .map(|group| DrawnMatch {
                week,
                side_a: [group[0].clone(), group[1].clone()],
                side_b: [group[2].clone(), group[3].clone()],
            })
            .collect()
    }
}

impl<T: Clone, R: Rng> Iterator for RandomDoublesSchedule<T, R> {
    type Item = DrawnMatch<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.roster.len() < 4 {
            return None;
        }

        loop {
            if let Some(drawn) = self.drawn.next() {
                return Some(drawn);
            }

            if self.week >= self.weeks {
                return None;
            }

            self.week += 1;
            self.drawn = self.draw_week(self.week).into_iter();
        }
    }
}
