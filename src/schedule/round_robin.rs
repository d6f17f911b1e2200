use std::iter;

/// One pairing of the circle method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pairing<T> {
    pub week: u32,
    /// Zero-based position in the rotation period.
    pub round: u32,
    pub home: T,
    pub away: T,
}

/// Round robin by the circle method.
///
/// Position 0 is held in place and the other slots rotate by one step per week. An odd number
/// of nodes gets an empty slot, and pairings against it are skipped. The rotation repeats every
/// `n - 1` weeks, where `n` is the padded node count.
///
/// Pairings are produced lazily, week by week.
pub struct CircleSchedule<T> {
    nodes: Vec<Option<T>>,
    weeks: u32,
    week: u32,
    arrangement: Vec<Option<T>>,
    position: usize,
}

impl<T: Clone> CircleSchedule<T> {
    pub fn new(nodes: impl IntoIterator<Item = T>, weeks: u32) -> CircleSchedule<T> {
        let mut nodes: Vec<Option<T>> = nodes.into_iter().map(Some).collect();
        if nodes.len() % 2 == 1 {
            nodes.push(None);
        }

        CircleSchedule {
            nodes,
            weeks,
            week: 0,
            arrangement: Vec::new(),
            position: 0,
        }
    }

    pub fn period(&self) -> u32 {
        self.nodes.len().saturating_sub(1) as u32
    }

    fn round_of(&self, week: u32) -> u32 {
        (week - 1) % self.period()
    }

    fn start_week(&mut self, week: u32) {
        let round = self.round_of(week) as usize;

        let mut rest = self.nodes[1..].to_vec();
        rest.rotate_right(round);

        self.arrangement = iter::once(self.nodes[0].clone()).chain(rest).collect();
        self.week = week;
        self.position = 0;
    }
}

impl<T: Clone> Iterator for CircleSchedule<T> {
    type Item = Pairing<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.nodes.len() < 2 {
            return None;
        }

        loop {
            if self.week == 0 || self.position >= self.arrangement.len() / 2 {
                if self.week >= self.weeks {
                    return None;
                }
                self.start_week(self.week + 1);
            }

            let last = self.arrangement.len() - 1;
            let position = self.position;
            self.position += 1;

            if let (Some(home), Some(away)) =
                (&self.arrangement[position], &self.arrangement[last - position])
            {
                return Some(Pairing {
                    week: self.week,
                    round: self.round_of(self.week),
                    home: home.clone(),
                    away: away.clone(),
                });
            }
        }
    }
}
