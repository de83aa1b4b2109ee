use {
    super::Clock,
    crate::{constants::TIME_TOLERANCE, error::ConfigError},
    serde::{Deserialize, Serialize},
};

/// When a callback or output writer runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Schedule {
    /// Every `n` iterations, including iteration 0
    IterationInterval(u64),
    /// Each time the clock reaches a multiple of the interval
    TimeInterval(f64),
}

impl Schedule {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Schedule::IterationInterval(0) => Err(ConfigError::OutOfRange {
                name: "iteration interval",
                requirement: "positive",
                value: 0.0,
            }),
            Schedule::TimeInterval(t) if !(t.is_finite() && t > 0.0) => {
                Err(ConfigError::OutOfRange {
                    name: "time interval",
                    requirement: "finite and positive",
                    value: t,
                })
            }
            _ => Ok(()),
        }
    }
}

/// A schedule together with its actuation state
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scheduled {
    schedule: Schedule,
    next_time: f64,
}

impl Scheduled {
    pub fn new(schedule: Schedule) -> Result<Self, ConfigError> {
        schedule.validate()?;
        Ok(Self {
            schedule,
            next_time: 0.0,
        })
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Aligns a time interval schedule to the first multiple after `clock`,
    /// then reports whether the schedule fires at the start of a run.
    pub fn initialize(&mut self, clock: &Clock) -> bool {
        match self.schedule {
            Schedule::IterationInterval(n) => clock.iteration % n == 0,
            Schedule::TimeInterval(interval) => {
                self.next_time = next_multiple(clock.time, interval);
                false
            }
        }
    }

    /// Whether the schedule fires at the clock's current state; advances the
    /// next actuation time when it does.
    pub fn fires(&mut self, clock: &Clock) -> bool {
        match self.schedule {
            Schedule::IterationInterval(n) => clock.iteration % n == 0,
            Schedule::TimeInterval(interval) => {
                if clock.time >= self.next_time - TIME_TOLERANCE * interval {
                    self.next_time = next_multiple(clock.time, interval);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Next time at which a time interval schedule fires
    pub fn next_actuation_time(&self) -> Option<f64> {
        match self.schedule {
            Schedule::IterationInterval(_) => None,
            Schedule::TimeInterval(_) => Some(self.next_time),
        }
    }
}

/// Smallest multiple of `interval` strictly after `t`, treating values within
/// tolerance of a multiple as lying on it
fn next_multiple(t: f64, interval: f64) -> f64 {
    ((t / interval + TIME_TOLERANCE).floor() + 1.0) * interval
}

#[cfg(test)]
mod test {
    use super::*;

    fn clock(iteration: u64, time: f64) -> Clock {
        Clock {
            iteration,
            time,
            last_dt: 0.0,
        }
    }

    #[test]
    fn iteration_interval() {
        let mut s = Scheduled::new(Schedule::IterationInterval(3)).unwrap();

        assert!(s.initialize(&clock(0, 0.0)));
        let fired = (1..=9).filter(|&i| s.fires(&clock(i, i as f64))).collect::<Vec<_>>();
        assert_eq!(fired, vec![3, 6, 9]);
        assert_eq!(s.next_actuation_time(), None);
    }

    #[test]
    fn time_interval_fires_on_crossing() {
        let mut s = Scheduled::new(Schedule::TimeInterval(1.0)).unwrap();

        assert!(!s.initialize(&clock(0, 0.0)));
        assert_eq!(s.next_actuation_time(), Some(1.0));
        assert!(!s.fires(&clock(1, 0.4)));
        assert!(!s.fires(&clock(2, 0.8)));
        assert!(s.fires(&clock(3, 1.2)));
        assert_eq!(s.next_actuation_time(), Some(2.0));
        // a single large step crossing several multiples fires once
        assert!(s.fires(&clock(4, 3.5)));
        assert_eq!(s.next_actuation_time(), Some(4.0));
    }

    #[test]
    fn time_interval_tolerates_rounding() {
        let mut s = Scheduled::new(Schedule::TimeInterval(0.1)).unwrap();
        s.initialize(&clock(0, 0.0));

        let mut t = 0.0;
        let mut fired = 0;
        for i in 1..=3 {
            t += 0.1;
            if s.fires(&clock(i, t)) {
                fired += 1;
            }
        }
        assert_eq!(fired, 3);
        assert!(!s.fires(&clock(4, 0.35)));
        assert!((s.next_actuation_time().unwrap() - 0.4).abs() < 1.0E-12);
    }

    #[test]
    fn invalid_schedules() {
        assert!(Scheduled::new(Schedule::IterationInterval(0)).is_err());
        assert!(Scheduled::new(Schedule::TimeInterval(0.0)).is_err());
        assert!(Scheduled::new(Schedule::TimeInterval(f64::NAN)).is_err());
    }
}
