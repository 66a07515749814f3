#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
use chrono::Duration;
use chrono::{DateTime, Utc};

/// Source of the current time for everything that stamps records.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
/// Clock under test control. Each reading advances it by `step`, so
/// consecutive stamps are strictly increasing unless `step` is zero.
pub struct ManualClock {
    time: Mutex<DateTime<Utc>>,
    step: Duration,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            time: Mutex::new(start),
            step,
        }
    }

    pub fn fixed(start: DateTime<Utc>) -> Self {
        Self::new(start, Duration::zero())
    }

    pub fn set(&self, time: DateTime<Utc>) {
        if let Ok(mut current) = self.time.lock() {
            *current = time;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.time.lock() {
            *current += by;
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.time.lock() {
            Ok(mut current) => {
                let now = *current;
                *current += self.step;
                now
            }
            Err(_) => Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_steps_on_every_reading() {
        let start = Utc::now();
        let clock = ManualClock::new(start, Duration::seconds(1));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::seconds(1));
        clock.advance(Duration::minutes(10));
        assert_eq!(clock.now(), start + Duration::seconds(2) + Duration::minutes(10));
    }

    #[test]
    fn fixed_clock_stands_still() {
        let start = Utc::now();
        let clock = ManualClock::fixed(start);
        assert_eq!(clock.now(), clock.now());
        let later = start + Duration::hours(3);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
