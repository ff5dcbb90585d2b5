//! Injected time source.
//!
//! Day buckets are derived from [`Clock::today`], which is always the UTC
//! calendar date of [`Clock::now`].

use std::sync::RwLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate { self.now().date_naive() }
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A settable clock for tests.
#[derive(Debug)]
pub struct MockClock {
  now: RwLock<DateTime<Utc>>,
}

impl Clock for MockClock {
  fn now(&self) -> DateTime<Utc> {
    match self.now.read() {
      Ok(guard) => *guard,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }
}

impl MockClock {
  pub fn with_time(time: DateTime<Utc>) -> Self {
    Self { now: RwLock::new(time) }
  }

  pub fn advance(&self, by: Duration) {
    let mut now = match self.now.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    *now += by;
  }

  pub fn set_time(&self, time: DateTime<Utc>) {
    let mut now = match self.now.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    *now = time;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn today_is_the_utc_date() {
    // 23:30 UTC is already the next day in East Africa Time; the bucket
    // must still be the UTC date.
    let clock = MockClock::with_time(Utc.with_ymd_and_hms(2025, 3, 9, 23, 30, 0).unwrap());
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());

    clock.advance(Duration::minutes(31));
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
  }
}
