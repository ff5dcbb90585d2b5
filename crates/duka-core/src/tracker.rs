//! Best-effort event recording and daily rollups.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  clock::Clock,
  event::{DailyStat, EVENT_PREFIX, Event, EventType, daily_key},
  store::KeyValueStore,
};

/// Records business events and folds them into the day's [`DailyStat`].
///
/// [`record`](Self::record) never fails from the caller's point of view:
/// analytics must not block or roll back the write that triggered it.
pub struct EventTracker<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S> Clone for EventTracker<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), clock: self.clock.clone() }
  }
}

impl<S: KeyValueStore> EventTracker<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self { Self { store, clock } }

  /// Append the event and bump today's counters. Failures are logged and
  /// swallowed.
  pub async fn record(&self, event_type: EventType, data: Value) {
    if let Err(e) = self.try_record(event_type, data).await {
      tracing::warn!(event = %event_type, error = %e, "failed to record analytics event");
    }
  }

  async fn try_record(&self, event_type: EventType, data: Value) -> Result<DailyStat, S::Error> {
    let now = self.clock.now();
    let suffix = Uuid::new_v4().simple().to_string();
    let event = Event {
      id: format!("{EVENT_PREFIX}{}:{}", now.timestamp_millis(), &suffix[..8]),
      event_type,
      data,
      timestamp: now,
    };
    self.store.set(&event.id, serde_json::to_value(&event)?).await?;

    let date = now.date_naive();
    let key = daily_key(date);
    let updated = self
      .store
      .update(&key, move |stored| {
        let mut stat = DailyStat::from_stored(date, stored)?;
        stat.apply(event.event_type, &event.data);
        serde_json::to_value(stat)
      })
      .await?;

    Ok(DailyStat::from_stored(date, Some(updated))?)
  }

  /// The stored rollup for `date`, or an empty one.
  pub async fn daily(&self, date: NaiveDate) -> Result<DailyStat, S::Error> {
    let stored = self.store.get(&daily_key(date)).await?;
    Ok(DailyStat::from_stored(date, stored)?)
  }
}
