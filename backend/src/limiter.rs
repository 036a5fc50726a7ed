// Daily vote rate limiting.
//
// The limit resets at midnight of one deployment-wide canonical zone
// (`VOTE_TIMEZONE`), never at each server's local midnight. Timestamps are
// stored in UTC, so the local day is mapped to a UTC range before it is used
// in any ledger query.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ledger::{Ledger, LedgerError};

/// One canonical calendar day, `[start, end)`, as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DayWindow {
    /// UTC instant of the window's local midnight.
    pub fn start_utc(&self) -> NaiveDateTime {
        self.start
    }

    /// UTC instant of the next local midnight (exclusive).
    pub fn end_utc(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, instant_utc: NaiveDateTime) -> bool {
        self.start <= instant_utc && instant_utc < self.end
    }
}

/// Per-identity, per-category, per-day vote ceiling.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    limit: u32,
    zone: Tz,
}

impl RateLimiter {
    pub fn new(limit: u32, zone: Tz) -> Self {
        RateLimiter { limit, zone }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The canonical day containing `instant`.
    pub fn window_containing(&self, instant: DateTime<Utc>) -> DayWindow {
        let local_day = instant.with_timezone(&self.zone).date_naive();
        let next_day = local_day + Duration::days(1);
        DayWindow {
            start: local_midnight_utc(self.zone, local_day),
            end: local_midnight_utc(self.zone, next_day),
        }
    }

    pub fn current_window(&self) -> DayWindow {
        self.window_containing(Utc::now())
    }

    /// `max(0, limit - count_today)`.
    pub fn remaining_after(&self, count_today: i64) -> u32 {
        if count_today <= 0 {
            self.limit
        } else {
            u64::from(self.limit).saturating_sub(count_today as u64) as u32
        }
    }

    /// Read-path remaining count for display purposes. The authoritative
    /// check is always re-done inside the write transaction; this value can
    /// be stale the moment it is returned.
    pub async fn remaining_for<L: Ledger>(
        &self,
        ledger: &L,
        identity: &str,
        category_id: i32,
    ) -> Result<u32, LedgerError> {
        let window = self.current_window();
        let count = ledger.count_votes(identity, category_id, &window).await?;
        Ok(self.remaining_after(count))
    }
}

/// UTC instant of local midnight on `day`. On a DST-gap day where midnight
/// does not exist, the earliest valid instant of that day is used instead,
/// keeping consecutive windows contiguous.
fn local_midnight_utc(zone: Tz, day: chrono::NaiveDate) -> NaiveDateTime {
    for hour in 0..4u32 {
        let candidate = day.and_hms_opt(hour, 0, 0).unwrap();
        if let Some(resolved) = zone.from_local_datetime(&candidate).earliest() {
            return resolved.naive_utc();
        }
    }
    // No zone in the IANA database has a gap this wide at midnight.
    unreachable!("no valid instant at the start of {} in {}", day, zone)
}
