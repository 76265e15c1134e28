//! Market hours gate
//!
//! Decides whether the reference exchange is trading at a given instant.
//! All calculations happen in the exchange's own time zone so callers never
//! deal with offsets or daylight saving transitions.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Trading window of the reference exchange
#[derive(Debug, Clone, PartialEq)]
pub struct MarketWindow {
    /// Local time the session opens (inclusive)
    pub open_time: NaiveTime,
    /// Local time the session closes (inclusive)
    pub close_time: NaiveTime,
    /// Exchange time zone
    pub time_zone: Tz,
    /// Weekdays with no session
    pub closed_weekdays: Vec<Weekday>,
}

impl Default for MarketWindow {
    fn default() -> Self {
        Self {
            open_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            close_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            time_zone: chrono_tz::America::New_York,
            closed_weekdays: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}

impl MarketWindow {
    fn is_trading_day(&self, weekday: Weekday) -> bool {
        !self.closed_weekdays.contains(&weekday)
    }
}

/// Pure market-hours calculator; callers supply the current instant
#[derive(Debug, Clone)]
pub struct MarketClock {
    window: MarketWindow,
}

impl MarketClock {
    pub fn new(window: MarketWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &MarketWindow {
        &self.window
    }

    /// True iff `now` falls on a trading day within `[open_time, close_time]`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.window.time_zone);
        if !self.window.is_trading_day(local.weekday()) {
            return false;
        }

        let time = local.time();
        time >= self.window.open_time && time <= self.window.close_time
    }

    /// Next session open strictly after `now`
    ///
    /// Returns `None` only if no trading day exists within the next week.
    pub fn next_open(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let tz = self.window.time_zone;
        let local_now = now.with_timezone(&tz);
        let mut date = local_now.date_naive();

        for _ in 0..8 {
            if self.window.is_trading_day(date.weekday()) {
                // `earliest` resolves a DST fold; a gap yields None and the day is skipped
                let open = tz
                    .from_local_datetime(&date.and_time(self.window.open_time))
                    .earliest();
                if let Some(open) = open.filter(|open| *open > local_now) {
                    return Some(open.with_timezone(&Utc));
                }
            }
            date = date.succ_opt()?;
        }

        None
    }
}

impl Default for MarketClock {
    fn default() -> Self {
        Self::new(MarketWindow::default())
    }
}
