//! # Market Status
//!
//! Determines whether the regular trading session is open. This is a pure
//! function of wall-clock time: 09:30-16:00 New York time, Monday to Friday.
//! Weekends are the only non-trading days recognized; no holiday calendar is
//! consulted and no external call is ever made.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::US::Eastern;
use serde::{Deserialize, Serialize};

/// Exchange whose session window is modelled.
pub const EXCHANGE: &str = "NYSE";
/// IANA name of the exchange timezone.
pub const TIMEZONE: &str = "America/New_York";

const SESSION_OPEN: (u32, u32) = (9, 30);
const SESSION_CLOSE: (u32, u32) = (16, 0);

/// Snapshot of the session state at `checked_at`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketStatus {
    pub is_open: bool,
    pub exchange: String,
    pub timezone: String,
    /// Exchange-local wall time at `checked_at`.
    pub local_time: String,
    pub next_open: Option<DateTime<Utc>>,
    pub next_close: Option<DateTime<Utc>>,
    /// `HH:MM:SS` until the next open or close, whichever comes first.
    pub time_to_next_change: String,
    pub checked_at: DateTime<Utc>,
}

/// Gets the given instant as New York wall time.
fn now_ny(now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(&Eastern).naive_local()
}

fn session_time((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn ny_to_utc(local: NaiveDateTime) -> Option<DateTime<Utc>> {
    Eastern
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whether the regular session is open at `now`.
pub fn is_market_open(now: DateTime<Utc>) -> bool {
    let local = now_ny(now);
    is_trading_day(local.date())
        && local.time() >= session_time(SESSION_OPEN)
        && local.time() < session_time(SESSION_CLOSE)
}

/// First session open strictly after `local`.
fn next_open_after(local: NaiveDateTime) -> Option<NaiveDateTime> {
    (0..8)
        .filter_map(|offset| local.date().checked_add_signed(Duration::days(offset)))
        .filter(|date| is_trading_day(*date))
        .map(|date| date.and_time(session_time(SESSION_OPEN)))
        .find(|open| *open > local)
}

/// Computes the full status for `now`.
pub fn market_status_at(now: DateTime<Utc>) -> MarketStatus {
    let local = now_ny(now);
    let is_open = is_market_open(now);

    let next_open_local = next_open_after(local);
    let next_close_local = if is_open {
        Some(local.date().and_time(session_time(SESSION_CLOSE)))
    } else {
        next_open_local.map(|open| open.date().and_time(session_time(SESSION_CLOSE)))
    };

    let next_change = if is_open { next_close_local } else { next_open_local };
    let time_to_next_change = next_change
        .map(|target| format_duration(target - local))
        .unwrap_or_else(|| format_duration(Duration::zero()));

    MarketStatus {
        is_open,
        exchange: EXCHANGE.to_string(),
        timezone: TIMEZONE.to_string(),
        local_time: local.format("%Y-%m-%d %H:%M:%S").to_string(),
        next_open: next_open_local.and_then(ny_to_utc),
        next_close: next_close_local.and_then(ny_to_utc),
        time_to_next_change,
        checked_at: now,
    }
}

/// Formats a Duration into HH:MM:SS string.
pub fn format_duration(dur: Duration) -> String {
    let total_secs = dur.num_seconds().max(0);
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}
