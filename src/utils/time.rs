use chrono::{DateTime, Duration, DurationRound, NaiveDate, Utc};

const DAYS_PER_YEAR: f64 = 365.25;

/// Current time at Postgres `timestamptz` precision, so records read back
/// from either store compare equal.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(Duration::microseconds(1)).unwrap_or(now)
}

/// Length of `[start, end)` in fractional years; zero when `end` is not after `start`.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    let days = (end - start).num_days();
    if days <= 0 {
        0.0
    } else {
        days as f64 / DAYS_PER_YEAR
    }
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
