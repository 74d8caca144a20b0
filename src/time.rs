//! Time units and timestamp handling shared by resolution and preview

use chrono::{DateTime, Duration, Months, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SubmitError};

/// Format of every UTC timestamp accepted in a definition
pub const UTC_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

static GMT_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^GMT[+-]\d{2}:?\d{2}$").expect("valid GMT offset regex"));
static REGION_ZONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Za-z_\-]+(/[A-Za-z0-9_\-+]+){1,2}$").expect("valid region zone regex")
});

/// Unit attached to a frequency, or the end-of-duration marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    EndOfDay,
    EndOfMonth,
    None,
}

impl TimeUnit {
    /// Length in minutes for fixed-size units
    pub fn minutes(&self) -> Option<i64> {
        match self {
            TimeUnit::Minute => Some(1),
            TimeUnit::Hour => Some(60),
            TimeUnit::Day | TimeUnit::EndOfDay => Some(24 * 60),
            TimeUnit::Week => Some(7 * 24 * 60),
            TimeUnit::Month | TimeUnit::EndOfMonth | TimeUnit::None => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "MINUTE",
            TimeUnit::Hour => "HOUR",
            TimeUnit::Day => "DAY",
            TimeUnit::Week => "WEEK",
            TimeUnit::Month => "MONTH",
            TimeUnit::EndOfDay => "END_OF_DAY",
            TimeUnit::EndOfMonth => "END_OF_MONTH",
            TimeUnit::None => "NONE",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MINUTE" => Ok(TimeUnit::Minute),
            "HOUR" => Ok(TimeUnit::Hour),
            "DAY" => Ok(TimeUnit::Day),
            "WEEK" => Ok(TimeUnit::Week),
            "MONTH" => Ok(TimeUnit::Month),
            "END_OF_DAY" => Ok(TimeUnit::EndOfDay),
            "END_OF_MONTH" => Ok(TimeUnit::EndOfMonth),
            "NONE" => Ok(TimeUnit::None),
            other => Err(SubmitError::invalid_attribute(
                "timeunit",
                format!("unknown time unit '{}'", other),
            )),
        }
    }
}

/// Advance `from` by `count` periods of `frequency` units
pub fn advance(from: DateTime<Utc>, frequency: i64, unit: TimeUnit, count: i64) -> Option<DateTime<Utc>> {
    let steps = frequency.checked_mul(count)?;
    match unit {
        TimeUnit::Month | TimeUnit::EndOfMonth => {
            if steps >= 0 {
                from.checked_add_months(Months::new(u32::try_from(steps).ok()?))
            } else {
                from.checked_sub_months(Months::new(u32::try_from(-steps).ok()?))
            }
        }
        TimeUnit::None => None,
        fixed => {
            let minutes = steps.checked_mul(fixed.minutes()?)?;
            from.checked_add_signed(Duration::minutes(minutes))
        }
    }
}

/// Parse a `yyyy-MM-ddTHH:mmZ` timestamp named `field`
pub fn parse_utc(value: &str, field: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), UTC_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| {
            SubmitError::invalid_attribute(
                field,
                format!("'{}' is not a UTC timestamp (yyyy-MM-ddTHH:mmZ)", value),
            )
            .with_source(e)
        })
}

/// Parse a resolved frequency: a positive integer that fits in 32 bits
pub fn parse_frequency(value: &str, field: &str) -> Result<i64> {
    match value.trim().parse::<i32>() {
        Ok(n) if n > 0 => Ok(i64::from(n)),
        _ => Err(SubmitError::invalid_attribute(
            field,
            format!("'{}' must be a positive integer no larger than {}", value, i32::MAX),
        )),
    }
}

pub fn format_utc(time: &DateTime<Utc>) -> String {
    time.format(UTC_FORMAT).to_string()
}

/// Accept `UTC`, `GMT`, `GMT±hh:mm`, or an `Area/Location` zone id
pub fn check_timezone(value: &str, field: &str) -> Result<()> {
    let tz = value.trim();
    if tz == "UTC" || tz == "GMT" || GMT_OFFSET.is_match(tz) || REGION_ZONE.is_match(tz) {
        Ok(())
    } else {
        Err(SubmitError::invalid_attribute(
            field,
            format!("'{}' is not a valid time zone", value),
        ))
    }
}
