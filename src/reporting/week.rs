//! ISO-8601 week identifiers and their local time windows

use chrono::{
    Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::core::error::ValidationError;

const WEEK_PATTERN: &str = r"^(?P<year>\d{4})-W(?P<week>\d{1,2})$";

fn week_regex() -> Result<&'static Regex, ValidationError> {
    static WEEK_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    WEEK_REGEX
        .get_or_init(|| Regex::new(WEEK_PATTERN))
        .as_ref()
        .map_err(|e| week_error(e.to_string()))
}

fn week_error(message: impl Into<String>) -> ValidationError {
    ValidationError::Field {
        field: "week".to_string(),
        message: message.into(),
    }
}

/// An ISO week, e.g. `2024-W01`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeek {
    year: i32,
    week: u32,
}

impl IsoWeek {
    /// Build a week, rejecting week numbers the year does not have
    pub fn new(year: i32, week: u32) -> Result<Self, ValidationError> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(|_| Self { year, week })
            .ok_or_else(|| week_error(format!("{} has no ISO week {}", year, week)))
    }

    /// Parse `YYYY-Www`; the single-digit form sent by week inputs is accepted
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let caps = week_regex()?.captures(raw.trim()).ok_or_else(|| {
            week_error(format!("'{}' is not an ISO week (expected YYYY-Www)", raw))
        })?;
        let year = caps["year"]
            .parse::<i32>()
            .map_err(|e| week_error(e.to_string()))?;
        let week = caps["week"]
            .parse::<u32>()
            .map_err(|e| week_error(e.to_string()))?;
        Self::new(year, week)
    }

    /// The week containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// Monday of this week
    pub fn monday(&self) -> NaiveDate {
        // Validated in `new`
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or_default()
    }

    /// Monday 00:00:00 through Sunday 23:59:59 in `tz`
    pub fn window(&self, tz: Tz) -> WeekWindow {
        let monday = self.monday();
        let next_monday = monday + Duration::days(7);
        WeekWindow {
            week: *self,
            start: local_midnight(tz, monday),
            next_start: local_midnight(tz, next_monday),
        }
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for IsoWeek {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for IsoWeek {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IsoWeek {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Start of `date` in `tz`, in UTC
///
/// When midnight falls in a DST gap the first valid instant after it is used.
fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let mut naive: NaiveDateTime = date.and_time(NaiveTime::MIN);
    for _ in 0..24 {
        if let Some(local) = tz.from_local_datetime(&naive).earliest() {
            return local.with_timezone(&Utc);
        }
        naive += Duration::hours(1);
    }
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// The instants covered by one ISO week in a given zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub week: IsoWeek,
    pub start: DateTime<Utc>,
    #[serde(skip)]
    next_start: DateTime<Utc>,
}

impl WeekWindow {
    /// Sunday 23:59:59 local, the last whole second of the week
    pub fn end(&self) -> DateTime<Utc> {
        self.next_start - Duration::seconds(1)
    }

    /// Inclusive on both ends; fractions of the final second still count
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.next_start
    }
}
