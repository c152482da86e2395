//! Histogram interval selection
//!
//! Picks one of twelve granularity bands for a requested time span and derives
//! everything downstream code needs from it: the engine's `date_histogram`
//! interval descriptor, the step used to walk a dense timeline, the truncated
//! start/end of that timeline, and the label class used for display.
//!
//! # Bands
//!
//! ```text
//! span            interval        label
//! [0s, 15s]       1s fixed        seconds
//! (15s, 30s]      2s fixed        seconds
//! (30s, 60s]      5s fixed        seconds
//! (1m, 15m]       1m fixed        minutes
//! (15m, 30m]      2m fixed        minutes
//! (30m, 60m]      15m fixed       minutes
//! (1h, 12h]       1h fixed        hours
//! (12h, 24h]      2h fixed        hours
//! 1..=6 days      12h fixed       hours
//! 7..=30 days     1d fixed        days
//! 31..=90 days    1w calendar     days
//! > 90 days       1M calendar     months
//! ```
//!
//! Short spans use fixed intervals plus an offset taken from the range start so
//! bucket edges line up with the requested instant. Long spans switch to calendar
//! intervals, which follow DST shifts and month lengths.

use chrono::{Datelike, Duration, FixedOffset, Months, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::time::error::{TimeError, TimeResult};
use crate::time::normalize::{local_to_utc, parse_local};
use crate::time::timeline::LabelClass;
use crate::time::TimeSettings;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;

/// One of the twelve granularity bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalBand {
    OneSecond,
    TwoSeconds,
    FiveSeconds,
    OneMinute,
    TwoMinutes,
    FifteenMinutes,
    OneHour,
    TwoHours,
    TwelveHours,
    OneDay,
    OneWeek,
    OneMonth,
}

impl IntervalBand {
    /// Select the band for a span.
    ///
    /// `delta_seconds` drives the sub-day bands; `delta_days` (whole local
    /// calendar days) drives the rest. Negative spans are rejected by the caller.
    pub fn select(delta_seconds: i64, delta_days: i64) -> Self {
        match delta_seconds {
            s if s <= 15 => Self::OneSecond,
            s if s <= 30 => Self::TwoSeconds,
            s if s <= 60 => Self::FiveSeconds,
            s if s <= 15 * MINUTE => Self::OneMinute,
            s if s <= 30 * MINUTE => Self::TwoMinutes,
            s if s <= HOUR => Self::FifteenMinutes,
            s if s <= 12 * HOUR => Self::OneHour,
            s if s <= 24 * HOUR => Self::TwoHours,
            _ => match delta_days {
                d if d <= 6 => Self::TwelveHours,
                d if d <= 30 => Self::OneDay,
                d if d <= 90 => Self::OneWeek,
                _ => Self::OneMonth,
            },
        }
    }

    /// Display granularity for this band
    pub fn label_class(self) -> LabelClass {
        match self {
            Self::OneSecond | Self::TwoSeconds | Self::FiveSeconds => LabelClass::Seconds,
            Self::OneMinute | Self::TwoMinutes | Self::FifteenMinutes => LabelClass::Minutes,
            Self::OneHour | Self::TwoHours | Self::TwelveHours => LabelClass::Hours,
            Self::OneDay | Self::OneWeek => LabelClass::Days,
            Self::OneMonth => LabelClass::Months,
        }
    }

    /// Step between two consecutive timeline points
    pub fn step(self) -> Step {
        match self {
            Self::OneSecond => Step::Fixed(Duration::seconds(1)),
            Self::TwoSeconds => Step::Fixed(Duration::seconds(2)),
            Self::FiveSeconds => Step::Fixed(Duration::seconds(5)),
            Self::OneMinute => Step::Fixed(Duration::minutes(1)),
            Self::TwoMinutes => Step::Fixed(Duration::minutes(2)),
            Self::FifteenMinutes => Step::Fixed(Duration::minutes(15)),
            Self::OneHour => Step::Fixed(Duration::hours(1)),
            Self::TwoHours => Step::Fixed(Duration::hours(2)),
            Self::TwelveHours => Step::Fixed(Duration::hours(12)),
            Self::OneDay => Step::Fixed(Duration::days(1)),
            Self::OneWeek => Step::Fixed(Duration::weeks(1)),
            Self::OneMonth => Step::Months(1),
        }
    }

    /// Engine interval unit
    pub fn unit(self) -> IntervalUnit {
        match self {
            Self::OneSecond => IntervalUnit::Fixed("1s"),
            Self::TwoSeconds => IntervalUnit::Fixed("2s"),
            Self::FiveSeconds => IntervalUnit::Fixed("5s"),
            Self::OneMinute => IntervalUnit::Fixed("1m"),
            Self::TwoMinutes => IntervalUnit::Fixed("2m"),
            Self::FifteenMinutes => IntervalUnit::Fixed("15m"),
            Self::OneHour => IntervalUnit::Fixed("1h"),
            Self::TwoHours => IntervalUnit::Fixed("2h"),
            Self::TwelveHours => IntervalUnit::Fixed("12h"),
            Self::OneDay => IntervalUnit::Fixed("1d"),
            Self::OneWeek => IntervalUnit::Calendar("1w"),
            Self::OneMonth => IntervalUnit::Calendar("1M"),
        }
    }

    /// Bucket offset derived from the range start, if the band uses one
    fn offset(self, start: &NaiveDateTime) -> Option<String> {
        match self {
            Self::OneSecond | Self::TwoSeconds | Self::FiveSeconds => {
                Some(format!("{}s", start.second()))
            }
            Self::OneMinute | Self::TwoMinutes | Self::FifteenMinutes => {
                Some(format!("{}m", start.minute()))
            }
            Self::OneHour | Self::TwoHours | Self::TwelveHours => Some(format!("{}h", start.hour())),
            Self::OneDay => Some(format!("{}d", start.day())),
            Self::OneWeek => None,
            Self::OneMonth => Some("0d".to_string()),
        }
    }

    /// Zero every component finer than the bucket size
    fn truncate(self, dt: NaiveDateTime) -> NaiveDateTime {
        let date = dt.date();
        match self {
            Self::OneSecond | Self::TwoSeconds | Self::FiveSeconds => dt,
            Self::OneMinute | Self::TwoMinutes | Self::FifteenMinutes => {
                dt.with_second(0).unwrap_or(dt)
            }
            Self::OneHour | Self::TwoHours | Self::TwelveHours => dt
                .with_minute(0)
                .and_then(|d| d.with_second(0))
                .unwrap_or(dt),
            Self::OneDay | Self::OneWeek => date.and_time(chrono::NaiveTime::MIN),
            Self::OneMonth => date
                .with_day(1)
                .unwrap_or(date)
                .and_time(chrono::NaiveTime::MIN),
        }
    }
}

impl std::fmt::Display for IntervalBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unit() {
            IntervalUnit::Fixed(unit) | IntervalUnit::Calendar(unit) => write!(f, "{}", unit),
        }
    }
}

/// How a timeline advances from one point to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fixed wall-clock duration
    Fixed(Duration),
    /// Whole calendar months
    Months(u32),
}

impl Step {
    /// Advance a timestamp by one step, `None` on overflow
    pub fn advance(&self, dt: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Step::Fixed(duration) => dt.checked_add_signed(*duration),
            Step::Months(n) => dt.checked_add_months(Months::new(*n)),
        }
    }
}

/// Engine interval kind and value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    /// `fixed_interval`
    Fixed(&'static str),
    /// `calendar_interval`
    Calendar(&'static str),
}

/// The `date_histogram` interval descriptor handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramInterval {
    pub unit: IntervalUnit,
    pub offset: Option<String>,
    pub time_zone: String,
}

impl HistogramInterval {
    /// Render as the `date_histogram` keys (`fixed_interval`/`calendar_interval`,
    /// `offset`, `time_zone`)
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self.unit {
            IntervalUnit::Fixed(v) => map.insert("fixed_interval".into(), Value::from(v)),
            IntervalUnit::Calendar(v) => map.insert("calendar_interval".into(), Value::from(v)),
        };
        if let Some(offset) = &self.offset {
            map.insert("offset".into(), Value::from(offset.as_str()));
        }
        map.insert("time_zone".into(), Value::from(self.time_zone.as_str()));
        map
    }
}

/// Immutable result of interval selection for one `(start, end)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalPlan {
    band: IntervalBand,
    interval: HistogramInterval,
    normalized_start: NaiveDateTime,
    normalized_end: NaiveDateTime,
    utc_offset: FixedOffset,
}

impl IntervalPlan {
    /// Plan the histogram for a caller range.
    ///
    /// `gte`/`lte` are local timestamps in either accepted format.
    pub fn new(gte: &str, lte: &str, settings: &TimeSettings) -> TimeResult<Self> {
        let start = without_subsec(parse_local(gte)?);
        let end = without_subsec(parse_local(lte)?);

        let delta_seconds = (local_to_utc(end, settings.utc_offset)
            - local_to_utc(start, settings.utc_offset))
        .num_seconds();
        if delta_seconds < 0 {
            return Err(TimeError::InvertedRange {
                start: gte.to_string(),
                end: lte.to_string(),
            });
        }
        let delta_days = (end - start).num_days();

        let band = IntervalBand::select(delta_seconds, delta_days);

        let anchor = match band {
            IntervalBand::OneWeek => {
                start - Duration::days(i64::from(start.weekday().num_days_from_monday()))
            }
            _ => start,
        };

        let interval = HistogramInterval {
            unit: band.unit(),
            offset: band.offset(&start),
            time_zone: settings.timezone.clone(),
        };

        Ok(Self {
            band,
            interval,
            normalized_start: band.truncate(anchor),
            normalized_end: band.truncate(end),
            utc_offset: settings.utc_offset,
        })
    }

    pub fn band(&self) -> IntervalBand {
        self.band
    }

    /// Engine `date_histogram` interval descriptor
    pub fn interval(&self) -> &HistogramInterval {
        &self.interval
    }

    pub fn step(&self) -> Step {
        self.band.step()
    }

    pub fn label_class(&self) -> LabelClass {
        self.band.label_class()
    }

    /// First timeline point (local wall-clock)
    pub fn normalized_start(&self) -> NaiveDateTime {
        self.normalized_start
    }

    /// Last admissible timeline point (local wall-clock)
    pub fn normalized_end(&self) -> NaiveDateTime {
        self.normalized_end
    }

    /// Local offset used to map bucket keys back to wall-clock labels
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }
}

fn without_subsec(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn settings() -> TimeSettings {
        TimeSettings::new("Asia/Karachi", FixedOffset::east_opt(0).unwrap())
    }

    fn plan(gte: &str, lte: &str) -> IntervalPlan {
        IntervalPlan::new(gte, lte, &settings()).unwrap()
    }

    #[test]
    fn test_select_second_bands() {
        assert_eq!(IntervalBand::select(0, 0), IntervalBand::OneSecond);
        assert_eq!(IntervalBand::select(15, 0), IntervalBand::OneSecond);
        assert_eq!(IntervalBand::select(16, 0), IntervalBand::TwoSeconds);
        assert_eq!(IntervalBand::select(30, 0), IntervalBand::TwoSeconds);
        assert_eq!(IntervalBand::select(31, 0), IntervalBand::FiveSeconds);
        assert_eq!(IntervalBand::select(60, 0), IntervalBand::FiveSeconds);
    }

    #[test]
    fn test_select_minute_and_hour_bands() {
        assert_eq!(IntervalBand::select(61, 0), IntervalBand::OneMinute);
        assert_eq!(IntervalBand::select(900, 0), IntervalBand::OneMinute);
        assert_eq!(IntervalBand::select(901, 0), IntervalBand::TwoMinutes);
        assert_eq!(IntervalBand::select(1800, 0), IntervalBand::TwoMinutes);
        assert_eq!(IntervalBand::select(1801, 0), IntervalBand::FifteenMinutes);
        assert_eq!(IntervalBand::select(3600, 0), IntervalBand::FifteenMinutes);
        assert_eq!(IntervalBand::select(3601, 0), IntervalBand::OneHour);
        assert_eq!(IntervalBand::select(43_200, 0), IntervalBand::OneHour);
        assert_eq!(IntervalBand::select(43_201, 0), IntervalBand::TwoHours);
        assert_eq!(IntervalBand::select(86_400, 1), IntervalBand::TwoHours);
    }

    #[test]
    fn test_select_day_bands() {
        assert_eq!(IntervalBand::select(86_401, 1), IntervalBand::TwelveHours);
        assert_eq!(IntervalBand::select(6 * 86_400 + 3600, 6), IntervalBand::TwelveHours);
        assert_eq!(IntervalBand::select(7 * 86_400, 7), IntervalBand::OneDay);
        assert_eq!(IntervalBand::select(30 * 86_400, 30), IntervalBand::OneDay);
        assert_eq!(IntervalBand::select(31 * 86_400, 31), IntervalBand::OneWeek);
        assert_eq!(IntervalBand::select(90 * 86_400, 90), IntervalBand::OneWeek);
        assert_eq!(IntervalBand::select(91 * 86_400, 91), IntervalBand::OneMonth);
    }

    #[test]
    fn test_ten_second_range() {
        let plan = plan("2024-01-01T00:00:00.000Z", "2024-01-01T00:00:10.000Z");
        assert_eq!(plan.band(), IntervalBand::OneSecond);
        assert_eq!(plan.label_class(), LabelClass::Seconds);

        let json = plan.interval().to_json();
        assert_eq!(json["fixed_interval"], "1s");
        assert_eq!(json["offset"], "0s");
        assert_eq!(json["time_zone"], "Asia/Karachi");
    }

    #[test]
    fn test_minute_band_truncates_seconds() {
        let plan = plan("2024-01-01T10:07:42Z", "2024-01-01T10:17:05Z");
        assert_eq!(plan.band(), IntervalBand::OneMinute);
        assert_eq!(plan.normalized_start().to_string(), "2024-01-01 10:07:00");
        assert_eq!(plan.normalized_end().to_string(), "2024-01-01 10:17:00");
        assert_eq!(plan.interval().offset.as_deref(), Some("7m"));
    }

    #[test]
    fn test_hour_band_truncates_minutes() {
        let plan = plan("2024-01-01T10:30:00Z", "2024-01-01T15:45:00Z");
        assert_eq!(plan.band(), IntervalBand::OneHour);
        assert_eq!(plan.normalized_start().to_string(), "2024-01-01 10:00:00");
        assert_eq!(plan.normalized_end().to_string(), "2024-01-01 15:00:00");
        assert_eq!(plan.interval().offset.as_deref(), Some("10h"));
    }

    #[test]
    fn test_forty_days_is_weekly_from_monday() {
        // 2024-01-03 is a Wednesday
        let plan = plan("2024-01-03T08:00:00Z", "2024-02-12T09:00:00Z");
        assert_eq!(plan.band(), IntervalBand::OneWeek);
        assert_eq!(plan.label_class(), LabelClass::Days);
        assert_eq!(plan.normalized_start().weekday(), Weekday::Mon);
        assert_eq!(plan.normalized_start().to_string(), "2024-01-01 00:00:00");

        let json = plan.interval().to_json();
        assert_eq!(json["calendar_interval"], "1w");
        assert!(!json.contains_key("offset"));
        assert!(!json.contains_key("fixed_interval"));
    }

    #[test]
    fn test_long_range_is_monthly() {
        let plan = plan("2024-01-15T12:00:00Z", "2024-06-20T12:00:00Z");
        assert_eq!(plan.band(), IntervalBand::OneMonth);
        assert_eq!(plan.normalized_start().to_string(), "2024-01-01 00:00:00");
        assert_eq!(plan.normalized_end().to_string(), "2024-06-01 00:00:00");
        assert_eq!(plan.interval().to_json()["offset"], "0d");
    }

    #[test]
    fn test_day_band_offset_uses_day_of_month() {
        let plan = plan("2024-03-05T13:00:00Z", "2024-03-20T01:00:00Z");
        assert_eq!(plan.band(), IntervalBand::OneDay);
        assert_eq!(plan.interval().offset.as_deref(), Some("5d"));
        assert_eq!(plan.normalized_start().to_string(), "2024-03-05 00:00:00");
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = IntervalPlan::new("2024-01-02T00:00:00Z", "2024-01-01T00:00:00Z", &settings())
            .unwrap_err();
        assert!(matches!(err, TimeError::InvertedRange { .. }));
    }

    #[test]
    fn test_start_never_after_end() {
        let ranges = [
            ("2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z"),
            ("2024-01-01T00:00:59Z", "2024-01-01T00:01:30Z"),
            ("2024-01-01T23:59:00Z", "2024-01-02T01:00:00Z"),
            ("2024-01-07T10:00:00Z", "2024-02-20T10:00:00Z"),
            ("2023-12-31T10:00:00Z", "2024-12-31T10:00:00Z"),
        ];
        for (gte, lte) in ranges {
            let plan = plan(gte, lte);
            assert!(plan.normalized_start() <= plan.normalized_end(), "{} -> {}", gte, lte);
        }
    }
}
