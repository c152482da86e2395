//! Dense timeline generation and label formatting

use chrono::{DateTime, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::time::interval::{IntervalPlan, Step};

/// Format of a raw timeline point
pub const DATE_POINT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Display granularity of chart labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelClass {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
}

impl LabelClass {
    pub fn format_str(self) -> &'static str {
        match self {
            LabelClass::Seconds | LabelClass::Minutes => "%H:%M:%S",
            LabelClass::Hours => "%Y-%m-%d %H",
            LabelClass::Days => "%Y-%m-%d",
            LabelClass::Months => "%Y-%m",
        }
    }

    pub fn format(self, dt: &NaiveDateTime) -> String {
        dt.format(self.format_str()).to_string()
    }
}

/// Iterator over the points of a dense timeline, `start` through `end` inclusive
#[derive(Debug, Clone)]
pub struct Timeline {
    next: Option<NaiveDateTime>,
    end: NaiveDateTime,
    step: Step,
}

impl Timeline {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, step: Step) -> Self {
        Self {
            next: Some(start),
            end,
            step,
        }
    }
}

impl Iterator for Timeline {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|dt| *dt <= self.end)?;
        self.next = self.step.advance(current).filter(|next| *next > current);
        Some(current)
    }
}

impl IntervalPlan {
    /// Fresh iterator over the plan's timeline
    pub fn timeline(&self) -> Timeline {
        Timeline::new(self.normalized_start(), self.normalized_end(), self.step())
    }

    /// Timeline points rendered as `%Y-%m-%dT%H:%M:%S`
    pub fn dates_list(&self) -> Vec<String> {
        self.timeline()
            .map(|dt| dt.format(DATE_POINT_FORMAT).to_string())
            .collect()
    }

    /// Timeline points rendered with the plan's label class
    pub fn labels(&self) -> Vec<String> {
        let class = self.label_class();
        self.timeline().map(|dt| class.format(&dt)).collect()
    }

    /// Render a histogram bucket key (epoch millis) as a local wall-clock label.
    ///
    /// Returns `None` for keys outside chrono's representable range.
    pub fn bucket_label(&self, key_ms: i64) -> Option<String> {
        let utc = DateTime::from_timestamp_millis(key_ms)?.naive_utc();
        let local = utc + Duration::seconds(i64::from(self.utc_offset().local_minus_utc()));
        Some(self.label_class().format(&local))
    }
}

/// Reformat raw timeline points (`%Y-%m-%dT%H:%M:%S`) for display.
///
/// Unparseable points are passed through unchanged.
pub fn format_labels(dates: &[String], class: LabelClass) -> Vec<String> {
    dates
        .iter()
        .map(|raw| match NaiveDateTime::parse_from_str(raw, DATE_POINT_FORMAT) {
            Ok(dt) => class.format(&dt),
            Err(_) => raw.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeSettings;
    use chrono::FixedOffset;

    fn plan_at(gte: &str, lte: &str, offset_secs: i32) -> IntervalPlan {
        let settings =
            TimeSettings::new("Asia/Karachi", FixedOffset::east_opt(offset_secs).unwrap());
        IntervalPlan::new(gte, lte, &settings).unwrap()
    }

    fn plan(gte: &str, lte: &str) -> IntervalPlan {
        plan_at(gte, lte, 0)
    }

    #[test]
    fn test_ten_second_timeline() {
        let plan = plan("2024-01-01T00:00:00.000Z", "2024-01-01T00:00:10.000Z");
        let dates = plan.dates_list();
        assert_eq!(dates.len(), 11);
        assert_eq!(dates[0], "2024-01-01T00:00:00");
        assert_eq!(dates[10], "2024-01-01T00:00:10");

        let labels = plan.labels();
        assert_eq!(labels[0], "00:00:00");
        assert_eq!(labels[10], "00:00:10");
    }

    #[test]
    fn test_zero_length_range_has_one_point() {
        let plan = plan("2024-01-01T12:00:00Z", "2024-01-01T12:00:00Z");
        assert_eq!(plan.dates_list(), vec!["2024-01-01T12:00:00"]);
    }

    #[test]
    fn test_weekly_timeline() {
        let plan = plan("2024-01-03T00:00:00Z", "2024-02-12T00:00:00Z");
        let labels = plan.labels();
        assert_eq!(
            labels,
            vec![
                "2024-01-01",
                "2024-01-08",
                "2024-01-15",
                "2024-01-22",
                "2024-01-29",
                "2024-02-05",
                "2024-02-12",
            ]
        );
    }

    #[test]
    fn test_monthly_timeline_uses_calendar_months() {
        let plan = plan("2024-01-15T12:00:00Z", "2024-06-20T12:00:00Z");
        assert_eq!(
            plan.labels(),
            vec!["2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]
        );
    }

    #[test]
    fn test_month_end_start_does_not_skip() {
        let plan = plan("2024-01-31T00:00:00Z", "2024-07-31T00:00:00Z");
        assert_eq!(plan.labels().len(), 7);
        assert_eq!(plan.labels()[1], "2024-02");
    }

    #[test]
    fn test_timeline_is_restartable() {
        let plan = plan("2024-01-01T00:00:00Z", "2024-01-01T06:00:00Z");
        let first: Vec<_> = plan.timeline().collect();
        let second: Vec<_> = plan.timeline().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
    }

    #[test]
    fn test_hour_labels() {
        let plan = plan("2024-01-01T00:00:00Z", "2024-01-01T03:00:00Z");
        assert_eq!(
            plan.labels(),
            vec!["2024-01-01 00", "2024-01-01 01", "2024-01-01 02", "2024-01-01 03"]
        );
    }

    #[test]
    fn test_bucket_label_uses_local_offset() {
        let plan = plan_at("2024-01-01T00:00:00Z", "2024-01-20T00:00:00Z", 5 * 3600);
        assert_eq!(plan.label_class(), LabelClass::Days);
        // 2024-01-01T19:00:00Z is 2024-01-02 00:00 at +05:00
        assert_eq!(plan.bucket_label(1_704_135_600_000).as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_format_labels() {
        let dates = vec!["2024-03-05T13:00:00".to_string(), "bogus".to_string()];
        assert_eq!(
            format_labels(&dates, LabelClass::Hours),
            vec!["2024-03-05 13", "bogus"]
        );
        assert_eq!(format_labels(&dates, LabelClass::Months)[0], "2024-03");
    }

    #[test]
    fn test_label_class_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LabelClass::Months).unwrap(), "\"months\"");
    }
}
