//! Time handling
//!
//! Normalization of caller timestamps, histogram interval selection and the
//! dense timelines used to gap-fill time-series charts.

mod error;
mod interval;
mod normalize;
mod timeline;

pub use error::{TimeError, TimeResult};
pub use interval::{HistogramInterval, IntervalBand, IntervalPlan, IntervalUnit, Step};
pub use normalize::{
    local_to_utc, normalize_timestamp, parse_local, parse_offset, parse_utc, CANONICAL_FORMAT,
};
pub use timeline::{format_labels, LabelClass, Timeline, DATE_POINT_FORMAT};

use chrono::{FixedOffset, Offset, Utc};

/// Display timezone plus the fixed local offset caller timestamps are written in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSettings {
    /// IANA name sent to the engine as `time_zone`
    pub timezone: String,
    pub utc_offset: FixedOffset,
}

impl TimeSettings {
    pub fn new(timezone: impl Into<String>, utc_offset: FixedOffset) -> Self {
        Self {
            timezone: timezone.into(),
            utc_offset,
        }
    }

    /// Build from a timezone name and an offset descriptor such as `+05:00`
    pub fn parse(timezone: &str, utc_offset: &str) -> TimeResult<Self> {
        Ok(Self::new(timezone, parse_offset(utc_offset)?))
    }
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            utc_offset: Utc.fix(),
        }
    }
}
