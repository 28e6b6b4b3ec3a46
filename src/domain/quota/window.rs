//! UTC calendar windows for quota counters.
//!
//! A window is the UTC calendar day or month containing an instant. Each
//! window carries its own exact end, so a counter created just before a
//! boundary expires at that boundary and never drifts.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use std::fmt;

use crate::domain::foundation::{Identity, Timestamp};

/// The two rolling window kinds tracked per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Daily,
    Monthly,
}

impl WindowKind {
    /// Short key segment used in counter keys.
    pub fn key_segment(&self) -> &'static str {
        match self {
            WindowKind::Daily => "d",
            WindowKind::Monthly => "m",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Daily => write!(f, "daily"),
            WindowKind::Monthly => write!(f, "monthly"),
        }
    }
}

/// A concrete UTC calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaWindow {
    kind: WindowKind,
    start: NaiveDate,
}

impl QuotaWindow {
    /// Returns the window of the given kind containing `at`.
    pub fn containing(kind: WindowKind, at: Timestamp) -> Self {
        let date = at.as_datetime().date_naive();
        let start = match kind {
            WindowKind::Daily => date,
            // First of the month; day 1 always exists.
            WindowKind::Monthly => date.with_day(1).unwrap(),
        };
        Self { kind, start }
    }

    /// The window kind.
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// Inclusive window start (00:00:00 UTC).
    pub fn start(&self) -> Timestamp {
        Timestamp::from_datetime(Utc.from_utc_datetime(&self.start.and_hms_opt(0, 0, 0).unwrap()))
    }

    /// Exclusive window end - the exact rollover instant.
    pub fn end(&self) -> Timestamp {
        let next = match self.kind {
            WindowKind::Daily => self.start.succ_opt().unwrap(),
            WindowKind::Monthly => {
                let (year, month) = if self.start.month() == 12 {
                    (self.start.year() + 1, 1)
                } else {
                    (self.start.year(), self.start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap()
            }
        };
        Timestamp::from_datetime(Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).unwrap()))
    }

    /// Store key for this identity's counter in this window.
    ///
    /// The window start is part of the key, so counters from different
    /// windows never collide even if expiry lags.
    pub fn counter_key(&self, identity: &Identity) -> String {
        let stamp = match self.kind {
            WindowKind::Daily => self.start.format("%Y%m%d").to_string(),
            WindowKind::Monthly => self.start.format("%Y%m").to_string(),
        };
        format!("quota:{}:{}:{}", identity, self.kind.key_segment(), stamp)
    }
}
