use crate::utils::error::{Result, WatchError};
use crate::utils::validation::validate_range;
use chrono::{Datelike, Timelike, Weekday};
use std::collections::BTreeMap;
use std::fmt;

/// Published opening hours for one day, whole hours, `close` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub open: u32,
    pub close: u32,
}

impl OpeningHours {
    pub fn new(open: u32, close: u32) -> Result<Self> {
        validate_range("schedule.open", open, 0, 23)?;
        validate_range("schedule.close", close, 1, 24)?;
        if open >= close {
            return Err(WatchError::InvalidConfigValueError {
                field: "schedule".to_string(),
                value: format!("[{}, {}]", open, close),
                reason: "Opening hour must be before closing hour".to_string(),
            });
        }
        Ok(Self { open, close })
    }

    /// Polling stops one hour before closing.
    pub fn admits(&self, hour: u32) -> bool {
        self.open <= hour && hour + 1 < self.close
    }
}

impl fmt::Display for OpeningHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.open, self.close)
    }
}

/// Weekday -> opening hours. Days without an entry are closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    days: [Option<OpeningHours>; 7],
}

impl Schedule {
    pub fn closed() -> Self {
        Self { days: [None; 7] }
    }

    pub fn with_day(mut self, day: Weekday, hours: OpeningHours) -> Self {
        self.days[day.num_days_from_monday() as usize] = Some(hours);
        self
    }

    pub fn hours_for(&self, day: Weekday) -> Option<OpeningHours> {
        self.days[day.num_days_from_monday() as usize]
    }

    /// 判斷當下是否在營業時間內，值得抓取
    pub fn is_open<T: Datelike + Timelike>(&self, at: &T) -> bool {
        self.hours_for(at.weekday())
            .map(|hours| hours.admits(at.hour()))
            .unwrap_or(false)
    }

    /// Build from the settings-file form, e.g. `{"mon": [11, 20]}`.
    pub fn from_table(table: &BTreeMap<String, [u32; 2]>) -> Result<Self> {
        let mut schedule = Self::closed();
        for (key, [open, close]) in table {
            let day: Weekday = key.parse().map_err(|_| WatchError::InvalidConfigValueError {
                field: "schedule".to_string(),
                value: key.clone(),
                reason: "Unknown day of week".to_string(),
            })?;
            schedule = schedule.with_day(day, OpeningHours::new(*open, *close)?);
        }
        Ok(schedule)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        let weekday = OpeningHours { open: 11, close: 20 };
        let sunday = OpeningHours { open: 12, close: 20 };
        Self {
            days: [
                Some(weekday),
                Some(weekday),
                Some(weekday),
                Some(weekday),
                Some(weekday),
                Some(weekday),
                Some(sunday),
            ],
        }
    }
}
