use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::modifier::TimeOfDay;

/// A fixed period of the 24-hour billing day.
///
/// Weekday blocks:
/// - Overnight:    00:00-06:59 (callback 03.05QB)
/// - Daytime:      07:00-16:59 (callback 03.05N)
/// - Evening:      17:00-21:59 (callback 03.05P)
/// - Late evening: 22:00-23:59 (callback 03.05QA)
///
/// On weekends and stat holidays evening collapses into daytime, which then
/// runs 07:00-21:59 under callback 03.05R.
///
/// Variants are declared in chronological order so the derived `Ord` sorts
/// summaries the way a shift reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBlock {
    Overnight,
    Daytime,
    Evening,
    LateEvening,
}

impl TimeBlock {
    /// Classify a wall-clock time into its block (weekday boundaries)
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveTime;
    /// use feeplan_types::TimeBlock;
    ///
    /// let t = NaiveTime::from_hms_opt(22, 30, 0).unwrap();
    /// assert_eq!(TimeBlock::from_time(t), TimeBlock::LateEvening);
    /// ```
    pub fn from_time(time: NaiveTime) -> Self {
        match time.hour() {
            0..=6 => Self::Overnight,
            7..=16 => Self::Daytime,
            17..=21 => Self::Evening,
            _ => Self::LateEvening,
        }
    }

    /// Snake-case identifier used in config files and JSON
    pub fn name(self) -> &'static str {
        match self {
            Self::Overnight => "overnight",
            Self::Daytime => "daytime",
            Self::Evening => "evening",
            Self::LateEvening => "late_evening",
        }
    }

    /// Clock hours the block spans under `mode`
    pub fn span_hours(self, mode: ScheduleMode) -> u32 {
        match (self, mode) {
            (Self::Overnight, _) => 7,
            (Self::Daytime, ScheduleMode::Weekday) => 10,
            (Self::Daytime, ScheduleMode::WeekendOrStat) => 15,
            (Self::Evening, _) => 5,
            (Self::LateEvening, _) => 2,
        }
    }

    /// Human-readable clock range, e.g. "22:00-23:59"
    pub fn label(self, mode: ScheduleMode) -> &'static str {
        match (mode.normalize(self), mode) {
            (Self::Overnight, _) => "00:00-06:59",
            (Self::Daytime, ScheduleMode::Weekday) => "07:00-16:59",
            (Self::Daytime, ScheduleMode::WeekendOrStat) => "07:00-21:59",
            (Self::Evening, _) => "17:00-21:59",
            (Self::LateEvening, _) => "22:00-23:59",
        }
    }

    /// Callback code billed for an after-hours return in this block
    pub fn callback_code(self, mode: ScheduleMode) -> &'static str {
        match (mode.normalize(self), mode) {
            (Self::Overnight, _) => "03.05QB",
            (Self::LateEvening, _) => "03.05QA",
            (Self::Evening, _) => "03.05P",
            (Self::Daytime, ScheduleMode::Weekday) => "03.05N",
            (Self::Daytime, ScheduleMode::WeekendOrStat) => "03.05R",
        }
    }

    /// After-hours surcharge that encounters in this block attract
    ///
    /// Weekends and stat holidays bill WK around the clock; the night codes
    /// only apply on weekdays.
    pub fn after_hours(self, mode: ScheduleMode) -> Option<TimeOfDay> {
        match (mode.normalize(self), mode) {
            (_, ScheduleMode::WeekendOrStat) => Some(TimeOfDay::Weekend),
            (Self::Overnight, ScheduleMode::Weekday) => Some(TimeOfDay::NightAm),
            (Self::LateEvening, ScheduleMode::Weekday) => Some(TimeOfDay::NightPm),
            (Self::Evening, ScheduleMode::Weekday) => Some(TimeOfDay::Evening),
            (Self::Daytime, ScheduleMode::Weekday) => None,
        }
    }
}

impl fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimeBlock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "overnight" | "night" => Ok(Self::Overnight),
            "daytime" | "day" => Ok(Self::Daytime),
            "evening" => Ok(Self::Evening),
            "late_evening" => Ok(Self::LateEvening),
            other => Err(format!("unknown time block '{}'", other)),
        }
    }
}

/// Weekday vs. weekend/stat-holiday capacity rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    #[default]
    Weekday,
    WeekendOrStat,
}

impl ScheduleMode {
    pub fn from_weekend_flag(is_weekend: bool) -> Self {
        if is_weekend {
            Self::WeekendOrStat
        } else {
            Self::Weekday
        }
    }

    /// Saturdays, Sundays and stat holidays use weekend rules
    pub fn for_date(date: NaiveDate, is_stat_holiday: bool) -> Self {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        Self::from_weekend_flag(weekend || is_stat_holiday)
    }

    pub fn is_weekend(self) -> bool {
        self == Self::WeekendOrStat
    }

    /// Map a block onto the blocks that exist under this mode
    pub fn normalize(self, block: TimeBlock) -> TimeBlock {
        match (self, block) {
            (Self::WeekendOrStat, TimeBlock::Evening) => TimeBlock::Daytime,
            (_, other) => other,
        }
    }
}

/// Maximum 15-minute units billable inside one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCapacity {
    pub block: TimeBlock,
    pub units: u32,
}

/// Units used against a block's capacity after allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUsage {
    pub block: TimeBlock,
    pub used: u32,
    pub capacity: u32,
}

impl BlockUsage {
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.used)
    }

    pub fn is_saturated(&self) -> bool {
        self.used >= self.capacity
    }

    pub fn percent_used(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            f64::from(self.used) / f64::from(self.capacity) * 100.0
        }
    }
}
