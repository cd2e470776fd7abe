//! Timer-set reminder policy.
//!
//! A timer set can ask to be announced at a date/time, optionally repeating.
//! The policy is pure data; [`NotificationPolicy::triggers`] turns it into
//! [`StartTrigger`]s that a notification scheduler can arm.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: u64 = 86_400;

/// Unit for interval-style repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatUnit {
    Minute,
    Hour,
    Day,
    Week,
    /// 365 days; leap years are ignored.
    Year,
}

impl RepeatUnit {
    /// Length of one unit in seconds.
    #[must_use]
    pub fn seconds(&self) -> u64 {
        match self {
            RepeatUnit::Minute => 60,
            RepeatUnit::Hour => 3600,
            RepeatUnit::Day => SECONDS_PER_DAY,
            RepeatUnit::Week => 7 * SECONDS_PER_DAY,
            RepeatUnit::Year => 365 * SECONDS_PER_DAY,
        }
    }
}

/// How a reminder repeats.
///
/// Weekdays are numbered from Sunday (0) to Saturday (6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RepeatRule {
    /// Every `every` units.
    Interval { every: u32, unit: RepeatUnit },
    /// On the given weekdays, every `interval_weeks` weeks.
    Weekday {
        weekdays: Vec<u8>,
        #[serde(rename = "intervalWeeks")]
        interval_weeks: u32,
    },
    /// On the `nth_week`-th `weekday` of every month.
    Monthly {
        #[serde(rename = "nthWeek")]
        nth_week: u8,
        weekday: u8,
    },
}

/// Reminder policy attached to a timer set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPolicy {
    /// Whether reminders and end-of-timer alerts are enabled for the set.
    #[serde(default)]
    pub enabled: bool,
    /// Base date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Base time of day (`HH:MM`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatRule>,
    /// Identifiers of reminders currently armed for this set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

impl NotificationPolicy {
    /// Creates an enabled policy with no reminder schedule.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Expands the policy into concrete triggers relative to `now`.
    ///
    /// A one-shot reminder needs both a date and a time and is dropped when
    /// it lies in the past.
    #[must_use]
    pub fn triggers(&self, now: NaiveDateTime) -> Vec<StartTrigger> {
        if !self.enabled {
            return Vec::new();
        }
        let time = self.time.unwrap_or(NaiveTime::MIN);
        let (hour, minute) = (time.hour(), time.minute());

        match &self.repeat {
            None => match (self.date, self.time) {
                (Some(date), Some(time)) => {
                    let at = date.and_time(time);
                    if at > now {
                        vec![StartTrigger::Once { at }]
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            },
            Some(RepeatRule::Interval { every, unit }) => {
                let seconds = u64::from(*every) * unit.seconds();
                if seconds == 0 {
                    Vec::new()
                } else {
                    vec![StartTrigger::Every { seconds }]
                }
            }
            Some(RepeatRule::Weekday {
                weekdays,
                interval_weeks,
            }) => weekdays
                .iter()
                .filter_map(|&wd| weekday_from_sunday(wd))
                .map(|weekday| {
                    if *interval_weeks <= 1 {
                        StartTrigger::Weekly {
                            weekday,
                            hour,
                            minute,
                        }
                    } else {
                        StartTrigger::Every {
                            seconds: u64::from(*interval_weeks) * 7 * SECONDS_PER_DAY,
                        }
                    }
                })
                .collect(),
            Some(RepeatRule::Monthly { nth_week, weekday }) => weekday_from_sunday(*weekday)
                .map(|weekday| StartTrigger::MonthlyNth {
                    nth_week: *nth_week,
                    weekday,
                    hour,
                    minute,
                })
                .into_iter()
                .collect(),
        }
    }
}

/// A concrete reminder trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTrigger {
    /// Fires once at a fixed local date/time.
    Once { at: NaiveDateTime },
    /// Fires repeatedly every `seconds`.
    Every { seconds: u64 },
    /// Fires weekly on `weekday` at `hour:minute`.
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
    /// Fires on the `nth_week`-th `weekday` of each month at `hour:minute`.
    MonthlyNth {
        nth_week: u8,
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

impl StartTrigger {
    /// Returns true if the trigger keeps firing after the first occurrence.
    #[must_use]
    pub fn repeats(&self) -> bool {
        !matches!(self, StartTrigger::Once { .. })
    }

    /// Computes the next occurrence strictly after `now`.
    #[must_use]
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            StartTrigger::Once { at } => (*at > now).then_some(*at),
            StartTrigger::Every { seconds } => {
                let seconds = i64::try_from((*seconds).max(1)).ok()?;
                now.checked_add_signed(Duration::seconds(seconds))
            }
            StartTrigger::Weekly {
                weekday,
                hour,
                minute,
            } => (0..=7).find_map(|offset| {
                let date = now.date().checked_add_signed(Duration::days(offset))?;
                if date.weekday() != *weekday {
                    return None;
                }
                let candidate = date.and_hms_opt(*hour, *minute, 0)?;
                (candidate > now).then_some(candidate)
            }),
            StartTrigger::MonthlyNth {
                nth_week,
                weekday,
                hour,
                minute,
            } => {
                let (mut year, mut month) = (now.year(), now.month());
                // Some months have no fifth occurrence; look a year ahead at most.
                for _ in 0..13 {
                    if let Some(date) = nth_weekday_of_month(year, month, *weekday, *nth_week) {
                        if let Some(candidate) = date.and_hms_opt(*hour, *minute, 0) {
                            if candidate > now {
                                return Some(candidate);
                            }
                        }
                    }
                    if month == 12 {
                        year += 1;
                        month = 1;
                    } else {
                        month += 1;
                    }
                }
                None
            }
        }
    }
}

/// Maps a Sunday-based weekday number (0-6) to a [`Weekday`].
#[must_use]
pub fn weekday_from_sunday(n: u8) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, nth: u8) -> Option<NaiveDate> {
    if nth == 0 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (7 + weekday.num_days_from_sunday() - first.weekday().num_days_from_sunday()) % 7;
    let day = 1 + offset + (u32::from(nth) - 1) * 7;
    NaiveDate::from_ymd_opt(year, month, day)
}
