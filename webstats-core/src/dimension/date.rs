// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Date dimension
//!
//! A date value is the start of a calendar period at some granularity,
//! computed in the job's local offset. There is no "all" generalization for
//! dates; keys are built at a single granularity (day).

use crate::error::{StatsError, StatsResult};
use chrono::{Datelike, Days, FixedOffset, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar granularity of a [`DateDimension`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    Year,
    Season,
    Month,
    Week,
    Day,
}

impl DateGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateGranularity::Year => "year",
            DateGranularity::Season => "season",
            DateGranularity::Month => "month",
            DateGranularity::Week => "week",
            DateGranularity::Day => "day",
        }
    }
}

impl fmt::Display for DateGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateDimension {
    /// First day of the period
    start: NaiveDate,
    granularity: DateGranularity,
}

impl DateDimension {
    /// Period containing `ms` (epoch millis) at the given granularity, with
    /// calendar boundaries taken in `offset`.
    pub fn build(ms: i64, granularity: DateGranularity, offset: FixedOffset) -> StatsResult<Self> {
        let local = offset
            .timestamp_millis_opt(ms)
            .single()
            .ok_or(StatsError::InvalidTimestamp(ms))?;
        Self::for_date(local.date_naive(), granularity).ok_or(StatsError::InvalidTimestamp(ms))
    }

    /// Day-granularity shorthand used by every stats key
    pub fn day(ms: i64, offset: FixedOffset) -> StatsResult<Self> {
        Self::build(ms, DateGranularity::Day, offset)
    }

    /// Period containing a calendar date
    pub fn for_date(date: NaiveDate, granularity: DateGranularity) -> Option<Self> {
        let start = match granularity {
            DateGranularity::Day => date,
            DateGranularity::Week => {
                let back = u64::from(date.weekday().num_days_from_monday());
                date.checked_sub_days(Days::new(back))?
            }
            DateGranularity::Month => date.with_day(1)?,
            DateGranularity::Season => {
                let first_month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), first_month, 1)?
            }
            DateGranularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?,
        };
        Some(Self { start, granularity })
    }

    pub fn granularity(&self) -> DateGranularity {
        self.granularity
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// Quarter of the year, 1..=4
    pub fn season(&self) -> u32 {
        self.start.month0() / 3 + 1
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }

    /// ISO week number
    pub fn week(&self) -> u32 {
        self.start.iso_week().week()
    }

    pub fn day_of_month(&self) -> u32 {
        self.start.day()
    }

    /// e.g. `day:2017-07-14`
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.granularity, self.start.format("%Y-%m-%d"))
    }
}

impl fmt::Display for DateDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Hour of day (0..=23) of `ms` in `offset`
pub fn hour_of(ms: i64, offset: FixedOffset) -> StatsResult<usize> {
    offset
        .timestamp_millis_opt(ms)
        .single()
        .map(|local| local.hour() as usize)
        .ok_or(StatsError::InvalidTimestamp(ms))
}
