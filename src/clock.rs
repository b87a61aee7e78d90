/*
 *  clock.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Local time labels and day phase
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use arrayvec::ArrayString;
use chrono::{DateTime, TimeZone, Timelike};
use std::fmt::{self, Write};

pub const TIME_FORMAT: &str = "%-I:%M:%S";
pub const DATE_FORMAT: &str = "%m/%d/%y";
pub const DAY_FORMAT: &str = "%A";

/// Label storage, no heap on the per-tick path.
pub type Label = ArrayString<24>;

/// Day or night, used to pick icon variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    /// Night runs from 18:00 up to 06:00 local.
    pub fn from_hour(hour: u32) -> Self {
        if hour < 6 || hour >= 18 {
            DayPhase::Night
        } else {
            DayPhase::Day
        }
    }

    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self::from_hour(now.hour())
    }
}

/// The three strings rendered from the wall clock each tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockLabels {
    /// e.g. "9:05:07"
    pub time: Label,
    /// e.g. "01/02/25"
    pub date: Label,
    /// e.g. "Thursday"
    pub day: Label,
}

impl ClockLabels {
    pub fn from_datetime<Tz>(now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            time: render(now, TIME_FORMAT),
            date: render(now, DATE_FORMAT),
            day: render(now, DAY_FORMAT),
        }
    }

    /// Build from plain strings; anything that does not fit is left empty.
    pub fn from_parts(time: &str, date: &str, day: &str) -> Self {
        Self {
            time: Label::from(time).unwrap_or_default(),
            date: Label::from(date).unwrap_or_default(),
            day: Label::from(day).unwrap_or_default(),
        }
    }
}

// A formatting failure yields an empty label, which callers treat as a
// clock read failure.
fn render<Tz>(now: &DateTime<Tz>, fmt: &str) -> Label
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = Label::new();
    if write!(out, "{}", now.format(fmt)).is_err() {
        out.clear();
    }
    out
}
