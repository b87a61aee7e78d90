/*
 *  lib.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library root: the refresh engine and its collaborators
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

pub mod classify;
pub mod clock;
pub mod config;
pub mod display;
pub mod geoloc;
pub mod icons;
pub mod location;
pub mod scheduler;
pub mod weather;

pub use classify::{classify, color_for_temperature, WeatherCategory};
pub use clock::{ClockLabels, DayPhase};
pub use icons::{Icon, IconStore};
pub use scheduler::{Invalidation, RefreshScheduler, RefreshState, SkipReason, TickOutcome};
pub use weather::{WeatherReading, WeatherSource, ReadingFault, Units};
