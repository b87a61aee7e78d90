/*
 *  scheduler.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Refresh scheduler: decides when the static layer is rebuilt and drives
 *  the once-a-tick overlay and swap
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

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use log::{debug, error, info, warn};
use tokio::time::{interval, MissedTickBehavior};

use crate::clock::{ClockLabels, DayPhase, Label};
use crate::display::framebuffer::Frame;
use crate::display::overlay::{ComposeOutcome, OverlayCompositor};
use crate::display::static_layer::StaticLayerBuilder;
use crate::display::traits::DisplaySink;
use crate::weather::{WeatherReading, WeatherSource};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(900);

/// Why the static frame has to be rebuilt, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    FirstRun,
    DateRollover,
    NoUsableData,
    Elapsed,
}

/// What the scheduler remembers between rebuilds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshState {
    pub last_fetch: Option<DateTime<Utc>>,
    pub last_date_label: Label,
    pub last_day_label: Label,
}

impl RefreshState {
    /// First reason the cached frame is stale, or None while it is valid.
    pub fn invalidation(
        &self,
        now: DateTime<Utc>,
        labels: &ClockLabels,
        reading: Option<&WeatherReading>,
        refresh: Duration,
    ) -> Option<Invalidation> {
        let Some(last_fetch) = self.last_fetch else {
            return Some(Invalidation::FirstRun);
        };
        if labels.date != self.last_date_label || labels.day != self.last_day_label {
            return Some(Invalidation::DateRollover);
        }
        if !reading.is_some_and(WeatherReading::has_usable_temperature) {
            return Some(Invalidation::NoUsableData);
        }
        // strictly greater; a clock stepping backwards never counts as elapsed
        match (now - last_fetch).to_std() {
            Ok(elapsed) if elapsed > refresh => Some(Invalidation::Elapsed),
            _ => None,
        }
    }

    /// The fetch time is recorded whether or not the fetch succeeded.
    pub fn record(&mut self, now: DateTime<Utc>, labels: &ClockLabels) {
        self.last_fetch = Some(now);
        self.last_date_label = labels.date;
        self.last_day_label = labels.day;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Time label could not be produced
    ClockUnavailable,
    ComposeFailed,
    SwapFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Presented { rebuilt: bool },
    Skipped(SkipReason),
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::Presented { rebuilt: true } => write!(f, "presented (rebuilt)"),
            TickOutcome::Presented { rebuilt: false } => write!(f, "presented"),
            TickOutcome::Skipped(reason) => write!(f, "skipped: {:?}", reason),
        }
    }
}

/// Owns both frames, the weather source and the sink; one tick at a time.
pub struct RefreshScheduler<S: DisplaySink, W: WeatherSource> {
    sink: S,
    weather: W,
    builder: StaticLayerBuilder,
    overlay: OverlayCompositor,
    refresh: Duration,
    state: RefreshState,
    /// Result of the most recent fetch, good or not
    current: Option<WeatherReading>,
    last_good: Option<WeatherReading>,
    static_frame: Frame,
    working: Option<Frame>,
}

impl<S: DisplaySink, W: WeatherSource> RefreshScheduler<S, W> {
    pub fn new(
        sink: S,
        weather: W,
        builder: StaticLayerBuilder,
        overlay: OverlayCompositor,
        refresh: Duration,
    ) -> Self {
        let static_frame = sink.create_frame();
        let working = Some(sink.create_frame());
        let layout = builder.layout();
        if static_frame.dimensions() != (layout.width, layout.height) {
            warn!(
                "layout is {}x{} but {} sink is {}x{}",
                layout.width, layout.height, sink.capabilities().name,
                static_frame.width(), static_frame.height()
            );
        }
        Self {
            sink,
            weather,
            builder,
            overlay,
            refresh,
            state: RefreshState::default(),
            current: None,
            last_good: None,
            static_frame,
            working,
        }
    }

    pub fn state(&self) -> &RefreshState { &self.state }
    pub fn current_reading(&self) -> Option<&WeatherReading> { self.current.as_ref() }
    pub fn last_good_reading(&self) -> Option<&WeatherReading> { self.last_good.as_ref() }
    pub fn static_frame(&self) -> &Frame { &self.static_frame }
    pub fn sink(&self) -> &S { &self.sink }

    /// One refresh cycle at wall-clock time `now`.
    pub async fn tick<Tz>(&mut self, now: &DateTime<Tz>) -> TickOutcome
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let labels = ClockLabels::from_datetime(now);
        self.tick_with_labels(now, &labels).await
    }

    /// As [`tick`](Self::tick) but with labels already rendered.
    pub async fn tick_with_labels<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
        labels: &ClockLabels,
    ) -> TickOutcome {
        if labels.time.is_empty() {
            warn!("clock label unavailable, skipping tick");
            return TickOutcome::Skipped(SkipReason::ClockUnavailable);
        }

        let now_utc = now.with_timezone(&Utc);
        let reason = self.state.invalidation(now_utc, labels, self.current.as_ref(), self.refresh);
        let rebuilt = match reason {
            Some(reason) => {
                info!("static layer invalidated: {:?}", reason);
                self.rebuild(now_utc, DayPhase::at(now), labels).await;
                true
            }
            None => false,
        };

        self.present(labels.time.as_str(), rebuilt)
    }

    async fn rebuild(&mut self, now: DateTime<Utc>, phase: DayPhase, labels: &ClockLabels) {
        let reading = self.weather.current().await;
        if !reading.is_fault() {
            self.last_good = Some(reading.clone());
        }

        // keep the last known weather up while the provider is failing
        let shown = match (&reading.fault, &self.last_good) {
            (Some(fault), Some(good)) => {
                warn!("weather fetch failed ({:?}: {}), showing last good reading", fault, reading.description);
                good
            }
            _ => &reading,
        };
        let report = self.builder.rebuild(
            Some(&mut self.static_frame),
            shown,
            labels.day.as_str(),
            labels.date.as_str(),
            phase,
        );
        if !report.icon || !report.labels {
            warn!("static layer partially drawn: {:?}", report);
        }

        self.current = Some(reading);
        self.state.record(now, labels);
    }

    fn present(&mut self, time: &str, rebuilt: bool) -> TickOutcome {
        let mut working = match self.working.take() {
            Some(frame) => frame,
            None => {
                warn!("no working frame, allocating one");
                self.sink.create_frame()
            }
        };

        match self.overlay.compose(&self.static_frame, &mut working, time) {
            Ok(ComposeOutcome::Composed) => {}
            Ok(ComposeOutcome::Skipped) => {
                self.working = Some(working);
                return TickOutcome::Skipped(SkipReason::ClockUnavailable);
            }
            Err(e) => {
                error!("overlay compose failed: {}", e);
                // a mismatched buffer would fail forever, start again
                self.working = Some(self.sink.create_frame());
                return TickOutcome::Skipped(SkipReason::ComposeFailed);
            }
        }

        match self.sink.swap_on_vsync(working) {
            Ok(back) => {
                self.working = Some(back);
                debug!("presented {}", time);
                TickOutcome::Presented { rebuilt }
            }
            Err(e) => {
                error!("{}", e);
                self.working = Some(e.frame);
                TickOutcome::Skipped(SkipReason::SwapFailed)
            }
        }
    }

    /// Tick every `period` on local time until `shutdown` resolves.
    pub async fn run<F>(&mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("refresh loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let now = Local::now();
                    let outcome = self.tick(&now).await;
                    debug!("tick {}: {}", now.format("%H:%M:%S"), outcome);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::MockSink;
    use crate::display::layout::{LayoutConfig, PanelGeometry, Theme};
    use crate::display::text::font_by_name;
    use crate::icons::IconStore;
    use crate::weather::{ReadingFault, Units};
    use chrono::{FixedOffset, TimeDelta};
    use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
    use std::collections::VecDeque;

    /// Hands out readings in order, repeating the last one.
    struct Scripted {
        readings: VecDeque<WeatherReading>,
        calls: usize,
    }

    impl Scripted {
        fn new(readings: Vec<WeatherReading>) -> Self {
            Self { readings: readings.into(), calls: 0 }
        }
    }

    impl WeatherSource for Scripted {
        async fn current(&mut self) -> WeatherReading {
            self.calls += 1;
            if self.readings.len() > 1 {
                self.readings.pop_front().unwrap()
            } else {
                self.readings.front().cloned().unwrap()
            }
        }
    }

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2025, 1, d, h, m, s).unwrap()
    }

    fn good(temp: f64) -> WeatherReading {
        WeatherReading::new("few clouds", temp, Units::Imperial)
    }

    fn builder() -> StaticLayerBuilder {
        StaticLayerBuilder::new(
            IconStore::synthesized(),
            font_by_name("6x12").unwrap(),
            LayoutConfig::for_panels(&PanelGeometry::default()),
            Theme::default(),
        )
    }

    fn scheduler(readings: Vec<WeatherReading>) -> (RefreshScheduler<MockSink, Scripted>, MockSink) {
        let sink = MockSink::new(128, 64);
        let layout = LayoutConfig::for_panels(&PanelGeometry::default());
        let overlay = OverlayCompositor::new(font_by_name("10x20").unwrap(), &layout, Rgb888::WHITE);
        let observer = sink.clone();
        let s = RefreshScheduler::new(sink, Scripted::new(readings), builder(), overlay, DEFAULT_REFRESH_INTERVAL);
        (s, observer)
    }

    fn fetched_at(t: DateTime<FixedOffset>) -> (RefreshState, ClockLabels) {
        let labels = ClockLabels::from_datetime(&t);
        let mut state = RefreshState::default();
        state.record(t.with_timezone(&Utc), &labels);
        (state, labels)
    }

    #[test]
    fn test_first_run_invalidates() {
        let t = at(1, 12, 0, 0);
        let labels = ClockLabels::from_datetime(&t);
        let reading = good(70.0);
        assert_eq!(
            RefreshState::default().invalidation(t.with_timezone(&Utc), &labels, Some(&reading), DEFAULT_REFRESH_INTERVAL),
            Some(Invalidation::FirstRun)
        );
    }

    #[test]
    fn test_elapsed_boundary() {
        let t0 = at(1, 12, 0, 0);
        let (state, labels) = fetched_at(t0);
        let reading = good(70.0);
        let check = |secs: i64| {
            let now = t0.with_timezone(&Utc) + TimeDelta::seconds(secs);
            state.invalidation(now, &labels, Some(&reading), DEFAULT_REFRESH_INTERVAL)
        };
        assert_eq!(check(899), None);
        assert_eq!(check(900), None);
        assert_eq!(check(901), Some(Invalidation::Elapsed));
    }

    #[test]
    fn test_date_rollover_invalidates() {
        let (state, _) = fetched_at(at(1, 23, 59, 0));
        let after = at(2, 0, 0, 1);
        let labels = ClockLabels::from_datetime(&after);
        assert_eq!(labels.date.as_str(), "01/02/25");
        let reading = good(70.0);
        // well inside the refresh interval
        assert_eq!(
            state.invalidation(after.with_timezone(&Utc), &labels, Some(&reading), DEFAULT_REFRESH_INTERVAL),
            Some(Invalidation::DateRollover)
        );
    }

    #[test]
    fn test_unusable_reading_invalidates() {
        let t0 = at(1, 12, 0, 0);
        let (state, labels) = fetched_at(t0);
        let now = t0.with_timezone(&Utc) + TimeDelta::seconds(1);
        let bad = WeatherReading::no_data(Units::Imperial);
        assert_eq!(
            state.invalidation(now, &labels, Some(&bad), DEFAULT_REFRESH_INTERVAL),
            Some(Invalidation::NoUsableData)
        );
        assert_eq!(
            state.invalidation(now, &labels, None, DEFAULT_REFRESH_INTERVAL),
            Some(Invalidation::NoUsableData)
        );
    }

    #[tokio::test]
    async fn test_first_tick_rebuilds_then_caches() {
        let (mut s, sink) = scheduler(vec![good(71.0)]);
        assert_eq!(s.tick(&at(1, 12, 0, 0)).await, TickOutcome::Presented { rebuilt: true });
        assert_eq!(s.tick(&at(1, 12, 0, 1)).await, TickOutcome::Presented { rebuilt: false });
        assert_eq!(s.tick(&at(1, 12, 15, 0)).await, TickOutcome::Presented { rebuilt: false });
        assert_eq!(s.tick(&at(1, 12, 15, 1)).await, TickOutcome::Presented { rebuilt: true });
        assert_eq!(s.weather.calls, 2);
        assert_eq!(sink.swap_count(), 4);
    }

    #[tokio::test]
    async fn test_cached_ticks_only_change_the_clock() {
        let (mut s, sink) = scheduler(vec![good(71.0)]);
        s.tick(&at(1, 12, 0, 0)).await;
        let static_before = s.static_frame().clone();
        s.tick(&at(1, 12, 0, 1)).await;
        assert_eq!(s.static_frame(), &static_before);

        // everything below the clock row matches the static frame exactly
        let shown = sink.shown().unwrap();
        for y in 24..64 {
            for x in 0..128 {
                assert_eq!(shown.pixel(x, y), static_before.pixel(x, y));
            }
        }
    }

    #[tokio::test]
    async fn test_empty_time_label_skips_swap() {
        let (mut s, sink) = scheduler(vec![good(71.0)]);
        let labels = ClockLabels::from_parts("", "01/01/25", "Wednesday");
        let outcome = s.tick_with_labels(&at(1, 12, 0, 0), &labels).await;
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::ClockUnavailable));
        assert_eq!(sink.swap_count(), 0);
        // retried next cycle
        assert!(matches!(s.tick(&at(1, 12, 0, 1)).await, TickOutcome::Presented { .. }));
        assert_eq!(sink.swap_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_good_weather() {
        let t0 = at(1, 12, 0, 0);
        let (mut s, _sink) = scheduler(vec![good(71.0), WeatherReading::parse_error(Units::Imperial)]);
        s.tick(&t0).await;

        let mut expected = Frame::new(128, 64);
        let labels = ClockLabels::from_datetime(&t0);
        builder().rebuild(Some(&mut expected), &good(71.0), &labels.day, &labels.date, DayPhase::Day);
        assert_eq!(s.static_frame(), &expected);

        // second fetch fails
        let t1 = at(1, 12, 15, 1);
        assert_eq!(s.tick(&t1).await, TickOutcome::Presented { rebuilt: true });
        assert_eq!(s.current_reading().unwrap().fault, Some(ReadingFault::ParseError));
        assert_eq!(s.last_good_reading(), Some(&good(71.0)));
        assert_eq!(s.static_frame(), &expected);

        // still no usable data, so the next tick tries again
        assert_eq!(s.tick(&at(1, 12, 15, 2)).await, TickOutcome::Presented { rebuilt: true });
        assert_eq!(s.weather.calls, 3);
    }

    #[tokio::test]
    async fn test_no_data_from_start_retries_each_tick() {
        let (mut s, sink) = scheduler(vec![WeatherReading::no_data(Units::Imperial)]);
        for sec in 0..3 {
            assert_eq!(s.tick(&at(1, 12, 0, sec)).await, TickOutcome::Presented { rebuilt: true });
        }
        assert_eq!(s.weather.calls, 3);
        assert_eq!(sink.swap_count(), 3);
        assert!(s.last_good_reading().is_none());
    }

    #[tokio::test]
    async fn test_swap_failure_recovers() {
        let (mut s, sink) = scheduler(vec![good(50.0)]);
        sink.fail_next_swap();
        assert_eq!(s.tick(&at(1, 8, 0, 0)).await, TickOutcome::Skipped(SkipReason::SwapFailed));
        assert_eq!(s.tick(&at(1, 8, 0, 1)).await, TickOutcome::Presented { rebuilt: false });
        assert_eq!(sink.swap_count(), 1);
    }

    #[tokio::test]
    async fn test_record_happens_on_failure_too() {
        let t0 = at(1, 12, 0, 0);
        let (mut s, _sink) = scheduler(vec![WeatherReading::no_data(Units::Imperial)]);
        s.tick(&t0).await;
        assert_eq!(s.state().last_fetch, Some(t0.with_timezone(&Utc)));
        assert_eq!(s.state().last_date_label.as_str(), "01/01/25");
    }

    #[tokio::test]
    async fn test_shown_frame_has_clock() {
        let (mut s, sink) = scheduler(vec![good(71.0)]);
        s.tick(&at(1, 12, 0, 0)).await;
        let shown = sink.shown().unwrap();
        let clock_lit = (0..24).flat_map(|y| (0..128).map(move |x| (x, y)))
            .filter(|&(x, y)| shown.pixel(x, y) == Some(Rgb888::WHITE))
            .count();
        assert!(clock_lit > 0);
        assert_eq!(s.static_frame().pixel(64, 10), Some(Rgb888::BLACK));
    }
}
