/*
 *  display/drivers/mock.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory sink for tests and headless runs
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

use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::error::{DisplayError, SwapError};
use crate::display::framebuffer::Frame;
use crate::display::traits::{DisplaySink, SinkCapabilities};

/// Mock display sink
///
/// Keeps the "on panel" frame in memory and records every swap. Clones
/// share state, so a test can hand one clone to the scheduler and inspect
/// the other.
#[derive(Debug, Clone)]
pub struct MockSink {
    capabilities: SinkCapabilities,
    state: Arc<Mutex<MockSinkState>>,
}

/// Internal state for the mock sink (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockSinkState {
    /// Successful swaps
    pub swap_count: usize,

    /// Failed swaps
    pub failed_swaps: usize,

    /// Frame currently on the panel
    pub shown: Option<Frame>,

    /// Fail the next swap (for error testing)
    pub simulate_swap_failure: bool,
}

impl MockSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: SinkCapabilities { width, height, name: "mock", vsync: false },
            state: Arc::new(Mutex::new(MockSinkState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockSinkState> {
        // a panicking test must not take every later assertion down with it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn swap_count(&self) -> usize {
        self.lock().swap_count
    }

    pub fn failed_swaps(&self) -> usize {
        self.lock().failed_swaps
    }

    /// Copy of the frame currently shown.
    pub fn shown(&self) -> Option<Frame> {
        self.lock().shown.clone()
    }

    pub fn fail_next_swap(&self) {
        self.lock().simulate_swap_failure = true;
    }
}

impl DisplaySink for MockSink {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, SwapError> {
        let (w, h) = (self.capabilities.width, self.capabilities.height);
        let mut state = self.lock();

        if state.simulate_swap_failure {
            state.simulate_swap_failure = false;
            state.failed_swaps += 1;
            return Err(SwapError::new(frame, DisplayError::Other("simulated swap failure".into())));
        }
        if frame.dimensions() != (w, h) {
            state.failed_swaps += 1;
            let actual = frame.dimensions();
            return Err(SwapError::new(
                frame,
                DisplayError::BufferSizeMismatch { expected: (w, h), actual },
            ));
        }

        state.swap_count += 1;
        let previous = state.shown.replace(frame).unwrap_or_else(|| Frame::new(w, h));
        Ok(previous)
    }
}
