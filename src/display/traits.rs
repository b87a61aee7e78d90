/*
 *  display/traits.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display sink abstraction
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

use super::error::SwapError;
use super::framebuffer::Frame;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct SinkCapabilities {
    /// Canvas width in pixels (all chained panels)
    pub width: u32,

    /// Canvas height in pixels
    pub height: u32,

    /// Short name for logs
    pub name: &'static str,

    /// Whether swaps actually wait for vertical sync
    pub vsync: bool,
}

/// Where finished frames go.
///
/// A sink owns the buffer currently on the panel. `swap_on_vsync` takes the
/// newly composed frame, shows it, and hands back the buffer that just left
/// the panel so the caller can draw the next tick into it.
pub trait DisplaySink {
    fn capabilities(&self) -> &SinkCapabilities;

    /// A blank frame matching the panel geometry.
    fn create_frame(&self) -> Frame {
        let caps = self.capabilities();
        Frame::new(caps.width, caps.height)
    }

    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, SwapError>;
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn capabilities(&self) -> &SinkCapabilities {
        (**self).capabilities()
    }

    fn create_frame(&self) -> Frame {
        (**self).create_frame()
    }

    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, SwapError> {
        (**self).swap_on_vsync(frame)
    }
}
