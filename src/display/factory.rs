/*
 *  display/factory.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds the configured display sink
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

use crate::config::SinkConfig;
use crate::display::drivers::{FramebufferSink, MockSink, SnapshotSink};
use crate::display::error::DisplayError;
use crate::display::layout::PanelGeometry;
use crate::display::traits::DisplaySink;
use log::{info, warn};

/// Type alias for boxed display sink trait objects
pub type BoxedSink = Box<dyn DisplaySink>;

/// Factory for creating display sinks from configuration
pub struct DisplaySinkFactory;

impl DisplaySinkFactory {
    /// Create the sink named by `config`, sized for the whole panel chain.
    pub fn create_from_config(
        config: &SinkConfig,
        geometry: &PanelGeometry,
    ) -> Result<BoxedSink, DisplayError> {
        if geometry.rows == 0 || geometry.cols == 0 || geometry.chain == 0 {
            return Err(DisplayError::InvalidConfiguration(format!(
                "panel geometry {}x{} chain {} is empty",
                geometry.cols, geometry.rows, geometry.chain
            )));
        }
        if geometry.chain < 2 {
            warn!("single panel chain: the calendar column falls off the right edge");
        }

        let (width, height) = (geometry.width(), geometry.height());
        let sink: BoxedSink = match config {
            SinkConfig::Framebuffer { device, bits_per_pixel, line_length } => {
                Box::new(FramebufferSink::open(device, width, height, *bits_per_pixel, *line_length)?)
            }
            SinkConfig::Snapshot { path } => Box::new(SnapshotSink::new(path, width, height)?),
            SinkConfig::Mock => Box::new(MockSink::new(width, height)),
        };

        let caps = sink.capabilities();
        info!("display sink {} {}x{} vsync={}", caps.name, caps.width, caps.height, caps.vsync);
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sink_from_config() {
        let sink = DisplaySinkFactory::create_from_config(&SinkConfig::Mock, &PanelGeometry::default()).unwrap();
        assert_eq!(sink.capabilities().name, "mock");
        assert_eq!(sink.create_frame().dimensions(), (128, 64));
    }

    #[test]
    fn test_zero_geometry_rejected() {
        let geometry = PanelGeometry { rows: 0, cols: 64, chain: 2 };
        assert!(matches!(
            DisplaySinkFactory::create_from_config(&SinkConfig::Mock, &geometry),
            Err(DisplayError::InvalidConfiguration(_))
        ));
    }
}
