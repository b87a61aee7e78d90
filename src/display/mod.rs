/*
 *  display/mod.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame composition and display sinks
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuffer;
pub mod factory;

// Text collaborator over embedded-graphics mono fonts
pub mod text;

// Panel geometry and fixed anchors
pub mod layout;

// The two layers
pub mod static_layer;
pub mod overlay;

// Display sinks
pub mod drivers;

// Re-exports for convenience
pub use traits::{DisplaySink, SinkCapabilities};
pub use error::{DisplayError, SwapError};
pub use framebuffer::Frame;
pub use factory::{DisplaySinkFactory, BoxedSink};
pub use layout::{LayoutConfig, PanelGeometry, Theme};
pub use static_layer::{RebuildReport, StaticLayerBuilder};
pub use overlay::{ComposeOutcome, OverlayCompositor};
