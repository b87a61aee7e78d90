/*
 *  display/error.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for frame composition and display sinks
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
use std::error::Error;

use super::framebuffer::Frame;

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// Sink could not be opened or mapped
    InitializationFailed(String),

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Two frames that must match in size do not
    BufferSizeMismatch { expected: (u32, u32), actual: (u32, u32) },

    /// No buffer to draw into
    MissingBuffer,

    /// Drawing operation failed
    DrawingError(String),

    /// Write to the panel failed
    Io(std::io::Error),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::InitializationFailed(msg) =>
                write!(f, "Display initialization failed: {}", msg),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
            DisplayError::BufferSizeMismatch { expected, actual } =>
                write!(f, "Buffer size mismatch: expected {}x{}, got {}x{}",
                    expected.0, expected.1, actual.0, actual.1),
            DisplayError::MissingBuffer =>
                write!(f, "No destination buffer"),
            DisplayError::DrawingError(msg) =>
                write!(f, "Drawing error: {}", msg),
            DisplayError::Io(err) =>
                write!(f, "Display I/O error: {}", err),
            DisplayError::Other(msg) =>
                write!(f, "{}", msg),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DisplayError {
    fn from(err: std::io::Error) -> Self {
        DisplayError::Io(err)
    }
}

/// A failed swap hands the frame back so the caller keeps its scratch buffer.
#[derive(Debug, thiserror::Error)]
#[error("frame swap failed: {source}")]
pub struct SwapError {
    pub frame: Frame,
    #[source]
    pub source: DisplayError,
}

impl SwapError {
    pub fn new(frame: Frame, source: DisplayError) -> Self {
        Self { frame, source }
    }
}
