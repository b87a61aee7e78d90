/*
 *  display/framebuffer.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized RGB frame used for the static and working layers
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use super::error::DisplayError;

/// A full-panel RGB pixel buffer, row-major, origin top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<Rgb888>,
    w: usize,
    h: usize,
}

impl Frame {
    /// New frame, all pixels black.
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![Rgb888::BLACK; w * h], w, h }
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }
    pub fn dimensions(&self) -> (u32, u32) { (self.w as u32, self.h as u32) }

    /// Immutable raw access
    pub fn as_slice(&self) -> &[Rgb888] { &self.buf }

    /// Reset every pixel to black.
    pub fn blank(&mut self) {
        self.buf.fill(Rgb888::BLACK);
    }

    /// Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb888) {
        if let Some(i) = self.idx(Point::new(x, y)) {
            self.buf[i] = color;
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        self.idx(Point::new(x, y)).map(|i| self.buf[i])
    }

    /// Overwrite this frame with the contents of `src`.
    pub fn copy_from(&mut self, src: &Frame) -> Result<(), DisplayError> {
        if src.w != self.w || src.h != self.h {
            return Err(DisplayError::BufferSizeMismatch {
                expected: self.dimensions(),
                actual: src.dimensions(),
            });
        }
        self.buf.copy_from_slice(&src.buf);
        Ok(())
    }

    /// Packed RGB bytes, three per pixel.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buf.len() * 3);
        for c in &self.buf {
            out.extend_from_slice(&[c.r(), c.g(), c.b()]);
        }
        out
    }

    /// Number of pixels that are not black.
    pub fn lit_pixels(&self) -> usize {
        self.buf.iter().filter(|&&c| c != Rgb888::BLACK).count()
    }

    /// Lit pixels inside a rectangle.
    pub fn lit_pixels_in(&self, area: &Rectangle) -> usize {
        area.points()
            .filter_map(|p| self.idx(p))
            .filter(|&i| self.buf[i] != Rgb888::BLACK)
            .count()
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // clip per point, glyph boxes often hang off the panel edge
        for (p, c) in area.points().zip(colors) {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }
}
