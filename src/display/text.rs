/*
 *  display/text.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Font lookup plus draw/measure helpers over embedded-graphics mono fonts
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

use embedded_graphics::{
    mono_font::{iso_8859_1 as latin1, MonoFont, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    text::{renderer::TextRenderer, Baseline, Text},
};

use super::framebuffer::Frame;

pub type Font = &'static MonoFont<'static>;

/// Resolve a font name from config ("6x12", "9x18_bold", ...).
///
/// Latin-1 variants are used throughout so the degree sign renders.
pub fn font_by_name(name: &str) -> Option<Font> {
    let font = match name.trim().to_ascii_lowercase().as_str() {
        "4x6" => &latin1::FONT_4X6,
        "5x7" => &latin1::FONT_5X7,
        "5x8" => &latin1::FONT_5X8,
        "6x9" => &latin1::FONT_6X9,
        "6x10" => &latin1::FONT_6X10,
        "6x12" => &latin1::FONT_6X12,
        "6x13" => &latin1::FONT_6X13,
        "6x13_bold" => &latin1::FONT_6X13_BOLD,
        "7x13" => &latin1::FONT_7X13,
        "7x13_bold" => &latin1::FONT_7X13_BOLD,
        "7x14" => &latin1::FONT_7X14,
        "7x14_bold" => &latin1::FONT_7X14_BOLD,
        "8x13" => &latin1::FONT_8X13,
        "8x13_bold" => &latin1::FONT_8X13_BOLD,
        "9x15" => &latin1::FONT_9X15,
        "9x15_bold" => &latin1::FONT_9X15_BOLD,
        "9x18" => &latin1::FONT_9X18,
        "9x18_bold" => &latin1::FONT_9X18_BOLD,
        "10x20" => &latin1::FONT_10X20,
        _ => return None,
    };
    Some(font)
}

/// Draw `text` with its baseline at `y`; returns the advance width in pixels.
pub fn draw_text(frame: &mut Frame, font: Font, x: i32, y: i32, color: Rgb888, text: &str) -> u32 {
    let style = MonoTextStyle::new(font, color);
    match Text::with_baseline(text, Point::new(x, y), style, Baseline::Alphabetic).draw(frame) {
        Ok(next) => (next.x - x).max(0) as u32,
        Err(never) => match never {},
    }
}

/// Advance width of `text` without drawing it.
pub fn measure_width(font: Font, text: &str) -> u32 {
    let style = MonoTextStyle::new(font, Rgb888::WHITE);
    let metrics = style.measure_string(text, Point::zero(), Baseline::Alphabetic);
    metrics.next_position.x.max(0) as u32
}

pub fn font_height(font: Font) -> u32 {
    font.character_size.height
}
