/*
 *  icons.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Weather icon catalogue: PNG assets with procedural fallbacks
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
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, Polyline, PrimitiveStyle, Rectangle},
};
use log::{debug, warn};
use thiserror::Error;

use crate::classify::WeatherCategory;
use crate::clock::DayPhase;
use crate::display::framebuffer::Frame;

/// Icons are square, this many pixels on a side.
pub const ICON_SIZE: u32 = 32;

/// Alpha must exceed this for a source pixel to be copied.
pub const ALPHA_THRESHOLD: u8 = 128;

const SIDE: usize = ICON_SIZE as usize;

#[derive(Debug, Error)]
pub enum IconError {
    #[error("cannot read icon {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("RGBA buffer too short for {width}x{height}: {len} bytes")]
    Truncated { width: u32, height: u32, len: usize },
}

/// A 32x32 RGB bitmap. Black is the transparency sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pixels: Vec<Rgb888>,
}

impl Default for Icon {
    fn default() -> Self {
        Self { pixels: vec![Rgb888::BLACK; SIDE * SIDE] }
    }
}

impl Icon {
    /// Copy an RGBA image into a fresh icon.
    ///
    /// Anything beyond 32x32 is cropped, a smaller source leaves the rest
    /// transparent, and only pixels with alpha above [`ALPHA_THRESHOLD`]
    /// are taken.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Icon, IconError> {
        let needed = width as usize * height as usize * 4;
        if rgba.len() < needed {
            return Err(IconError::Truncated { width, height, len: rgba.len() });
        }

        let mut icon = Icon::default();
        let (cw, ch) = (width.min(ICON_SIZE) as usize, height.min(ICON_SIZE) as usize);
        for y in 0..ch {
            for x in 0..cw {
                let o = (y * width as usize + x) * 4;
                let px = &rgba[o..o + 4];
                if px[3] > ALPHA_THRESHOLD {
                    icon.pixels[y * SIDE + x] = Rgb888::new(px[0], px[1], px[2]);
                }
            }
        }
        Ok(icon)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x < ICON_SIZE && y < ICON_SIZE {
            Some(self.pixels[y as usize * SIDE + x as usize])
        } else {
            None
        }
    }

    /// Pixels that will actually be drawn.
    pub fn opaque_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&c| c != Rgb888::BLACK).count()
    }

    /// Blit onto `frame` with its top-left at `origin`; black is skipped.
    pub fn draw(&self, frame: &mut Frame, origin: Point) {
        for (i, &c) in self.pixels.iter().enumerate() {
            if c == Rgb888::BLACK {
                continue;
            }
            let (x, y) = ((i % SIDE) as i32, (i / SIDE) as i32);
            frame.set_pixel(origin.x + x, origin.y + y, c);
        }
    }
}

// Icons are their own draw target so placeholders can use e-g primitives.
impl OriginDimensions for Icon {
    fn size(&self) -> Size {
        Size::new(ICON_SIZE, ICON_SIZE)
    }
}

impl DrawTarget for Icon {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if (0..SIDE as i32).contains(&p.x) && (0..SIDE as i32).contains(&p.y) {
                self.pixels[p.y as usize * SIDE + p.x as usize] = c;
            }
        }
        Ok(())
    }
}

/// Decode an image file into (width, height, RGBA bytes).
pub fn decode_rgba(path: &Path) -> Result<(u32, u32, Vec<u8>), IconError> {
    let img = image::open(path)
        .map_err(|source| IconError::Decode { path: path.to_path_buf(), source })?
        .to_rgba8();
    let (w, h) = img.dimensions();
    Ok((w, h, img.into_raw()))
}

/// Asset file stem for a catalogue slot.
pub fn asset_name(category: WeatherCategory, phase: DayPhase) -> &'static str {
    use WeatherCategory::*;
    let night = phase == DayPhase::Night;
    match category {
        Clear if night => "moon",
        Clear => "sun",
        PartlyCloudy if night => "light_cloud_night",
        PartlyCloudy => "light_cloud",
        Cloudy if night => "cloud_night",
        Cloudy => "cloud",
        Thunder => "thunder",
        Drizzle => "drizzle",
        Rain => "rain",
        Haze => "haze",
        Ash => "ash",
        Smoke => "smoke",
        Snow => "snow",
        FogOrMist => "fog",
        Unknown => "friend",
    }
}

/// Try `dir/<asset>.png`, fall back to a drawn placeholder.
pub fn load_or_synthesize(dir: &Path, category: WeatherCategory, phase: DayPhase) -> Icon {
    let path = dir.join(format!("{}.png", asset_name(category, phase)));
    match decode_rgba(&path).and_then(|(w, h, rgba)| Icon::from_rgba(w, h, &rgba)) {
        Ok(icon) => {
            debug!("loaded icon {}", path.display());
            icon
        }
        Err(e) => {
            warn!("{e}, using placeholder");
            synthesize(category, phase)
        }
    }
}

/// Owned icon catalogue, one entry per category and day phase variant.
#[derive(Debug, Clone)]
pub struct IconStore {
    icons: HashMap<(WeatherCategory, DayPhase), Icon>,
    fallback: Icon,
}

impl IconStore {
    /// Load every asset from `dir`, synthesizing whatever is missing.
    pub fn load(dir: &Path) -> Self {
        Self::build(|category, phase| load_or_synthesize(dir, category, phase))
    }

    /// Placeholders only, never touches the filesystem.
    pub fn synthesized() -> Self {
        Self::build(synthesize)
    }

    fn build(mut make: impl FnMut(WeatherCategory, DayPhase) -> Icon) -> Self {
        let mut icons = HashMap::new();
        for category in WeatherCategory::ALL {
            icons.insert((category, DayPhase::Day), make(category, DayPhase::Day));
            if category.has_night_variant() {
                icons.insert((category, DayPhase::Night), make(category, DayPhase::Night));
            }
        }
        Self { icons, fallback: synthesize(WeatherCategory::Unknown, DayPhase::Day) }
    }

    /// Icon for a category; categories without a night variant share one.
    pub fn icon(&self, category: WeatherCategory, phase: DayPhase) -> &Icon {
        let phase = if category.has_night_variant() { phase } else { DayPhase::Day };
        self.icons.get(&(category, phase)).unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

// placeholder palette, nothing here may be pure black
const SUN_OUTER: Rgb888 = Rgb888::new(255, 165, 0);
const SUN_INNER: Rgb888 = Rgb888::new(255, 220, 40);
const MOON: Rgb888 = Rgb888::new(220, 220, 180);
const CLOUD_DAY: Rgb888 = Rgb888::new(200, 200, 210);
const CLOUD_NIGHT: Rgb888 = Rgb888::new(110, 110, 140);
const CLOUD_STORM: Rgb888 = Rgb888::new(90, 90, 100);
const RAIN: Rgb888 = Rgb888::new(60, 120, 255);
const BOLT: Rgb888 = Rgb888::new(255, 230, 0);
const SNOW: Rgb888 = Rgb888::new(240, 240, 255);
const RING: Rgb888 = Rgb888::new(0, 200, 255);

fn fill(color: Rgb888) -> PrimitiveStyle<Rgb888> {
    PrimitiveStyle::with_fill(color)
}

fn paint<D>(icon: &mut Icon, item: D)
where
    D: Drawable<Color = Rgb888>,
{
    let Ok(_) = item.draw(icon);
}

fn sun(icon: &mut Icon, center: Point, diameter: u32) {
    paint(icon, Circle::with_center(center, diameter).into_styled(fill(SUN_OUTER)));
    paint(icon, Circle::with_center(center, diameter * 2 / 3).into_styled(fill(SUN_INNER)));
}

fn moon(icon: &mut Icon, center: Point, diameter: u32) {
    paint(icon, Circle::with_center(center, diameter).into_styled(fill(MOON)));
    // bite out a crescent with the sentinel colour
    let bite = center + Point::new(diameter as i32 / 4, -(diameter as i32) / 5);
    paint(icon, Circle::with_center(bite, diameter * 4 / 5).into_styled(fill(Rgb888::BLACK)));
}

fn cloud(icon: &mut Icon, color: Rgb888, dy: i32) {
    let style = fill(color);
    paint(icon, Circle::with_center(Point::new(10, 18 + dy), 12).into_styled(style));
    paint(icon, Circle::with_center(Point::new(18, 13 + dy), 14).into_styled(style));
    paint(icon, Circle::with_center(Point::new(24, 18 + dy), 11).into_styled(style));
    paint(icon, Rectangle::new(Point::new(6, 18 + dy), Size::new(22, 6)).into_styled(style));
}

fn bands(icon: &mut Icon, color: Rgb888) {
    for (i, y) in [6, 12, 18, 24].into_iter().enumerate() {
        let x = if i % 2 == 0 { 3 } else { 7 };
        paint(icon, Rectangle::new(Point::new(x, y), Size::new(22, 3)).into_styled(fill(color)));
    }
}

/// Procedural stand-in for a missing asset.
pub fn synthesize(category: WeatherCategory, phase: DayPhase) -> Icon {
    use WeatherCategory::*;
    let mut icon = Icon::default();
    let night = phase == DayPhase::Night;
    let centre = Point::new(16, 16);

    match category {
        Clear if night => moon(&mut icon, centre, 24),
        Clear => sun(&mut icon, centre, 24),
        PartlyCloudy => {
            if night {
                moon(&mut icon, Point::new(10, 9), 14);
            } else {
                sun(&mut icon, Point::new(10, 9), 14);
            }
            cloud(&mut icon, if night { CLOUD_NIGHT } else { CLOUD_DAY }, 4);
        }
        Cloudy => cloud(&mut icon, if night { CLOUD_NIGHT } else { CLOUD_DAY }, 0),
        Rain => {
            cloud(&mut icon, CLOUD_DAY, -4);
            let style = PrimitiveStyle::with_stroke(RAIN, 1);
            for x in [9, 15, 21] {
                paint(&mut icon, Line::new(Point::new(x + 2, 24), Point::new(x, 30)).into_styled(style));
            }
        }
        Drizzle => {
            cloud(&mut icon, CLOUD_DAY, -4);
            for (x, y) in [(9, 25), (15, 28), (21, 25), (12, 30), (18, 30)] {
                paint(&mut icon, Rectangle::new(Point::new(x, y), Size::new(1, 2)).into_styled(fill(RAIN)));
            }
        }
        Thunder => {
            cloud(&mut icon, CLOUD_STORM, -4);
            let bolt = [Point::new(17, 21), Point::new(13, 26), Point::new(18, 26), Point::new(14, 31)];
            paint(&mut icon, Polyline::new(&bolt).into_styled(PrimitiveStyle::with_stroke(BOLT, 2)));
        }
        Snow => {
            cloud(&mut icon, CLOUD_DAY, -4);
            for (x, y) in [(9, 25), (16, 27), (23, 25), (12, 30), (20, 30)] {
                paint(&mut icon, Circle::with_center(Point::new(x, y), 3).into_styled(fill(SNOW)));
            }
        }
        FogOrMist => bands(&mut icon, Rgb888::new(180, 180, 180)),
        Haze => bands(&mut icon, Rgb888::new(200, 180, 120)),
        Smoke => bands(&mut icon, Rgb888::new(130, 130, 130)),
        Ash => bands(&mut icon, Rgb888::new(150, 140, 130)),
        Unknown => paint(
            &mut icon,
            Circle::with_center(centre, 24).into_styled(PrimitiveStyle::with_stroke(RING, 3)),
        ),
    }
    icon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
        px.iter().copied().cycle().take((w * h * 4) as usize).collect()
    }

    #[test]
    fn test_clip_large_source() {
        let icon = Icon::from_rgba(40, 48, &rgba(40, 48, [10, 20, 30, 255])).unwrap();
        assert_eq!(icon.opaque_pixels(), 32 * 32);
        assert_eq!(icon.pixel(31, 31), Some(Rgb888::new(10, 20, 30)));
        assert_eq!(icon.pixel(32, 0), None);
    }

    #[test]
    fn test_small_source_leaves_sentinel() {
        let icon = Icon::from_rgba(8, 4, &rgba(8, 4, [200, 0, 0, 255])).unwrap();
        assert_eq!(icon.opaque_pixels(), 32);
        assert_eq!(icon.pixel(7, 3), Some(Rgb888::new(200, 0, 0)));
        assert_eq!(icon.pixel(8, 0), Some(Rgb888::BLACK));
        assert_eq!(icon.pixel(0, 4), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_alpha_threshold() {
        let at = Icon::from_rgba(2, 2, &rgba(2, 2, [50, 60, 70, 128])).unwrap();
        assert_eq!(at.opaque_pixels(), 0);
        let above = Icon::from_rgba(2, 2, &rgba(2, 2, [50, 60, 70, 129])).unwrap();
        assert_eq!(above.opaque_pixels(), 4);
    }

    #[test]
    fn test_truncated_buffer() {
        assert!(matches!(
            Icon::from_rgba(4, 4, &[0u8; 10]),
            Err(IconError::Truncated { .. })
        ));
    }

    #[test]
    fn test_blit_skips_black() {
        let mut src = rgba(2, 1, [0, 0, 0, 255]);
        src[4..8].copy_from_slice(&[9, 9, 9, 255]);
        let icon = Icon::from_rgba(2, 1, &src).unwrap();

        let mut frame = Frame::new(8, 8);
        let red = Rgb888::new(255, 0, 0);
        for y in 0..8 {
            for x in 0..8 {
                frame.set_pixel(x, y, red);
            }
        }
        icon.draw(&mut frame, Point::new(2, 2));
        assert_eq!(frame.pixel(2, 2), Some(red));
        assert_eq!(frame.pixel(3, 2), Some(Rgb888::new(9, 9, 9)));
        assert!(frame.as_slice().iter().all(|&c| c != Rgb888::BLACK));
    }

    #[test]
    fn test_synthesized_catalogue_complete() {
        let store = IconStore::synthesized();
        // 12 categories plus three night variants
        assert_eq!(store.len(), 15);
        for category in WeatherCategory::ALL {
            for phase in [DayPhase::Day, DayPhase::Night] {
                assert!(store.icon(category, phase).opaque_pixels() > 0, "{category:?} {phase:?}");
            }
        }
        assert_ne!(
            store.icon(WeatherCategory::Clear, DayPhase::Day),
            store.icon(WeatherCategory::Clear, DayPhase::Night)
        );
        assert_eq!(
            store.icon(WeatherCategory::Rain, DayPhase::Day),
            store.icon(WeatherCategory::Rain, DayPhase::Night)
        );
    }

    #[test]
    fn test_missing_dir_falls_back() {
        let dir = std::env::temp_dir().join("pixclock-no-such-icons");
        let store = IconStore::load(&dir);
        assert_eq!(
            store.icon(WeatherCategory::Snow, DayPhase::Day),
            &synthesize(WeatherCategory::Snow, DayPhase::Day)
        );
    }

    #[test]
    fn test_load_png_asset() {
        let dir = std::env::temp_dir().join(format!("pixclock-icons-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([10, 20, 30, 255]));
        img.save(dir.join("sun.png")).unwrap();

        let store = IconStore::load(&dir);
        let sun = store.icon(WeatherCategory::Clear, DayPhase::Day);
        assert_eq!(sun.pixel(0, 0), Some(Rgb888::new(10, 20, 30)));
        assert_eq!(sun.opaque_pixels(), 32 * 32);
        // moon.png is absent, so the night slot is synthesized
        assert_eq!(
            store.icon(WeatherCategory::Clear, DayPhase::Night),
            &synthesize(WeatherCategory::Clear, DayPhase::Night)
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_asset_names() {
        assert_eq!(asset_name(WeatherCategory::Clear, DayPhase::Night), "moon");
        assert_eq!(asset_name(WeatherCategory::PartlyCloudy, DayPhase::Day), "light_cloud");
        assert_eq!(asset_name(WeatherCategory::FogOrMist, DayPhase::Night), "fog");
        assert_eq!(asset_name(WeatherCategory::Unknown, DayPhase::Day), "friend");
    }
}
