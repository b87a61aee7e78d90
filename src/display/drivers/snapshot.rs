/*
 *  display/drivers/snapshot.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Writes every presented frame to a PPM file, for running without a panel
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

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::display::error::{DisplayError, SwapError};
use crate::display::framebuffer::Frame;
use crate::display::traits::{DisplaySink, SinkCapabilities};

/// PPM snapshot sink
///
/// Each swap replaces the file atomically (write to a sibling, then rename)
/// so a viewer polling the path never reads half a frame.
#[derive(Debug)]
pub struct SnapshotSink {
    capabilities: SinkCapabilities,
    path: PathBuf,
    front: Frame,
}

impl SnapshotSink {
    pub fn new(path: &Path, width: u32, height: u32) -> Result<Self, DisplayError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(DisplayError::InitializationFailed(format!(
                    "snapshot directory {} does not exist",
                    parent.display()
                )));
            }
        }
        info!("snapshot sink writing {}x{} frames to {}", width, height, path.display());
        Ok(Self {
            capabilities: SinkCapabilities { width, height, name: "snapshot", vsync: false },
            path: path.to_path_buf(),
            front: Frame::new(width, height),
        })
    }

    fn write_ppm(&self, frame: &Frame) -> io::Result<()> {
        let tmp = self.path.with_extension("ppm.tmp");
        {
            let mut f = io::BufWriter::new(fs::File::create(&tmp)?);
            write!(f, "P6\n{} {}\n255\n", frame.width(), frame.height())?;
            f.write_all(&frame.to_rgb_bytes())?;
            f.flush()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

impl DisplaySink for SnapshotSink {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, SwapError> {
        if let Err(e) = self.write_ppm(&frame) {
            return Err(SwapError::new(frame, e.into()));
        }
        Ok(std::mem::replace(&mut self.front, frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::Rgb888;

    #[test]
    fn test_writes_ppm() {
        let path = std::env::temp_dir().join(format!("pixclock-snap-{}.ppm", std::process::id()));
        let mut sink = SnapshotSink::new(&path, 4, 2).unwrap();
        let mut f = sink.create_frame();
        f.set_pixel(3, 1, Rgb888::new(7, 8, 9));

        let back = sink.swap_on_vsync(f).unwrap();
        assert_eq!(back.lit_pixels(), 0);

        let bytes = fs::read(&path).unwrap();
        let header = b"P6\n4 2\n255\n";
        assert!(bytes.starts_with(header));
        assert_eq!(bytes.len(), header.len() + 4 * 2 * 3);
        assert_eq!(&bytes[bytes.len() - 3..], &[7, 8, 9]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_directory_rejected() {
        let path = Path::new("/nonexistent-pixclock-dir/frame.ppm");
        assert!(matches!(
            SnapshotSink::new(path, 4, 4),
            Err(DisplayError::InitializationFailed(_))
        ));
    }
}
