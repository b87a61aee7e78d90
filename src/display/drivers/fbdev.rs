/*
 *  display/drivers/fbdev.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Linux framebuffer sink (/dev/fbN), memory mapped
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

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::Path;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use log::{debug, info, warn};
use memmap2::{MmapMut, MmapOptions};

use crate::display::error::{DisplayError, SwapError};
use crate::display::framebuffer::Frame;
use crate::display::traits::{DisplaySink, SinkCapabilities};

/// _IOW('F', 0x20, __u32)
const FBIO_WAITFORVSYNC: u64 = 0x4004_4620;
const FBIOGET_VSCREENINFO: u64 = 0x4600;
const FBIOGET_FSCREENINFO: u64 = 0x4602;

/// linux/fb.h `struct fb_var_screeninfo`; only the leading fields are read.
#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct FbVarScreenInfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    // bitfields, timings, sync, vmode, rotate, colorspace, reserved
    rest: [u32; 32],
}

/// linux/fb.h `struct fb_fix_screeninfo`.
#[repr(C)]
#[allow(dead_code)]
struct FbFixScreenInfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

/// What the driver reports about the mode it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenInfo {
    pub xres: u32,
    pub yres: u32,
    pub bits_per_pixel: u32,
    pub line_length: u32,
    pub smem_len: u32,
}

/// Ask the driver for its mode; None when `fd` is not a framebuffer.
fn query_screen(fd: i32) -> Option<ScreenInfo> {
    let mut var = FbVarScreenInfo::default();
    // Safety: zeroed plain-old-data, filled in by the kernel
    let mut fix: FbFixScreenInfo = unsafe { std::mem::zeroed() };
    // Safety: both ioctls write exactly one struct of the matching layout
    let ok = unsafe {
        libc::ioctl(fd, FBIOGET_VSCREENINFO as _, &mut var as *mut FbVarScreenInfo) == 0
            && libc::ioctl(fd, FBIOGET_FSCREENINFO as _, &mut fix as *mut FbFixScreenInfo) == 0
    };
    ok.then(|| ScreenInfo {
        xres: var.xres,
        yres: var.yres,
        bits_per_pixel: var.bits_per_pixel,
        line_length: fix.line_length,
        smem_len: fix.smem_len,
    })
}

/// Bytes per row to use, reconciling config with what the device reports.
///
/// A configured `line_length` wins; otherwise the device stride is used so
/// padded rows do not skew the picture.
pub fn resolve_stride(
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    configured: Option<u32>,
    device: Option<&ScreenInfo>,
) -> Result<usize, DisplayError> {
    let packed = width as usize * (bits_per_pixel as usize / 8);
    let stride = match (configured, device) {
        (Some(l), Some(dev)) if l != dev.line_length => {
            warn!("line_length {} overrides device stride {}", l, dev.line_length);
            l as usize
        }
        (Some(l), _) => l as usize,
        (None, Some(dev)) => dev.line_length as usize,
        (None, None) => packed,
    };
    if stride < packed {
        return Err(DisplayError::InvalidConfiguration(format!(
            "line_length {stride} too short for {width} pixels"
        )));
    }

    if let Some(dev) = device {
        if dev.bits_per_pixel != bits_per_pixel {
            warn!("device is {}bpp, configured for {}bpp", dev.bits_per_pixel, bits_per_pixel);
        }
        if dev.xres < width || dev.yres < height {
            warn!("device mode {}x{} is smaller than the {}x{} canvas", dev.xres, dev.yres, width, height);
        }
        let needed = stride * height as usize;
        if dev.smem_len > 0 && (dev.smem_len as usize) < needed {
            return Err(DisplayError::InvalidConfiguration(format!(
                "framebuffer memory is {} bytes, {}x{} at stride {} needs {}",
                dev.smem_len, width, height, stride, needed
            )));
        }
    }
    Ok(stride)
}

/// RGB565, little endian, as 16bpp framebuffers expect.
#[inline]
pub fn pack_rgb565(c: Rgb888) -> [u8; 2] {
    let v = ((c.r() as u16 & 0xf8) << 8) | ((c.g() as u16 & 0xfc) << 3) | (c.b() as u16 >> 3);
    v.to_le_bytes()
}

/// XRGB8888, byte order B G R X in memory.
#[inline]
pub fn pack_xrgb8888(c: Rgb888) -> [u8; 4] {
    [c.b(), c.g(), c.r(), 0]
}

/// Memory-mapped fbdev sink.
///
/// The panel driver scans the mapping continuously, so a swap waits for
/// vertical blank (when the driver supports it) before copying the frame in.
pub struct FramebufferSink {
    capabilities: SinkCapabilities,
    _file: File,
    mmap: MmapMut,
    fd: i32,
    bits_per_pixel: u32,
    line_length: usize,
    front: Frame,
}

impl FramebufferSink {
    pub fn open(
        device: &Path,
        width: u32,
        height: u32,
        bits_per_pixel: u32,
        line_length: Option<u32>,
    ) -> Result<Self, DisplayError> {
        if !matches!(bits_per_pixel, 16 | 32) {
            return Err(DisplayError::InvalidConfiguration(format!(
                "unsupported framebuffer depth {bits_per_pixel}, expected 16 or 32"
            )));
        }

        let file = OpenOptions::new()
            .read(true).write(true)
            .open(device)
            .map_err(|e| DisplayError::InitializationFailed(format!("{}: {e}", device.display())))?;
        let fd = file.as_raw_fd();

        let screen = query_screen(fd);
        match &screen {
            Some(info) => debug!("{} reports {:?}", device.display(), info),
            None => warn!("{} did not report its mode, trusting configured geometry", device.display()),
        }
        let line_length = resolve_stride(width, height, bits_per_pixel, line_length, screen.as_ref())?;

        let len = line_length * height as usize;
        // Safety: the mapping is only touched through `mmap` and lives as long as `_file`.
        let mmap = unsafe { MmapOptions::new().len(len).map_mut(&file) }
            .map_err(|e| DisplayError::InitializationFailed(format!("mmap {}: {e}", device.display())))?;

        let vsync = wait_for_vsync(fd);
        if !vsync {
            warn!("{} has no FBIO_WAITFORVSYNC, swaps may tear", device.display());
        }
        info!("framebuffer {} mapped: {}x{} {}bpp stride {}", device.display(), width, height, bits_per_pixel, line_length);

        Ok(Self {
            capabilities: SinkCapabilities { width, height, name: "fbdev", vsync },
            _file: file,
            mmap,
            fd,
            bits_per_pixel,
            line_length,
            front: Frame::new(width, height),
        })
    }

    fn blit(&mut self, frame: &Frame) {
        let w = frame.width() as usize;
        for (y, row) in frame.as_slice().chunks(w).enumerate() {
            let line = &mut self.mmap[y * self.line_length..(y + 1) * self.line_length];
            if self.bits_per_pixel == 16 {
                for (dst, &c) in line.chunks_exact_mut(2).zip(row) {
                    dst.copy_from_slice(&pack_rgb565(c));
                }
            } else {
                for (dst, &c) in line.chunks_exact_mut(4).zip(row) {
                    dst.copy_from_slice(&pack_xrgb8888(c));
                }
            }
        }
    }
}

/// Block until the next vertical blank; false if the driver cannot.
fn wait_for_vsync(fd: i32) -> bool {
    let mut arg: u32 = 0;
    // Safety: FBIO_WAITFORVSYNC reads one u32 from the pointer we pass.
    let rc = unsafe { libc::ioctl(fd, FBIO_WAITFORVSYNC as _, &mut arg as *mut u32) };
    rc == 0
}

impl DisplaySink for FramebufferSink {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, SwapError> {
        let expected = (self.capabilities.width, self.capabilities.height);
        if frame.dimensions() != expected {
            let actual = frame.dimensions();
            return Err(SwapError::new(frame, DisplayError::BufferSizeMismatch { expected, actual }));
        }
        if self.capabilities.vsync {
            wait_for_vsync(self.fd);
        }
        self.blit(&frame);
        Ok(std::mem::replace(&mut self.front, frame))
    }
}
