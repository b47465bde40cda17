// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! One call pixel copy between two single-plane RGB buffers.

use crate::{
    device::{DeviceOpener, MemoryType, Queue},
    error::Result,
    format::resolve_scaler_format,
    geometry::Rect,
    scaler::{Configure, Scaler},
};
use tracing::{debug, instrument};

/// One side of a [`copy_pixels`] request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelSide {
    /// Start of the pixel data in caller memory
    pub addr: usize,
    pub width: u32,
    pub height: u32,
    pub crop: Rect,
    /// One of the `EXYNOS_SC_FMT_*` codes
    pub format: u32,
}

impl PixelSide {
    pub fn new(addr: usize, width: u32, height: u32, format: u32) -> Self {
        PixelSide {
            addr,
            width,
            height,
            crop: Rect::full(width, height),
            format,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelInfo {
    pub src: PixelSide,
    pub dst: PixelSide,
    /// Clockwise rotation in degrees
    pub rotate: i32,
    pub hflip: bool,
    pub vflip: bool,
}

/// Scales, crops and rotates `info.src` into `info.dst` on device instance
/// `dev_num` and blocks until the copy is complete.
///
/// The session only lives for the duration of the call. Both addresses must
/// stay valid until it returns.
#[instrument(skip(opener), level = "debug")]
pub fn copy_pixels<O: DeviceOpener>(opener: &O, info: &PixelInfo, dev_num: u32) -> Result<()> {
    let mut sc = Scaler::open(opener, dev_num, false)?;

    let src_fourcc = resolve_scaler_format(info.src.format)?;
    let dst_fourcc = resolve_scaler_format(info.dst.format)?;

    let session = sc.session_mut();
    session.set_format(Queue::Source, info.src.width, info.src.height, src_fourcc)?;
    session.set_format(
        Queue::Destination,
        info.dst.width,
        info.dst.height,
        dst_fourcc,
    )?;
    session.set_crop(Queue::Source, info.src.crop)?;
    session.set_crop(Queue::Destination, info.dst.crop)?;
    sc.set_rotation(info.rotate, info.hflip, info.vflip)?;

    // RGB formats only use the first plane
    sc.bind_src([info.src.addr, 0, 0], MemoryType::UserPtr, None)?;
    sc.bind_dst([info.dst.addr, 0, 0], MemoryType::UserPtr, None)?;

    sc.run()?;
    debug!("Scaler {dev_num} copied {src_fourcc} to {dst_fourcc}");
    sc.close()
}
