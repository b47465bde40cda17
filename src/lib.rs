// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Scaler Library
//!
//! Session driver for the Exynos scaler/blender, a memory-to-memory
//! accelerator that scales, crops, rotates and converts images and can
//! composite a second RGB plane onto the source while doing so.
//!
//! ## Features
//!
//! - **Blocking sessions**: configure each field, bind buffers, and
//!   [`Scaler::run`] until the frame is done.
//! - **Exclusive sessions**: configure from two image descriptors and submit
//!   without blocking. Each submission hands back one release fence per
//!   buffer; [`Exclusive::wait`] collects the result.
//! - **Blend sessions**: exclusive sessions with a composited blend plane.
//! - **Handles**: [`ScalerTable`] exposes all of the above through
//!   generation-checked handles.
//! - **One-shot copy**: [`copy_pixels`] for simple RGB blits.
//!
//! ## Example
//!
//! ```no_run
//! use edgefirst_scaler::{
//!     format::RGB32, Configure, FrameConfig, MemoryType, Rect, Scaler, V4l2Opener,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sc = Scaler::open(&V4l2Opener, 0, false)?;
//!
//! let frame = |w, h| FrameConfig {
//!     width: w,
//!     height: h,
//!     crop: Rect::full(w, h),
//!     fourcc: RGB32,
//!     cacheable: true,
//!     drm: false,
//!     premultiplied: false,
//! };
//! sc.set_src_format(&frame(1920, 1080))?;
//! sc.set_dst_format(&frame(640, 360))?;
//! sc.set_rotation(90, false, false)?;
//!
//! let (src, dst) = (vec![0u8; 1920 * 1080 * 4], vec![0u8; 640 * 360 * 4]);
//! sc.bind_src([src.as_ptr() as usize, 0, 0], MemoryType::UserPtr, None)?;
//! sc.bind_dst([dst.as_ptr() as usize, 0, 0], MemoryType::UserPtr, None)?;
//! sc.run()?;
//! sc.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Requirements
//!
//! - **Linux** with the Exynos scaler V4L2 driver at `/dev/video50` and up.
//!   Everything above the [`ScalerDevice`] trait runs anywhere, which is how
//!   the test suite drives sessions without hardware.
//!
//! ## Safety
//!
//! `unsafe` is limited to the ioctl calls in [`v4l2`] and the adoption of
//! fence descriptors returned by the driver.

pub mod device;
mod driver;
pub mod error;
pub mod fence;
pub mod format;
pub mod geometry;
pub mod handle;
pub mod oneshot;
pub mod scaler;
pub mod session;
pub mod v4l2;

pub use device::{DeviceOpener, MemoryType, Queue, ScalerDevice};
pub use error::{Result, ScalerError};
pub use fence::{ReleaseFences, SyncFence};
pub use format::{FourCC, ScalerFormat};
pub use geometry::{Rect, Rotation, Transform};
pub use handle::{Handle, ScalerTable};
pub use oneshot::{copy_pixels, PixelInfo, PixelSide};
pub use scaler::{
    BlendCsc, BlendInfo, BlendScaler, Configure, Exclusive, ExclusiveScaler, GlobalAlpha, Scaler,
    ScalerImage,
};
pub use session::{CscRange, FrameConfig, Phase, Session};
pub use v4l2::{V4l2Device, V4l2Opener};
