// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use scaler_sys as sys;

/// Image mirroring applied by the scaler.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum MirrorSetting {
    /// No mirroring
    None,
    /// Flip horizontally (left-right)
    Horizontal,
    /// Flip vertically (top-bottom)
    Vertical,
    /// Flip both horizontally and vertically (180-degree rotation)
    Both,
}

/// Clockwise rotation applied by the scaler.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum RotationSetting {
    #[value(name = "0")]
    Rotate0,
    #[value(name = "90")]
    Rotate90,
    #[value(name = "180")]
    Rotate180,
    #[value(name = "270")]
    Rotate270,
}

/// Pixel formats accepted on the command line.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum PixelFormat {
    Rgba,
    Rgbx,
    Bgra,
    Rgb,
    Rgb565,
    Yuyv,
    Nv12,
    Nv12m,
    Nv21,
    Yv12,
}

impl PixelFormat {
    /// Platform HAL code of the format.
    pub fn hal(self) -> u32 {
        match self {
            PixelFormat::Rgba => sys::HAL_PIXEL_FORMAT_RGBA_8888,
            PixelFormat::Rgbx => sys::HAL_PIXEL_FORMAT_RGBX_8888,
            PixelFormat::Bgra => sys::HAL_PIXEL_FORMAT_BGRA_8888,
            PixelFormat::Rgb => sys::HAL_PIXEL_FORMAT_RGB_888,
            PixelFormat::Rgb565 => sys::HAL_PIXEL_FORMAT_RGB_565,
            PixelFormat::Yuyv => sys::HAL_PIXEL_FORMAT_YCBCR_422_I,
            PixelFormat::Nv12 => sys::HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP,
            PixelFormat::Nv12m => sys::HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP_M,
            PixelFormat::Nv21 => sys::HAL_PIXEL_FORMAT_YCRCB_420_SP,
            PixelFormat::Yv12 => sys::HAL_PIXEL_FORMAT_YV12,
        }
    }
}

/// Submission model used for the test frames.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum Mode {
    /// Configure field by field and block on every frame
    Blocking,
    /// Configure from image descriptors and wait on release fences
    Exclusive,
}

/// Command-line arguments for EdgeFirst Scaler.
///
/// Drives the scaler with DMA heap buffers to check a device and measure
/// its frame time. Arguments can be specified via command line or
/// environment variables.
///
/// # Example
///
/// ```bash
/// # Via command line
/// edgefirst-scaler --device 1 --src-format nv12m --dst-size 640 360
///
/// # Via environment variables
/// export SCALER_DEVICE=1
/// export MODE=exclusive
/// edgefirst-scaler
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Scaler instance, opened as /dev/video{50+N}
    #[arg(short, long, env = "SCALER_DEVICE", default_value = "0")]
    pub device: u32,

    /// Submission model
    #[arg(short, long, env = "MODE", default_value = "exclusive", value_enum)]
    pub mode: Mode,

    /// Source resolution in pixels (width height)
    #[arg(
        long,
        env = "SRC_SIZE",
        default_value = "1920 1080",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub src_size: Vec<u32>,

    /// Source pixel format
    #[arg(long, env = "SRC_FORMAT", default_value = "yuyv", value_enum)]
    pub src_format: PixelFormat,

    /// Destination resolution in pixels (width height)
    #[arg(
        long,
        env = "DST_SIZE",
        default_value = "1280 720",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub dst_size: Vec<u32>,

    /// Source crop rectangle (left top width height), full frame if unset
    #[arg(long, env = "SRC_CROP", value_delimiter = ' ', num_args = 4)]
    pub src_crop: Option<Vec<u32>>,

    /// Destination pixel format
    #[arg(long, env = "DST_FORMAT", default_value = "rgba", value_enum)]
    pub dst_format: PixelFormat,

    /// Rotation in degrees
    #[arg(long, env = "ROTATION", default_value = "0", value_enum)]
    pub rotation: RotationSetting,

    /// Image mirroring setting
    #[arg(long, env = "MIRROR", default_value = "none", value_enum)]
    pub mirror: MirrorSetting,

    /// Produce limited range RGB on the destination
    #[arg(long, env = "NARROW_RGB")]
    pub narrow_rgb: bool,

    /// Driver scaling filter selector
    #[arg(long, env = "FILTER", default_value = "0")]
    pub filter: u32,

    /// Open the session with protected content allowed and mark both
    /// images as protected
    #[arg(long, env = "DRM")]
    pub drm: bool,

    /// Number of frames to process
    #[arg(short, long, env = "COUNT", default_value = "100")]
    pub count: u32,

    /// Release fence timeout in milliseconds (exclusive mode)
    #[arg(long, env = "FENCE_TIMEOUT", default_value = "1000")]
    pub fence_timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also log to the systemd journal
    #[arg(long, env = "JOURNALD")]
    pub journald: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,
}

impl Args {
    /// Source crop as `(left, top, width, height)`.
    pub fn src_crop(&self) -> Option<(u32, u32, u32, u32)> {
        self.src_crop.as_deref().map(|c| (c[0], c[1], c[2], c[3]))
    }

    /// Rotation and flips as a platform HAL transform code.
    ///
    /// 180 degrees is expressed as a combined horizontal and vertical flip,
    /// so mirroring on top of it cancels out.
    pub fn hal_transform(&self) -> u32 {
        let mut flips = match self.mirror {
            MirrorSetting::None => 0,
            MirrorSetting::Horizontal => sys::HAL_TRANSFORM_FLIP_H,
            MirrorSetting::Vertical => sys::HAL_TRANSFORM_FLIP_V,
            MirrorSetting::Both => sys::HAL_TRANSFORM_FLIP_H | sys::HAL_TRANSFORM_FLIP_V,
        };
        match self.rotation {
            RotationSetting::Rotate0 => flips,
            RotationSetting::Rotate90 => flips | sys::HAL_TRANSFORM_ROT_90,
            RotationSetting::Rotate180 => flips ^ sys::HAL_TRANSFORM_ROT_180,
            RotationSetting::Rotate270 => {
                if flips == 0 {
                    sys::HAL_TRANSFORM_ROT_270
                } else {
                    // 270 is 90 plus a half turn
                    flips ^= sys::HAL_TRANSFORM_ROT_180;
                    flips | sys::HAL_TRANSFORM_ROT_90
                }
            }
        }
    }

    /// Rotation and flips for the blocking setters.
    pub fn rotation(&self) -> (i32, bool, bool) {
        let degrees = match self.rotation {
            RotationSetting::Rotate0 => 0,
            RotationSetting::Rotate90 => 90,
            RotationSetting::Rotate180 => 180,
            RotationSetting::Rotate270 => 270,
        };
        let (h, v) = match self.mirror {
            MirrorSetting::None => (false, false),
            MirrorSetting::Horizontal => (true, false),
            MirrorSetting::Vertical => (false, true),
            MirrorSetting::Both => (true, true),
        };
        (degrees, h, v)
    }
}
