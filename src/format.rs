// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Pixel format resolution.
//!
//! Callers describe images either with the scaler's own abstract format codes
//! (one-shot copies) or with platform graphics HAL surface codes (exclusive
//! sessions). Both are translated here into the V4L2 fourcc the driver
//! understands. Unknown codes fail closed with [`ScalerError::NotSupported`].

use crate::error::{Result, ScalerError};
use core::fmt;
use scaler_sys as sys;
use tracing::error;

/// V4L2 four character pixel format code.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn from_u32(code: u32) -> Self {
        FourCC(code.to_le_bytes())
    }

    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Plane layout of the format, `None` for formats the scaler does not
    /// know how to size.
    pub fn layout(self) -> Option<PlaneLayout> {
        let (bits, blend): (&'static [u32], bool) = match self {
            RGB32 | BGR32 => (&[32], false),
            RGB24 => (&[24], false),
            RGB565 | RGB555X | RGB444 | YUYV | NV16 => (&[16], false),
            NV12 | NV21 | YVU420 => (&[12], false),
            NV12M | NV21M | NV12MT_16X16 => (&[8, 4], false),
            YUV420M | YVU420M => (&[8, 2, 2], false),
            // Y, CbCr, blend image
            NV12M_RGB32 | NV12M_BGR32 | NV12M_RGB565 | NV12M_RGB444 | NV12M_RGB555X => {
                (&[8, 4], true)
            }
            // YCbCr, blend image
            NV12_RGB32 | NV12_BGR32 | NV12_RGB565 | NV12_RGB444 | NV12_RGB555X => {
                (&[12], true)
            }
            _ => return None,
        };
        Some(PlaneLayout { bits, blend })
    }

    /// Number of memory planes, 1 for unknown formats.
    pub fn num_planes(self) -> usize {
        self.layout().map_or(1, |l| l.num_planes())
    }
}

impl From<FourCC> for u32 {
    fn from(value: FourCC) -> Self {
        value.to_u32()
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for c in self.0 {
            if c.is_ascii_graphic() {
                write!(f, "{}", c as char)?;
            } else {
                write!(f, "\\x{c:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

/// 32-bit XRGB
pub const RGB32: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_RGB32);
/// 32-bit XBGR
pub const BGR32: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_BGR32);
/// 24-bit packed RGB
pub const RGB24: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_RGB24);
pub const RGB565: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_RGB565);
pub const RGB555X: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_RGB555X);
pub const RGB444: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_RGB444);
/// YUYV 4:2:2 packed
pub const YUYV: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_YUYV);
/// NV12 4:2:0 semi-planar, one memory plane
pub const NV12: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12);
pub const NV21: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV21);
pub const NV16: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV16);
pub const YVU420: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_YVU420);
/// NV12 4:2:0 semi-planar, luma and chroma in separate memory planes
pub const NV12M: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12M);
pub const NV21M: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV21M);
/// YUV 4:2:0 fully planar, three memory planes
pub const YUV420M: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_YUV420M);
pub const YVU420M: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_YVU420M);
pub const NV12MT_16X16: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12MT_16X16);

pub const NV12M_RGB32: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12M_RGB32);
pub const NV12M_BGR32: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12M_BGR32);
pub const NV12M_RGB565: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12M_RGB565);
pub const NV12M_RGB444: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12M_RGB444);
pub const NV12M_RGB555X: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12M_RGB555X);
pub const NV12_RGB32: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12_RGB32);
pub const NV12_BGR32: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12_BGR32);
pub const NV12_RGB565: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12_RGB565);
pub const NV12_RGB444: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12_RGB444);
pub const NV12_RGB555X: FourCC = FourCC::from_u32(sys::V4L2_PIX_FMT_NV12_RGB555X);

/// Memory plane layout of a pixel format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Bits per pixel of each memory plane, relative to the luma grid.
    bits: &'static [u32],
    /// A blend image follows the primary planes in its own memory plane.
    blend: bool,
}

impl PlaneLayout {
    pub fn num_planes(&self) -> usize {
        self.bits.len() + self.blend as usize
    }

    /// Index of the memory plane carrying the blend image of a composite
    /// format.
    pub fn blend_plane(&self) -> Option<usize> {
        self.blend.then_some(self.bits.len())
    }

    /// Bits per pixel of the first memory plane.
    pub fn bits_per_pixel(&self) -> u32 {
        self.bits[0]
    }

    /// Byte size of each primary memory plane for a `width` x `height`
    /// frame. Unused planes and the blend plane are zero; the blend plane is
    /// sized from the blend geometry instead.
    pub fn plane_sizes(&self, width: u32, height: u32) -> [u32; sys::SC_NUM_OF_PLANES] {
        let mut sizes = [0; sys::SC_NUM_OF_PLANES];
        let pixels = width as u64 * height as u64;
        for (size, bits) in sizes.iter_mut().zip(self.bits) {
            *size = (pixels * *bits as u64 / 8).min(u32::MAX as u64) as u32;
        }
        sizes
    }
}

/// Abstract pixel formats accepted by the one-shot copy interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ScalerFormat {
    Rgb32 = sys::EXYNOS_SC_FMT_RGB32,
    Bgr32 = sys::EXYNOS_SC_FMT_BGR32,
    Rgb565 = sys::EXYNOS_SC_FMT_RGB565,
    Rgb555X = sys::EXYNOS_SC_FMT_RGB555X,
    Rgb444 = sys::EXYNOS_SC_FMT_RGB444,
}

impl ScalerFormat {
    pub fn fourcc(self) -> FourCC {
        match self {
            ScalerFormat::Rgb32 => RGB32,
            ScalerFormat::Bgr32 => BGR32,
            ScalerFormat::Rgb565 => RGB565,
            ScalerFormat::Rgb555X => RGB555X,
            ScalerFormat::Rgb444 => RGB444,
        }
    }
}

impl TryFrom<u32> for ScalerFormat {
    type Error = ScalerError;

    fn try_from(code: u32) -> Result<Self> {
        Ok(match code {
            sys::EXYNOS_SC_FMT_RGB32 => ScalerFormat::Rgb32,
            sys::EXYNOS_SC_FMT_BGR32 => ScalerFormat::Bgr32,
            sys::EXYNOS_SC_FMT_RGB565 => ScalerFormat::Rgb565,
            sys::EXYNOS_SC_FMT_RGB555X => ScalerFormat::Rgb555X,
            sys::EXYNOS_SC_FMT_RGB444 => ScalerFormat::Rgb444,
            _ => {
                error!("Unknown format value {code:#x}");
                return Err(ScalerError::NotSupported(code));
            }
        })
    }
}

/// Resolves a one-shot abstract format code into the driver fourcc.
pub fn resolve_scaler_format(code: u32) -> Result<FourCC> {
    ScalerFormat::try_from(code).map(ScalerFormat::fourcc)
}

/// Resolves a platform graphics HAL surface format into the driver fourcc.
pub fn resolve_hal_format(code: u32) -> Result<FourCC> {
    Ok(match code {
        sys::HAL_PIXEL_FORMAT_RGBA_8888 | sys::HAL_PIXEL_FORMAT_RGBX_8888 => RGB32,
        sys::HAL_PIXEL_FORMAT_BGRA_8888 => BGR32,
        sys::HAL_PIXEL_FORMAT_RGB_888 => RGB24,
        sys::HAL_PIXEL_FORMAT_RGB_565 => RGB565,
        sys::HAL_PIXEL_FORMAT_YCBCR_422_I => YUYV,
        sys::HAL_PIXEL_FORMAT_YCBCR_422_SP => NV16,
        sys::HAL_PIXEL_FORMAT_YCRCB_420_SP => NV21,
        sys::HAL_PIXEL_FORMAT_YV12 => YVU420,
        sys::HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP => NV12,
        sys::HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP_M => NV12M,
        sys::HAL_PIXEL_FORMAT_EXYNOS_YCRCB_420_SP_M => NV21M,
        sys::HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_P_M => YUV420M,
        sys::HAL_PIXEL_FORMAT_EXYNOS_YV12_M => YVU420M,
        sys::HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP_M_TILED => NV12MT_16X16,
        _ => {
            error!("Unknown HAL pixel format {code:#x}");
            return Err(ScalerError::NotSupported(code));
        }
    })
}

/// Pairs a primary source format with a blend plane format.
///
/// The blender reads the blend plane alongside the primary source, so the
/// driver is programmed with a composite source format naming both. Returns
/// `None` when the hardware cannot composite the pair.
pub fn blend_composite(source: FourCC, blend: FourCC) -> Option<FourCC> {
    let composite = match (source, blend) {
        (NV12M, RGB32) => NV12M_RGB32,
        (NV12M, BGR32) => NV12M_BGR32,
        (NV12M, RGB565) => NV12M_RGB565,
        (NV12M, RGB444) => NV12M_RGB444,
        (NV12M, RGB555X) => NV12M_RGB555X,
        (NV12, RGB32) => NV12_RGB32,
        (NV12, BGR32) => NV12_BGR32,
        (NV12, RGB565) => NV12_RGB565,
        (NV12, RGB444) => NV12_RGB444,
        (NV12, RGB555X) => NV12_RGB555X,
        _ => return None,
    };
    Some(composite)
}
