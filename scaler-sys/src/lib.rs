// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Low-level bindings for the Exynos scaler/blender memory-to-memory device.
//!
//! The scaler is exposed by the kernel as a multi-planar V4L2 mem2mem node
//! (`/dev/video50` and up). This crate only carries the structures, ioctl
//! wrappers and constant tables needed to drive that node; the safe session
//! layer lives in `edgefirst-scaler`.
#![allow(non_camel_case_types)]

use libc::{c_int, c_ulong, timeval};
use nix::{ioctl_readwrite, ioctl_write_ptr};

/// Device node prefix of the scaler instances.
pub const SC_DEV_NODE: &str = "/dev/video";
/// Instance `n` lives at `SC_DEV_NODE` + (`SC_NODE_BASE` + `n`).
pub const SC_NODE_BASE: u32 = 50;
/// Maximum number of image planes the scaler accepts per buffer.
pub const SC_NUM_OF_PLANES: usize = 3;

pub const VIDEO_MAX_PLANES: usize = 8;

pub const fn v4l2_fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

// Standard V4L2 pixel formats understood by the scaler.
pub const V4L2_PIX_FMT_RGB32: u32 = v4l2_fourcc(b'R', b'G', b'B', b'4');
pub const V4L2_PIX_FMT_BGR32: u32 = v4l2_fourcc(b'B', b'G', b'R', b'4');
pub const V4L2_PIX_FMT_RGB24: u32 = v4l2_fourcc(b'R', b'G', b'B', b'3');
pub const V4L2_PIX_FMT_RGB565: u32 = v4l2_fourcc(b'R', b'G', b'B', b'P');
pub const V4L2_PIX_FMT_RGB555X: u32 = v4l2_fourcc(b'R', b'G', b'B', b'Q');
pub const V4L2_PIX_FMT_RGB444: u32 = v4l2_fourcc(b'R', b'4', b'4', b'4');
pub const V4L2_PIX_FMT_YUYV: u32 = v4l2_fourcc(b'Y', b'U', b'Y', b'V');
pub const V4L2_PIX_FMT_NV12: u32 = v4l2_fourcc(b'N', b'V', b'1', b'2');
pub const V4L2_PIX_FMT_NV21: u32 = v4l2_fourcc(b'N', b'V', b'2', b'1');
pub const V4L2_PIX_FMT_NV16: u32 = v4l2_fourcc(b'N', b'V', b'1', b'6');
pub const V4L2_PIX_FMT_YVU420: u32 = v4l2_fourcc(b'Y', b'V', b'1', b'2');
pub const V4L2_PIX_FMT_NV12M: u32 = v4l2_fourcc(b'N', b'M', b'1', b'2');
pub const V4L2_PIX_FMT_NV21M: u32 = v4l2_fourcc(b'N', b'M', b'2', b'1');
pub const V4L2_PIX_FMT_YUV420M: u32 = v4l2_fourcc(b'Y', b'M', b'1', b'2');
pub const V4L2_PIX_FMT_YVU420M: u32 = v4l2_fourcc(b'Y', b'M', b'2', b'1');
pub const V4L2_PIX_FMT_NV12MT_16X16: u32 = v4l2_fourcc(b'V', b'M', b'1', b'2');

// Driver-private composite formats: a YCbCr primary source with an RGB
// blend plane layered on top of it.
pub const V4L2_PIX_FMT_NV12M_RGB32: u32 = v4l2_fourcc(b'N', b'V', b'R', b'G');
pub const V4L2_PIX_FMT_NV12M_BGR32: u32 = v4l2_fourcc(b'N', b'V', b'B', b'G');
pub const V4L2_PIX_FMT_NV12M_RGB565: u32 = v4l2_fourcc(b'N', b'V', b'R', b'6');
pub const V4L2_PIX_FMT_NV12M_RGB444: u32 = v4l2_fourcc(b'N', b'V', b'R', b'4');
pub const V4L2_PIX_FMT_NV12M_RGB555X: u32 = v4l2_fourcc(b'N', b'V', b'R', b'5');
pub const V4L2_PIX_FMT_NV12_RGB32: u32 = v4l2_fourcc(b'N', b'1', b'R', b'G');
pub const V4L2_PIX_FMT_NV12_BGR32: u32 = v4l2_fourcc(b'N', b'1', b'B', b'G');
pub const V4L2_PIX_FMT_NV12_RGB565: u32 = v4l2_fourcc(b'N', b'1', b'R', b'6');
pub const V4L2_PIX_FMT_NV12_RGB444: u32 = v4l2_fourcc(b'N', b'1', b'R', b'4');
pub const V4L2_PIX_FMT_NV12_RGB555X: u32 = v4l2_fourcc(b'N', b'1', b'R', b'5');

pub const V4L2_PIX_FMT_FLAG_PREMUL_ALPHA: u8 = 0x01;

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE_MPLANE: u32 = 9;
pub const V4L2_BUF_TYPE_VIDEO_OUTPUT_MPLANE: u32 = 10;

pub const V4L2_MEMORY_USERPTR: u32 = 2;
pub const V4L2_MEMORY_DMABUF: u32 = 4;

pub const V4L2_FIELD_NONE: u32 = 1;

pub const V4L2_BUF_FLAG_NO_CACHE_INVALIDATE: u32 = 0x0000_0800;
pub const V4L2_BUF_FLAG_NO_CACHE_CLEAN: u32 = 0x0000_1000;
/// The driver waits on the fence in `reserved` before touching the buffer
/// and hands back a release fence in the same field.
pub const V4L2_BUF_FLAG_USE_SYNC: u32 = 0x0000_8000;

pub const V4L2_CTRL_CLASS_USER: u32 = 0x0098_0000;
pub const V4L2_CID_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x900;
pub const V4L2_CID_HFLIP: u32 = V4L2_CID_BASE + 20;
pub const V4L2_CID_VFLIP: u32 = V4L2_CID_BASE + 21;
pub const V4L2_CID_ROTATE: u32 = V4L2_CID_BASE + 34;

pub const V4L2_CID_EXYNOS_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x2000;
pub const V4L2_CID_CSC_EQ_MODE: u32 = V4L2_CID_EXYNOS_BASE + 100;
pub const V4L2_CID_CSC_EQ: u32 = V4L2_CID_EXYNOS_BASE + 101;
pub const V4L2_CID_CSC_RANGE: u32 = V4L2_CID_EXYNOS_BASE + 102;
pub const V4L2_CID_2D_SCALE_FILTER: u32 = V4L2_CID_EXYNOS_BASE + 110;
pub const V4L2_CID_CONTENT_PROTECTION: u32 = V4L2_CID_EXYNOS_BASE + 201;

pub const V4L2_CID_2D_BLEND_OP: u32 = V4L2_CID_EXYNOS_BASE + 300;
pub const V4L2_CID_2D_GLOBAL_ALPHA: u32 = V4L2_CID_EXYNOS_BASE + 301;
pub const V4L2_CID_2D_GLOBAL_ALPHA_ENABLE: u32 = V4L2_CID_EXYNOS_BASE + 302;
pub const V4L2_CID_2D_SRC_BLEND_SET_FMT: u32 = V4L2_CID_EXYNOS_BASE + 310;
pub const V4L2_CID_2D_SRC_BLEND_SET_H_POS: u32 = V4L2_CID_EXYNOS_BASE + 311;
pub const V4L2_CID_2D_SRC_BLEND_SET_V_POS: u32 = V4L2_CID_EXYNOS_BASE + 312;
pub const V4L2_CID_2D_SRC_BLEND_FMT_PREMULTI: u32 = V4L2_CID_EXYNOS_BASE + 313;
pub const V4L2_CID_2D_SRC_BLEND_SET_STRIDE: u32 = V4L2_CID_EXYNOS_BASE + 314;
pub const V4L2_CID_2D_SRC_BLEND_SET_WIDTH: u32 = V4L2_CID_EXYNOS_BASE + 315;
pub const V4L2_CID_2D_SRC_BLEND_SET_HEIGHT: u32 = V4L2_CID_EXYNOS_BASE + 316;
pub const V4L2_CID_2D_SRC_BLEND_CSC_EQ_MODE: u32 = V4L2_CID_EXYNOS_BASE + 317;
pub const V4L2_CID_2D_SRC_BLEND_CSC_EQ: u32 = V4L2_CID_EXYNOS_BASE + 318;
pub const V4L2_CID_2D_SRC_BLEND_CSC_RANGE: u32 = V4L2_CID_EXYNOS_BASE + 319;

// Abstract pixel formats of the one-shot copy interface.
pub const EXYNOS_SC_FMT_RGB32: u32 = 0x10;
pub const EXYNOS_SC_FMT_BGR32: u32 = 0x11;
pub const EXYNOS_SC_FMT_RGB565: u32 = 0x12;
pub const EXYNOS_SC_FMT_RGB555X: u32 = 0x13;
pub const EXYNOS_SC_FMT_RGB444: u32 = 0x14;

// Platform graphics HAL surface formats.
pub const HAL_PIXEL_FORMAT_RGBA_8888: u32 = 1;
pub const HAL_PIXEL_FORMAT_RGBX_8888: u32 = 2;
pub const HAL_PIXEL_FORMAT_RGB_888: u32 = 3;
pub const HAL_PIXEL_FORMAT_RGB_565: u32 = 4;
pub const HAL_PIXEL_FORMAT_BGRA_8888: u32 = 5;
pub const HAL_PIXEL_FORMAT_YCBCR_422_SP: u32 = 0x10;
pub const HAL_PIXEL_FORMAT_YCRCB_420_SP: u32 = 0x11;
pub const HAL_PIXEL_FORMAT_YCBCR_422_I: u32 = 0x14;
pub const HAL_PIXEL_FORMAT_YV12: u32 = 0x3231_5659;
pub const HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_P_M: u32 = 0x101;
pub const HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP_M: u32 = 0x105;
pub const HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP_M_TILED: u32 = 0x106;
pub const HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP: u32 = 0x110;
pub const HAL_PIXEL_FORMAT_EXYNOS_YV12_M: u32 = 0x11C;
pub const HAL_PIXEL_FORMAT_EXYNOS_YCRCB_420_SP_M: u32 = 0x11D;

// Platform graphics HAL transform bits.
pub const HAL_TRANSFORM_FLIP_H: u32 = 0x01;
pub const HAL_TRANSFORM_FLIP_V: u32 = 0x02;
pub const HAL_TRANSFORM_ROT_90: u32 = 0x04;
pub const HAL_TRANSFORM_ROT_180: u32 = 0x03;
pub const HAL_TRANSFORM_ROT_270: u32 = 0x07;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_crop {
    pub type_: u32,
    pub c: v4l2_rect,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_control {
    pub id: u32,
    pub value: i32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_plane_pix_format {
    pub sizeimage: u32,
    pub bytesperline: u32,
    pub reserved: [u16; 6],
}

#[repr(C, packed)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_pix_format_mplane {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub colorspace: u32,
    pub plane_fmt: [v4l2_plane_pix_format; VIDEO_MAX_PLANES],
    pub num_planes: u8,
    pub flags: u8,
    pub ycbcr_enc: u8,
    pub quantization: u8,
    pub xfer_func: u8,
    pub reserved: [u8; 7],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union v4l2_format_fmt {
    pub pix_mp: v4l2_pix_format_mplane,
    pub raw_data: [u8; 200],
    // The kernel union holds pointers (v4l2_window), which forces 8-byte
    // alignment on 64-bit targets.
    _align: [u64; 0],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_format {
    pub type_: u32,
    pub fmt: v4l2_format_fmt,
}

impl Default for v4l2_format {
    fn default() -> Self {
        // SAFETY: v4l2_format is plain old data, all-zero is a valid value.
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_requestbuffers {
    pub count: u32,
    pub type_: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union v4l2_plane_m {
    pub mem_offset: u32,
    pub userptr: c_ulong,
    pub fd: i32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_plane {
    pub bytesused: u32,
    pub length: u32,
    pub m: v4l2_plane_m,
    pub data_offset: u32,
    pub reserved: [u32; 11],
}

impl Default for v4l2_plane {
    fn default() -> Self {
        // SAFETY: v4l2_plane is plain old data, all-zero is a valid value.
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_timecode {
    pub type_: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union v4l2_buffer_m {
    pub offset: u32,
    pub userptr: c_ulong,
    pub planes: *mut v4l2_plane,
    pub fd: i32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_buffer {
    pub index: u32,
    pub type_: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: timeval,
    pub timecode: v4l2_timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: v4l2_buffer_m,
    pub length: u32,
    pub reserved2: u32,
    /// Fence descriptor exchange slot when `V4L2_BUF_FLAG_USE_SYNC` is set:
    /// acquire fence on the way in, release fence on the way out.
    pub reserved: i32,
}

impl Default for v4l2_buffer {
    fn default() -> Self {
        // SAFETY: v4l2_buffer is plain old data, all-zero is a valid value
        // (the planes pointer is null until the caller fills it in).
        unsafe { std::mem::zeroed() }
    }
}

ioctl_readwrite!(vidioc_s_fmt, b'V', 5, v4l2_format);
ioctl_readwrite!(vidioc_reqbufs, b'V', 8, v4l2_requestbuffers);
ioctl_readwrite!(vidioc_qbuf, b'V', 15, v4l2_buffer);
ioctl_readwrite!(vidioc_dqbuf, b'V', 17, v4l2_buffer);
ioctl_write_ptr!(vidioc_streamon, b'V', 18, c_int);
ioctl_write_ptr!(vidioc_streamoff, b'V', 19, c_int);
ioctl_readwrite!(vidioc_s_ctrl, b'V', 28, v4l2_control);
ioctl_write_ptr!(vidioc_s_crop, b'V', 60, v4l2_crop);

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn abi_sizes() {
        assert_eq!(size_of::<v4l2_pix_format_mplane>(), 192);
        assert_eq!(size_of::<v4l2_plane>(), 64);
        assert_eq!(size_of::<v4l2_crop>(), 20);
        assert_eq!(size_of::<v4l2_requestbuffers>(), 20);
        #[cfg(target_pointer_width = "64")]
        {
            assert_eq!(size_of::<v4l2_format>(), 208);
            assert_eq!(size_of::<v4l2_buffer>(), 88);
        }
    }

    #[test]
    fn fourcc_layout() {
        assert_eq!(V4L2_PIX_FMT_RGB32, 0x3442_4752);
        assert_eq!(&V4L2_PIX_FMT_NV12M.to_le_bytes(), b"NM12");
    }
}
