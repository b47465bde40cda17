// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Interface to the scaler device.
//!
//! A session never talks to the kernel directly: it programs a
//! [`ScalerDevice`], which is the V4L2 mem2mem node in production
//! ([`crate::v4l2::V4l2Device`]) and a recording fake in tests.

use crate::{format::FourCC, geometry::Rect};
use scaler_sys as sys;
use std::io;

/// The two mem2mem queues of the scaler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Queue {
    /// Frames read by the scaler (V4L2 output queue).
    Source,
    /// Frames written by the scaler (V4L2 capture queue).
    Destination,
}

impl Queue {
    pub fn buf_type(self) -> u32 {
        match self {
            Queue::Source => sys::V4L2_BUF_TYPE_VIDEO_OUTPUT_MPLANE,
            Queue::Destination => sys::V4L2_BUF_TYPE_VIDEO_CAPTURE_MPLANE,
        }
    }
}

/// How plane addresses bound to a session are interpreted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryType {
    /// Plane addresses are pointers into caller memory.
    UserPtr,
    /// Plane addresses are dma-buf file descriptors.
    DmaBuf,
}

impl MemoryType {
    pub fn v4l2(self) -> u32 {
        match self {
            MemoryType::UserPtr => sys::V4L2_MEMORY_USERPTR,
            MemoryType::DmaBuf => sys::V4L2_MEMORY_DMABUF,
        }
    }
}

/// Device controls programmed before each run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlId {
    Rotate,
    HFlip,
    VFlip,
    CscRange,
    ContentProtection,
    ScaleFilter,
    BlendOp,
    GlobalAlpha,
    GlobalAlphaEnable,
    BlendFormat,
    BlendHPos,
    BlendVPos,
    BlendPremultiplied,
    BlendStride,
    BlendWidth,
    BlendHeight,
    BlendCscEnable,
    BlendCscSpace,
    BlendCscWide,
}

impl ControlId {
    pub fn cid(self) -> u32 {
        match self {
            ControlId::Rotate => sys::V4L2_CID_ROTATE,
            ControlId::HFlip => sys::V4L2_CID_HFLIP,
            ControlId::VFlip => sys::V4L2_CID_VFLIP,
            ControlId::CscRange => sys::V4L2_CID_CSC_RANGE,
            ControlId::ContentProtection => sys::V4L2_CID_CONTENT_PROTECTION,
            ControlId::ScaleFilter => sys::V4L2_CID_2D_SCALE_FILTER,
            ControlId::BlendOp => sys::V4L2_CID_2D_BLEND_OP,
            ControlId::GlobalAlpha => sys::V4L2_CID_2D_GLOBAL_ALPHA,
            ControlId::GlobalAlphaEnable => sys::V4L2_CID_2D_GLOBAL_ALPHA_ENABLE,
            ControlId::BlendFormat => sys::V4L2_CID_2D_SRC_BLEND_SET_FMT,
            ControlId::BlendHPos => sys::V4L2_CID_2D_SRC_BLEND_SET_H_POS,
            ControlId::BlendVPos => sys::V4L2_CID_2D_SRC_BLEND_SET_V_POS,
            ControlId::BlendPremultiplied => sys::V4L2_CID_2D_SRC_BLEND_FMT_PREMULTI,
            ControlId::BlendStride => sys::V4L2_CID_2D_SRC_BLEND_SET_STRIDE,
            ControlId::BlendWidth => sys::V4L2_CID_2D_SRC_BLEND_SET_WIDTH,
            ControlId::BlendHeight => sys::V4L2_CID_2D_SRC_BLEND_SET_HEIGHT,
            ControlId::BlendCscEnable => sys::V4L2_CID_2D_SRC_BLEND_CSC_EQ_MODE,
            ControlId::BlendCscSpace => sys::V4L2_CID_2D_SRC_BLEND_CSC_EQ,
            ControlId::BlendCscWide => sys::V4L2_CID_2D_SRC_BLEND_CSC_RANGE,
        }
    }
}

/// Frame format pushed to one queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceFormat {
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
    pub premultiplied: bool,
}

/// One memory plane of a queued buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Plane {
    /// User pointer or dma-buf descriptor, depending on the memory type.
    pub addr: usize,
    /// Plane size in bytes.
    pub length: u32,
}

/// A buffer handed to [`ScalerDevice::queue_buffer`].
#[derive(Debug)]
pub struct QueueRequest<F> {
    pub memory: MemoryType,
    pub planes: Vec<Plane>,
    /// Skip CPU cache maintenance when false.
    pub cacheable: bool,
    /// Fence the device must wait on before touching the buffer.
    pub acquire_fence: Option<F>,
    /// Ask the device for a release fence.
    pub want_release_fence: bool,
}

/// Operations the session driver needs from the scaler hardware.
///
/// Implementations report failures as `io::Error`; the session wraps them
/// into [`crate::ScalerError::DeviceRejected`] with the failing step.
pub trait ScalerDevice {
    /// Fence descriptor type exchanged with the device. Dropping it closes it.
    type Fence;

    fn set_control(&mut self, id: ControlId, value: i32) -> io::Result<()>;

    fn set_format(&mut self, queue: Queue, format: &DeviceFormat) -> io::Result<()>;

    fn set_crop(&mut self, queue: Queue, crop: &Rect) -> io::Result<()>;

    /// Reserves `count` buffers on `queue`; zero releases them.
    fn request_buffers(&mut self, queue: Queue, memory: MemoryType, count: u32) -> io::Result<()>;

    /// Queues a buffer. The acquire fence is consumed whatever the outcome.
    /// Returns the release fence when one was requested and provided.
    fn queue_buffer(
        &mut self,
        queue: Queue,
        request: QueueRequest<Self::Fence>,
    ) -> io::Result<Option<Self::Fence>>;

    /// Blocks until the device hands back the buffer queued on `queue`.
    fn dequeue_buffer(&mut self, queue: Queue) -> io::Result<()>;

    fn stream_on(&mut self, queue: Queue) -> io::Result<()>;

    fn stream_off(&mut self, queue: Queue) -> io::Result<()>;
}

/// Opens scaler devices by instance number.
pub trait DeviceOpener {
    type Device: ScalerDevice;

    fn open(&self, instance: u32) -> io::Result<Self::Device>;
}
