// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-session configuration state and buffer binding.
//!
//! A [`Session`] accumulates the source and destination descriptors, the
//! transform and the colour/filter controls. Nothing reaches the device
//! until a run; see `driver.rs` for the device sequencing.
//!
//! ```text
//! Created -> Configuring <-> Bound -> Submitted -> Completed
//!                                                     |-> Bound / Configuring
//! any state -> Stopped
//! ```

use crate::{
    device::{MemoryType, Queue, ScalerDevice},
    error::{Result, ScalerError},
    format::FourCC,
    geometry::{validate_crop, Rect, Transform},
};
use scaler_sys::SC_NUM_OF_PLANES;
use tracing::{debug, error, warn};

/// Capabilities fixed when a session is opened.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Protected content may be processed on this session.
    pub drm_allowed: bool,
    /// The session carries the blend data path.
    pub blend: bool,
}

/// Lifecycle phase of a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Created,
    Configuring,
    Bound,
    Submitted,
    Completed,
    Stopped,
}

/// Quantization range of RGB data for colour space conversion.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CscRange {
    #[default]
    Narrow,
    Full,
}

impl CscRange {
    /// Any non-zero range selector means full range.
    pub fn from_wide(wide: bool) -> Self {
        if wide {
            CscRange::Full
        } else {
            CscRange::Narrow
        }
    }
}

/// Geometry, format and flags of one image side, as set by a caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub crop: Rect,
    pub fourcc: FourCC,
    pub cacheable: bool,
    pub drm: bool,
    pub premultiplied: bool,
}

/// Resolved frame size and pixel format of one side.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
}

/// Buffer bound to one side of a session.
#[derive(Debug)]
pub struct Binding<F> {
    planes: [usize; SC_NUM_OF_PLANES],
    memory: MemoryType,
    pub(crate) acquire_fence: Option<F>,
}

impl<F> Binding<F> {
    /// Plane addresses exactly as they were bound.
    pub fn planes(&self) -> &[usize; SC_NUM_OF_PLANES] {
        &self.planes
    }

    pub fn memory(&self) -> MemoryType {
        self.memory
    }

    /// True until the acquire fence is consumed by a run.
    pub fn has_acquire_fence(&self) -> bool {
        self.acquire_fence.is_some()
    }
}

/// State of one image side (source or destination).
#[derive(Debug)]
pub struct ImageDescriptor<F> {
    frame: Option<Frame>,
    crop: Option<Rect>,
    cacheable: bool,
    premultiplied: bool,
    drm: bool,
    pub(crate) binding: Option<Binding<F>>,
}

impl<F> Default for ImageDescriptor<F> {
    fn default() -> Self {
        ImageDescriptor {
            frame: None,
            crop: None,
            cacheable: false,
            premultiplied: false,
            drm: false,
            binding: None,
        }
    }
}

impl<F> ImageDescriptor<F> {
    pub fn frame(&self) -> Option<Frame> {
        self.frame
    }

    pub fn crop(&self) -> Option<Rect> {
        self.crop
    }

    pub fn cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn premultiplied(&self) -> bool {
        self.premultiplied
    }

    pub fn drm(&self) -> bool {
        self.drm
    }

    pub fn binding(&self) -> Option<&Binding<F>> {
        self.binding.as_ref()
    }

    fn is_configured(&self) -> bool {
        self.frame.is_some() && self.crop.is_some()
    }
}

/// Blend operator selector, passed through to the device.
pub type BlendOp = u32;

/// Resolved state of the blend data path.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlendDescriptor {
    pub op: BlendOp,
    pub global_alpha: u32,
    pub global_alpha_enable: bool,
    pub h_pos: i32,
    pub v_pos: i32,
    pub premultiplied: bool,
    /// Pixel format of the blend plane.
    pub fourcc: FourCC,
    pub stride: u32,
    pub width: u32,
    pub height: u32,
    pub csc_enable: bool,
    pub csc_space: u32,
    pub csc_wide: bool,
}

impl BlendDescriptor {
    /// Byte size of the blend image, `stride` pixels per line.
    pub fn plane_size(&self) -> u32 {
        let bits = self.fourcc.layout().map_or(32, |l| l.bits_per_pixel());
        let size = self.stride as u64 * self.height as u64 * bits as u64 / 8;
        size.min(u32::MAX as u64) as u32
    }
}

/// One scaler pipeline bound to one device instance.
///
/// A session is driven by a single caller at a time; it performs no
/// locking of its own.
pub struct Session<D: ScalerDevice> {
    instance: u32,
    caps: Capabilities,
    pub(crate) device: D,
    pub(crate) phase: Phase,
    pub(crate) src: ImageDescriptor<D::Fence>,
    pub(crate) dst: ImageDescriptor<D::Fence>,
    pub(crate) transform: Transform,
    pub(crate) csc_range: CscRange,
    pub(crate) filter: u32,
    pub(crate) blend: Option<BlendDescriptor>,
    pub(crate) requested: Option<[MemoryType; 2]>,
    pub(crate) streaming: bool,
}

impl<D: ScalerDevice> Session<D> {
    pub fn new(device: D, instance: u32, caps: Capabilities) -> Self {
        debug!("Scaler {instance} opened ({caps:?})");
        Session {
            instance,
            caps,
            device,
            phase: Phase::Created,
            src: ImageDescriptor::default(),
            dst: ImageDescriptor::default(),
            transform: Transform::default(),
            csc_range: CscRange::default(),
            filter: 0,
            blend: None,
            requested: None,
            streaming: false,
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn descriptor(&self, queue: Queue) -> &ImageDescriptor<D::Fence> {
        match queue {
            Queue::Source => &self.src,
            Queue::Destination => &self.dst,
        }
    }

    pub fn binding(&self, queue: Queue) -> Option<&Binding<D::Fence>> {
        self.descriptor(queue).binding()
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn csc_range(&self) -> CscRange {
        self.csc_range
    }

    pub fn filter(&self) -> u32 {
        self.filter
    }

    pub fn blend(&self) -> Option<&BlendDescriptor> {
        self.blend.as_ref()
    }

    /// Whether the next run processes protected content.
    pub fn drm(&self) -> bool {
        self.src.drm || self.dst.drm
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn descriptor_mut(&mut self, queue: Queue) -> &mut ImageDescriptor<D::Fence> {
        match queue {
            Queue::Source => &mut self.src,
            Queue::Destination => &mut self.dst,
        }
    }

    /// Opens the configuration window. Configuration attempts move a fresh
    /// session to `Configuring` even when the attempt itself is rejected.
    pub(crate) fn begin_update(&mut self) -> Result<()> {
        match self.phase {
            Phase::Submitted => Err(ScalerError::Busy),
            Phase::Created => {
                self.phase = Phase::Configuring;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Recomputes the phase after a successful setter or bind.
    pub(crate) fn settle(&mut self) {
        self.phase = if self.src.binding.is_some() && self.dst.binding.is_some() {
            Phase::Bound
        } else {
            Phase::Configuring
        };
    }

    pub(crate) fn check_drm(&self, requested: bool) -> Result<()> {
        if requested && !self.caps.drm_allowed {
            error!("Invalid DRM state request for Scaler{}", self.instance);
            return Err(ScalerError::PolicyViolation);
        }
        Ok(())
    }

    /// Checks a side configuration against the session policy and its own
    /// frame bounds without applying it.
    pub(crate) fn validate(&self, config: &FrameConfig) -> Result<()> {
        self.check_drm(config.drm)?;
        check_frame(config.width, config.height)?;
        validate_crop(config.width, config.height, &config.crop)
    }

    /// Sets format, crop and flags of one side at once. Nothing changes if
    /// any part is rejected.
    pub fn configure(&mut self, queue: Queue, config: &FrameConfig) -> Result<()> {
        self.begin_update()?;
        self.validate(config)?;

        let desc = self.descriptor_mut(queue);
        desc.frame = Some(Frame {
            width: config.width,
            height: config.height,
            fourcc: config.fourcc,
        });
        desc.crop = Some(config.crop);
        desc.cacheable = config.cacheable;
        desc.premultiplied = config.premultiplied;
        desc.drm = config.drm;
        desc.binding = None;
        self.reset_blend(queue);
        self.settle();
        Ok(())
    }

    /// Sets the frame size and format of one side. The crop is reset to the
    /// whole frame and any bound buffer is dropped.
    pub fn set_format(&mut self, queue: Queue, width: u32, height: u32, fourcc: FourCC) -> Result<()> {
        self.begin_update()?;
        check_frame(width, height)?;

        let desc = self.descriptor_mut(queue);
        desc.frame = Some(Frame {
            width,
            height,
            fourcc,
        });
        desc.crop = Some(Rect::full(width, height));
        desc.binding = None;
        self.reset_blend(queue);
        self.settle();
        Ok(())
    }

    /// The blend plane is paired with the source format it was configured
    /// with; a new source format drops it.
    fn reset_blend(&mut self, queue: Queue) {
        if queue == Queue::Source && self.blend.take().is_some() {
            debug!("Scaler {} blend plane cleared", self.instance);
        }
    }

    pub fn set_crop(&mut self, queue: Queue, crop: Rect) -> Result<()> {
        self.begin_update()?;
        let frame = self
            .descriptor(queue)
            .frame
            .ok_or(ScalerError::NotConfigured("format must be set before crop"))?;
        validate_crop(frame.width, frame.height, &crop)?;

        let desc = self.descriptor_mut(queue);
        desc.crop = Some(crop);
        desc.binding = None;
        self.settle();
        Ok(())
    }

    pub fn set_cacheable(&mut self, queue: Queue, cacheable: bool) -> Result<()> {
        self.begin_update()?;
        self.descriptor_mut(queue).cacheable = cacheable;
        self.settle();
        Ok(())
    }

    pub fn set_premultiplied(&mut self, queue: Queue, premultiplied: bool) -> Result<()> {
        self.begin_update()?;
        self.descriptor_mut(queue).premultiplied = premultiplied;
        self.settle();
        Ok(())
    }

    /// Requests protected processing of one side.
    pub fn set_drm(&mut self, queue: Queue, drm: bool) -> Result<()> {
        self.begin_update()?;
        self.check_drm(drm)?;
        self.descriptor_mut(queue).drm = drm;
        self.settle();
        Ok(())
    }

    pub fn set_transform(&mut self, transform: Transform) -> Result<()> {
        self.begin_update()?;
        self.transform = transform;
        self.settle();
        Ok(())
    }

    pub fn set_rotation(&mut self, degrees: i32, flip_h: bool, flip_v: bool) -> Result<()> {
        self.begin_update()?;
        let transform = Transform::new(degrees, flip_h, flip_v).inspect_err(|_| {
            error!("Failed to set rotation degree {degrees}, hflip {flip_h}, vflip {flip_v}")
        })?;
        self.transform = transform;
        self.settle();
        Ok(())
    }

    pub fn set_csc_range(&mut self, range: CscRange) -> Result<()> {
        self.begin_update()?;
        self.csc_range = range;
        self.settle();
        Ok(())
    }

    pub fn set_filter(&mut self, filter: u32) -> Result<()> {
        self.begin_update()?;
        self.filter = filter;
        self.settle();
        Ok(())
    }

    pub(crate) fn set_blend(&mut self, blend: BlendDescriptor) -> Result<()> {
        self.begin_update()?;
        if !self.caps.blend {
            return Err(ScalerError::NotConfigured("session opened without blend path"));
        }
        self.blend = Some(blend);
        self.settle();
        Ok(())
    }

    /// Binds the buffer of one side.
    ///
    /// Addresses are stored verbatim and never dereferenced; only the first
    /// planes of the side's format are handed to the device. The caller
    /// keeps the memory alive until the device has released it.
    pub fn bind(
        &mut self,
        queue: Queue,
        planes: [usize; SC_NUM_OF_PLANES],
        memory: MemoryType,
        acquire_fence: Option<D::Fence>,
    ) -> Result<()> {
        self.begin_update()?;
        let desc = self.descriptor_mut(queue);
        if !desc.is_configured() {
            return Err(ScalerError::NotConfigured(
                "format and crop must be set before binding",
            ));
        }

        desc.binding = Some(Binding {
            planes,
            memory,
            acquire_fence,
        });
        self.settle();
        debug!("Scaler {} {queue:?} bound ({memory:?})", self.instance);
        Ok(())
    }

    /// Halts the device. Safe to call in any phase, any number of times.
    pub fn stop(&mut self) -> Result<()> {
        let result = self.halt();
        self.phase = Phase::Stopped;
        result
    }

    /// Stops the device and releases the session. A stop failure is
    /// reported but the session is released regardless.
    pub fn close(mut self) -> Result<()> {
        let result = self.stop();
        if let Err(e) = &result {
            warn!("Failed to stop Scaler {}: {e}", self.instance);
        }
        result
    }
}

impl<D: ScalerDevice> Drop for Session<D> {
    fn drop(&mut self) {
        if let Err(e) = self.halt() {
            warn!("Failed to stop Scaler {}: {e}", self.instance);
        }
        debug!("Scaler {} closed", self.instance);
    }
}

fn check_frame(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ScalerError::OutOfBounds {
            frame_width: width,
            frame_height: height,
            left: 0,
            top: 0,
            width,
            height,
        });
    }
    Ok(())
}
