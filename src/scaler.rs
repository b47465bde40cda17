// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! The three flavours of scaler session.
//!
//! - [`Scaler`]: field-by-field configuration and a blocking [`Scaler::run`].
//! - [`ExclusiveScaler`]: whole-image configuration and fenced, non-blocking
//!   submission through the [`Exclusive`] trait.
//! - [`BlendScaler`]: an exclusive scaler with a second, composited source.
//!
//! All three share the setters of [`Configure`].

use crate::{
    device::{DeviceOpener, MemoryType, Queue, ScalerDevice},
    error::{Result, ScalerError},
    fence::ReleaseFences,
    format::{blend_composite, resolve_hal_format, FourCC},
    geometry::{Rect, Transform},
    session::{BlendDescriptor, BlendOp, Capabilities, CscRange, FrameConfig, Session},
};
use scaler_sys::SC_NUM_OF_PLANES;
use tracing::{debug, error};

/// Setters common to every session flavour.
pub trait Configure {
    type Device: ScalerDevice;

    fn session(&self) -> &Session<Self::Device>;

    fn session_mut(&mut self) -> &mut Session<Self::Device>;

    fn set_src_format(&mut self, config: &FrameConfig) -> Result<()> {
        self.session_mut().configure(Queue::Source, config)
    }

    fn set_dst_format(&mut self, config: &FrameConfig) -> Result<()> {
        self.session_mut().configure(Queue::Destination, config)
    }

    fn set_rotation(&mut self, degrees: i32, flip_h: bool, flip_v: bool) -> Result<()> {
        self.session_mut().set_rotation(degrees, flip_h, flip_v)
    }

    /// Colour range and scaling filter. The colour space is chosen by the
    /// driver from the pixel formats.
    fn set_csc_property(&mut self, range: CscRange, filter: u32) -> Result<()> {
        let session = self.session_mut();
        session.begin_update()?;
        session.set_csc_range(range)?;
        session.set_filter(filter)
    }

    /// Binds the source planes. The device waits on the acquire fence
    /// before it reads the buffer.
    fn bind_src(
        &mut self,
        planes: [usize; SC_NUM_OF_PLANES],
        memory: MemoryType,
        acquire_fence: Option<<Self::Device as ScalerDevice>::Fence>,
    ) -> Result<()> {
        self.session_mut()
            .bind(Queue::Source, planes, memory, acquire_fence)
    }

    fn bind_dst(
        &mut self,
        planes: [usize; SC_NUM_OF_PLANES],
        memory: MemoryType,
        acquire_fence: Option<<Self::Device as ScalerDevice>::Fence>,
    ) -> Result<()> {
        self.session_mut()
            .bind(Queue::Destination, planes, memory, acquire_fence)
    }

    fn stop(&mut self) -> Result<()> {
        self.session_mut().stop()
    }
}

fn open_device<O: DeviceOpener>(opener: &O, instance: u32) -> Result<O::Device> {
    opener.open(instance).map_err(|e| {
        error!("Failed to create a Scaler handle for instance {instance}: {e}");
        ScalerError::device("open", e)
    })
}

/// Scaler driven one field at a time, executed with a blocking run.
pub struct Scaler<D: ScalerDevice> {
    session: Session<D>,
}

impl<D: ScalerDevice> Scaler<D> {
    pub fn new(device: D, instance: u32, drm_allowed: bool) -> Self {
        let caps = Capabilities {
            drm_allowed,
            blend: false,
        };
        Scaler {
            session: Session::new(device, instance, caps),
        }
    }

    pub fn open<O>(opener: &O, instance: u32, drm_allowed: bool) -> Result<Self>
    where
        O: DeviceOpener<Device = D>,
    {
        Ok(Self::new(open_device(opener, instance)?, instance, drm_allowed))
    }

    /// Scales the bound source into the bound destination and returns once
    /// the device is done. There is no way to interrupt a running frame.
    pub fn run(&mut self) -> Result<()> {
        self.session.run_blocking()
    }

    /// Stops the device and releases the session.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }
}

impl<D: ScalerDevice> Configure for Scaler<D> {
    type Device = D;

    fn session(&self) -> &Session<D> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<D> {
        &mut self.session
    }
}

/// Full description of one image for exclusive sessions.
#[derive(Debug)]
pub struct ScalerImage<F> {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Region of the frame read or written
    pub crop: Rect,
    /// Platform HAL pixel format
    pub format: u32,
    /// Plane addresses (Y, U, V), pointers or dma-buf descriptors. For a
    /// blended source the blend image follows the primary planes.
    pub planes: [usize; SC_NUM_OF_PLANES],
    pub memory: MemoryType,
    /// Platform HAL transform; only the destination's is used
    pub transform: u32,
    pub cacheable: bool,
    pub drm: bool,
    /// Destination RGB data is limited range
    pub narrow_rgb: bool,
    pub premultiplied: bool,
    /// Fence to wait on before the device touches the buffer, consumed by
    /// [`Exclusive::run`].
    pub acquire_fence: Option<F>,
}

impl<F> ScalerImage<F> {
    /// A full-frame image with no buffer attached yet.
    pub fn new(width: u32, height: u32, format: u32) -> Self {
        ScalerImage {
            width,
            height,
            crop: Rect::full(width, height),
            format,
            planes: [0; SC_NUM_OF_PLANES],
            memory: MemoryType::DmaBuf,
            transform: 0,
            cacheable: false,
            drm: false,
            narrow_rgb: false,
            premultiplied: false,
            acquire_fence: None,
        }
    }

    fn frame_config(&self, fourcc: FourCC) -> FrameConfig {
        FrameConfig {
            width: self.width,
            height: self.height,
            crop: self.crop,
            fourcc,
            cacheable: self.cacheable,
            drm: self.drm,
            premultiplied: self.premultiplied,
        }
    }
}

/// Fenced, non-blocking execution shared by exclusive and blend sessions.
pub trait Exclusive: Configure {
    /// Configures rotation, formats, crops and flags from two images.
    ///
    /// Protected content is refused before anything else on sessions
    /// opened without DRM permission. Nothing changes on failure.
    fn configure(
        &mut self,
        src: &ScalerImage<<Self::Device as ScalerDevice>::Fence>,
        dst: &ScalerImage<<Self::Device as ScalerDevice>::Fence>,
    ) -> Result<()> {
        let session = self.session_mut();
        session.begin_update()?;
        session.check_drm(src.drm || dst.drm)?;

        let transform = Transform::from_hal(dst.transform);
        let src_config = src.frame_config(resolve_hal_format(src.format)?);
        let dst_config = dst.frame_config(resolve_hal_format(dst.format)?);
        commit_images(session, &src_config, &dst_config, transform)?;
        session.set_csc_range(CscRange::from_wide(!dst.narrow_rgb))
    }

    /// Range of RGB data produced by colour space conversion.
    fn csc(&mut self, range_full: bool) -> Result<()> {
        self.session_mut()
            .set_csc_range(CscRange::from_wide(range_full))
    }

    /// Binds the buffers of both images and submits them.
    ///
    /// Returns immediately with one release fence per buffer. The acquire
    /// fences of both images are consumed. Fails with
    /// [`ScalerError::Busy`] while an earlier submission is pending.
    fn run(
        &mut self,
        src: &mut ScalerImage<<Self::Device as ScalerDevice>::Fence>,
        dst: &mut ScalerImage<<Self::Device as ScalerDevice>::Fence>,
    ) -> Result<ReleaseFences<<Self::Device as ScalerDevice>::Fence>> {
        let session = self.session_mut();
        session.begin_update()?;
        for queue in [Queue::Source, Queue::Destination] {
            if session.descriptor(queue).frame().is_none() {
                return Err(ScalerError::NotConfigured("images not configured"));
            }
        }

        session.bind(
            Queue::Source,
            src.planes,
            src.memory,
            src.acquire_fence.take(),
        )?;
        session.bind(
            Queue::Destination,
            dst.planes,
            dst.memory,
            dst.acquire_fence.take(),
        )?;
        session.submit_exclusive()
    }

    /// Blocks until the pending submission is done. Fails with
    /// [`ScalerError::NotConfigured`] when nothing is pending; a second wait
    /// after a completed one never blocks.
    fn wait(&mut self) -> Result<()> {
        self.session_mut().wait()
    }
}

fn commit_images<D: ScalerDevice>(
    session: &mut Session<D>,
    src: &FrameConfig,
    dst: &FrameConfig,
    transform: Transform,
) -> Result<()> {
    // both sides are checked before either is committed
    session.validate(src)?;
    session.validate(dst)?;

    session.set_transform(transform)?;
    session.configure(Queue::Source, src)?;
    session.configure(Queue::Destination, dst)
}

/// Scaler with fenced, non-blocking submission.
pub struct ExclusiveScaler<D: ScalerDevice> {
    session: Session<D>,
}

impl<D: ScalerDevice> ExclusiveScaler<D> {
    pub fn new(device: D, instance: u32, drm_allowed: bool) -> Self {
        let caps = Capabilities {
            drm_allowed,
            blend: false,
        };
        debug!("Scaler {instance} is successfully created");
        ExclusiveScaler {
            session: Session::new(device, instance, caps),
        }
    }

    pub fn open<O>(opener: &O, instance: u32, drm_allowed: bool) -> Result<Self>
    where
        O: DeviceOpener<Device = D>,
    {
        Ok(Self::new(open_device(opener, instance)?, instance, drm_allowed))
    }

    /// Stops the device and releases the session.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }
}

impl<D: ScalerDevice> Configure for ExclusiveScaler<D> {
    type Device = D;

    fn session(&self) -> &Session<D> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<D> {
        &mut self.session
    }
}

impl<D: ScalerDevice> Exclusive for ExclusiveScaler<D> {}

/// Global alpha applied to the blend plane.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalAlpha {
    pub value: u32,
    pub enable: bool,
}

/// Colour space conversion of the blend plane, independent of the primary
/// destination's.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlendCsc {
    pub enable: bool,
    pub space: u32,
    pub wide: bool,
}

/// Parameters of the composited blend plane.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlendInfo {
    pub op: BlendOp,
    pub global_alpha: GlobalAlpha,
    pub v_pos: i32,
    pub h_pos: i32,
    pub premultiplied: bool,
    /// Platform HAL pixel format of the blend plane
    pub format: u32,
    /// Line length of the blend image in pixels
    pub stride: u32,
    pub width: u32,
    pub height: u32,
    pub csc: BlendCsc,
}

/// Exclusive scaler with the blend data path.
pub struct BlendScaler<D: ScalerDevice> {
    session: Session<D>,
}

impl<D: ScalerDevice> BlendScaler<D> {
    pub fn new(device: D, instance: u32, drm_allowed: bool) -> Self {
        let caps = Capabilities {
            drm_allowed,
            blend: true,
        };
        debug!("Scaler blend {instance} is successfully created");
        BlendScaler {
            session: Session::new(device, instance, caps),
        }
    }

    pub fn open<O>(opener: &O, instance: u32, drm_allowed: bool) -> Result<Self>
    where
        O: DeviceOpener<Device = D>,
    {
        Ok(Self::new(open_device(opener, instance)?, instance, drm_allowed))
    }

    /// Configures both images and the blend plane.
    ///
    /// The blend plane format must pair with the source format; an
    /// unsupported pair fails with [`ScalerError::IncompatibleBlend`] before
    /// any blend state is recorded.
    pub fn configure_blend(
        &mut self,
        src: &ScalerImage<D::Fence>,
        dst: &ScalerImage<D::Fence>,
        blend: &BlendInfo,
    ) -> Result<()> {
        let session = &mut self.session;
        session.begin_update()?;
        session.check_drm(src.drm || dst.drm)?;

        let transform = Transform::from_hal(dst.transform);
        let src_fourcc = resolve_hal_format(src.format)?;
        let dst_fourcc = resolve_hal_format(dst.format)?;
        let blend_fourcc = resolve_hal_format(blend.format)?;

        let composite = blend_composite(src_fourcc, blend_fourcc).ok_or_else(|| {
            error!("src blending format not supported: {src_fourcc} with {blend_fourcc}");
            ScalerError::IncompatibleBlend {
                source_format: src_fourcc.to_u32(),
                blend: blend_fourcc.to_u32(),
            }
        })?;

        let src_config = src.frame_config(composite);
        let dst_config = dst.frame_config(dst_fourcc);
        commit_images(session, &src_config, &dst_config, transform)?;
        session.set_blend(BlendDescriptor {
            op: blend.op,
            global_alpha: blend.global_alpha.value,
            global_alpha_enable: blend.global_alpha.enable,
            h_pos: blend.h_pos,
            v_pos: blend.v_pos,
            premultiplied: blend.premultiplied,
            fourcc: blend_fourcc,
            stride: blend.stride,
            width: blend.width,
            height: blend.height,
            csc_enable: blend.csc.enable,
            csc_space: blend.csc.space,
            csc_wide: blend.csc.wide,
        })
    }

    /// Stops the device and releases the session.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }
}

impl<D: ScalerDevice> Configure for BlendScaler<D> {
    type Device = D;

    fn session(&self) -> &Session<D> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<D> {
        &mut self.session
    }
}

impl<D: ScalerDevice> Exclusive for BlendScaler<D> {}
