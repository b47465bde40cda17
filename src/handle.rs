// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Handle based entry points.
//!
//! [`ScalerTable`] owns every session created through it and hands out
//! [`Handle`]s. A handle is a slot index plus the slot generation at the time
//! it was created; closing a session bumps the generation so later use of the
//! old handle fails with [`ScalerError::InvalidHandle`] instead of reaching
//! whichever session reuses the slot.

use crate::{
    device::{DeviceOpener, MemoryType, ScalerDevice},
    error::{Result, ScalerError},
    fence::ReleaseFences,
    scaler::{
        BlendInfo, BlendScaler, Configure, Exclusive, ExclusiveScaler, Scaler, ScalerImage,
    },
    session::{CscRange, FrameConfig},
};
use scaler_sys::SC_NUM_OF_PLANES;
use std::{fmt, io};
use tracing::{debug, error, warn};

/// Opaque reference to a session in a [`ScalerTable`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

enum Instance<D: ScalerDevice> {
    Blocking(Scaler<D>),
    Exclusive(ExclusiveScaler<D>),
    Blend(BlendScaler<D>),
}

impl<D: ScalerDevice> Instance<D> {
    fn close(self) -> Result<()> {
        match self {
            Instance::Blocking(s) => s.close(),
            Instance::Exclusive(s) => s.close(),
            Instance::Blend(s) => s.close(),
        }
    }
}

struct Slot<D: ScalerDevice> {
    generation: u32,
    instance: Option<Instance<D>>,
}

fn slot_index(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|_| {
        error!("Scaler handle table is full");
        ScalerError::device(
            "open",
            io::Error::new(io::ErrorKind::OutOfMemory, "handle table full"),
        )
    })
}

type Fence<O> = <<O as DeviceOpener>::Device as ScalerDevice>::Fence;

/// Arena of scaler sessions addressed by [`Handle`].
pub struct ScalerTable<O: DeviceOpener> {
    opener: O,
    slots: Vec<Slot<O::Device>>,
    free: Vec<usize>,
}

impl<O: DeviceOpener> ScalerTable<O> {
    pub fn new(opener: O) -> Self {
        ScalerTable {
            opener,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a session. The table holds at most `u32::MAX + 1` slots; past
    /// that the session is closed and the insert fails.
    fn insert(&mut self, instance: Instance<O::Device>) -> Result<Handle> {
        let index = match self.free.last() {
            Some(&index) => index,
            None => self.slots.len(),
        };
        let key = match slot_index(index) {
            Ok(key) => key,
            Err(e) => {
                if let Err(close) = instance.close() {
                    warn!("Failed to stop Scaler past the handle limit: {close}");
                }
                return Err(e);
            }
        };

        if self.free.pop().is_some() {
            self.slots[index].instance = Some(instance);
        } else {
            self.slots.push(Slot {
                generation: 0,
                instance: Some(instance),
            });
        }

        let handle = Handle {
            index: key,
            generation: self.slots[index].generation,
        };
        debug!("{handle:?} allocated");
        Ok(handle)
    }

    fn get_mut(&mut self, handle: Handle) -> Result<&mut Instance<O::Device>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.instance.as_mut())
            .ok_or_else(|| {
                error!("Invalid Scaler handle {handle:?}");
                ScalerError::InvalidHandle
            })
    }

    /// Takes the session out of its slot and retires the handle.
    fn remove(&mut self, handle: Handle) -> Result<Instance<O::Device>> {
        self.get_mut(handle)?;
        let index = handle.index as usize;
        let slot = &mut self.slots[index];
        let instance = slot.instance.take().ok_or(ScalerError::InvalidHandle)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Ok(instance)
    }

    fn configurable(&mut self, handle: Handle) -> Result<&mut dyn Configure<Device = O::Device>> {
        let scaler: &mut dyn Configure<Device = O::Device> = match self.get_mut(handle)? {
            Instance::Blocking(s) => s,
            Instance::Exclusive(s) => s,
            Instance::Blend(s) => s,
        };
        Ok(scaler)
    }

    fn exclusive(&mut self, handle: Handle) -> Result<&mut dyn Exclusive<Device = O::Device>> {
        let scaler: &mut dyn Exclusive<Device = O::Device> = match self.get_mut(handle)? {
            Instance::Exclusive(s) => s,
            Instance::Blend(s) => s,
            Instance::Blocking(_) => {
                error!("{handle:?} is not an exclusive Scaler");
                return Err(ScalerError::InvalidHandle);
            }
        };
        Ok(scaler)
    }

    /// Opens a blocking session on device instance `dev_num`.
    pub fn create(&mut self, dev_num: u32) -> Result<Handle> {
        let scaler = Scaler::open(&self.opener, dev_num, false)?;
        self.insert(Instance::Blocking(scaler))
    }

    /// Opens an exclusive session. Protected content is accepted only with
    /// `allow_drm`.
    pub fn create_exclusive(&mut self, dev_num: u32, allow_drm: bool) -> Result<Handle> {
        let scaler = ExclusiveScaler::open(&self.opener, dev_num, allow_drm)?;
        self.insert(Instance::Exclusive(scaler))
    }

    pub fn create_blend_exclusive(&mut self, dev_num: u32, allow_drm: bool) -> Result<Handle> {
        let scaler = BlendScaler::open(&self.opener, dev_num, allow_drm)?;
        self.insert(Instance::Blend(scaler))
    }

    /// Stops and releases the session. The handle is retired even when the
    /// stop fails; that failure is still returned.
    pub fn destroy(&mut self, handle: Handle) -> Result<()> {
        let instance = self.remove(handle)?;
        instance.close().inspect_err(|e| {
            warn!("Failed to stop {handle:?} before release: {e}");
        })
    }

    /// Same as [`ScalerTable::destroy`], for exclusive sessions.
    pub fn free_and_close(&mut self, handle: Handle) -> Result<()> {
        self.destroy(handle)
    }

    pub fn set_csc_property(&mut self, handle: Handle, range: CscRange, filter: u32) -> Result<()> {
        self.configurable(handle)?.set_csc_property(range, filter)
    }

    pub fn set_src_format(&mut self, handle: Handle, config: &FrameConfig) -> Result<()> {
        self.configurable(handle)?.set_src_format(config)
    }

    pub fn set_dst_format(&mut self, handle: Handle, config: &FrameConfig) -> Result<()> {
        self.configurable(handle)?.set_dst_format(config)
    }

    pub fn set_rotation(
        &mut self,
        handle: Handle,
        degrees: i32,
        flip_h: bool,
        flip_v: bool,
    ) -> Result<()> {
        self.configurable(handle)?
            .set_rotation(degrees, flip_h, flip_v)
    }

    pub fn set_src_addr(
        &mut self,
        handle: Handle,
        planes: [usize; SC_NUM_OF_PLANES],
        memory: MemoryType,
        acquire_fence: Option<Fence<O>>,
    ) -> Result<()> {
        self.configurable(handle)?
            .bind_src(planes, memory, acquire_fence)
    }

    pub fn set_dst_addr(
        &mut self,
        handle: Handle,
        planes: [usize; SC_NUM_OF_PLANES],
        memory: MemoryType,
        acquire_fence: Option<Fence<O>>,
    ) -> Result<()> {
        self.configurable(handle)?
            .bind_dst(planes, memory, acquire_fence)
    }

    /// Blocking run of a session created with [`ScalerTable::create`].
    pub fn convert(&mut self, handle: Handle) -> Result<()> {
        match self.get_mut(handle)? {
            Instance::Blocking(s) => s.run(),
            _ => {
                error!("{handle:?} does not support blocking conversion");
                Err(ScalerError::InvalidHandle)
            }
        }
    }

    pub fn stop_exclusive(&mut self, handle: Handle) -> Result<()> {
        self.exclusive(handle)?.stop()
    }

    /// Output range of colour space conversion. The driver picks the colour
    /// space itself, `colorspace` is not used.
    pub fn csc_exclusive(&mut self, handle: Handle, colorspace: u32, range_full: bool) -> Result<()> {
        debug!("{handle:?} csc range_full {range_full}, colorspace {colorspace} ignored");
        self.exclusive(handle)?.csc(range_full)
    }

    pub fn config_exclusive(
        &mut self,
        handle: Handle,
        src: &ScalerImage<Fence<O>>,
        dst: &ScalerImage<Fence<O>>,
    ) -> Result<()> {
        self.exclusive(handle)?.configure(src, dst)
    }

    pub fn run_exclusive(
        &mut self,
        handle: Handle,
        src: &mut ScalerImage<Fence<O>>,
        dst: &mut ScalerImage<Fence<O>>,
    ) -> Result<ReleaseFences<Fence<O>>> {
        self.exclusive(handle)?.run(src, dst)
    }

    pub fn config_blend_exclusive(
        &mut self,
        handle: Handle,
        src: &ScalerImage<Fence<O>>,
        dst: &ScalerImage<Fence<O>>,
        blend: &BlendInfo,
    ) -> Result<()> {
        match self.get_mut(handle)? {
            Instance::Blend(s) => s.configure_blend(src, dst, blend),
            _ => {
                error!("{handle:?} has no blend path");
                Err(ScalerError::InvalidHandle)
            }
        }
    }

    pub fn wait_frame_done_exclusive(&mut self, handle: Handle) -> Result<()> {
        self.exclusive(handle)?.wait()
    }
}
