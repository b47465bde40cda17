// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! The scaler as a V4L2 multi-planar mem2mem node.

use crate::{
    device::{ControlId, DeviceFormat, DeviceOpener, MemoryType, Queue, QueueRequest, ScalerDevice},
    fence::SyncFence,
    geometry::Rect,
};
use libc::{c_int, c_ulong};
use scaler_sys::{self as sys, v4l2_buffer, v4l2_plane};
use std::{
    fs::{File, OpenOptions},
    io,
    os::fd::{AsRawFd, FromRawFd},
};
use tracing::{debug, trace};

/// Device node of scaler instance `instance`.
pub fn node_path(instance: u32) -> io::Result<String> {
    let node = sys::SC_NODE_BASE.checked_add(instance).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("scaler instance {instance} out of range"),
        )
    })?;
    Ok(format!("{}{node}", sys::SC_DEV_NODE))
}

fn queue_index(queue: Queue) -> usize {
    match queue {
        Queue::Source => 0,
        Queue::Destination => 1,
    }
}

/// An open scaler node.
#[derive(Debug)]
pub struct V4l2Device {
    file: File,
    instance: u32,
    // memory type of the buffers reserved on each queue
    memory: [MemoryType; 2],
}

impl V4l2Device {
    pub fn open(instance: u32) -> io::Result<Self> {
        let path = node_path(instance)?;
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        debug!("Scaler {instance} opened {path}");
        Ok(V4l2Device {
            file,
            instance,
            memory: [MemoryType::UserPtr; 2],
        })
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    fn fd(&self) -> c_int {
        self.file.as_raw_fd()
    }
}

impl ScalerDevice for V4l2Device {
    type Fence = SyncFence;

    fn set_control(&mut self, id: ControlId, value: i32) -> io::Result<()> {
        let mut ctrl = sys::v4l2_control { id: id.cid(), value };
        unsafe { sys::vidioc_s_ctrl(self.fd(), &mut ctrl) }?;
        trace!("Scaler {} {id:?} = {value}", self.instance);
        Ok(())
    }

    fn set_format(&mut self, queue: Queue, format: &DeviceFormat) -> io::Result<()> {
        let flags = if format.premultiplied {
            sys::V4L2_PIX_FMT_FLAG_PREMUL_ALPHA
        } else {
            0
        };
        let pix_mp = sys::v4l2_pix_format_mplane {
            width: format.width,
            height: format.height,
            pixelformat: format.fourcc.to_u32(),
            field: sys::V4L2_FIELD_NONE,
            num_planes: format.fourcc.num_planes() as u8,
            flags,
            ..Default::default()
        };

        let mut fmt = sys::v4l2_format {
            type_: queue.buf_type(),
            ..Default::default()
        };
        fmt.fmt.pix_mp = pix_mp;
        unsafe { sys::vidioc_s_fmt(self.fd(), &mut fmt) }?;
        Ok(())
    }

    fn set_crop(&mut self, queue: Queue, crop: &Rect) -> io::Result<()> {
        let crop = sys::v4l2_crop {
            type_: queue.buf_type(),
            c: sys::v4l2_rect {
                left: crop.left as i32,
                top: crop.top as i32,
                width: crop.width,
                height: crop.height,
            },
        };
        unsafe { sys::vidioc_s_crop(self.fd(), &crop) }?;
        Ok(())
    }

    fn request_buffers(&mut self, queue: Queue, memory: MemoryType, count: u32) -> io::Result<()> {
        let mut req = sys::v4l2_requestbuffers {
            count,
            type_: queue.buf_type(),
            memory: memory.v4l2(),
            ..Default::default()
        };
        unsafe { sys::vidioc_reqbufs(self.fd(), &mut req) }?;
        self.memory[queue_index(queue)] = memory;
        Ok(())
    }

    fn queue_buffer(
        &mut self,
        queue: Queue,
        request: QueueRequest<SyncFence>,
    ) -> io::Result<Option<SyncFence>> {
        let mut planes = [v4l2_plane::default(); sys::VIDEO_MAX_PLANES];
        for (dst, plane) in planes.iter_mut().zip(&request.planes) {
            dst.length = plane.length;
            dst.bytesused = plane.length;
            match request.memory {
                MemoryType::UserPtr => dst.m.userptr = plane.addr as c_ulong,
                MemoryType::DmaBuf => dst.m.fd = plane.addr as i32,
            }
        }

        let mut buf = v4l2_buffer {
            type_: queue.buf_type(),
            memory: request.memory.v4l2(),
            field: sys::V4L2_FIELD_NONE,
            length: request.planes.len() as u32,
            ..Default::default()
        };
        buf.m.planes = planes.as_mut_ptr();
        if !request.cacheable {
            buf.flags |= sys::V4L2_BUF_FLAG_NO_CACHE_INVALIDATE | sys::V4L2_BUF_FLAG_NO_CACHE_CLEAN;
        }

        // The driver takes its own reference to the acquire fence; ours is
        // closed when `acquire` goes out of scope.
        let acquire = request.acquire_fence;
        let acquire_fd = acquire.as_ref().map_or(-1, |f| f.as_raw_fd());
        let use_sync = request.want_release_fence || acquire.is_some();
        if use_sync {
            buf.flags |= sys::V4L2_BUF_FLAG_USE_SYNC;
            buf.reserved = acquire_fd;
        }

        unsafe { sys::vidioc_qbuf(self.fd(), &mut buf) }?;

        if !use_sync || buf.reserved < 0 || buf.reserved == acquire_fd {
            return Ok(None);
        }
        // SAFETY: with USE_SYNC the driver returns a freshly installed fence
        // descriptor that nothing else owns.
        let release = unsafe { SyncFence::from_raw_fd(buf.reserved) };
        Ok(request.want_release_fence.then_some(release))
    }

    fn dequeue_buffer(&mut self, queue: Queue) -> io::Result<()> {
        let mut planes = [v4l2_plane::default(); sys::VIDEO_MAX_PLANES];
        let mut buf = v4l2_buffer {
            type_: queue.buf_type(),
            memory: self.memory[queue_index(queue)].v4l2(),
            length: sys::SC_NUM_OF_PLANES as u32,
            ..Default::default()
        };
        buf.m.planes = planes.as_mut_ptr();
        unsafe { sys::vidioc_dqbuf(self.fd(), &mut buf) }?;
        Ok(())
    }

    fn stream_on(&mut self, queue: Queue) -> io::Result<()> {
        let buf_type = queue.buf_type() as c_int;
        unsafe { sys::vidioc_streamon(self.fd(), &buf_type) }?;
        Ok(())
    }

    fn stream_off(&mut self, queue: Queue) -> io::Result<()> {
        let buf_type = queue.buf_type() as c_int;
        unsafe { sys::vidioc_streamoff(self.fd(), &buf_type) }?;
        Ok(())
    }
}

/// Opens scaler instances from `/dev/video{50+n}`.
#[derive(Copy, Clone, Debug, Default)]
pub struct V4l2Opener;

impl DeviceOpener for V4l2Opener {
    type Device = V4l2Device;

    fn open(&self, instance: u32) -> io::Result<V4l2Device> {
        V4l2Device::open(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_naming() {
        assert_eq!(node_path(0).unwrap(), "/dev/video50");
        assert_eq!(node_path(2).unwrap(), "/dev/video52");
    }

    #[test]
    fn node_out_of_range() {
        let err = node_path(u32::MAX).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(V4l2Device::open(u32::MAX).is_err());
    }
}
