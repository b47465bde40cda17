// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Device sequencing of a session.
//!
//! Every run programs the device in a fixed order: controls, formats and
//! crops, buffer reservation, enqueue, stream on. The first failing step
//! aborts the run. The device is then halted and the session falls back to
//! its unsubmitted phase; fences acquired during the attempt are closed on
//! the way out.

use crate::{
    device::{ControlId, DeviceFormat, Plane, Queue, QueueRequest, ScalerDevice},
    error::{Result, ScalerError},
    fence::ReleaseFences,
    session::{CscRange, Phase, Session},
};
use std::io;
use tracing::{debug, warn};

const QUEUES: [Queue; 2] = [Queue::Source, Queue::Destination];

type Fences<F> = (Option<F>, Option<F>);

impl<D: ScalerDevice> Session<D> {
    /// Step 1: rotation, flips, CSC range, filter and content protection.
    fn apply_controls(&mut self) -> Result<()> {
        let t = self.transform;
        let drm = self.drm();
        let mut controls = vec![
            (ControlId::Rotate, t.rotation.degrees()),
            (ControlId::HFlip, t.flip_h as i32),
            (ControlId::VFlip, t.flip_v as i32),
            (
                ControlId::CscRange,
                (self.csc_range == CscRange::Full) as i32,
            ),
            (ControlId::ScaleFilter, self.filter as i32),
        ];
        if self.capabilities().drm_allowed {
            controls.push((ControlId::ContentProtection, drm as i32));
        }

        for (id, value) in controls {
            self.device
                .set_control(id, value)
                .map_err(|e| ScalerError::device("VIDIOC_S_CTRL", e))?;
        }
        Ok(())
    }

    /// Step 2: formats and crops of both queues, then the blend plane.
    fn apply_formats(&mut self) -> Result<()> {
        for queue in QUEUES {
            let desc = self.descriptor(queue);
            let (frame, crop) = match (desc.frame(), desc.crop()) {
                (Some(frame), Some(crop)) => (frame, crop),
                _ => return Err(ScalerError::NotConfigured("format and crop")),
            };
            let format = DeviceFormat {
                width: frame.width,
                height: frame.height,
                fourcc: frame.fourcc,
                premultiplied: desc.premultiplied(),
            };

            self.device
                .set_format(queue, &format)
                .map_err(|e| ScalerError::device("VIDIOC_S_FMT", e))?;
            self.device
                .set_crop(queue, &crop)
                .map_err(|e| ScalerError::device("VIDIOC_S_CROP", e))?;
        }

        if let Some(b) = self.blend {
            let controls = [
                (ControlId::BlendOp, b.op as i32),
                (ControlId::GlobalAlpha, b.global_alpha as i32),
                (ControlId::GlobalAlphaEnable, b.global_alpha_enable as i32),
                (ControlId::BlendVPos, b.v_pos),
                (ControlId::BlendHPos, b.h_pos),
                (ControlId::BlendPremultiplied, b.premultiplied as i32),
                (ControlId::BlendFormat, b.fourcc.to_u32() as i32),
                (ControlId::BlendStride, b.stride as i32),
                (ControlId::BlendWidth, b.width as i32),
                (ControlId::BlendHeight, b.height as i32),
                (ControlId::BlendCscEnable, b.csc_enable as i32),
                (ControlId::BlendCscSpace, b.csc_space as i32),
                (ControlId::BlendCscWide, b.csc_wide as i32),
            ];
            for (id, value) in controls {
                self.device
                    .set_control(id, value)
                    .map_err(|e| ScalerError::device("VIDIOC_S_CTRL", e))?;
            }
        }
        Ok(())
    }

    /// Step 3: one buffer per queue, in the memory type of the binding.
    fn request_buffers(&mut self) -> Result<()> {
        let memory = match (self.src.binding.as_ref(), self.dst.binding.as_ref()) {
            (Some(s), Some(d)) => [s.memory(), d.memory()],
            _ => return Err(ScalerError::NotConfigured("buffers not bound")),
        };

        // Recorded up front so a failure on the second queue still releases
        // the first.
        self.requested = Some(memory);
        for (queue, memory) in QUEUES.into_iter().zip(memory) {
            self.device
                .request_buffers(queue, memory, 1)
                .map_err(|e| ScalerError::device("VIDIOC_REQBUFS", e))?;
        }
        Ok(())
    }

    /// Step 4: queues both buffers, consuming their acquire fences.
    fn enqueue(&mut self, want_release_fence: bool) -> Result<Fences<D::Fence>> {
        let src = self.enqueue_one(Queue::Source, want_release_fence)?;
        let dst = self.enqueue_one(Queue::Destination, want_release_fence)?;
        Ok((src, dst))
    }

    fn enqueue_one(&mut self, queue: Queue, want_release_fence: bool) -> Result<Option<D::Fence>> {
        let blend = self.blend;
        let desc = match queue {
            Queue::Source => &mut self.src,
            Queue::Destination => &mut self.dst,
        };
        let frame = desc
            .frame()
            .ok_or(ScalerError::NotConfigured("format and crop"))?;
        let cacheable = desc.cacheable();
        let binding = desc
            .binding
            .as_mut()
            .ok_or(ScalerError::NotConfigured("buffers not bound"))?;

        let layout = frame
            .fourcc
            .layout()
            .ok_or(ScalerError::NotSupported(frame.fourcc.to_u32()))?;
        let mut sizes = layout.plane_sizes(frame.width, frame.height);
        if let Some(index) = layout.blend_plane() {
            let blend = blend.ok_or(ScalerError::NotConfigured("blend plane"))?;
            sizes[index] = blend.plane_size();
        }
        let planes = binding
            .planes()
            .iter()
            .zip(sizes)
            .take(layout.num_planes())
            .map(|(&addr, length)| Plane { addr, length })
            .collect();

        let request = QueueRequest {
            memory: binding.memory(),
            planes,
            cacheable,
            acquire_fence: binding.acquire_fence.take(),
            want_release_fence,
        };

        let release = self
            .device
            .queue_buffer(queue, request)
            .map_err(|e| ScalerError::device("VIDIOC_QBUF", e))?;

        if want_release_fence && release.is_none() {
            return Err(missing_release_fence());
        }
        Ok(release)
    }

    /// Step 5.
    fn start_streaming(&mut self) -> Result<()> {
        for queue in QUEUES {
            self.device
                .stream_on(queue)
                .map_err(|e| ScalerError::device("VIDIOC_STREAMON", e))?;
            self.streaming = true;
        }
        Ok(())
    }

    fn submit_steps(&mut self, want_release_fence: bool) -> Result<Fences<D::Fence>> {
        self.apply_controls()?;
        self.apply_formats()?;
        self.request_buffers()?;
        let fences = self.enqueue(want_release_fence)?;
        if let Err(e) = self.start_streaming() {
            // the release fences were never handed out, close them here
            drop(fences);
            return Err(e);
        }
        Ok(fences)
    }

    /// Runs steps 1 to 5. On success the session is `Submitted`.
    fn submit(&mut self, want_release_fence: bool) -> Result<Fences<D::Fence>> {
        if self.phase == Phase::Submitted {
            return Err(ScalerError::Busy);
        }
        if self.src.binding.is_none() || self.dst.binding.is_none() {
            return Err(ScalerError::NotConfigured(
                "source and destination buffers must be bound",
            ));
        }

        match self.submit_steps(want_release_fence) {
            Ok(fences) => {
                self.phase = Phase::Submitted;
                debug!("Scaler {} submitted", self.instance());
                Ok(fences)
            }
            Err(e) => {
                if let Err(halt) = self.halt() {
                    warn!("Failed to stop Scaler {}: {halt}", self.instance());
                }
                self.drop_acquire_fences();
                self.settle();
                Err(e)
            }
        }
    }

    /// Closes acquire fences a failed attempt did not get to queue.
    fn drop_acquire_fences(&mut self) {
        for desc in [&mut self.src, &mut self.dst] {
            if let Some(binding) = desc.binding.as_mut() {
                drop(binding.acquire_fence.take());
            }
        }
    }

    /// Step 6: waits for both buffers to come back, then halts the device.
    fn dequeue(&mut self) -> Result<()> {
        if self.phase != Phase::Submitted {
            return Err(ScalerError::NotConfigured("no pending submission"));
        }

        let mut result = Ok(());
        for queue in QUEUES {
            if let Err(e) = self.device.dequeue_buffer(queue) {
                result = Err(ScalerError::device("VIDIOC_DQBUF", e));
                break;
            }
        }

        if let Err(e) = self.halt() {
            warn!("Failed to stop Scaler {}: {e}", self.instance());
        }

        match result {
            Ok(()) => {
                self.phase = Phase::Completed;
                debug!("Scaler {} frame done", self.instance());
                Ok(())
            }
            Err(e) => {
                self.settle();
                Err(e)
            }
        }
    }

    /// Non-blocking exclusive submission. Returns the release fences of
    /// both buffers; the caller owns them from here on.
    pub fn submit_exclusive(&mut self) -> Result<ReleaseFences<D::Fence>> {
        match self.submit(true)? {
            (Some(source), Some(destination)) => Ok(ReleaseFences {
                source,
                destination,
            }),
            _ => {
                if let Err(e) = self.halt() {
                    warn!("Failed to stop Scaler {}: {e}", self.instance());
                }
                self.settle();
                Err(missing_release_fence())
            }
        }
    }

    /// Blocks until the pending exclusive submission completes. Fails with
    /// [`ScalerError::NotConfigured`] when nothing is pending.
    pub fn wait(&mut self) -> Result<()> {
        self.dequeue()
    }

    /// Runs the bound buffers to completion, blocking the caller.
    pub fn run_blocking(&mut self) -> Result<()> {
        let fences = self.submit(false)?;
        drop(fences);
        self.dequeue()
    }

    /// Streams off and releases device buffers, whichever of the two is
    /// active. Reports the first failure but always clears both.
    pub(crate) fn halt(&mut self) -> Result<()> {
        let mut result = Ok(());

        if self.streaming {
            self.streaming = false;
            for queue in QUEUES {
                if let Err(e) = self.device.stream_off(queue) {
                    if result.is_ok() {
                        result = Err(ScalerError::device("VIDIOC_STREAMOFF", e));
                    }
                }
            }
        }

        if let Some(memory) = self.requested.take() {
            for (queue, memory) in QUEUES.into_iter().zip(memory) {
                if let Err(e) = self.device.request_buffers(queue, memory, 0) {
                    if result.is_ok() {
                        result = Err(ScalerError::device("VIDIOC_REQBUFS", e));
                    }
                }
            }
        }

        result
    }
}

fn missing_release_fence() -> ScalerError {
    ScalerError::device(
        "VIDIOC_QBUF",
        io::Error::other("driver returned no release fence"),
    )
}
