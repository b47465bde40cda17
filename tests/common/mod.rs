// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Recording scaler device shared by the integration tests.
#![allow(dead_code)]

use edgefirst_scaler::{
    device::{ControlId, DeviceFormat, Plane, QueueRequest},
    format::RGB32,
    DeviceOpener, FrameConfig, MemoryType, Queue, Rect, ScalerDevice,
};
use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Device operations, used to inject failures and filter the call log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Control,
    Format,
    Crop,
    RequestBuffers,
    Queue,
    Dequeue,
    StreamOn,
    StreamOff,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Control(ControlId, i32),
    Format(Queue, DeviceFormat),
    Crop(Queue, Rect),
    RequestBuffers(Queue, MemoryType, u32),
    Queue {
        queue: Queue,
        memory: MemoryType,
        planes: Vec<Plane>,
        cacheable: bool,
        acquire_fence: bool,
    },
    Dequeue(Queue),
    StreamOn(Queue),
    StreamOff(Queue),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Control(..) => Op::Control,
            Call::Format(..) => Op::Format,
            Call::Crop(..) => Op::Crop,
            Call::RequestBuffers(..) => Op::RequestBuffers,
            Call::Queue { .. } => Op::Queue,
            Call::Dequeue(..) => Op::Dequeue,
            Call::StreamOn(..) => Op::StreamOn,
            Call::StreamOff(..) => Op::StreamOff,
        }
    }
}

/// Counts fence descriptors handed out and closed.
#[derive(Debug, Default)]
pub struct FenceStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl FenceStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Fences still open.
    pub fn live(&self) -> usize {
        self.opened() - self.closed()
    }
}

/// Fence stand-in; dropping it counts as closing the descriptor.
#[derive(Debug)]
pub struct FakeFence {
    pub id: usize,
    stats: Arc<FenceStats>,
}

impl Drop for FakeFence {
    fn drop(&mut self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    // (operation, calls of that operation to let through before failing)
    fail: Option<(Op, usize)>,
}

/// Scaler device recording every call. Clones share the same log, so a test
/// keeps one clone while the session owns another.
#[derive(Clone, Debug, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<State>>,
    fences: Arc<FenceStats>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next call of `op`, once.
    pub fn fail_on(&self, op: Op) {
        self.fail_on_nth(op, 0);
    }

    /// Lets `skip` calls of `op` through, then fails the next one, once.
    pub fn fail_on_nth(&self, op: Op, skip: usize) {
        self.state.lock().unwrap().fail = Some((op, skip));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.calls().iter().map(Call::op).collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn fences(&self) -> &FenceStats {
        &self.fences
    }

    /// Opens a new fence, as an upstream producer would.
    pub fn fence(&self) -> FakeFence {
        let id = self.fences.opened.fetch_add(1, Ordering::SeqCst);
        FakeFence {
            id,
            stats: self.fences.clone(),
        }
    }

    fn record(&self, call: Call) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let op = call.op();
        state.calls.push(call);

        let fail = state.fail;
        match fail {
            Some((fail, 0)) if fail == op => {
                state.fail = None;
                Err(io::Error::other(format!("injected {op:?} failure")))
            }
            Some((fail, n)) if fail == op => {
                state.fail = Some((fail, n - 1));
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl ScalerDevice for FakeDevice {
    type Fence = FakeFence;

    fn set_control(&mut self, id: ControlId, value: i32) -> io::Result<()> {
        self.record(Call::Control(id, value))
    }

    fn set_format(&mut self, queue: Queue, format: &DeviceFormat) -> io::Result<()> {
        self.record(Call::Format(queue, *format))
    }

    fn set_crop(&mut self, queue: Queue, crop: &Rect) -> io::Result<()> {
        self.record(Call::Crop(queue, *crop))
    }

    fn request_buffers(&mut self, queue: Queue, memory: MemoryType, count: u32) -> io::Result<()> {
        self.record(Call::RequestBuffers(queue, memory, count))
    }

    fn queue_buffer(
        &mut self,
        queue: Queue,
        request: QueueRequest<FakeFence>,
    ) -> io::Result<Option<FakeFence>> {
        // the acquire fence is consumed on every outcome
        let QueueRequest {
            memory,
            planes,
            cacheable,
            acquire_fence,
            want_release_fence,
        } = request;
        self.record(Call::Queue {
            queue,
            memory,
            planes,
            cacheable,
            acquire_fence: acquire_fence.is_some(),
        })?;
        drop(acquire_fence);

        Ok(want_release_fence.then(|| self.fence()))
    }

    fn dequeue_buffer(&mut self, queue: Queue) -> io::Result<()> {
        self.record(Call::Dequeue(queue))
    }

    fn stream_on(&mut self, queue: Queue) -> io::Result<()> {
        self.record(Call::StreamOn(queue))
    }

    fn stream_off(&mut self, queue: Queue) -> io::Result<()> {
        self.record(Call::StreamOff(queue))
    }
}

/// Hands out clones of one [`FakeDevice`].
#[derive(Clone, Debug, Default)]
pub struct FakeOpener {
    pub device: FakeDevice,
    pub opened: Arc<Mutex<Vec<u32>>>,
    pub missing: bool,
}

impl DeviceOpener for FakeOpener {
    type Device = FakeDevice;

    fn open(&self, instance: u32) -> io::Result<FakeDevice> {
        if self.missing {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        self.opened.lock().unwrap().push(instance);
        Ok(self.device.clone())
    }
}

/// Full-frame RGB32 side configuration.
pub fn rgb32(width: u32, height: u32) -> FrameConfig {
    FrameConfig {
        width,
        height,
        crop: Rect::full(width, height),
        fourcc: RGB32,
        cacheable: true,
        drm: false,
        premultiplied: false,
    }
}

/// Operations of one complete blocking run without failures.
pub const BLOCKING_RUN: &[Op] = &[
    Op::Control,
    Op::Control,
    Op::Control,
    Op::Control,
    Op::Control,
    Op::Format,
    Op::Crop,
    Op::Format,
    Op::Crop,
    Op::RequestBuffers,
    Op::RequestBuffers,
    Op::Queue,
    Op::Queue,
    Op::StreamOn,
    Op::StreamOn,
    Op::Dequeue,
    Op::Dequeue,
    Op::StreamOff,
    Op::StreamOff,
    Op::RequestBuffers,
    Op::RequestBuffers,
];
