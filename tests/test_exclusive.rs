// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod common;

use common::{Call, FakeDevice, FakeFence, Op};
use edgefirst_scaler::{
    device::ControlId,
    format::{NV12M, RGB32},
    geometry::Rotation,
    Configure, CscRange, Exclusive, ExclusiveScaler, MemoryType, Phase, Queue, Rect,
    ScalerError, ScalerImage,
};
use scaler_sys as sys;

fn images() -> (ScalerImage<FakeFence>, ScalerImage<FakeFence>) {
    let mut src = ScalerImage::new(64, 64, sys::HAL_PIXEL_FORMAT_EXYNOS_YCBCR_420_SP_M);
    src.planes = [3, 4, 0];
    let mut dst = ScalerImage::new(32, 32, sys::HAL_PIXEL_FORMAT_RGBA_8888);
    dst.planes = [5, 0, 0];
    (src, dst)
}

fn scaler(device: &FakeDevice, drm_allowed: bool) -> ExclusiveScaler<FakeDevice> {
    ExclusiveScaler::new(device.clone(), 0, drm_allowed)
}

#[test]
fn drm_refused_without_permission() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, dst) = images();
    src.drm = true;

    let err = sc.configure(&src, &dst).unwrap_err();
    assert!(matches!(err, ScalerError::PolicyViolation));
    assert_eq!(sc.session().phase(), Phase::Configuring);
    assert!(sc.session().descriptor(Queue::Source).frame().is_none());
    assert!(device.calls().is_empty());
}

#[test]
fn drm_allowed_enables_content_protection() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, true);
    let (mut src, mut dst) = images();
    dst.drm = true;

    sc.configure(&src, &dst).unwrap();
    assert!(sc.session().drm());
    let _fences = sc.run(&mut src, &mut dst).unwrap();
    assert!(device
        .calls()
        .contains(&Call::Control(ControlId::ContentProtection, 1)));
}

#[test]
fn configure_resolves_images() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    src.crop = Rect::new(0, 0, 32, 64);
    dst.transform = sys::HAL_TRANSFORM_ROT_90 | sys::HAL_TRANSFORM_FLIP_H;
    dst.narrow_rgb = true;

    sc.configure(&src, &dst).unwrap();
    let s = sc.session();
    assert_eq!(s.descriptor(Queue::Source).frame().unwrap().fourcc, NV12M);
    assert_eq!(s.descriptor(Queue::Source).crop(), Some(Rect::new(0, 0, 32, 64)));
    assert_eq!(s.descriptor(Queue::Destination).frame().unwrap().fourcc, RGB32);
    assert_eq!(s.transform().rotation, Rotation::Rotation90);
    assert!(s.transform().flip_h);
    assert!(!s.transform().flip_v);
    assert_eq!(s.csc_range(), CscRange::Narrow);

    dst.transform = sys::HAL_TRANSFORM_ROT_270;
    dst.narrow_rgb = false;
    sc.configure(&src, &dst).unwrap();
    let s = sc.session();
    assert_eq!(s.transform().rotation, Rotation::Rotation270);
    assert!(!s.transform().flip_h);
    assert!(!s.transform().flip_v);
    assert_eq!(s.csc_range(), CscRange::Full);

    sc.csc(false).unwrap();
    assert_eq!(sc.session().csc_range(), CscRange::Narrow);
}

#[test]
fn configure_is_all_or_nothing() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (src, mut dst) = images();
    dst.crop = Rect::new(0, 0, 40, 32);

    let err = sc.configure(&src, &dst).unwrap_err();
    assert!(matches!(err, ScalerError::OutOfBounds { .. }));
    assert!(sc.session().descriptor(Queue::Source).frame().is_none());

    let (src, mut dst) = images();
    dst.format = 0xdead;
    let err = sc.configure(&src, &dst).unwrap_err();
    assert!(matches!(err, ScalerError::NotSupported(0xdead)));
    assert!(sc.session().descriptor(Queue::Source).frame().is_none());
    assert!(device.calls().is_empty());
}

#[test]
fn run_returns_release_fences_and_wait_completes() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();

    let fences = sc.run(&mut src, &mut dst).unwrap();
    assert_ne!(fences.source.id, fences.destination.id);
    assert_eq!(device.fences().live(), 2);
    assert_eq!(sc.session().phase(), Phase::Submitted);
    assert_eq!(device.count(Op::Dequeue), 0);

    sc.wait().unwrap();
    assert_eq!(sc.session().phase(), Phase::Completed);
    assert_eq!(device.count(Op::Dequeue), 2);
    assert_eq!(device.count(Op::StreamOff), 2);

    // nothing is pending any more, a second wait fails without blocking
    let err = sc.wait().unwrap_err();
    assert!(matches!(
        err,
        ScalerError::NotConfigured("no pending submission")
    ));
    assert_eq!(device.count(Op::Dequeue), 2);

    drop(fences);
    assert_eq!(device.fences().live(), 0);
}

#[test]
fn wait_without_submission_fails() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);

    let err = sc.wait().unwrap_err();
    assert!(matches!(err, ScalerError::NotConfigured(_)));
    assert!(device.calls().is_empty());
}

#[test]
fn run_before_configure_keeps_fences() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    src.acquire_fence = Some(device.fence());

    let err = sc.run(&mut src, &mut dst).unwrap_err();
    assert!(matches!(err, ScalerError::NotConfigured(_)));
    assert!(src.acquire_fence.is_some());
    assert_eq!(device.fences().live(), 1);
}

#[test]
fn resubmission_before_wait_is_busy() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();
    let _fences = sc.run(&mut src, &mut dst).unwrap();

    src.acquire_fence = Some(device.fence());
    let err = sc.run(&mut src, &mut dst).unwrap_err();
    assert!(matches!(err, ScalerError::Busy));
    assert!(src.acquire_fence.is_some());
    assert_eq!(device.count(Op::StreamOn), 2);

    let err = sc.configure(&src, &dst).unwrap_err();
    assert!(matches!(err, ScalerError::Busy));
    assert_eq!(sc.session().phase(), Phase::Submitted);
}

#[test]
fn acquire_fences_are_consumed() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();
    src.acquire_fence = Some(device.fence());
    dst.acquire_fence = Some(device.fence());

    let fences = sc.run(&mut src, &mut dst).unwrap();
    assert!(src.acquire_fence.is_none());
    assert!(dst.acquire_fence.is_none());
    assert_eq!(device.fences().opened(), 4);
    assert_eq!(device.fences().closed(), 2);

    let queued: Vec<_> = device
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Queue { acquire_fence: true, .. }))
        .collect();
    assert_eq!(queued.len(), 2);
    drop(fences);
}

#[test]
fn stream_on_failure_closes_every_fence() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();
    src.acquire_fence = Some(device.fence());
    device.fail_on(Op::StreamOn);

    let err = sc.run(&mut src, &mut dst).unwrap_err();
    assert!(matches!(
        err,
        ScalerError::DeviceRejected {
            op: "VIDIOC_STREAMON",
            ..
        }
    ));
    // one acquire fence and both release fences, all closed
    assert_eq!(device.fences().opened(), 3);
    assert_eq!(device.fences().live(), 0);
    assert_eq!(sc.session().phase(), Phase::Bound);

    let released = device
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::RequestBuffers(_, MemoryType::DmaBuf, 0)))
        .count();
    assert_eq!(released, 2);
}

#[test]
fn destination_queue_failure_closes_source_fence() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();
    device.fail_on_nth(Op::Queue, 1);

    let err = sc.run(&mut src, &mut dst).unwrap_err();
    assert!(matches!(
        err,
        ScalerError::DeviceRejected {
            op: "VIDIOC_QBUF",
            ..
        }
    ));
    assert_eq!(device.fences().opened(), 1);
    assert_eq!(device.fences().live(), 0);
    assert_eq!(device.count(Op::StreamOn), 0);
}

#[test]
fn completed_session_reruns_full_sequence() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();

    for _ in 0..3 {
        let fences = sc.run(&mut src, &mut dst).unwrap();
        sc.wait().unwrap();
        drop(fences);
    }
    assert_eq!(device.count(Op::Format), 6);
    assert_eq!(device.count(Op::StreamOn), 6);
    assert_eq!(device.count(Op::Dequeue), 6);
    assert_eq!(device.fences().live(), 0);
}

#[test]
fn stop_halts_a_pending_submission() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();
    let _fences = sc.run(&mut src, &mut dst).unwrap();

    sc.stop().unwrap();
    assert_eq!(sc.session().phase(), Phase::Stopped);
    assert_eq!(device.count(Op::StreamOff), 2);

    sc.stop().unwrap();
    assert_eq!(device.count(Op::StreamOff), 2);

    let err = sc.wait().unwrap_err();
    assert!(matches!(err, ScalerError::NotConfigured(_)));

    let _fences = sc.run(&mut src, &mut dst).unwrap();
    assert_eq!(sc.session().phase(), Phase::Submitted);
}

#[test]
fn close_reports_stop_failure() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();
    let _fences = sc.run(&mut src, &mut dst).unwrap();
    device.fail_on(Op::StreamOff);

    let err = sc.close().unwrap_err();
    assert!(matches!(
        err,
        ScalerError::DeviceRejected {
            op: "VIDIOC_STREAMOFF",
            ..
        }
    ));
    // the rest of the teardown still ran
    assert_eq!(device.count(Op::StreamOff), 2);
    assert_eq!(
        device
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::RequestBuffers(_, _, 0)))
            .count(),
        2
    );
}

#[test]
fn failed_run_closes_acquire_fences() {
    let device = FakeDevice::new();
    let mut sc = scaler(&device, false);
    let (mut src, mut dst) = images();
    sc.configure(&src, &dst).unwrap();
    src.acquire_fence = Some(device.fence());
    dst.acquire_fence = Some(device.fence());
    device.fail_on(Op::Control);

    let err = sc.run(&mut src, &mut dst).unwrap_err();
    assert!(matches!(
        err,
        ScalerError::DeviceRejected {
            op: "VIDIOC_S_CTRL",
            ..
        }
    ));
    assert!(src.acquire_fence.is_none());
    assert!(dst.acquire_fence.is_none());
    assert_eq!(device.fences().live(), 0);
    assert_eq!(device.count(Op::Queue), 0);
    assert_eq!(sc.session().phase(), Phase::Bound);

    // the next attempt runs without the closed fences
    let fences = sc.run(&mut src, &mut dst).unwrap();
    assert!(!device
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Queue { acquire_fence: true, .. })));
    sc.wait().unwrap();
    drop(fences);
    assert_eq!(device.fences().live(), 0);
}
