// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod common;

use common::{Call, FakeOpener, BLOCKING_RUN};
use edgefirst_scaler::{
    device::{ControlId, DeviceFormat, Plane},
    copy_pixels,
    format::{BGR32, RGB32},
    MemoryType, PixelInfo, PixelSide, Queue, Rect, ScalerError,
};
use scaler_sys as sys;

fn info() -> PixelInfo {
    PixelInfo {
        src: PixelSide::new(0x10_0000, 64, 64, sys::EXYNOS_SC_FMT_RGB32),
        dst: PixelSide::new(0x20_0000, 32, 32, sys::EXYNOS_SC_FMT_BGR32),
        rotate: 0,
        hflip: false,
        vflip: false,
    }
}

#[test]
fn copy_scales_between_user_buffers() {
    let opener = FakeOpener::default();

    copy_pixels(&opener, &info(), 2).unwrap();
    assert_eq!(*opener.opened.lock().unwrap(), vec![2]);

    let device = &opener.device;
    assert_eq!(device.ops(), BLOCKING_RUN);
    let calls = device.calls();
    assert!(calls.contains(&Call::Format(
        Queue::Source,
        DeviceFormat {
            width: 64,
            height: 64,
            fourcc: RGB32,
            premultiplied: false,
        }
    )));
    assert!(calls.contains(&Call::Format(
        Queue::Destination,
        DeviceFormat {
            width: 32,
            height: 32,
            fourcc: BGR32,
            premultiplied: false,
        }
    )));
    assert!(calls.contains(&Call::Queue {
        queue: Queue::Destination,
        memory: MemoryType::UserPtr,
        planes: vec![Plane {
            addr: 0x20_0000,
            length: 32 * 32 * 4,
        }],
        cacheable: false,
        acquire_fence: false,
    }));
}

#[test]
fn copy_applies_crop_and_rotation() {
    let opener = FakeOpener::default();
    let mut info = info();
    info.src.crop = Rect::new(16, 16, 32, 32);
    info.rotate = 270;
    info.vflip = true;

    copy_pixels(&opener, &info, 0).unwrap();
    let calls = opener.device.calls();
    assert!(calls.contains(&Call::Crop(Queue::Source, Rect::new(16, 16, 32, 32))));
    assert!(calls.contains(&Call::Control(ControlId::Rotate, 270)));
    assert!(calls.contains(&Call::Control(ControlId::VFlip, 1)));
}

#[test]
fn unknown_format_never_reaches_the_device() {
    let opener = FakeOpener::default();
    let mut info = info();
    info.dst.format = 0x7f;

    let err = copy_pixels(&opener, &info, 0).unwrap_err();
    assert!(matches!(err, ScalerError::NotSupported(0x7f)));
    assert!(opener.device.calls().is_empty());
}

#[test]
fn oversized_crop_never_reaches_the_device() {
    let opener = FakeOpener::default();
    let mut info = info();
    info.dst.crop = Rect::new(0, 0, 40, 32);

    let err = copy_pixels(&opener, &info, 0).unwrap_err();
    assert!(matches!(err, ScalerError::OutOfBounds { .. }));
    assert!(opener.device.calls().is_empty());
}

#[test]
fn bad_rotation_is_rejected() {
    let opener = FakeOpener::default();
    let mut info = info();
    info.rotate = 45;

    let err = copy_pixels(&opener, &info, 0).unwrap_err();
    assert!(matches!(err, ScalerError::InvalidRotation(45)));
    assert!(opener.device.calls().is_empty());
}

#[test]
fn missing_device_fails_open() {
    let opener = FakeOpener {
        missing: true,
        ..Default::default()
    };

    let err = copy_pixels(&opener, &info(), 9).unwrap_err();
    assert!(matches!(err, ScalerError::DeviceRejected { op: "open", .. }));
}
