// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::error::{Result, ScalerError};
use scaler_sys as sys;

/// Rectangle specification for crop operations.
///
/// Defines the region of a frame the scaler reads from (source) or writes to
/// (destination).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub left: u32,
    /// Y coordinate of top-left corner
    pub top: u32,
    /// Width of the rectangle in pixels
    pub width: u32,
    /// Height of the rectangle in pixels
    pub height: u32,
}

impl Rect {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    /// The whole `width` x `height` frame.
    pub const fn full(width: u32, height: u32) -> Self {
        Rect::new(0, 0, width, height)
    }
}

/// Image rotation angles supported by the scaler, clockwise.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Rotation0 = 0,
    Rotation90 = 90,
    Rotation180 = 180,
    Rotation270 = 270,
}

impl Rotation {
    /// Normalizes any multiple of 90 degrees, negative values included.
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(ScalerError::InvalidRotation(degrees));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::Rotation0,
            90 => Rotation::Rotation90,
            180 => Rotation::Rotation180,
            _ => Rotation::Rotation270,
        })
    }

    pub fn degrees(self) -> i32 {
        self as i32
    }
}

/// Rotation and flips the device applies while scaling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Transform {
    pub rotation: Rotation,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Transform {
    pub fn new(degrees: i32, flip_h: bool, flip_v: bool) -> Result<Self> {
        Ok(Transform {
            rotation: Rotation::from_degrees(degrees)?,
            flip_h,
            flip_v,
        })
    }

    /// Derives the device transform from a platform HAL transform code.
    ///
    /// The literal rotate-270 code wins over its own flip and rotate-90 bits.
    /// Every other code maps each bit independently, so a 180 degree turn
    /// arrives as both flips at rotation 0.
    pub fn from_hal(code: u32) -> Self {
        if code == sys::HAL_TRANSFORM_ROT_270 {
            return Transform {
                rotation: Rotation::Rotation270,
                flip_h: false,
                flip_v: false,
            };
        }

        Transform {
            rotation: if code & sys::HAL_TRANSFORM_ROT_90 != 0 {
                Rotation::Rotation90
            } else {
                Rotation::Rotation0
            },
            flip_h: code & sys::HAL_TRANSFORM_FLIP_H != 0,
            flip_v: code & sys::HAL_TRANSFORM_FLIP_V != 0,
        }
    }
}

/// Checks that `crop` lies inside a `frame_width` x `frame_height` frame.
pub fn validate_crop(frame_width: u32, frame_height: u32, crop: &Rect) -> Result<()> {
    let right = crop.left as u64 + crop.width as u64;
    let bottom = crop.top as u64 + crop.height as u64;

    if right > frame_width as u64 || bottom > frame_height as u64 {
        return Err(ScalerError::OutOfBounds {
            frame_width,
            frame_height,
            left: crop.left,
            top: crop.top,
            width: crop.width,
            height: crop.height,
        });
    }

    Ok(())
}
