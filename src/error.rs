// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use std::io;

pub type Result<T> = std::result::Result<T, ScalerError>;

/// Reasons a scaler session operation can fail.
///
/// Setters that fail leave the session exactly as it was. Device sequences
/// that fail part way leave the session unsubmitted and release every fence
/// acquired during the failed attempt.
#[derive(thiserror::Error, Debug)]
pub enum ScalerError {
    #[error("invalid scaler handle")]
    InvalidHandle,

    #[error("unsupported pixel format {0:#x}")]
    NotSupported(u32),

    #[error("crop {left},{top} {width}x{height} exceeds frame {frame_width}x{frame_height}")]
    OutOfBounds {
        frame_width: u32,
        frame_height: u32,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    },

    #[error("protected content requested on a session opened without DRM permission")]
    PolicyViolation,

    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    #[error("rotation of {0} degrees is not a multiple of 90")]
    InvalidRotation(i32),

    #[error("a submission is still pending")]
    Busy,

    #[error("device rejected {op}")]
    DeviceRejected {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("blend plane format {blend:#x} cannot be composited onto source format {source_format:#x}")]
    IncompatibleBlend { source_format: u32, blend: u32 },
}

impl ScalerError {
    pub fn device(op: &'static str, source: io::Error) -> Self {
        Self::DeviceRejected { op, source }
    }
}
