// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use nix::{
    errno::Errno,
    poll::{poll, PollFd, PollFlags},
};
use std::{
    io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd},
    time::Duration,
};

/// Sync file fence handed between the caller and the scaler driver.
///
/// Input fences are given to the scaler when a buffer is bound and are
/// consumed by the driver when the buffer is queued. Release fences are
/// returned by a successful exclusive submission and signal once the
/// device is done with the buffer. The descriptor is closed on drop.
#[derive(Debug)]
pub struct SyncFence {
    fd: OwnedFd,
}

impl SyncFence {
    /// Blocks until the fence signals.
    ///
    /// With `timeout` set, gives up with [`io::ErrorKind::TimedOut`] once it
    /// elapses. The scaler itself never applies a timeout.
    pub fn wait(&self, timeout: Option<Duration>) -> io::Result<()> {
        let timeout_ms = match timeout {
            Some(t) => t.as_millis().min(i32::MAX as u128) as i32,
            None => -1,
        };

        loop {
            let mut fds = [PollFd::new(&self.fd, PollFlags::POLLIN)];
            match poll(&mut fds, timeout_ms) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::TimedOut)),
                Ok(_) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

impl From<OwnedFd> for SyncFence {
    fn from(fd: OwnedFd) -> Self {
        SyncFence { fd }
    }
}

impl FromRawFd for SyncFence {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        SyncFence {
            fd: OwnedFd::from_raw_fd(fd),
        }
    }
}

impl AsFd for SyncFence {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for SyncFence {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl IntoRawFd for SyncFence {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}

/// Release fences of one exclusive submission.
#[derive(Debug)]
pub struct ReleaseFences<F> {
    /// Signals when the device has finished reading the source buffer.
    pub source: F,
    /// Signals when the device has finished writing the destination buffer.
    pub destination: F,
}
