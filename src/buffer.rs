// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use dma_heap::{Heap, HeapKind};
use edgefirst_scaler::FourCC;
use scaler_sys::SC_NUM_OF_PLANES;
use std::{
    error::Error,
    fmt,
    os::fd::{AsRawFd, OwnedFd},
};
use tracing::debug;

/// Image in CMA memory, one DMA buffer per memory plane of its format.
pub struct DmaImage {
    planes: Vec<OwnedFd>,
    width: u32,
    height: u32,
    format: FourCC,
}

impl DmaImage {
    pub fn new(width: u32, height: u32, format: FourCC) -> Result<Self, Box<dyn Error>> {
        let layout = format
            .layout()
            .ok_or_else(|| format!("no plane layout for {format}"))?;
        let heap = Heap::new(HeapKind::Cma)?;

        let mut planes = Vec::with_capacity(layout.num_planes());
        for size in layout
            .plane_sizes(width, height)
            .into_iter()
            .take(layout.num_planes())
        {
            planes.push(heap.allocate(size as usize)?);
        }
        debug!("Allocated {format} {width}x{height} in {} DMA buffer(s)", planes.len());

        Ok(Self {
            planes,
            width,
            height,
            format,
        })
    }

    /// Plane addresses in the form bound to a dma-buf session: the buffer
    /// descriptors, zero for unused planes.
    pub fn addrs(&self) -> [usize; SC_NUM_OF_PLANES] {
        let mut addrs = [0; SC_NUM_OF_PLANES];
        for (addr, fd) in addrs.iter_mut().zip(&self.planes) {
            *addr = fd.as_raw_fd() as usize;
        }
        addrs
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> FourCC {
        self.format
    }
}

impl fmt::Display for DmaImage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} {} fds {:?}",
            self.width,
            self.height,
            self.format,
            self.planes.iter().map(|fd| fd.as_raw_fd()).collect::<Vec<_>>()
        )
    }
}
