// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;
mod buffer;

use args::{Args, Mode};
use buffer::DmaImage;
use clap::Parser;
use edgefirst_scaler::{
    format::resolve_hal_format, Configure, CscRange, Exclusive, ExclusiveScaler, FrameConfig,
    MemoryType, Rect, Scaler, ScalerImage, V4l2Opener,
};
use std::{
    error::Error,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, Layer};

fn update_fps(prev: &mut Instant, history: &mut [i64], index: &mut usize) -> i64 {
    let now = Instant::now();

    let elapsed = now.duration_since(*prev);
    *prev = now;

    history[*index] = 1e9 as i64 / elapsed.as_nanos().max(1) as i64;
    *index = (*index + 1) % history.len();

    (history.iter().sum::<i64>() as f64 / history.len() as f64).round() as i64
}

fn init_tracing(args: &Args) -> Result<Option<tracy_client::Client>, Box<dyn Error>> {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let stdout_log = tracing_subscriber::fmt::layer().with_filter(level);
    let journald = if args.journald {
        Some(tracing_journald::layer()?.with_filter(level))
    } else {
        None
    };

    let (tracy, client) = if args.tracy {
        let client = tracy_client::Client::start();
        let layer = tracing_tracy::TracyLayer::default().with_filter(level);
        (Some(layer), Some(client))
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(stdout_log)
        .with(journald)
        .with(tracy);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    Ok(client)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let _tracy = init_tracing(&args)?;

    info!("EdgeFirst Scaler {}", env!("CARGO_PKG_VERSION"));

    let src_format = resolve_hal_format(args.src_format.hal())?;
    let dst_format = resolve_hal_format(args.dst_format.hal())?;
    let src = DmaImage::new(args.src_size[0], args.src_size[1], src_format)?;
    let dst = DmaImage::new(args.dst_size[0], args.dst_size[1], dst_format)?;
    debug!("source {src}");
    debug!("destination {dst}");

    let start = Instant::now();
    let fps = match args.mode {
        Mode::Blocking => run_blocking(&args, &src, &dst)?,
        Mode::Exclusive => run_exclusive(&args, &src, &dst)?,
    };
    info!(
        "{} frames {src_format} {}x{} -> {dst_format} {}x{} in {:?} ({fps} fps)",
        args.count,
        src.width(),
        src.height(),
        dst.width(),
        dst.height(),
        start.elapsed()
    );

    Ok(())
}

fn frame_config(image: &DmaImage, crop: Rect, drm: bool) -> FrameConfig {
    FrameConfig {
        width: image.width(),
        height: image.height(),
        crop,
        fourcc: image.format(),
        cacheable: false,
        drm,
        premultiplied: false,
    }
}

fn src_crop(args: &Args, src: &DmaImage) -> Rect {
    match args.src_crop() {
        Some((left, top, width, height)) => Rect::new(left, top, width, height),
        None => Rect::full(src.width(), src.height()),
    }
}

fn run_blocking(args: &Args, src: &DmaImage, dst: &DmaImage) -> Result<i64, Box<dyn Error>> {
    let mut sc = Scaler::open(&V4l2Opener, args.device, args.drm)?;

    sc.set_src_format(&frame_config(src, src_crop(args, src), args.drm))?;
    let dst_crop = Rect::full(dst.width(), dst.height());
    sc.set_dst_format(&frame_config(dst, dst_crop, args.drm))?;
    let (degrees, flip_h, flip_v) = args.rotation();
    sc.set_rotation(degrees, flip_h, flip_v)?;
    sc.set_csc_property(CscRange::from_wide(!args.narrow_rgb), args.filter)?;
    sc.bind_src(src.addrs(), MemoryType::DmaBuf, None)?;
    sc.bind_dst(dst.addrs(), MemoryType::DmaBuf, None)?;

    let mut prev = Instant::now();
    let mut history = vec![0; 30];
    let mut index = 0;
    let mut fps = 0;
    for frame in 0..args.count {
        sc.run()?;
        fps = update_fps(&mut prev, &mut history, &mut index);
        debug!("frame {frame} done");
    }

    sc.close()?;
    Ok(fps)
}

fn run_exclusive(args: &Args, src: &DmaImage, dst: &DmaImage) -> Result<i64, Box<dyn Error>> {
    let mut sc = ExclusiveScaler::open(&V4l2Opener, args.device, args.drm)?;

    let mut src_img = ScalerImage::new(src.width(), src.height(), args.src_format.hal());
    src_img.planes = src.addrs();
    src_img.crop = src_crop(args, src);
    src_img.drm = args.drm;
    let mut dst_img = ScalerImage::new(dst.width(), dst.height(), args.dst_format.hal());
    dst_img.planes = dst.addrs();
    dst_img.transform = args.hal_transform();
    dst_img.narrow_rgb = args.narrow_rgb;
    dst_img.drm = args.drm;
    sc.configure(&src_img, &dst_img)?;
    sc.set_csc_property(CscRange::from_wide(!args.narrow_rgb), args.filter)?;

    let timeout = Duration::from_millis(args.fence_timeout);
    let mut prev = Instant::now();
    let mut history = vec![0; 30];
    let mut index = 0;
    let mut fps = 0;
    for frame in 0..args.count {
        let fences = sc.run(&mut src_img, &mut dst_img)?;
        if let Err(e) = fences.destination.wait(Some(timeout)) {
            warn!("frame {frame}: release fence not signaled after {timeout:?}");
            sc.stop()?;
            return Err(e.into());
        }
        sc.wait()?;
        fps = update_fps(&mut prev, &mut history, &mut index);
        debug!("frame {frame} done");
    }

    sc.close()?;
    Ok(fps)
}
