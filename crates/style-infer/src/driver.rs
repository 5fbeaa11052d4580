//! Running frames through a prepared session.

use crate::codec::CHANNELS;
use crate::{InferError, StyleSession, codec};
use std::time::{Duration, Instant};
use style_image::{PixelFormat, pack_rgb, unpack_rgb};

/// Stylize one caller-owned frame in place.
///
/// The frame must hold exactly `width * height` pixels of `format`. Nothing is
/// written back unless the whole pipeline succeeded, so on error the caller's
/// frame still holds the original pixels.
pub fn run_on_frame(
    session: &mut StyleSession,
    frame: &mut [u8],
    format: PixelFormat,
) -> Result<(), InferError> {
    let pixels = session.pixel_count();
    let expected = format
        .frame_len(pixels)
        .ok_or(InferError::InvalidDimensions {
            width: session.width,
            height: session.height,
        })?;
    if frame.len() != expected {
        return Err(InferError::FrameSize {
            expected,
            got: frame.len(),
        });
    }

    let StyleSession {
        session: inner,
        normalization,
        rgb,
        packed,
        ..
    } = session;

    unpack_rgb(format, frame, rgb)?;
    codec::encode_frame(rgb, inner.input_mut())?;
    inner.infer()?;
    codec::decode_frame(inner.output(), rgb, normalization)?;

    if format == PixelFormat::Rgb8 {
        frame.copy_from_slice(rgb);
    } else {
        let out = &mut packed[..expected];
        pack_rgb(format, rgb, out)?;
        frame.copy_from_slice(out);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub iteration: usize,
    pub elapsed: Duration,
}

impl FrameTiming {
    pub fn millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { 1.0 / secs } else { f64::INFINITY }
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub timings: Vec<FrameTiming>,
    /// Stylized RGB from the last iteration.
    pub output: Vec<u8>,
}

impl BenchmarkReport {
    pub fn mean(&self) -> Duration {
        if self.timings.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.timings.iter().map(|t| t.elapsed).sum();
        total / self.timings.len() as u32
    }
}

/// Run the same RGB image `iterations` times, timing each encode/infer/decode round.
///
/// Every iteration starts from a fresh copy of `rgb`. `on_frame` sees each
/// timing as it is measured.
pub fn benchmark(
    session: &mut StyleSession,
    rgb: &[u8],
    iterations: usize,
    mut on_frame: impl FnMut(&FrameTiming),
) -> Result<BenchmarkReport, InferError> {
    let expected = session.pixel_count() * CHANNELS;
    if rgb.len() != expected {
        return Err(InferError::FrameSize {
            expected,
            got: rgb.len(),
        });
    }

    let mut frame = rgb.to_vec();
    let mut timings = Vec::with_capacity(iterations);
    for iteration in 0..iterations {
        frame.copy_from_slice(rgb);
        let start = Instant::now();
        session.run_rgb(&mut frame)?;
        let timing = FrameTiming {
            iteration,
            elapsed: start.elapsed(),
        };
        on_frame(&timing);
        timings.push(timing);
    }

    Ok(BenchmarkReport {
        timings,
        output: frame,
    })
}
