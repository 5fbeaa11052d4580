//! Conversion between interleaved 8-bit RGB and the planar float tensor.
//!
//! For `N` pixels, channel `c` of pixel `p` lives at tensor offset `c * N + p`.
//! Encoding only scales to `[0, 1]`; decoding undoes the network's output
//! normalization with the per-channel mean and standard deviation.

use crate::InferError;
use serde::{Deserialize, Serialize};

pub const CHANNELS: usize = 3;

/// Per-channel output statistics, channel order R, G, B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: [f32; CHANNELS],
    pub std: [f32; CHANNELS],
}

impl Normalization {
    /// Statistics the shipped style models were trained with.
    pub const IMAGENET: Normalization = Normalization {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    pub fn new(mean: [f32; CHANNELS], std: [f32; CHANNELS]) -> Result<Self, InferError> {
        let normalization = Self { mean, std };
        normalization.validate()?;
        Ok(normalization)
    }

    pub fn validate(&self) -> Result<(), InferError> {
        if self.mean.iter().chain(&self.std).all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(InferError::Config(format!(
                "normalization constants must be finite: {self:?}"
            )))
        }
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::IMAGENET
    }
}

#[inline]
pub fn encode_value(byte: u8) -> f32 {
    byte as f32 / 255.0
}

/// Denormalize one tensor value to a byte. Saturates at 0 and 255; NaN becomes 0.
#[inline]
pub fn decode_value(value: f32, mean: f32, std: f32) -> u8 {
    ((value * std + mean) * 255.0).clamp(0.0, 255.0).round() as u8
}

fn pixel_count(rgb_len: usize, tensor_len: usize) -> Result<usize, InferError> {
    if rgb_len % CHANNELS != 0 || tensor_len != rgb_len {
        return Err(InferError::FrameSize {
            expected: rgb_len / CHANNELS * CHANNELS,
            got: tensor_len,
        });
    }
    Ok(rgb_len / CHANNELS)
}

/// `tensor[c * N + p] = rgb[p * 3 + c] / 255`.
pub fn encode_frame(rgb: &[u8], tensor: &mut [f32]) -> Result<(), InferError> {
    let n = pixel_count(rgb.len(), tensor.len())?;
    if n == 0 {
        return Ok(());
    }
    for (c, plane) in tensor.chunks_exact_mut(n).enumerate() {
        for (p, value) in plane.iter_mut().enumerate() {
            *value = encode_value(rgb[p * CHANNELS + c]);
        }
    }
    Ok(())
}

/// `rgb[p * 3 + c] = clamp(round((tensor[c * N + p] * std[c] + mean[c]) * 255))`.
pub fn decode_frame(
    tensor: &[f32],
    rgb: &mut [u8],
    normalization: &Normalization,
) -> Result<(), InferError> {
    let n = pixel_count(rgb.len(), tensor.len())?;
    if n == 0 {
        return Ok(());
    }
    for (c, plane) in tensor.chunks_exact(n).enumerate() {
        let (mean, std) = (normalization.mean[c], normalization.std[c]);
        for (p, &value) in plane.iter().enumerate() {
            rgb[p * CHANNELS + c] = decode_value(value, mean, std);
        }
    }
    Ok(())
}
