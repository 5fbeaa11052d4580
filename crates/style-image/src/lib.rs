//! Pixel-format plumbing for the style-transfer host.
//!
//! Color conversions between the caller's frame layout and the interleaved RGB
//! the frame codec works on, plus file decode/encode for the benchmark driver.
//! Images are `Tensor<u8>` in HWC layout: `[height, width, channels]`.

pub mod convert;
pub mod error;
pub mod pixelformat;

pub use convert::{pack_rgb, unpack_rgb};
pub use error::ImageError;
pub use pixelformat::PixelFormat;

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use std::path::Path;
use style_base::Tensor;

/// Decode an encoded image (format auto-detected) into 3-channel RGB.
pub fn decode_rgb(data: &[u8]) -> Result<Tensor<u8>, ImageError> {
    let rgb = image::load_from_memory(data)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Tensor::new(
        vec![height as usize, width as usize, 3],
        rgb.into_raw(),
    )?)
}

/// Read and decode an image file into 3-channel RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<Tensor<u8>, ImageError> {
    let data = std::fs::read(path)?;
    decode_rgb(&data)
}

/// Encode a 1, 3 or 4 channel image as PNG.
pub fn encode_png(image: &Tensor<u8>) -> Result<Vec<u8>, ImageError> {
    let (height, width, channels) = image.hwc()?;
    let color_type = match channels {
        1 => image::ExtendedColorType::L8,
        3 => image::ExtendedColorType::Rgb8,
        4 => image::ExtendedColorType::Rgba8,
        _ => {
            return Err(ImageError::Encode(format!(
                "unsupported channel count: {channels}"
            )));
        }
    };

    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(&image.data, width as u32, height as u32, color_type)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buffer)
}

pub fn save_png(path: impl AsRef<Path>, image: &Tensor<u8>) -> Result<(), ImageError> {
    std::fs::write(path, encode_png(image)?)?;
    Ok(())
}
