use crate::{ImageError, PixelFormat};

fn check_layout(
    src: &[u8],
    src_channels: usize,
    dst: &[u8],
    dst_channels: usize,
) -> Result<usize, ImageError> {
    if src.len() % src_channels != 0 {
        return Err(ImageError::Layout {
            expected: src.len() / src_channels * src_channels,
            got: src.len(),
        });
    }
    let pixels = src.len() / src_channels;
    let expected = pixels * dst_channels;
    if dst.len() != expected {
        return Err(ImageError::Layout {
            expected,
            got: dst.len(),
        });
    }
    Ok(pixels)
}

/// Convert an interleaved buffer in `format` to interleaved RGB.
///
/// Alpha is dropped; BGR orders are swapped into RGB.
pub fn unpack_rgb(format: PixelFormat, src: &[u8], rgb: &mut [u8]) -> Result<(), ImageError> {
    let channels = format.channels();
    check_layout(src, channels, rgb, 3)?;
    for (px, out) in src.chunks_exact(channels).zip(rgb.chunks_exact_mut(3)) {
        if format.is_bgr() {
            out.copy_from_slice(&[px[2], px[1], px[0]]);
        } else {
            out.copy_from_slice(&px[..3]);
        }
    }
    Ok(())
}

/// Convert interleaved RGB into `format`. Formats with alpha get an opaque alpha of 255.
pub fn pack_rgb(format: PixelFormat, rgb: &[u8], dst: &mut [u8]) -> Result<(), ImageError> {
    let channels = format.channels();
    check_layout(rgb, 3, dst, channels)?;
    for (px, out) in rgb.chunks_exact(3).zip(dst.chunks_exact_mut(channels)) {
        if format.is_bgr() {
            out[..3].copy_from_slice(&[px[2], px[1], px[0]]);
        } else {
            out[..3].copy_from_slice(px);
        }
        if format.has_alpha() {
            out[3] = 255;
        }
    }
    Ok(())
}
