/// Interleaved 8-bit pixel layouts that cross the frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.channels() == 4
    }

    /// Red and blue are stored swapped relative to RGB order.
    pub fn is_bgr(&self) -> bool {
        matches!(self, PixelFormat::Bgr8 | PixelFormat::Bgra8)
    }

    /// Bytes needed for `pixels` pixels, `None` on overflow.
    pub fn frame_len(&self, pixels: usize) -> Option<usize> {
        pixels.checked_mul(self.channels())
    }
}
