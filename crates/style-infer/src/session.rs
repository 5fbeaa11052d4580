use crate::codec::{CHANNELS, Normalization};
use crate::{InferError, codec};

/// A compiled model bound to a device, owning one input and one output tensor.
///
/// Both tensors are planar `[1, 3, H, W]` f32 buffers allocated at compile time
/// and reused by every `infer` call.
pub trait Session {
    fn input_shape(&self) -> [usize; 4];
    fn output_shape(&self) -> [usize; 4];
    fn input(&self) -> &[f32];
    fn input_mut(&mut self) -> &mut [f32];
    fn output(&self) -> &[f32];

    /// Run one blocking forward pass from `input` into `output`.
    fn infer(&mut self) -> Result<(), InferError>;
}

/// A compiled session plus everything needed to push frames through it.
///
/// Frame processing allocates nothing: the RGB and packed scratch buffers are
/// sized once here.
pub struct StyleSession {
    pub(crate) session: Box<dyn Session>,
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) normalization: Normalization,
    pub(crate) rgb: Vec<u8>,
    pub(crate) packed: Vec<u8>,
}

impl StyleSession {
    pub fn new(
        mut session: Box<dyn Session>,
        normalization: Normalization,
    ) -> Result<Self, InferError> {
        let shape = session.input_shape();
        let [batch, channels, height, width] = shape;
        if batch != 1 || channels != CHANNELS {
            return Err(InferError::ShapeMismatch {
                expected: format!("[1, {CHANNELS}, H, W]"),
                got: format!("{shape:?}"),
            });
        }
        if session.output_shape() != shape {
            return Err(InferError::ShapeMismatch {
                expected: format!("output {shape:?}"),
                got: format!("{:?}", session.output_shape()),
            });
        }
        if width == 0 || height == 0 {
            return Err(InferError::InvalidDimensions { width, height });
        }

        let pixels = width
            .checked_mul(height)
            .ok_or(InferError::InvalidDimensions { width, height })?;
        let tensor_len = pixels * CHANNELS;
        for len in [session.input_mut().len(), session.output().len()] {
            if len != tensor_len {
                return Err(InferError::FrameSize {
                    expected: tensor_len,
                    got: len,
                });
            }
        }

        Ok(Self {
            session,
            width,
            height,
            normalization,
            rgb: vec![0; pixels * CHANNELS],
            packed: vec![0; pixels * 4],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn input(&self) -> &[f32] {
        self.session.input()
    }

    /// Stylize an interleaved RGB frame in place.
    ///
    /// `rgb` is only written after inference succeeded.
    pub fn run_rgb(&mut self, rgb: &mut [u8]) -> Result<(), InferError> {
        let expected = self.pixel_count() * CHANNELS;
        if rgb.len() != expected {
            return Err(InferError::FrameSize {
                expected,
                got: rgb.len(),
            });
        }
        codec::encode_frame(rgb, self.session.input_mut())?;
        self.session.infer()?;
        codec::decode_frame(self.session.output(), rgb, &self.normalization)
    }
}
