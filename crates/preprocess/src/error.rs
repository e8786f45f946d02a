use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("cannot read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("resize failed: {0}")]
    Resize(String),

    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl From<fast_image_resize::ResizeError> for PreprocessError {
    fn from(e: fast_image_resize::ResizeError) -> Self {
        PreprocessError::Resize(e.to_string())
    }
}

impl From<fast_image_resize::ImageBufferError> for PreprocessError {
    fn from(e: fast_image_resize::ImageBufferError) -> Self {
        PreprocessError::Resize(e.to_string())
    }
}
