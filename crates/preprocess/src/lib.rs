//! Deterministic image preprocessing for the leaf-disease classifier.
//!
//! Every input, whatever its size or pixel format, is turned into a
//! `(1, 3, 224, 224)` NCHW tensor normalized with the ImageNet statistics the
//! network was trained with.

pub mod config;
pub mod cpu;
pub mod error;

use ndarray::Array4;

pub use config::{IMAGENET_MEAN, IMAGENET_STD, INPUT_SIZE, RESIZE_SHORTER_EDGE};
pub use cpu::{preprocess, preprocess_image, preprocess_path};
pub use error::PreprocessError;

/// Normalized NCHW batch of one image, shape `(1, 3, INPUT_SIZE, INPUT_SIZE)`.
pub type ImageTensor = Array4<f32>;
