//! Core types and error definitions for class_dataset.

use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, ClassDatasetError>;

#[derive(Debug, Error)]
pub enum ClassDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("dataset validation failed at {path}: {msg}")]
    Validation { path: PathBuf, msg: String },
    #[error("{0}")]
    Other(String),
}

/// One image file on disk plus the binary label implied by its class folder.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    pub path: PathBuf,
    /// 0.0 for the first class (sorted by folder name), 1.0 for the second.
    pub label: f32,
}

/// A decoded, resized sample held in memory for reuse across epochs.
#[derive(Debug, Clone)]
pub struct LoadedSample {
    pub rgb: image::RgbImage,
    pub label: f32,
}

/// Whether stochastic transforms are active. In `Eval` every transform is the
/// identity, so validation and inference see pixels exactly as loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugMode {
    Train,
    Eval,
}
