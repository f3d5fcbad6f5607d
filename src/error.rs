use std::{io, path::PathBuf};

use burn::record::RecorderError;

/// Failures while loading the image dataset. Loading has no per-file
/// recovery: the first bad entry aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("data directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("missing category directory: {}", .0.display())]
    MissingCategory(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Malformed input to the train/test splitter.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("cannot split an empty dataset")]
    Empty,

    #[error("images and labels differ in length: {images} images, {labels} labels")]
    LengthMismatch { images: usize, labels: usize },

    #[error("held-out fraction must lie in (0, 1), got {0}")]
    InvalidFraction(f64),
}

/// Any fatal failure of a training run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error("failed to save model to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        source: RecorderError,
    },
}
