//! Typed error enums for checkpoint loading, stage execution, and apply.
//!
//! [`ModelError`] covers everything below the runner boundary; [`ApplyError`]
//! is what a submitted job can fail with and wraps `ModelError` transparently.

use std::path::PathBuf;

use thiserror::Error;

use stylecast_core::Device;

/// Errors produced while loading checkpoints or running model stages.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Checkpoint file could not be opened or mapped.
    #[error("failed to read checkpoint {path}: {source}")]
    CheckpointRead {
        /// Checkpoint location on disk.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Checkpoint contents are not a valid safetensors document.
    #[error("failed to parse checkpoint {path}: {source}")]
    CheckpointParse {
        /// Checkpoint location on disk.
        path: PathBuf,
        /// Underlying safetensors error.
        #[source]
        source: safetensors::SafeTensorError,
    },
    /// A required tensor is absent from the checkpoint.
    #[error("checkpoint {path} has no tensor '{name}'")]
    MissingTensor {
        /// Checkpoint location on disk.
        path: PathBuf,
        /// Name of the missing tensor.
        name: &'static str,
    },
    /// A checkpoint tensor uses a dtype other than f32.
    #[error("tensor '{name}' in {path} is {dtype}, expected F32")]
    UnsupportedDtype {
        /// Checkpoint location on disk.
        path: PathBuf,
        /// Name of the offending tensor.
        name: String,
        /// Dtype actually stored.
        dtype: String,
    },
    /// A checkpoint tensor has the wrong rank for its role.
    #[error("tensor '{name}' has shape {shape:?}, expected rank {expected_rank}")]
    TensorRank {
        /// Name of the offending tensor.
        name: &'static str,
        /// Shape actually stored.
        shape: Vec<usize>,
        /// Rank the role requires.
        expected_rank: usize,
    },
    /// Stage weight shapes are mutually inconsistent.
    #[error("inconsistent stage weights: {message}")]
    WeightMismatch {
        /// What disagreed with what.
        message: String,
    },
    /// A stage received an input with an unusable shape.
    #[error("{stage} stage got input of shape {shape:?}: {message}")]
    InputShape {
        /// Stage that rejected the input.
        stage: &'static str,
        /// Offending input shape.
        shape: Vec<usize>,
        /// Why the shape is unusable.
        message: String,
    },
    /// `load` was called on a runner that already holds its stages.
    #[error("runner for {device} is already loaded")]
    AlreadyLoaded {
        /// Device the runner is bound to.
        device: Device,
    },
    /// A style image could not be opened or decoded.
    #[error("failed to load style image {path}: {source}")]
    StyleImage {
        /// Image location on disk.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },
}

/// Errors a submitted job can fail with.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The job payload lacks a parameter the runner requires.
    #[error("job is missing required parameter '{name}'")]
    MissingParam {
        /// Name of the absent parameter.
        name: &'static str,
    },
    /// `apply` was called before `load`.
    #[error("runner for {device} has not been loaded")]
    NotLoaded {
        /// Device the runner is bound to.
        device: Device,
    },
    /// Wrapped stage or checkpoint failure.
    #[error(transparent)]
    Model(#[from] ModelError),
}
