//! Safetensors checkpoint loading.
//!
//! Checkpoints are memory-mapped, parsed once, and copied into owned f32
//! arrays; only `F32` tensors are accepted.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ndarray::{Array1, Array2, ArrayD, IxDyn};
use safetensors::SafeTensors;
use safetensors::tensor::Dtype;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Default location of the encoder weights.
pub const VGG_CHECKPOINT: &str = "model_checkpoints/vgg_normalized.safetensors";
/// Default location of the transform weights.
pub const TRANSFORMER_CHECKPOINT: &str = "model_checkpoints/transformer.safetensors";
/// Default location of the decoder weights.
pub const DECODER_CHECKPOINT: &str = "model_checkpoints/decoder.safetensors";

/// Locations of the three stage checkpoints a runner loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointPaths {
    pub vgg: PathBuf,
    pub transformer: PathBuf,
    pub decoder: PathBuf,
}

impl Default for CheckpointPaths {
    fn default() -> Self {
        Self {
            vgg: PathBuf::from(VGG_CHECKPOINT),
            transformer: PathBuf::from(TRANSFORMER_CHECKPOINT),
            decoder: PathBuf::from(DECODER_CHECKPOINT),
        }
    }
}

/// A fully-parsed checkpoint file.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    tensors: HashMap<String, ArrayD<f32>>,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|source| ModelError::CheckpointRead {
            path: path.to_path_buf(),
            source,
        })?;
        // Safety: the mapping is read-only and dropped before this function
        // returns; all tensor data is copied out below.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ModelError::CheckpointRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed =
            SafeTensors::deserialize(&mmap).map_err(|source| ModelError::CheckpointParse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut tensors = HashMap::new();
        for (name, view) in parsed.tensors() {
            if view.dtype() != Dtype::F32 {
                return Err(ModelError::UnsupportedDtype {
                    path: path.to_path_buf(),
                    name,
                    dtype: format!("{:?}", view.dtype()),
                });
            }
            let values: Vec<f32> = view
                .data()
                .chunks_exact(4)
                .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                .collect();
            let data = ArrayD::from_shape_vec(IxDyn(view.shape()), values)
                .expect("safetensors guarantees shape/data agreement");
            tensors.insert(name, data);
        }

        Ok(Self {
            path: path.to_path_buf(),
            tensors,
        })
    }

    fn tensor(&self, name: &'static str) -> Result<&ArrayD<f32>, ModelError> {
        self.tensors.get(name).ok_or(ModelError::MissingTensor {
            path: self.path.clone(),
            name,
        })
    }

    /// Fetches a rank-2 tensor by name.
    pub fn matrix(&self, name: &'static str) -> Result<Array2<f32>, ModelError> {
        let tensor = self.tensor(name)?;
        tensor
            .clone()
            .into_dimensionality()
            .map_err(|_| ModelError::TensorRank {
                name,
                shape: tensor.shape().to_vec(),
                expected_rank: 2,
            })
    }

    /// Fetches a rank-1 tensor by name.
    pub fn vector(&self, name: &'static str) -> Result<Array1<f32>, ModelError> {
        let tensor = self.tensor(name)?;
        tensor
            .clone()
            .into_dimensionality()
            .map_err(|_| ModelError::TensorRank {
                name,
                shape: tensor.shape().to_vec(),
                expected_rank: 1,
            })
    }
}
