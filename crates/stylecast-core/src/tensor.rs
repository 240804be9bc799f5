//! Device-tagged dense tensors.
//!
//! The tag records which runner's device a value belongs to; data always
//! lives host-side and moving between devices is an explicit re-materialize,
//! never an aliasing retag.

use ndarray::{ArrayD, Axis, IxDyn};

use crate::device::Device;

/// Dense f32 tensor bound to a [`Device`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
    device: Device,
}

impl Tensor {
    pub fn new(data: ArrayD<f32>, device: Device) -> Self {
        Self { data, device }
    }

    /// Builds a tensor from a shape and a flat row-major buffer.
    ///
    /// # Panics
    /// Panics if `values.len()` does not match the product of `shape`.
    pub fn from_vec(shape: &[usize], values: Vec<f32>, device: Device) -> Self {
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)
            .expect("shape product must match value count");
        Self { data, device }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Migrates the tensor to `device`, re-materializing the underlying data.
    ///
    /// Same-device migration is the identity.
    pub fn to_device(&self, device: Device) -> Tensor {
        if self.device == device {
            return self.clone();
        }
        Tensor {
            data: self.data.clone(),
            device,
        }
    }

    /// Returns a copy with a leading batch axis of length one.
    pub fn unsqueezed(&self) -> Tensor {
        Tensor {
            data: self.data.clone().insert_axis(Axis(0)),
            device: self.device,
        }
    }

    /// Returns a copy with every singleton axis removed.
    pub fn squeezed(&self) -> Tensor {
        let shape: Vec<usize> = self
            .data
            .shape()
            .iter()
            .copied()
            .filter(|&extent| extent != 1)
            .collect();
        let data = self
            .data
            .clone()
            .into_shape_with_order(IxDyn(&shape))
            .expect("dropping singleton axes preserves element count");
        Tensor {
            data,
            device: self.device,
        }
    }
}
