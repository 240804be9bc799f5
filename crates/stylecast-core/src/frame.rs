use crate::device::Device;
use crate::tensor::Tensor;

/// Device-tagged pair of intermediate encoder outputs.
///
/// `front` is the fine-scale feature map, `back` the coarse-scale one
/// derived from it. A frame is only directly usable by a runner bound to
/// the same device; value semantics throughout, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    front: Tensor,
    back: Tensor,
}

impl EncodedFrame {
    /// # Panics
    /// Panics if the two tensors carry different device tags.
    pub fn new(front: Tensor, back: Tensor) -> Self {
        assert_eq!(
            front.device(),
            back.device(),
            "encoded frame halves must share a device"
        );
        Self { front, back }
    }

    pub fn device(&self) -> Device {
        self.front.device()
    }

    pub fn front(&self) -> &Tensor {
        &self.front
    }

    pub fn back(&self) -> &Tensor {
        &self.back
    }
}
