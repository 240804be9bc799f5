#![deny(clippy::wildcard_imports)]

pub mod device;
pub mod frame;
pub mod job;
pub mod tensor;

pub use device::{Device, DeviceParseError};
pub use frame::EncodedFrame;
pub use job::{Job, JobValue};
pub use tensor::Tensor;
