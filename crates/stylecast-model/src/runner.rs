//! The runner capability and its single production implementation.
//!
//! A runner is a device-bound unit with one-time blocking init (`load`) and
//! a blocking `apply`. Sub-stages are set exactly once during `load`; there
//! is no reinitialization path.

use tracing::info;

use stylecast_core::{Device, EncodedFrame, Job, JobValue, Tensor};

use crate::checkpoint::CheckpointPaths;
use crate::error::{ApplyError, ModelError};
use crate::stages::{DecoderStage, EncoderStage, ImageDecoder, StyleBlender, TransformStage, VggEncoder};

/// Job parameter carrying the content input.
pub const PARAM_SOURCE: &str = "source";
/// Job parameter carrying the style input.
pub const PARAM_STYLE: &str = "style";

/// Device-bound unit exposing one-time init and blocking apply.
pub trait Runner: Send {
    fn device(&self) -> Device;

    /// Blocking one-time initialization; must complete before any `apply`.
    fn load(&mut self) -> Result<(), ModelError>;

    /// Executes one job to completion. Blocking, arbitrarily long, and
    /// without observable effect on any other job.
    fn apply(&mut self, job: Job) -> Result<Tensor, ApplyError>;
}

/// The three sub-stages a loaded runner owns.
pub struct StageSet {
    pub encoder: Box<dyn EncoderStage>,
    pub transform: Box<dyn TransformStage>,
    pub decoder: Box<dyn DecoderStage>,
}

/// Style-transfer runner: encode-cache front end plus transform and decode.
pub struct StyleRunner {
    device: Device,
    checkpoints: CheckpointPaths,
    stages: Option<StageSet>,
}

impl StyleRunner {
    pub fn new(device: Device, checkpoints: CheckpointPaths) -> Self {
        Self {
            device,
            checkpoints,
            stages: None,
        }
    }

    /// Builds a runner around pre-constructed stages, skipping checkpoint
    /// loading. Used by tests and tooling that supply their own weights.
    pub fn with_stages(device: Device, stages: StageSet) -> Self {
        Self {
            device,
            checkpoints: CheckpointPaths::default(),
            stages: Some(stages),
        }
    }

    /// Returns a representation of `value` usable on this runner's device.
    ///
    /// Already-encoded frames tagged for this device pass through untouched.
    /// Frames tagged for another device are re-derived here from migrated
    /// data; cross-device reuse is never a cheap retag. Raw tensors run the
    /// ordered two-stage encoder.
    pub fn encode(&self, value: &JobValue) -> Result<EncodedFrame, ApplyError> {
        match value {
            JobValue::Encoded(frame) => {
                if frame.device() == self.device {
                    return Ok(frame.clone());
                }
                Ok(EncodedFrame::new(
                    frame.front().to_device(self.device),
                    frame.back().to_device(self.device),
                ))
            },
            JobValue::Raw(tensor) => {
                let stages = self.stages()?;
                let input = tensor.to_device(self.device);
                let batched = if input.shape().len() == 3 {
                    input.unsqueezed()
                } else {
                    input
                };
                let front = stages.encoder.front(&batched)?;
                let back = stages.encoder.back(&front)?;
                Ok(EncodedFrame::new(front, back))
            },
        }
    }

    fn stages(&self) -> Result<&StageSet, ApplyError> {
        self.stages.as_ref().ok_or(ApplyError::NotLoaded {
            device: self.device,
        })
    }
}

impl Runner for StyleRunner {
    fn device(&self) -> Device {
        self.device
    }

    fn load(&mut self) -> Result<(), ModelError> {
        if self.stages.is_some() {
            return Err(ModelError::AlreadyLoaded {
                device: self.device,
            });
        }
        info!(device = %self.device, "loading style transfer stages");
        let encoder = VggEncoder::from_checkpoint(&self.checkpoints.vgg)?;
        let transform = StyleBlender::from_checkpoint(&self.checkpoints.transformer)?;
        let decoder = ImageDecoder::from_checkpoint(&self.checkpoints.decoder)?;
        self.stages = Some(StageSet {
            encoder: Box::new(encoder),
            transform: Box::new(transform),
            decoder: Box::new(decoder),
        });
        Ok(())
    }

    fn apply(&mut self, mut job: Job) -> Result<Tensor, ApplyError> {
        let source = job
            .take(PARAM_SOURCE)
            .ok_or(ApplyError::MissingParam { name: PARAM_SOURCE })?;
        let style = job
            .take(PARAM_STYLE)
            .ok_or(ApplyError::MissingParam { name: PARAM_STYLE })?;

        // The two encodes are independent; neither input is mutated.
        let source = self.encode(&source)?;
        let style = self.encode(&style)?;

        let stages = self.stages()?;
        let blended = stages.transform.blend(
            source.front(),
            style.front(),
            source.back(),
            style.back(),
        )?;
        let image = stages.decoder.decode(&blended)?;
        Ok(image.squeezed())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use stylecast_core::{Device, Job, JobValue, Tensor};

    use super::{PARAM_SOURCE, PARAM_STYLE, Runner as _, StageSet, StyleRunner};
    use crate::error::{ApplyError, ModelError};
    use crate::stages::EncoderStage;
    use crate::stages::testing::{tiny_blender, tiny_decoder, tiny_encoder, tiny_stage_set};

    fn raw_input(seed: f32) -> Tensor {
        let values: Vec<f32> = (0..3 * 8 * 8).map(|i| seed + (i % 13) as f32 / 12.0).collect();
        Tensor::from_vec(&[3, 8, 8], values, Device::Cpu)
    }

    fn loaded_runner(device: Device) -> StyleRunner {
        StyleRunner::with_stages(device, tiny_stage_set())
    }

    /// Encoder wrapper counting front/back invocations.
    struct CountingEncoder {
        inner: Box<dyn EncoderStage>,
        calls: Arc<AtomicUsize>,
    }

    impl EncoderStage for CountingEncoder {
        fn front(&self, input: &Tensor) -> Result<Tensor, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.front(input)
        }

        fn back(&self, front: &Tensor) -> Result<Tensor, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.back(front)
        }
    }

    fn counting_runner(device: Device) -> (StyleRunner, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let stages = StageSet {
            encoder: Box::new(CountingEncoder {
                inner: Box::new(tiny_encoder()),
                calls: Arc::clone(&calls),
            }),
            transform: Box::new(tiny_blender()),
            decoder: Box::new(tiny_decoder()),
        };
        (StyleRunner::with_stages(device, stages), calls)
    }

    #[test]
    fn encode_of_same_device_frame_skips_the_encoder() {
        let (runner, calls) = counting_runner(Device::Cpu);
        let frame = runner
            .encode(&JobValue::Raw(raw_input(0.0)))
            .expect("raw encode");
        let before = calls.load(Ordering::SeqCst);

        let reused = runner
            .encode(&JobValue::Encoded(frame.clone()))
            .expect("cached encode");

        assert_eq!(calls.load(Ordering::SeqCst), before);
        assert_eq!(reused, frame);
    }

    #[test]
    fn encode_of_foreign_device_frame_rederives_for_this_device() {
        let cpu = loaded_runner(Device::Cpu);
        let cuda = loaded_runner(Device::Cuda(0));

        let frame = cpu
            .encode(&JobValue::Raw(raw_input(0.0)))
            .expect("cpu encode");
        let migrated = cuda
            .encode(&JobValue::Encoded(frame.clone()))
            .expect("cross-device encode");

        assert_eq!(migrated.device(), Device::Cuda(0));
        assert_eq!(migrated.front().data(), frame.front().data());
    }

    #[test]
    fn apply_is_deterministic_for_identical_inputs() {
        let mut runner = loaded_runner(Device::Cpu);
        let job = || {
            Job::new()
                .with(PARAM_SOURCE, JobValue::Raw(raw_input(0.0)))
                .with(PARAM_STYLE, JobValue::Raw(raw_input(0.5)))
        };

        let first = runner.apply(job()).expect("first apply");
        let second = runner.apply(job()).expect("second apply");
        assert_eq!(first, second);
    }

    #[test]
    fn apply_accepts_pre_encoded_parameters() {
        let mut runner = loaded_runner(Device::Cpu);
        let style = runner
            .encode(&JobValue::Raw(raw_input(0.5)))
            .expect("style encode");

        let from_raw = runner
            .apply(
                Job::new()
                    .with(PARAM_SOURCE, JobValue::Raw(raw_input(0.0)))
                    .with(PARAM_STYLE, JobValue::Raw(raw_input(0.5))),
            )
            .expect("apply with raw style");
        let from_encoded = runner
            .apply(
                Job::new()
                    .with(PARAM_SOURCE, JobValue::Raw(raw_input(0.0)))
                    .with(PARAM_STYLE, JobValue::Encoded(style)),
            )
            .expect("apply with encoded style");

        assert_eq!(from_raw, from_encoded);
    }

    #[test]
    fn apply_strips_singleton_dimensions() {
        let mut runner = loaded_runner(Device::Cpu);
        let out = runner
            .apply(
                Job::new()
                    .with(PARAM_SOURCE, JobValue::Raw(raw_input(0.0)))
                    .with(PARAM_STYLE, JobValue::Raw(raw_input(0.5))),
            )
            .expect("apply");
        assert_eq!(out.shape(), &[3, 8, 8]);
    }

    #[test]
    fn missing_parameter_is_loud() {
        let mut runner = loaded_runner(Device::Cpu);
        let err = runner
            .apply(Job::new().with(PARAM_SOURCE, JobValue::Raw(raw_input(0.0))))
            .expect_err("style parameter is absent");
        assert!(matches!(
            err,
            ApplyError::MissingParam { name: PARAM_STYLE }
        ));
    }

    #[test]
    fn apply_before_load_reports_not_loaded() {
        let mut runner = StyleRunner::new(Device::Cpu, Default::default());
        let err = runner
            .apply(
                Job::new()
                    .with(PARAM_SOURCE, JobValue::Raw(raw_input(0.0)))
                    .with(PARAM_STYLE, JobValue::Raw(raw_input(0.5))),
            )
            .expect_err("runner was never loaded");
        assert!(matches!(err, ApplyError::NotLoaded { .. }));
    }
}
