//! Model sub-stages behind the runner.
//!
//! Each stage is a trait so tests can inject counting or scripted fakes;
//! the concrete implementations are deterministic distillations of the
//! original architecture: mean pooling, learned channel maps, and
//! statistics transfer, parameterized entirely by checkpoint weights.
//! Stage math runs on batched `[1, C, H, W]` tensors.

use std::path::Path;

use ndarray::{Array1, Array2, Array4, ArrayView4, Axis, Ix4};

use stylecast_core::Tensor;

use crate::checkpoint::Checkpoint;
use crate::error::ModelError;

/// Spatial reduction factor of the encoder's front half.
pub const FRONT_POOL: usize = 4;
/// Additional spatial reduction factor of the encoder's back half.
pub const BACK_POOL: usize = 2;
/// Upsampling factor of the decoder, restoring the front-half reduction.
const DECODE_UPSAMPLE: usize = FRONT_POOL;

const EPS: f32 = 1e-5;

/// Two-halved feature encoder: raw input → fine features → coarse features.
pub trait EncoderStage: Send {
    /// Fine-scale pass over a raw `[1, 3, H, W]` input.
    fn front(&self, input: &Tensor) -> Result<Tensor, ModelError>;
    /// Coarse-scale pass over the front half's output.
    fn back(&self, front: &Tensor) -> Result<Tensor, ModelError>;
}

/// Feature blender combining source and style statistics.
pub trait TransformStage: Send {
    /// Argument order is fixed: source-front, style-front, source-back,
    /// style-back.
    fn blend(
        &self,
        source_front: &Tensor,
        style_front: &Tensor,
        source_back: &Tensor,
        style_back: &Tensor,
    ) -> Result<Tensor, ModelError>;
}

/// Feature-to-image decoder.
pub trait DecoderStage: Send {
    fn decode(&self, blended: &Tensor) -> Result<Tensor, ModelError>;
}

// ---------------------------------------------------------------------------
// Concrete stages
// ---------------------------------------------------------------------------

/// Concrete encoder backed by checkpoint weights.
pub struct VggEncoder {
    front_weight: Array2<f32>,
    front_bias: Array1<f32>,
    back_weight: Array2<f32>,
    back_bias: Array1<f32>,
}

impl VggEncoder {
    pub fn new(
        front_weight: Array2<f32>,
        front_bias: Array1<f32>,
        back_weight: Array2<f32>,
        back_bias: Array1<f32>,
    ) -> Result<Self, ModelError> {
        if front_weight.ncols() != 3 {
            return Err(ModelError::WeightMismatch {
                message: format!(
                    "front weight expects 3 input channels, has {}",
                    front_weight.ncols()
                ),
            });
        }
        if front_bias.len() != front_weight.nrows() {
            return Err(ModelError::WeightMismatch {
                message: format!(
                    "front bias length {} does not match {} output channels",
                    front_bias.len(),
                    front_weight.nrows()
                ),
            });
        }
        if back_weight.ncols() != front_weight.nrows() {
            return Err(ModelError::WeightMismatch {
                message: format!(
                    "back weight expects {} input channels, front produces {}",
                    back_weight.ncols(),
                    front_weight.nrows()
                ),
            });
        }
        if back_bias.len() != back_weight.nrows() {
            return Err(ModelError::WeightMismatch {
                message: format!(
                    "back bias length {} does not match {} output channels",
                    back_bias.len(),
                    back_weight.nrows()
                ),
            });
        }
        Ok(Self {
            front_weight,
            front_bias,
            back_weight,
            back_bias,
        })
    }

    pub fn from_checkpoint(path: &Path) -> Result<Self, ModelError> {
        let checkpoint = Checkpoint::load(path)?;
        Self::new(
            checkpoint.matrix("enc_front.weight")?,
            checkpoint.vector("enc_front.bias")?,
            checkpoint.matrix("enc_back.weight")?,
            checkpoint.vector("enc_back.bias")?,
        )
    }
}

impl EncoderStage for VggEncoder {
    fn front(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let view = batched_view("encoder front", input)?;
        if view.shape()[1] != 3 {
            return Err(ModelError::InputShape {
                stage: "encoder front",
                shape: input.shape().to_vec(),
                message: "expected 3 input channels".to_string(),
            });
        }
        let pooled = mean_pool("encoder front", view, FRONT_POOL)?;
        let mut mapped = channel_map(pooled.view(), &self.front_weight, Some(&self.front_bias));
        relu(&mut mapped);
        Ok(to_tensor(mapped, input))
    }

    fn back(&self, front: &Tensor) -> Result<Tensor, ModelError> {
        let view = batched_view("encoder back", front)?;
        if view.shape()[1] != self.back_weight.ncols() {
            return Err(ModelError::InputShape {
                stage: "encoder back",
                shape: front.shape().to_vec(),
                message: format!("expected {} channels", self.back_weight.ncols()),
            });
        }
        let pooled = mean_pool("encoder back", view, BACK_POOL)?;
        let mut mapped = channel_map(pooled.view(), &self.back_weight, Some(&self.back_bias));
        relu(&mut mapped);
        Ok(to_tensor(mapped, front))
    }
}

/// Concrete transform: fine-scale statistics transfer, a coarse-scale gain,
/// and a learned channel projection.
pub struct StyleBlender {
    projection: Array2<f32>,
}

impl StyleBlender {
    pub fn new(projection: Array2<f32>) -> Result<Self, ModelError> {
        if projection.nrows() != projection.ncols() {
            return Err(ModelError::WeightMismatch {
                message: format!(
                    "blend projection must be square, has shape {:?}",
                    projection.shape()
                ),
            });
        }
        Ok(Self { projection })
    }

    pub fn from_checkpoint(path: &Path) -> Result<Self, ModelError> {
        let checkpoint = Checkpoint::load(path)?;
        Self::new(checkpoint.matrix("blend.weight")?)
    }
}

impl TransformStage for StyleBlender {
    fn blend(
        &self,
        source_front: &Tensor,
        style_front: &Tensor,
        source_back: &Tensor,
        style_back: &Tensor,
    ) -> Result<Tensor, ModelError> {
        let source = batched_view("transform", source_front)?;
        let style = batched_view("transform", style_front)?;
        let channels = self.projection.ncols();
        if source.shape()[1] != channels || style.shape()[1] != channels {
            return Err(ModelError::InputShape {
                stage: "transform",
                shape: source_front.shape().to_vec(),
                message: format!("expected {channels} channels on both feature maps"),
            });
        }

        let mut fine = statistics_transfer(source, style);
        // Coarse statistics modulate the whole map with a single gain.
        let gain =
            global_std(batched_view("transform", style_back)?)
                / (global_std(batched_view("transform", source_back)?) + EPS);
        fine.mapv_inplace(|v| v * gain);

        let mapped = channel_map(fine.view(), &self.projection, None);
        Ok(to_tensor(mapped, source_front))
    }
}

/// Concrete decoder: nearest-neighbor upsampling plus a learned map back to
/// RGB, clamped to the displayable range.
pub struct ImageDecoder {
    out_weight: Array2<f32>,
    out_bias: Array1<f32>,
}

impl ImageDecoder {
    pub fn new(out_weight: Array2<f32>, out_bias: Array1<f32>) -> Result<Self, ModelError> {
        if out_weight.nrows() != 3 {
            return Err(ModelError::WeightMismatch {
                message: format!(
                    "decoder output weight must produce 3 channels, produces {}",
                    out_weight.nrows()
                ),
            });
        }
        if out_bias.len() != 3 {
            return Err(ModelError::WeightMismatch {
                message: format!("decoder output bias length {} != 3", out_bias.len()),
            });
        }
        Ok(Self {
            out_weight,
            out_bias,
        })
    }

    pub fn from_checkpoint(path: &Path) -> Result<Self, ModelError> {
        let checkpoint = Checkpoint::load(path)?;
        Self::new(
            checkpoint.matrix("out.weight")?,
            checkpoint.vector("out.bias")?,
        )
    }
}

impl DecoderStage for ImageDecoder {
    fn decode(&self, blended: &Tensor) -> Result<Tensor, ModelError> {
        let view = batched_view("decoder", blended)?;
        if view.shape()[1] != self.out_weight.ncols() {
            return Err(ModelError::InputShape {
                stage: "decoder",
                shape: blended.shape().to_vec(),
                message: format!("expected {} channels", self.out_weight.ncols()),
            });
        }
        let upsampled = upsample_nearest(view, DECODE_UPSAMPLE);
        let mut mapped = channel_map(upsampled.view(), &self.out_weight, Some(&self.out_bias));
        mapped.mapv_inplace(|v| v.clamp(0.0, 1.0));
        Ok(to_tensor(mapped, blended))
    }
}

// ---------------------------------------------------------------------------
// Shared stage math
// ---------------------------------------------------------------------------

fn batched_view<'a>(
    stage: &'static str,
    tensor: &'a Tensor,
) -> Result<ArrayView4<'a, f32>, ModelError> {
    let view = tensor
        .data()
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| ModelError::InputShape {
            stage,
            shape: tensor.shape().to_vec(),
            message: "expected a [1, C, H, W] tensor".to_string(),
        })?;
    if view.shape()[0] != 1 {
        return Err(ModelError::InputShape {
            stage,
            shape: tensor.shape().to_vec(),
            message: "expected batch size 1".to_string(),
        });
    }
    Ok(view)
}

fn to_tensor(data: Array4<f32>, like: &Tensor) -> Tensor {
    Tensor::new(data.into_dyn(), like.device())
}

fn mean_pool(
    stage: &'static str,
    x: ArrayView4<'_, f32>,
    factor: usize,
) -> Result<Array4<f32>, ModelError> {
    let (channels, height, width) = (x.shape()[1], x.shape()[2], x.shape()[3]);
    let (out_h, out_w) = (height / factor, width / factor);
    if out_h == 0 || out_w == 0 {
        return Err(ModelError::InputShape {
            stage,
            shape: x.shape().to_vec(),
            message: format!("spatial extent smaller than pool factor {factor}"),
        });
    }
    let norm = (factor * factor) as f32;
    let mut out = Array4::<f32>::zeros((1, channels, out_h, out_w));
    for c in 0..channels {
        for i in 0..out_h {
            for j in 0..out_w {
                let mut acc = 0.0f32;
                for di in 0..factor {
                    for dj in 0..factor {
                        acc += x[[0, c, i * factor + di, j * factor + dj]];
                    }
                }
                out[[0, c, i, j]] = acc / norm;
            }
        }
    }
    Ok(out)
}

fn upsample_nearest(x: ArrayView4<'_, f32>, factor: usize) -> Array4<f32> {
    let (channels, height, width) = (x.shape()[1], x.shape()[2], x.shape()[3]);
    let mut out = Array4::<f32>::zeros((1, channels, height * factor, width * factor));
    for c in 0..channels {
        for i in 0..height * factor {
            for j in 0..width * factor {
                out[[0, c, i, j]] = x[[0, c, i / factor, j / factor]];
            }
        }
    }
    out
}

/// Per-pixel linear map over the channel axis: `[1, C_in, H, W]` →
/// `[1, C_out, H, W]` with `weight` of shape `[C_out, C_in]`.
fn channel_map(
    x: ArrayView4<'_, f32>,
    weight: &Array2<f32>,
    bias: Option<&Array1<f32>>,
) -> Array4<f32> {
    let (channels, height, width) = (x.shape()[1], x.shape()[2], x.shape()[3]);
    let flat = x
        .index_axis(Axis(0), 0)
        .to_shape((channels, height * width))
        .expect("batched feature maps are contiguous")
        .into_owned();
    let mut mapped = weight.dot(&flat);
    if let Some(bias) = bias {
        mapped += &bias.view().insert_axis(Axis(1));
    }
    mapped
        .into_shape_with_order((1, weight.nrows(), height, width))
        .expect("channel map preserves spatial extent")
}

fn relu(x: &mut Array4<f32>) {
    x.mapv_inplace(|v| v.max(0.0));
}

/// Re-centers each source channel onto the matching style channel's
/// spatial statistics.
fn statistics_transfer(source: ArrayView4<'_, f32>, style: ArrayView4<'_, f32>) -> Array4<f32> {
    let channels = source.shape()[1];
    let mut out = source.to_owned();
    for c in 0..channels {
        let src = source.index_axis(Axis(0), 0);
        let src = src.index_axis(Axis(0), c);
        let sty = style.index_axis(Axis(0), 0);
        let sty = sty.index_axis(Axis(0), c);

        let (src_mean, src_std) = spatial_stats(src.iter().copied());
        let (sty_mean, sty_std) = spatial_stats(sty.iter().copied());

        let mut target = out.index_axis_mut(Axis(0), 0);
        let mut target = target.index_axis_mut(Axis(0), c);
        target.mapv_inplace(|v| (v - src_mean) / src_std * sty_std + sty_mean);
    }
    out
}

fn spatial_stats(values: impl Iterator<Item = f32> + Clone) -> (f32, f32) {
    let count = values.clone().count().max(1) as f32;
    let mean = values.clone().sum::<f32>() / count;
    let var = values.map(|v| (v - mean) * (v - mean)).sum::<f32>() / count;
    (mean, (var + EPS).sqrt())
}

fn global_std(x: ArrayView4<'_, f32>) -> f32 {
    let (_, std) = spatial_stats(x.iter().copied());
    std
}
