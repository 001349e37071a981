//! Plant disease CNN via Candle
//!
//! Four convolution blocks followed by a two-layer dense head. Parameter
//! names match the PyTorch state dict (`conv_layers.N.*`, `dense_layers.N.*`)
//! so weights load unchanged from a `.pt` file or a safetensors export.

use candle_core::{DType, Device, Tensor};
use candle_nn::{BatchNorm, Conv2d, Conv2dConfig, Linear, Module, ModuleT, VarBuilder};
use image::DynamicImage;
use std::path::Path;

use crate::classifier::preprocess::{self, CHANNELS};
use crate::classifier::{Classifier, Prediction};
use crate::errors::{DetectionError, Result};

/// Status tag attached to every result from this model
pub const MODEL_STATUS: &str = "CNN";

/// Output channels of each convolution block
const BLOCK_CHANNELS: [usize; 4] = [32, 64, 128, 256];

/// Index of each block's first layer inside `conv_layers`
const BLOCK_OFFSETS: [usize; 4] = [0, 7, 14, 21];

const HIDDEN_UNITS: usize = 1024;
const BATCH_NORM_EPS: f64 = 1e-5;

/// conv -> relu -> bn -> conv -> relu -> bn -> maxpool
struct ConvBlock {
    conv_a: Conv2d,
    bn_a: BatchNorm,
    conv_b: Conv2d,
    bn_b: BatchNorm,
}

impl ConvBlock {
    fn load(
        vb: &VarBuilder,
        offset: usize,
        in_channels: usize,
        out_channels: usize,
    ) -> candle_core::Result<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        Ok(Self {
            conv_a: candle_nn::conv2d(in_channels, out_channels, 3, cfg, vb.pp(offset))?,
            bn_a: candle_nn::batch_norm(out_channels, BATCH_NORM_EPS, vb.pp(offset + 2))?,
            conv_b: candle_nn::conv2d(out_channels, out_channels, 3, cfg, vb.pp(offset + 3))?,
            bn_b: candle_nn::batch_norm(out_channels, BATCH_NORM_EPS, vb.pp(offset + 5))?,
        })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let x = self.conv_a.forward(x)?.relu()?;
        let x = self.bn_a.forward_t(&x, false)?;
        let x = self.conv_b.forward(&x)?.relu()?;
        let x = self.bn_b.forward_t(&x, false)?;
        x.max_pool2d(2)
    }
}

/// The network itself
pub struct PlantCnn {
    blocks: Vec<ConvBlock>,
    hidden: Linear,
    output: Linear,
}

impl PlantCnn {
    pub fn load(vb: VarBuilder, class_count: usize, input_size: usize) -> candle_core::Result<Self> {
        let conv_vb = vb.pp("conv_layers");
        let mut blocks = Vec::with_capacity(BLOCK_CHANNELS.len());
        let mut in_channels = CHANNELS;
        for (&offset, &out_channels) in BLOCK_OFFSETS.iter().zip(BLOCK_CHANNELS.iter()) {
            blocks.push(ConvBlock::load(&conv_vb, offset, in_channels, out_channels)?);
            in_channels = out_channels;
        }

        // Four 2x2 pools shrink each side by 16
        let side = input_size / 16;
        let flat = in_channels * side * side;

        let dense_vb = vb.pp("dense_layers");
        Ok(Self {
            blocks,
            hidden: candle_nn::linear(flat, HIDDEN_UNITS, dense_vb.pp(1))?,
            output: candle_nn::linear(HIDDEN_UNITS, class_count, dense_vb.pp(4))?,
        })
    }

    /// Logits for a (N, 3, H, W) batch
    pub fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = input.clone();
        for block in &self.blocks {
            x = block.forward(&x)?;
        }
        let x = x.flatten_from(1)?;
        let x = self.hidden.forward(&x)?.relu()?;
        self.output.forward(&x)
    }
}

/// Classifier backed by [`PlantCnn`] on the CPU
pub struct CandleClassifier {
    model: PlantCnn,
    device: Device,
    class_count: usize,
    input_size: u32,
}

impl CandleClassifier {
    /// Load weights from `.safetensors` or a PyTorch state dict (`.pt`/`.pth`)
    pub fn load(path: &Path, class_count: usize, input_size: u32) -> Result<Self> {
        let device = Device::Cpu;
        let model_error = |reason: String| DetectionError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(model_error("file not found".to_string()));
        }

        let is_safetensors = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("safetensors"))
            .unwrap_or(false);

        let weights = if is_safetensors {
            // SAFETY: the weights file is not modified while mapped
            unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device) }
        } else {
            VarBuilder::from_pth(path, DType::F32, &device)
        };
        let vb = weights.map_err(|e| model_error(e.to_string()))?;

        let model = PlantCnn::load(vb, class_count, input_size as usize)
            .map_err(|e| model_error(e.to_string()))?;

        tracing::info!(path = %path.display(), class_count, input_size, "CNN model loaded");

        Ok(Self {
            model,
            device,
            class_count,
            input_size,
        })
    }

    fn input_tensor(&self, image: &DynamicImage) -> Result<Tensor> {
        let side = self.input_size as usize;
        let data = preprocess::to_chw(image, self.input_size);
        Ok(Tensor::from_vec(data, (1, CHANNELS, side, side), &self.device)?)
    }
}

impl Classifier for CandleClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Prediction> {
        let input = self.input_tensor(image)?;
        let logits = self.model.forward(&input)?;
        let probabilities = candle_nn::ops::softmax(&logits, 1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;

        Prediction::from_probabilities(probabilities)
    }

    fn class_count(&self) -> usize {
        self.class_count
    }

    fn status(&self) -> &str {
        MODEL_STATUS
    }
}
