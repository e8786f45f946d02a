//! Bottleneck ResNet with torchvision parameter names.

use candle_core::{D, Module, Result, Tensor};
use candle_nn::{BatchNorm, Conv2d, Conv2dConfig, Linear, VarBuilder};

const EXPANSION: usize = 4;
const BN_EPS: f64 = 1e-5;

/// Block counts per stage and stem width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResNetConfig {
    pub layers: [usize; 4],
    pub base_width: usize,
}

impl ResNetConfig {
    pub const fn resnet50() -> Self {
        Self {
            layers: [3, 4, 6, 3],
            base_width: 64,
        }
    }

    /// Width of the pooled features entering the final linear layer.
    pub fn feature_width(&self) -> usize {
        self.base_width * 8 * EXPANSION
    }
}

impl Default for ResNetConfig {
    fn default() -> Self {
        Self::resnet50()
    }
}

#[derive(Debug, Clone)]
struct ConvBn {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBn {
    #[allow(clippy::too_many_arguments)]
    fn new(
        c_in: usize,
        c_out: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        conv_vb: VarBuilder,
        bn_vb: VarBuilder,
    ) -> Result<Self> {
        let config = Conv2dConfig {
            padding,
            stride,
            ..Default::default()
        };
        let conv = candle_nn::conv2d_no_bias(c_in, c_out, kernel, config, conv_vb)?;
        let bn = candle_nn::batch_norm(c_out, BN_EPS, bn_vb)?;

        Ok(Self { conv, bn })
    }

    /// Batch norm always runs on its running statistics.
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        xs.apply(&self.conv)?.apply_t(&self.bn, false)
    }
}

#[derive(Debug, Clone)]
struct Bottleneck {
    reduce: ConvBn,
    spatial: ConvBn,
    expand: ConvBn,
    downsample: Option<ConvBn>,
}

impl Bottleneck {
    fn new(vb: VarBuilder, c_in: usize, width: usize, stride: usize) -> Result<Self> {
        let c_out = width * EXPANSION;

        let reduce = ConvBn::new(c_in, width, 1, 1, 0, vb.pp("conv1"), vb.pp("bn1"))?;
        let spatial = ConvBn::new(width, width, 3, stride, 1, vb.pp("conv2"), vb.pp("bn2"))?;
        let expand = ConvBn::new(width, c_out, 1, 1, 0, vb.pp("conv3"), vb.pp("bn3"))?;

        let downsample = if stride != 1 || c_in != c_out {
            Some(ConvBn::new(
                c_in,
                c_out,
                1,
                stride,
                0,
                vb.pp("downsample.0"),
                vb.pp("downsample.1"),
            )?)
        } else {
            None
        };

        Ok(Self {
            reduce,
            spatial,
            expand,
            downsample,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(xs)?,
            None => xs.clone(),
        };

        let out = self.reduce.forward(xs)?.relu()?;
        let out = self.spatial.forward(&out)?.relu()?;
        let out = self.expand.forward(&out)?;

        (out + identity)?.relu()
    }
}

#[derive(Debug, Clone)]
pub struct ResNet {
    stem: ConvBn,
    blocks: Vec<Bottleneck>,
    fc: Linear,
}

impl ResNet {
    /// Create every parameter through `vb`, under torchvision names.
    pub fn new(config: &ResNetConfig, num_classes: usize, vb: VarBuilder) -> Result<Self> {
        let base = config.base_width;
        let stem = ConvBn::new(3, base, 7, 2, 3, vb.pp("conv1"), vb.pp("bn1"))?;

        let mut blocks = Vec::with_capacity(config.layers.iter().sum());
        let mut c_in = base;

        for (stage, &depth) in config.layers.iter().enumerate() {
            let width = base << stage;
            let stage_vb = vb.pp(format!("layer{}", stage + 1));

            for index in 0..depth {
                let stride = if stage > 0 && index == 0 { 2 } else { 1 };
                blocks.push(Bottleneck::new(stage_vb.pp(index), c_in, width, stride)?);
                c_in = width * EXPANSION;
            }
        }

        let fc = candle_nn::linear(c_in, num_classes, vb.pp("fc"))?;

        Ok(Self { stem, blocks, fc })
    }
}

impl Module for ResNet {
    /// `(batch, 3, H, W)` images to `(batch, num_classes)` logits.
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        // Inputs are non-negative after ReLU, so edge padding equals -inf padding
        let mut xs = self
            .stem
            .forward(xs)?
            .relu()?
            .pad_with_same(D::Minus1, 1, 1)?
            .pad_with_same(D::Minus2, 1, 1)?
            .max_pool2d_with_stride(3, 2)?;

        for block in &self.blocks {
            xs = block.forward(&xs)?;
        }

        xs.mean(D::Minus1)?.mean(D::Minus1)?.apply(&self.fc)
    }
}
