//! Burn ML models for two-class image classification.
//!
//! This crate defines the network architecture in two parts:
//! - `ConvFeatureExtractor`: a small VGG-style convolutional base whose
//!   weights are loaded from a pretrained checkpoint and never updated.
//! - `ClassifierHead`: the trainable flatten → dense → dense-sigmoid stack
//!   that maps features to a single probability.
//!
//! These are pure Burn Modules with no training logic; the `training` crate
//! owns the loop, the optimizer, and the freeze contract (features are
//! detached before entering the head, and only head parameters are stepped).

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::PaddingConfig2d;
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct ConvFeatureExtractorConfig {
    /// Output channels per conv block; each block halves spatial resolution.
    pub channels: [usize; 3],
}

impl Default for ConvFeatureExtractorConfig {
    fn default() -> Self {
        Self {
            channels: [32, 64, 128],
        }
    }
}

impl ConvFeatureExtractorConfig {
    /// Flattened feature length for a given input size.
    pub fn feature_dim(&self, input_size: (u32, u32)) -> usize {
        let (w, h) = input_size;
        // Three 2x2 pools divide each spatial dimension by 8.
        self.channels[2] * (w as usize / 8) * (h as usize / 8)
    }
}

#[derive(Debug, Module)]
pub struct ConvFeatureExtractor<B: burn::tensor::backend::Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
}

impl<B: burn::tensor::backend::Backend> ConvFeatureExtractor<B> {
    pub fn new(cfg: ConvFeatureExtractorConfig, device: &B::Device) -> Self {
        let conv = |cin: usize, cout: usize| {
            Conv2dConfig::new([cin, cout], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        Self {
            conv1: conv(3, cfg.channels[0]),
            conv2: conv(cfg.channels[0], cfg.channels[1]),
            conv3: conv(cfg.channels[1], cfg.channels[2]),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    /// Map an NCHW image batch to a flattened feature batch.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(input)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = self.pool.forward(relu(self.conv3.forward(x)));
        x.flatten(1, 3)
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierHeadConfig {
    /// Flattened feature length produced by the base.
    pub input_dim: usize,
    pub hidden: usize,
}

impl ClassifierHeadConfig {
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            hidden: 64,
        }
    }
}

#[derive(Debug, Module)]
pub struct ClassifierHead<B: burn::tensor::backend::Backend> {
    linear1: nn::Linear<B>,
    linear2: nn::Linear<B>,
}

impl<B: burn::tensor::backend::Backend> ClassifierHead<B> {
    pub fn new(cfg: ClassifierHeadConfig, device: &B::Device) -> Self {
        let linear1 = nn::LinearConfig::new(cfg.input_dim, cfg.hidden).init(device);
        let linear2 = nn::LinearConfig::new(cfg.hidden, 1).init(device);
        Self { linear1, linear2 }
    }

    /// Map features to one probability per sample, shape [batch, 1].
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.linear1.forward(features));
        sigmoid(self.linear2.forward(x))
    }
}

/// Full inference model: frozen base feeding the trained head.
#[derive(Debug, Module)]
pub struct Classifier<B: burn::tensor::backend::Backend> {
    pub base: ConvFeatureExtractor<B>,
    pub head: ClassifierHead<B>,
}

impl<B: burn::tensor::backend::Backend> Classifier<B> {
    pub fn new(base: ConvFeatureExtractor<B>, head: ClassifierHead<B>) -> Self {
        Self { base, head }
    }

    /// Flattened base features for an image batch.
    pub fn features(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        self.base.forward(input)
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        self.head.forward(self.features(input))
    }
}

pub mod prelude {
    pub use super::{
        Classifier, ClassifierHead, ClassifierHeadConfig, ConvFeatureExtractor,
        ConvFeatureExtractorConfig,
    };
}
