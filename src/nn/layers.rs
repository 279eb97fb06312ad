//! Convolution, pooling and fully connected layers

use crate::autograd::{add_row_bias, conv2d, matmul, max_pool2d, Conv2dGeometry, Pool2dGeometry};
use crate::Tensor;
use rand::Rng;

/// Shape of a batch of feature maps laid out as `[batch][channels][height][width]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureMap {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl FeatureMap {
    /// Elements per sample
    pub fn features(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub fn len(&self) -> usize {
        self.batch * self.features()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`, the default init for conv and linear layers
fn uniform_init<R: Rng>(rng: &mut R, len: usize, fan_in: usize) -> Tensor {
    let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
    let data = (0..len).map(|_| rng.gen_range(-bound..=bound)).collect();
    Tensor::from_vec(data, true)
}

/// 2D convolution with square kernel, stride 1 and no padding
pub struct Conv2d {
    pub weight: Tensor,
    pub bias: Tensor,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
}

impl Conv2d {
    pub fn new<R: Rng>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        rng: &mut R,
    ) -> Self {
        let fan_in = in_channels * kernel_size * kernel_size;
        Self {
            weight: uniform_init(rng, out_channels * fan_in, fan_in),
            bias: uniform_init(rng, out_channels, fan_in),
            in_channels,
            out_channels,
            kernel_size,
        }
    }

    /// `[out_channels, in_channels, k, k]`
    pub fn weight_shape(&self) -> Vec<usize> {
        vec![
            self.out_channels,
            self.in_channels,
            self.kernel_size,
            self.kernel_size,
        ]
    }

    pub fn bias_shape(&self) -> Vec<usize> {
        vec![self.out_channels]
    }

    /// Shape produced for a given input shape
    pub fn output_shape(&self, input: FeatureMap) -> FeatureMap {
        FeatureMap {
            batch: input.batch,
            channels: self.out_channels,
            height: input.height + 1 - self.kernel_size,
            width: input.width + 1 - self.kernel_size,
        }
    }

    pub fn forward(&self, input: &Tensor, shape: FeatureMap) -> (Tensor, FeatureMap) {
        assert_eq!(
            shape.channels, self.in_channels,
            "Conv2d expects {} input channels",
            self.in_channels
        );
        let geo = Conv2dGeometry {
            batch: shape.batch,
            in_channels: self.in_channels,
            height: shape.height,
            width: shape.width,
            out_channels: self.out_channels,
            kernel_size: self.kernel_size,
        };
        (
            conv2d(input, &self.weight, &self.bias, geo),
            self.output_shape(shape),
        )
    }
}

/// Non-overlapping max pooling
#[derive(Debug, Clone, Copy)]
pub struct MaxPool2d {
    kernel_size: usize,
}

impl MaxPool2d {
    pub fn new(kernel_size: usize) -> Self {
        Self { kernel_size }
    }

    pub fn output_shape(&self, input: FeatureMap) -> FeatureMap {
        FeatureMap {
            height: input.height / self.kernel_size,
            width: input.width / self.kernel_size,
            ..input
        }
    }

    pub fn forward(&self, input: &Tensor, shape: FeatureMap) -> (Tensor, FeatureMap) {
        let geo = Pool2dGeometry {
            batch: shape.batch,
            channels: shape.channels,
            height: shape.height,
            width: shape.width,
            kernel_size: self.kernel_size,
        };
        (max_pool2d(input, geo), self.output_shape(shape))
    }
}

/// Fully connected layer: `y = x @ W + b`
///
/// The weight is stored `[in_features][out_features]` so the batch multiplies
/// from the left without a transpose.
pub struct Linear {
    pub weight: Tensor,
    pub bias: Tensor,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Self {
            weight: uniform_init(rng, in_features * out_features, in_features),
            bias: uniform_init(rng, out_features, in_features),
            in_features,
            out_features,
        }
    }

    /// `[in_features, out_features]`, matching the storage order
    pub fn weight_shape(&self) -> Vec<usize> {
        vec![self.in_features, self.out_features]
    }

    pub fn bias_shape(&self) -> Vec<usize> {
        vec![self.out_features]
    }

    pub fn forward(&self, input: &Tensor, batch_size: usize) -> Tensor {
        let xw = matmul(
            input,
            &self.weight,
            batch_size,
            self.in_features,
            self.out_features,
        );
        add_row_bias(&xw, &self.bias, batch_size, self.out_features)
    }
}
