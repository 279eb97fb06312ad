//! Small convolutional classifier for 32x32 RGB images
//!
//! conv(3→6, 5x5) → relu → pool 2 → conv(6→16, 5x5) → relu → pool 2 →
//! flatten → fc(400→120) → relu → fc(120→84) → relu → fc(84→10)

use super::layers::{Conv2d, FeatureMap, Linear, MaxPool2d};
use super::{argmax_rows, Module};
use crate::autograd::relu;
use crate::{Error, Result, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Architecture hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub in_channels: usize,
    pub image_size: usize,
    pub conv1_channels: usize,
    pub conv2_channels: usize,
    pub kernel_size: usize,
    pub pool_size: usize,
    pub fc1_features: usize,
    pub fc2_features: usize,
    pub num_classes: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            image_size: 32,
            conv1_channels: 6,
            conv2_channels: 16,
            kernel_size: 5,
            pool_size: 2,
            fc1_features: 120,
            fc2_features: 84,
            num_classes: 10,
        }
    }
}

impl NetConfig {
    /// Spatial side after both conv/pool stages, or `None` if the image is too small
    pub fn final_side(&self) -> Option<usize> {
        if self.kernel_size == 0 || self.pool_size == 0 {
            return None;
        }
        let mut side = self.image_size;
        for _ in 0..2 {
            if side < self.kernel_size {
                return None;
            }
            side = (side + 1 - self.kernel_size) / self.pool_size;
        }
        (side > 0).then_some(side)
    }

    /// Length of the flattened feature vector fed to the first linear layer
    pub fn flat_features(&self) -> Option<usize> {
        self.final_side().map(|s| self.conv2_channels * s * s)
    }

    /// Elements per input image
    pub fn input_features(&self) -> usize {
        self.in_channels * self.image_size * self.image_size
    }

    pub fn validate(&self) -> Result<()> {
        let widths = [
            ("in_channels", self.in_channels),
            ("conv1_channels", self.conv1_channels),
            ("conv2_channels", self.conv2_channels),
            ("fc1_features", self.fc1_features),
            ("fc2_features", self.fc2_features),
            ("num_classes", self.num_classes),
        ];
        if let Some((name, _)) = widths.iter().find(|(_, v)| *v == 0) {
            return Err(Error::InvalidParameter(format!("{name} must be > 0")));
        }
        if self.flat_features().is_none() {
            return Err(Error::InvalidParameter(format!(
                "image size {} is too small for two {}x{} conv + {}x{} pool stages",
                self.image_size, self.kernel_size, self.kernel_size, self.pool_size, self.pool_size
            )));
        }
        Ok(())
    }
}

/// The classifier
pub struct Net {
    config: NetConfig,
    conv1: Conv2d,
    pool: MaxPool2d,
    conv2: Conv2d,
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
}

impl Net {
    /// Build the network with parameters drawn from a seeded generator
    pub fn new(config: NetConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let flat = config
            .flat_features()
            .ok_or_else(|| Error::InvalidParameter("invalid network geometry".to_string()))?;
        let mut rng = StdRng::seed_from_u64(seed);

        Ok(Self {
            conv1: Conv2d::new(
                config.in_channels,
                config.conv1_channels,
                config.kernel_size,
                &mut rng,
            ),
            pool: MaxPool2d::new(config.pool_size),
            conv2: Conv2d::new(
                config.conv1_channels,
                config.conv2_channels,
                config.kernel_size,
                &mut rng,
            ),
            fc1: Linear::new(flat, config.fc1_features, &mut rng),
            fc2: Linear::new(config.fc1_features, config.fc2_features, &mut rng),
            fc3: Linear::new(config.fc2_features, config.num_classes, &mut rng),
            config,
        })
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Arg-max class of each sample's logits
    pub fn predict(&self, input: &Tensor, batch_size: usize) -> Vec<usize> {
        let logits = self.forward(&input.detach(), batch_size);
        argmax_rows(&logits.data().to_vec(), self.config.num_classes)
    }
}

impl Module for Net {
    fn forward(&self, input: &Tensor, batch_size: usize) -> Tensor {
        assert_eq!(
            input.len(),
            batch_size * self.config.input_features(),
            "Net input must hold {} images of {} features",
            batch_size,
            self.config.input_features()
        );
        let shape = FeatureMap {
            batch: batch_size,
            channels: self.config.in_channels,
            height: self.config.image_size,
            width: self.config.image_size,
        };

        let (x, shape) = self.conv1.forward(input, shape);
        let (x, shape) = self.pool.forward(&relu(&x), shape);
        let (x, shape) = self.conv2.forward(&x, shape);
        let (x, _) = self.pool.forward(&relu(&x), shape);

        // NCHW buffers are already flattened per sample
        let x = relu(&self.fc1.forward(&x, batch_size));
        let x = relu(&self.fc2.forward(&x, batch_size));
        self.fc3.forward(&x, batch_size)
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![
            ("conv1.weight".to_string(), &self.conv1.weight),
            ("conv1.bias".to_string(), &self.conv1.bias),
            ("conv2.weight".to_string(), &self.conv2.weight),
            ("conv2.bias".to_string(), &self.conv2.bias),
            ("fc1.weight".to_string(), &self.fc1.weight),
            ("fc1.bias".to_string(), &self.fc1.bias),
            ("fc2.weight".to_string(), &self.fc2.weight),
            ("fc2.bias".to_string(), &self.fc2.bias),
            ("fc3.weight".to_string(), &self.fc3.weight),
            ("fc3.bias".to_string(), &self.fc3.bias),
        ]
    }

    fn parameter_shapes(&self) -> Vec<Vec<usize>> {
        vec![
            self.conv1.weight_shape(),
            self.conv1.bias_shape(),
            self.conv2.weight_shape(),
            self.conv2.bias_shape(),
            self.fc1.weight_shape(),
            self.fc1.bias_shape(),
            self.fc2.weight_shape(),
            self.fc2.bias_shape(),
            self.fc3.weight_shape(),
            self.fc3.bias_shape(),
        ]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![
            &mut self.conv1.weight,
            &mut self.conv1.bias,
            &mut self.conv2.weight,
            &mut self.conv2.bias,
            &mut self.fc1.weight,
            &mut self.fc1.bias,
            &mut self.fc2.weight,
            &mut self.fc2.bias,
            &mut self.fc3.weight,
            &mut self.fc3.bias,
        ]
    }
}
