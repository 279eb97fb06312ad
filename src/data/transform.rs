//! Pixel transforms

use super::ImageDims;
use crate::{Error, Result};

/// Scale bytes to [0, 1], then normalize each channel: `(x - mean[c]) / std[c]`
#[derive(Debug, Clone, PartialEq)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.len() != std.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![mean.len()],
                got: vec![std.len()],
            });
        }
        if std.iter().any(|s| *s <= 0.0) {
            return Err(Error::InvalidParameter(
                "normalization std must be > 0".to_string(),
            ));
        }
        Ok(Self { mean, std })
    }

    /// Maps [0, 1] onto [-1, 1] for every channel
    pub fn symmetric(channels: usize) -> Self {
        Self {
            mean: vec![0.5; channels],
            std: vec![0.5; channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    /// Convert a CHW byte image
    pub fn apply(&self, pixels: &[u8], dims: ImageDims) -> Vec<f32> {
        assert_eq!(pixels.len(), dims.features(), "image size mismatch");
        assert_eq!(dims.channels, self.channels(), "channel count mismatch");

        let plane = dims.height * dims.width;
        pixels
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                let c = i / plane;
                (b as f32 / 255.0 - self.mean[c]) / self.std[c]
            })
            .collect()
    }
}
