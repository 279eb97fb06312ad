//! Mini-batch of training data

use crate::data::Sample;
use crate::Tensor;

/// A collated mini-batch
///
/// `inputs` holds `size` images back to back (NCHW), `targets` the matching
/// one-hot rows. Neither requires gradients.
#[derive(Clone)]
pub struct Batch {
    pub inputs: Tensor,
    pub targets: Tensor,
    pub labels: Vec<usize>,
    pub size: usize,
}

impl Batch {
    /// Create a batch from already-collated tensors
    pub fn new(inputs: Tensor, targets: Tensor, labels: Vec<usize>) -> Self {
        let size = labels.len();
        Self {
            inputs,
            targets,
            labels,
            size,
        }
    }

    /// Stack decoded samples and one-hot encode their labels
    pub fn from_samples(samples: Vec<Sample>, num_classes: usize) -> Self {
        let size = samples.len();
        let features = samples.first().map_or(0, |s| s.image.len());

        let mut inputs = Vec::with_capacity(size * features);
        let mut targets = vec![0.0f32; size * num_classes];
        let mut labels = Vec::with_capacity(size);

        for (row, sample) in samples.into_iter().enumerate() {
            assert_eq!(sample.image.len(), features, "ragged batch");
            assert!(sample.label < num_classes, "label out of range");
            inputs.extend(sample.image);
            targets[row * num_classes + sample.label] = 1.0;
            labels.push(sample.label);
        }

        Self::new(
            Tensor::from_vec(inputs, false),
            Tensor::from_vec(targets, false),
            labels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_one_hot() {
        let samples = vec![
            Sample {
                image: vec![1.0, 2.0],
                label: 2,
            },
            Sample {
                image: vec![3.0, 4.0],
                label: 0,
            },
        ];
        let batch = Batch::from_samples(samples, 3);

        assert_eq!(batch.size, 2);
        assert_eq!(batch.labels, vec![2, 0]);
        assert_eq!(batch.inputs.data().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            batch.targets.data().to_vec(),
            vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]
        );
        assert!(!batch.inputs.requires_grad());
    }
}
