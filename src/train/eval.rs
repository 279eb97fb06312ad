//! Classification accuracy over a loader

use crate::data::DataLoader;
use crate::nn::{argmax_rows, Module};

/// Correct/total counts, overall and per class
#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub correct: usize,
    pub total: usize,
    /// `(correct, total)` for each class index
    pub per_class: Vec<(usize, usize)>,
}

impl EvalReport {
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f32 / self.total as f32
    }

    /// None when the class never appeared
    pub fn class_accuracy(&self, class: usize) -> Option<f32> {
        match self.per_class.get(class) {
            Some(&(correct, total)) if total > 0 => Some(correct as f32 / total as f32),
            _ => None,
        }
    }
}

/// Run the model over one pass of `loader` and count correct predictions
pub fn evaluate<M: Module>(model: &M, loader: &DataLoader) -> EvalReport {
    let num_classes = loader.num_classes();
    let mut report = EvalReport {
        correct: 0,
        total: 0,
        per_class: vec![(0, 0); num_classes],
    };

    for batch in loader.iter_epoch(0) {
        let logits = model.forward(&batch.inputs.detach(), batch.size);
        let predicted = argmax_rows(&logits.data().to_vec(), num_classes);

        for (&pred, &label) in predicted.iter().zip(&batch.labels) {
            let hit = usize::from(pred == label);
            report.correct += hit;
            report.total += 1;
            report.per_class[label].0 += hit;
            report.per_class[label].1 += 1;
        }
    }

    report
}
