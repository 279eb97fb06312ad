//! Configuration validation

use super::schema::TrainSpec;

/// Validation error type
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid momentum: {0} (must be in [0.0, 1.0))")]
    InvalidMomentum(f32),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid gradient accumulation steps: {0} (must be > 0)")]
    InvalidAccumulationSteps(usize),

    #[error("Invalid log interval: {0} (must be > 0)")]
    InvalidLogInterval(usize),

    #[error("Invalid optimizer: {0} (must be one of: sgd, adam)")]
    InvalidOptimizer(String),

    #[error("Invalid gradient clip value: {0} (must be > 0.0)")]
    InvalidGradClip(f32),

    #[error("Invalid synthetic sample count: {0} (must be > 0)")]
    InvalidSyntheticSamples(usize),

    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

/// Validate a training specification
///
/// Checks numeric ranges and names only; dataset files are looked up when
/// training starts.
pub fn validate_config(spec: &TrainSpec) -> Result<(), ValidationError> {
    if spec.data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.data.batch_size));
    }

    if spec.data.synthetic_samples == 0 {
        return Err(ValidationError::InvalidSyntheticSamples(
            spec.data.synthetic_samples,
        ));
    }

    if !(spec.optimizer.lr > 0.0) {
        return Err(ValidationError::InvalidLearningRate(spec.optimizer.lr));
    }

    if !(0.0..1.0).contains(&spec.optimizer.momentum) {
        return Err(ValidationError::InvalidMomentum(spec.optimizer.momentum));
    }

    let valid_optimizers = ["sgd", "adam"];
    if !valid_optimizers.contains(&spec.optimizer.name.as_str()) {
        return Err(ValidationError::InvalidOptimizer(
            spec.optimizer.name.clone(),
        ));
    }

    if spec.training.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(spec.training.epochs));
    }

    if spec.training.gradient_accumulation_steps == 0 {
        return Err(ValidationError::InvalidAccumulationSteps(
            spec.training.gradient_accumulation_steps,
        ));
    }

    if spec.training.log_interval == Some(0) {
        return Err(ValidationError::InvalidLogInterval(0));
    }

    if let Some(grad_clip) = spec.training.grad_clip {
        if !(grad_clip > 0.0) {
            return Err(ValidationError::InvalidGradClip(grad_clip));
        }
    }

    spec.net_config()
        .validate()
        .map_err(|e| ValidationError::InvalidModel(e.to_string()))?;

    Ok(())
}
