//! Saving and restoring module parameters

use super::format::CheckpointFormat;
use crate::nn::Module;
use crate::{Error, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What was trained, and how far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub architecture: String,
    pub version: String,
    #[serde(default)]
    pub epochs: Option<usize>,
    #[serde(default)]
    pub final_loss: Option<f32>,
}

impl Default for CheckpointMetadata {
    fn default() -> Self {
        Self {
            architecture: "net".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            epochs: None,
            final_loss: None,
        }
    }
}

/// One named parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Serializable snapshot of a module's parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub metadata: CheckpointMetadata,
    pub parameters: Vec<ParameterRecord>,
}

impl Checkpoint {
    pub fn from_module<M: Module>(model: &M, metadata: CheckpointMetadata) -> Self {
        let parameters = model
            .named_parameters()
            .into_iter()
            .zip(model.parameter_shapes())
            .map(|((name, tensor), shape)| ParameterRecord {
                name,
                shape,
                data: tensor.data().to_vec(),
            })
            .collect();
        Self {
            metadata,
            parameters,
        }
    }

    /// Copy the stored values into `model`
    ///
    /// Every parameter of the model must be present with a matching shape and
    /// length, and the checkpoint must not carry unknown names. Nothing is written
    /// unless all checks pass. Existing gradients are dropped.
    pub fn apply_to<M: Module>(&self, model: &mut M) -> Result<()> {
        let names: Vec<String> = model
            .named_parameters()
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        if let Some(extra) = self
            .parameters
            .iter()
            .find(|r| !names.iter().any(|n| n == &r.name))
        {
            return Err(Error::Serialization(format!(
                "checkpoint has unknown parameter '{}'",
                extra.name
            )));
        }

        let shapes = model.parameter_shapes();
        let mut records = Vec::with_capacity(names.len());
        for ((name, param), shape) in names.iter().zip(model.parameters()).zip(shapes) {
            let record = self
                .parameters
                .iter()
                .find(|r| &r.name == name)
                .ok_or_else(|| {
                    Error::Serialization(format!("checkpoint is missing parameter '{name}'"))
                })?;
            if record.shape != shape {
                return Err(Error::ShapeMismatch {
                    expected: shape,
                    got: record.shape.clone(),
                });
            }
            if record.data.len() != param.len() {
                return Err(Error::ShapeMismatch {
                    expected: vec![param.len()],
                    got: vec![record.data.len()],
                });
            }
            records.push(record);
        }

        for (param, record) in model.parameters_mut().into_iter().zip(records) {
            *param.data_mut() = Array1::from(record.data.clone());
            param.zero_grad();
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>, format: CheckpointFormat) -> Result<()> {
        let data = match format {
            CheckpointFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
            CheckpointFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
        };
        fs::write(path, data)?;
        Ok(())
    }

    /// Read a checkpoint, picking the format from the file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = CheckpointFormat::from_path(path).ok_or_else(|| {
            Error::Serialization(format!(
                "cannot infer checkpoint format from '{}'",
                path.display()
            ))
        })?;
        let data = fs::read_to_string(path)?;

        match format {
            CheckpointFormat::Json => serde_json::from_str(&data)
                .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}"))),
            CheckpointFormat::Yaml => serde_yaml::from_str(&data)
                .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}"))),
        }
    }
}

/// Save a model's parameters with default metadata
///
/// # Example
///
/// ```no_run
/// use zerograd::io::{save_checkpoint, CheckpointFormat};
/// use zerograd::nn::{Net, NetConfig};
///
/// let net = Net::new(NetConfig::default(), 0).unwrap();
/// save_checkpoint(&net, "cifar_net.json", CheckpointFormat::Json).unwrap();
/// ```
pub fn save_checkpoint<M: Module>(
    model: &M,
    path: impl AsRef<Path>,
    format: CheckpointFormat,
) -> Result<()> {
    Checkpoint::from_module(model, CheckpointMetadata::default()).save(path, format)
}

/// Load parameters saved by [`save_checkpoint`] into `model`
pub fn load_checkpoint<M: Module>(
    model: &mut M,
    path: impl AsRef<Path>,
) -> Result<CheckpointMetadata> {
    let checkpoint = Checkpoint::load(path)?;
    checkpoint.apply_to(model)?;
    Ok(checkpoint.metadata)
}
