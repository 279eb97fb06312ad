//! Checkpoints - saving and restoring model parameters
//!
//! Parameters are stored by name with their flat data, in JSON or YAML.

mod checkpoint;
mod format;

pub use checkpoint::{
    load_checkpoint, save_checkpoint, Checkpoint, CheckpointMetadata, ParameterRecord,
};
pub use format::CheckpointFormat;
