//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! zerograd train config.yaml
//! zerograd train config.yaml --epochs 1 --synthetic --evaluate
//! zerograd train config.yaml --save cifar_net.json
//! zerograd validate config.yaml --detailed
//! zerograd info config.yaml --format yaml
//! ```

use super::schema::{DatasetKind, TrainSpec};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Train a small CIFAR-10 classifier, resetting gradients before every backward pass
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "zerograd")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a model from YAML configuration
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ValidateArgs),

    /// Display information about a configuration
    Info(InfoArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Override learning rate
    #[arg(short, long)]
    pub lr: Option<f32>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Train on generated images instead of CIFAR-10
    #[arg(long)]
    pub synthetic: bool,

    /// Report accuracy on the test split after training
    #[arg(long)]
    pub evaluate: bool,

    /// Write the trained weights here (.json or .yaml)
    #[arg(short, long, value_name = "PATH")]
    pub save: Option<PathBuf>,

    /// Dry run (validate config but don't train)
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for info command
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Unknown output format: {s}. Valid formats: text, json, yaml"
            )),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a TrainSpec
pub fn apply_overrides(spec: &mut TrainSpec, args: &TrainArgs) {
    if let Some(epochs) = args.epochs {
        spec.training.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        spec.data.batch_size = batch_size;
    }
    if let Some(lr) = args.lr {
        spec.optimizer.lr = lr;
    }
    if let Some(seed) = args.seed {
        spec.training.seed = seed;
    }
    if args.synthetic {
        spec.data.dataset = DatasetKind::Synthetic;
    }
    if let Some(save) = &args.save {
        spec.training.output = Some(save.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_command() {
        let cli = parse_args(["zerograd", "train", "config.yaml"]).unwrap();
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert!(!args.dry_run);
                assert!(!args.synthetic);
                assert_eq!(args.save, None);
            }
            _ => panic!("Expected Train command"),
        }
    }

    #[test]
    fn test_parse_train_overrides() {
        let cli = parse_args([
            "zerograd",
            "train",
            "config.yaml",
            "--epochs",
            "5",
            "--batch-size",
            "16",
            "--lr",
            "0.01",
            "--seed",
            "7",
            "--synthetic",
            "--evaluate",
            "--save",
            "net.json",
        ])
        .unwrap();

        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.epochs, Some(5));
                assert_eq!(args.batch_size, Some(16));
                assert_eq!(args.lr, Some(0.01));
                assert_eq!(args.seed, Some(7));
                assert!(args.synthetic);
                assert!(args.evaluate);
                assert_eq!(args.save, Some(PathBuf::from("net.json")));
            }
            _ => panic!("Expected Train command"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = parse_args(["zerograd", "validate", "c.yaml", "--detailed", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
        match cli.command {
            Command::Validate(args) => assert!(args.detailed),
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_parse_info_format() {
        let cli = parse_args(["zerograd", "info", "c.yaml", "--format", "yaml"]).unwrap();
        match cli.command {
            Command::Info(args) => assert_eq!(args.format, OutputFormat::Yaml),
            _ => panic!("Expected Info command"),
        }
        assert!(parse_args(["zerograd", "info", "c.yaml", "--format", "toml"]).is_err());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        assert!(parse_args(["zerograd", "train"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut spec: TrainSpec = serde_yaml::from_str(
            "data:\n  batch_size: 4\noptimizer:\n  lr: 0.001\n",
        )
        .unwrap();
        let args = TrainArgs {
            config: PathBuf::from("c.yaml"),
            epochs: Some(3),
            batch_size: None,
            lr: Some(0.1),
            seed: Some(9),
            synthetic: true,
            evaluate: false,
            save: Some(PathBuf::from("out.yaml")),
            dry_run: false,
        };

        apply_overrides(&mut spec, &args);

        assert_eq!(spec.training.epochs, 3);
        assert_eq!(spec.data.batch_size, 4);
        assert_eq!(spec.optimizer.lr, 0.1);
        assert_eq!(spec.training.seed, 9);
        assert_eq!(spec.data.dataset, DatasetKind::Synthetic);
        assert_eq!(spec.training.output, Some(PathBuf::from("out.yaml")));
    }
}
