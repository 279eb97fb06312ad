//! Zerograd CLI
//!
//! # Usage
//!
//! ```bash
//! # Train on CIFAR-10 (downloaded on first run)
//! zerograd train configs/cifar10.yaml
//!
//! # Quick offline run with overrides
//! zerograd train configs/cifar10.yaml --synthetic --epochs 1 --evaluate
//!
//! # Validate config
//! zerograd validate configs/cifar10.yaml --detailed
//!
//! # Show config info
//! zerograd info configs/cifar10.yaml
//! ```

use clap::Parser;
use std::process::ExitCode;
use zerograd::config::{
    apply_overrides, load_config, run_training, validate_config, Cli, Command, InfoArgs,
    OutputFormat, RunOptions, TrainArgs, ValidateArgs,
};
use zerograd::data::CIFAR10_CLASSES;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    let result = match cli.command {
        Command::Train(args) => run_train(args, log_level),
        Command::Validate(args) => run_validate(args, log_level),
        Command::Info(args) => run_info(args, log_level),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

fn run_train(args: TrainArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Zerograd: Training from {}", args.config.display()),
    );

    // Load and validate config
    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    // Apply command-line overrides, then re-check them
    apply_overrides(&mut spec, &args);
    validate_config(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Dataset: {:?} ({})",
            spec.data.dataset,
            spec.data.root.display()
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Optimizer: {} (lr={}, momentum={})",
            spec.optimizer.name, spec.optimizer.lr, spec.optimizer.momentum
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Epochs: {}, batch size: {}, zero_grad: {:?} (set_to_none={})",
            spec.training.epochs,
            spec.data.batch_size,
            spec.training.zero_grad,
            spec.training.set_to_none
        ),
    );

    if args.dry_run {
        log(
            level,
            LogLevel::Normal,
            "Dry run - config validated successfully",
        );
        return Ok(());
    }

    let options = RunOptions {
        evaluate: args.evaluate,
        quiet: level == LogLevel::Quiet,
    };
    let report = run_training(&spec, options).map_err(|e| format!("Training error: {e}"))?;

    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Parameters: {}, time: {:.1}s",
            report.num_parameters, report.result.elapsed_secs
        ),
    );
    for (epoch, loss) in report.result.epoch_losses.iter().enumerate() {
        log(
            level,
            LogLevel::Verbose,
            &format!("  Epoch {}: mean loss {loss:.3}", epoch + 1),
        );
    }

    if let Some(eval) = &report.eval {
        log(
            level,
            LogLevel::Normal,
            &format!(
                "Accuracy of the network on the {} test images: {:.0} %",
                eval.total,
                100.0 * eval.accuracy()
            ),
        );
        if eval.per_class.len() == CIFAR10_CLASSES.len() {
            for (class, name) in CIFAR10_CLASSES.iter().enumerate() {
                if let Some(acc) = eval.class_accuracy(class) {
                    log(
                        level,
                        LogLevel::Verbose,
                        &format!("  Accuracy for class: {name:5} is {:.1} %", 100.0 * acc),
                    );
                }
            }
        }
    }

    if let Some(path) = &spec.training.output {
        log(
            level,
            LogLevel::Normal,
            &format!("Saved weights to {}", path.display()),
        );
    }

    Ok(())
}

fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        let net = spec.net_config();
        println!();
        println!("Configuration Summary:");
        println!("  Dataset: {:?}", spec.data.dataset);
        println!("  Root: {}", spec.data.root.display());
        println!("  Split: {}", if spec.data.train { "train" } else { "test" });
        println!("  Download: {}", spec.data.download);
        println!("  Batch size: {}", spec.data.batch_size);
        println!("  Shuffle: {}", spec.data.shuffle);
        println!("  Workers: {}", spec.data.num_workers);
        println!();
        println!("  Optimizer: {}", spec.optimizer.name);
        println!("  Learning rate: {}", spec.optimizer.lr);
        println!("  Momentum: {}", spec.optimizer.momentum);
        println!();
        println!("  Epochs: {}", spec.training.epochs);
        println!("  Zero grad: {:?}", spec.training.zero_grad);
        println!("  Set to none: {}", spec.training.set_to_none);
        if spec.training.gradient_accumulation_steps > 1 {
            println!(
                "  Gradient accumulation: {} steps",
                spec.training.gradient_accumulation_steps
            );
        }
        if let Some(clip) = spec.training.grad_clip {
            println!("  Gradient clipping: {clip}");
        }
        println!();
        println!(
            "  Model input: {}x{}x{}, {} classes",
            net.in_channels, net.image_size, net.image_size, net.num_classes
        );
    }

    Ok(())
}

fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Configuration Info:");
            println!();
            println!("Dataset: {:?}", spec.data.dataset);
            println!(
                "Optimizer: {} (lr={})",
                spec.optimizer.name, spec.optimizer.lr
            );
            println!("Epochs: {}", spec.training.epochs);
            println!("Batch size: {}", spec.data.batch_size);
            match spec.net_config().flat_features() {
                Some(flat) => println!("Flattened features: {flat}"),
                None => println!("Flattened features: invalid geometry"),
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&spec)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&spec)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
