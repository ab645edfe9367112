//! vnfilter - Vietnamese profanity detection from the command line.
//!
//! Prints one JSON result per request:
//! - `vnfilter detect [TEXT]` classifies TEXT, or stdin when omitted
//! - `vnfilter samples` classifies the built-in sample texts
//! - `vnfilter info` describes the configured detector

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use vnfilter_core::{
    DetectionResult, DetectorConfig, ModelStatus, ProfanityDetector, Strategy, SAMPLE_TEXTS,
};

/// vnfilter - Vietnamese profanity detector
#[derive(Parser, Debug)]
#[command(name = "vnfilter", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Detection strategy (pattern, model)
    #[arg(long, global = true)]
    strategy: Option<Strategy>,

    /// Path to the ONNX model
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Path to tokenizer.json
    #[arg(long, global = true)]
    tokenizer_path: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a text
    Detect {
        /// Text to classify (read from stdin when omitted)
        text: Option<String>,
    },
    /// Classify the built-in sample texts
    Samples,
    /// Describe the detector
    Info,
}

#[derive(Serialize)]
struct SampleOutcome<'a> {
    text: &'a str,
    result: DetectionResult,
}

/// Initialize logging to stderr; stdout carries the JSON output.
fn init_logging(args: &Args) {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vnfilter={0},vnfilter_core={0},warn",
            log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the detector config: file, then environment, then flags.
fn build_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DetectorConfig::default(),
    }
    .with_env_overrides();

    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(path) = &args.model_path {
        config.model.model_path = path.clone();
    }
    if let Some(path) = &args.tokenizer_path {
        config.model.tokenizer_path = path.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("reading text from stdin")?;
    Ok(text)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = build_config(&args)?;
    let detector = ProfanityDetector::new(config).context("building detector")?;

    if !matches!(args.command, Command::Info) {
        if let ModelStatus::Failed(reason) = detector.wait_ready().await {
            tracing::warn!("Token classifier unavailable: {}", reason);
        }
    }

    match &args.command {
        Command::Detect { text } => {
            let text = match text {
                Some(text) => text.clone(),
                None => read_stdin()?,
            };
            print_json(&detector.detect(&text), args.pretty)?;
        }
        Command::Samples => {
            let outcomes: Vec<SampleOutcome> = SAMPLE_TEXTS
                .iter()
                .map(|&text| SampleOutcome {
                    text,
                    result: detector.detect(text),
                })
                .collect();
            print_json(&outcomes, args.pretty)?;
        }
        Command::Info => print_json(&detector.info(), args.pretty)?,
    }

    Ok(())
}
