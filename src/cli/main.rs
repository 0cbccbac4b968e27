//! Photo editor server command line

use super::config::CliConfigBuilder;
use crate::config::ServerConfig;
use crate::processor::ForegroundProcessor;
use crate::server;
use crate::tracing_config::{init_server_tracing, TracingFormat};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

/// Stateless photo editing HTTP backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "photoedit-server")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Interface to bind [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on [default: 10000]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// JSON configuration file; flags override its values
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// ONNX model file or model directory enabling the segmentation operations
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Execution provider for the segmentation model (auto, cpu, cuda, coreml)
    #[arg(short, long)]
    pub execution_provider: Option<String>,

    /// Inference threads (0 = auto-detect)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Force one JPEG quality (1-100) for every operation
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Largest accepted upload in MiB
    #[arg(long, value_name = "MIB")]
    pub max_upload_mb: Option<usize>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Serve segmentation operations with the built-in soft-disc mask instead of a model
    #[arg(long, conflicts_with = "model")]
    pub mock_segmentation: bool,

    /// Disable permissive CORS headers
    #[arg(long)]
    pub no_cors: bool,

    /// Show execution provider diagnostics and exit
    #[arg(long)]
    pub show_providers: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_server_tracing(cli.verbose, cli.log_format.into())
        .context("Failed to initialize tracing")?;

    if cli.show_providers {
        show_provider_diagnostics();
        return Ok(());
    }

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    info!(
        host = %config.host,
        port = config.port,
        max_upload_bytes = config.max_upload_bytes,
        provider = %config.inference.execution_provider,
        "configuration loaded"
    );

    let foreground = load_foreground(&cli, &config)?;
    server::serve(config, foreground)
        .await
        .context("Server terminated with an error")
}

/// Segmentation processor for the configured model, if any
fn load_foreground(cli: &Cli, config: &ServerConfig) -> Result<Option<ForegroundProcessor>> {
    if cli.mock_segmentation {
        warn!("using the mock segmentation model; cutouts are a fixed soft disc");
        return ForegroundProcessor::mock()
            .map(Some)
            .context("Failed to initialize mock segmentation");
    }

    match &config.model_path {
        Some(path) => ForegroundProcessor::from_model_path(path, &config.inference)
            .map(Some)
            .with_context(|| format!("Failed to load segmentation model '{}'", path.display())),
        None => {
            warn!("no model configured; background removal and sky replacement are disabled");
            Ok(None)
        },
    }
}

fn show_provider_diagnostics() {
    let cpu_count = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    println!("System: {cpu_count} CPU cores detected");

    #[cfg(feature = "onnx")]
    {
        println!("\nExecution providers:");
        for (name, available, description) in crate::backends::OnnxBackend::list_providers() {
            let status = if available { "available" } else { "not available" };
            println!("  {name}: {status} - {description}");
        }
    }

    #[cfg(not(feature = "onnx"))]
    println!("\nBuilt without the `onnx` feature; only mock segmentation is available.");
}
