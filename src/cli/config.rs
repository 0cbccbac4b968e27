//! Conversion from command-line arguments to `ServerConfig`

use crate::cli::main_impl::Cli;
use crate::config::{ExecutionProvider, ServerConfig, ServerConfigBuilder};
use anyhow::{Context, Result};

/// Layer CLI flags over the defaults or the `--config` file
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    pub(crate) fn from_cli(cli: &Cli) -> Result<ServerConfig> {
        let base = match &cli.config {
            Some(path) => ServerConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
            None => ServerConfig::default(),
        };

        let mut builder = ServerConfigBuilder::from_config(base);
        if let Some(host) = &cli.host {
            builder = builder.host(host.as_str());
        }
        if let Some(port) = cli.port {
            builder = builder.port(port);
        }
        if let Some(model) = &cli.model {
            builder = builder.model_path(model.as_path());
        }
        if let Some(provider) = &cli.execution_provider {
            let provider: ExecutionProvider =
                provider.parse().context("Invalid execution provider")?;
            builder = builder.execution_provider(provider);
        }
        if let Some(threads) = cli.threads {
            // Same count for intra and inter op parallelism
            builder = builder.intra_threads(threads).inter_threads(threads);
        }
        if let Some(quality) = cli.jpeg_quality {
            if !(1..=100).contains(&quality) {
                anyhow::bail!("JPEG quality must be between 1 and 100, got {quality}");
            }
            builder = builder.jpeg_quality_override(quality);
        }
        if let Some(mib) = cli.max_upload_mb {
            builder = builder.max_upload_bytes(mib.saturating_mul(1024 * 1024));
        }
        if cli.no_cors {
            builder = builder.cors_permissive(false);
        }

        builder.build().context("Invalid configuration")
    }
}
