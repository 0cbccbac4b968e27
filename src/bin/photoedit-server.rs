//! Photo editor HTTP server
//!
//! Serves the fixed editing pipelines over multipart `POST` routes.

#[cfg(feature = "cli")]
use photoedit::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
