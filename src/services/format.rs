//! Output format metadata
//!
//! Maps [`OutputFormat`] to the HTTP content type sent by the server.

use crate::config::OutputFormat;

/// Service for output format properties
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// MIME type sent as `Content-Type`
    #[must_use]
    pub fn content_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}
