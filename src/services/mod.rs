//! Codec services shared by the pipelines and the server

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
