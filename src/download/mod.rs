//! Asset byte download and whole-file replacement on disk.

pub mod error;
pub mod file;

pub use error::DownloadError;
pub use file::{download_file, replace_file};
