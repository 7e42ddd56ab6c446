use clap::{Args, Parser, Subcommand};

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "icloud-album-rotator",
    about = "Rotate one photo at a time from public iCloud shared albums"
)]
pub struct Cli {
    /// Log level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a fresh photo for every configured album
    Rotate(RotateArgs),
    /// Show the download history and current image of every configured album
    Status(AlbumArgs),
}

/// Where album configurations come from: a JSON file, or a single album
/// given inline.
#[derive(Args, Debug, Clone)]
pub struct AlbumArgs {
    /// JSON file holding an array of album configurations
    #[arg(short = 'c', long, conflicts_with = "token")]
    pub config: Option<String>,

    /// Share token of a public shared album (the part after `#` in the share link)
    #[arg(short = 't', long, env = "ICLOUD_SHARE_TOKEN")]
    pub token: Option<String>,

    /// Directory receiving the image and the download log
    #[arg(short = 'd', long)]
    pub destination: Option<String>,

    /// Configuration id, used to name `{id}.jpg` and `{id}_log.txt`
    #[arg(long, default_value = "shared_album")]
    pub id: String,

    /// Display name (defaults to the id)
    #[arg(long)]
    pub name: Option<String>,

    /// Do not pick any of the last N downloaded photos again (0 = off)
    #[arg(long, default_value_t = 0)]
    pub ignore: usize,

    /// Keep at most N entries in the download log when --ignore is 0 (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub log_downloads: usize,
}

#[derive(Args, Debug, Clone)]
pub struct RotateArgs {
    #[command(flatten)]
    pub albums: AlbumArgs,

    /// Run continuously, rotating every N seconds
    #[arg(long)]
    pub watch_with_interval: Option<u64>,

    /// Retries for the album listing call after the first attempt
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay in seconds between retries
    #[arg(long, default_value_t = 1)]
    pub retry_delay: u64,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}
