use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::cli::{AlbumArgs, RotateArgs};
use crate::icloud::ShareToken;
use crate::retry::RetryConfig;
use crate::rotation::{AlbumSettings, RotationPolicy};

/// One album as written in a configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlbumConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub token: String,
    pub destination: String,
    #[serde(default)]
    pub ignore: usize,
    #[serde(default)]
    pub log_downloads: usize,
}

impl AlbumConfig {
    fn into_settings(self) -> anyhow::Result<AlbumSettings> {
        validate_id(&self.id)?;
        let token = ShareToken::parse(&self.token)
            .with_context(|| format!("Album '{}' has an invalid token", self.id))?;
        Ok(AlbumSettings {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            token,
            destination: expand_tilde(&self.destination),
            policy: RotationPolicy {
                ignore: self.ignore,
                log_downloads: self.log_downloads,
            },
        })
    }
}

/// Settings for the `rotate` command.
#[derive(Debug)]
pub struct Config {
    pub albums: Vec<AlbumSettings>,
    pub watch_with_interval: Option<u64>,
    pub retry: RetryConfig,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_cli(args: RotateArgs) -> anyhow::Result<Self> {
        Ok(Self {
            albums: load_albums(&args.albums)?,
            watch_with_interval: args.watch_with_interval,
            retry: RetryConfig {
                max_retries: args.max_retries,
                base_delay_secs: args.retry_delay,
                ..RetryConfig::default()
            },
            timeout_secs: args.timeout,
        })
    }
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// The id becomes part of two file names, so it must be a plain name.
fn validate_id(id: &str) -> anyhow::Result<()> {
    if id.is_empty() {
        anyhow::bail!("Album id must not be empty");
    }
    if id.contains(['/', '\\']) || id == "." || id == ".." {
        anyhow::bail!("Album id '{}' must not contain path separators", id);
    }
    Ok(())
}

fn read_config_file(path: &Path) -> anyhow::Result<Vec<AlbumConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Resolve and validate the albums named on the command line.
pub fn load_albums(args: &AlbumArgs) -> anyhow::Result<Vec<AlbumSettings>> {
    let raw = match &args.config {
        Some(path) => read_config_file(&expand_tilde(path))?,
        None => {
            let token = args
                .token
                .clone()
                .context("--token (or --config) is required")?;
            let destination = args
                .destination
                .clone()
                .context("--destination is required with --token")?;
            vec![AlbumConfig {
                id: args.id.clone(),
                name: args.name.clone(),
                token,
                destination,
                ignore: args.ignore,
                log_downloads: args.log_downloads,
            }]
        }
    };
    if raw.is_empty() {
        anyhow::bail!("No albums configured");
    }

    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|album| {
            if !seen.insert(album.id.clone()) {
                anyhow::bail!("Duplicate album id '{}'", album.id);
            }
            album.into_settings()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn album_args(overrides: impl FnOnce(&mut AlbumArgs)) -> AlbumArgs {
        let cli = crate::cli::Cli::try_parse_from([
            "icloud-album-rotator",
            "status",
            "--token",
            "A1xyz",
            "--destination",
            "/tmp/photos",
        ])
        .unwrap();
        let crate::cli::Command::Status(mut args) = cli.command else {
            unreachable!()
        };
        overrides(&mut args);
        args
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/Pictures");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("Pictures"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(expand_tilde("/srv/photos"), PathBuf::from("/srv/photos"));
        assert_eq!(expand_tilde("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_inline_album() {
        let albums = load_albums(&album_args(|a| {
            a.ignore = 5;
            a.name = Some("Kitchen".into());
        }))
        .unwrap();
        assert_eq!(albums.len(), 1);
        let album = &albums[0];
        assert_eq!(album.id, "shared_album");
        assert_eq!(album.name, "Kitchen");
        assert_eq!(album.token.host(), "p1-sharedstreams.icloud.com");
        assert_eq!(album.destination, PathBuf::from("/tmp/photos"));
        assert_eq!(album.policy.ignore, 5);
    }

    #[test]
    fn test_name_defaults_to_id() {
        let albums = load_albums(&album_args(|_| {})).unwrap();
        assert_eq!(albums[0].name, "shared_album");
    }

    #[test]
    fn test_inline_requires_destination() {
        assert!(load_albums(&album_args(|a| a.destination = None)).is_err());
    }

    #[test]
    fn test_inline_rejects_short_token() {
        assert!(load_albums(&album_args(|a| a.token = Some("A".into()))).is_err());
    }

    #[test]
    fn test_rejects_path_in_id() {
        assert!(load_albums(&album_args(|a| a.id = "../escape".into())).is_err());
        assert!(load_albums(&album_args(|a| a.id = String::new())).is_err());
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("albums.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "kitchen", "token": "B0Gabc", "destination": "/srv/kitchen", "ignore": 10},
                {"id": "hall", "name": "Hallway", "token": "A2xyz", "destination": "/srv/hall", "log_downloads": 50}
            ]"#,
        )
        .unwrap();
        let albums = load_albums(&album_args(|a| {
            a.token = None;
            a.config = Some(path.display().to_string());
        }))
        .unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].name, "kitchen");
        assert_eq!(albums[0].policy.ignore, 10);
        assert_eq!(albums[1].name, "Hallway");
        assert_eq!(albums[1].token.partition(), 2);
        assert_eq!(albums[1].policy.log_downloads, 50);
    }

    #[test]
    fn test_config_file_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("albums.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "a", "token": "A1x", "destination": "/srv/a"},
                {"id": "a", "token": "A2x", "destination": "/srv/b"}
            ]"#,
        )
        .unwrap();
        let err = load_albums(&album_args(|a| {
            a.token = None;
            a.config = Some(path.display().to_string());
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate album id"));
    }

    #[test]
    fn test_config_file_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("albums.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(load_albums(&album_args(|a| {
            a.token = None;
            a.config = Some(path.display().to_string());
        }))
        .is_err());
    }

    #[test]
    fn test_from_cli_retry_settings() {
        let cli = crate::cli::Cli::try_parse_from([
            "icloud-album-rotator",
            "rotate",
            "--token",
            "A1xyz",
            "-d",
            "/tmp/photos",
            "--max-retries",
            "4",
            "--retry-delay",
            "0",
            "--watch-with-interval",
            "600",
        ])
        .unwrap();
        let crate::cli::Command::Rotate(args) = cli.command else {
            unreachable!()
        };
        let config = Config::from_cli(args).unwrap();
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.base_delay_secs, 0);
        assert_eq!(config.watch_with_interval, Some(600));
        assert_eq!(config.albums.len(), 1);
    }
}
