use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use crate::icloud::transport::ByteStream;
use crate::icloud::StreamTransport;

/// Sibling `.part` path used while a file is being replaced.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Replace `path` with `contents`. Bytes go to a `.part` sibling first and
/// are renamed into place, so readers see either the old or the new file.
pub async fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let part = part_path(path);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&part)
        .await?;
    if let Err(e) = file.write_all(contents).await {
        drop(file);
        let _ = fs::remove_file(&part).await;
        return Err(e);
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&part, path).await
}

/// Fetch `url` and stream the body into `download_path`.
///
/// Returns the number of bytes written. The existing file is left alone
/// unless the whole body arrived with a 200.
pub async fn download_file(
    transport: &dyn StreamTransport,
    url: &str,
    download_path: &Path,
) -> Result<u64, DownloadError> {
    let reply = transport
        .get(url)
        .await
        .map_err(|source| DownloadError::Transport {
            url: url.to_string(),
            source,
        })?;
    tracing::debug!(status = reply.status, %url, "Asset download response");
    if reply.status != 200 {
        return Err(DownloadError::HttpStatus {
            status: reply.status,
            url: url.to_string(),
        });
    }

    let part = part_path(download_path);
    let bytes_written = match write_part(reply.body, url, &part).await {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&part).await;
            return Err(e);
        }
    };
    fs::rename(&part, download_path).await?;
    tracing::debug!(path = %download_path.display(), bytes = bytes_written, "File downloaded");
    Ok(bytes_written)
}

async fn write_part(mut body: ByteStream, url: &str, part: &Path) -> Result<u64, DownloadError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part)
        .await?;
    let mut bytes_written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| {
            tracing::warn!(%url, bytes_so_far = bytes_written, error = %source, "Body read failed");
            DownloadError::Transport {
                url: url.to_string(),
                source,
            }
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(bytes_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icloud::stream::tests::ScriptedTransport;

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/tmp/x/album.jpg")),
            PathBuf::from("/tmp/x/album.jpg.part")
        );
    }

    #[tokio::test]
    async fn test_replace_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        replace_file(&path, b"first").await.unwrap();
        replace_file(&path, b"second").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!part_path(&path).exists());
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album.jpg");
        let transport = ScriptedTransport::default();
        transport.reply("https://cdn.example/IMG.JPG?o=1", 200, b"jpeg-bytes".to_vec());

        let written = download_file(&transport, "https://cdn.example/IMG.JPG?o=1", &path)
            .await
            .unwrap();
        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_download_non_200_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album.jpg");
        std::fs::write(&path, b"old").unwrap();
        let transport = ScriptedTransport::default();
        transport.reply("https://cdn.example/gone.JPG", 404, "not found");

        let err = download_file(&transport, "https://cdn.example/gone.JPG", &path)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::HttpStatus { status: 404, .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_download_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::default();
        let err = download_file(&transport, "https://cdn.example/none", &dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_download_broken_body_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album.jpg");
        std::fs::write(&path, b"old").unwrap();
        let transport = ScriptedTransport::default();
        transport.reply_truncated("https://cdn.example/IMG.JPG", b"half".to_vec());

        let err = download_file(&transport, "https://cdn.example/IMG.JPG", &path)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Transport { .. }));
        assert!(!err.aborts_cycle());
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
        assert!(!part_path(&path).exists());
    }

    #[tokio::test]
    async fn test_download_unwritable_part_is_disk_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album.jpg");
        std::fs::create_dir(part_path(&path)).unwrap();
        let transport = ScriptedTransport::default();
        transport.reply("https://cdn.example/IMG.JPG", 200, b"bytes".to_vec());

        let err = download_file(&transport, "https://cdn.example/IMG.JPG", &path)
            .await
            .unwrap_err();
        assert!(err.aborts_cycle());
        assert!(!path.exists());
    }
}
