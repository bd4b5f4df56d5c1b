use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::infra::http::{Transport, TransportError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] TransportError),

    #[error("download returned HTTP status {0}")]
    Status(u16),

    #[error("refusing to save a file named {0:?}")]
    InvalidName(String),

    #[error("failed to write download: {0}")]
    Io(#[from] std::io::Error),

    #[error("download worker stopped: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Writes `bytes` into `dir` under `file_name`, adding a ` (n)` suffix
/// instead of replacing an existing file.
pub fn save_download(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\'])
    {
        return Err(DownloadError::InvalidName(file_name.to_string()));
    }

    fs::create_dir_all(dir)?;
    for target in candidate_paths(dir, file_name) {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::AlreadyExists => continue,
            Err(error) => return Err(error.into()),
        };
        if let Err(error) = file.write_all(bytes) {
            let _ = fs::remove_file(&target);
            return Err(error.into());
        }
        return Ok(target);
    }
    Err(std::io::Error::new(ErrorKind::AlreadyExists, "no free file name left").into())
}

/// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
fn candidate_paths<'a>(dir: &'a Path, file_name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (file_name, None),
    };

    std::iter::once(dir.join(file_name)).chain((1..u32::MAX).map(move |n| match extension {
        Some(extension) => dir.join(format!("{stem} ({n}).{extension}")),
        None => dir.join(format!("{stem} ({n})")),
    }))
}

pub async fn download_asset<T: Transport>(
    transport: &T,
    url: &str,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, DownloadError> {
    let response = transport.get(url).await?;
    if !response.is_success() {
        return Err(DownloadError::Status(response.status));
    }
    let dir = dir.to_path_buf();
    let file_name = file_name.to_string();
    tokio::task::spawn_blocking(move || save_download(&dir, &file_name, &response.body)).await?
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::infra::http::testing::StubTransport;
    use tempfile::TempDir;

    #[test]
    fn save_creates_directory_and_writes_bytes() {
        let dir = TempDir::new().expect("tempdir should be created");
        let target_dir = dir.path().join("stickers");

        let path = save_download(&target_dir, "x.png", b"png").expect("save should succeed");

        assert_eq!(path, target_dir.join("x.png"));
        assert_eq!(fs::read(&path).expect("file should exist"), b"png");
    }

    #[test]
    fn save_never_overwrites() {
        let dir = TempDir::new().expect("tempdir should be created");

        let first = save_download(dir.path(), "x.png", b"one").expect("save should succeed");
        let second = save_download(dir.path(), "x.png", b"two").expect("save should succeed");
        let third = save_download(dir.path(), "x.png", b"three").expect("save should succeed");

        assert_eq!(second, dir.path().join("x (1).png"));
        assert_eq!(third, dir.path().join("x (2).png"));
        assert_eq!(fs::read(first).expect("file should exist"), b"one");
    }

    #[test]
    fn concurrent_saves_of_one_name_keep_every_file() {
        let dir = TempDir::new().expect("tempdir should be created");
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dir = dir.path().to_path_buf();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    save_download(&dir, "x.png", format!("payload-{i}").as_bytes())
                        .expect("save should succeed")
                })
            })
            .collect();
        let mut saved: Vec<PathBuf> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread should not panic"))
            .collect();
        saved.sort();
        saved.dedup();

        assert_eq!(saved.len(), 8);
        let mut payloads: Vec<String> = saved
            .iter()
            .map(|path| fs::read_to_string(path).expect("file should exist"))
            .collect();
        payloads.sort();
        let expected: Vec<String> = (0..8).map(|i| format!("payload-{i}")).collect();
        assert_eq!(payloads, expected);
    }

    #[test]
    fn save_rejects_path_components() {
        let dir = TempDir::new().expect("tempdir should be created");

        for name in ["", "..", "../escape.png", "sub/x.png", "sub\\x.png"] {
            assert!(matches!(
                save_download(dir.path(), name, b"x"),
                Err(DownloadError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn download_fetches_and_saves() {
        let dir = TempDir::new().expect("tempdir should be created");
        let transport = StubTransport::default().with("http://host/assets/a/x.png", 200, "bytes");

        let path = download_asset(&transport, "http://host/assets/a/x.png", dir.path(), "x.png")
            .await
            .expect("download should succeed");

        assert_eq!(fs::read(path).expect("file should exist"), b"bytes");
    }

    #[tokio::test]
    async fn download_reports_http_status() {
        let dir = TempDir::new().expect("tempdir should be created");
        let transport = StubTransport::default().with("http://host/assets/a/x.png", 500, "");

        let result =
            download_asset(&transport, "http://host/assets/a/x.png", dir.path(), "x.png").await;

        assert!(matches!(result, Err(DownloadError::Status(500))));
    }
}
