//! Attachment storage on the local filesystem.

use chrono::Utc;
use futures::{Stream, TryStreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// URL prefix the stored files are served under.
pub const PUBLIC_PREFIX: &str = "uploads";

pub const IMAGE_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("file exceeds {0} bytes")]
    TooLarge(usize),

    #[error("upload interrupted: {0}")]
    Upload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self { root: root.into(), max_bytes }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), FileStorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Stream `chunks` to a new file and return its public path
    /// (`uploads/[subdir/]PREFIX_<ts>_<id>_<name>`).
    pub async fn save_stream<S, B, E>(
        &self,
        subdir: Option<&str>,
        prefix: &str,
        original_name: &str,
        mut chunks: S,
    ) -> Result<String, FileStorageError>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Display,
    {
        let dir = match subdir {
            Some(sub) => self.root.join(sub),
            None => self.root.clone(),
        };
        fs::create_dir_all(&dir).await?;

        let name = stored_name(prefix, original_name);
        let path = dir.join(&name);
        let mut file = fs::File::create(&path).await?;

        let mut written = 0usize;
        let result: Result<(), FileStorageError> = async {
            while let Some(chunk) = chunks
                .try_next()
                .await
                .map_err(|e| FileStorageError::Upload(e.to_string()))?
            {
                let bytes = chunk.as_ref();
                written += bytes.len();
                if written > self.max_bytes {
                    return Err(FileStorageError::TooLarge(self.max_bytes));
                }
                file.write_all(bytes).await?;
            }
            if written == 0 {
                return Err(FileStorageError::Empty);
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(err) = result {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!("Could not remove partial upload {}: {}", path.display(), cleanup);
            }
            return Err(err);
        }

        debug!(bytes = written, "Stored upload {}", path.display());
        Ok(match subdir {
            Some(sub) => format!("{}/{}/{}", PUBLIC_PREFIX, sub, name),
            None => format!("{}/{}", PUBLIC_PREFIX, name),
        })
    }

    /// Best-effort removal of a file returned by [`FileStorage::save_stream`].
    pub async fn discard(&self, public_path: &str) {
        let relative = public_path
            .strip_prefix(PUBLIC_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(public_path);
        if relative.split('/').any(|part| part == "..") {
            return;
        }
        if let Err(e) = fs::remove_file(self.root.join(relative)).await {
            warn!("Could not remove {}: {}", public_path, e);
        }
    }
}

/// Unique on-disk name that keeps a sanitized form of the client's filename.
pub fn stored_name(prefix: &str, original_name: &str) -> String {
    let ts = Utc::now().format("%Y%m%d%H%M%S");
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}_{}", prefix, ts, &id[..8], sanitize(original_name))
}

fn sanitize(original_name: &str) -> String {
    // Drop any client-supplied directory part
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "file".to_string() } else { cleaned }
}
