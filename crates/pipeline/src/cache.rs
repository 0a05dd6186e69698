//! Local artifact cache and duration probe used on completion.
//!
//! Both are best-effort collaborators: the completion handler logs their
//! failures and carries on with the provider-reported values.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use vidgen_core::ffmpeg::{self, FfmpegError};
use vidgen_core::types::DbId;

/// Extension used when the URL path does not carry a usable one.
const DEFAULT_EXTENSION: &str = "mp4";

/// Hex characters of the URL digest kept in a cache file name.
const URL_HASH_LEN: usize = 16;

/// Errors from fetching an artifact into the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("download returned HTTP {0}")]
    Status(u16),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches a remote artifact to local storage.
#[async_trait]
pub trait ArtifactCache: Send + Sync {
    /// Download `url` for `job_id` under `category`, returning the local path.
    async fn fetch(&self, job_id: DbId, url: &str, category: &str) -> Result<PathBuf, CacheError>;
}

/// Reads the authoritative duration of a local video file.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration in (fractional) seconds.
    async fn probe_secs(&self, path: &Path) -> Result<f64, FfmpegError>;
}

/// [`ArtifactCache`] writing under `{root}/{category}/`.
pub struct LocalArtifactCache {
    client: reqwest::Client,
    root: PathBuf,
}

impl LocalArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_client(reqwest::Client::new(), root)
    }

    pub fn with_client(client: reqwest::Client, root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<(), CacheError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::Status(status.as_u16()));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactCache for LocalArtifactCache {
    async fn fetch(&self, job_id: DbId, url: &str, category: &str) -> Result<PathBuf, CacheError> {
        let dir = self.root.join(category);
        tokio::fs::create_dir_all(&dir).await?;

        let name = cache_file_name(job_id, url);
        let dest = dir.join(&name);
        if tokio::fs::try_exists(&dest).await? {
            tracing::debug!(job_id, path = %dest.display(), "Artifact already cached");
            return Ok(dest);
        }

        // Partial downloads never occupy the final name.
        let partial = dir.join(format!(".{name}.{}.part", uuid::Uuid::new_v4()));
        if let Err(e) = self.download_to(url, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        tokio::fs::rename(&partial, &dest).await?;

        Ok(dest)
    }
}

/// [`DurationProbe`] shelling out to `ffprobe`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeDurationProbe;

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe_secs(&self, path: &Path) -> Result<f64, FfmpegError> {
        ffmpeg::probe_duration_secs(path).await
    }
}

/// `{job_id}_{sha256(url)[..16]}.{ext}`.
pub fn cache_file_name(job_id: DbId, url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    format!(
        "{job_id}_{}.{}",
        &digest[..URL_HASH_LEN],
        url_extension(url).unwrap_or(DEFAULT_EXTENSION)
    )
}

/// File extension of the URL path, ignoring query and fragment.
fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    let valid = !stem.is_empty()
        && (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}
