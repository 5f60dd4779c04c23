use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{Result, SpendreelError},
    provider::api_key_from_env,
};

/// Finds a downloadable stock clip for a short topic phrase.
#[async_trait]
pub trait MediaSearch: Send + Sync {
    async fn find_download_url(&self, phrase: &str) -> Result<Option<String>>;
}

/// Retrieves a URL into a local file.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

const PEXELS_API_URL: &str = "https://api.pexels.com";

pub struct PexelsSearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct VideoSearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    #[serde(default)]
    video_files: Vec<PexelsVideoFile>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideoFile {
    link: Option<String>,
}

impl PexelsSearch {
    pub const ENV_VAR: &'static str = "PEXELS_API_KEY";

    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: PEXELS_API_URL.to_string(),
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        Ok(Self::new(client, api_key_from_env(Self::ENV_VAR)?))
    }
}

/// First file variant of the first video that has one.
fn first_download_link(response: &VideoSearchResponse) -> Option<String> {
    response
        .videos
        .iter()
        .find(|video| !video.video_files.is_empty())
        .and_then(|video| video.video_files[0].link.clone())
}

#[async_trait]
impl MediaSearch for PexelsSearch {
    async fn find_download_url(&self, phrase: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/videos/search", self.base_url))
            .header("Authorization", &self.api_key)
            .query(&[("query", phrase), ("per_page", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpendreelError::SearchFailed {
                phrase: phrase.to_string(),
                reason: format!("status {}: {}", status, body),
            });
        }

        let body = response.text().await?;
        let parsed: VideoSearchResponse =
            serde_json::from_str(&body).map_err(|e| SpendreelError::SearchFailed {
                phrase: phrase.to_string(),
                reason: format!("malformed search payload: {}", e),
            })?;

        Ok(first_download_link(&parsed))
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpendreelError::DownloadFailed {
                url: url.to_string(),
                reason: format!("status {}", status),
            });
        }

        let mut file = fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// Local file name for a phrase: whitespace and path-unsafe characters become `_`.
pub fn asset_filename(phrase: &str) -> String {
    let stem: String = phrase
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.mp4", stem)
}

/// Searches and downloads one clip per topic phrase.
pub struct AssetResolver<'a> {
    search: &'a dyn MediaSearch,
    fetcher: &'a dyn FileFetcher,
    downloads_dir: &'a Path,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<'a> AssetResolver<'a> {
    pub fn new(
        search: &'a dyn MediaSearch,
        fetcher: &'a dyn FileFetcher,
        downloads_dir: &'a Path,
    ) -> Self {
        Self {
            search,
            fetcher,
            downloads_dir,
            max_attempts: 1,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_retries(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// `Ok(None)` when the service has no clip (or no downloadable file) for the phrase.
    pub async fn resolve(&self, phrase: &str) -> Result<Option<PathBuf>> {
        if phrase.trim().is_empty() {
            return Ok(None);
        }

        let mut attempt = 1;
        loop {
            match self.try_resolve(phrase).await {
                Ok(found) => return Ok(found),
                Err(e) if attempt < self.max_attempts => {
                    warn!(phrase, attempt, error = %e, "asset resolution attempt failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_resolve(&self, phrase: &str) -> Result<Option<PathBuf>> {
        let Some(url) = self.search.find_download_url(phrase).await? else {
            debug!(phrase, "no clip found");
            return Ok(None);
        };

        fs::create_dir_all(self.downloads_dir).await?;
        let dest = self.downloads_dir.join(asset_filename(phrase));
        // Concurrent segments may share a phrase; only complete files are renamed into place.
        let partial = dest.with_extension(format!("{}.part", Uuid::new_v4()));

        if let Err(e) = self.fetcher.fetch(&url, &partial).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        fs::rename(&partial, &dest).await?;

        info!(phrase, path = %dest.display(), "clip downloaded");
        Ok(Some(dest))
    }
}

/// Delete every downloaded clip. Returns how many files were removed.
pub async fn clean_downloads(downloads_dir: &Path) -> Result<usize> {
    if !fs::try_exists(downloads_dir).await? {
        return Ok(0);
    }

    let mut removed = 0;
    let mut entries = fs::read_dir(downloads_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete download"),
        }
    }

    Ok(removed)
}
