use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{Result, SpendreelError},
    provider::api_key_from_env,
};

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Money-saving video suggestions from the YouTube Data API.
pub struct YouTubeSearch {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    kind: String,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

impl YouTubeSearch {
    pub const ENV_VAR: &'static str = "YOUTUBE_API_KEY";
    pub const MAX_RESULTS: u32 = 5;

    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            api_url: YOUTUBE_SEARCH_URL.to_string(),
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        Ok(Self::new(client, api_key_from_env(Self::ENV_VAR)?))
    }

    /// Watch URLs for up to [`Self::MAX_RESULTS`] videos matching `query`, in ranking order.
    pub async fn video_links(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            debug!("empty suggestion query, skipping search");
            return Ok(Vec::new());
        }

        let max_results = Self::MAX_RESULTS.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpendreelError::SuggestionsFailed {
                query: query.to_string(),
                reason: format!("status {}: {}", status, body),
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SpendreelError::SuggestionsFailed {
                query: query.to_string(),
                reason: format!("malformed search payload: {}", e),
            })?;

        let links = watch_links(parsed);
        info!(query, count = links.len(), "video suggestions found");
        Ok(links)
    }
}

fn watch_links(response: SearchResponse) -> Vec<String> {
    response
        .items
        .into_iter()
        .filter(|item| item.id.kind == "youtube#video")
        .filter_map(|item| item.id.video_id)
        .map(|id| format!("https://www.youtube.com/watch?v={}", id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{local_client, serve_once};

    fn search_at(base_url: &str) -> YouTubeSearch {
        let mut search = YouTubeSearch::new(local_client(), "yt-key".to_string());
        search.api_url = format!("{base_url}/youtube/v3/search");
        search
    }

    #[tokio::test]
    async fn returns_watch_urls_for_videos_only() {
        let body = r#"{"items":[
            {"id":{"kind":"youtube#video","videoId":"abc123"}},
            {"id":{"kind":"youtube#channel","channelId":"UCxyz"}},
            {"id":{"kind":"youtube#video","videoId":"def456"}}
        ]}"#;
        let (base_url, request) = serve_once("200 OK", "application/json", body).await;

        let links = search_at(&base_url)
            .video_links("save money on groceries")
            .await
            .unwrap();
        assert_eq!(
            links,
            vec![
                "https://www.youtube.com/watch?v=abc123",
                "https://www.youtube.com/watch?v=def456",
            ]
        );

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /youtube/v3/search?"));
        assert!(request.contains("q=save+money+on+groceries"));
        assert!(request.contains("maxResults=5"));
        assert!(request.contains("type=video"));
        assert!(request.contains("key=yt-key"));
    }

    #[tokio::test]
    async fn error_status_is_suggestions_failure() {
        let (base_url, _) =
            serve_once("403 Forbidden", "application/json", r#"{"error":"quotaExceeded"}"#).await;

        let err = search_at(&base_url).video_links("budgeting").await.unwrap_err();
        match err {
            SpendreelError::SuggestionsFailed { query, reason } => {
                assert_eq!(query, "budgeting");
                assert!(reason.contains("403"));
                assert!(reason.contains("quotaExceeded"));
            }
            other => panic!("expected SuggestionsFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_query_makes_no_request() {
        let search = search_at("http://127.0.0.1:9");
        assert!(search.video_links("   ").await.unwrap().is_empty());
    }
}
