use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use neonbot_common::models::Song;
use neonbot_common::traits::api::LyricsProvider;

use crate::Error;
use crate::http::HttpClient;
use crate::lyrics::scrape::extract_lyrics;

const SEARCH_URL: &str = "https://api.genius.com/search";
const SITE_URL: &str = "https://genius.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    path: Option<String>,
    title: Option<String>,
    primary_artist: Option<HitArtist>,
}

#[derive(Debug, Deserialize)]
struct HitArtist {
    name: Option<String>,
}

/// Genius search API plus a scrape of the song page.
pub struct GeniusProvider {
    http: Arc<dyn HttpClient>,
    token: String,
    retries: u32,
    backoff: Duration,
}

impl GeniusProvider {
    pub fn new(http: Arc<dyn HttpClient>, token: &str) -> Self {
        Self {
            http,
            token: token.to_string(),
            retries: 1,
            backoff: Duration::from_millis(300),
        }
    }

    /// Sleep between attempts is `backoff * attempt`.
    pub fn with_retry(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, query: &str) -> Result<Option<Song>, Error> {
        let url = Url::parse_with_params(SEARCH_URL, &[("q", query)])?;
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", self.token));

        let search = self.http.get(url.to_string(), headers).await?;
        debug!(status = search.status, len = search.body.len(), "genius search response");
        if !search.is_success() {
            return Err(Error::Provider(format!("genius search returned {}", search.status)));
        }

        let parsed: SearchResponse = serde_json::from_str(&search.body)?;
        let Some(top) = parsed.response.hits.into_iter().next().map(|h| h.result) else {
            info!(query, "genius: no hits");
            return Ok(None);
        };
        let Some(path) = top.path else {
            info!(query, "genius: top hit has no page path");
            return Ok(None);
        };

        let title = top.title.unwrap_or_else(|| "Unknown".to_string());
        let artist = top
            .primary_artist
            .and_then(|a| a.name)
            .unwrap_or_else(|| "Unknown".to_string());

        let page = self
            .http
            .get(format!("{SITE_URL}{path}"), HashMap::new())
            .await?;
        if !page.is_success() {
            return Err(Error::Provider(format!("genius page returned {}", page.status)));
        }

        let text = extract_lyrics(&page.body);
        if text.is_empty() {
            warn!(%title, "genius: page had no lyrics markup");
        }
        Ok(Some(Song::new(&title, &artist, &text, self.name())))
    }
}

#[async_trait]
impl LyricsProvider for GeniusProvider {
    fn name(&self) -> &str {
        "genius"
    }

    async fn fetch(&self, query: &str) -> Result<Option<Song>, Error> {
        let mut last_error = None;
        for attempt in 1..=self.retries + 1 {
            match self.attempt(query).await {
                Ok(found) => return Ok(found),
                Err(e) => {
                    warn!(attempt, "genius lookup failed: {e}");
                    last_error = Some(e);
                    if attempt <= self.retries {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| Error::Provider("genius: no attempts made".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockHttpClient};

    const SEARCH_JSON: &str = r#"{"meta":{"status":200},"response":{"hits":[
        {"result":{"path":"/Adele-hello-lyrics","title":"Hello","primary_artist":{"name":"Adele"}}}
    ]}}"#;
    const PAGE_HTML: &str =
        r#"<div data-lyrics-container="true">Hello<br/>It's me</div>"#;

    #[tokio::test]
    async fn search_then_scrape() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url, headers| {
                url.starts_with(SEARCH_URL)
                    && url.contains("q=adele+hello")
                    && headers.get("Authorization").map(String::as_str) == Some("Bearer tok")
            })
            .times(1)
            .returning(|_, _| Ok(HttpResponse::new(200, SEARCH_JSON)));
        http.expect_get()
            .withf(|url, _| url == "https://genius.com/Adele-hello-lyrics")
            .times(1)
            .returning(|_, _| Ok(HttpResponse::new(200, PAGE_HTML)));

        let provider = GeniusProvider::new(Arc::new(http), "tok");
        let song = provider.fetch("adele hello").await.unwrap().unwrap();
        assert_eq!(song.title, "Hello");
        assert_eq!(song.artist, "Adele");
        assert_eq!(song.full_text, "Hello\nIt's me");
        assert_eq!(song.source, "genius");
    }

    #[tokio::test]
    async fn no_hits_is_not_found() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .times(1)
            .returning(|_, _| Ok(HttpResponse::new(200, r#"{"response":{"hits":[]}}"#)));

        let provider = GeniusProvider::new(Arc::new(http), "tok");
        assert!(provider.fetch("zzzz").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_reports_provider_error() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .times(2)
            .returning(|_, _| Ok(HttpResponse::new(503, "unavailable")));

        let provider = GeniusProvider::new(Arc::new(http), "tok");
        let err = provider.fetch("adele hello").await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
