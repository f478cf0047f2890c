//! Lyrics lookup: Genius first, then lyrics.ovh.

pub mod genius;
pub mod lyrics_ovh;
pub mod scrape;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use neonbot_common::models::Song;
use neonbot_common::traits::api::LyricsProvider;

use crate::Error;
use crate::http::HttpClient;

pub use genius::GeniusProvider;
pub use lyrics_ovh::LyricsOvhProvider;

/// Tries each provider in order and returns the first song with text.
///
/// A provider error does not stop the chain. If every provider errored the
/// last error is returned; if some answered but none had text, the first
/// textless song is returned so callers can say "found, but empty".
pub struct LyricsService {
    providers: Vec<Arc<dyn LyricsProvider>>,
}

impl LyricsService {
    pub fn new(providers: Vec<Arc<dyn LyricsProvider>>) -> Self {
        Self { providers }
    }

    /// Genius is only used when a token is configured.
    pub fn with_defaults(http: Arc<dyn HttpClient>, genius_token: Option<&str>) -> Self {
        let mut providers: Vec<Arc<dyn LyricsProvider>> = Vec::new();
        match genius_token {
            Some(token) if !token.is_empty() => {
                providers.push(Arc::new(GeniusProvider::new(http.clone(), token)));
            }
            _ => info!("No Genius API token configured; using lyrics.ovh only"),
        }
        providers.push(Arc::new(LyricsOvhProvider::new(http)));
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

#[async_trait]
impl LyricsProvider for LyricsService {
    fn name(&self) -> &str {
        "lyrics-service"
    }

    async fn fetch(&self, query: &str) -> Result<Option<Song>, Error> {
        let mut textless: Option<Song> = None;
        let mut last_error: Option<Error> = None;
        let mut answered = false;

        for provider in &self.providers {
            match provider.fetch(query).await {
                Ok(Some(song)) if !song.is_blank() => {
                    info!(query, provider = provider.name(), title = %song.title, "lyrics found");
                    return Ok(Some(song));
                }
                Ok(Some(song)) => {
                    debug!(provider = provider.name(), "song found without lyrics text");
                    answered = true;
                    if textless.is_none() {
                        textless = Some(song);
                    }
                }
                Ok(None) => {
                    debug!(provider = provider.name(), "no result");
                    answered = true;
                }
                Err(e) => {
                    warn!(provider = provider.name(), "lyrics provider failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        match (answered, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(textless),
        }
    }
}
