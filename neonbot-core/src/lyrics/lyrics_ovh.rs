use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use neonbot_common::models::Song;
use neonbot_common::traits::api::LyricsProvider;

use crate::Error;
use crate::http::HttpClient;

const API_BASE: &str = "https://api.lyrics.ovh/v1";

#[derive(Debug, Deserialize)]
struct OvhResponse {
    #[serde(default)]
    lyrics: String,
}

/// Split `"Artist - Title"`; `None` when the query has no usable separator.
pub fn split_artist_title(query: &str) -> Option<(String, String)> {
    let (artist, title) = query.split_once(" - ")?;
    let (artist, title) = (artist.trim(), title.trim());
    if artist.is_empty() || title.is_empty() {
        return None;
    }
    Some((artist.to_string(), title.to_string()))
}

/// lyrics.ovh only works with an exact artist and title.
pub struct LyricsOvhProvider {
    http: Arc<dyn HttpClient>,
}

impl LyricsOvhProvider {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LyricsProvider for LyricsOvhProvider {
    fn name(&self) -> &str {
        "lyrics.ovh"
    }

    async fn fetch(&self, query: &str) -> Result<Option<Song>, Error> {
        let Some((artist, title)) = split_artist_title(query) else {
            debug!(query, "lyrics.ovh needs 'Artist - Title', skipping");
            return Ok(None);
        };

        let url = format!(
            "{API_BASE}/{}/{}",
            urlencoding::encode(&artist),
            urlencoding::encode(&title)
        );
        let response = self.http.get(url, HashMap::new()).await?;
        debug!(status = response.status, "lyrics.ovh response");

        match response.status {
            200 => {}
            404 => return Ok(None),
            other => return Err(Error::Provider(format!("lyrics.ovh returned {other}"))),
        }

        let parsed: OvhResponse = serde_json::from_str(&response.body)?;
        if parsed.lyrics.trim().is_empty() {
            info!(%artist, %title, "lyrics.ovh: empty lyrics");
            return Ok(None);
        }
        Ok(Some(Song::new(&title, &artist, &parsed.lyrics, self.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockHttpClient};

    #[test]
    fn splits_on_first_separator() {
        assert_eq!(
            split_artist_title(" AC/DC - Back In Black - Live "),
            Some(("AC/DC".to_string(), "Back In Black - Live".to_string()))
        );
        assert_eq!(split_artist_title("just a title"), None);
        assert_eq!(split_artist_title(" - title"), None);
    }

    #[tokio::test]
    async fn fetches_encoded_path() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url, _| url == "https://api.lyrics.ovh/v1/AC%2FDC/Back%20In%20Black")
            .times(1)
            .returning(|_, _| Ok(HttpResponse::new(200, r#"{"lyrics":"Back in black\nI hit the sack"}"#)));

        let provider = LyricsOvhProvider::new(Arc::new(http));
        let song = provider.fetch("AC/DC - Back In Black").await.unwrap().unwrap();
        assert_eq!(song.artist, "AC/DC");
        assert_eq!(song.title, "Back In Black");
        assert_eq!(song.lines(), vec!["Back in black", "I hit the sack"]);
    }

    #[tokio::test]
    async fn no_separator_makes_no_request() {
        let http = MockHttpClient::new();
        let provider = LyricsOvhProvider::new(Arc::new(http));
        assert!(provider.fetch("hello").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_song_is_not_found() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .returning(|_, _| Ok(HttpResponse::new(404, r#"{"error":"No lyrics found"}"#)));
        let provider = LyricsOvhProvider::new(Arc::new(http));
        assert!(provider.fetch("a - b").await.unwrap().is_none());
    }
}
