use serde::{Deserialize, Serialize};

/// A resolved song as returned by a lyrics provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub artist: String,
    /// Full lyrics text, newline separated.
    pub full_text: String,
    /// Name of the provider that answered (e.g. "genius").
    pub source: String,
}

impl Song {
    pub fn new(title: &str, artist: &str, full_text: &str, source: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            full_text: full_text.to_string(),
            source: source.to_string(),
        }
    }

    /// Lines in order, blank lines kept (the karaoke driver skips them).
    pub fn lines(&self) -> Vec<String> {
        self.full_text
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect()
    }

    /// True when there is nothing to sing.
    pub fn is_blank(&self) -> bool {
        self.full_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_blank_entries() {
        let song = Song::new("t", "a", "Hello\r\n\r\nWorld", "test");
        assert_eq!(song.lines(), vec!["Hello", "", "World"]);
    }

    #[test]
    fn whitespace_only_is_blank() {
        assert!(Song::new("t", "a", " \n\t\n", "test").is_blank());
        assert!(!Song::new("t", "a", "la", "test").is_blank());
    }
}
