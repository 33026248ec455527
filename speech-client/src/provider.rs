use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One word boundary reported during synthesis of an SSML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEvent {
    pub word: String,
    /// Offset from the start of the audio, in milliseconds.
    pub offset_ms: u64,
}

impl WordEvent {
    pub fn new(word: impl Into<String>, offset_ms: u64) -> Self {
        Self {
            word: word.into(),
            offset_ms,
        }
    }
}

/// Result of synthesizing one SSML document.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Where the audio artifact was written.
    pub audio_path: PathBuf,
    /// Per-word boundaries in arrival order.
    pub word_events: Vec<WordEvent>,
    /// Total audio duration in milliseconds.
    pub total_duration_ms: u64,
}

/// Trait for speech synthesis providers
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize an SSML document into an audio file at `output_path`,
    /// reporting per-word offsets and the total audio duration.
    async fn synthesize(&self, ssml: &str, output_path: &Path) -> Result<Synthesis>;

    /// Get the provider name for display
    fn name(&self) -> &'static str;

    /// Check if the provider is available (credentials set, etc.)
    fn is_available(&self) -> Result<()>;
}

/// Extract the spoken words from an SSML document, in document order.
///
/// Strips every element tag and decodes the entities that SSML escaping
/// produces, leaving the whitespace-delimited words a listener would hear.
pub fn spoken_words(ssml: &str) -> Vec<String> {
    let mut text = String::with_capacity(ssml.len());
    let mut in_tag = false;

    for ch in ssml.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Keep tag boundaries word-separating.
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'");

    text.split_whitespace().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spoken_words_strips_tags() {
        let ssml = r#"<speak><voice name="x"><s><emphasis level="strong">Chapter One</emphasis></s></voice></speak>"#;
        assert_eq!(spoken_words(ssml), vec!["Chapter", "One"]);
    }

    #[test]
    fn test_spoken_words_decodes_entities() {
        let ssml = "<p>cats &amp; dogs</p>";
        assert_eq!(spoken_words(ssml), vec!["cats", "&", "dogs"]);
    }

    #[test]
    fn test_spoken_words_empty_document() {
        assert!(spoken_words("<speak></speak>").is_empty());
    }
}
