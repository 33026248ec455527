//! Azure Cognitive Services TTS provider
//!
//! Direct HTTP implementation for the Azure speech synthesis REST endpoint.
//! The REST transport returns audio only, without the SDK's word-boundary
//! event stream, so per-word offsets are estimated by distributing the
//! measured audio duration over the spoken words weighted by length.

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;

use crate::error::{Result, SpeechError};
use crate::provider::{SpeechProvider, Synthesis, WordEvent, spoken_words};

/// Output format requested from the service.
const OUTPUT_FORMAT: &str = "audio-16khz-128kbitrate-mono-mp3";

/// Bitrate of `OUTPUT_FORMAT` in kilobits per second, used to derive the
/// audio duration from the payload size.
const OUTPUT_KBITS_PER_SEC: u64 = 128;

/// Provider for the Azure TTS REST API
pub struct AzureProvider {
    key: String,
    region: String,
    client: Client,
}

impl AzureProvider {
    /// Create a new Azure provider for the given subscription key and region.
    pub fn new(key: String, region: String) -> Self {
        Self {
            key,
            region,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.region
        )
    }
}

#[async_trait]
impl SpeechProvider for AzureProvider {
    async fn synthesize(&self, ssml: &str, output_path: &Path) -> Result<Synthesis> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", "rapid-read")
            .body(ssml.to_string())
            .send()
            .await
            .map_err(|e| SpeechError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let message = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => SpeechError::Auth(message),
                429 => SpeechError::QuotaExceeded { retry_after },
                400 => SpeechError::InvalidMarkup(message),
                code => SpeechError::ApiError {
                    message,
                    status_code: Some(code),
                },
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Network(format!("Failed to read audio body: {}", e)))?;
        std::fs::write(output_path, &audio)?;

        let total_duration_ms = audio.len() as u64 * 8 / OUTPUT_KBITS_PER_SEC;
        let word_events = estimate_word_events(ssml, total_duration_ms);
        log::debug!(
            "synthesized {} bytes (~{} ms, {} words) to {}",
            audio.len(),
            total_duration_ms,
            word_events.len(),
            output_path.display()
        );

        Ok(Synthesis {
            audio_path: output_path.to_path_buf(),
            word_events,
            total_duration_ms,
        })
    }

    fn name(&self) -> &'static str {
        "Azure TTS"
    }

    fn is_available(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(SpeechError::MissingCredentials {
                env_var: "SPEECH_KEY".to_string(),
            });
        }
        if self.region.is_empty() {
            return Err(SpeechError::MissingCredentials {
                env_var: "SPEECH_REGION".to_string(),
            });
        }
        Ok(())
    }
}

/// Distribute `total_duration_ms` over the spoken words of `ssml`, weighting
/// each word by its character length plus one for the trailing pause.
fn estimate_word_events(ssml: &str, total_duration_ms: u64) -> Vec<WordEvent> {
    let words = spoken_words(ssml);
    let total_weight: u64 = words.iter().map(|w| w.chars().count() as u64 + 1).sum();
    if total_weight == 0 {
        return Vec::new();
    }

    let mut events = Vec::with_capacity(words.len());
    let mut consumed = 0u64;
    for word in words {
        let offset_ms = consumed * total_duration_ms / total_weight;
        consumed += word.chars().count() as u64 + 1;
        events.push(WordEvent { word, offset_ms });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_first_word_starts_at_zero() {
        let events = estimate_word_events("<p>one two three</p>", 1200);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].offset_ms, 0);
    }

    #[test]
    fn test_estimate_offsets_increase() {
        let events = estimate_word_events("<p>alpha beta gamma delta</p>", 2000);
        for pair in events.windows(2) {
            assert!(pair[0].offset_ms < pair[1].offset_ms);
        }
    }

    #[test]
    fn test_estimate_empty_document() {
        assert!(estimate_word_events("<speak></speak>", 1000).is_empty());
    }

    #[test]
    fn test_estimate_offsets_bounded_by_duration() {
        let events = estimate_word_events("<p>a bb ccc</p>", 900);
        assert!(events.iter().all(|e| e.offset_ms < 900));
    }

    #[test]
    fn test_endpoint_uses_region() {
        let provider = AzureProvider::new("key".into(), "westeurope".into());
        assert_eq!(
            provider.endpoint(),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }

    #[test]
    fn test_is_available_requires_key() {
        let provider = AzureProvider::new(String::new(), "eastus".into());
        assert!(provider.is_available().is_err());
    }
}
