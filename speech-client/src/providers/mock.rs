//! Mock speech provider for testing
//!
//! Provides a configurable mock provider that can simulate failures and
//! deterministic word timings without touching the network or a speaker.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, SpeechError};
use crate::provider::{SpeechProvider, Synthesis, WordEvent, spoken_words};

/// Default synthetic duration assigned to every word.
const DEFAULT_MS_PER_WORD: u64 = 300;

/// A mock provider for testing playback control and scheduling behavior
pub struct MockSpeech {
    /// Number of times to fail before succeeding (0 = always succeed)
    fail_count: AtomicUsize,
    /// Current call count
    call_count: AtomicUsize,
    /// Error to return on failure (None = always succeed)
    fail_with: Mutex<Option<SpeechError>>,
    /// Fixed duration assigned to each spoken word
    ms_per_word: u64,
}

impl MockSpeech {
    /// Create a provider that always succeeds with fixed word timings
    pub fn always_succeeds() -> Self {
        Self {
            fail_count: AtomicUsize::new(0),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
            ms_per_word: DEFAULT_MS_PER_WORD,
        }
    }

    /// Create a provider that fails `n` times with the given error, then succeeds
    pub fn fails_then_succeeds(n: usize, error: SpeechError) -> Self {
        Self {
            fail_count: AtomicUsize::new(n),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(Some(error)),
            ms_per_word: DEFAULT_MS_PER_WORD,
        }
    }

    /// Create a provider that always fails with the given error
    pub fn always_fails(error: SpeechError) -> Self {
        Self {
            fail_count: AtomicUsize::new(usize::MAX),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(Some(error)),
            ms_per_word: DEFAULT_MS_PER_WORD,
        }
    }

    /// Set the synthetic per-word duration
    pub fn with_ms_per_word(mut self, ms_per_word: u64) -> Self {
        self.ms_per_word = ms_per_word;
        self
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for MockSpeech {
    async fn synthesize(&self, ssml: &str, output_path: &Path) -> Result<Synthesis> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        let fail_count = self.fail_count.load(Ordering::SeqCst);

        if call_num < fail_count {
            let error = self.fail_with.lock().unwrap();
            if let Some(err) = error.as_ref() {
                return Err(clone_error(err));
            }
        }

        let words = spoken_words(ssml);
        let word_events: Vec<WordEvent> = words
            .into_iter()
            .enumerate()
            .map(|(i, word)| WordEvent {
                word,
                offset_ms: i as u64 * self.ms_per_word,
            })
            .collect();
        let total_duration_ms = word_events.len() as u64 * self.ms_per_word;

        std::fs::write(output_path, b"")?;

        Ok(Synthesis {
            audio_path: output_path.to_path_buf(),
            word_events,
            total_duration_ms,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}

/// Clone a SpeechError (needed because SpeechError doesn't implement Clone)
fn clone_error(err: &SpeechError) -> SpeechError {
    match err {
        SpeechError::MissingCredentials { env_var } => SpeechError::MissingCredentials {
            env_var: env_var.clone(),
        },
        SpeechError::Auth(s) => SpeechError::Auth(s.clone()),
        SpeechError::QuotaExceeded { retry_after } => SpeechError::QuotaExceeded {
            retry_after: *retry_after,
        },
        SpeechError::InvalidMarkup(s) => SpeechError::InvalidMarkup(s.clone()),
        SpeechError::ApiError {
            message,
            status_code,
        } => SpeechError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        SpeechError::Network(s) => SpeechError::Network(s.clone()),
        SpeechError::Io(_) => SpeechError::Network("IO error (mock)".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_word_timings() {
        let provider = MockSpeech::always_succeeds().with_ms_per_word(250);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio.mp3");

        let synth = provider
            .synthesize("<p>one two three</p>", &out)
            .await
            .unwrap();

        assert_eq!(synth.total_duration_ms, 750);
        assert_eq!(synth.word_events.len(), 3);
        assert_eq!(synth.word_events[1].offset_ms, 250);
        assert!(out.exists());
    }

    #[tokio::test]
    async fn test_fails_then_succeeds() {
        let provider = MockSpeech::fails_then_succeeds(
            1,
            SpeechError::Network("connection reset".to_string()),
        );
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio.mp3");

        assert!(provider.synthesize("<p>hi</p>", &out).await.is_err());
        assert!(provider.synthesize("<p>hi</p>", &out).await.is_ok());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_always_fails() {
        let provider = MockSpeech::always_fails(SpeechError::Auth("bad key".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio.mp3");

        for _ in 0..3 {
            assert!(provider.synthesize("<p>hi</p>", &out).await.is_err());
        }
    }
}
