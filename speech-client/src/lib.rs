//! Shared speech synthesis client library for the rapid-read workspace
//!
//! Provides a unified interface over speech synthesis backends:
//! - Azure Cognitive Services TTS (REST)
//! - Mock backend for tests

pub mod error;
pub mod provider;
pub mod providers;

pub use error::{Result, SpeechError};
pub use provider::{SpeechProvider, Synthesis, WordEvent};
pub use providers::{AzureProvider, MockSpeech, get_provider};
