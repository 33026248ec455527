//! rapid-read configuration management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::ssml::SpeechStyle;
use crate::text::chunker::DEFAULT_MAX_TOKENS;

// Default display palette
const DEFAULT_BACKGROUND: &str = "#F7ECCF";
const DEFAULT_TEXT: &str = "#77614F";
const DEFAULT_HIGHLIGHT: &str = "#F57A10";

const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Synthesis voice name
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speaking style; "default" disables style markup entirely
    #[serde(default = "default_style")]
    pub style: String,

    /// Prosody rate, e.g. "+20.00%"
    #[serde(default = "default_rate")]
    pub rate: String,

    /// Maximum tagged items per synthesized chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Neighbor-window width for the word display
    #[serde(default = "default_window")]
    pub window: usize,

    /// Speech service subscription key; the SPEECH_KEY environment
    /// variable takes precedence
    #[serde(default)]
    pub speech_key: Option<String>,

    /// Speech service region; the SPEECH_REGION environment variable
    /// takes precedence
    #[serde(default)]
    pub speech_region: Option<String>,

    #[serde(default)]
    pub colors: ColorScheme,
}

/// Display colors, as hex strings a renderer can parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    #[serde(default = "default_background")]
    pub background: String,

    #[serde(default = "default_text")]
    pub text: String,

    #[serde(default = "default_highlight")]
    pub highlight: String,
}

fn default_voice() -> String {
    "en-US-AriaNeural".to_string()
}

fn default_style() -> String {
    "narration-professional".to_string()
}

fn default_rate() -> String {
    "+20.00%".to_string()
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

fn default_text() -> String {
    DEFAULT_TEXT.to_string()
}

fn default_highlight() -> String {
    DEFAULT_HIGHLIGHT.to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            style: default_style(),
            rate: default_rate(),
            max_tokens: default_max_tokens(),
            window: default_window(),
            speech_key: None,
            speech_region: None,
            colors: ColorScheme::default(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            background: default_background(),
            text: default_text(),
            highlight: default_highlight(),
        }
    }
}

impl ReaderConfig {
    /// Get the config file path: ~/.config/rapid-read/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("rapid-read")
            .join("config.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: ReaderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// The synthesis markup parameters this config describes.
    pub fn speech_style(&self) -> SpeechStyle {
        SpeechStyle {
            voice: self.voice.clone(),
            style: self.style.clone(),
            rate: self.rate.clone(),
        }
    }
}
