//! Speech provider implementations

mod azure;
pub mod mock;

pub use azure::AzureProvider;
pub use mock::MockSpeech;

use crate::error::{Result, SpeechError};
use crate::provider::SpeechProvider;

/// Create the Azure provider from explicit values or the environment.
///
/// `key`/`region` take precedence over the `SPEECH_KEY`/`SPEECH_REGION`
/// environment variables.
pub fn get_provider(
    key: Option<String>,
    region: Option<String>,
) -> Result<Box<dyn SpeechProvider>> {
    let key = resolve(key, "SPEECH_KEY")?;
    let region = resolve(region, "SPEECH_REGION")?;
    Ok(Box::new(AzureProvider::new(key, region)))
}

/// Get a credential from an explicit value or an environment variable.
fn resolve(value: Option<String>, env_var: &str) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }

    std::env::var(env_var).map_err(|_| SpeechError::MissingCredentials {
        env_var: env_var.to_string(),
    })
}
