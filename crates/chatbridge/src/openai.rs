use std::fmt::{self, Debug};

use chatbridge_core::{Error, ModelClient, UsageError};
use chatbridge_openai_model::{ConfigError, OpenAIConfigBuilder, OpenAIProvider};
use serde::Deserialize;

/// Parameters of [`new_openai`].
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OpenAIParams {
    /// The API key, required.
    pub api_key: Option<String>,
    /// Overrides the API endpoint, e.g. `http://localhost:8080/v1`.
    pub base_url: Option<String>,
    /// Overrides the default model.
    pub model: Option<String>,
}

impl Debug for OpenAIParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIParams")
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Creates a backend handle for an OpenAI-compatible chat completion API.
///
/// Fails with [`UsageError::MissingApiKey`] when no key is given, and with
/// [`UsageError::InvalidConfig`] when the key or the base URL is malformed.
pub fn new_openai(params: OpenAIParams) -> Result<ModelClient, Error> {
    let Some(api_key) = params.api_key else {
        return Err(UsageError::MissingApiKey.into());
    };

    let mut builder = OpenAIConfigBuilder::with_api_key(api_key);
    if let Some(base_url) = params.base_url {
        builder = builder.with_base_url(base_url);
    }
    if let Some(model) = params.model {
        builder = builder.with_model(model);
    }

    let config = builder.build().map_err(|err| match err {
        ConfigError::MissingApiKey => UsageError::MissingApiKey,
        err => UsageError::InvalidConfig(err.to_string()),
    })?;
    debug!("created openai backend: {config:?}");

    Ok(ModelClient::new(OpenAIProvider::new(config)))
}
