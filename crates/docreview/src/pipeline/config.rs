use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::Config;
use crate::error::ConfigError;

pub struct PipelineConfig {
    pub upload_directory: PathBuf,
    pub extraction_endpoint: String,
    pub extraction_model: String,
    pub api_key: Option<SecretString>,
    pub extraction_timeout: Duration,
    pub max_prompt_chars: usize,
}

impl PipelineConfig {
    /// Resolves the API key as part of building the pipeline settings.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            upload_directory: PathBuf::from(&config.upload_directory),
            extraction_endpoint: config.extraction.endpoint.clone(),
            extraction_model: config.extraction.model.clone(),
            api_key: config.extraction.resolve_api_key()?,
            extraction_timeout: config.extraction.timeout(),
            max_prompt_chars: config.extraction.max_prompt_chars,
        })
    }
}
