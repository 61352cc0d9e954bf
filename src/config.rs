use serde::Deserialize;
use std::path::PathBuf;

/// Client configuration loaded from environment variables
///
/// Resolved once at startup and passed by value; nothing re-reads the
/// environment afterwards.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Origin of the movie catalog API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Display name shown by the client
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// File backing the persisted bearer token
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_app_name() -> String {
    "MovieRecs".to_string()
}

fn default_token_path() -> PathBuf {
    PathBuf::from(".movierecs/auth_token")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            app_name: default_app_name(),
            token_path: default_token_path(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }
}
