//! Configuration schema for copyforge.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so that the JSON
//! config file can use camelCase keys while Rust code uses snake_case fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::tools::Language;

/// Top-level configuration (`~/.copyforge/config.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Gemini provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_video_model() -> String {
    "veo-2.0-generate-001".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            text_model: default_text_model(),
            video_model: default_video_model(),
        }
    }
}

/// Defaults applied when the CLI flags are absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsConfig {
    #[serde(default)]
    pub language: Language,
}

/// Signed-in identity, when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// History store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Override for the database path; defaults to `<data dir>/history.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.provider.api_base,
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(config.provider.text_model, "gemini-2.5-flash");
        assert_eq!(config.defaults.language, Language::En);
        assert!(config.identity.user_id.is_none());
    }

    #[test]
    fn test_camel_case_keys_and_partial_files() {
        let json = r#"{
            "provider": { "apiKey": "k", "textModel": "gemini-2.5-pro" },
            "defaults": { "language": "ar" },
            "identity": { "userId": "u-1" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider.api_key, "k");
        assert_eq!(config.provider.text_model, "gemini-2.5-pro");
        // Unspecified fields fall back to defaults.
        assert_eq!(config.provider.video_model, "veo-2.0-generate-001");
        assert_eq!(config.defaults.language, Language::Ar);
        assert_eq!(config.identity.user_id.as_deref(), Some("u-1"));
        assert!(config.history.db_path.is_none());
    }
}
