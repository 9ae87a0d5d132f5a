use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ShopError};

/// Top-level configuration for the ShopBot server and client.
///
/// Loaded from `~/.shopbot/config.toml` by default. Each section corresponds
/// to one component; every field has a default so partial files are valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub dialog: DialogConfig,
    #[serde(default)]
    pub cart: CartConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl ShopConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShopConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ShopError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Address the HTTP server binds to.
    pub host: String,
    /// HTTP / WebSocket port.
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            log_level: "info".to_string(),
        }
    }
}

/// Language model provider settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`.
    pub api_url: String,
    /// Bearer token. Usually supplied through `SHOPBOT_LLM_API_KEY` instead.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Tool choice strategy: "auto", "required", "none" or a tool name.
    pub tool_choice: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Connect timeout and longest silence between streamed reads, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            tool_choice: "auto".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

/// Turn reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Delay between the agent text event and the shopping data event.
    pub shopping_event_delay_ms: u64,
    /// Maximum accepted user input length in characters.
    pub max_input_chars: usize,
    /// Forward model text deltas as partial TEXT events.
    pub stream_partials: bool,
    /// Text-to-speech model. Speech is disabled when unset.
    pub speech_model: Option<String>,
    /// Voice used for synthesized agent speech.
    pub speech_voice: String,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            shopping_event_delay_ms: 100,
            max_input_chars: 2000,
            stream_partials: true,
            speech_model: None,
            speech_voice: "alloy".to_string(),
        }
    }
}

/// Cart engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Flat tax rate applied to the subtotal.
    pub tax_rate: f64,
    /// Default number of recommendations when the caller passes no limit.
    pub default_recommendation_limit: usize,
    /// Delivery estimate printed on order receipts.
    pub estimated_delivery: String,
    /// Optional path to a JSON catalog replacing the bundled one.
    pub catalog_path: Option<String>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.08,
            default_recommendation_limit: 5,
            estimated_delivery: "3-5 business days".to_string(),
            catalog_path: None,
        }
    }
}

/// Client-side reconciliation timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Cadence of the pending shopping data sweep.
    pub sweep_interval_ms: u64,
    /// Age after which pending shopping data falls back to the latest agent message.
    pub pending_timeout_ms: u64,
    /// Delay before re-attempting attachment after a finalized agent message.
    pub attach_delay_ms: u64,
    /// Maximum number of undrained notifications kept.
    pub max_notifications: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: 1000,
            pending_timeout_ms: 5000,
            attach_delay_ms: 100,
            max_notifications: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShopConfig::default();
        assert_eq!(config.general.port, 4000);
        assert_eq!(config.llm.tool_choice, "auto");
        assert_eq!(config.dialog.shopping_event_delay_ms, 100);
        assert!((config.cart.tax_rate - 0.08).abs() < f64::EPSILON);
        assert_eq!(config.cart.default_recommendation_limit, 5);
        assert_eq!(config.client.sweep_interval_ms, 1000);
        assert_eq!(config.client.pending_timeout_ms, 5000);
        assert!(config.client.pending_timeout_ms > config.client.sweep_interval_ms);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ShopConfig = toml::from_str(
            r#"
            [general]
            port = 8080

            [cart]
            tax_rate = 0.1
            "#,
        )
        .unwrap();
        assert_eq!(config.general.port, 8080);
        assert_eq!(config.general.host, "127.0.0.1");
        assert!((config.cart.tax_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.cart.estimated_delivery, "3-5 business days");
        assert_eq!(config.client.attach_delay_ms, 100);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ShopConfig::default();
        config.llm.model = "gpt-4o-mini".to_string();
        config.dialog.stream_partials = false;
        config.save(&path).unwrap();

        let loaded = ShopConfig::load(&path).unwrap();
        assert_eq!(loaded.llm.model, "gpt-4o-mini");
        assert!(!loaded.dialog.stream_partials);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = ShopConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ShopError::Io(_))));
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "general = [[[").unwrap();
        let config = ShopConfig::load_or_default(&path);
        assert_eq!(config.general.port, 4000);
    }
}
