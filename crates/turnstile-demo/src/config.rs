//! Configuration management for the demo server.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use turnstile::constants::{DEFAULT_VERIFY_URL, headers};

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5432";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Turnstile secret key (required)
    #[serde(default)]
    pub secret: String,

    /// Siteverify endpoint
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Whole-request deadline in seconds, verification included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Header carrying the widget token
    #[serde(default = "default_token_header")]
    pub token_header: String,

    /// Read the client IP from this proxy header instead of guessing
    #[serde(default)]
    pub trusted_ip_header: Option<String>,

    /// Paths served without verification
    #[serde(default = "default_skip_paths")]
    pub skip_paths: Vec<String>,
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_verify_url() -> String { DEFAULT_VERIFY_URL.to_string() }
fn default_request_timeout() -> u64 { 10 }
fn default_token_header() -> String { headers::TURNSTILE_RESPONSE.to_string() }
fn default_skip_paths() -> Vec<String> { vec!["/health".to_string()] }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.secret {
            config.secret = secret.clone();
        }
        if let Some(ref verify_url) = args.verify_url {
            config.verify_url = verify_url.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.secret.trim().is_empty() {
            bail!("Turnstile secret is not set (config `secret`, --secret or TURNSTILE_SECRET)");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            secret: String::new(),
            verify_url: default_verify_url(),
            request_timeout_secs: default_request_timeout(),
            token_header: default_token_header(),
            trusted_ip_header: None,
            skip_paths: default_skip_paths(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Args;

    fn args() -> Args {
        Args {
            config: "does/not/exist.toml".to_string(),
            listen: None,
            secret: None,
            verify_url: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = AppConfig::load("does/not/exist.toml", &args()).unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_defaults_with_cli_secret() {
        let args = Args {
            secret: Some("1x0000000000000000000000000000000AA".to_string()),
            ..args()
        };
        let config = AppConfig::load("does/not/exist.toml", &args).unwrap();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.verify_url, DEFAULT_VERIFY_URL);
        assert_eq!(config.token_header, "cf-turnstile-response");
        assert_eq!(config.skip_paths, vec!["/health".to_string()]);
        assert!(config.trusted_ip_header.is_none());
    }

    #[test]
    fn test_file_then_cli_overrides() {
        let path = std::env::temp_dir().join(format!(
            "turnstile-demo-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
listen_addr = "0.0.0.0:9000"
secret = "from-file"
trusted_ip_header = "CF-Connecting-IP"
skip_paths = ["/health", "/public"]
"#,
        )
        .unwrap();

        let path_str = path.to_str().unwrap().to_string();
        let args = Args {
            listen: Some("127.0.0.1:7000".to_string()),
            ..args()
        };
        let config = AppConfig::load(&path_str, &args).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.listen_addr, "127.0.0.1:7000");
        assert_eq!(config.secret, "from-file");
        assert_eq!(config.trusted_ip_header.as_deref(), Some("CF-Connecting-IP"));
        assert_eq!(config.skip_paths.len(), 2);
        assert_eq!(config.request_timeout_secs, 10);
    }
}
