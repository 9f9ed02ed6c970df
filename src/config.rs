//! Layered configuration for learnbridge
//!
//! Values are resolved in this order (later wins):
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, or `learnbridge.toml` in the working directory)
//! 3. Environment variables prefixed with `LEARNBRIDGE_`, nested with `__`
//!    (e.g. `LEARNBRIDGE_SERVER__PORT=8051`)
//! 4. Command line overrides

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LEARNBRIDGE";

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "learnbridge.toml";

/// Network settings for the MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind. Has no default and must be configured.
    pub port: Option<u16>,

    /// Seconds an SSE session may stay idle before it is reaped
    pub session_timeout_secs: u64,
}

/// Locations of the external HTTP services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Knowledge base / project API
    pub api_url: String,

    /// Agents service (only probed for health)
    pub agents_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

/// Which optional tool modules get registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    pub rag: bool,
    pub learning: bool,
    pub projects_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving `learning-*.md` session logs
    pub knowledge_dir: PathBuf,
}

/// Complete learnbridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub services: ServicesConfig,
    pub modules: ModulesConfig,
    pub storage: StorageConfig,
}

/// Command line values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub knowledge_dir: Option<PathBuf>,
}

impl BridgeConfig {
    /// Load configuration from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.session_timeout_secs", 3600_i64)?
            .set_default("services.api_url", "http://localhost:8181")?
            .set_default("services.agents_url", "http://localhost:8052")?
            .set_default("services.timeout_secs", 30_i64)?
            .set_default("modules.rag", true)?
            .set_default("modules.learning", true)?
            .set_default("modules.projects_enabled", true)?
            .set_default("storage.knowledge_dir", "knowledge/metacognition")?;

        builder = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder.add_source(config::File::from(path.to_path_buf()).required(true))
            }
            None => builder.add_source(
                config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false),
            ),
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", overrides.host)?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .set_override_option(
                "storage.knowledge_dir",
                overrides
                    .knowledge_dir
                    .map(|p| p.to_string_lossy().to_string()),
            )?
            .build()?;

        let config: BridgeConfig = settings.try_deserialize()?;
        Ok(config)
    }

    /// The configured port, or a configuration error explaining how to set it
    pub fn require_port(&self) -> Result<u16> {
        self.server.port.ok_or_else(|| {
            BridgeError::Config(config::ConfigError::Message(format!(
                "{}_SERVER__PORT environment variable is required. \
                 Set it in your environment, in {} under [server], or pass --port. \
                 Default value: 8051",
                ENV_PREFIX, DEFAULT_CONFIG_FILE
            )))
        })
    }

    /// `host:port` bind address
    pub fn bind_addr(&self) -> Result<String> {
        Ok(format!("{}:{}", self.server.host, self.require_port()?))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: None,
                session_timeout_secs: 3600,
            },
            services: ServicesConfig {
                api_url: "http://localhost:8181".to_string(),
                agents_url: "http://localhost:8052".to_string(),
                timeout_secs: 30,
            },
            modules: ModulesConfig {
                rag: true,
                learning: true,
                projects_enabled: true,
            },
            storage: StorageConfig {
                knowledge_dir: PathBuf::from("knowledge/metacognition"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("LEARNBRIDGE_") {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_port() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::File::create(&path).unwrap();

        let config = BridgeConfig::load(Some(&path), ConfigOverrides::default()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.services.api_url, "http://localhost:8181");
        assert!(config.modules.projects_enabled);
        assert!(config.server.port.is_none());

        let err = config.require_port().unwrap_err();
        assert!(err.to_string().contains("LEARNBRIDGE_SERVER__PORT"));
        assert!(err.to_string().contains("8051"));
    }

    #[test]
    #[serial]
    fn test_file_then_env_then_override() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learnbridge.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\n\n[modules]\nprojects_enabled = false\n\n[services]\napi_url = \"http://kb:9999\""
        )
        .unwrap();

        let config = BridgeConfig::load(Some(&path), ConfigOverrides::default()).unwrap();
        assert_eq!(config.server.port, Some(9000));
        assert!(!config.modules.projects_enabled);
        assert_eq!(config.services.api_url, "http://kb:9999");

        env::set_var("LEARNBRIDGE_SERVER__PORT", "8051");
        let config = BridgeConfig::load(Some(&path), ConfigOverrides::default()).unwrap();
        assert_eq!(config.require_port().unwrap(), 8051);

        let config = BridgeConfig::load(
            Some(&path),
            ConfigOverrides {
                port: Some(7000),
                host: Some("127.0.0.1".to_string()),
                knowledge_dir: None,
            },
        )
        .unwrap();
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:7000");

        clear_env();
    }
}
