//! Runtime configuration.
//!
//! Loaded from a TOML file with full defaults when the file is absent; every
//! section is optional. Provider API keys never live here - they arrive per
//! call or through the environment.

use serde::Deserialize;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, net};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/toolbridge.toml";
const DEFAULT_LISTEN_PORT: u16 = 8080;

const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_MAX_ROUNDS: usize = 8;
const DEFAULT_TURN_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid listen address '{addr}': {source}")]
    ListenAddr {
        addr: String,
        #[source]
        source: net::AddrParseError,
    },
}

/// Endpoint and default model for one provider protocol.
#[derive(Debug, Clone)]
pub struct ProviderEndpointConfig {
    pub endpoint: String,
    pub default_model: String,
}

#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub anthropic: ProviderEndpointConfig,
    pub openai: ProviderEndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderEndpointConfig {
                endpoint: DEFAULT_ANTHROPIC_ENDPOINT.to_string(),
                default_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            },
            openai: ProviderEndpointConfig {
                endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
                default_model: DEFAULT_OPENAI_MODEL.to_string(),
            },
        }
    }
}

/// Agent-loop bounds.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_rounds: usize,
    pub max_tokens: u32,
    pub turn_timeout: Duration,
    pub call_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_tokens: DEFAULT_MAX_TOKENS,
            turn_timeout: Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub providers: ProvidersConfig,
    pub agent: AgentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_LISTEN_PORT),
            providers: ProvidersConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    listen_addr: Option<String>,
    #[serde(default)]
    providers: RawProviders,
    #[serde(default)]
    agent: RawAgent,
}

#[derive(Debug, Deserialize, Default)]
struct RawProviders {
    #[serde(default)]
    anthropic: RawProviderEndpoint,
    #[serde(default)]
    openai: RawProviderEndpoint,
}

#[derive(Debug, Deserialize, Default)]
struct RawProviderEndpoint {
    endpoint: Option<String>,
    default_model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAgent {
    max_rounds: Option<usize>,
    max_tokens: Option<u32>,
    turn_timeout_secs: Option<u64>,
    call_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Load from the given path, or from the default path when `None`; a
    /// missing default file yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let defaults = AppConfig::default();
    let listen_addr = match parsed.listen_addr {
        Some(addr) => addr
            .parse()
            .map_err(|source| ConfigError::ListenAddr { addr, source })?,
        None => defaults.listen_addr,
    };

    Ok(AppConfig {
        listen_addr,
        providers: ProvidersConfig {
            anthropic: ProviderEndpointConfig {
                endpoint: parsed
                    .providers
                    .anthropic
                    .endpoint
                    .unwrap_or(defaults.providers.anthropic.endpoint),
                default_model: parsed
                    .providers
                    .anthropic
                    .default_model
                    .unwrap_or(defaults.providers.anthropic.default_model),
            },
            openai: ProviderEndpointConfig {
                endpoint: parsed
                    .providers
                    .openai
                    .endpoint
                    .unwrap_or(defaults.providers.openai.endpoint),
                default_model: parsed
                    .providers
                    .openai
                    .default_model
                    .unwrap_or(defaults.providers.openai.default_model),
            },
        },
        agent: AgentConfig {
            max_rounds: parsed.agent.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS),
            max_tokens: parsed.agent.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            turn_timeout: Duration::from_secs(
                parsed
                    .agent
                    .turn_timeout_secs
                    .unwrap_or(DEFAULT_TURN_TIMEOUT_SECS),
            ),
            call_timeout: Duration::from_secs(
                parsed
                    .agent
                    .call_timeout_secs
                    .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
            ),
        },
    })
}
