//! Configuration for MCP servers, logging and telemetry
//!
//! Files are JSON. Telemetry and logging settings also honour the standard
//! OTEL environment variables, which take precedence over file values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{McpOtelError, Result};

/// Default per-call session timeout, in seconds
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30;

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_SESSION_TIMEOUT_SECS
}

/// How to reach an MCP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Streamable HTTP endpoint
    Http {
        uri: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Child process speaking MCP over stdio
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

/// Configuration for a single MCP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MCPServerConfig {
    /// Unique server ID, also used as display name
    pub id: String,

    /// Transport settings
    pub transport: TransportConfig,

    /// Whether this server should be connected at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Inject the current trace context into every tool call
    #[serde(default = "default_true")]
    pub propagate_context: bool,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub session_timeout_secs: u64,
}

impl MCPServerConfig {
    /// Server reached over streamable HTTP
    pub fn http(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::with_transport(
            id,
            TransportConfig::Http {
                uri: uri.into(),
                headers: HashMap::new(),
            },
        )
    }

    /// Server spawned as a child process
    pub fn stdio<I, S>(id: impl Into<String>, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_transport(
            id,
            TransportConfig::Stdio {
                command: command.into(),
                args: args.into_iter().map(Into::into).collect(),
                env: HashMap::new(),
            },
        )
    }

    fn with_transport(id: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            id: id.into(),
            transport,
            enabled: true,
            propagate_context: true,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        }
    }

    /// Disable trace context injection for this server
    pub fn without_propagation(mut self) -> Self {
        self.propagate_context = false;
        self
    }

    /// Override the per-call timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.session_timeout_secs = secs;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(McpOtelError::InvalidConfig("server id must not be empty".into()));
        }
        if self.session_timeout_secs == 0 {
            return Err(McpOtelError::InvalidConfig(format!(
                "server '{}': session_timeout_secs must be positive",
                self.id
            )));
        }
        match &self.transport {
            TransportConfig::Http { uri, .. } if uri.trim().is_empty() => Err(
                McpOtelError::InvalidConfig(format!("server '{}': uri must not be empty", self.id)),
            ),
            TransportConfig::Stdio { command, .. } if command.trim().is_empty() => {
                Err(McpOtelError::InvalidConfig(format!(
                    "server '{}': command must not be empty",
                    self.id
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Telemetry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Disable span export entirely (`OTEL_SDK_DISABLED`)
    pub sdk_disabled: bool,

    /// `service.name` resource attribute (`OTEL_SERVICE_NAME`)
    pub service_name: String,

    /// OTLP gRPC endpoint (`OTEL_EXPORTER_OTLP_ENDPOINT`); no export when unset
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sdk_disabled: false,
            service_name: env!("CARGO_PKG_NAME").to_string(),
            otlp_endpoint: None,
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by OTEL environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply OTEL environment variables on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("OTEL_SDK_DISABLED") {
            self.sdk_disabled = v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = env::var("OTEL_SERVICE_NAME") {
            if !v.is_empty() {
                self.service_name = v;
            }
        }
        if let Ok(v) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.otlp_endpoint = Some(v).filter(|v| !v.is_empty());
        }
        self
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rolling log files (`MCP_LOG_DIR`)
    pub directory: PathBuf,

    /// Log file name prefix
    pub file_name: String,

    /// Filter directive used when `RUST_LOG` is unset
    pub default_filter: String,

    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "mcp-otel.log".to_string(),
            default_filter: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Apply `MCP_LOG_DIR` on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = env::var("MCP_LOG_DIR") {
            if !dir.is_empty() {
                self.directory = PathBuf::from(dir);
            }
        }
        self
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MCPConfig {
    /// MCP servers to connect
    #[serde(default)]
    pub servers: Vec<MCPServerConfig>,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MCPConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| McpOtelError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_json_str(&contents)?;
        config.telemetry = config.telemetry.with_env_overrides();
        config.logging = config.logging.with_env_overrides();

        tracing::debug!(
            "[MCPConfig] Loaded {} server(s) from {}",
            config.servers.len(),
            path.display()
        );

        Ok(config)
    }

    /// Check server IDs are unique and each server entry is usable
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !seen.insert(server.id.as_str()) {
                return Err(McpOtelError::DuplicateServer(server.id.clone()));
            }
        }
        Ok(())
    }

    /// Enabled servers only
    pub fn enabled_servers(&self) -> impl Iterator<Item = &MCPServerConfig> {
        self.servers.iter().filter(|s| s.enabled)
    }
}
