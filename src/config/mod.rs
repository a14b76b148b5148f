/// Configuration management for aguja

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Slave selection policy for read routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectCriteria {
    LeastGlobalConnections,
    LeastRouterConnections,
    LeastBehindMaster,
    LeastCurrentOperations,
    AdaptiveRouting,
}

/// What to do when no usable master exists at session bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterFailureMode {
    /// Refuse the session immediately.
    FailInstantly,
    /// Bring the session up read-only; fail when a write arrives.
    FailOnWrite,
    /// Bring the session up; return an error to writes.
    ErrorOnWrite,
}

/// Main aguja configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Router configuration
    pub router: RouterOptions,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Server pool used by the simulation harness
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Policy used to pick read replicas
    pub slave_selection_criteria: SelectCriteria,
    /// Upper bound on replica connections per session; 0 disables the
    /// bound check
    pub max_slave_connections: usize,
    /// Whether the master is also eligible as a read source
    pub master_accepts_reads: bool,
    /// Behavior when no usable master exists
    pub master_failure_mode: MasterFailureMode,
    /// Number of worker threads
    pub threads: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
    /// Log to stdout
    pub stdout: bool,
    /// Log file path (optional)
    pub file: Option<String>,
}

/// One server in the configured pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub address: String,
    pub port: u16,
    /// Replication role as seen by the monitor
    pub role: ServerRole,
    /// Selection weight; 0.0 excludes the server
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Seed for the replication lag in seconds
    pub rlag: Option<i64>,
    /// Seed for the response-time average in seconds
    pub response_time: Option<f64>,
}

/// Replication role of a configured server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerRole {
    Master,
    Slave,
    Relay,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            router: RouterOptions {
                slave_selection_criteria: SelectCriteria::AdaptiveRouting,
                max_slave_connections: 2,
                master_accepts_reads: false,
                master_failure_mode: MasterFailureMode::FailInstantly,
                threads: 4,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                stdout: true,
                file: None,
            },
            servers: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.threads == 0 {
            return Err(ConfigError::ValidationError(
                "threads must be greater than 0".to_string(),
            ));
        }

        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "server name cannot be empty".to_string(),
                ));
            }

            if server.address.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "server {} has an empty address",
                    server.name
                )));
            }

            if !server.weight.is_finite() || server.weight < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "server {} has an invalid weight: {}",
                    server.name, server.weight
                )));
            }

            if let Some(response_time) = server.response_time {
                if !response_time.is_finite() || response_time < 0.0 {
                    return Err(ConfigError::ValidationError(format!(
                        "server {} has an invalid response_time: {}",
                        server.name, response_time
                    )));
                }
            }
        }

        let masters = self
            .servers
            .iter()
            .filter(|s| s.role == ServerRole::Master)
            .count();
        if !self.servers.is_empty() && masters > 1 {
            return Err(ConfigError::ValidationError(format!(
                "expected at most one master in the pool, found {}",
                masters
            )));
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.as_str() {
            "json" | "text" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }

    /// Create example configuration file with a one-master, three-slave pool
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let config = Config {
            servers: vec![
                ServerEntry {
                    name: "db-master".to_string(),
                    address: "10.0.1.10".to_string(),
                    port: 3306,
                    role: ServerRole::Master,
                    weight: 1.0,
                    rlag: None,
                    response_time: Some(0.002),
                },
                ServerEntry {
                    name: "db-replica-1".to_string(),
                    address: "10.0.1.11".to_string(),
                    port: 3306,
                    role: ServerRole::Slave,
                    weight: 1.0,
                    rlag: Some(0),
                    response_time: Some(0.003),
                },
                ServerEntry {
                    name: "db-replica-2".to_string(),
                    address: "10.0.1.12".to_string(),
                    port: 3306,
                    role: ServerRole::Slave,
                    weight: 2.0,
                    rlag: Some(1),
                    response_time: Some(0.004),
                },
                ServerEntry {
                    name: "db-relay".to_string(),
                    address: "10.0.1.13".to_string(),
                    port: 3306,
                    role: ServerRole::Relay,
                    weight: 1.0,
                    rlag: Some(3),
                    response_time: Some(0.010),
                },
            ],
            ..Default::default()
        };

        config.save_to_file(path)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
