use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Ceiling on simultaneously served connections when nothing else is configured.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no file root configured")]
    NoRoot,

    #[error("file root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("file root must be a directory: {0}")]
    RootNotDirectory(PathBuf),

    #[error("failed to canonicalize file root {path}: {source}")]
    RootUnresolvable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("must allow at least one concurrent connection")]
    ZeroConcurrency,

    #[error("unable to resolve bind address {0}")]
    BindAddress(String),
}

/// Raw configuration as read from YAML and/or the command line.
///
/// ```yaml
/// server:
///   host: 0.0.0.0
///   port: 8080
///   max_connections: 1024
/// files:
///   root: /srv/www
/// timeouts:
///   header_read_secs: 30
///   idle_secs: 60
///   max_duration_secs: 0
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub files: FilesSection,
    pub timeouts: TimeoutSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    pub root: Option<PathBuf>,
}

/// Timeouts in seconds; `0` disables the corresponding deadline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    pub header_read_secs: u64,
    pub idle_secs: u64,
    pub max_duration_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            header_read_secs: 30,
            idle_secs: 60,
            max_duration_secs: 0,
        }
    }
}

/// Per-connection deadlines. `None` means wait indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub header_read: Option<Duration>,
    pub idle: Option<Duration>,
    pub max_duration: Option<Duration>,
}

impl From<&TimeoutSection> for Timeouts {
    fn from(section: &TimeoutSection) -> Self {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        Self {
            header_read: secs(section.header_read_secs),
            idle: secs(section.idle_secs),
            max_duration: secs(section.max_duration_secs),
        }
    }
}

/// Validated, immutable server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Canonical file root.
    pub root: PathBuf,
    pub max_connections: usize,
    pub timeouts: Timeouts,
}

impl Config {
    /// Configuration serving `root` on `port` with every other value defaulted.
    pub fn new(root: impl Into<PathBuf>, port: u16) -> Self {
        let mut cfg = Self::default();
        cfg.files.root = Some(root.into());
        cfg.server.port = port;
        cfg
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Checks every startup invariant and freezes the result.
    pub fn validate(&self) -> Result<ServerConfig, ConfigError> {
        if self.server.max_connections == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let root = self.files.root.as_ref().ok_or(ConfigError::NoRoot)?;
        if !root.exists() {
            return Err(ConfigError::RootMissing(root.clone()));
        }
        if !root.is_dir() {
            return Err(ConfigError::RootNotDirectory(root.clone()));
        }
        let root = root
            .canonicalize()
            .map_err(|source| ConfigError::RootUnresolvable {
                path: root.clone(),
                source,
            })?;

        let host = self.server.host.as_str();
        let bind_addr = (host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::BindAddress(format!("{}:{}", host, self.server.port)))?;

        Ok(ServerConfig {
            bind_addr,
            root,
            max_connections: self.server.max_connections,
            timeouts: Timeouts::from(&self.timeouts),
        })
    }
}
