//! Core configuration types and loading.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use denoise_proto::Timeouts;
use serde::Deserialize;
use thiserror::Error;

use super::cli::Cli;
use super::defaults;
use crate::denoise::{Announcer, DenoiseSettings};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid server {0:?}: expected host[:port]")]
    InvalidServer(String),
    #[error("no server given")]
    MissingServer,
    #[error("{0}")]
    Invalid(String),
}

/// Upstream server hostspec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl FromStr for ServerAddr {
    type Err = ConfigError;

    /// Accepts `host`, `host:port`, `[v6]`, `[v6]:port` and bare IPv6.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidServer(s.to_owned());
        let s = s.trim();

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
            match after {
                "" => (host, None),
                _ => (host, Some(after.strip_prefix(':').ok_or_else(invalid)?)),
            }
        } else if s.matches(':').count() > 1 {
            (s, None)
        } else {
            match s.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(invalid());
        }
        let port = match port {
            Some(p) => p.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(invalid)?,
            None => defaults::SERVER_PORT,
        };
        Ok(ServerAddr {
            host: host.to_owned(),
            port,
        })
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Settings as written in the optional TOML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<String>,
    pub listen: Option<IpAddr>,
    pub port: Option<u16>,
    pub respawn: Option<bool>,
    /// Hard connect timeout, seconds.
    pub timeout: Option<u64>,
    /// Per-address connect timeout, seconds.
    pub soft_timeout: Option<u64>,
    /// Arm window, seconds.
    pub arm_window: Option<u64>,
    pub announce_as: Option<String>,
}

impl FileConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerAddr,
    pub listen: SocketAddr,
    pub respawn: bool,
    pub timeouts: Timeouts,
    pub denoise: DenoiseSettings,
}

impl Config {
    /// Merge the CLI over the optional config file it names.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    fn merge(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let server = cli
            .server
            .clone()
            .or(file.server)
            .ok_or(ConfigError::MissingServer)?
            .parse::<ServerAddr>()?;

        let ip = cli
            .listen
            .or(file.listen)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = cli.port.or(file.port).unwrap_or(defaults::LISTEN_PORT);

        let hard = cli.timeout.or(file.timeout).unwrap_or(defaults::HARD_TIMEOUT_SECS);
        if hard == 0 {
            return Err(ConfigError::Invalid("timeout must be at least 1 second".into()));
        }
        let soft = cli.soft_timeout.or(file.soft_timeout);
        if soft.is_some_and(|s| s == 0 || s > hard) {
            return Err(ConfigError::Invalid(
                "soft timeout must be between 1 second and the hard timeout".into(),
            ));
        }

        let arm_window = cli
            .arm_window
            .or(file.arm_window)
            .unwrap_or(defaults::ARM_WINDOW_SECS);

        let announce_as = cli
            .announce_as
            .clone()
            .or(file.announce_as)
            .unwrap_or_else(|| defaults::ANNOUNCE_AS.to_owned());
        if !is_valid_nick(&announce_as) {
            return Err(ConfigError::Invalid(format!(
                "announce name {announce_as:?} is not a usable nickname"
            )));
        }

        Ok(Config {
            server,
            listen: SocketAddr::new(ip, port),
            respawn: cli.respawn || file.respawn.unwrap_or(false),
            timeouts: Timeouts {
                soft: soft.map(Duration::from_secs),
                hard: Duration::from_secs(hard),
            },
            denoise: DenoiseSettings {
                arm_window: Duration::from_secs(arm_window),
                announcer: Announcer::new(&announce_as),
            },
        })
    }
}

fn is_valid_nick(nick: &str) -> bool {
    !nick.is_empty()
        && !nick.starts_with(['#', '&', ':'])
        && !nick.contains(|c: char| c.is_whitespace() || matches!(c, '!' | '@' | ',' | '*' | '?'))
}
