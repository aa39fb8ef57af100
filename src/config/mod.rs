//! Configuration loading and option resolution.
//!
//! - [`options`]: the connect options a [`Session`](crate::Session) accepts,
//!   their defaults, and how a partial set is merged over a retained one.
//! - [`ClientConfig`]: the TOML file read by the `slirc-client` binary.

mod options;

pub use options::{ClientOptions, ConnectOptions, WebircOptions};

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Binary configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Options handed to `Session::connect`.
    #[serde(default)]
    pub connection: ConnectOptions,
    /// What the bundled client does once registered.
    #[serde(default)]
    pub bot: BotConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Post-registration behaviour of the bundled client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfig {
    /// Channels joined after registration.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Answer `!ping` in channels with `pong`.
    #[serde(default)]
    pub answer_ping: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_connection_and_bot_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
[connection]
host = "irc.example.net"
port = 6697
tls = true
nick = "straylight"
ping_interval = 0

[bot]
channels = ["#slirc", "#rust"]
answer_ping = true
"##
        )
        .unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.connection.host.as_deref(), Some("irc.example.net"));
        assert_eq!(config.connection.port, Some(6697));
        assert_eq!(config.connection.tls, Some(true));
        assert_eq!(config.connection.ping_interval, Some(0));
        assert_eq!(config.bot.channels, vec!["#slirc", "#rust"]);
        assert!(config.bot.answer_ping);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = ClientConfig::load(file.path()).unwrap();
        assert!(config.connection.nick.is_none());
        assert!(config.bot.channels.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ClientConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[connection\nnick = 1").unwrap();
        let err = ClientConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
