//! Connect options.
//!
//! [`ConnectOptions`] is the partial form callers and the config file supply:
//! every field is optional, and a later set is merged over the one retained
//! from the previous `connect`. [`ClientOptions`] is the resolved form with
//! every default filled in.

use serde::Deserialize;

/// Partial connect options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
    /// Verify the server certificate against the platform roots.
    pub tls_verify: Option<bool>,
    pub nick: Option<String>,
    /// Defaults to the nick.
    pub username: Option<String>,
    pub gecos: Option<String>,
    /// Server password, sent as `PASS`.
    pub password: Option<String>,
    /// Character encoding label understood by `encoding_rs`.
    pub encoding: Option<String>,
    /// Answer to CTCP VERSION. An empty string disables the reply.
    pub version: Option<String>,
    pub webirc: Option<WebircOptions>,
    pub auto_reconnect: Option<bool>,
    /// Upper bound for the reconnect backoff, in milliseconds.
    pub auto_reconnect_max_wait: Option<u64>,
    pub auto_reconnect_max_retries: Option<u32>,
    /// Seconds between liveness probes. Zero or negative disables keepalive.
    pub ping_interval: Option<i64>,
    /// Seconds of silence before the connection is dropped. Zero or negative
    /// disables keepalive.
    pub ping_timeout: Option<i64>,
    /// Byte budget for the text of one outbound message.
    pub message_max_length: Option<usize>,
    pub enable_chghost: Option<bool>,
    pub enable_setname: Option<bool>,
    pub enable_echomessage: Option<bool>,
    /// Capabilities requested in addition to the built-in set.
    pub extra_caps: Option<Vec<String>>,
}

/// `WEBIRC` gateway declaration sent ahead of registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebircOptions {
    pub password: String,
    pub username: String,
    pub hostname: String,
    pub address: String,
    /// Extra `key=value` flags (e.g. `secure`), sent space separated.
    #[serde(default)]
    pub options: Vec<String>,
}

macro_rules! merge_fields {
    ($base:expr, $over:expr, { $($field:ident),* $(,)? }) => {
        ConnectOptions {
            $($field: $over.$field.or($base.$field),)*
        }
    };
}

impl ConnectOptions {
    /// Options with just a nick set.
    pub fn with_nick(nick: impl Into<String>) -> Self {
        Self {
            nick: Some(nick.into()),
            ..Self::default()
        }
    }

    /// Merge `over` on top of `self`; fields set in `over` win.
    #[must_use]
    pub fn merge(self, over: ConnectOptions) -> ConnectOptions {
        merge_fields!(self, over, {
            host, port, tls, tls_verify, nick, username, gecos, password,
            encoding, version, webirc, auto_reconnect, auto_reconnect_max_wait,
            auto_reconnect_max_retries, ping_interval, ping_timeout,
            message_max_length, enable_chghost, enable_setname,
            enable_echomessage, extra_caps,
        })
    }

    /// Fill in every default.
    pub fn resolve(&self) -> ClientOptions {
        let nick = self.nick.clone().unwrap_or_else(default_nick);
        ClientOptions {
            host: self.host.clone().unwrap_or_else(default_host),
            port: self.port.unwrap_or(default_port(self.tls.unwrap_or(false))),
            tls: self.tls.unwrap_or(false),
            tls_verify: self.tls_verify.unwrap_or(true),
            username: self.username.clone().unwrap_or_else(|| nick.clone()),
            gecos: self.gecos.clone().unwrap_or_else(default_gecos),
            nick,
            password: self.password.clone().filter(|p| !p.is_empty()),
            encoding: self.encoding.clone().unwrap_or_else(default_encoding),
            version: self
                .version
                .clone()
                .unwrap_or_else(default_version)
                .trim()
                .to_owned(),
            webirc: self.webirc.clone(),
            auto_reconnect: self.auto_reconnect.unwrap_or(true),
            auto_reconnect_max_wait: self
                .auto_reconnect_max_wait
                .unwrap_or(default_auto_reconnect_max_wait()),
            auto_reconnect_max_retries: self
                .auto_reconnect_max_retries
                .unwrap_or(default_auto_reconnect_max_retries()),
            ping_interval: self.ping_interval.unwrap_or(default_ping_interval()),
            ping_timeout: self.ping_timeout.unwrap_or(default_ping_timeout()),
            message_max_length: self
                .message_max_length
                .unwrap_or(default_message_max_length()),
            enable_chghost: self.enable_chghost.unwrap_or(false),
            enable_setname: self.enable_setname.unwrap_or(false),
            enable_echomessage: self.enable_echomessage.unwrap_or(false),
            extra_caps: self.extra_caps.clone().unwrap_or_default(),
        }
    }
}

/// Fully resolved connect options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub tls_verify: bool,
    pub nick: String,
    pub username: String,
    pub gecos: String,
    pub password: Option<String>,
    pub encoding: String,
    pub version: String,
    pub webirc: Option<WebircOptions>,
    pub auto_reconnect: bool,
    pub auto_reconnect_max_wait: u64,
    pub auto_reconnect_max_retries: u32,
    pub ping_interval: i64,
    pub ping_timeout: i64,
    pub message_max_length: usize,
    pub enable_chghost: bool,
    pub enable_setname: bool,
    pub enable_echomessage: bool,
    pub extra_caps: Vec<String>,
}

impl ClientOptions {
    /// Capabilities to request on top of the dispatcher's built-in set.
    pub fn requested_caps(&self) -> Vec<String> {
        let toggles = [
            (self.enable_echomessage, "echo-message"),
            (self.enable_chghost, "chghost"),
            (self.enable_setname, "setname"),
        ];
        let mut caps: Vec<String> = toggles
            .into_iter()
            .filter(|(on, _)| *on)
            .map(|(_, cap)| cap.to_owned())
            .collect();
        for cap in &self.extra_caps {
            if !caps.contains(cap) {
                caps.push(cap.clone());
            }
        }
        caps
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        ConnectOptions::default().resolve()
    }
}

// =============================================================================
// Defaults
// =============================================================================

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port(tls: bool) -> u16 {
    if tls { 6697 } else { 6667 }
}

fn default_nick() -> String {
    "ircbot".to_string()
}

fn default_gecos() -> String {
    "ircbot".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_version() -> String {
    format!("slirc-client {}", env!("CARGO_PKG_VERSION"))
}

fn default_auto_reconnect_max_wait() -> u64 {
    300_000
}

fn default_auto_reconnect_max_retries() -> u32 {
    3
}

fn default_ping_interval() -> i64 {
    30
}

fn default_ping_timeout() -> i64 {
    120
}

fn default_message_max_length() -> usize {
    350
}
