//! Transport contract.
//!
//! The session never touches a socket or a clock. It asks a [`Transport`] to
//! connect, write and close, asks its [`Scheduler`] for timers, and is fed
//! [`TransportEvent`]s by whoever owns it. [`TcpTransport`] is the tokio
//! implementation; tests drive the session with a scripted one.

mod tcp;
mod tls;

pub use tcp::TcpTransport;

use std::time::Duration;

use slirc_wire::Message;

use crate::config::ClientOptions;

/// Opaque timer identity issued by a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Timer primitives.
pub trait Scheduler {
    /// Arrange for `TransportEvent::TimerFired(handle)` after `delay`.
    fn schedule_after(&mut self, delay: Duration) -> TimerHandle;

    /// Cancel a timer. Cancelling one that already fired is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// A line-oriented connection with reconnect policy and timers.
pub trait Transport: Scheduler {
    /// Open a connection, closing any existing one.
    fn connect(&mut self, config: &TransportConfig);

    /// Queue one line, without CRLF.
    fn write(&mut self, line: &str);

    /// Close the connection, optionally writing a final line first.
    ///
    /// `immediate` skips any pending outbound lines. A requested end never
    /// triggers a reconnect.
    fn end(&mut self, final_line: Option<&str>, immediate: bool);

    fn is_connected(&self) -> bool;

    /// Registration finished; resets the reconnect attempt counter.
    fn registered_successfully(&mut self);
}

/// Everything a transport reports to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connecting,
    SocketConnected,
    Message { message: Message, raw: String },
    Close { had_error: bool },
    Reconnecting {
        attempt: u32,
        max_retries: u32,
        wait: Duration,
    },
    TimerFired(TimerHandle),
    Error(String),
}

/// Connection parameters handed to [`Transport::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub tls_verify: bool,
    pub encoding: String,
    pub auto_reconnect: bool,
    /// Backoff ceiling.
    pub auto_reconnect_max_wait: Duration,
    pub auto_reconnect_max_retries: u32,
}

impl From<&ClientOptions> for TransportConfig {
    fn from(options: &ClientOptions) -> Self {
        Self {
            host: options.host.clone(),
            port: options.port,
            tls: options.tls,
            tls_verify: options.tls_verify,
            encoding: options.encoding.clone(),
            auto_reconnect: options.auto_reconnect,
            auto_reconnect_max_wait: Duration::from_millis(options.auto_reconnect_max_wait),
            auto_reconnect_max_retries: options.auto_reconnect_max_retries,
        }
    }
}

impl TransportConfig {
    /// Delay before reconnect attempt `attempt` (1-based): one second,
    /// doubling, capped at the configured ceiling.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        Duration::from_secs(1u64 << exp).min(self.auto_reconnect_max_wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_options() {
        let options = ClientOptions::default();
        let config = TransportConfig::from(&options);
        assert_eq!(config.port, 6667);
        assert_eq!(config.auto_reconnect_max_wait, Duration::from_secs(300));
        assert_eq!(config.auto_reconnect_max_retries, 3);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut config = TransportConfig::from(&ClientOptions::default());
        config.auto_reconnect_max_wait = Duration::from_secs(5);
        assert_eq!(config.backoff(1), Duration::from_secs(1));
        assert_eq!(config.backoff(2), Duration::from_secs(2));
        assert_eq!(config.backoff(3), Duration::from_secs(4));
        assert_eq!(config.backoff(4), Duration::from_secs(5));
        assert_eq!(config.backoff(40), Duration::from_secs(5));
    }
}
