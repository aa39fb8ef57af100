//! Connect, register, keep alive, tear down.

use tracing::{debug, info};

use super::Session;
use crate::config::ConnectOptions;
use crate::dispatch::Dispatcher;
use crate::error::ClientError;
use crate::event::Event;
use crate::keepalive::{Keepalive, KeepaliveAction};
use crate::outbound::raw_line;
use crate::params;
use crate::transport::{Transport, TransportConfig};

impl<T: Transport, D: Dispatcher> Session<T, D> {
    /// Connect, or reconnect with the options kept from the last call.
    ///
    /// `Some(options)` is merged over whatever was retained and kept for
    /// next time. An existing connection is closed first.
    pub fn connect(&mut self, options: Option<ConnectOptions>) -> Result<(), ClientError> {
        let merged = match (self.retained.take(), options) {
            (Some(retained), Some(over)) => retained.merge(over),
            (None, Some(over)) => over,
            (Some(retained), None) => retained,
            (None, None) => {
                return Err(ClientError::InvalidArgument(
                    "connect requires options on the first call",
                ));
            }
        };
        let resolved = merged.resolve();
        self.retained = Some(merged);

        let user = &mut self.state.user;
        user.nick = resolved.nick.clone();
        user.username = resolved.username.clone();
        user.gecos = resolved.gecos.clone();
        user.host.clear();
        user.modes.clear();
        user.away = false;

        self.dispatcher
            .request_extra_capabilities(&resolved.requested_caps());

        self.keepalive.disarm(&mut self.transport);
        self.keepalive = Keepalive::new(resolved.ping_interval, resolved.ping_timeout);

        // The transport reports nothing more for a connection it replaces.
        let replacing = self.transport.is_connected();
        if replacing {
            info!(nick = %resolved.nick, "closing existing connection before reconnect");
            self.transport.end(None, true);
        }
        self.drop_connection_queries();
        if replacing {
            self.publish(Event::Close { had_error: false });
        }

        self.state.network = Default::default();
        self.state.registered = false;
        self.dispatcher.reset_cache();

        info!(
            host = %resolved.host,
            port = resolved.port,
            tls = resolved.tls,
            nick = %resolved.nick,
            "connecting"
        );
        let config = TransportConfig::from(&resolved);
        self.options = resolved;
        self.transport.connect(&config);
        Ok(())
    }

    /// Send `QUIT` and close once pending lines are flushed.
    pub fn quit(&mut self, message: Option<&str>) {
        let line = raw_line(params!["QUIT", message]);
        info!(line = %line, "quitting");
        self.keepalive.disarm(&mut self.transport);
        self.transport.end(Some(&line), false);
    }

    /// Socket is up: identify ourselves and start the keepalive.
    pub(super) fn on_socket_connected(&mut self) {
        self.publish(Event::SocketConnected);
        self.drop_connection_queries();
        self.state.network = Default::default();
        self.state.registered = false;
        self.dispatcher.reset_cache();

        if let Some(webirc) = self.options.webirc.clone() {
            let flags = (!webirc.options.is_empty()).then(|| webirc.options.join(" "));
            self.write_line(raw_line(params![
                "WEBIRC",
                webirc.password,
                webirc.username,
                webirc.hostname,
                webirc.address,
                flags,
            ]));
        }
        self.write_line(raw_line(["CAP", "LS", "302"]));
        if let Some(password) = self.options.password.clone() {
            self.write_line(raw_line(["PASS", password.as_str()]));
        }
        // Every connection registers with the configured nick.
        let nick = self.options.nick.clone();
        self.state.user.nick = nick.clone();
        self.write_line(raw_line(["NICK", nick.as_str()]));
        let user = raw_line([
            "USER",
            self.options.username.as_str(),
            "0",
            "*",
            self.options.gecos.as_str(),
        ]);
        self.write_line(user);

        self.keepalive.arm(&mut self.transport);
    }

    pub(super) fn on_keepalive(&mut self, action: KeepaliveAction) {
        match action {
            KeepaliveAction::Probe => {
                let stamp = chrono::Utc::now().timestamp_millis();
                self.write_line(raw_line(params!["PING", stamp]));
            }
            KeepaliveAction::TimedOut { seconds } => {
                info!(seconds, "ping timeout");
                self.publish(Event::PingTimeout { seconds });
                let line = raw_line(params![
                    "QUIT",
                    format!("Ping timeout ({seconds} seconds)"),
                ]);
                self.transport.end(Some(&line), true);
            }
        }
    }

    pub(super) fn on_close(&mut self, had_error: bool) {
        debug!(had_error, "connection closed");
        self.keepalive.disarm(&mut self.transport);
        self.drop_connection_queries();
        self.state.registered = false;
        self.publish(Event::Close { had_error });
    }

    /// Forget WHO requests and next-turn work tied to the current
    /// connection. Waiting callers see their channel close.
    fn drop_connection_queries(&mut self) {
        if let Some(listener) = self.who_queue.clear() {
            self.correlator.cancel(listener);
        }
        self.deferred.clear();
    }
}
