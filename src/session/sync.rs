//! Keeping [`SessionState`](super::SessionState) in step with the server.
//!
//! Only the handful of events below mutate session state. Protocol error
//! replies are logged and published, never treated as connection failures.

use tracing::{debug, info};

use super::Session;
use crate::dispatch::Dispatcher;
use crate::event::Event;
use crate::transport::Transport;

impl<T: Transport, D: Dispatcher> Session<T, D> {
    /// Apply `event` to the session state. Returns an event to publish after
    /// it, if any.
    pub(super) fn sync_state(&mut self, event: &Event) -> Option<Event> {
        match event {
            Event::Nick(change) if self.state.is_me(&change.nick) => {
                if change.new_nick.starts_with(|c: char| c.is_ascii_digit()) {
                    debug!(new_nick = %change.new_nick, "ignoring nick starting with a digit");
                } else {
                    info!(old = %change.nick, new = %change.new_nick, "nick changed");
                    self.state.user.nick = change.new_nick.clone();
                }
            }
            Event::Mode(mode) if self.state.is_me(&mode.target) => {
                for change in &mode.modes {
                    let Some(letter) = change.letter() else { continue };
                    if change.adding() {
                        self.state.user.modes.insert(letter);
                    } else {
                        self.state.user.modes.remove(&letter);
                    }
                }
            }
            Event::WhoList(list) => {
                if let Some(me) = list.users.iter().find(|u| self.state.is_me(&u.nick)) {
                    self.state.user.username = me.ident.clone();
                    self.state.user.host = me.hostname.clone();
                }
            }
            Event::Registered { nick } => {
                info!(nick = %nick, "registered");
                self.state.user.nick = nick.clone();
                self.state.registered = true;
                self.transport.registered_successfully();
                return Some(Event::Connected { nick: nick.clone() });
            }
            Event::Away { nick, .. } if self.state.is_me(nick) => self.state.user.away = true,
            Event::Back { nick } if self.state.is_me(nick) => self.state.user.away = false,
            Event::DisplayedHost { nick, hostname } if self.state.is_me(nick) => {
                self.state.user.host = hostname.clone();
            }
            Event::IrcError(err) => {
                debug!(
                    error = %err.error,
                    numeric = err.numeric,
                    reason = %err.reason,
                    "server error reply"
                );
            }
            _ => {}
        }
        None
    }

    /// Answer `CTCP VERSION` when a version string is configured.
    pub(super) fn auto_reply(&mut self, event: &Event) {
        let Event::CtcpRequest(request) = event else {
            return;
        };
        if request.ctcp_type != "VERSION" || self.options.version.is_empty() {
            return;
        }
        let version = self.options.version.clone();
        self.ctcp_response(&request.nick, "VERSION", Some(&version));
    }
}
