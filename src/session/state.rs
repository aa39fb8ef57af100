//! The session's view of itself and the network.

use std::collections::BTreeSet;

use crate::network::NetworkInfo;

/// Identity and network snapshot, handed read-only to middleware.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: UserState,
    pub network: NetworkInfo,
    /// `001` seen on the current connection.
    pub registered: bool,
}

/// Our own identity as the server sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    pub nick: String,
    pub username: String,
    pub gecos: String,
    /// Host as reported by WHO or `396`; empty until known.
    pub host: String,
    /// User mode letters currently set.
    pub modes: BTreeSet<char>,
    /// Marked away, by `306` or our own `AWAY` echo.
    pub away: bool,
}

impl SessionState {
    /// Whether `nick` is ours under the network casemapping.
    pub fn is_me(&self, nick: &str) -> bool {
        self.network.names_equal(nick, &self.user.nick)
    }
}
