//! Public event surface.
//!
//! Everything a [`Session`](crate::Session) observes is published as an
//! [`Event`]. Subscribers pick the kinds they care about with an
//! [`EventFilter`] and receive clones over an unbounded channel.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use slirc_wire::Tag;
use tokio::sync::mpsc;

/// Everything the session publishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // ------------------------------------------------------------------
    // Lifecycle (emitted by the session, not decoded from the wire)
    // ------------------------------------------------------------------
    Connecting,
    SocketConnected,
    /// Registration completed; the session is usable.
    Connected { nick: String },
    Close { had_error: bool },
    Reconnecting {
        attempt: u32,
        max_retries: u32,
        wait: Duration,
    },
    /// No traffic within the configured timeout; the connection was dropped.
    PingTimeout { seconds: i64 },
    /// A line in either direction.
    Raw { line: String, from_server: bool },
    TransportError { message: String },

    // ------------------------------------------------------------------
    // Registration and network
    // ------------------------------------------------------------------
    Registered { nick: String },
    /// Tokens from one `005` line.
    ServerOptions { options: Vec<String> },
    Cap(CapEvent),
    Motd(Motd),
    /// `ERROR` from the server, usually just before it closes the link.
    ServerError { message: String },
    Ping { message: String },
    Pong { message: String },

    // ------------------------------------------------------------------
    // Users and channels
    // ------------------------------------------------------------------
    Nick(NickChange),
    Mode(ModeEvent),
    Join(Join),
    Part(Part),
    Kick(Kick),
    Quit(Quit),
    Topic(Topic),
    TopicSetBy(TopicSetBy),
    Invite(Invite),
    UserList(UserList),
    Away { nick: String, message: String },
    Back { nick: String },
    Chghost(Chghost),
    Account { nick: String, account: Option<String> },

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------
    Privmsg(MessageEvent),
    Notice(MessageEvent),
    Action(MessageEvent),
    /// Every privmsg, notice and action a second time, under one kind.
    Message(MessageEvent),
    CtcpRequest(CtcpEvent),
    CtcpResponse(CtcpEvent),
    Tagmsg(Tagmsg),

    // ------------------------------------------------------------------
    // Query replies
    // ------------------------------------------------------------------
    WhoList(WhoList),
    Whois(WhoisReply),
    Whowas(WhowasReply),
    BanList(BanList),
    InviteList(InviteList),
    DisplayedHost { nick: String, hostname: String },

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------
    IrcError(IrcError),
    Unknown { command: String, params: Vec<String> },
}

/// Discriminant of [`Event`], used for filters and correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Connecting,
    SocketConnected,
    Connected,
    Close,
    Reconnecting,
    PingTimeout,
    Raw,
    TransportError,
    Registered,
    ServerOptions,
    Cap,
    Motd,
    ServerError,
    Ping,
    Pong,
    Nick,
    Mode,
    Join,
    Part,
    Kick,
    Quit,
    Topic,
    TopicSetBy,
    Invite,
    UserList,
    Away,
    Back,
    Chghost,
    Account,
    Privmsg,
    Notice,
    Action,
    Message,
    CtcpRequest,
    CtcpResponse,
    Tagmsg,
    WhoList,
    Whois,
    Whowas,
    BanList,
    InviteList,
    DisplayedHost,
    IrcError,
    Unknown,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connecting => EventKind::Connecting,
            Event::SocketConnected => EventKind::SocketConnected,
            Event::Connected { .. } => EventKind::Connected,
            Event::Close { .. } => EventKind::Close,
            Event::Reconnecting { .. } => EventKind::Reconnecting,
            Event::PingTimeout { .. } => EventKind::PingTimeout,
            Event::Raw { .. } => EventKind::Raw,
            Event::TransportError { .. } => EventKind::TransportError,
            Event::Registered { .. } => EventKind::Registered,
            Event::ServerOptions { .. } => EventKind::ServerOptions,
            Event::Cap(_) => EventKind::Cap,
            Event::Motd(_) => EventKind::Motd,
            Event::ServerError { .. } => EventKind::ServerError,
            Event::Ping { .. } => EventKind::Ping,
            Event::Pong { .. } => EventKind::Pong,
            Event::Nick(_) => EventKind::Nick,
            Event::Mode(_) => EventKind::Mode,
            Event::Join(_) => EventKind::Join,
            Event::Part(_) => EventKind::Part,
            Event::Kick(_) => EventKind::Kick,
            Event::Quit(_) => EventKind::Quit,
            Event::Topic(_) => EventKind::Topic,
            Event::TopicSetBy(_) => EventKind::TopicSetBy,
            Event::Invite(_) => EventKind::Invite,
            Event::UserList(_) => EventKind::UserList,
            Event::Away { .. } => EventKind::Away,
            Event::Back { .. } => EventKind::Back,
            Event::Chghost(_) => EventKind::Chghost,
            Event::Account { .. } => EventKind::Account,
            Event::Privmsg(_) => EventKind::Privmsg,
            Event::Notice(_) => EventKind::Notice,
            Event::Action(_) => EventKind::Action,
            Event::Message(_) => EventKind::Message,
            Event::CtcpRequest(_) => EventKind::CtcpRequest,
            Event::CtcpResponse(_) => EventKind::CtcpResponse,
            Event::Tagmsg(_) => EventKind::Tagmsg,
            Event::WhoList(_) => EventKind::WhoList,
            Event::Whois(_) => EventKind::Whois,
            Event::Whowas(_) => EventKind::Whowas,
            Event::BanList(_) => EventKind::BanList,
            Event::InviteList(_) => EventKind::InviteList,
            Event::DisplayedHost { .. } => EventKind::DisplayedHost,
            Event::IrcError(_) => EventKind::IrcError,
            Event::Unknown { .. } => EventKind::Unknown,
        }
    }

    /// The payload of a privmsg, notice or action.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Event::Privmsg(m) | Event::Notice(m) | Event::Action(m) | Event::Message(m) => Some(m),
            _ => None,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapEvent {
    /// `LS`, `ACK`, `NAK`, `NEW`, `DEL` or `LIST`.
    pub subcommand: String,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Motd {
    pub motd: String,
    /// Set when the server reported `422 ERR_NOMOTD`.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NickChange {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub new_nick: String,
}

/// One `+x` or `-x` with its parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    /// Sign and letter, e.g. `+o`.
    pub mode: String,
    pub param: Option<String>,
}

impl ModeChange {
    pub fn adding(&self) -> bool {
        self.mode.starts_with('+')
    }

    pub fn letter(&self) -> Option<char> {
        self.mode.chars().nth(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeEvent {
    pub target: String,
    /// Who set the modes; a server name for server modes.
    pub nick: String,
    pub modes: Vec<ModeChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub channel: String,
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    /// From `extended-join`; `None` when logged out or unknown.
    pub account: Option<String>,
    pub gecos: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub channel: String,
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kick {
    pub channel: String,
    pub kicked: String,
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quit {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub channel: String,
    pub topic: String,
    /// Who changed it; `None` for the topic sent on join.
    pub nick: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSetBy {
    pub channel: String,
    pub nick: String,
    pub when: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
    pub channel: String,
    pub invited: String,
    pub nick: String,
    pub ident: String,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUser {
    pub nick: String,
    /// Present with `userhost-in-names`, empty otherwise.
    pub ident: String,
    pub hostname: String,
    /// Prefix symbols, e.g. `['@']`.
    pub modes: Vec<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserList {
    pub channel: String,
    pub users: Vec<ChannelUser>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chghost {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub new_ident: String,
    pub new_hostname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Privmsg,
    Notice,
    Action,
}

/// A privmsg, notice or action.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub kind: MessageKind,
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub target: String,
    pub message: String,
    pub tags: Vec<Tag>,
    /// From the `server-time` tag.
    pub time: Option<DateTime<Utc>>,
    /// Where a reply should go: the sender for private messages, the
    /// channel otherwise.
    pub reply_to: String,
    /// Sent by a server rather than a user.
    pub from_server: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtcpEvent {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub target: String,
    /// Uppercased verb.
    pub ctcp_type: String,
    /// Full payload without delimiters.
    pub message: String,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tagmsg {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub target: String,
    pub tags: Vec<Tag>,
}

/// One row of a WHO reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoUser {
    pub nick: String,
    pub ident: String,
    pub hostname: String,
    pub server: String,
    pub real_name: String,
    pub away: bool,
    /// Channel prefix symbols and `*` for operators, from the status field.
    pub flags: String,
    pub channel: Option<String>,
    /// From WHOX; `None` when logged out or not requested.
    pub account: Option<String>,
    pub hops: Option<u32>,
}

/// Result of a WHO query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoList {
    pub target: String,
    pub users: Vec<WhoUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoisReply {
    pub nick: String,
    pub ident: Option<String>,
    pub hostname: Option<String>,
    pub real_name: Option<String>,
    pub server: Option<String>,
    pub server_info: Option<String>,
    pub channels: Option<String>,
    pub away: Option<String>,
    pub account: Option<String>,
    pub operator: Option<String>,
    pub registered_nick: Option<String>,
    pub secure: bool,
    pub idle: Option<u64>,
    pub logon: Option<DateTime<Utc>>,
    pub actual_ip: Option<String>,
    pub actual_hostname: Option<String>,
    /// `no_such_nick` when the user does not exist.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhowasReply {
    pub nick: String,
    pub ident: Option<String>,
    pub hostname: Option<String>,
    pub real_name: Option<String>,
    pub server: Option<String>,
    pub server_info: Option<String>,
    /// `no_such_nick` when the server has no history.
    pub error: Option<String>,
}

/// One entry of a ban or invite exception list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: Option<String>,
    pub set_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BanList {
    pub channel: String,
    pub bans: Vec<ListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteList {
    pub channel: String,
    pub invites: Vec<ListEntry>,
}

/// A numeric error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcError {
    /// Symbolic name, e.g. `chanop_privs_needed`.
    pub error: String,
    pub numeric: u16,
    pub channel: Option<String>,
    pub nick: Option<String>,
    pub reason: String,
}

// ============================================================================
// Subscribers
// ============================================================================

/// Which events a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Only(Vec<EventKind>),
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        EventFilter::Only(vec![kind])
    }
}

/// Per-kind subscriber lists.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    all: Vec<mpsc::UnboundedSender<Event>>,
    by_kind: HashMap<EventKind, Vec<mpsc::UnboundedSender<Event>>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self, filter: EventFilter) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        match filter {
            EventFilter::All => self.all.push(tx),
            EventFilter::Only(mut kinds) => {
                kinds.sort();
                kinds.dedup();
                for kind in kinds {
                    self.by_kind.entry(kind).or_default().push(tx.clone());
                }
            }
        }
        rx
    }

    /// Send a clone to every interested subscriber, forgetting the ones
    /// whose receiver was dropped.
    pub(crate) fn publish(&mut self, event: &Event) {
        self.all.retain(|tx| tx.send(event.clone()).is_ok());
        if let Some(list) = self.by_kind.get_mut(&event.kind()) {
            list.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.all.len() + self.by_kind.values().map(Vec::len).sum::<usize>()
    }
}
