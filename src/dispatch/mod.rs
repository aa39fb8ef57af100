//! Turning inbound messages into events.
//!
//! A [`Dispatcher`] receives every message that survived the raw pipeline
//! and produces zero or more [`Event`]s plus any lines that must go straight
//! back (`PONG`, `CAP REQ`/`END`, an alternate nick). Replies spread over
//! several numerics are accumulated in the [`DispatchCache`] until their
//! terminating numeric arrives.
//!
//! [`IrcDispatcher`] covers the commands and numerics a client session
//! needs. Anything it does not know becomes [`Event::Unknown`].

mod channel;
mod errors;
mod messaging;
mod query;
mod registration;

use std::collections::{BTreeSet, HashMap};

use slirc_wire::{Message, Prefix};

use crate::event::{ChannelUser, Event, ListEntry, WhoUser, WhoisReply, WhowasReply};
use crate::network::NetworkInfo;

pub use errors::error_name;

/// Capabilities requested whenever the server offers them.
pub const DEFAULT_CAPS: &[&str] = &[
    "account-notify",
    "account-tag",
    "away-notify",
    "cap-notify",
    "extended-join",
    "invite-notify",
    "message-tags",
    "multi-prefix",
    "server-time",
    "userhost-in-names",
];

/// Decodes messages into events.
pub trait Dispatcher {
    /// Handle one inbound message.
    fn dispatch(&mut self, message: &Message, ctx: &mut DispatchContext<'_>);

    /// Drop every partially accumulated reply.
    fn reset_cache(&mut self);

    /// Ask for capabilities on top of the built-in set.
    fn request_extra_capabilities(&mut self, caps: &[String]);

    /// Accumulation caches, for owners that need to inspect or clear them.
    fn cache(&mut self) -> &mut DispatchCache;
}

/// What a dispatcher may read and write while handling one message.
#[derive(Debug)]
pub struct DispatchContext<'a> {
    pub network: &'a mut NetworkInfo,
    /// The local nick.
    pub nick: &'a str,
    pub registered: bool,
    events: Vec<Event>,
    outbound: Vec<String>,
}

impl<'a> DispatchContext<'a> {
    pub fn new(network: &'a mut NetworkInfo, nick: &'a str, registered: bool) -> Self {
        Self {
            network,
            nick,
            registered,
            events: Vec::new(),
            outbound: Vec::new(),
        }
    }

    /// Queue an event for the pipeline.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Queue a line to write back.
    pub fn send(&mut self, line: impl Into<String>) {
        self.outbound.push(line.into());
    }

    /// Whether `name` is the local nick.
    pub fn is_me(&self, name: &str) -> bool {
        self.network.names_equal(name, self.nick)
    }

    /// Lowercase key under the network casemapping.
    pub fn key(&self, name: &str) -> String {
        self.network.casemapping().to_lower(name)
    }

    /// Events and outbound lines, in the order they were produced.
    pub fn finish(self) -> (Vec<Event>, Vec<String>) {
        (self.events, self.outbound)
    }
}

/// Partial replies waiting for their end numeric. Keys are casefolded.
#[derive(Debug, Clone, Default)]
pub struct DispatchCache {
    pub who: Vec<WhoUser>,
    pub whois: HashMap<String, WhoisReply>,
    pub whowas: HashMap<String, WhowasReply>,
    pub names: HashMap<String, Vec<ChannelUser>>,
    pub bans: HashMap<String, Vec<ListEntry>>,
    pub invites: HashMap<String, Vec<ListEntry>>,
    pub motd: String,
    /// Capabilities from a multi-line `CAP LS`.
    pub cap_ls: Vec<String>,
}

impl DispatchCache {
    pub fn is_empty(&self) -> bool {
        self.who.is_empty()
            && self.whois.is_empty()
            && self.whowas.is_empty()
            && self.names.is_empty()
            && self.bans.is_empty()
            && self.invites.is_empty()
            && self.motd.is_empty()
            && self.cap_ls.is_empty()
    }
}

/// The built-in dispatcher.
#[derive(Debug, Clone)]
pub struct IrcDispatcher {
    wanted_caps: BTreeSet<String>,
    cache: DispatchCache,
}

impl Default for IrcDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl IrcDispatcher {
    pub fn new() -> Self {
        Self {
            wanted_caps: DEFAULT_CAPS.iter().map(|c| (*c).to_owned()).collect(),
            cache: DispatchCache::default(),
        }
    }

    pub fn wanted_caps(&self) -> &BTreeSet<String> {
        &self.wanted_caps
    }
}

impl Dispatcher for IrcDispatcher {
    fn dispatch(&mut self, message: &Message, ctx: &mut DispatchContext<'_>) {
        let handled = match message.command.as_str() {
            "CAP" => registration::cap(self, message, ctx),
            "001" => registration::welcome(self, message, ctx),
            "005" => registration::isupport(message, ctx),
            "PING" => registration::ping(message, ctx),
            "PONG" => registration::pong(message, ctx),
            "ERROR" => registration::error(message, ctx),
            "375" | "372" | "376" | "422" => registration::motd(&mut self.cache, message, ctx),

            "NICK" => channel::nick(message, ctx),
            "MODE" => channel::mode(message, ctx),
            "221" => channel::user_mode_is(message, ctx),
            "JOIN" => channel::join(message, ctx),
            "PART" => channel::part(message, ctx),
            "KICK" => channel::kick(message, ctx),
            "QUIT" => channel::quit(message, ctx),
            "TOPIC" | "331" | "332" => channel::topic(message, ctx),
            "333" => channel::topic_set_by(message, ctx),
            "INVITE" => channel::invite(message, ctx),
            "353" | "366" => channel::names(&mut self.cache, message, ctx),
            "AWAY" | "305" | "306" => channel::away(message, ctx),
            "CHGHOST" => channel::chghost(message, ctx),
            "ACCOUNT" => channel::account(message, ctx),
            "396" => channel::hidden_host(message, ctx),

            "PRIVMSG" | "NOTICE" => messaging::message(message, ctx),
            "TAGMSG" => messaging::tagmsg(message, ctx),

            "352" | "354" | "315" => query::who(&mut self.cache, message, ctx),
            "301" | "307" | "311" | "312" | "313" | "317" | "318" | "319" | "330" | "338"
            | "378" | "671" => query::whois(&mut self.cache, message, ctx),
            "314" | "369" | "406" => query::whowas(&mut self.cache, message, ctx),
            "367" | "368" | "346" | "347" => query::mode_list(&mut self.cache, message, ctx),

            _ => false,
        };

        if handled {
            return;
        }
        if errors::error(&mut self.cache, message, ctx) {
            if message.command == "433" && !ctx.registered {
                registration::alternate_nick(message, ctx);
            }
            return;
        }

        ctx.emit(Event::Unknown {
            command: message.command.clone(),
            params: message.params.clone(),
        });
    }

    fn reset_cache(&mut self) {
        self.cache = DispatchCache::default();
    }

    fn request_extra_capabilities(&mut self, caps: &[String]) {
        self.wanted_caps.extend(caps.iter().cloned());
    }

    fn cache(&mut self) -> &mut DispatchCache {
        &mut self.cache
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// `(nick, ident, hostname)` of the message source; empty when absent.
pub(crate) fn source(message: &Message) -> (String, String, String) {
    match &message.prefix {
        Some(Prefix::Nickname(nick, user, host)) => (nick.clone(), user.clone(), host.clone()),
        Some(Prefix::ServerName(name)) => (name.clone(), String::new(), String::new()),
        None => (String::new(), String::new(), String::new()),
    }
}

/// Owned parameter or empty string.
pub(crate) fn param(message: &Message, index: usize) -> String {
    message.param(index).unwrap_or_default().to_owned()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn unknown_commands_pass_through() {
        let events = events(&[":srv 999 me some thing"]);
        assert_eq!(
            events,
            vec![Event::Unknown {
                command: "999".into(),
                params: vec!["me".into(), "some".into(), "thing".into()],
            }]
        );
    }

    #[test]
    fn extra_caps_are_added_to_wanted() {
        let mut dispatcher = IrcDispatcher::new();
        dispatcher.request_extra_capabilities(&["echo-message".into()]);
        assert!(dispatcher.wanted_caps().contains("echo-message"));
        assert!(dispatcher.wanted_caps().contains("server-time"));
    }

    #[test]
    fn reset_cache_clears_partial_replies() {
        let mut dispatcher = IrcDispatcher::new();
        let mut network = NetworkInfo::default();
        run(&mut dispatcher, &mut network, true, ":srv 353 me = #c :alice bob");
        assert!(!dispatcher.cache().is_empty());
        dispatcher.reset_cache();
        assert!(dispatcher.cache().is_empty());
    }
}
