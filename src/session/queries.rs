//! Queries answered by later events.
//!
//! Every helper sends its request and returns a receiver that completes on
//! the first matching reply. Names are compared under the network
//! casemapping in effect when the query was made.

use regex::Regex;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::Session;
use super::deferred::Deferred;
use crate::correlation::who::{InFlight, WhoRequest, is_valid_target, who_line};
use crate::correlation::{ListenerHandle, Query};
use crate::dispatch::Dispatcher;
use crate::event::{
    BanList, Event, EventKind, InviteList, MessageEvent, MessageKind, WhoList, WhoisReply,
    WhowasReply,
};
use crate::transport::Transport;

impl<T: Transport, D: Dispatcher> Session<T, D> {
    /// `WHOIS nick nick`, so the nick's own server answers with idle time.
    pub fn whois(&mut self, nick: &str) -> Query<WhoisReply> {
        let casemapping = self.state.network.casemapping();
        let key = nick.to_owned();
        let query = self.correlator.once(&[EventKind::Whois], move |event| match event {
            Event::Whois(reply) if casemapping.equals(&reply.nick, &key) => Some(reply.clone()),
            _ => None,
        });
        self.raw(["WHOIS", nick, nick]);
        query
    }

    pub fn whowas(&mut self, nick: &str) -> Query<WhowasReply> {
        let casemapping = self.state.network.casemapping();
        let key = nick.to_owned();
        let query = self.correlator.once(&[EventKind::Whowas], move |event| match event {
            Event::Whowas(reply) if casemapping.equals(&reply.nick, &key) => Some(reply.clone()),
            _ => None,
        });
        self.raw(["WHOWAS", nick]);
        query
    }

    pub fn banlist(&mut self, channel: &str) -> Query<BanList> {
        let casemapping = self.state.network.casemapping();
        let key = channel.to_owned();
        let query = self.correlator.once(&[EventKind::BanList], move |event| match event {
            Event::BanList(list) if casemapping.equals(&list.channel, &key) => Some(list.clone()),
            _ => None,
        });
        self.raw(["MODE", channel, "b"]);
        query
    }

    /// Invite exception list. Resolves to `None` when we lack the privileges
    /// to see it.
    pub fn invite_list(&mut self, channel: &str) -> Query<Option<InviteList>> {
        let casemapping = self.state.network.casemapping();
        let key = channel.to_owned();
        let query = self.correlator.once(
            &[EventKind::InviteList, EventKind::IrcError],
            move |event| match event {
                Event::InviteList(list) if casemapping.equals(&list.channel, &key) => {
                    Some(Some(list.clone()))
                }
                Event::IrcError(err)
                    if err.error == "chanop_privs_needed"
                        && err
                            .channel
                            .as_deref()
                            .is_some_and(|c| casemapping.equals(c, &key)) =>
                {
                    Some(None)
                }
                _ => None,
            },
        );
        let mode = self.state.network.invex_mode().to_string();
        self.raw(["MODE", channel, mode.as_str()]);
        query
    }

    /// Queue a WHO. Only one WHO is on the wire at a time; results arrive in
    /// the order the queries were made.
    ///
    /// An empty or whitespace-containing target is answered with an empty
    /// list on the next turn, without asking the server.
    pub fn who(&mut self, target: &str) -> oneshot::Receiver<WhoList> {
        let (tx, rx) = oneshot::channel();
        self.who_queue.push(WhoRequest {
            target: target.to_owned(),
            reply: Some(tx),
        });
        self.advance_who();
        rx
    }

    /// Forward every privmsg, notice or action whose text matches `pattern`
    /// until [`cancel_listener`](Self::cancel_listener) is called or the
    /// receiver is dropped. An empty `kinds` matches all three.
    pub fn match_messages(
        &mut self,
        kinds: &[MessageKind],
        pattern: Regex,
    ) -> (ListenerHandle, mpsc::UnboundedReceiver<MessageEvent>) {
        let kinds = kinds.to_vec();
        self.correlator.matching(
            &[EventKind::Privmsg, EventKind::Notice, EventKind::Action],
            move |event| {
                event
                    .as_message()
                    .filter(|m| kinds.is_empty() || kinds.contains(&m.kind))
                    .filter(|m| pattern.is_match(&m.message))
                    .cloned()
            },
        )
    }

    /// Stop waiting on a query or matcher. Its receiver closes.
    pub fn cancel_listener(&mut self, handle: ListenerHandle) -> bool {
        self.correlator.cancel(handle)
    }

    /// Start the head of the WHO queue if nothing is in flight.
    fn advance_who(&mut self) {
        let Some(request) = self.who_queue.next_ready() else {
            return;
        };

        if !is_valid_target(&request.target) {
            debug!(who_target = %request.target, "answering invalid WHO target locally");
            self.who_queue.start(InFlight::Synthetic);
            self.defer(Deferred::ResolveWho(request));
            return;
        }

        let casemapping = self.state.network.casemapping();
        let line = who_line(&request.target, self.state.network.supports("WHOX").is_some());
        let WhoRequest { target, mut reply } = request;
        let handle = self.correlator.watch(&[EventKind::WhoList], move |event| match event {
            Event::WhoList(list) if casemapping.equals(&list.target, &target) => {
                if let Some(reply) = reply.take() {
                    let _ = reply.send(list.clone());
                }
                true
            }
            _ => false,
        });
        self.who_queue.start(InFlight::Listener(handle));
        self.write_line(line);
    }

    pub(super) fn run_deferred(&mut self, task: Deferred) {
        match task {
            Deferred::AdvanceWho => self.advance_who(),
            Deferred::ResolveWho(request) => {
                let target = request.target.clone();
                request.resolve(WhoList {
                    target,
                    users: Vec::new(),
                });
                self.who_queue.finish();
                self.defer(Deferred::AdvanceWho);
            }
        }
    }
}
