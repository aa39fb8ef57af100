//! The client session.
//!
//! A [`Session`] owns one transport and one dispatcher and is driven by a
//! single task: the owner feeds it every [`TransportEvent`] through
//! [`Session::handle_transport_event`] and calls the command and query
//! methods in between. Nothing here blocks or awaits.
//!
//! Inbound lines flow as follows:
//!
//! 1. the keepalive timeout is pushed back;
//! 2. a [`Event::Raw`] copy is published;
//! 3. the raw middleware chain runs, and may drop the line;
//! 4. the dispatcher decodes it into events and reply lines;
//! 5. each event runs through the parsed chain, and may be dropped;
//! 6. state sync and correlation see the event;
//! 7. subscribers receive it (message-shaped events twice).

mod commands;
mod deferred;
mod lifecycle;
mod queries;
mod state;
mod sync;

pub use state::{SessionState, UserState};

use slirc_wire::Message;
use slirc_wire::line::is_line_breaking;
use tracing::{trace, warn};

use crate::config::{ClientOptions, ConnectOptions};
use crate::correlation::Correlator;
use crate::correlation::who::WhoQueue;
use crate::dispatch::{DispatchContext, Dispatcher, IrcDispatcher};
use crate::event::{Event, EventFilter, Subscribers};
use crate::keepalive::Keepalive;
use crate::pipeline::{Chain, ParsedMiddleware, RawLine, RawMiddleware};
use crate::transport::{Transport, TransportEvent};

use deferred::{Deferred, DeferredQueue};

/// An IRC client session.
pub struct Session<T: Transport, D: Dispatcher = IrcDispatcher> {
    transport: T,
    dispatcher: D,
    state: SessionState,
    /// Options as last supplied, before defaults.
    retained: Option<ConnectOptions>,
    options: ClientOptions,
    raw_chain: Chain<RawMiddleware>,
    parsed_chain: Chain<ParsedMiddleware>,
    keepalive: Keepalive,
    correlator: Correlator,
    who_queue: WhoQueue,
    deferred: DeferredQueue,
    subscribers: Subscribers,
}

impl<T: Transport> Session<T, IrcDispatcher> {
    /// A session with the built-in dispatcher.
    pub fn new(transport: T) -> Self {
        Self::with_dispatcher(transport, IrcDispatcher::new())
    }
}

impl<T: Transport, D: Dispatcher> Session<T, D> {
    pub fn with_dispatcher(transport: T, dispatcher: D) -> Self {
        let options = ClientOptions::default();
        Self {
            transport,
            dispatcher,
            state: SessionState::default(),
            retained: None,
            keepalive: Keepalive::new(options.ping_interval, options.ping_timeout),
            options,
            raw_chain: Chain::new(),
            parsed_chain: Chain::new(),
            correlator: Correlator::new(),
            who_queue: WhoQueue::new(),
            deferred: DeferredQueue::default(),
            subscribers: Subscribers::default(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Options in effect for the current connection.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn nick(&self) -> &str {
        &self.state.user.nick
    }

    pub fn is_registered(&self) -> bool {
        self.state.registered
    }

    /// Listeners still waiting for an answer.
    pub fn pending_listeners(&self) -> usize {
        self.correlator.len()
    }

    /// WHO requests queued behind the one in flight.
    pub fn queued_who(&self) -> usize {
        self.who_queue.len()
    }

    // ========================================================================
    // Extension points
    // ========================================================================

    /// Receive published events.
    pub fn subscribe(&mut self, filter: EventFilter) -> tokio::sync::mpsc::UnboundedReceiver<Event> {
        self.subscribers.subscribe(filter)
    }

    /// Add middleware. `registrar` runs immediately with both chains.
    pub fn use_middleware<F>(&mut self, registrar: F)
    where
        F: FnOnce(&SessionState, &mut Chain<RawMiddleware>, &mut Chain<ParsedMiddleware>),
    {
        registrar(&self.state, &mut self.raw_chain, &mut self.parsed_chain);
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Feed one transport event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting => self.publish(Event::Connecting),
            TransportEvent::SocketConnected => self.on_socket_connected(),
            TransportEvent::Message { message, raw } => self.on_message(message, raw),
            TransportEvent::Close { had_error } => self.on_close(had_error),
            TransportEvent::Reconnecting {
                attempt,
                max_retries,
                wait,
            } => self.publish(Event::Reconnecting {
                attempt,
                max_retries,
                wait,
            }),
            TransportEvent::TimerFired(handle) => self.on_timer(handle),
            TransportEvent::Error(message) => {
                warn!(error = %message, "transport error");
                self.publish(Event::TransportError { message });
            }
        }
    }

    fn on_message(&mut self, message: Message, raw: String) {
        self.keepalive.traffic(&mut self.transport);
        self.publish(Event::Raw {
            line: raw.clone(),
            from_server: true,
        });

        let line = RawLine {
            command: &message.command,
            message: &message,
            raw: &raw,
        };
        if let Err(abort) = self.raw_chain.run(&line, &self.state) {
            warn!(command = %message.command, reason = %abort.reason(), "raw middleware dropped line");
            return;
        }

        let mut ctx = DispatchContext::new(
            &mut self.state.network,
            &self.state.user.nick,
            self.state.registered,
        );
        self.dispatcher.dispatch(&message, &mut ctx);
        let (events, outbound) = ctx.finish();

        for line in outbound {
            self.write_line(line);
        }
        for event in events {
            self.process_event(event);
        }
    }

    fn process_event(&mut self, mut event: Event) {
        if let Err(abort) = self.parsed_chain.run(&mut event, &self.state) {
            warn!(kind = ?event.kind(), reason = %abort.reason(), "parsed middleware dropped event");
            return;
        }

        let follow_up = self.sync_state(&event);
        self.auto_reply(&event);

        for handle in self.correlator.deliver(&event) {
            if self.who_queue.is_current(handle) {
                self.who_queue.finish();
                self.defer(Deferred::AdvanceWho);
            }
        }

        let unified = match &event {
            Event::Privmsg(m) | Event::Notice(m) | Event::Action(m) => Some(Event::Message(m.clone())),
            _ => None,
        };
        self.publish(event);
        if let Some(unified) = unified {
            self.publish(unified);
        }
        if let Some(follow_up) = follow_up {
            self.publish(follow_up);
        }
    }

    fn on_timer(&mut self, handle: crate::transport::TimerHandle) {
        if let Some(tasks) = self.deferred.take_due(handle) {
            for task in tasks {
                self.run_deferred(task);
            }
            return;
        }
        if let Some(action) = self.keepalive.on_timer(handle, &mut self.transport) {
            self.on_keepalive(action);
            return;
        }
        trace!(timer = handle.0, "stale timer");
    }

    fn defer(&mut self, task: Deferred) {
        self.deferred.push(task, &mut self.transport);
    }

    pub(crate) fn publish(&mut self, event: Event) {
        self.subscribers.publish(&event);
    }

    /// Write one line and publish it as outgoing raw traffic. A line with
    /// an embedded line break is dropped.
    pub(crate) fn write_line(&mut self, line: String) {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.contains(is_line_breaking) {
            warn!(line = %line.escape_debug(), "outbound line with a line break dropped");
            return;
        }
        let line = line.to_owned();
        self.transport.write(&line);
        self.publish(Event::Raw {
            line,
            from_server: false,
        });
    }
}

impl<T: Transport, D: Dispatcher> std::fmt::Debug for Session<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("nick", &self.state.user.nick)
            .field("registered", &self.state.registered)
            .field("listeners", &self.correlator.len())
            .field("who_queued", &self.who_queue.len())
            .finish()
    }
}
