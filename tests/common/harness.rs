//! A session wired to a [`ScriptedTransport`].

#![allow(dead_code)]

use std::time::Duration;

use slirc_client::{ConnectOptions, Event, EventFilter, Session, TransportEvent};
use slirc_wire::Message;
use tokio::sync::mpsc::UnboundedReceiver;

use super::transport::ScriptedTransport;

pub struct Harness {
    pub session: Session<ScriptedTransport>,
    pub events: UnboundedReceiver<Event>,
}

impl Harness {
    pub fn new() -> Self {
        let mut session = Session::new(ScriptedTransport::default());
        let events = session.subscribe(EventFilter::All);
        Self { session, events }
    }

    /// Connected with `options`; the socket is up and the registration
    /// lines have been taken.
    pub fn connected_with(options: ConnectOptions) -> Self {
        let mut harness = Self::new();
        harness
            .session
            .connect(Some(options))
            .expect("connect with options");
        harness.socket_connected();
        harness.written();
        harness.drain();
        harness
    }

    pub fn connected(nick: &str) -> Self {
        Self::connected_with(ConnectOptions::with_nick(nick))
    }

    /// Connected and welcomed by the server.
    pub fn registered(nick: &str) -> Self {
        let mut harness = Self::connected(nick);
        harness.feed(&format!(":srv 001 {nick} :Welcome to the network"));
        harness.written();
        harness.drain();
        harness
    }

    pub fn socket_connected(&mut self) {
        self.session.transport_mut().connected = true;
        self.session
            .handle_transport_event(TransportEvent::SocketConnected);
    }

    /// Deliver one line from the server.
    pub fn feed(&mut self, line: &str) {
        let message: Message = line.parse().expect("test line parses");
        self.session.handle_transport_event(TransportEvent::Message {
            message,
            raw: line.to_owned(),
        });
    }

    pub fn close(&mut self, had_error: bool) {
        self.session.transport_mut().connected = false;
        self.session
            .handle_transport_event(TransportEvent::Close { had_error });
    }

    /// Lines written since the last call.
    pub fn written(&mut self) -> Vec<String> {
        std::mem::take(&mut self.session.transport_mut().written)
    }

    /// Published events since the last call, without raw echoes.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if !matches!(event, Event::Raw { .. }) {
                events.push(event);
            }
        }
        events
    }

    /// Move the virtual clock forward, firing due timers in order.
    pub fn advance(&mut self, by: Duration) {
        let deadline = self.session.transport().now + by;
        while let Some((handle, due)) = self.session.transport().next_due(deadline) {
            let transport = self.session.transport_mut();
            transport.timers.remove(&handle);
            transport.now = due;
            self.session
                .handle_transport_event(TransportEvent::TimerFired(handle));
        }
        self.session.transport_mut().now = deadline;
    }

    /// Run everything scheduled for the next turn.
    pub fn settle(&mut self) {
        self.advance(Duration::ZERO);
    }
}
