//! Request/response correlation.
//!
//! IRC replies carry no request id, so a query is answered by watching the
//! event stream for the first event that looks like its answer. A
//! [`Correlator`] holds those watchers. One-shot listeners are removed on
//! their first match; persistent matchers stay until cancelled or until
//! their receiver is dropped. WHO gets its own strictly serialized queue in
//! [`who`].

pub mod who;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::event::{Event, EventKind};

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

/// A pending single-answer query.
///
/// Await it directly or use [`Query::reply`]. Cancelling the listener
/// through the session closes the channel.
#[derive(Debug)]
pub struct Query<T> {
    pub handle: ListenerHandle,
    pub reply: oneshot::Receiver<T>,
}

impl<T> Future for Query<T> {
    type Output = Result<T, oneshot::error::RecvError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply).poll(cx)
    }
}

enum Outcome {
    Pass,
    Fired,
    /// The other end is gone.
    Detach,
}

struct Listener {
    handle: ListenerHandle,
    kinds: Vec<EventKind>,
    once: bool,
    matcher: Box<dyn FnMut(&Event) -> Outcome>,
}

/// Registry of listeners waiting for events.
#[derive(Default)]
pub struct Correlator {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot matcher. It is offered every event of `kinds`
    /// and removed the first time it returns `true`.
    pub fn watch<F>(&mut self, kinds: &[EventKind], mut matcher: F) -> ListenerHandle
    where
        F: FnMut(&Event) -> bool + 'static,
    {
        self.register(kinds, true, move |event| {
            if matcher(event) {
                Outcome::Fired
            } else {
                Outcome::Pass
            }
        })
    }

    /// Wait for the first event of `kinds` for which `extract` returns a
    /// value.
    pub fn once<T, F>(&mut self, kinds: &[EventKind], mut extract: F) -> Query<T>
    where
        T: 'static,
        F: FnMut(&Event) -> Option<T> + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        let handle = self.watch(kinds, move |event| match extract(event) {
            Some(value) => {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(value);
                }
                true
            }
            None => false,
        });
        Query { handle, reply: rx }
    }

    /// Forward every event of `kinds` for which `extract` returns a value
    /// until cancelled or until the receiver is dropped.
    pub fn matching<T, F>(
        &mut self,
        kinds: &[EventKind],
        mut extract: F,
    ) -> (ListenerHandle, mpsc::UnboundedReceiver<T>)
    where
        T: 'static,
        F: FnMut(&Event) -> Option<T> + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.register(kinds, false, move |event| match extract(event) {
            Some(value) => match tx.send(value) {
                Ok(()) => Outcome::Fired,
                Err(_) => Outcome::Detach,
            },
            None => Outcome::Pass,
        });
        (handle, rx)
    }

    fn register<M>(&mut self, kinds: &[EventKind], once: bool, matcher: M) -> ListenerHandle
    where
        M: FnMut(&Event) -> Outcome + 'static,
    {
        self.next_id += 1;
        let handle = ListenerHandle(self.next_id);
        self.listeners.push(Listener {
            handle,
            kinds: kinds.to_vec(),
            once,
            matcher: Box::new(matcher),
        });
        trace!(listener = handle.0, ?kinds, once, "listener registered");
        handle
    }

    /// Offer an event to every listener. Returns the one-shot listeners that
    /// fired, in registration order.
    pub fn deliver(&mut self, event: &Event) -> Vec<ListenerHandle> {
        let kind = event.kind();
        let mut fired = Vec::new();
        self.listeners.retain_mut(|listener| {
            if !listener.kinds.contains(&kind) {
                return true;
            }
            match (listener.matcher)(event) {
                Outcome::Pass => true,
                Outcome::Fired if listener.once => {
                    fired.push(listener.handle);
                    false
                }
                Outcome::Fired => true,
                Outcome::Detach => false,
            }
        });
        fired
    }

    /// Remove a listener. Returns whether it was still registered.
    pub fn cancel(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.handle != handle);
        before != self.listeners.len()
    }

    pub fn is_registered(&self, handle: ListenerHandle) -> bool {
        self.listeners.iter().any(|l| l.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
