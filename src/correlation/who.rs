//! Serialized WHO queue.
//!
//! Overlapping WHO replies cannot be told apart, so at most one WHO is on
//! the wire at a time. The queue only tracks order and what is in flight;
//! the session sends the lines, registers the listener and schedules the
//! next step on its deferred queue.

use std::collections::VecDeque;

use tokio::sync::oneshot;

use super::ListenerHandle;
use crate::event::WhoList;

/// Token sent with WHOX requests and expected back in `354` replies.
pub const WHOX_TOKEN: &str = "795";

/// Field selector for WHOX requests.
pub const WHOX_FIELDS: &str = "%tcuhsnfdaor";

/// A caller waiting for a WHO result.
#[derive(Debug)]
pub struct WhoRequest {
    pub target: String,
    pub reply: Option<oneshot::Sender<WhoList>>,
}

impl WhoRequest {
    /// Send the result, ignoring a caller that stopped waiting.
    pub fn resolve(self, list: WhoList) {
        if let Some(reply) = self.reply {
            let _ = reply.send(list);
        }
    }
}

/// What is on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlight {
    /// A real WHO, answered through this listener.
    Listener(ListenerHandle),
    /// An invalid target being answered locally.
    Synthetic,
}

#[derive(Debug, Default)]
pub struct WhoQueue {
    pending: VecDeque<WhoRequest>,
    in_flight: Option<InFlight>,
}

impl WhoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: WhoRequest) {
        self.pending.push_back(request);
    }

    /// Take the head if nothing is in flight.
    pub fn next_ready(&mut self) -> Option<WhoRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        self.pending.pop_front()
    }

    pub fn start(&mut self, in_flight: InFlight) {
        self.in_flight = Some(in_flight);
    }

    /// Mark the current query finished.
    pub fn finish(&mut self) {
        self.in_flight = None;
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    /// Whether `handle` is the listener of the query on the wire.
    pub fn is_current(&self, handle: ListenerHandle) -> bool {
        self.in_flight == Some(InFlight::Listener(handle))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget everything. Pending callers see their channel close. Returns
    /// the listener that was in flight, for the caller to cancel.
    pub fn clear(&mut self) -> Option<ListenerHandle> {
        self.pending.clear();
        match self.in_flight.take() {
            Some(InFlight::Listener(handle)) => Some(handle),
            _ => None,
        }
    }
}

/// Whether `target` can go on the wire as a WHO mask.
pub fn is_valid_target(target: &str) -> bool {
    !target.is_empty() && !target.contains(char::is_whitespace)
}

/// The WHO line for `target`, enriched when the network supports WHOX.
pub fn who_line(target: &str, whox: bool) -> String {
    if whox {
        format!("WHO {target} {WHOX_FIELDS},{WHOX_TOKEN}")
    } else {
        format!("WHO {target}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: &str) -> (WhoRequest, oneshot::Receiver<WhoList>) {
        let (tx, rx) = oneshot::channel();
        (
            WhoRequest {
                target: target.into(),
                reply: Some(tx),
            },
            rx,
        )
    }

    #[test]
    fn one_at_a_time_in_order() {
        let mut queue = WhoQueue::new();
        queue.push(request("#a").0);
        queue.push(request("#b").0);

        let first = queue.next_ready().unwrap();
        assert_eq!(first.target, "#a");
        queue.start(InFlight::Synthetic);
        assert!(queue.next_ready().is_none());

        queue.finish();
        assert_eq!(queue.next_ready().unwrap().target, "#b");
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_drops_waiters_and_returns_listener() {
        let mut correlator = crate::correlation::Correlator::new();
        let listener = correlator
            .once(&[crate::event::EventKind::WhoList], |_| None::<()>)
            .handle;

        let mut queue = WhoQueue::new();
        queue.push(request("#a").0);
        let (waiting, mut rx) = request("#b");
        queue.push(waiting);
        let _head = queue.next_ready().unwrap();
        queue.start(InFlight::Listener(listener));
        assert!(queue.is_current(listener));

        assert_eq!(queue.clear(), Some(listener));
        assert!(queue.is_empty());
        assert!(queue.in_flight().is_none());
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn target_validation() {
        assert!(is_valid_target("#chan"));
        assert!(is_valid_target("nick"));
        assert!(!is_valid_target(""));
        assert!(!is_valid_target("two words"));
        assert!(!is_valid_target(" "));
    }

    #[test]
    fn whox_line_format() {
        assert_eq!(who_line("#c", false), "WHO #c");
        assert_eq!(who_line("#c", true), "WHO #c %tcuhsnfdaor,795");
    }
}
