//! Scripted in-memory transport.
//!
//! Records everything the session asks of it and keeps timers on a virtual
//! clock that tests advance by hand.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use slirc_client::{Scheduler, TimerHandle, Transport, TransportConfig};

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub connected: bool,
    pub connects: Vec<TransportConfig>,
    pub written: Vec<String>,
    /// `(final_line, immediate)` for every `end` call.
    pub ends: Vec<(Option<String>, bool)>,
    pub registered_calls: u32,
    /// Virtual time.
    pub now: Duration,
    /// Pending timers and when they are due.
    pub timers: BTreeMap<TimerHandle, Duration>,
    pub cancelled: Vec<TimerHandle>,
    next_timer: u64,
}

impl ScriptedTransport {
    /// The next timer due at or before `deadline`, earliest first.
    pub fn next_due(&self, deadline: Duration) -> Option<(TimerHandle, Duration)> {
        self.timers
            .iter()
            .filter(|(_, due)| **due <= deadline)
            .min_by_key(|(handle, due)| (**due, **handle))
            .map(|(handle, due)| (*handle, *due))
    }
}

impl Scheduler for ScriptedTransport {
    fn schedule_after(&mut self, delay: Duration) -> TimerHandle {
        self.next_timer += 1;
        let handle = TimerHandle(self.next_timer);
        self.timers.insert(handle, self.now + delay);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.timers.remove(&handle).is_some() {
            self.cancelled.push(handle);
        }
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, config: &TransportConfig) {
        self.connects.push(config.clone());
    }

    fn write(&mut self, line: &str) {
        self.written.push(line.to_owned());
    }

    fn end(&mut self, final_line: Option<&str>, immediate: bool) {
        self.ends.push((final_line.map(str::to_owned), immediate));
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn registered_successfully(&mut self) {
        self.registered_calls += 1;
    }
}
