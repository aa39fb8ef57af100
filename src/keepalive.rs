//! Liveness probing.
//!
//! Two independent timers: the probe timer fires every `ping_interval` and
//! reschedules itself, the timeout timer is pushed back by every inbound
//! line. If the timeout ever fires the connection is considered dead. A
//! non-positive interval or timeout turns the whole machine off.

use std::time::Duration;

use tracing::trace;

use crate::transport::{Scheduler, TimerHandle};

/// What the owner has to do after a timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveAction {
    /// Send a liveness probe.
    Probe,
    /// Nothing arrived for `seconds`; tear the connection down.
    TimedOut { seconds: i64 },
}

#[derive(Debug)]
pub struct Keepalive {
    interval: i64,
    timeout: i64,
    probe: Option<TimerHandle>,
    deadline: Option<TimerHandle>,
}

impl Keepalive {
    /// Intervals in seconds.
    pub fn new(interval: i64, timeout: i64) -> Self {
        Self {
            interval,
            timeout,
            probe: None,
            deadline: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.interval > 0 && self.timeout > 0
    }

    pub fn is_armed(&self) -> bool {
        self.probe.is_some() || self.deadline.is_some()
    }

    /// Start both timers. Any previous timers are cancelled first.
    pub fn arm(&mut self, scheduler: &mut dyn Scheduler) {
        self.disarm(scheduler);
        if !self.enabled() {
            return;
        }
        self.probe = Some(scheduler.schedule_after(secs(self.interval)));
        self.deadline = Some(scheduler.schedule_after(secs(self.timeout)));
        trace!(interval = self.interval, timeout = self.timeout, "keepalive armed");
    }

    /// Inbound traffic: push the timeout back. The probe timer is untouched.
    pub fn traffic(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(old) = self.deadline.take() {
            scheduler.cancel(old);
            self.deadline = Some(scheduler.schedule_after(secs(self.timeout)));
        }
    }

    /// Offer a fired timer. Returns `None` if it is not one of ours.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        scheduler: &mut dyn Scheduler,
    ) -> Option<KeepaliveAction> {
        if self.probe == Some(handle) {
            self.probe = Some(scheduler.schedule_after(secs(self.interval)));
            return Some(KeepaliveAction::Probe);
        }
        if self.deadline == Some(handle) {
            self.deadline = None;
            self.disarm(scheduler);
            return Some(KeepaliveAction::TimedOut {
                seconds: self.timeout,
            });
        }
        None
    }

    /// Cancel both timers and go idle.
    pub fn disarm(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(probe) = self.probe.take() {
            scheduler.cancel(probe);
        }
        if let Some(deadline) = self.deadline.take() {
            scheduler.cancel(deadline);
        }
    }
}

fn secs(value: i64) -> Duration {
    Duration::from_secs(value.max(0).unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Virtual clock: timers are `(due, handle)`.
    #[derive(Default)]
    struct Clock {
        now: Duration,
        next: u64,
        timers: BTreeMap<TimerHandle, Duration>,
    }

    impl Scheduler for Clock {
        fn schedule_after(&mut self, delay: Duration) -> TimerHandle {
            self.next += 1;
            let handle = TimerHandle(self.next);
            self.timers.insert(handle, self.now + delay);
            handle
        }

        fn cancel(&mut self, handle: TimerHandle) {
            self.timers.remove(&handle);
        }
    }

    impl Clock {
        /// Advance to `until`, firing due timers in order.
        fn advance(&mut self, keepalive: &mut Keepalive, until: Duration) -> Vec<KeepaliveAction> {
            let mut actions = Vec::new();
            loop {
                let due = self
                    .timers
                    .iter()
                    .filter(|(_, at)| **at <= until)
                    .min_by_key(|(handle, at)| (**at, **handle))
                    .map(|(handle, at)| (*handle, *at));
                let Some((handle, at)) = due else { break };
                self.timers.remove(&handle);
                self.now = at;
                actions.extend(keepalive.on_timer(handle, self));
            }
            self.now = until;
            actions
        }
    }

    #[test]
    fn probes_every_interval() {
        let mut clock = Clock::default();
        let mut keepalive = Keepalive::new(30, 120);
        keepalive.arm(&mut clock);

        let actions = clock.advance(&mut keepalive, Duration::from_secs(95));
        assert_eq!(actions, vec![KeepaliveAction::Probe; 3]);
    }

    #[test]
    fn traffic_inside_window_never_times_out() {
        let mut clock = Clock::default();
        let mut keepalive = Keepalive::new(30, 120);
        keepalive.arm(&mut clock);

        for step in 1..=20u64 {
            let actions = clock.advance(&mut keepalive, Duration::from_secs(step * 100));
            assert!(!actions.iter().any(|a| matches!(a, KeepaliveAction::TimedOut { .. })));
            keepalive.traffic(&mut clock);
        }
        assert!(keepalive.is_armed());
    }

    #[test]
    fn silence_times_out_once() {
        let mut clock = Clock::default();
        let mut keepalive = Keepalive::new(30, 120);
        keepalive.arm(&mut clock);

        let actions = clock.advance(&mut keepalive, Duration::from_secs(1000));
        let timeouts: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, KeepaliveAction::TimedOut { .. }))
            .collect();
        assert_eq!(timeouts, vec![&KeepaliveAction::TimedOut { seconds: 120 }]);
        assert!(!keepalive.is_armed());
        assert!(clock.timers.is_empty());
    }

    #[test]
    fn non_positive_values_disable() {
        for (interval, timeout) in [(0, 120), (30, 0), (-5, 120), (30, -1)] {
            let mut clock = Clock::default();
            let mut keepalive = Keepalive::new(interval, timeout);
            keepalive.arm(&mut clock);
            assert!(!keepalive.is_armed());
            assert!(clock.timers.is_empty());
            keepalive.traffic(&mut clock);
            assert!(clock.timers.is_empty());
        }
    }

    #[test]
    fn foreign_timers_are_ignored() {
        let mut clock = Clock::default();
        let mut keepalive = Keepalive::new(30, 120);
        keepalive.arm(&mut clock);
        assert_eq!(keepalive.on_timer(TimerHandle(999), &mut clock), None);
    }

    #[test]
    fn rearm_replaces_timers() {
        let mut clock = Clock::default();
        let mut keepalive = Keepalive::new(30, 120);
        keepalive.arm(&mut clock);
        keepalive.arm(&mut clock);
        assert_eq!(clock.timers.len(), 2);
    }
}
