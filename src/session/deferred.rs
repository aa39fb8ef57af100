//! Work that runs on the next turn of the event loop.
//!
//! Pushing a task asks the scheduler for a zero-delay wake timer (once per
//! batch). When that timer fires the owner drains exactly the tasks that
//! were queued at that moment; anything queued while they run waits for the
//! following wake. Completion callbacks therefore never recurse into the
//! code that triggered them.

use std::collections::VecDeque;
use std::time::Duration;

use crate::correlation::who::WhoRequest;
use crate::transport::{Scheduler, TimerHandle};

#[derive(Debug)]
pub(crate) enum Deferred {
    /// Start the next WHO if nothing is in flight.
    AdvanceWho,
    /// Answer a WHO for an invalid target with an empty list.
    ResolveWho(WhoRequest),
}

#[derive(Debug, Default)]
pub(crate) struct DeferredQueue {
    tasks: VecDeque<Deferred>,
    wake: Option<TimerHandle>,
}

impl DeferredQueue {
    pub(crate) fn push(&mut self, task: Deferred, scheduler: &mut dyn Scheduler) {
        self.tasks.push_back(task);
        if self.wake.is_none() {
            self.wake = Some(scheduler.schedule_after(Duration::ZERO));
        }
    }

    /// If `handle` is our wake timer, hand out the current batch.
    pub(crate) fn take_due(&mut self, handle: TimerHandle) -> Option<Vec<Deferred>> {
        if self.wake != Some(handle) {
            return None;
        }
        self.wake = None;
        Some(self.tasks.drain(..).collect())
    }

    /// Drop every task. The wake timer, if any, stays and finds nothing.
    pub(crate) fn clear(&mut self) {
        self.tasks.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        scheduled: u64,
    }

    impl Scheduler for Counter {
        fn schedule_after(&mut self, delay: Duration) -> TimerHandle {
            assert_eq!(delay, Duration::ZERO);
            self.scheduled += 1;
            TimerHandle(self.scheduled)
        }

        fn cancel(&mut self, _handle: TimerHandle) {}
    }

    #[test]
    fn one_wake_per_batch() {
        let mut scheduler = Counter::default();
        let mut queue = DeferredQueue::default();
        queue.push(Deferred::AdvanceWho, &mut scheduler);
        queue.push(Deferred::AdvanceWho, &mut scheduler);
        assert_eq!(scheduler.scheduled, 1);

        assert!(queue.take_due(TimerHandle(99)).is_none());
        let batch = queue.take_due(TimerHandle(1)).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 0);

        // Pushed while the batch runs: needs a new wake.
        queue.push(Deferred::AdvanceWho, &mut scheduler);
        assert_eq!(scheduler.scheduled, 2);
        assert!(queue.take_due(TimerHandle(1)).is_none());
        assert_eq!(queue.take_due(TimerHandle(2)).unwrap().len(), 1);
    }
}
