//! Interception pipeline.
//!
//! Two ordered chains of middleware sit in front of the dispatcher and the
//! public event surface. A raw handler sees every inbound line before it is
//! decoded into events; a parsed handler sees every decoded event (and may
//! rewrite it) before state sync, correlation and subscribers. Returning
//! [`PipelineAbort`] stops the chain and drops the line or event.

use slirc_wire::Message;

use crate::error::PipelineAbort;
use crate::event::Event;
use crate::session::SessionState;

/// An inbound line as seen by raw middleware.
#[derive(Debug, Clone, Copy)]
pub struct RawLine<'a> {
    /// Command token, uppercased.
    pub command: &'a str,
    pub message: &'a Message,
    /// The line as received, without CRLF.
    pub raw: &'a str,
}

/// Raw-stage handler.
pub type RawMiddleware = dyn FnMut(&RawLine<'_>, &SessionState) -> Result<(), PipelineAbort>;

/// Parsed-stage handler.
pub type ParsedMiddleware = dyn FnMut(&mut Event, &SessionState) -> Result<(), PipelineAbort>;

/// Ordered handler list.
pub struct Chain<H: ?Sized> {
    handlers: Vec<Box<H>>,
}

impl<H: ?Sized> Chain<H> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Remove every handler.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<H: ?Sized> Default for Chain<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> std::fmt::Debug for Chain<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Chain<RawMiddleware> {
    /// Append a handler.
    pub fn push<F>(&mut self, handler: F)
    where
        F: FnMut(&RawLine<'_>, &SessionState) -> Result<(), PipelineAbort> + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Run every handler in order, stopping at the first abort.
    pub fn run(&mut self, line: &RawLine<'_>, state: &SessionState) -> Result<(), PipelineAbort> {
        self.handlers
            .iter_mut()
            .try_for_each(|handler| handler(line, state))
    }
}

impl Chain<ParsedMiddleware> {
    /// Append a handler.
    pub fn push<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Event, &SessionState) -> Result<(), PipelineAbort> + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Run every handler in order, stopping at the first abort.
    pub fn run(&mut self, event: &mut Event, state: &SessionState) -> Result<(), PipelineAbort> {
        self.handlers
            .iter_mut()
            .try_for_each(|handler| handler(event, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn raw_line(message: &Message) -> RawLine<'_> {
        RawLine {
            command: &message.command,
            message,
            raw: "PING :x",
        }
    }

    #[test]
    fn raw_handlers_run_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut chain: Chain<RawMiddleware> = Chain::new();
        for id in 0..3 {
            let seen = Rc::clone(&seen);
            chain.push(move |_line, _state| {
                seen.borrow_mut().push(id);
                Ok(())
            });
        }

        let message = Message::new("PING", ["x"]);
        let state = SessionState::default();
        assert!(chain.run(&raw_line(&message), &state).is_ok());
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn abort_skips_remaining_handlers() {
        let reached = Rc::new(RefCell::new(false));
        let mut chain: Chain<RawMiddleware> = Chain::new();
        chain.push(|line, _| {
            if line.command == "PING" {
                Err(PipelineAbort::new("no pings"))
            } else {
                Ok(())
            }
        });
        let flag = Rc::clone(&reached);
        chain.push(move |_, _| {
            *flag.borrow_mut() = true;
            Ok(())
        });

        let message = Message::new("PING", ["x"]);
        let err = chain
            .run(&raw_line(&message), &SessionState::default())
            .unwrap_err();
        assert_eq!(err.reason(), "no pings");
        assert!(!*reached.borrow());
    }

    #[test]
    fn parsed_handlers_can_rewrite_events() {
        let mut chain: Chain<ParsedMiddleware> = Chain::new();
        chain.push(|event, _| {
            if let Event::Pong { message } = event {
                message.make_ascii_uppercase();
            }
            Ok(())
        });

        let mut event = Event::Pong {
            message: "abc".into(),
        };
        chain.run(&mut event, &SessionState::default()).unwrap();
        assert_eq!(
            event,
            Event::Pong {
                message: "ABC".into()
            }
        );

        chain.clear();
        assert!(chain.is_empty());
    }
}
