//! Outbound commands.
//!
//! Thin constructors over [`raw_line`] and [`Session::send_chunked`]. Text
//! that may exceed the message budget always goes through the chunker.

use slirc_wire::{Tag, ctcp};

use super::Session;
use crate::dispatch::Dispatcher;
use crate::event::MessageEvent;
use crate::outbound::{ACTION_OVERHEAD, Param, chunk_text, raw_line, with_tags};
use crate::params;
use crate::transport::Transport;

impl<T: Transport, D: Dispatcher> Session<T, D> {
    // ========================================================================
    // Raw output
    // ========================================================================

    /// Format and send one line.
    ///
    /// ```ignore
    /// session.raw(params!["MODE", "#chan", "+l", 25]);
    /// ```
    pub fn raw<I>(&mut self, params: I)
    where
        I: IntoIterator,
        I::Item: Into<Param>,
    {
        let line = raw_line(params);
        self.write_line(line);
    }

    /// Send a preformatted line as is.
    pub fn raw_string(&mut self, line: &str) {
        self.write_line(line.to_owned());
    }

    /// Split `text` and send one `command target :chunk` line per piece.
    /// Returns the pieces sent.
    pub fn send_chunked(&mut self, command: &str, target: &str, text: &str) -> Vec<String> {
        let pieces = owned_chunks(text, self.options.message_max_length);
        for piece in &pieces {
            self.raw([command, target, piece.as_str()]);
        }
        pieces
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn say(&mut self, target: &str, text: &str) -> Vec<String> {
        self.send_chunked("PRIVMSG", target, text)
    }

    pub fn notice(&mut self, target: &str, text: &str) -> Vec<String> {
        self.send_chunked("NOTICE", target, text)
    }

    /// `PRIVMSG` with message tags on every chunk.
    pub fn say_tagged(&mut self, target: &str, text: &str, tags: &[Tag]) -> Vec<String> {
        let pieces = owned_chunks(text, self.options.message_max_length);
        for piece in &pieces {
            let line = with_tags(tags, raw_line(["PRIVMSG", target, piece.as_str()]));
            self.write_line(line);
        }
        pieces
    }

    /// A tag-only message, such as a typing notification.
    pub fn tagmsg(&mut self, target: &str, tags: &[Tag]) {
        let line = with_tags(tags, raw_line(["TAGMSG", target]));
        self.write_line(line);
    }

    /// `/me`. The budget leaves room for the CTCP wrapper.
    pub fn action(&mut self, target: &str, text: &str) -> Vec<String> {
        let budget = self
            .options
            .message_max_length
            .saturating_sub(ACTION_OVERHEAD);
        let pieces = owned_chunks(text, budget);
        for piece in &pieces {
            self.ctcp_request(target, "ACTION", Some(piece.as_str()));
        }
        pieces
    }

    pub fn ctcp_request(&mut self, target: &str, verb: &str, params: Option<&str>) {
        let payload = ctcp::frame(verb, params);
        self.raw(["PRIVMSG", target, payload.as_str()]);
    }

    pub fn ctcp_response(&mut self, target: &str, verb: &str, params: Option<&str>) {
        let payload = ctcp::frame(verb, params);
        self.raw(["NOTICE", target, payload.as_str()]);
    }

    /// Answer a message where it came from.
    pub fn reply(&mut self, to: &MessageEvent, text: &str) -> Vec<String> {
        let target = to.reply_to.clone();
        self.say(&target, text)
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn ping(&mut self, message: Option<&str>) {
        let token = match message {
            Some(message) => message.to_owned(),
            None => chrono::Utc::now().timestamp_millis().to_string(),
        };
        self.raw(["PING", token.as_str()]);
    }

    /// Request a new nick. Local state follows once the server confirms.
    pub fn change_nick(&mut self, nick: &str) {
        self.raw(["NICK", nick]);
    }

    pub fn away(&mut self, message: &str) {
        let message = if message.trim().is_empty() { "away" } else { message };
        self.raw(["AWAY", message]);
    }

    pub fn back(&mut self) {
        self.raw(["AWAY"]);
    }

    // ========================================================================
    // Channels
    // ========================================================================

    pub fn join(&mut self, channel: &str, key: Option<&str>) {
        self.raw(params!["JOIN", channel, key]);
    }

    pub fn part(&mut self, channel: &str, message: Option<&str>) {
        self.raw(params!["PART", channel, message]);
    }

    /// `MODE target modes [args...]`.
    pub fn mode(&mut self, target: &str, modes: &str, args: &[&str]) {
        let mut params = params!["MODE", target, modes];
        params.extend(args.iter().map(|a| Param::from(*a)));
        self.raw(params);
    }

    pub fn ban(&mut self, channel: &str, mask: &str) {
        self.mode(channel, "+b", &[mask]);
    }

    pub fn unban(&mut self, channel: &str, mask: &str) {
        self.mode(channel, "-b", &[mask]);
    }

    pub fn invite(&mut self, channel: &str, nick: &str) {
        self.raw(["INVITE", nick, channel]);
    }

    /// Add an invite exception, using the network's invex mode letter.
    pub fn add_invite(&mut self, channel: &str, mask: &str) {
        let modes = format!("+{}", self.state.network.invex_mode());
        self.mode(channel, &modes, &[mask]);
    }

    pub fn remove_invite(&mut self, channel: &str, mask: &str) {
        let modes = format!("-{}", self.state.network.invex_mode());
        self.mode(channel, &modes, &[mask]);
    }

    /// Set the topic. A blank topic clears it.
    pub fn set_topic(&mut self, channel: &str, topic: &str) {
        if topic.trim().is_empty() {
            self.clear_topic(channel);
        } else {
            self.raw(["TOPIC", channel, topic]);
        }
    }

    pub fn clear_topic(&mut self, channel: &str) {
        self.write_line(format!("TOPIC {channel} :"));
    }

    pub fn list(&mut self, args: &[&str]) {
        let mut params = params!["LIST"];
        params.extend(args.iter().map(|a| Param::from(*a)));
        self.raw(params);
    }

    // ========================================================================
    // MONITOR
    // ========================================================================

    pub fn add_monitor(&mut self, targets: &[&str]) {
        if !targets.is_empty() {
            self.raw(["MONITOR", "+", targets.join(",").as_str()]);
        }
    }

    pub fn remove_monitor(&mut self, targets: &[&str]) {
        if !targets.is_empty() {
            self.raw(["MONITOR", "-", targets.join(",").as_str()]);
        }
    }

    pub fn clear_monitor(&mut self) {
        self.raw(["MONITOR", "C"]);
    }

    pub fn query_monitor(&mut self) {
        self.raw(["MONITOR", "S"]);
    }
}

fn owned_chunks(text: &str, budget: usize) -> Vec<String> {
    chunk_text(text, budget)
        .into_iter()
        .map(str::to_owned)
        .collect()
}
