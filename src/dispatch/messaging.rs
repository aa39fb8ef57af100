//! PRIVMSG, NOTICE, CTCP and TAGMSG.

use chrono::{DateTime, Utc};
use slirc_wire::{Ctcp, Message, Prefix};

use super::{DispatchContext, param, source};
use crate::event::{CtcpEvent, Event, MessageEvent, MessageKind, Tagmsg};

pub(super) fn message(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    let target = param(message, 0);
    let text = param(message, 1);
    let time = server_time(message);
    let is_notice = message.command == "NOTICE";

    if let Some(ctcp) = Ctcp::parse(&text) {
        if !ctcp.is_action() {
            let payload = text.trim_matches(slirc_wire::ctcp::DELIM).to_owned();
            let event = CtcpEvent {
                nick,
                ident,
                hostname,
                target,
                ctcp_type: ctcp.verb_upper(),
                message: payload,
                time,
            };
            ctx.emit(if is_notice {
                Event::CtcpResponse(event)
            } else {
                Event::CtcpRequest(event)
            });
            return true;
        }

        let body = ctcp.params.unwrap_or_default().to_owned();
        let event = build(ctx, message, MessageKind::Action, (nick, ident, hostname), target, body, time);
        ctx.emit(Event::Action(event));
        return true;
    }

    let kind = if is_notice { MessageKind::Notice } else { MessageKind::Privmsg };
    let event = build(ctx, message, kind, (nick, ident, hostname), target, text, time);
    ctx.emit(match kind {
        MessageKind::Notice => Event::Notice(event),
        _ => Event::Privmsg(event),
    });
    true
}

fn build(
    ctx: &DispatchContext<'_>,
    message: &Message,
    kind: MessageKind,
    (nick, ident, hostname): (String, String, String),
    target: String,
    text: String,
    time: Option<DateTime<Utc>>,
) -> MessageEvent {
    let from_server = !matches!(message.prefix, Some(Prefix::Nickname(..)));
    let reply_to = reply_target(ctx, &nick, &target);
    MessageEvent {
        kind,
        nick,
        ident,
        hostname,
        target,
        message: text,
        tags: message.tags.clone(),
        time,
        reply_to,
        from_server,
    }
}

/// The channel for channel messages, otherwise the other party.
fn reply_target(ctx: &DispatchContext<'_>, nick: &str, target: &str) -> String {
    let bare = target.trim_start_matches(|c| status_prefix(ctx, c));
    if ctx.network.is_channel(bare) || ctx.is_me(nick) {
        target.to_owned()
    } else {
        nick.to_owned()
    }
}

/// `STATUSMSG` symbols such as the `@` in `@#chan`.
fn status_prefix(ctx: &DispatchContext<'_>, c: char) -> bool {
    match ctx.network.supports("STATUSMSG") {
        Some(Some(symbols)) => symbols.contains(c),
        _ => false,
    }
}

pub(super) fn tagmsg(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    ctx.emit(Event::Tagmsg(Tagmsg {
        nick,
        ident,
        hostname,
        target: param(message, 0),
        tags: message.tags.clone(),
    }));
    true
}

/// The `server-time` tag, if present and well formed.
fn server_time(message: &Message) -> Option<DateTime<Utc>> {
    message
        .tag("time")
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
}
