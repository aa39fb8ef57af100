//! Connection registration: CAP, welcome, ISUPPORT, PING/PONG, MOTD.

use std::collections::BTreeSet;

use slirc_wire::Message;
use tracing::debug;

use super::{DispatchCache, DispatchContext, IrcDispatcher, param};
use crate::event::{CapEvent, Event, Motd};
use crate::outbound::raw_line;

pub(super) fn cap(dispatcher: &mut IrcDispatcher, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let subcommand = param(message, 1).to_ascii_uppercase();
    // `CAP * LS * :caps` continues, `CAP * LS :caps` ends.
    let more = message.params.len() > 3 && message.param(2) == Some("*");
    let capabilities: Vec<String> = message
        .trailing()
        .filter(|_| message.params.len() > 2)
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_owned)
        .collect();

    match subcommand.as_str() {
        "LS" => {
            dispatcher.cache.cap_ls.extend(capabilities);
            if more {
                return true;
            }
            let advertised = std::mem::take(&mut dispatcher.cache.cap_ls);
            for token in &advertised {
                let (name, value) = split_cap(token);
                ctx.network.cap.available.insert(name.to_owned(), value.map(str::to_owned));
            }
            if !ctx.registered {
                ctx.network.cap.negotiating = true;
            }
            request(dispatcher, ctx, advertised.iter().map(|t| split_cap(t).0));
            ctx.emit(Event::Cap(CapEvent {
                subcommand,
                capabilities: advertised,
            }));
        }
        "ACK" => {
            for cap in &capabilities {
                match cap.strip_prefix('-') {
                    Some(disabled) => {
                        ctx.network.cap.enabled.remove(disabled);
                        ctx.network.cap.requested.remove(disabled);
                    }
                    None => {
                        ctx.network.cap.requested.remove(cap);
                        ctx.network.cap.enabled.insert(cap.clone());
                    }
                }
            }
            maybe_end(ctx);
            ctx.emit(Event::Cap(CapEvent { subcommand, capabilities }));
        }
        "NAK" => {
            for cap in &capabilities {
                ctx.network.cap.requested.remove(cap);
            }
            maybe_end(ctx);
            ctx.emit(Event::Cap(CapEvent { subcommand, capabilities }));
        }
        "NEW" => {
            for token in &capabilities {
                let (name, value) = split_cap(token);
                ctx.network.cap.available.insert(name.to_owned(), value.map(str::to_owned));
            }
            request(dispatcher, ctx, capabilities.iter().map(|t| split_cap(t).0));
            ctx.emit(Event::Cap(CapEvent { subcommand, capabilities }));
        }
        "DEL" => {
            for cap in &capabilities {
                ctx.network.cap.available.remove(cap);
                ctx.network.cap.enabled.remove(cap);
            }
            ctx.emit(Event::Cap(CapEvent { subcommand, capabilities }));
        }
        _ => ctx.emit(Event::Cap(CapEvent { subcommand, capabilities })),
    }
    true
}

/// `CAP REQ` whatever is both offered and wanted, or end negotiation.
fn request<'c>(
    dispatcher: &IrcDispatcher,
    ctx: &mut DispatchContext<'_>,
    offered: impl Iterator<Item = &'c str>,
) {
    let wanted: BTreeSet<String> = offered
        .filter(|cap| dispatcher.wanted_caps.contains(*cap))
        .filter(|cap| !ctx.network.cap.enabled.contains(*cap))
        .map(str::to_owned)
        .collect();

    if wanted.is_empty() {
        maybe_end(ctx);
        return;
    }

    let list = wanted.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
    debug!(caps = %list, "requesting capabilities");
    ctx.send(raw_line(["CAP", "REQ", list.as_str()]));
    ctx.network.cap.requested.extend(wanted);
}

fn maybe_end(ctx: &mut DispatchContext<'_>) {
    if ctx.network.cap.negotiating && ctx.network.cap.requested.is_empty() {
        ctx.network.cap.negotiating = false;
        ctx.send("CAP END");
    }
}

fn split_cap(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (token, None),
    }
}

pub(super) fn welcome(dispatcher: &mut IrcDispatcher, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    ctx.network.cap.negotiating = false;
    dispatcher.cache.cap_ls.clear();
    ctx.emit(Event::Registered {
        nick: param(message, 0),
    });
    true
}

pub(super) fn isupport(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    // First param is our nick, last is the human-readable trailer.
    let end = message.params.len().saturating_sub(1);
    let options: Vec<String> = message.params.get(1..end).unwrap_or_default().to_vec();
    for token in &options {
        ctx.network.apply_isupport(token);
    }
    ctx.emit(Event::ServerOptions { options });
    true
}

pub(super) fn ping(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let payload = message.trailing().unwrap_or_default().to_owned();
    ctx.send(raw_line(["PONG", payload.as_str()]));
    ctx.emit(Event::Ping { message: payload });
    true
}

pub(super) fn pong(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    ctx.emit(Event::Pong {
        message: message.trailing().unwrap_or_default().to_owned(),
    });
    true
}

pub(super) fn error(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    ctx.emit(Event::ServerError {
        message: message.trailing().unwrap_or_default().to_owned(),
    });
    true
}

pub(super) fn motd(cache: &mut DispatchCache, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    match message.command.as_str() {
        "375" => cache.motd.clear(),
        "372" => {
            cache.motd.push_str(message.trailing().unwrap_or_default());
            cache.motd.push('\n');
        }
        "376" => ctx.emit(Event::Motd(Motd {
            motd: std::mem::take(&mut cache.motd),
            error: None,
        })),
        _ => ctx.emit(Event::Motd(Motd {
            motd: String::new(),
            error: Some(message.trailing().unwrap_or_default().to_owned()),
        })),
    }
    true
}

/// Nick rejected before registration finished: retry with `_` appended.
pub(super) fn alternate_nick(message: &Message, ctx: &mut DispatchContext<'_>) {
    let taken = message.param(1).unwrap_or(ctx.nick);
    let next = format!("{taken}_");
    debug!(taken = %taken, next = %next, "nick in use, trying alternate");
    ctx.send(raw_line(["NICK", next.as_str()]));
}
