//! Membership, identity and mode changes.

use chrono::{DateTime, Utc};
use slirc_wire::{Message, Prefix};

use super::{DispatchCache, DispatchContext, param, source};
use crate::event::{
    ChannelUser, Chghost, Event, Invite, Join, Kick, ModeChange, ModeEvent, NickChange, Part,
    Quit, Topic, TopicSetBy, UserList,
};
use crate::network::NetworkInfo;

pub(super) fn nick(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    ctx.emit(Event::Nick(NickChange {
        nick,
        ident,
        hostname,
        new_nick: param(message, 0),
    }));
    true
}

pub(super) fn mode(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let target = param(message, 0);
    let (nick, _, _) = source(message);
    let args = message.params.get(1..).unwrap_or_default();
    let modes = parse_modes(ctx.network, &target, args);
    ctx.emit(Event::Mode(ModeEvent { target, nick, modes }));
    true
}

/// `221 RPL_UMODEIS`: our own modes, reported as a mode change.
pub(super) fn user_mode_is(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let target = param(message, 0);
    let (nick, _, _) = source(message);
    let modes = parse_modes(ctx.network, &target, message.params.get(1..).unwrap_or_default());
    ctx.emit(Event::Mode(ModeEvent { target, nick, modes }));
    true
}

/// Split `+ov-k nick nick key` into single changes, pairing parameters with
/// the modes that take one on this network.
pub(crate) fn parse_modes(network: &NetworkInfo, target: &str, args: &[String]) -> Vec<ModeChange> {
    let Some((mode_str, mut params)) = args.split_first().map(|(m, rest)| (m, rest.iter())) else {
        return Vec::new();
    };
    let is_channel = network.is_channel(target);

    let mut adding = true;
    let mut changes = Vec::new();
    for c in mode_str.chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            letter => {
                let param = if is_channel && network.mode_takes_param(letter, adding) {
                    params.next().cloned()
                } else {
                    None
                };
                let sign = if adding { '+' } else { '-' };
                changes.push(ModeChange {
                    mode: format!("{sign}{letter}"),
                    param,
                });
            }
        }
    }
    changes
}

pub(super) fn join(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    // extended-join: JOIN #chan account :realname
    let account = message
        .param(1)
        .filter(|a| *a != "*" && !a.is_empty())
        .map(str::to_owned);
    let gecos = message.param(2).map(str::to_owned);
    ctx.emit(Event::Join(Join {
        channel: param(message, 0),
        nick,
        ident,
        hostname,
        account,
        gecos,
    }));
    true
}

pub(super) fn part(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    ctx.emit(Event::Part(Part {
        channel: param(message, 0),
        nick,
        ident,
        hostname,
        message: param(message, 1),
    }));
    true
}

pub(super) fn kick(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    ctx.emit(Event::Kick(Kick {
        channel: param(message, 0),
        kicked: param(message, 1),
        nick,
        ident,
        hostname,
        message: param(message, 2),
    }));
    true
}

pub(super) fn quit(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    ctx.emit(Event::Quit(Quit {
        nick,
        ident,
        hostname,
        message: param(message, 0),
    }));
    true
}

pub(super) fn topic(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let topic = match message.command.as_str() {
        "TOPIC" => Topic {
            channel: param(message, 0),
            topic: param(message, 1),
            nick: message.prefix.as_ref().map(|p| p.name().to_owned()),
        },
        "331" => Topic {
            channel: param(message, 1),
            topic: String::new(),
            nick: None,
        },
        _ => Topic {
            channel: param(message, 1),
            topic: param(message, 2),
            nick: None,
        },
    };
    ctx.emit(Event::Topic(topic));
    true
}

pub(super) fn topic_set_by(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let setter = message.param(2).map(Prefix::parse);
    ctx.emit(Event::TopicSetBy(TopicSetBy {
        channel: param(message, 1),
        nick: setter.map(|p| p.name().to_owned()).unwrap_or_default(),
        when: message.param(3).and_then(parse_timestamp),
    }));
    true
}

pub(super) fn invite(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    ctx.emit(Event::Invite(Invite {
        invited: param(message, 0),
        channel: param(message, 1),
        nick,
        ident,
        hostname,
    }));
    true
}

/// `353 RPL_NAMREPLY` accumulates, `366 RPL_ENDOFNAMES` emits.
pub(super) fn names(cache: &mut DispatchCache, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    if message.command == "353" {
        // me = #chan :names
        let channel = param(message, 2);
        let key = ctx.key(&channel);
        let users = cache.names.entry(key).or_default();
        for entry in message.trailing().unwrap_or_default().split_whitespace() {
            let (modes, mask) = ctx.network.split_prefixes(entry);
            let (nick, ident, hostname) = match Prefix::parse(mask) {
                Prefix::Nickname(nick, user, host) => (nick, user, host),
                Prefix::ServerName(name) => (name, String::new(), String::new()),
            };
            users.push(ChannelUser {
                nick,
                ident,
                hostname,
                modes,
            });
        }
        return true;
    }

    let channel = param(message, 1);
    let users = cache.names.remove(&ctx.key(&channel)).unwrap_or_default();
    ctx.emit(Event::UserList(UserList { channel, users }));
    true
}

pub(super) fn away(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let event = match message.command.as_str() {
        "305" => Event::Back {
            nick: ctx.nick.to_owned(),
        },
        "306" => Event::Away {
            nick: ctx.nick.to_owned(),
            message: String::new(),
        },
        _ => {
            let (nick, _, _) = source(message);
            match message.param(0).filter(|m| !m.is_empty()) {
                Some(text) => Event::Away {
                    nick,
                    message: text.to_owned(),
                },
                None => Event::Back { nick },
            }
        }
    };
    ctx.emit(event);
    true
}

pub(super) fn chghost(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, ident, hostname) = source(message);
    ctx.emit(Event::Chghost(Chghost {
        nick,
        ident,
        hostname,
        new_ident: param(message, 0),
        new_hostname: param(message, 1),
    }));
    true
}

pub(super) fn account(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let (nick, _, _) = source(message);
    let account = message
        .param(0)
        .filter(|a| *a != "*")
        .map(str::to_owned);
    ctx.emit(Event::Account { nick, account });
    true
}

/// `396 RPL_HOSTHIDDEN`.
pub(super) fn hidden_host(message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    ctx.emit(Event::DisplayedHost {
        nick: param(message, 0),
        hostname: param(message, 1),
    });
    true
}

/// Unix seconds to a UTC timestamp.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::events;
    use super::*;

    #[test]
    fn nick_change() {
        assert_eq!(
            events(&[":old!u@h NICK :new"]),
            vec![Event::Nick(NickChange {
                nick: "old".into(),
                ident: "u".into(),
                hostname: "h".into(),
                new_nick: "new".into(),
            })]
        );
    }

    #[test]
    fn channel_modes_pair_parameters() {
        let events = events(&[":op!u@h MODE #c +ov-k alice bob key"]);
        let Event::Mode(mode) = &events[0] else {
            panic!("expected mode event");
        };
        assert_eq!(mode.target, "#c");
        assert_eq!(mode.nick, "op");
        let flat: Vec<_> = mode
            .modes
            .iter()
            .map(|m| (m.mode.as_str(), m.param.as_deref()))
            .collect();
        assert_eq!(
            flat,
            vec![("+o", Some("alice")), ("+v", Some("bob")), ("-k", Some("key"))]
        );
    }

    #[test]
    fn limit_takes_param_only_when_set() {
        let events = events(&[":op!u@h MODE #c +l-l 10"]);
        let Event::Mode(mode) = &events[0] else {
            panic!("expected mode event");
        };
        assert_eq!(mode.modes[0].param.as_deref(), Some("10"));
        assert_eq!(mode.modes[1].param, None);
    }

    #[test]
    fn user_modes_never_take_params() {
        let events = events(&[":me MODE me :+iw-x"]);
        let Event::Mode(mode) = &events[0] else {
            panic!("expected mode event");
        };
        let letters: Vec<_> = mode.modes.iter().map(|m| m.mode.as_str()).collect();
        assert_eq!(letters, vec!["+i", "+w", "-x"]);
        assert!(mode.modes.iter().all(|m| m.param.is_none()));
    }

    #[test]
    fn extended_join() {
        let events = events(&[":a!u@h JOIN #c acct :Real Name", ":b!u@h JOIN #c * :Other"]);
        let Event::Join(first) = &events[0] else { panic!() };
        assert_eq!(first.account.as_deref(), Some("acct"));
        assert_eq!(first.gecos.as_deref(), Some("Real Name"));
        let Event::Join(second) = &events[1] else { panic!() };
        assert_eq!(second.account, None);
    }

    #[test]
    fn names_accumulate_until_end() {
        let events = events(&[
            ":srv 353 me = #c :@alice +bob!b@host",
            ":srv 353 me = #c :carol",
            ":srv 366 me #c :End of /NAMES list.",
        ]);
        assert_eq!(events.len(), 1);
        let Event::UserList(list) = &events[0] else { panic!() };
        assert_eq!(list.channel, "#c");
        assert_eq!(list.users.len(), 3);
        assert_eq!(list.users[0].modes, vec!['@']);
        assert_eq!(list.users[1].nick, "bob");
        assert_eq!(list.users[1].hostname, "host");
    }

    #[test]
    fn topic_variants() {
        let events = events(&[
            ":srv 332 me #c :the topic",
            ":srv 333 me #c setter!u@h 1700000000",
            ":bob!u@h TOPIC #c :new topic",
        ]);
        assert_eq!(
            events[0],
            Event::Topic(Topic {
                channel: "#c".into(),
                topic: "the topic".into(),
                nick: None,
            })
        );
        let Event::TopicSetBy(set_by) = &events[1] else { panic!() };
        assert_eq!(set_by.nick, "setter");
        assert_eq!(set_by.when.map(|t| t.timestamp()), Some(1_700_000_000));
        let Event::Topic(changed) = &events[2] else { panic!() };
        assert_eq!(changed.nick.as_deref(), Some("bob"));
    }

    #[test]
    fn away_and_back() {
        let events = events(&[":a!u@h AWAY :lunch", ":a!u@h AWAY"]);
        assert_eq!(
            events,
            vec![
                Event::Away {
                    nick: "a".into(),
                    message: "lunch".into()
                },
                Event::Back { nick: "a".into() },
            ]
        );
    }

    #[test]
    fn hidden_host() {
        assert_eq!(
            events(&[":srv 396 me cloak.example :is now your displayed host"]),
            vec![Event::DisplayedHost {
                nick: "me".into(),
                hostname: "cloak.example".into()
            }]
        );
    }
}
