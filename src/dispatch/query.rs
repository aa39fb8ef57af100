//! Multi-numeric query replies: WHO, WHOIS, WHOWAS, ban and invite lists.

use slirc_wire::Message;

use super::channel::parse_timestamp;
use super::{DispatchCache, DispatchContext, param};
use crate::correlation::who::WHOX_TOKEN;
use crate::event::{BanList, Event, InviteList, ListEntry, WhoList, WhoUser, WhoisReply, WhowasReply};

pub(super) fn who(cache: &mut DispatchCache, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    match message.command.as_str() {
        // me #chan user host server nick flags :hops realname
        "352" => {
            let (hops, real_name) = param(message, 7)
                .split_once(' ')
                .map(|(h, r)| (h.parse().ok(), r.to_owned()))
                .unwrap_or((None, String::new()));
            let flags = param(message, 6);
            cache.who.push(WhoUser {
                channel: message.param(1).filter(|c| *c != "*").map(str::to_owned),
                ident: param(message, 2),
                hostname: param(message, 3),
                server: param(message, 4),
                nick: param(message, 5),
                away: flags.contains('G'),
                flags,
                real_name,
                hops,
                account: None,
            });
            true
        }
        // me token #chan user host server nick flags hops account oplevel :realname
        "354" => {
            if message.param(1) != Some(WHOX_TOKEN) || message.params.len() < 12 {
                return false;
            }
            let flags = param(message, 7);
            cache.who.push(WhoUser {
                channel: message.param(2).filter(|c| *c != "*").map(str::to_owned),
                ident: param(message, 3),
                hostname: param(message, 4),
                server: param(message, 5),
                nick: param(message, 6),
                away: flags.contains('G'),
                flags,
                hops: message.param(8).and_then(|h| h.parse().ok()),
                account: message.param(9).filter(|a| *a != "0").map(str::to_owned),
                real_name: param(message, 11),
            });
            true
        }
        _ => {
            ctx.emit(Event::WhoList(WhoList {
                target: param(message, 1),
                users: std::mem::take(&mut cache.who),
            }));
            true
        }
    }
}

pub(super) fn whois(cache: &mut DispatchCache, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let nick = param(message, 1);
    let key = ctx.key(&nick);

    // 301 also answers a PRIVMSG to an away user.
    if message.command == "301" && !cache.whois.contains_key(&key) {
        ctx.emit(Event::Away {
            nick,
            message: message.trailing().unwrap_or_default().to_owned(),
        });
        return true;
    }
    // 312 belongs to WHOWAS when only a WHOWAS is being collected.
    if message.command == "312"
        && !cache.whois.contains_key(&key)
        && let Some(entry) = cache.whowas.get_mut(&key)
    {
        entry.server = message.param(2).map(str::to_owned);
        entry.server_info = message.param(3).map(str::to_owned);
        return true;
    }

    if message.command == "318" {
        let mut reply = cache.whois.remove(&key).unwrap_or_default();
        if reply.nick.is_empty() {
            reply.nick = nick;
        }
        ctx.emit(Event::Whois(reply));
        return true;
    }

    if message.command == "311" {
        // A new WHOIS starts here.
        cache.whois.remove(&key);
    }
    let entry = cache.whois.entry(key).or_insert_with(|| WhoisReply {
        nick: nick.clone(),
        ..WhoisReply::default()
    });
    let text = || message.trailing().map(str::to_owned);
    match message.command.as_str() {
        "301" => entry.away = text(),
        "307" => entry.registered_nick = text(),
        "311" => {
            entry.ident = message.param(2).map(str::to_owned);
            entry.hostname = message.param(3).map(str::to_owned);
            entry.real_name = message.param(5).map(str::to_owned);
        }
        "312" => {
            entry.server = message.param(2).map(str::to_owned);
            entry.server_info = message.param(3).map(str::to_owned);
        }
        "313" => entry.operator = text(),
        "317" => {
            entry.idle = message.param(2).and_then(|i| i.parse().ok());
            entry.logon = message.param(3).and_then(parse_timestamp);
        }
        "319" => {
            let channels = text().unwrap_or_default();
            entry.channels = Some(match entry.channels.take() {
                Some(existing) => format!("{existing} {channels}"),
                None => channels,
            });
        }
        "330" => entry.account = message.param(2).map(str::to_owned),
        "338" => entry.actual_ip = message.param(2).map(str::to_owned),
        "378" => {
            // is connecting from *@host ip
            let detail = message.trailing().unwrap_or_default();
            let mut words = detail.rsplit(' ');
            entry.actual_ip = words.next().map(str::to_owned).or(entry.actual_ip.take());
            entry.actual_hostname = words
                .next()
                .map(|mask| mask.rsplit('@').next().unwrap_or(mask).to_owned());
        }
        "671" => entry.secure = true,
        _ => {}
    }
    true
}

pub(super) fn whowas(cache: &mut DispatchCache, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let nick = param(message, 1);
    let key = ctx.key(&nick);
    match message.command.as_str() {
        // me nick user host * :realname
        "314" => {
            let entry = cache.whowas.entry(key).or_default();
            entry.nick = nick;
            entry.ident = message.param(2).map(str::to_owned);
            entry.hostname = message.param(3).map(str::to_owned);
            entry.real_name = message.param(5).map(str::to_owned);
        }
        "406" => {
            let entry = cache.whowas.entry(key).or_default();
            entry.nick = nick;
            entry.error = Some("no_such_nick".to_owned());
        }
        _ => {
            let mut reply = cache.whowas.remove(&key).unwrap_or_default();
            if reply.nick.is_empty() {
                reply.nick = nick;
            }
            ctx.emit(Event::Whowas(reply));
        }
    }
    true
}

/// `367`/`368` ban list and `346`/`347` invite exception list.
pub(super) fn mode_list(cache: &mut DispatchCache, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let channel = param(message, 1);
    let key = ctx.key(&channel);
    match message.command.as_str() {
        "367" | "346" => {
            let entry = ListEntry {
                mask: param(message, 2),
                set_by: message.param(3).map(str::to_owned),
                set_at: message.param(4).and_then(parse_timestamp),
            };
            let list = if message.command == "367" { &mut cache.bans } else { &mut cache.invites };
            list.entry(key).or_default().push(entry);
        }
        "368" => {
            let bans = cache.bans.remove(&key).unwrap_or_default();
            ctx.emit(Event::BanList(BanList { channel, bans }));
        }
        _ => {
            let invites = cache.invites.remove(&key).unwrap_or_default();
            ctx.emit(Event::InviteList(InviteList { channel, invites }));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::super::test_support::events;
    use super::*;

    #[test]
    fn plain_who() {
        let events = events(&[
            ":srv 352 me #c alice host.a srv alice H@ :0 Alice A",
            ":srv 352 me #c bob host.b srv bob G :2 Bob",
            ":srv 315 me #c :End of /WHO list.",
        ]);
        assert_eq!(events.len(), 1);
        let Event::WhoList(list) = &events[0] else { panic!() };
        assert_eq!(list.target, "#c");
        assert_eq!(list.users.len(), 2);
        assert_eq!(list.users[0].real_name, "Alice A");
        assert_eq!(list.users[0].hops, Some(0));
        assert!(!list.users[0].away);
        assert!(list.users[1].away);
    }

    #[test]
    fn whox_with_our_token() {
        let events = events(&[
            ":srv 354 me 795 #c alice host.a srv alice H 0 acct n/a :Alice",
            ":srv 354 me 795 #c bob host.b srv bob H 0 0 n/a :Bob",
            ":srv 354 me 111 #c eve host.e srv eve H 0 0 n/a :Eve",
            ":srv 315 me #c :End of /WHO list.",
        ]);
        // The foreign token line is not ours and falls through to Unknown.
        assert!(matches!(events[0], Event::Unknown { .. }));
        let Event::WhoList(list) = &events[1] else { panic!() };
        assert_eq!(list.users.len(), 2);
        assert_eq!(list.users[0].account.as_deref(), Some("acct"));
        assert_eq!(list.users[1].account, None);
    }

    #[test]
    fn whois_is_collected() {
        let events = events(&[
            ":srv 311 me Alice al host.a * :Alice Liddell",
            ":srv 319 me Alice :@#c #d",
            ":srv 312 me Alice srv.example :Example server",
            ":srv 317 me Alice 42 1700000000 :seconds idle, signon time",
            ":srv 330 me Alice alice_acct :is logged in as",
            ":srv 671 me Alice :is using a secure connection",
            ":srv 318 me Alice :End of /WHOIS list.",
        ]);
        assert_eq!(events.len(), 1);
        let Event::Whois(whois) = &events[0] else { panic!() };
        assert_eq!(whois.nick, "Alice");
        assert_eq!(whois.ident.as_deref(), Some("al"));
        assert_eq!(whois.real_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(whois.channels.as_deref(), Some("@#c #d"));
        assert_eq!(whois.idle, Some(42));
        assert_eq!(whois.account.as_deref(), Some("alice_acct"));
        assert!(whois.secure);
    }

    #[test]
    fn whois_for_missing_nick_carries_error() {
        let events = events(&[
            ":srv 401 me ghost :No such nick/channel",
            ":srv 318 me ghost :End of /WHOIS list.",
        ]);
        assert!(matches!(&events[0], Event::IrcError(e) if e.error == "no_such_nick"));
        let Event::Whois(whois) = &events[1] else { panic!() };
        assert_eq!(whois.error.as_deref(), Some("no_such_nick"));
    }

    #[test]
    fn away_reply_outside_whois() {
        let events = events(&[":srv 301 me alice :gone fishing"]);
        assert_eq!(
            events,
            vec![Event::Away {
                nick: "alice".into(),
                message: "gone fishing".into()
            }]
        );
    }

    #[test]
    fn whowas_is_collected() {
        let events = events(&[
            ":srv 314 me old u h * :Old Timer",
            ":srv 312 me old srv.example :Sun Jan 1 2023",
            ":srv 369 me old :End of WHOWAS",
        ]);
        let Event::Whowas(whowas) = &events[0] else { panic!() };
        assert_eq!(whowas.real_name.as_deref(), Some("Old Timer"));
        assert_eq!(whowas.server.as_deref(), Some("srv.example"));
    }

    #[test]
    fn whowas_unknown_nick() {
        let events = events(&[
            ":srv 406 me nobody :There was no such nickname",
            ":srv 369 me nobody :End of WHOWAS",
        ]);
        let Event::Whowas(whowas) = &events[0] else { panic!() };
        assert_eq!(whowas.error.as_deref(), Some("no_such_nick"));
    }

    #[test]
    fn ban_and_invite_lists() {
        let events = events(&[
            ":srv 367 me #c *!*@bad op 1700000000",
            ":srv 368 me #c :End of channel ban list",
            ":srv 346 me #c *!*@friend",
            ":srv 347 me #c :End of channel invite list",
        ]);
        let Event::BanList(bans) = &events[0] else { panic!() };
        assert_eq!(bans.bans[0].mask, "*!*@bad");
        assert_eq!(bans.bans[0].set_by.as_deref(), Some("op"));
        let Event::InviteList(invites) = &events[1] else { panic!() };
        assert_eq!(invites.invites[0].mask, "*!*@friend");
        assert_eq!(invites.invites[0].set_by, None);
    }
}
