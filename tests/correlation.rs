//! Queries answered by later server replies.

mod common;

use common::Harness;
use regex::Regex;
use slirc_client::MessageKind;
use tokio::sync::oneshot::error::TryRecvError;

#[test]
fn whois_resolves_regardless_of_case() {
    let mut harness = Harness::registered("me");
    let mut query = harness.session.whois("Alice");
    assert_eq!(harness.written(), vec!["WHOIS Alice Alice"]);

    harness.feed(":srv 311 me alice ali host.example * :Alice Liddell");
    harness.feed(":srv 317 me alice 42 1700000000 :seconds idle, signon time");
    assert!(matches!(query.reply.try_recv(), Err(TryRecvError::Empty)));

    harness.feed(":srv 318 me alice :End of /WHOIS list.");
    let reply = query.reply.try_recv().unwrap();
    assert_eq!(reply.nick, "alice");
    assert_eq!(reply.ident.as_deref(), Some("ali"));
    assert_eq!(reply.real_name.as_deref(), Some("Alice Liddell"));
    assert_eq!(reply.idle, Some(42));
    assert_eq!(harness.session.pending_listeners(), 0);
}

#[test]
fn whois_for_a_missing_nick_carries_the_error() {
    let mut harness = Harness::registered("me");
    let mut query = harness.session.whois("ghost");

    harness.feed(":srv 401 me ghost :No such nick/channel");
    harness.feed(":srv 318 me ghost :End of /WHOIS list.");
    let reply = query.reply.try_recv().unwrap();
    assert_eq!(reply.error.as_deref(), Some("no_such_nick"));
}

#[test]
fn invite_list_without_privileges_resolves_to_none() {
    let mut harness = Harness::registered("me");
    let mut query = harness.session.invite_list("#Chan");
    assert_eq!(harness.written(), vec!["MODE #Chan I"]);

    harness.feed(":srv 482 me #other :You're not channel operator");
    assert!(matches!(query.reply.try_recv(), Err(TryRecvError::Empty)));

    harness.feed(":srv 482 me #chan :You're not channel operator");
    assert_eq!(query.reply.try_recv().unwrap(), None);
}

#[test]
fn invite_list_uses_the_advertised_mode() {
    let mut harness = Harness::registered("me");
    harness.feed(":srv 005 me INVEX=e :are supported by this server");
    let mut query = harness.session.invite_list("#c");
    assert_eq!(harness.written(), vec!["MODE #c e"]);

    harness.feed(":srv 346 me #c *!*@friend.example op 1700000000");
    harness.feed(":srv 347 me #c :End of Channel Invite List");
    let list = query.reply.try_recv().unwrap().unwrap();
    assert_eq!(list.invites.len(), 1);
    assert_eq!(list.invites[0].mask, "*!*@friend.example");
}

#[test]
fn concurrent_banlists_resolve_independently() {
    let mut harness = Harness::registered("me");
    let mut a = harness.session.banlist("#a");
    let mut b = harness.session.banlist("#b");
    assert_eq!(harness.written(), vec!["MODE #a b", "MODE #b b"]);

    harness.feed(":srv 367 me #b *!*@spam.example op 1700000000");
    harness.feed(":srv 368 me #b :End of Channel Ban List");
    let list = b.reply.try_recv().unwrap();
    assert_eq!(list.bans.len(), 1);
    assert!(matches!(a.reply.try_recv(), Err(TryRecvError::Empty)));

    harness.feed(":srv 368 me #a :End of Channel Ban List");
    assert!(a.reply.try_recv().unwrap().bans.is_empty());
}

#[test]
fn who_requests_go_out_one_at_a_time() {
    let mut harness = Harness::registered("me");
    let mut first = harness.session.who("#a");
    let mut second = harness.session.who("#b");
    assert_eq!(harness.written(), vec!["WHO #a"]);
    assert_eq!(harness.session.queued_who(), 1);

    harness.feed(":srv 352 me #a ali host.example srv alice H :0 Alice");
    harness.feed(":srv 315 me #a :End of /WHO list.");
    let list = first.try_recv().unwrap();
    assert_eq!(list.users.len(), 1);
    assert_eq!(list.users[0].nick, "alice");

    // The next WHO starts on the following turn.
    assert!(harness.written().is_empty());
    harness.settle();
    assert_eq!(harness.written(), vec!["WHO #b"]);

    harness.feed(":srv 315 me #b :End of /WHO list.");
    assert!(second.try_recv().unwrap().users.is_empty());
}

#[test]
fn whox_is_used_when_advertised() {
    let mut harness = Harness::registered("me");
    harness.feed(":srv 005 me WHOX :are supported by this server");
    let mut reply = harness.session.who("#c");
    assert_eq!(harness.written(), vec!["WHO #c %tcuhsnfdaor,795"]);

    harness.feed(":srv 354 me 795 #c ali host.example srv alice H@ 0 alice_acct 0 :Alice");
    harness.feed(":srv 315 me #c :End of /WHO list.");
    let list = reply.try_recv().unwrap();
    assert_eq!(list.users[0].account.as_deref(), Some("alice_acct"));
    assert_eq!(list.users[0].real_name, "Alice");
}

#[test]
fn invalid_who_target_resolves_empty_without_blocking() {
    let mut harness = Harness::registered("me");
    let mut empty = harness.session.who("");
    let mut after = harness.session.who("#c");
    assert!(harness.written().is_empty());
    assert!(matches!(empty.try_recv(), Err(TryRecvError::Empty)));

    harness.settle();
    let list = empty.try_recv().unwrap();
    assert_eq!(list.target, "");
    assert!(list.users.is_empty());
    assert_eq!(harness.written(), vec!["WHO #c"]);
    assert!(matches!(after.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn close_drops_queued_who_requests() {
    let mut harness = Harness::registered("me");
    let mut first = harness.session.who("#a");
    let mut second = harness.session.who("#b");

    harness.close(true);
    assert!(matches!(first.try_recv(), Err(TryRecvError::Closed)));
    assert!(matches!(second.try_recv(), Err(TryRecvError::Closed)));
    assert_eq!(harness.session.pending_listeners(), 0);
    assert_eq!(harness.session.queued_who(), 0);
}

#[test]
fn cancelled_query_closes_its_reply() {
    let mut harness = Harness::registered("me");
    let mut query = harness.session.banlist("#c");

    assert!(harness.session.cancel_listener(query.handle));
    assert!(!harness.session.cancel_listener(query.handle));
    assert!(matches!(query.reply.try_recv(), Err(TryRecvError::Closed)));

    harness.feed(":srv 368 me #c :End of Channel Ban List");
    assert_eq!(harness.session.pending_listeners(), 0);
}

#[test]
fn matcher_forwards_matching_messages_until_cancelled() {
    let mut harness = Harness::registered("me");
    let (handle, mut matches) = harness
        .session
        .match_messages(&[MessageKind::Privmsg], Regex::new(r"^!seen \w+").unwrap());

    harness.feed(":bob!b@h PRIVMSG #c :!seen alice");
    harness.feed(":bob!b@h NOTICE #c :!seen alice");
    harness.feed(":bob!b@h PRIVMSG #c :hello");
    harness.feed(":carol!c@h PRIVMSG #c :!seen bob");

    let seen: Vec<String> = std::iter::from_fn(|| matches.try_recv().ok())
        .map(|m| format!("{}: {}", m.nick, m.message))
        .collect();
    assert_eq!(seen, vec!["bob: !seen alice", "carol: !seen bob"]);

    assert!(harness.session.cancel_listener(handle));
    harness.feed(":bob!b@h PRIVMSG #c :!seen carol");
    assert!(matches.try_recv().is_err());
}

#[test]
fn matcher_without_kinds_sees_actions_and_notices() {
    let mut harness = Harness::registered("me");
    let (_handle, mut matches) = harness
        .session
        .match_messages(&[], Regex::new("waves").unwrap());

    harness.feed(":bob!b@h PRIVMSG #c :\x01ACTION waves\x01");
    harness.feed(":bob!b@h NOTICE me :waves back");

    let kinds: Vec<MessageKind> = std::iter::from_fn(|| matches.try_recv().ok())
        .map(|m| m.kind)
        .collect();
    assert_eq!(kinds, vec![MessageKind::Action, MessageKind::Notice]);
}

#[test]
fn reconnecting_releases_the_who_in_flight() {
    let mut harness = Harness::registered("me");
    let mut stale = harness.session.who("#a");
    assert_eq!(harness.written(), vec!["WHO #a"]);

    harness.session.connect(None).unwrap();
    assert!(matches!(stale.try_recv(), Err(TryRecvError::Closed)));
    assert_eq!(harness.session.pending_listeners(), 0);

    harness.socket_connected();
    harness.feed(":srv 001 me :Welcome to the network");
    harness.written();

    let mut fresh = harness.session.who("#b");
    assert_eq!(harness.written(), vec!["WHO #b"]);
    harness.feed(":srv 315 me #b :End of /WHO list.");
    assert!(fresh.try_recv().unwrap().users.is_empty());
}

#[test]
fn who_sent_before_the_socket_is_up_does_not_block_later_ones() {
    let mut harness = Harness::new();
    harness
        .session
        .connect(Some(slirc_client::ConnectOptions::with_nick("me")))
        .unwrap();
    let mut early = harness.session.who("#a");

    harness.socket_connected();
    assert!(matches!(early.try_recv(), Err(TryRecvError::Closed)));
    harness.feed(":srv 001 me :Welcome to the network");
    harness.written();

    let _later = harness.session.who("#b");
    assert_eq!(harness.written(), vec!["WHO #b"]);
}
