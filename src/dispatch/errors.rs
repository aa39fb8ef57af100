//! Error numerics.
//!
//! Each known error numeric becomes an [`Event::IrcError`] with a symbolic
//! name, so callers can match on `chanop_privs_needed` instead of `482`.

use slirc_wire::Message;

use super::{DispatchCache, DispatchContext};
use crate::event::{Event, IrcError, WhoisReply};

/// Where the subject of an error sits in the parameters (after our nick).
#[derive(Clone, Copy)]
enum Layout {
    /// `<me> <nick> :reason`
    Nick,
    /// `<me> <channel> :reason`
    Channel,
    /// `<me> <nick> <channel> :reason`
    NickChannel,
    /// `<me> <command> :reason` or `<me> :reason`
    Bare,
}

const ERRORS: &[(u16, &str, Layout)] = &[
    (401, "no_such_nick", Layout::Nick),
    (403, "no_such_channel", Layout::Channel),
    (404, "cannot_send_to_channel", Layout::Channel),
    (405, "too_many_channels", Layout::Channel),
    (421, "unknown_command", Layout::Bare),
    (432, "erroneus_nickname", Layout::Nick),
    (433, "nickname_in_use", Layout::Nick),
    (441, "user_not_in_channel", Layout::NickChannel),
    (442, "not_on_channel", Layout::Channel),
    (443, "user_on_channel", Layout::NickChannel),
    (461, "not_enough_parameters", Layout::Bare),
    (471, "channel_is_full", Layout::Channel),
    (473, "invite_only_channel", Layout::Channel),
    (474, "banned_from_channel", Layout::Channel),
    (475, "bad_channel_key", Layout::Channel),
    (481, "no_privileges", Layout::Bare),
    (482, "chanop_privs_needed", Layout::Channel),
];

/// Symbolic name of an error numeric.
pub fn error_name(numeric: u16) -> Option<&'static str> {
    ERRORS
        .iter()
        .find(|(code, _, _)| *code == numeric)
        .map(|(_, name, _)| *name)
}

/// Emit an `IrcError` if `message` is a known error numeric.
pub(super) fn error(cache: &mut DispatchCache, message: &Message, ctx: &mut DispatchContext<'_>) -> bool {
    let Some(numeric) = message.numeric() else {
        return false;
    };
    let Some((_, name, layout)) = ERRORS.iter().find(|(code, _, _)| *code == numeric) else {
        return false;
    };

    let (nick, channel) = match layout {
        Layout::Nick => (message.param(1), None),
        Layout::Channel => (None, message.param(1)),
        Layout::NickChannel => (message.param(1), message.param(2)),
        Layout::Bare => (None, None),
    };

    // A WHOIS for a missing nick ends with 318; let it carry the error.
    if numeric == 401
        && let Some(nick) = nick
    {
        let key = ctx.key(nick);
        cache
            .whois
            .entry(key)
            .or_insert_with(|| WhoisReply {
                nick: nick.to_owned(),
                ..WhoisReply::default()
            })
            .error = Some((*name).to_owned());
    }

    let reason = if message.params.len() > 1 {
        message.trailing().unwrap_or_default().to_owned()
    } else {
        String::new()
    };
    ctx.emit(Event::IrcError(IrcError {
        error: (*name).to_owned(),
        numeric,
        channel: channel.map(str::to_owned),
        nick: nick.map(str::to_owned),
        reason,
    }));
    true
}

#[cfg(test)]
mod tests {
    use super::super::test_support::events;
    use super::*;

    #[test]
    fn names_are_symbolic() {
        assert_eq!(error_name(482), Some("chanop_privs_needed"));
        assert_eq!(error_name(433), Some("nickname_in_use"));
        assert_eq!(error_name(200), None);
    }

    #[test]
    fn channel_error() {
        let events = events(&[":srv 482 me #c :You're not channel operator"]);
        assert_eq!(
            events,
            vec![Event::IrcError(IrcError {
                error: "chanop_privs_needed".into(),
                numeric: 482,
                channel: Some("#c".into()),
                nick: None,
                reason: "You're not channel operator".into(),
            })]
        );
    }

    #[test]
    fn nick_and_channel_error() {
        let events = events(&[":srv 441 me bob #c :They aren't on that channel"]);
        let Event::IrcError(err) = &events[0] else { panic!() };
        assert_eq!(err.nick.as_deref(), Some("bob"));
        assert_eq!(err.channel.as_deref(), Some("#c"));
    }

    #[test]
    fn bare_error() {
        let events = events(&[":srv 481 me :Permission Denied"]);
        let Event::IrcError(err) = &events[0] else { panic!() };
        assert_eq!(err.error, "no_privileges");
        assert_eq!(err.reason, "Permission Denied");
        assert_eq!(err.nick, None);
        assert_eq!(err.channel, None);
    }
}
