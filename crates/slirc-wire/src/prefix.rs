//! Message source (`:prefix`) handling.

use std::fmt;

/// The origin of a message: a server or a `nick!user@host` mask.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Prefix {
    /// Server name (e.g. `irc.example.com`).
    ServerName(String),
    /// User source: (nickname, username, hostname). Missing parts are empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix leniently.
    ///
    /// A dot before any `!` or `@` marks a server name; everything else is
    /// treated as a user mask.
    pub fn parse(s: &str) -> Self {
        let (nick, rest) = match s.find(['!', '@']) {
            Some(pos) => (&s[..pos], &s[pos..]),
            None => (s, ""),
        };

        if rest.is_empty() && nick.contains('.') {
            return Prefix::ServerName(nick.to_owned());
        }

        let (user, host) = match rest.strip_prefix('!') {
            Some(after) => match after.split_once('@') {
                Some((user, host)) => (user, host),
                None => (after, ""),
            },
            None => ("", rest.strip_prefix('@').unwrap_or("")),
        };

        Prefix::Nickname(nick.to_owned(), user.to_owned(), host.to_owned())
    }

    /// The nickname or server name.
    pub fn name(&self) -> &str {
        match self {
            Prefix::ServerName(name) => name,
            Prefix::Nickname(nick, _, _) => nick,
        }
    }

    /// The username part of a user mask, if any.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// The host part of a user mask, if any.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_mask() {
        let prefix = Prefix::parse("nick!user@host.example.com");
        assert_eq!(
            prefix,
            Prefix::Nickname("nick".into(), "user".into(), "host.example.com".into())
        );
        assert_eq!(prefix.to_string(), "nick!user@host.example.com");
    }

    #[test]
    fn parses_server_name() {
        assert_eq!(
            Prefix::parse("irc.example.com"),
            Prefix::ServerName("irc.example.com".into())
        );
    }

    #[test]
    fn bare_nick_is_a_user() {
        let prefix = Prefix::parse("nick");
        assert_eq!(prefix.name(), "nick");
        assert_eq!(prefix.user(), None);
        assert_eq!(prefix.host(), None);
    }

    #[test]
    fn nick_with_host_only() {
        let prefix = Prefix::parse("nick@some.host");
        assert_eq!(prefix.host(), Some("some.host"));
        assert_eq!(prefix.user(), None);
    }
}
