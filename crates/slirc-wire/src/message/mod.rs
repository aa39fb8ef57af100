//! The owned IRC message model.
//!
//! Unlike a fully typed command enum, [`Message`] keeps the command as its
//! wire token and parameters as strings. The dispatcher above this layer
//! decides what each command means.

mod parse;
mod tags;

use std::fmt::{self, Display, Formatter};

use crate::prefix::Prefix;

pub use tags::{escape_tag_value, unescape_tag_value};

/// A single IRCv3 message tag.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    /// Tag key, including any vendor prefix or `+` client marker.
    pub key: String,
    /// Unescaped value, if one was given.
    pub value: Option<String>,
}

impl Tag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            value: value.map(Into::into),
        }
    }
}

/// An owned IRC message: `[@tags] [:prefix] <command> [params...]`.
#[derive(Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// IRCv3 message tags, in wire order.
    pub tags: Vec<Tag>,
    /// Message source.
    pub prefix: Option<Prefix>,
    /// Command token, uppercased for letters; numerics are kept as three digits.
    pub command: String,
    /// Parameters; the trailing parameter has its `:` removed.
    pub params: Vec<String>,
}

impl Message {
    /// Build a message from a command and parameters.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Vec::new(),
            prefix: None,
            command: command.to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a tag, builder style.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    /// Attach a source, builder style.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Parameter by index.
    #[inline]
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The last parameter, usually the free-text trailing one.
    #[inline]
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Value of a tag, if the tag is present and has a value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .and_then(|t| t.value.as_deref())
    }

    /// Whether a tag is present at all.
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.iter().any(|t| t.key == key)
    }

    /// Numeric reply code, if the command is a three-digit numeric.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Nickname from the prefix, if the source is a user.
    pub fn source_nickname(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::Nickname(nick, _, _)) => Some(nick),
            _ => None,
        }
    }

    /// Serialize without the trailing CRLF.
    pub fn to_line(&self) -> String {
        let mut out = self.to_string();
        out.truncate(out.trim_end_matches(['\r', '\n']).len());
        out
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            f.write_str("@")?;
            for (i, tag) in self.tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(&tag.key)?;
                if let Some(value) = &tag.value {
                    f.write_str("=")?;
                    escape_tag_value(f, value)?;
                }
            }
            f.write_str(" ")?;
        }

        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.starts_with(':') || param.contains(' '));
            if needs_colon {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }

        f.write_str("\r\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_adds_trailing_colon_when_needed() {
        let msg = Message::new("privmsg", ["#chan", "hello world"]);
        assert_eq!(msg.to_string(), "PRIVMSG #chan :hello world\r\n");
        assert_eq!(msg.to_line(), "PRIVMSG #chan :hello world");
    }

    #[test]
    fn display_leaves_single_word_trailing_bare() {
        let msg = Message::new("NICK", ["newnick"]);
        assert_eq!(msg.to_line(), "NICK newnick");
    }

    #[test]
    fn display_writes_tags_and_prefix() {
        let msg = Message::new("TAGMSG", ["#chan"])
            .with_tag("+typing", Some("active"))
            .with_tag("label", None::<String>)
            .with_prefix(Prefix::parse("me!u@h"));
        assert_eq!(msg.to_line(), "@+typing=active;label :me!u@h TAGMSG #chan");
    }

    #[test]
    fn numeric_detection() {
        assert_eq!(Message::new("001", ["me"]).numeric(), Some(1));
        assert_eq!(Message::new("PING", ["x"]).numeric(), None);
    }
}
