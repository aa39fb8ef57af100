//! Outbound line construction.
//!
//! Every line the session writes goes through [`raw_line`]. Its trailing
//! parameter rule is exact: with more than one token, a last token that
//! starts with `:` or contains whitespace gets a `:` prefix; a single token
//! never does. Tokens that are neither text nor numbers are dropped before
//! the rule is applied. Carriage returns, line feeds and NULs inside a token
//! are removed, so one call always yields one line.

use slirc_wire::Tag;
use slirc_wire::chunk::{self, BreakPolicy};
use slirc_wire::line::is_line_breaking;
use slirc_wire::message::escape_tag_value;
use tracing::warn;

/// Bytes a CTCP `ACTION` wrapper adds around the text: two delimiters, the
/// verb and a space.
pub const ACTION_OVERHEAD: usize = "ACTION".len() + 3;

/// One outbound token.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Int(i128),
    Float(f64),
    /// Dropped before formatting.
    Skip,
}

impl Param {
    fn into_token(self) -> Option<String> {
        match self {
            Param::Text(text) => Some(text),
            Param::Int(n) => Some(n.to_string()),
            Param::Float(n) => Some(n.to_string()),
            Param::Skip => None,
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_owned())
    }
}

impl From<&String> for Param {
    fn from(value: &String) -> Self {
        Param::Text(value.clone())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<char> for Param {
    fn from(value: char) -> Self {
        Param::Text(value.to_string())
    }
}

macro_rules! int_params {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Param {
            fn from(value: $ty) -> Self {
                Param::Int(value as i128)
            }
        })*
    };
}

int_params!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f32> for Param {
    fn from(value: f32) -> Self {
        Param::Float(f64::from(value))
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Float(value)
    }
}

impl From<bool> for Param {
    fn from(_: bool) -> Self {
        Param::Skip
    }
}

impl From<()> for Param {
    fn from(_: ()) -> Self {
        Param::Skip
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Param::Skip, Into::into)
    }
}

/// Build a `Vec<Param>` from mixed arguments.
///
/// ```
/// use slirc_client::{params, outbound::raw_line};
///
/// let line = raw_line(params!["MODE", "#chan", "+l", 25, None::<&str>]);
/// assert_eq!(line, "MODE #chan +l 25");
/// ```
#[macro_export]
macro_rules! params {
    ($($param:expr),* $(,)?) => {
        vec![$($crate::outbound::Param::from($param)),*]
    };
}

/// Format tokens into one protocol line, without the line terminator.
///
/// ```
/// use slirc_client::outbound::raw_line;
///
/// assert_eq!(raw_line(["PRIVMSG", "#chan", "hello world"]), "PRIVMSG #chan :hello world");
/// assert_eq!(raw_line(["PRIVMSG", "#chan", "hello"]), "PRIVMSG #chan hello");
/// assert_eq!(raw_line([":starts-with-colon"]), ":starts-with-colon");
/// ```
pub fn raw_line<I>(params: I) -> String
where
    I: IntoIterator,
    I::Item: Into<Param>,
{
    let mut tokens: Vec<String> = params
        .into_iter()
        .filter_map(|p| p.into().into_token())
        .map(|mut token| {
            token.retain(|c| !is_line_breaking(c));
            token
        })
        .collect();

    if tokens.len() > 1
        && let Some(last) = tokens.last_mut()
        && (last.starts_with(':') || last.contains(char::is_whitespace))
    {
        last.insert(0, ':');
    }

    tokens.join(" ")
}

/// Prepend IRCv3 message tags to a formatted line.
///
/// ```
/// use slirc_client::outbound::with_tags;
/// use slirc_wire::Tag;
///
/// let tags = [Tag::new("+draft/reply", Some("abc")), Tag::new("+typing", None::<String>)];
/// assert_eq!(with_tags(&tags, "TAGMSG #c".into()), "@+draft/reply=abc;+typing TAGMSG #c");
/// ```
pub fn with_tags(tags: &[Tag], line: String) -> String {
    if tags.is_empty() {
        return line;
    }
    let mut out = String::from("@");
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&tag.key);
        if let Some(value) = &tag.value {
            out.push('=');
            // Writing into a String cannot fail.
            let _ = escape_tag_value(&mut out, value);
        }
    }
    out.push(' ');
    out.push_str(&line);
    out
}

/// Split `text` into non-empty lines on any newline variant, then each line
/// into pieces of at most `budget` bytes.
///
/// Anything the chunker cannot place (a single character wider than the
/// budget) is dropped with a warning.
pub fn chunk_text(text: &str, budget: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    for line in text.split(['\r', '\n']).filter(|l| !l.is_empty()) {
        let mut chunks = chunk::split(line, budget, BreakPolicy::LAST_RESORT);
        pieces.extend(chunks.by_ref());
        let leftover = chunks.remainder();
        if !leftover.is_empty() {
            warn!(budget, dropped = leftover.len(), "text does not fit the message budget");
        }
    }
    pieces
}
