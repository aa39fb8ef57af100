//! CTCP framing.
//!
//! CTCP payloads ride inside PRIVMSG (requests) and NOTICE (responses),
//! delimited by `\x01` on both ends. The verb is case-insensitive on the
//! wire and always sent uppercased.
//!
//! ```
//! use slirc_wire::ctcp::{self, Ctcp};
//!
//! let parsed = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
//! assert!(parsed.is_action());
//! assert_eq!(parsed.params, Some("waves hello"));
//!
//! assert_eq!(ctcp::frame("version", None), "\x01VERSION\x01");
//! ```

/// The CTCP delimiter byte.
pub const DELIM: char = '\x01';

/// A CTCP payload borrowed from a message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// Verb as sent (compare case-insensitively).
    pub verb: &'a str,
    /// Everything after the first space, if non-empty.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a message body. The closing delimiter is optional, as many
    /// clients truncate it.
    pub fn parse(text: &'a str) -> Option<Self> {
        let body = text.strip_prefix(DELIM)?;
        let body = body.strip_suffix(DELIM).unwrap_or(body);
        if body.is_empty() {
            return None;
        }

        let (verb, params) = match body.split_once(' ') {
            Some((verb, params)) => (verb, Some(params).filter(|p| !p.is_empty())),
            None => (body, None),
        };
        if verb.is_empty() {
            return None;
        }

        Some(Self { verb, params })
    }

    /// Whether `text` looks like a CTCP payload.
    #[inline]
    pub fn is_ctcp(text: &str) -> bool {
        text.starts_with(DELIM)
    }

    /// Whether this is an `ACTION`.
    pub fn is_action(&self) -> bool {
        self.verb.eq_ignore_ascii_case("ACTION")
    }

    /// The verb uppercased.
    pub fn verb_upper(&self) -> String {
        self.verb.to_ascii_uppercase()
    }
}

/// Wrap a verb and optional parameters in CTCP delimiters, uppercasing the
/// verb.
pub fn frame(verb: &str, params: Option<&str>) -> String {
    let mut out = String::with_capacity(verb.len() + params.map_or(0, str::len) + 3);
    out.push(DELIM);
    out.push_str(&verb.to_ascii_uppercase());
    if let Some(params) = params {
        out.push(' ');
        out.push_str(params);
    }
    out.push(DELIM);
    out
}
