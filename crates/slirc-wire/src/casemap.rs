//! IRC case mapping.
//!
//! Networks advertise how nicknames and channel names fold case through the
//! `CASEMAPPING` ISUPPORT token. `rfc1459` (the default) additionally folds
//! `[]\~` onto `{}|^`; `strict-rfc1459` leaves `~`/`^` alone; `ascii` only
//! folds letters.

/// Case mapping advertised by the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Casemapping {
    /// `A-Z[]\~` fold onto `a-z{}|^`.
    #[default]
    Rfc1459,
    /// `A-Z[]\` fold onto `a-z{}|`.
    StrictRfc1459,
    /// Only `A-Z` fold.
    Ascii,
}

impl Casemapping {
    /// Map an ISUPPORT `CASEMAPPING` value. Unknown values fall back to
    /// `rfc1459`.
    pub fn from_token(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "ascii" => Self::Ascii,
            "strict-rfc1459" => Self::StrictRfc1459,
            _ => Self::Rfc1459,
        }
    }

    /// Lowercase one character.
    #[inline]
    pub const fn lower_char(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => (c as u8 + 32) as char,
            (Self::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (Self::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Uppercase one character.
    #[inline]
    pub const fn upper_char(self, c: char) -> char {
        match (self, c) {
            (_, 'a'..='z') => (c as u8 - 32) as char,
            (Self::Ascii, _) => c,
            (_, '{') => '[',
            (_, '}') => ']',
            (_, '|') => '\\',
            (Self::Rfc1459, '^') => '~',
            _ => c,
        }
    }

    /// Lowercase a string.
    pub fn to_lower(self, s: &str) -> String {
        s.chars().map(|c| self.lower_char(c)).collect()
    }

    /// Uppercase a string.
    pub fn to_upper(self, s: &str) -> String {
        s.chars().map(|c| self.upper_char(c)).collect()
    }

    /// Case-insensitive equality.
    pub fn equals(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a
                .chars()
                .zip(b.chars())
                .all(|(x, y)| self.lower_char(x) == self.lower_char(y))
    }
}
