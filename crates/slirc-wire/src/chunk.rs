//! Byte-budgeted text splitting.
//!
//! [`split`] cuts text into pieces that each fit a byte budget, preferring
//! (in order) a cut just after whitespace, a cut between user-perceived
//! characters, and finally a cut between code points. The last two are only
//! taken when the [`BreakPolicy`] allows them. A cut never lands inside a
//! UTF-8 sequence, and concatenating every piece gives back the input.
//!
//! Cluster boundaries are approximated: a cut is refused before combining
//! marks, variation selectors, joiners, emoji modifiers and tag characters,
//! after a zero-width joiner, inside a regional-indicator pair, and between
//! `\r` and `\n`. That covers the sequences chat text actually carries
//! without a full segmentation table.
//!
//! The iterator is not resumable across different inputs; build a new one
//! with [`split`] to start again.

/// Which break opportunities the splitter may fall back to when no
/// whitespace fits inside the budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreakPolicy {
    /// Allow cutting a word between two user-perceived characters.
    pub allow_breaking_words: bool,
    /// Allow cutting inside a user-perceived character, between code points.
    pub allow_breaking_clusters: bool,
}

impl BreakPolicy {
    /// Only ever cut after whitespace.
    pub const WORDS_ONLY: Self = Self {
        allow_breaking_words: false,
        allow_breaking_clusters: false,
    };

    /// Break words, then clusters, when nothing better fits.
    pub const LAST_RESORT: Self = Self {
        allow_breaking_words: true,
        allow_breaking_clusters: true,
    };
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self::LAST_RESORT
    }
}

/// Split `text` into pieces of at most `budget` bytes.
///
/// ```
/// use slirc_wire::chunk::{split, BreakPolicy};
///
/// let pieces: Vec<_> = split("aaaaaa", 4, BreakPolicy::LAST_RESORT).collect();
/// assert_eq!(pieces, vec!["aaaa", "aa"]);
/// ```
pub fn split(text: &str, budget: usize, policy: BreakPolicy) -> Chunks<'_> {
    Chunks {
        rest: text,
        budget,
        policy,
    }
}

/// Iterator returned by [`split`].
///
/// Iteration stops early if the policy leaves no legal cut for the next
/// piece (a word longer than the budget under [`BreakPolicy::WORDS_ONLY`],
/// or a character wider than the budget). Whatever was not produced is
/// available from [`Chunks::remainder`].
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
    rest: &'a str,
    budget: usize,
    policy: BreakPolicy,
}

impl<'a> Chunks<'a> {
    /// Text not yet produced.
    pub fn remainder(&self) -> &'a str {
        self.rest
    }

    fn next_cut(&self) -> Option<usize> {
        let rest = self.rest;
        let window = floor_char_boundary(rest, self.budget);
        if window == 0 {
            return None;
        }

        let after_space = rest[..window]
            .char_indices()
            .rev()
            .filter(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .find(|&cut| is_cluster_boundary(rest, cut));
        if after_space.is_some() {
            return after_space;
        }

        if self.policy.allow_breaking_words {
            let between_clusters = (1..=window)
                .rev()
                .find(|&cut| is_cluster_boundary(rest, cut));
            if between_clusters.is_some() {
                return between_clusters;
            }
        }

        if self.policy.allow_breaking_clusters {
            return Some(window);
        }

        None
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.len() <= self.budget {
            let piece = self.rest;
            self.rest = "";
            return Some(piece);
        }

        let cut = self.next_cut()?;
        let (piece, rest) = self.rest.split_at(cut);
        self.rest = rest;
        Some(piece)
    }
}

/// Largest char boundary at or below `index`.
#[inline]
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut end = index;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Whether cutting `s` at byte `index` keeps user-perceived characters whole.
pub fn is_cluster_boundary(s: &str, index: usize) -> bool {
    if index == 0 || index >= s.len() {
        return true;
    }
    if !s.is_char_boundary(index) {
        return false;
    }

    let (before, after) = s.split_at(index);
    let (Some(prev), Some(next)) = (before.chars().next_back(), after.chars().next()) else {
        return true;
    };

    if prev == '\r' && next == '\n' {
        return false;
    }
    if prev == ZWJ || is_extender(next) {
        return false;
    }
    if is_regional_indicator(prev) && is_regional_indicator(next) {
        let run = before
            .chars()
            .rev()
            .take_while(|c| is_regional_indicator(*c))
            .count();
        return run % 2 == 0;
    }

    true
}

const ZWJ: char = '\u{200D}';

fn is_regional_indicator(c: char) -> bool {
    matches!(c, '\u{1F1E6}'..='\u{1F1FF}')
}

/// Code points that attach to the preceding character.
fn is_extender(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'
        | '\u{0483}'..='\u{0489}'
        | '\u{0591}'..='\u{05BD}'
        | '\u{0610}'..='\u{061A}'
        | '\u{064B}'..='\u{065F}'
        | '\u{0900}'..='\u{0903}'
        | '\u{093A}'..='\u{094F}'
        | '\u{0951}'..='\u{0957}'
        | '\u{0E31}'
        | '\u{0E34}'..='\u{0E3A}'
        | '\u{0E47}'..='\u{0E4E}'
        | '\u{1160}'..='\u{11FF}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{3099}'..='\u{309A}'
        | '\u{FE00}'..='\u{FE0F}'
        | '\u{FE20}'..='\u{FE2F}'
        | '\u{1F3FB}'..='\u{1F3FF}'
        | '\u{E0020}'..='\u{E007F}'
        | '\u{E0100}'..='\u{E01EF}'
    )
}
