//! What the session knows about the network it is connected to.
//!
//! Filled by the dispatcher from `005 RPL_ISUPPORT` and `CAP` replies and
//! reset on every new connection.

use std::collections::{BTreeMap, BTreeSet};

use slirc_wire::Casemapping;

/// Network snapshot.
#[derive(Debug, Clone, Default)]
pub struct NetworkInfo {
    name: Option<String>,
    /// ISUPPORT tokens by uppercase key.
    options: BTreeMap<String, Option<String>>,
    casemapping: Casemapping,
    pub cap: CapState,
}

/// Capability negotiation bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct CapState {
    /// Advertised capabilities and their values.
    pub available: BTreeMap<String, Option<String>>,
    /// Capabilities the server acknowledged.
    pub enabled: BTreeSet<String>,
    /// Capabilities sent in a `CAP REQ` still waiting for ACK or NAK.
    pub requested: BTreeSet<String>,
    /// Negotiation started and `CAP END` not sent yet.
    pub negotiating: bool,
}

impl NetworkInfo {
    /// Network name from the `NETWORK` token.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn casemapping(&self) -> Casemapping {
        self.casemapping
    }

    /// Look up an ISUPPORT token.
    ///
    /// `None` when the server did not advertise it, `Some(None)` for a bare
    /// flag, `Some(Some(value))` when it carries a value.
    pub fn supports(&self, flag: &str) -> Option<Option<&str>> {
        self.options
            .get(&flag.to_ascii_uppercase())
            .map(|value| value.as_deref())
    }

    /// Apply one ISUPPORT token (`KEY`, `KEY=value` or `-KEY`).
    pub fn apply_isupport(&mut self, token: &str) {
        if let Some(key) = token.strip_prefix('-') {
            self.options.remove(&key.to_ascii_uppercase());
            return;
        }

        let (key, value) = match token.split_once('=') {
            Some((key, value)) => (key, Some(unescape_isupport(value))),
            None => (token, None),
        };
        let key = key.to_ascii_uppercase();

        match key.as_str() {
            "NETWORK" => self.name = value.clone(),
            "CASEMAPPING" => {
                self.casemapping = Casemapping::from_token(value.as_deref().unwrap_or(""));
            }
            _ => {}
        }

        self.options.insert(key, value);
    }

    /// Whether a capability was acknowledged.
    pub fn cap_enabled(&self, cap: &str) -> bool {
        self.cap.enabled.contains(cap)
    }

    /// Channel prefix characters from `CHANTYPES`.
    pub fn channel_types(&self) -> &str {
        match self.supports("CHANTYPES") {
            Some(Some(types)) => types,
            _ => "#&",
        }
    }

    /// Whether `target` names a channel.
    pub fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .is_some_and(|c| self.channel_types().contains(c))
    }

    /// `(mode, symbol)` pairs from `PREFIX`, highest rank first.
    pub fn prefix_modes(&self) -> Vec<(char, char)> {
        let spec = match self.supports("PREFIX") {
            Some(Some(spec)) => spec,
            _ => "(ov)@+",
        };
        let Some((modes, symbols)) = spec
            .strip_prefix('(')
            .and_then(|rest| rest.split_once(')'))
        else {
            return Vec::new();
        };
        modes.chars().zip(symbols.chars()).collect()
    }

    /// Split a leading run of prefix symbols off a nick from `NAMES`.
    pub fn split_prefixes<'a>(&self, name: &'a str) -> (Vec<char>, &'a str) {
        let symbols: Vec<char> = self.prefix_modes().into_iter().map(|(_, s)| s).collect();
        let mut modes = Vec::new();
        let mut rest = name;
        while let Some(c) = rest.chars().next() {
            if !symbols.contains(&c) {
                break;
            }
            modes.push(c);
            rest = &rest[c.len_utf8()..];
        }
        (modes, rest)
    }

    /// Whether a channel mode letter takes a parameter in this direction.
    pub fn mode_takes_param(&self, mode: char, adding: bool) -> bool {
        if self.prefix_modes().iter().any(|(m, _)| *m == mode) {
            return true;
        }
        let groups = match self.supports("CHANMODES") {
            Some(Some(groups)) => groups,
            _ => "beI,k,l,imnpst",
        };
        let mut groups = groups.split(',');
        let list = groups.next().unwrap_or("");
        let always = groups.next().unwrap_or("");
        let when_set = groups.next().unwrap_or("");

        list.contains(mode) || always.contains(mode) || (adding && when_set.contains(mode))
    }

    /// Mode letter for the invite exception list.
    pub fn invex_mode(&self) -> char {
        match self.supports("INVEX") {
            Some(Some(letter)) => letter.chars().next().unwrap_or('I'),
            _ => 'I',
        }
    }

    /// Compare two names under the network casemapping.
    pub fn names_equal(&self, a: &str, b: &str) -> bool {
        self.casemapping.equals(a, b)
    }
}

/// Decode `\xHH` escapes in an ISUPPORT value.
fn unescape_isupport(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find("\\x") {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 2..pos + 4);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &rest[pos + 4..];
            }
            None => {
                out.push_str("\\x");
                rest = &rest[pos + 2..];
            }
        }
    }
    out.push_str(rest);
    out
}
