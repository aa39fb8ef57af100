//! # slirc-wire
//!
//! The wire-facing half of `slirc-client`: the IRC message model and parser,
//! case mapping, CTCP framing, the tokio line codec, and the byte-budgeted
//! chunker used to split outbound text.
//!
//! ## Parsing a line
//!
//! ```rust
//! use slirc_wire::Message;
//!
//! let msg: Message = "@time=2023-01-01T12:00:00Z :nick!user@host PRIVMSG #chan :hi there"
//!     .parse()
//!     .expect("valid line");
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.params, vec!["#chan", "hi there"]);
//! assert_eq!(msg.tag("time"), Some("2023-01-01T12:00:00Z"));
//! assert_eq!(msg.source_nickname(), Some("nick"));
//! ```
//!
//! ## Chunking text
//!
//! ```rust
//! use slirc_wire::chunk::{split, BreakPolicy};
//!
//! let chunks: Vec<&str> = split("hello brave new world", 12, BreakPolicy::LAST_RESORT).collect();
//! assert_eq!(chunks, vec!["hello brave ", "new world"]);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod chunk;
pub mod ctcp;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod prefix;

pub use self::casemap::Casemapping;
pub use self::ctcp::Ctcp;
pub use self::error::WireError;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::{Message, Tag};
pub use self::prefix::Prefix;
