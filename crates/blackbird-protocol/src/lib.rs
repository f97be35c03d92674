//! Blackbird 27842 Wire Protocol Library
//!
//! This crate provides encoding and parsing for the line-oriented ASCII
//! protocol spoken by the Blackbird 27842 8x8 HDBaseT matrix switch:
//!
//! - **Commands** (host → device): short imperative strings terminated by a
//!   literal `.`, e.g. `OUT03:05.` routes input 5 to HDBT output 3
//! - **Status lines** (device → host): `\r\n`-terminated free-text lines,
//!   pushed both as command confirmations and unsolicited
//!
//! # Architecture
//!
//! - [`Command`] is the typed intent; [`Command::encode`] validates operand
//!   domains and produces the exact wire string, or fails with
//!   [`CommandError`] before any I/O could happen
//! - [`LineCodec`] is a streaming splitter that turns byte bursts into
//!   complete lines (partial data stays buffered)
//! - [`parse_line`] matches one line against an ordered recognizer list and
//!   yields a typed [`Message`], an [`ParsedLine::Ignored`] marker for
//!   known no-state lines, or [`ParsedLine::Unrecognized`]
//!
//! This crate performs no I/O; the session engine in `blackbird-session`
//! owns the transport and drives these types.
//!
//! # Example
//!
//! ```rust
//! use blackbird_protocol::{parse_line, Command, LineCodec, Message, ParsedLine};
//!
//! let wire = Command::HdbtInput { input: 5, output: 3 }.encode().unwrap();
//! assert_eq!(wire, "OUT03:05.");
//!
//! let mut codec = LineCodec::new();
//! codec.push_bytes(b"Output 03 Switch To In 05!\r\n");
//! let line = codec.next_line().unwrap();
//! assert_eq!(
//!     parse_line(&line),
//!     ParsedLine::Message(Message::HdbtInputChanged { output: 3, input: 5 })
//! );
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod message;
pub mod types;

pub use codec::LineCodec;
pub use command::Command;
pub use error::CommandError;
pub use message::{parse_line, Message, ParsedLine};
pub use types::{
    AudioSource, EdidProfile, HdcpMode, SpdifSource, VolumeCommand, PORT_COUNT,
};
