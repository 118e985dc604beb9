//! SMB wire-format definitions.
//!
//! - `header`: SMB1 and SMB2 packet headers, command codes and flags, plus the
//!   marker based family classification.
//! - `body`: the response bodies this server produces itself (negotiate and error).
//! - `dialect`: the table of supported dialects and the configured protocol range.
//! - `negotiate`: parsing of negotiate offers and dialect selection.
//! - `message`: RFC 1002 session framing and header/body pairing.

pub mod body;
pub mod dialect;
pub mod header;
pub mod message;
pub mod negotiate;
