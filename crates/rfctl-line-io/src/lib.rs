//! Line-oriented I/O for rfctl.
//!
//! This crate provides the framing and the serialized channel that every
//! controller activity uses to talk to the instrument.
//!
//! # Architecture
//!
//! - [`protocol`] -- `\r\n` command framing and the inbound [`LineDecoder`]
//! - [`channel`] -- [`CommandChannel`], one exclusive guard per write or
//!   read attempt, plus the bounded recent-lines buffer

pub mod channel;
pub mod protocol;

pub use channel::{CommandChannel, DEFAULT_RECENT_CAPACITY, RecentLines};
pub use protocol::{LineDecoder, encode_command};
