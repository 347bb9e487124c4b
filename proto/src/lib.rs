//! Wire protocol for the chess room server.
//!
//! Every frame is a JSON object `{"a": <action code>, "p": <payload>}`.
//! [`Event`] is the closed set of frames; [`codec`] turns text into events
//! and back.

pub mod action;
pub mod codec;
pub mod event;
pub mod payloads;

pub use action::EventAction;
pub use codec::{decode, encode, DecodeError};
pub use event::Event;
pub use payloads::*;
