//! # tandem-protocol
//!
//! Wire-format types for the tandem lesson relay.
//!
//! A lesson session pairs a teacher with one or more students. Both sides
//! exchange JSON frames over a WebSocket; every frame carries a `type` tag.
//! Inbound frames are [`ClientFrame`], outbound frames are [`ServerFrame`].

#![deny(unsafe_code)]

pub mod errors;
pub mod frames;

pub use errors::RelayError;
pub use frames::{ClientFrame, Role, ServerFrame, TimerAction};
