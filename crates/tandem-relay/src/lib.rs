//! # tandem-relay
//!
//! Real-time lesson relay server.
//!
//! Pairs one teacher with one or more students under a shared session
//! identifier and relays three traffic kinds between them:
//!
//! - chat messages, machine-translated via `tandem-translate`
//! - a shared elapsed timer under teacher control
//! - opaque WebRTC signaling payloads (offer/answer/ICE)
//!
//! Sessions are created lazily on first reference and live for the
//! process lifetime; nothing is persisted across restarts.

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod timer;
pub mod websocket;
