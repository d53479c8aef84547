//! WebSocket connection handling: per-client state, frame dispatch, and
//! the socket read/write loop.

pub mod connection;
pub mod handler;
pub mod session;
