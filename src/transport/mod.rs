//! The `transport` module carries hub frames to browsers over WebSockets.
//!
//! Connections are one-way: every frame the hub broadcasts is forwarded as
//! a text message and anything a browser sends is ignored.

pub mod websocket;

pub use websocket::{WS_PATH, routes};
