//! Picobridge — serial JSON tool bridge for Pico-class boards.
//!
//! Line-delimited JSON requests come in over a serial link, get dispatched
//! to registered hardware-control tools, and produce exactly one structured
//! response each, in order.

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod hardware;
pub mod registry;
pub mod tools;
pub mod types;
