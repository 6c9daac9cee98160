//! The serving side of the bridge: byte transports and the dispatch loop.

pub mod loop_;
pub mod transport;

pub use loop_::run_bridge;
pub use transport::{ByteTransport, SerialTransport, StdioTransport};
