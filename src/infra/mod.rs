//! Infrastructure layer for schemals
//!
//! Wire protocol, framing, readiness polling and text cleanup.

pub mod mdplain;
pub mod protocol;
pub mod transport;
pub mod wait;

pub use transport::{MessageReader, MessageWriter};
pub use wait::{WaitConfig, Waiter};
