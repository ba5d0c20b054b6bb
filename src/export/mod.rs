//! Streaming export of check records.
//!
//! This module writes every completed `RequestRecord` to the configured
//! destination as JSON Lines, one object per line, from a single consumer
//! task fed by a bounded queue.

mod sink;
mod writer;

pub use sink::{OutputSink, SinkTask};
pub use writer::open_output;
