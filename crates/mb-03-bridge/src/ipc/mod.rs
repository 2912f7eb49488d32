//! Bus-facing adapters: inbound consumers, reply publishing, and the
//! correlating client.

pub mod client;
pub mod consumer;
pub mod publisher;
