//! # Ports
//!
//! - `inbound` - the API the bridge calls
//! - `outbound` - the persistence backend the service drives

pub mod inbound;
pub mod outbound;
