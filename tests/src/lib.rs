//! # Match Bridge Test Suite
//!
//! Cross-crate scenarios: the bridge service running over the in-process bus
//! with a real CSV store, driven through the correlating client and HTTP.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs         # Bridge startup + request fixtures
//!     ├── bus_flows.rs       # CRUD / RECOMMEND / CLASSIFY over queues
//!     ├── delivery.rs        # Redelivery, decode failures, concurrency
//!     ├── http_flows.rs      # HTTP ingress over a real socket
//!     └── scorer_process.rs  # Real subprocess scorer (unix)
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mb-tests
//! cargo test -p mb-tests integration::delivery::
//! ```

pub mod integration;
