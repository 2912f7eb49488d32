//! Integration scenarios.

#[cfg(test)]
pub mod harness;

pub mod bus_flows;
pub mod delivery;
pub mod http_flows;
pub mod scorer_process;
