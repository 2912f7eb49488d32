//! # Record Store Domain

pub mod entities;
pub mod errors;
pub mod table;
