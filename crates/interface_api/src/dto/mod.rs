//! Request and response bodies
//!
//! Field names are camelCase on the wire.

pub mod bills;
pub mod stock;
