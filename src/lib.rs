//! zonekeeper - a minimal authoritative DNS responder.
//!
//! Answers A queries from an in-memory zone store fed by an authenticated
//! HTTP source. Operators can demote records to a stale table, clear it, or
//! reload the source from the console. Exposed as a library for testing.

pub mod body;
pub mod config;
pub mod console;
pub mod dns;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod tokio_io;
pub mod zone;
