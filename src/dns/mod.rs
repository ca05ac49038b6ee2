//! DNS responder: wire codec, records, resolution and the UDP server.

mod handler;
pub mod record;
mod server;
pub mod wire;

pub use handler::{handle_dns_query, resolve};
pub use server::DnsServer;
