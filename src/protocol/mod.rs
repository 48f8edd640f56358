//! Protocol Module
//!
//! The request/response UDP protocol spoken by every service.

mod client;
mod codec;
mod server;

pub use client::{Exchange, IdSequence};
pub use codec::{Reply, Request, MAX_DATAGRAM, STATUS_PROBE, STATUS_UP};
pub use server::{DatagramServer, LookupService};
