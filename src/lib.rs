//! Seeded generator of randomized Ethernet/IP/transport packets for network fuzz testing.
//!
//! A generation session resolves partially-specified endpoint and packet templates with a
//! seeded generator, then builds each packet layer by layer. The same seed and templates always
//! yield the same packets.

pub mod config;
pub mod details;
pub mod error;
pub mod export;
pub mod generator;
pub mod hosts;
pub mod ip;
pub mod network;
pub mod packet;
pub mod run;
pub mod session;
pub mod stats;
pub mod structs;
pub mod tcp;
pub mod udp;
pub mod validation;

pub use error::{Error, Result};
