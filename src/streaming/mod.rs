//! Scan streaming between the capture process and remote consumers

pub mod client;
pub mod messages;
pub mod server;
pub mod wire;

pub use client::ScanClient;
pub use messages::{ScanFrame, StreamMessage};
pub use server::ScanServer;
pub use wire::{Serializer, WireFormat};
