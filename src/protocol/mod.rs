//! SICK TiM telegram protocol
//!
//! Telegram format (CoLa-A, ASCII):
//! - Start delimiter STX (0x02)
//! - Command/response token and space-separated fields
//! - End delimiter ETX (0x03)
//!
//! Over the USB/serial link there is no trailing NUL after ETX; only the
//! Ethernet variant of the protocol appends one, and this crate never sends
//! it.

pub mod commands;
pub mod decoder;
pub mod framer;
pub mod handshake;

pub use commands::{AngularResolution, ETX, STX};
pub use decoder::ScanDecoder;
pub use framer::TelegramFramer;
pub use handshake::{HandshakeController, SensorSession, SessionState};
