//! Wire format serialization and framing
//!
//! Every message on the consumer stream is length-prefixed:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ Postcard or JSON message │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! - **Length field**: 4-byte big-endian unsigned integer
//! - **Payload**: one serialized [`StreamMessage`]
//! - **Maximum message size**: 1 MiB; an oversized length closes the
//!   connection rather than allocating for it
//!
//! Postcard is the default: compact and fast for an 810-sample sweep at
//! 15 Hz. JSON is kept for debugging with a netcat and for quick
//! cross-language consumers.

use crate::error::{Error, Result};
use crate::streaming::messages::StreamMessage;

/// Length-prefix size in bytes
pub const FRAME_HEADER_LEN: usize = 4;

/// Hard ceiling on one framed payload
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// Binary format using postcard - fast and compact
    #[default]
    Postcard,
    /// JSON format - human-readable for debugging
    Json,
}

impl WireFormat {
    /// Parse a configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "postcard" => Some(Self::Postcard),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Serializer that can handle both formats
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    format: WireFormat,
}

impl Serializer {
    /// Create a new serializer for the given format
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    /// Serialize a message to payload bytes
    pub fn serialize(&self, msg: &StreamMessage) -> Result<Vec<u8>> {
        match self.format {
            WireFormat::Postcard => {
                postcard::to_allocvec(msg).map_err(|e| Error::Serialization(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::to_vec(msg).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }

    /// Deserialize payload bytes to a message
    pub fn deserialize(&self, bytes: &[u8]) -> Result<StreamMessage> {
        match self.format {
            WireFormat::Postcard => {
                postcard::from_bytes(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }
}

/// Wrap a payload in the length-prefixed envelope
pub fn frame(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(Error::Serialization(format!(
            "payload of {} bytes exceeds frame ceiling",
            payload.len()
        )));
    }
    let mut framed = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::messages::ScanFrame;
    use crate::types::{OverallZone, Sample, SampleZone};

    fn sample_message() -> StreamMessage {
        StreamMessage::ScanV1(ScanFrame {
            sequence: 3,
            timestamp_us: 123_456,
            angular_resolution_deg: 1.0,
            samples: vec![
                Sample {
                    distance_m: 0.35,
                    angle_index: 0,
                },
                Sample {
                    distance_m: 0.0,
                    angle_index: 1,
                },
            ],
            nearest_m: Some(0.35),
            overall: OverallZone::Danger,
            sample_zones: vec![SampleZone::Danger, SampleZone::Invalid],
        })
    }

    #[test]
    fn test_roundtrip_postcard() {
        let serializer = Serializer::new(WireFormat::Postcard);
        let msg = sample_message();
        let bytes = serializer.serialize(&msg).unwrap();
        assert_eq!(serializer.deserialize(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_roundtrip_json() {
        let serializer = Serializer::new(WireFormat::Json);
        let msg = sample_message();
        let bytes = serializer.serialize(&msg).unwrap();
        assert_eq!(serializer.deserialize(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_roundtrip_no_valid_returns() {
        // The infinity sentinel travels as None and must survive JSON.
        let serializer = Serializer::new(WireFormat::Json);
        let msg = StreamMessage::ScanV1(ScanFrame {
            sequence: 0,
            timestamp_us: 0,
            angular_resolution_deg: 1.0,
            samples: vec![],
            nearest_m: None,
            overall: OverallZone::Clear,
            sample_zones: vec![],
        });
        let bytes = serializer.serialize(&msg).unwrap();
        let frame = match serializer.deserialize(&bytes).unwrap() {
            StreamMessage::ScanV1(frame) => frame,
        };
        assert!(frame.nearest_distance().is_infinite(), "sentinel lost");
    }

    #[test]
    fn test_frame_envelope() {
        let framed = frame(b"abc").unwrap();
        assert_eq!(&framed[..4], &[0, 0, 0, 3]);
        assert_eq!(&framed[4..], b"abc");
    }

    #[test]
    fn test_frame_rejects_oversized() {
        let payload = vec![0u8; MAX_FRAME_BYTES + 1];
        assert!(frame(&payload).is_err());
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let serializer = Serializer::new(WireFormat::Postcard);
        assert!(serializer.deserialize(b"\xff\xff\xff\xff").is_err());
    }
}
