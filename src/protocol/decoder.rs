//! Scan telegram decoding
//!
//! A scan telegram is an ASCII token sequence:
//!
//! ```text
//! sSN LMDscandata <22 device/status fields> <angular step> <count> <count x distance> ...
//! ```
//!
//! Numeric fields are CoLa-A encoded: hexadecimal first, plain decimal as a
//! fallback. Distances are in millimeters and normalized to meters here.
//! Decoding is strict: any mismatch between the declared sample count, the
//! tokens actually present, and the negotiated resolution discards the whole
//! telegram. A partially wrong distance array feeding the obstacle
//! classifier is worse than a dropped frame.

use super::commands::AngularResolution;
use crate::error::{Error, Result};
use crate::types::{monotonic_us, Sample, Scan};

/// Token index of the angular step field (1/10000 degree)
const TOKEN_ANGULAR_STEP: usize = 24;

/// Token index of the declared sample count
const TOKEN_SAMPLE_COUNT: usize = 25;

/// Token index of the first distance value
const TOKEN_FIRST_SAMPLE: usize = 26;

const REPLY_TOKEN: &str = "sSN";
const SCAN_COMMAND: &str = "LMDscandata";

/// Decoder for `sSN LMDscandata` telegram payloads
pub struct ScanDecoder {
    resolution: AngularResolution,
}

impl ScanDecoder {
    pub fn new(resolution: AngularResolution) -> Self {
        Self { resolution }
    }

    /// Quick check whether a telegram payload is a scan-data event
    ///
    /// Used by the streaming loop to skip late acknowledgements and other
    /// unsolicited telegrams without raising decode errors.
    pub fn is_scan_telegram(payload: &[u8]) -> bool {
        let mut tokens = payload.split(|&b| b == b' ');
        tokens.next() == Some(REPLY_TOKEN.as_bytes())
            && tokens.next() == Some(SCAN_COMMAND.as_bytes())
    }

    /// Decode one telegram payload into a scan
    pub fn decode(&self, payload: &[u8]) -> Result<Scan> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| Error::Decode("telegram payload is not valid ASCII".into()))?;
        let tokens: Vec<&str> = text.split_ascii_whitespace().collect();

        if tokens.len() < TOKEN_FIRST_SAMPLE {
            return Err(Error::Decode(format!(
                "scan telegram truncated: {} tokens",
                tokens.len()
            )));
        }
        if tokens[0] != REPLY_TOKEN || tokens[1] != SCAN_COMMAND {
            return Err(Error::Decode(format!(
                "not a scan telegram: {} {}",
                tokens[0], tokens[1]
            )));
        }

        let step_deg = parse_number(tokens[TOKEN_ANGULAR_STEP])? as f64 / 10000.0;
        if (step_deg - self.resolution.degrees()).abs() > 0.01 {
            return Err(Error::Decode(format!(
                "angular step {:.4}° does not match negotiated {:.4}°",
                step_deg,
                self.resolution.degrees()
            )));
        }

        let declared = parse_number(tokens[TOKEN_SAMPLE_COUNT])? as usize;
        let expected = self.resolution.expected_samples();
        if declared != expected {
            return Err(Error::Decode(format!(
                "sample count {} inconsistent with {:.2}° resolution (expected {})",
                declared,
                self.resolution.degrees(),
                expected
            )));
        }

        // Distance tokens; trailing fields (RSSI block, device timestamps)
        // may follow and are ignored.
        let available = tokens.len() - TOKEN_FIRST_SAMPLE;
        if available < declared {
            return Err(Error::Decode(format!(
                "telegram declares {} samples but carries {}",
                declared, available
            )));
        }

        let mut samples = Vec::with_capacity(declared);
        for (i, token) in tokens[TOKEN_FIRST_SAMPLE..TOKEN_FIRST_SAMPLE + declared]
            .iter()
            .enumerate()
        {
            let distance_mm = parse_number(token)?;
            samples.push(Sample {
                distance_m: distance_mm as f64 / 1000.0,
                angle_index: i as u16,
            });
        }

        Ok(Scan {
            samples,
            angular_resolution_deg: step_deg,
            timestamp_us: monotonic_us(),
        })
    }
}

/// Parse a CoLa-A numeric token: hexadecimal first, decimal fallback
fn parse_number(token: &str) -> Result<i64> {
    i64::from_str_radix(token, 16)
        .or_else(|_| token.parse())
        .map_err(|_| Error::Decode(format!("unparsable numeric token: {:?}", token)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a scan telegram payload: header filler, hex step/count, hex
    /// distances in millimeters.
    fn scan_payload(step_10k_deg: u32, distances_mm: &[u32]) -> Vec<u8> {
        let mut tokens = vec!["sSN".to_string(), "LMDscandata".to_string()];
        tokens.extend(std::iter::repeat("0".to_string()).take(22));
        tokens.push(format!("{:X}", step_10k_deg));
        tokens.push(format!("{:X}", distances_mm.len()));
        tokens.extend(distances_mm.iter().map(|d| format!("{:X}", d)));
        tokens.join(" ").into_bytes()
    }

    fn decoder() -> ScanDecoder {
        ScanDecoder::new(AngularResolution::Deg10)
    }

    #[test]
    fn test_is_scan_telegram() {
        assert!(ScanDecoder::is_scan_telegram(b"sSN LMDscandata 1 1"));
        assert!(!ScanDecoder::is_scan_telegram(b"sAN SetAccessMode 1"));
        assert!(!ScanDecoder::is_scan_telegram(b""));
    }

    #[test]
    fn test_decode_full_sweep() {
        let mut distances = vec![1500u32; 270];
        distances[42] = 350; // nearest return at 0.35 m
        let payload = scan_payload(10000, &distances);

        let scan = decoder().decode(&payload).unwrap();
        assert_eq!(scan.len(), 270);
        assert!((scan.angular_resolution_deg - 1.0).abs() < 1e-9);
        assert!((scan.samples[42].distance_m - 0.35).abs() < 1e-9);
        assert!((scan.samples[0].distance_m - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_hex_distances() {
        // 0x3E8 mm = 1000 mm = 1.0 m
        let distances = vec![0x3E8u32; 270];
        let payload = scan_payload(10000, &distances);
        let scan = decoder().decode(&payload).unwrap();
        assert!((scan.samples[0].distance_m - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        // Declares 270 but carries 269 distance tokens.
        let mut payload = scan_payload(10000, &vec![1500u32; 270]);
        let cut = payload.iter().rposition(|&b| b == b' ').unwrap();
        payload.truncate(cut);

        let err = decoder().decode(&payload).unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn test_count_inconsistent_with_resolution_rejected() {
        // 540 samples is a 0.5° sweep; this decoder negotiated 1.0°.
        let payload = scan_payload(10000, &vec![1500u32; 540]);
        assert!(decoder().decode(&payload).is_err());
    }

    #[test]
    fn test_angular_step_mismatch_rejected() {
        let payload = scan_payload(5000, &vec![1500u32; 270]);
        assert!(decoder().decode(&payload).is_err());
    }

    #[test]
    fn test_unparsable_distance_rejected_whole() {
        let payload = scan_payload(10000, &vec![1500u32; 270]);
        let text = String::from_utf8(payload).unwrap();
        let bad = text.replacen("5DC", "zzz", 1);
        assert!(decoder().decode(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_trailing_fields_ignored() {
        let mut payload = scan_payload(10000, &vec![1500u32; 270]);
        payload.extend_from_slice(b" 0 0 0 DEADBEEF");
        let scan = decoder().decode(&payload).unwrap();
        assert_eq!(scan.len(), 270);
    }

    #[test]
    fn test_non_scan_telegram_rejected() {
        assert!(decoder().decode(b"sAN SetAccessMode 1").is_err());
    }

    #[test]
    fn test_zero_distance_preserved_as_invalid_marker() {
        let mut distances = vec![1500u32; 270];
        distances[0] = 0;
        let scan = decoder().decode(&scan_payload(10000, &distances)).unwrap();
        assert_eq!(scan.samples[0].distance_m, 0.0);
        assert!(!scan.samples[0].is_valid());
    }
}
