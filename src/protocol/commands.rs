//! CoLa-A command builders for the TiM handshake
//!
//! Three commands bring the sensor into continuous output:
//! 1. `sMN SetAccessMode` with the fixed client authorization code
//! 2. `sMN mLMPsetscancfg` selecting scan frequency and angular range
//! 3. `sEN LMDscandata 1` enabling the scan-data event stream

/// Telegram start delimiter
pub const STX: u8 = 0x02;

/// Telegram end delimiter
pub const ETX: u8 = 0x03;

/// Fixed authorized-client password for `SetAccessMode`
const ACCESS_CODE: &str = "F4724744";

/// Sweep start angle in 1/10000 degree, device units
const START_ANGLE: &str = "-450000";

/// Sweep stop angle in 1/10000 degree, device units
const STOP_ANGLE: &str = "+2250000";

/// Angular resolution of the 270° sweep
///
/// The TiM561 couples resolution to scan frequency, so each variant carries
/// its frequency code for `mLMPsetscancfg` and the sample count a conforming
/// scan telegram must declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngularResolution {
    /// 0.33° steps, 810 samples, 15 Hz
    Deg033,
    /// 0.5° steps, 540 samples, 25 Hz
    Deg05,
    /// 1.0° steps, 270 samples, 50 Hz
    Deg10,
}

impl AngularResolution {
    /// Match a configured resolution in degrees (0.33, 0.5 or 1.0)
    pub fn from_degrees(deg: f64) -> Option<Self> {
        if (deg - 0.33).abs() < 0.02 {
            Some(Self::Deg033)
        } else if (deg - 0.5).abs() < 0.02 {
            Some(Self::Deg05)
        } else if (deg - 1.0).abs() < 0.02 {
            Some(Self::Deg10)
        } else {
            None
        }
    }

    /// Step width in degrees
    pub fn degrees(self) -> f64 {
        SWEEP_RANGE / self.expected_samples() as f64
    }

    /// Frequency code for `mLMPsetscancfg`
    pub fn frequency_code(self) -> u8 {
        match self {
            Self::Deg033 => 1,
            Self::Deg05 => 2,
            Self::Deg10 => 3,
        }
    }

    /// Sample count a scan at this resolution must carry
    pub fn expected_samples(self) -> usize {
        match self {
            Self::Deg033 => 810,
            Self::Deg05 => 540,
            Self::Deg10 => 270,
        }
    }
}

const SWEEP_RANGE: f64 = 270.0;

/// Login command: request authorized-client access
pub fn login_command() -> Vec<u8> {
    wrap(&format!("sMN SetAccessMode 03 {}", ACCESS_CODE))
}

/// Scan configuration command for the given resolution
///
/// Interlace factor is fixed at `+1` and the angular range at the full 270°
/// sweep; the device rejects other combinations on this model.
pub fn scan_config_command(resolution: AngularResolution) -> Vec<u8> {
    wrap(&format!(
        "sMN mLMPsetscancfg +{} +1 {} {}",
        resolution.frequency_code(),
        START_ANGLE,
        STOP_ANGLE
    ))
}

/// Enable continuous scan-data output
pub fn start_scan_command() -> Vec<u8> {
    wrap("sEN LMDscandata 1")
}

fn wrap(body: &str) -> Vec<u8> {
    let mut telegram = Vec::with_capacity(body.len() + 2);
    telegram.push(STX);
    telegram.extend_from_slice(body.as_bytes());
    telegram.push(ETX);
    telegram
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_command_bytes() {
        assert_eq!(login_command(), b"\x02sMN SetAccessMode 03 F4724744\x03");
    }

    #[test]
    fn test_scan_config_encodes_frequency_code() {
        assert_eq!(
            scan_config_command(AngularResolution::Deg10),
            b"\x02sMN mLMPsetscancfg +3 +1 -450000 +2250000\x03"
        );
        assert_eq!(
            scan_config_command(AngularResolution::Deg033),
            b"\x02sMN mLMPsetscancfg +1 +1 -450000 +2250000\x03"
        );
    }

    #[test]
    fn test_no_trailing_nul() {
        // Only the Ethernet protocol variant appends a NUL; this one must not.
        assert_ne!(*start_scan_command().last().unwrap(), 0);
        assert_eq!(*start_scan_command().last().unwrap(), ETX);
    }

    #[test]
    fn test_resolution_table() {
        assert_eq!(AngularResolution::from_degrees(1.0), Some(AngularResolution::Deg10));
        assert_eq!(AngularResolution::from_degrees(0.5), Some(AngularResolution::Deg05));
        assert_eq!(AngularResolution::from_degrees(0.33), Some(AngularResolution::Deg033));
        assert_eq!(AngularResolution::from_degrees(0.25), None);

        assert_eq!(AngularResolution::Deg10.expected_samples(), 270);
        assert_eq!(AngularResolution::Deg05.expected_samples(), 540);
        assert_eq!(AngularResolution::Deg033.expected_samples(), 810);
        assert!((AngularResolution::Deg10.degrees() - 1.0).abs() < 1e-9);
    }
}
