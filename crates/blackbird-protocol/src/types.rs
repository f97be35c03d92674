//! Shared value types for the matrix wire protocol

use std::fmt;
use std::str::FromStr;

use crate::error::CommandError;

/// Number of physical ports in each input/output category
pub const PORT_COUNT: u8 = 8;

/// HDCP handling mode for an HDMI-family output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HdcpMode {
    /// Follow whatever the attached display negotiates
    MatchDisplay,
    /// Passive HDCP handling
    Passive,
    /// Bypass HDCP processing entirely
    Bypass,
}

impl HdcpMode {
    /// Three-letter token used in encoded commands
    pub fn wire_token(&self) -> &'static str {
        match self {
            HdcpMode::MatchDisplay => "MAT",
            HdcpMode::Passive => "PAS",
            HdcpMode::Bypass => "BYP",
        }
    }

    /// Parse the mode text from a status line.
    ///
    /// Case-insensitive; some firmware revisions report "BYPASSS" with a
    /// doubled final S, which is normalized here.
    pub fn from_status_text(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "mat display" => Some(HdcpMode::MatchDisplay),
            "passive" => Some(HdcpMode::Passive),
            "bypass" | "bypasss" => Some(HdcpMode::Bypass),
            _ => None,
        }
    }
}

/// EDID capability profile assignable to an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdidProfile {
    Hd1080p2ch,
    Hd1080pMultich,
    Uhd30Hdr2ch,
    Uhd30HdrMultich,
    Uhd60Hdr2ch,
    Uhd60HdrMultich,
    UserDefined,
}

impl EdidProfile {
    /// Look up a profile by its 1-based wire index
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(EdidProfile::Hd1080p2ch),
            2 => Some(EdidProfile::Hd1080pMultich),
            3 => Some(EdidProfile::Uhd30Hdr2ch),
            4 => Some(EdidProfile::Uhd30HdrMultich),
            5 => Some(EdidProfile::Uhd60Hdr2ch),
            6 => Some(EdidProfile::Uhd60HdrMultich),
            7 => Some(EdidProfile::UserDefined),
            _ => None,
        }
    }

    /// The 1-based wire index of this profile
    pub fn index(&self) -> u8 {
        match self {
            EdidProfile::Hd1080p2ch => 1,
            EdidProfile::Hd1080pMultich => 2,
            EdidProfile::Uhd30Hdr2ch => 3,
            EdidProfile::Uhd30HdrMultich => 4,
            EdidProfile::Uhd60Hdr2ch => 5,
            EdidProfile::Uhd60HdrMultich => 6,
            EdidProfile::UserDefined => 7,
        }
    }

    /// Human-readable label as the device documentation names it
    pub fn label(&self) -> &'static str {
        match self {
            EdidProfile::Hd1080p2ch => "1080p 2CH",
            EdidProfile::Hd1080pMultich => "1080p MultiCH",
            EdidProfile::Uhd30Hdr2ch => "4K@30Hz HDR 2CH",
            EdidProfile::Uhd30HdrMultich => "4K@30Hz HDR MultiCH",
            EdidProfile::Uhd60Hdr2ch => "4K@60Hz HDR 2CH",
            EdidProfile::Uhd60HdrMultich => "4K@60Hz HDR MultiCH",
            EdidProfile::UserDefined => "User-defined",
        }
    }
}

impl fmt::Display for EdidProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Audio routing source for an analog output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AudioSource {
    /// Audio from video input N (1..=8)
    Input(u8),
    /// Audio from video output N (1..=8)
    Output(u8),
}

impl AudioSource {
    /// Numeric encoding used on the wire: inputs map to 1..=8, outputs
    /// shift up by 8 to 9..=16
    pub fn wire_value(&self) -> Result<u8, CommandError> {
        match *self {
            AudioSource::Input(n) => check_source_index(n).map(|_| n),
            AudioSource::Output(n) => check_source_index(n).map(|_| n + 8),
        }
    }
}

impl FromStr for AudioSource {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CommandError::InvalidSource(s.to_string());
        if let Some(digit) = s.strip_prefix("in") {
            let n = digit.parse::<u8>().map_err(|_| err())?;
            check_source_index(n)?;
            Ok(AudioSource::Input(n))
        } else if let Some(digit) = s.strip_prefix("out") {
            let n = digit.parse::<u8>().map_err(|_| err())?;
            check_source_index(n)?;
            Ok(AudioSource::Output(n))
        } else {
            Err(err())
        }
    }
}

/// Audio routing source for an S/PDIF output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpdifSource {
    /// Audio from video input N (1..=8)
    Input(u8),
    /// Audio from video output N (1..=8)
    Output(u8),
    /// Audio return channel from output N (1..=8)
    Arc(u8),
}

impl SpdifSource {
    /// Numeric encoding used on the wire: inputs 1..=8, outputs +8,
    /// ARC channels +16
    pub fn wire_value(&self) -> Result<u8, CommandError> {
        match *self {
            SpdifSource::Input(n) => check_source_index(n).map(|_| n),
            SpdifSource::Output(n) => check_source_index(n).map(|_| n + 8),
            SpdifSource::Arc(n) => check_source_index(n).map(|_| n + 16),
        }
    }
}

impl FromStr for SpdifSource {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CommandError::InvalidSource(s.to_string());
        let (make, digit): (fn(u8) -> SpdifSource, &str) =
            if let Some(d) = s.strip_prefix("in") {
                (SpdifSource::Input, d)
            } else if let Some(d) = s.strip_prefix("out") {
                (SpdifSource::Output, d)
            } else if let Some(d) = s.strip_prefix("arc") {
                (SpdifSource::Arc, d)
            } else {
                return Err(err());
            };
        let n = digit.parse::<u8>().map_err(|_| err())?;
        check_source_index(n)?;
        Ok(make(n))
    }
}

/// Volume intent for an analog output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VolumeCommand {
    /// One step up
    Up,
    /// One step down
    Down,
    /// Absolute level 0..=100
    Level(u8),
}

fn check_source_index(n: u8) -> Result<(), CommandError> {
    if (1..=PORT_COUNT).contains(&n) {
        Ok(())
    } else {
        Err(CommandError::InputOutOfRange(n))
    }
}

/// Strict dotted-quad check for IP assignment and IP status lines
pub(crate) fn is_dotted_quad(s: &str) -> bool {
    let mut octets = 0;
    for part in s.split('.') {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        octets += 1;
    }
    octets == 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdcp_status_text_variants() {
        assert_eq!(
            HdcpMode::from_status_text("MAT Display"),
            Some(HdcpMode::MatchDisplay)
        );
        assert_eq!(HdcpMode::from_status_text("passive"), Some(HdcpMode::Passive));
        assert_eq!(HdcpMode::from_status_text("BYPASS"), Some(HdcpMode::Bypass));
        // firmware typo with a third S
        assert_eq!(HdcpMode::from_status_text("BYPASSS"), Some(HdcpMode::Bypass));
        assert_eq!(HdcpMode::from_status_text("open"), None);
    }

    #[test]
    fn audio_source_tokens() {
        assert_eq!("in3".parse::<AudioSource>(), Ok(AudioSource::Input(3)));
        assert_eq!("out5".parse::<AudioSource>(), Ok(AudioSource::Output(5)));
        assert!("out9".parse::<AudioSource>().is_err());
        assert!("arc1".parse::<AudioSource>().is_err());
    }

    #[test]
    fn spdif_source_wire_values() {
        assert_eq!(SpdifSource::Input(3).wire_value(), Ok(3));
        assert_eq!(SpdifSource::Output(3).wire_value(), Ok(11));
        assert_eq!(SpdifSource::Arc(3).wire_value(), Ok(19));
        assert_eq!("arc8".parse::<SpdifSource>(), Ok(SpdifSource::Arc(8)));
    }

    #[test]
    fn edid_profile_round_trip() {
        for index in 1..=7 {
            let profile = EdidProfile::from_index(index).unwrap();
            assert_eq!(profile.index(), index);
        }
        assert_eq!(EdidProfile::from_index(0), None);
        assert_eq!(EdidProfile::from_index(8), None);
        assert_eq!(EdidProfile::Uhd60Hdr2ch.label(), "4K@60Hz HDR 2CH");
    }

    #[test]
    fn dotted_quad() {
        assert!(is_dotted_quad("192.168.1.100"));
        assert!(is_dotted_quad("0.0.0.0"));
        assert!(!is_dotted_quad("192.168.1"));
        assert!(!is_dotted_quad("192.168.1.1.1"));
        assert!(!is_dotted_quad("192.168.1.x"));
        assert!(!is_dotted_quad("192.168..1"));
    }
}
