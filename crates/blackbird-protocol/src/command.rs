//! Typed commands and their exact wire encodings
//!
//! Every command the matrix accepts is a short ASCII string terminated by a
//! literal `.` with all numeric fields zero-padded to two digits. `encode`
//! validates operand and address domains before producing the string, so a
//! rejected command never causes any bytes to be written.

use crate::error::CommandError;
use crate::types::{is_dotted_quad, AudioSource, HdcpMode, SpdifSource, VolumeCommand};

/// Highest combined HDMI/HDBT output wire address (1..=8 HDBT, 9..=16 HDMI)
pub const MAX_COMBINED_OUTPUT: u8 = 16;

/// Highest HDBT-local output address
pub const MAX_LOCAL_OUTPUT: u8 = 8;

/// Highest preset index the status probe requests
pub const MAX_PRESET_PROBE: u8 = 9;

/// A command the session can send to the matrix
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Matrix power: `PowerON.` / `PowerOFF.`
    Power(bool),
    /// Power-over-cable for HDBT ports: `PHDBTON.` / `PHDBTOFF.`
    HdbtPoc(bool),
    /// Front panel button lock: `Lock.` / `Unlock.`
    FrontPanelLock(bool),
    /// Assign the GUI IP address: `SetGuiIP:<ip>.`
    SetIp(String),
    /// IR routing follows video routing: `IRFVON.` / `IRFVOFF.`
    IrFollowVideo(bool),
    /// Output power by combined wire address (0 = all): `@OUTnn.` / `$OUTnn.`
    OutputPower { on: bool, output: u8 },
    /// Output HDCP mode by combined wire address: `HDCPnnMAT.` etc.
    OutputHdcp { mode: HdcpMode, output: u8 },
    /// Route a video input to an HDBT output (0 = all): `OUTnn:nn.`
    HdbtInput { input: u8, output: u8 },
    /// 4K-to-1080p downscale on an HDBT output: `DSnnON.` / `DSnnOFF.`
    HdbtDownscale { on: bool, output: u8 },
    /// Forward RS232 to the remote receiver MCU: `RS232RCMnnON.` / `...OFF.`
    HdbtRs232RemoteMcu { on: bool, output: u8 },
    /// Forward IR to the remote receiver MCU: `IRRCMnnON.` / `...OFF.`
    HdbtIrRemoteMcu { on: bool, output: u8 },
    /// Route an audio source to an analog output: `ANALOGnn:nn.`
    AnalogInput { source: AudioSource, output: u8 },
    /// Mute an analog output: `AVOLUMEnn:MU.` / `AVOLUMEnn:UM.`
    AnalogMute { on: bool, output: u8 },
    /// Analog output volume: `AVOLUMEnn:V+.` / `:V-.` / `:nn.`
    AnalogVolume { volume: VolumeCommand, output: u8 },
    /// Route an audio source to an S/PDIF output: `SPDIFnn:nn.`
    SpdifInput { source: SpdifSource, output: u8 },
    /// Route an HDMI-family IR channel to a local IR output: `IRnn:nn.`
    IrInput { input: u8, output: u8 },
    /// Query the device name: `/*Name.`
    QueryName,
    /// Query the device type: `/*Type.`
    QueryType,
    /// Query firmware/CPLD/video-driver versions: `/^Version.`
    QueryVersion,
    /// Query full status: `STA.`
    QueryStatus,
    /// Query input status only: `STA_IN.`
    QueryInputStatus,
    /// Query output status only: `STA_OUT.`
    QueryOutputStatus,
    /// Query one stored preset: `PresetStann.`
    QueryPresetStatus(u8),
}

impl Command {
    /// Validate this command and produce its exact wire string.
    ///
    /// Out-of-domain operands surface as [`CommandError`] before any byte
    /// would reach the transport.
    pub fn encode(&self) -> Result<String, CommandError> {
        let body = match self {
            Command::Power(on) => on_off("Power", *on),
            Command::HdbtPoc(on) => on_off("PHDBT", *on),
            Command::FrontPanelLock(lock) => {
                if *lock { "Lock".to_string() } else { "Unlock".to_string() }
            }
            Command::SetIp(ip) => {
                if !is_dotted_quad(ip) {
                    return Err(CommandError::InvalidIp(ip.clone()));
                }
                format!("SetGuiIP:{ip}")
            }
            Command::IrFollowVideo(on) => on_off("IRFV", *on),
            Command::OutputPower { on, output } => {
                check_output(*output, MAX_COMBINED_OUTPUT)?;
                format!("{}OUT{output:02}", if *on { '@' } else { '$' })
            }
            Command::OutputHdcp { mode, output } => {
                check_output(*output, MAX_COMBINED_OUTPUT)?;
                format!("HDCP{output:02}{}", mode.wire_token())
            }
            Command::HdbtInput { input, output } => {
                check_input(*input)?;
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                format!("OUT{output:02}:{input:02}")
            }
            Command::HdbtDownscale { on, output } => {
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                on_off(&format!("DS{output:02}"), *on)
            }
            Command::HdbtRs232RemoteMcu { on, output } => {
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                on_off(&format!("RS232RCM{output:02}"), *on)
            }
            Command::HdbtIrRemoteMcu { on, output } => {
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                on_off(&format!("IRRCM{output:02}"), *on)
            }
            Command::AnalogInput { source, output } => {
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                format!("ANALOG{output:02}:{:02}", source.wire_value()?)
            }
            Command::AnalogMute { on, output } => {
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                format!("AVOLUME{output:02}:{}", if *on { "MU" } else { "UM" })
            }
            Command::AnalogVolume { volume, output } => {
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                let value = match volume {
                    VolumeCommand::Up => "V+".to_string(),
                    VolumeCommand::Down => "V-".to_string(),
                    VolumeCommand::Level(level) => {
                        if *level > 100 {
                            return Err(CommandError::VolumeOutOfRange(*level));
                        }
                        format!("{level:02}")
                    }
                };
                format!("AVOLUME{output:02}:{value}")
            }
            Command::SpdifInput { source, output } => {
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                format!("SPDIF{output:02}:{:02}", source.wire_value()?)
            }
            Command::IrInput { input, output } => {
                check_input(*input)?;
                check_output(*output, MAX_LOCAL_OUTPUT)?;
                format!("IR{output:02}:{input:02}")
            }
            Command::QueryName => "/*Name".to_string(),
            Command::QueryType => "/*Type".to_string(),
            Command::QueryVersion => "/^Version".to_string(),
            Command::QueryStatus => "STA".to_string(),
            Command::QueryInputStatus => "STA_IN".to_string(),
            Command::QueryOutputStatus => "STA_OUT".to_string(),
            Command::QueryPresetStatus(preset) => {
                if !(1..=MAX_PRESET_PROBE).contains(preset) {
                    return Err(CommandError::PresetOutOfRange(*preset));
                }
                format!("PresetSta{preset:02}")
            }
        };
        Ok(format!("{body}."))
    }

    /// Whether this is the power-on command, the only one the session will
    /// send while the device is known to be powered off
    pub fn is_power_on(&self) -> bool {
        matches!(self, Command::Power(true))
    }
}

fn on_off(prefix: &str, on: bool) -> String {
    format!("{prefix}{}", if on { "ON" } else { "OFF" })
}

fn check_output(output: u8, max: u8) -> Result<(), CommandError> {
    // 0 addresses all outputs at once
    if output <= max {
        Ok(())
    } else {
        Err(CommandError::OutputOutOfRange { output, min: 0, max })
    }
}

fn check_input(input: u8) -> Result<(), CommandError> {
    if (1..=8).contains(&input) {
        Ok(())
    } else {
        Err(CommandError::InputOutOfRange(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(command: Command) -> String {
        command.encode().unwrap()
    }

    #[test]
    fn matrix_level_commands() {
        assert_eq!(encoded(Command::Power(true)), "PowerON.");
        assert_eq!(encoded(Command::Power(false)), "PowerOFF.");
        assert_eq!(encoded(Command::HdbtPoc(true)), "PHDBTON.");
        assert_eq!(encoded(Command::FrontPanelLock(true)), "Lock.");
        assert_eq!(encoded(Command::FrontPanelLock(false)), "Unlock.");
        assert_eq!(encoded(Command::IrFollowVideo(false)), "IRFVOFF.");
        assert_eq!(
            encoded(Command::SetIp("192.168.1.100".into())),
            "SetGuiIP:192.168.1.100."
        );
    }

    #[test]
    fn ip_validation() {
        for bad in ["192.168.1", "1.2.3.4.5", "a.b.c.d", "1.2.3.1000", ""] {
            assert!(matches!(
                Command::SetIp(bad.into()).encode(),
                Err(CommandError::InvalidIp(_))
            ));
        }
    }

    #[test]
    fn output_power_and_hdcp() {
        assert_eq!(
            encoded(Command::OutputPower { on: true, output: 9 }),
            "@OUT09."
        );
        assert_eq!(
            encoded(Command::OutputPower { on: false, output: 0 }),
            "$OUT00."
        );
        assert_eq!(
            encoded(Command::OutputHdcp { mode: HdcpMode::Passive, output: 3 }),
            "HDCP03PAS."
        );
        assert_eq!(
            encoded(Command::OutputHdcp { mode: HdcpMode::MatchDisplay, output: 16 }),
            "HDCP16MAT."
        );
        // truncation must stay at three letters for bypass
        assert_eq!(
            encoded(Command::OutputHdcp { mode: HdcpMode::Bypass, output: 1 }),
            "HDCP01BYP."
        );
        assert!(Command::OutputPower { on: true, output: 17 }.encode().is_err());
    }

    #[test]
    fn hdbt_routing_and_flags() {
        assert_eq!(
            encoded(Command::HdbtInput { input: 5, output: 3 }),
            "OUT03:05."
        );
        assert_eq!(
            encoded(Command::HdbtDownscale { on: true, output: 2 }),
            "DS02ON."
        );
        assert_eq!(
            encoded(Command::HdbtRs232RemoteMcu { on: false, output: 8 }),
            "RS232RCM08OFF."
        );
        assert_eq!(
            encoded(Command::HdbtIrRemoteMcu { on: true, output: 0 }),
            "IRRCM00ON."
        );
        assert!(Command::HdbtInput { input: 0, output: 1 }.encode().is_err());
        assert!(Command::HdbtInput { input: 9, output: 1 }.encode().is_err());
        assert!(Command::HdbtInput { input: 1, output: 9 }.encode().is_err());
    }

    #[test]
    fn analog_commands() {
        // out-tagged sources shift up by 8
        assert_eq!(
            encoded(Command::AnalogInput { source: AudioSource::Output(5), output: 2 }),
            "ANALOG02:13."
        );
        assert_eq!(
            encoded(Command::AnalogInput { source: AudioSource::Input(1), output: 8 }),
            "ANALOG08:01."
        );
        assert_eq!(
            encoded(Command::AnalogMute { on: true, output: 4 }),
            "AVOLUME04:MU."
        );
        assert_eq!(
            encoded(Command::AnalogMute { on: false, output: 4 }),
            "AVOLUME04:UM."
        );
        assert_eq!(
            encoded(Command::AnalogVolume { volume: VolumeCommand::Level(57), output: 2 }),
            "AVOLUME02:57."
        );
        assert_eq!(
            encoded(Command::AnalogVolume { volume: VolumeCommand::Level(7), output: 2 }),
            "AVOLUME02:07."
        );
        assert_eq!(
            encoded(Command::AnalogVolume { volume: VolumeCommand::Up, output: 1 }),
            "AVOLUME01:V+."
        );
        assert_eq!(
            encoded(Command::AnalogVolume { volume: VolumeCommand::Down, output: 1 }),
            "AVOLUME01:V-."
        );
        assert!(matches!(
            Command::AnalogVolume { volume: VolumeCommand::Level(101), output: 1 }.encode(),
            Err(CommandError::VolumeOutOfRange(101))
        ));
    }

    #[test]
    fn spdif_and_ir_commands() {
        assert_eq!(
            encoded(Command::SpdifInput { source: SpdifSource::Arc(3), output: 6 }),
            "SPDIF06:19."
        );
        assert_eq!(
            encoded(Command::SpdifInput { source: SpdifSource::Output(2), output: 1 }),
            "SPDIF01:10."
        );
        assert_eq!(encoded(Command::IrInput { input: 7, output: 4 }), "IR04:07.");
    }

    #[test]
    fn query_commands() {
        assert_eq!(encoded(Command::QueryName), "/*Name.");
        assert_eq!(encoded(Command::QueryType), "/*Type.");
        assert_eq!(encoded(Command::QueryVersion), "/^Version.");
        assert_eq!(encoded(Command::QueryStatus), "STA.");
        assert_eq!(encoded(Command::QueryInputStatus), "STA_IN.");
        assert_eq!(encoded(Command::QueryOutputStatus), "STA_OUT.");
        assert_eq!(encoded(Command::QueryPresetStatus(9)), "PresetSta09.");
        assert!(Command::QueryPresetStatus(0).encode().is_err());
        assert!(Command::QueryPresetStatus(10).encode().is_err());
    }

    #[test]
    fn every_encoding_ends_with_a_single_period() {
        let commands = [
            Command::Power(true),
            Command::HdbtInput { input: 1, output: 1 },
            Command::AnalogVolume { volume: VolumeCommand::Level(100), output: 8 },
            Command::QueryPresetStatus(1),
        ];
        for command in commands {
            let wire = command.encode().unwrap();
            assert!(wire.ends_with('.'));
            assert!(!wire.ends_with(".."));
            assert!(!wire.contains('\n'));
        }
    }

    proptest! {
        #[test]
        fn output_domain_is_exact(output in 0u8..=255) {
            let result = Command::OutputPower { on: true, output }.encode();
            if output <= 16 {
                prop_assert_eq!(
                    result.unwrap(),
                    format!("@OUT{:02}.", output)
                );
            } else {
                prop_assert!(result.is_err());
            }
        }

        #[test]
        fn volume_domain_is_exact(level in 0u8..=255) {
            let result = Command::AnalogVolume {
                volume: VolumeCommand::Level(level),
                output: 1,
            }
            .encode();
            if level <= 100 {
                prop_assert_eq!(result.unwrap(), format!("AVOLUME01:{:02}.", level));
            } else {
                prop_assert!(result.is_err());
            }
        }
    }
}
