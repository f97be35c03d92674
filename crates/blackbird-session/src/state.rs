//! Mirrored device state
//!
//! The session keeps an in-memory mirror of everything the device reports.
//! Only the dispatcher mutates it, and only while processing status lines;
//! callers get a shared borrow or a [`MatrixState::clone`] snapshot.
//!
//! Staleness contract: a field reflects the most recent status line the
//! device pushed for it, not the most recent command sent. Setter commands
//! update the mirror asynchronously, once the device confirms. A field is
//! `None` until the first status line that mentions it arrives.

use blackbird_protocol::{AudioSource, EdidProfile, HdcpMode, SpdifSource, PORT_COUNT};

use crate::events::OutputId;

/// One physical video input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// 1-based port index
    pub index: u8,
    /// Observed physical link state
    pub link: Option<bool>,
    /// Assigned EDID profile; `None` when unobserved or when the device
    /// reported a profile index outside the documented table
    pub edid: Option<EdidProfile>,
}

impl Input {
    fn new(index: u8) -> Self {
        Self { index, link: None, edid: None }
    }
}

/// Power/link/HDCP telemetry shared by every HDMI-family output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvPort {
    pub power: Option<bool>,
    pub link: Option<bool>,
    pub hdcp: Option<HdcpMode>,
}

/// A plain HDMI output (combined wire address 9..=16)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdmiOutput {
    /// 1-based local index
    pub index: u8,
    /// Shared power/link/HDCP telemetry
    pub av: AvPort,
}

impl HdmiOutput {
    fn new(index: u8) -> Self {
        Self { index, av: AvPort::default() }
    }

    /// Address as it appears in combined 1..=16 protocol text
    pub fn wire_address(&self) -> u8 {
        self.index + PORT_COUNT
    }
}

/// An HDBaseT output (combined wire address 1..=8)
///
/// Shares the HDMI telemetry set and adds input routing plus the
/// remote-control forwarding flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdbtOutput {
    /// 1-based local index
    pub index: u8,
    /// Shared power/link/HDCP telemetry
    pub av: AvPort,
    /// Selected video input (1..=8)
    pub input: Option<u8>,
    /// 4K-to-1080p downscale
    pub downscale: Option<bool>,
    /// RS232 traffic forwarded to the remote receiver MCU
    pub rs232_remote_mcu: Option<bool>,
    /// IR traffic forwarded to the remote receiver MCU
    pub ir_remote_mcu: Option<bool>,
}

impl HdbtOutput {
    fn new(index: u8) -> Self {
        Self {
            index,
            av: AvPort::default(),
            input: None,
            downscale: None,
            rs232_remote_mcu: None,
            ir_remote_mcu: None,
        }
    }

    /// HDBT outputs keep their local index on the wire
    pub fn wire_address(&self) -> u8 {
        self.index
    }
}

/// An analog audio output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogOutput {
    pub index: u8,
    pub input: Option<AudioSource>,
    pub mute: Option<bool>,
    /// Volume 0..=100
    pub volume: Option<u8>,
}

impl AnalogOutput {
    fn new(index: u8) -> Self {
        Self { index, input: None, mute: None, volume: None }
    }
}

/// An S/PDIF audio output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpdifOutput {
    pub index: u8,
    pub input: Option<SpdifSource>,
}

impl SpdifOutput {
    fn new(index: u8) -> Self {
        Self { index, input: None }
    }
}

/// A local IR output, routed from an HDMI-family output's IR channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrOutput {
    pub index: u8,
    pub ir_input: Option<u8>,
}

impl IrOutput {
    fn new(index: u8) -> Self {
        Self { index, ir_input: None }
    }
}

/// Read-only mirror of one device-stored routing preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    /// 1-based preset index
    pub index: u8,
    /// Selected input per HDBT output, slot N at `slots[N - 1]`
    pub slots: [Option<u8>; PORT_COUNT as usize],
}

impl Preset {
    fn new(index: u8) -> Self {
        Self { index, slots: [None; PORT_COUNT as usize] }
    }

    /// Reset every slot to unknown
    pub fn clear(&mut self) {
        self.slots = [None; PORT_COUNT as usize];
    }
}

/// The full mirrored state of one matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixState {
    /// Device name as reported during the handshake
    pub name: Option<String>,
    /// Device type string as reported during the handshake
    pub device_type: Option<String>,
    pub version: Option<String>,
    pub cpld_version: Option<String>,
    pub video_driver_version: Option<String>,
    /// Tri-state: unknown until the first power status line
    pub power: Option<bool>,
    pub hdbt_poc: Option<bool>,
    pub front_panel_lock: Option<bool>,
    pub ip: Option<String>,
    pub ir_follow_video: Option<bool>,
    pub inputs: [Input; 8],
    pub hdbt_outputs: [HdbtOutput; 8],
    pub hdmi_outputs: [HdmiOutput; 8],
    pub analog_outputs: [AnalogOutput; 8],
    pub spdif_outputs: [SpdifOutput; 8],
    pub ir_outputs: [IrOutput; 8],
    pub presets: [Preset; 8],
}

impl MatrixState {
    pub fn new() -> Self {
        Self {
            name: None,
            device_type: None,
            version: None,
            cpld_version: None,
            video_driver_version: None,
            power: None,
            hdbt_poc: None,
            front_panel_lock: None,
            ip: None,
            ir_follow_video: None,
            inputs: std::array::from_fn(|i| Input::new(i as u8 + 1)),
            hdbt_outputs: std::array::from_fn(|i| HdbtOutput::new(i as u8 + 1)),
            hdmi_outputs: std::array::from_fn(|i| HdmiOutput::new(i as u8 + 1)),
            analog_outputs: std::array::from_fn(|i| AnalogOutput::new(i as u8 + 1)),
            spdif_outputs: std::array::from_fn(|i| SpdifOutput::new(i as u8 + 1)),
            ir_outputs: std::array::from_fn(|i| IrOutput::new(i as u8 + 1)),
            presets: std::array::from_fn(|i| Preset::new(i as u8 + 1)),
        }
    }

    /// Resolve a combined 1..=16 output wire address to the shared
    /// telemetry record it denotes: 1..=8 are HDBT outputs, 9..=16 are
    /// plain HDMI outputs at (address - 8).
    pub(crate) fn av_port_mut(&mut self, address: u8) -> Option<(OutputId, &mut AvPort)> {
        match address {
            1..=8 => {
                let output = &mut self.hdbt_outputs[address as usize - 1];
                Some((OutputId::Hdbt(output.index), &mut output.av))
            }
            9..=16 => {
                let output = &mut self.hdmi_outputs[address as usize - 9];
                Some((OutputId::Hdmi(output.index), &mut output.av))
            }
            _ => None,
        }
    }
}

impl Default for MatrixState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_addressing() {
        let state = MatrixState::new();
        assert_eq!(state.hdbt_outputs[0].wire_address(), 1);
        assert_eq!(state.hdbt_outputs[7].wire_address(), 8);
        assert_eq!(state.hdmi_outputs[0].wire_address(), 9);
        assert_eq!(state.hdmi_outputs[7].wire_address(), 16);
    }

    #[test]
    fn combined_address_resolution() {
        let mut state = MatrixState::new();
        let (id, _) = state.av_port_mut(8).unwrap();
        assert_eq!(id, OutputId::Hdbt(8));
        let (id, _) = state.av_port_mut(9).unwrap();
        assert_eq!(id, OutputId::Hdmi(1));
        assert!(state.av_port_mut(0).is_none());
        assert!(state.av_port_mut(17).is_none());
    }

    #[test]
    fn preset_clear_resets_every_slot() {
        let mut preset = Preset::new(1);
        preset.slots[2] = Some(4);
        preset.slots[7] = Some(1);
        preset.clear();
        assert_eq!(preset.slots, [None; 8]);
    }
}
