//! Message dispatch onto the mirrored state
//!
//! Each recognized [`Message`] performs exactly one kind of mutation: a
//! matrix-level scalar, a field on one entity, or one preset slot. The
//! dispatcher returns the resulting [`StateChange`] values so the session
//! can invoke the notification callback after the mutation.
//!
//! Preset dumps are the one cross-line stateful parse in the grammar: a
//! `Preset nn Sta:` header arms the context register and the following
//! slot lines are attributed to that preset until the next header.

use blackbird_protocol::Message;
use tracing::debug;

use crate::events::{InputField, MatrixField, OutputField, OutputId, StateChange};
use crate::state::MatrixState;

/// Applies parsed status lines to the state mirror
#[derive(Debug, Default)]
pub struct Dispatcher {
    /// 1-based index of the preset currently being dumped, set by the most
    /// recent preset header. The handshake probes preset 9 even though only
    /// 8 are modeled; a header beyond the modeled range clears the register
    /// so stray slot lines are dropped instead of misattributed.
    current_preset: Option<u8>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one message, returning a change record per mutated field
    pub fn dispatch(&mut self, state: &mut MatrixState, message: Message) -> Vec<StateChange> {
        let mut changes = Vec::new();
        match message {
            Message::Version(v) => {
                state.version = Some(v);
                changes.push(StateChange::Matrix(MatrixField::Version));
            }
            Message::CpldVersion(v) => {
                state.cpld_version = Some(v);
                changes.push(StateChange::Matrix(MatrixField::CpldVersion));
            }
            Message::VideoDriverVersion(v) => {
                state.video_driver_version = Some(v);
                changes.push(StateChange::Matrix(MatrixField::VideoDriverVersion));
            }
            Message::Power(on) => {
                state.power = Some(on);
                changes.push(StateChange::Matrix(MatrixField::Power));
            }
            Message::HdbtPoc(on) => {
                state.hdbt_poc = Some(on);
                changes.push(StateChange::Matrix(MatrixField::HdbtPoc));
            }
            Message::FrontPanelLock(locked) => {
                state.front_panel_lock = Some(locked);
                changes.push(StateChange::Matrix(MatrixField::FrontPanelLock));
            }
            Message::IrFollowVideo(on) => {
                state.ir_follow_video = Some(on);
                changes.push(StateChange::Matrix(MatrixField::IrFollowVideo));
            }
            Message::Ip(ip) => {
                state.ip = Some(ip);
                changes.push(StateChange::Matrix(MatrixField::Ip));
            }
            Message::HdbtInputChanged { output, input } => {
                state.hdbt_outputs[output as usize - 1].input = Some(input);
                changes.push(StateChange::Output {
                    id: OutputId::Hdbt(output),
                    field: OutputField::Input,
                });
            }
            Message::OutputPowerChanged { output, on } => {
                if let Some((id, av)) = state.av_port_mut(output) {
                    av.power = Some(on);
                    changes.push(StateChange::Output { id, field: OutputField::Power });
                }
            }
            Message::DownscaleChanged { output, on } => {
                state.hdbt_outputs[output as usize - 1].downscale = Some(on);
                changes.push(StateChange::Output {
                    id: OutputId::Hdbt(output),
                    field: OutputField::Downscale,
                });
            }
            Message::Rs232RemoteMcuChanged { output, on } => {
                state.hdbt_outputs[output as usize - 1].rs232_remote_mcu = Some(on);
                changes.push(StateChange::Output {
                    id: OutputId::Hdbt(output),
                    field: OutputField::Rs232RemoteMcu,
                });
            }
            Message::IrRemoteMcuChanged { output, on } => {
                state.hdbt_outputs[output as usize - 1].ir_remote_mcu = Some(on);
                changes.push(StateChange::Output {
                    id: OutputId::Hdbt(output),
                    field: OutputField::IrRemoteMcu,
                });
            }
            Message::AnalogInputChanged { output, source } => {
                state.analog_outputs[output as usize - 1].input = Some(source);
                changes.push(StateChange::Output {
                    id: OutputId::Analog(output),
                    field: OutputField::Input,
                });
            }
            Message::AnalogMuteChanged { output, mute } => {
                state.analog_outputs[output as usize - 1].mute = Some(mute);
                changes.push(StateChange::Output {
                    id: OutputId::Analog(output),
                    field: OutputField::Mute,
                });
            }
            Message::AnalogVolumeChanged { output, volume } => {
                state.analog_outputs[output as usize - 1].volume = Some(volume);
                changes.push(StateChange::Output {
                    id: OutputId::Analog(output),
                    field: OutputField::Volume,
                });
            }
            Message::SpdifInputChanged { output, source } => {
                state.spdif_outputs[output as usize - 1].input = Some(source);
                changes.push(StateChange::Output {
                    id: OutputId::Spdif(output),
                    field: OutputField::Input,
                });
            }
            Message::IrInputChanged { output, input } => {
                state.ir_outputs[output as usize - 1].ir_input = Some(input);
                changes.push(StateChange::Output {
                    id: OutputId::Ir(output),
                    field: OutputField::IrInput,
                });
            }
            Message::InputLinks(links) => {
                for (i, link) in links.into_iter().enumerate() {
                    state.inputs[i].link = Some(link);
                    changes.push(StateChange::Input {
                        index: i as u8 + 1,
                        field: InputField::Link,
                    });
                }
            }
            Message::OutputLinks(links) => {
                for (i, link) in links.into_iter().enumerate() {
                    if let Some((id, av)) = state.av_port_mut(i as u8 + 1) {
                        av.link = Some(link);
                        changes.push(StateChange::Output { id, field: OutputField::Link });
                    }
                }
            }
            Message::InputEdidChanged { input, edid } => {
                state.inputs[input as usize - 1].edid = edid;
                changes.push(StateChange::Input { index: input, field: InputField::Edid });
            }
            Message::HdcpChanged { output, mode } => {
                if let Some((id, av)) = state.av_port_mut(output) {
                    av.hdcp = Some(mode);
                    changes.push(StateChange::Output { id, field: OutputField::Hdcp });
                }
            }
            Message::PresetHeader { preset } => {
                if (1..=8).contains(&preset) {
                    self.current_preset = Some(preset);
                } else {
                    debug!(preset, "preset status header beyond modeled range");
                    self.current_preset = None;
                }
            }
            Message::PresetSlot { slot, input } => match self.current_preset {
                Some(preset) => {
                    state.presets[preset as usize - 1].slots[slot as usize - 1] = Some(input);
                    changes.push(StateChange::PresetSlot { preset, slot });
                }
                None => debug!(slot, input, "preset slot line with no active header"),
            },
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use blackbird_protocol::{parse_line, HdcpMode, Message, ParsedLine};

    use super::*;

    fn apply(dispatcher: &mut Dispatcher, state: &mut MatrixState, line: &str) -> Vec<StateChange> {
        match parse_line(line) {
            ParsedLine::Message(message) => dispatcher.dispatch(state, message),
            other => panic!("expected a message for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn combined_address_translation() {
        let mut dispatcher = Dispatcher::new();
        let mut state = MatrixState::new();

        apply(&mut dispatcher, &mut state, "Turn ON Output 09!");
        assert_eq!(state.hdmi_outputs[0].av.power, Some(true));
        assert_eq!(state.hdbt_outputs[0].av.power, None);

        apply(&mut dispatcher, &mut state, "Turn OFF Output 08!");
        assert_eq!(state.hdbt_outputs[7].av.power, Some(false));

        apply(&mut dispatcher, &mut state, "OUT 12 HDCP PASSIVE!");
        assert_eq!(state.hdmi_outputs[3].av.hdcp, Some(HdcpMode::Passive));
    }

    #[test]
    fn sixteen_wide_link_table_attribution() {
        let mut dispatcher = Dispatcher::new();
        let mut state = MatrixState::new();

        let mut entries = ["N"; 16];
        entries[7] = "Y"; // wire 8 = HDBT output 8
        entries[8] = "Y"; // wire 9 = HDMI output 1
        let line = format!("LINK {}", entries.join("  "));
        let changes = apply(&mut dispatcher, &mut state, &line);

        assert_eq!(changes.len(), 16);
        assert_eq!(state.hdbt_outputs[7].av.link, Some(true));
        assert_eq!(state.hdmi_outputs[0].av.link, Some(true));
        assert_eq!(state.hdbt_outputs[0].av.link, Some(false));
        assert_eq!(state.hdmi_outputs[7].av.link, Some(false));
    }

    #[test]
    fn preset_context_register() {
        let mut dispatcher = Dispatcher::new();
        let mut state = MatrixState::new();

        apply(&mut dispatcher, &mut state, "Preset 03 Sta:");
        apply(&mut dispatcher, &mut state, "Out 01 in 05!");
        apply(&mut dispatcher, &mut state, "Out 02 in 06!");
        apply(&mut dispatcher, &mut state, "Out 03 in 07!");
        apply(&mut dispatcher, &mut state, "Preset 05 Sta:");
        apply(&mut dispatcher, &mut state, "Out 01 in 08!");

        assert_eq!(state.presets[2].slots[0], Some(5));
        assert_eq!(state.presets[2].slots[1], Some(6));
        assert_eq!(state.presets[2].slots[2], Some(7));
        assert_eq!(state.presets[2].slots[3], None);
        assert_eq!(state.presets[4].slots[0], Some(8));
        // preset 3 is untouched by the redirected slot line
        assert_eq!(state.presets[2].slots[0], Some(5));
    }

    #[test]
    fn slot_lines_without_a_header_are_dropped() {
        let mut dispatcher = Dispatcher::new();
        let mut state = MatrixState::new();

        let changes = apply(&mut dispatcher, &mut state, "Out 01 in 05!");
        assert!(changes.is_empty());
        assert!(state.presets.iter().all(|p| p.slots.iter().all(Option::is_none)));

        // a probe of the unmodeled ninth preset clears the register
        apply(&mut dispatcher, &mut state, "Preset 03 Sta:");
        apply(&mut dispatcher, &mut state, "Preset 09 Sta:");
        let changes = apply(&mut dispatcher, &mut state, "Out 01 in 05!");
        assert!(changes.is_empty());
        assert_eq!(state.presets[2].slots[0], None);
    }

    #[test]
    fn dispatch_is_idempotent() {
        let mut dispatcher = Dispatcher::new();
        let mut state = MatrixState::new();

        let first = apply(&mut dispatcher, &mut state, "Output 03 Switch To In 05!");
        let snapshot = state.clone();
        let second = apply(&mut dispatcher, &mut state, "Output 03 Switch To In 05!");

        assert_eq!(first, second);
        assert_eq!(state, snapshot);
        assert_eq!(state.hdbt_outputs[2].input, Some(5));
    }

    #[test]
    fn edid_beyond_documented_table_is_attributed_as_unknown() {
        let mut dispatcher = Dispatcher::new();
        let mut state = MatrixState::new();

        apply(&mut dispatcher, &mut state, "Input 02 EDID From 03 Internal EDID!");
        assert!(state.inputs[1].edid.is_some());

        // newer firmware reports profile indexes past the documented 7;
        // the assignment is still recorded, as unknown
        let changes = apply(&mut dispatcher, &mut state, "Input 02 EDID From 08 Internal EDID!");
        assert_eq!(
            changes,
            vec![StateChange::Input { index: 2, field: InputField::Edid }]
        );
        assert_eq!(state.inputs[1].edid, None);
    }

    #[test]
    fn matrix_scalars() {
        let mut dispatcher = Dispatcher::new();
        let mut state = MatrixState::new();

        let changes = apply(&mut dispatcher, &mut state, "Power OFF!");
        assert_eq!(changes, vec![StateChange::Matrix(MatrixField::Power)]);
        assert_eq!(state.power, Some(false));

        apply(&mut dispatcher, &mut state, "GUI_IP:10.0.0.2!");
        assert_eq!(state.ip.as_deref(), Some("10.0.0.2"));

        apply(&mut dispatcher, &mut state, "CPLD:V1.0.0");
        assert_eq!(state.cpld_version.as_deref(), Some("1.0.0"));
    }
}
