//! Response line grammar
//!
//! The matrix pushes one status line per state change, both as command
//! confirmations and unsolicited (front panel presses, link changes, preset
//! recalls). Lines are matched against an ordered list of recognizers with
//! early exit on first match. Unknown lines are reported as
//! [`ParsedLine::Unrecognized`] rather than an error: newer firmware adds
//! line shapes and a healthy session must survive them.
//!
//! A handful of lines carry no state and are matched-and-ignored (the
//! status dump banner, link table headers, the baud rate notice). Those
//! count as consumed, not unrecognized.

use crate::types::{is_dotted_quad, AudioSource, EdidProfile, HdcpMode, SpdifSource};

/// A recognized device status line
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    /// `V1.0.1` firmware version
    Version(String),
    /// `CPLD:V1.0.0`
    CpldVersion(String),
    /// `VideoDriverVersion:V2.0.0`
    VideoDriverVersion(String),
    /// `Power ON!` / `Power OFF!`
    Power(bool),
    /// `HDBT Power ON!` / `HDBT Power OFF!`
    HdbtPoc(bool),
    /// `Front Panel Locked!` / `Front Panel UnLock!`
    FrontPanelLock(bool),
    /// `IR Follow Video ON!` / `IR Follow Video OFF!`
    IrFollowVideo(bool),
    /// `GUI_IP:192.168.1.100!`
    Ip(String),
    /// `Output 03 Switch To In 05!` (HDBT-local address 1..=8)
    HdbtInputChanged { output: u8, input: u8 },
    /// `Turn ON Output 09!` (combined address 1..=16)
    OutputPowerChanged { output: u8, on: bool },
    /// `HDMI OUT 03 Down Scale ON!` (HDBT-local address)
    DownscaleChanged { output: u8, on: bool },
    /// `RS232 Remote 03 Control MCU ON!` (HDBT-local address)
    Rs232RemoteMcuChanged { output: u8, on: bool },
    /// `IR Remote 03 Control MCU ON!` (HDBT-local address)
    IrRemoteMcuChanged { output: u8, on: bool },
    /// `Analog Out 02 Switch To Video Out 05!`
    AnalogInputChanged { output: u8, source: AudioSource },
    /// `Analog Out 02 Volume Mute!` / `... Volume UnMute!`
    AnalogMuteChanged { output: u8, mute: bool },
    /// `Analog Out 02 Volume 57!`
    AnalogVolumeChanged { output: u8, volume: u8 },
    /// `SPDIF Out 06 Switch To ARC 03!`
    SpdifInputChanged { output: u8, source: SpdifSource },
    /// `Local 02 IR Out Switch To Remote 05 IR IN!`
    IrInputChanged { output: u8, input: u8 },
    /// `LINK Y  N  ...` with 8 entries, attributed to inputs
    InputLinks([bool; 8]),
    /// `LINK Y  N  ...` with 16 entries, attributed to outputs by
    /// combined wire address
    OutputLinks([bool; 16]),
    /// `Input 01 EDID Upgrade OK By 03 Internal EDID!` or
    /// `Input 01 EDID From 03 Internal EDID!`; a profile index outside the
    /// documented table is attributed as `None` rather than rejected, since
    /// newer firmware ships more profiles
    InputEdidChanged { input: u8, edid: Option<EdidProfile> },
    /// `OUT 03 HDCP PASSIVE!` (combined address, case-insensitive mode)
    HdcpChanged { output: u8, mode: HdcpMode },
    /// `Preset 03 Sta:` opens a preset dump; following slot lines belong
    /// to this preset
    PresetHeader { preset: u8 },
    /// `Out 01 in 05!` one slot of the current preset dump
    PresetSlot { slot: u8, input: u8 },
}

/// Outcome of matching one complete line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// The line matched a recognizer and carries state
    Message(Message),
    /// The line matched a recognizer but intentionally carries no state
    Ignored,
    /// No recognizer matched; the caller should log and drop the line
    Unrecognized,
}

const QUERY_BANNER: &str = "GUI Or RS232 Query Status:";
const INPUT_TABLE_HEADER: &str = "IN   1  2  3  4  5  6  7  8";
const OUTPUT_TABLE_HEADER: &str = "OUT  1  2  3  4  5  6  7  8  9  10 11 12 13 14 15 16";

/// Match one complete line against the grammar.
///
/// Recognizers run in a fixed order with early exit on first match;
/// the order mirrors the device grammar, most specific shapes first.
pub fn parse_line(line: &str) -> ParsedLine {
    if line == QUERY_BANNER || line == INPUT_TABLE_HEADER || line == OUTPUT_TABLE_HEADER {
        return ParsedLine::Ignored;
    }
    if is_baud_notice(line) {
        return ParsedLine::Ignored;
    }

    let recognizers: [fn(&str) -> Option<Message>; 16] = [
        try_version,
        try_boolean_state,
        try_ip,
        try_hdbt_input,
        try_output_power,
        try_downscale,
        try_rs232_remote_mcu,
        try_ir_remote_mcu,
        try_analog,
        try_spdif_input,
        try_ir_input,
        try_link_table,
        try_input_edid,
        try_hdcp,
        try_preset_header,
        try_preset_slot,
    ];
    for recognize in recognizers {
        if let Some(message) = recognize(line) {
            return ParsedLine::Message(message);
        }
    }
    ParsedLine::Unrecognized
}

/// `Local RS232 Baudrate Is 9600!`, informational only
fn is_baud_notice(line: &str) -> bool {
    line.strip_prefix("Local RS232 Baudrate Is ")
        .and_then(|rest| rest.strip_suffix('!'))
        .is_some_and(|rate| !rate.is_empty() && rate.bytes().all(|b| b.is_ascii_digit()))
}

fn try_version(line: &str) -> Option<Message> {
    if let Some(v) = line.strip_prefix("VideoDriverVersion:V") {
        return Some(Message::VideoDriverVersion(parse_version(v)?));
    }
    if let Some(v) = line.strip_prefix("CPLD:V") {
        return Some(Message::CpldVersion(parse_version(v)?));
    }
    if let Some(v) = line.strip_prefix('V') {
        return Some(Message::Version(parse_version(v)?));
    }
    None
}

fn try_boolean_state(line: &str) -> Option<Message> {
    match line {
        "Power ON!" => Some(Message::Power(true)),
        "Power OFF!" => Some(Message::Power(false)),
        "HDBT Power ON!" => Some(Message::HdbtPoc(true)),
        "HDBT Power OFF!" => Some(Message::HdbtPoc(false)),
        "Front Panel Locked!" => Some(Message::FrontPanelLock(true)),
        "Front Panel UnLock!" => Some(Message::FrontPanelLock(false)),
        "IR Follow Video ON!" => Some(Message::IrFollowVideo(true)),
        "IR Follow Video OFF!" => Some(Message::IrFollowVideo(false)),
        _ => None,
    }
}

fn try_ip(line: &str) -> Option<Message> {
    let ip = line.strip_prefix("GUI_IP:")?.strip_suffix('!')?;
    if is_dotted_quad(ip) {
        Some(Message::Ip(ip.to_string()))
    } else {
        None
    }
}

fn try_hdbt_input(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("Output ")?;
    let (output, rest) = two_digits(rest)?;
    let rest = rest.strip_prefix(" Switch To In ")?;
    let (input, rest) = two_digits(rest)?;
    if rest != "!" || !local_output(output) || !port_index(input) {
        return None;
    }
    Some(Message::HdbtInputChanged { output, input })
}

fn try_output_power(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("Turn ")?;
    let (on, rest) = if let Some(r) = rest.strip_prefix("ON Output ") {
        (true, r)
    } else if let Some(r) = rest.strip_prefix("OFF Output ") {
        (false, r)
    } else {
        return None;
    };
    let (output, rest) = two_digits(rest)?;
    if rest != "!" || !combined_output(output) {
        return None;
    }
    Some(Message::OutputPowerChanged { output, on })
}

fn try_downscale(line: &str) -> Option<Message> {
    let (output, on) = index_then_switch(line, "HDMI OUT ", " Down Scale ")?;
    local_output(output).then_some(Message::DownscaleChanged { output, on })
}

fn try_rs232_remote_mcu(line: &str) -> Option<Message> {
    let (output, on) = index_then_switch(line, "RS232 Remote ", " Control MCU ")?;
    local_output(output).then_some(Message::Rs232RemoteMcuChanged { output, on })
}

fn try_ir_remote_mcu(line: &str) -> Option<Message> {
    let (output, on) = index_then_switch(line, "IR Remote ", " Control MCU ")?;
    local_output(output).then_some(Message::IrRemoteMcuChanged { output, on })
}

fn try_analog(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("Analog Out ")?;
    let (output, rest) = two_digits(rest)?;
    if !local_output(output) {
        return None;
    }
    if let Some(rest) = rest.strip_prefix(" Switch To Video ") {
        let (make, rest): (fn(u8) -> AudioSource, &str) =
            if let Some(r) = rest.strip_prefix("In ") {
                (AudioSource::Input, r)
            } else if let Some(r) = rest.strip_prefix("Out ") {
                (AudioSource::Output, r)
            } else {
                return None;
            };
        let (n, rest) = two_digits(rest)?;
        if rest != "!" || !port_index(n) {
            return None;
        }
        return Some(Message::AnalogInputChanged { output, source: make(n) });
    }
    let rest = rest.strip_prefix(" Volume ")?;
    match rest {
        "Mute!" => Some(Message::AnalogMuteChanged { output, mute: true }),
        "UnMute!" => Some(Message::AnalogMuteChanged { output, mute: false }),
        _ => {
            let volume = rest.strip_suffix('!')?.parse::<u8>().ok()?;
            Some(Message::AnalogVolumeChanged { output, volume })
        }
    }
}

fn try_spdif_input(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("SPDIF Out ")?;
    let (output, rest) = two_digits(rest)?;
    let rest = rest.strip_prefix(" Switch To ")?;
    let (make, rest): (fn(u8) -> SpdifSource, &str) =
        if let Some(r) = rest.strip_prefix("ARC ") {
            (SpdifSource::Arc, r)
        } else if let Some(r) = rest.strip_prefix("Video In ") {
            (SpdifSource::Input, r)
        } else if let Some(r) = rest.strip_prefix("Video Out ") {
            (SpdifSource::Output, r)
        } else {
            return None;
        };
    let (n, rest) = two_digits(rest)?;
    if rest != "!" || !local_output(output) || !port_index(n) {
        return None;
    }
    Some(Message::SpdifInputChanged { output, source: make(n) })
}

fn try_ir_input(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("Local ")?;
    let (output, rest) = two_digits(rest)?;
    let rest = rest.strip_prefix(" IR Out Switch To Remote ")?;
    let (input, rest) = two_digits(rest)?;
    if rest != " IR IN!" || !local_output(output) || !port_index(input) {
        return None;
    }
    Some(Message::IrInputChanged { output, input })
}

fn try_link_table(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("LINK ")?;
    let mut links = [false; 16];
    let mut count = 0;
    for entry in rest.split("  ") {
        let link = match entry {
            "Y" => true,
            "N" => false,
            _ => return None,
        };
        if count == 16 {
            return None;
        }
        links[count] = link;
        count += 1;
    }
    match count {
        8 => {
            let mut inputs = [false; 8];
            inputs.copy_from_slice(&links[..8]);
            Some(Message::InputLinks(inputs))
        }
        16 => Some(Message::OutputLinks(links)),
        _ => None,
    }
}

fn try_input_edid(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("Input ")?;
    let (input, rest) = two_digits(rest)?;
    let rest = rest.strip_prefix(" EDID ")?;
    let rest = rest
        .strip_prefix("Upgrade OK By ")
        .or_else(|| rest.strip_prefix("From "))?;
    let (index, rest) = two_digits(rest)?;
    if rest != " Internal EDID!" || !port_index(input) {
        return None;
    }
    // unknown profile indexes are still attributed to the input
    let edid = EdidProfile::from_index(index);
    Some(Message::InputEdidChanged { input, edid })
}

fn try_hdcp(line: &str) -> Option<Message> {
    // the device varies the casing of this line between firmware revisions
    let rest = strip_prefix_ignore_case(line, "OUT ")?;
    let (output, rest) = two_digits(rest)?;
    let rest = strip_prefix_ignore_case(rest, " HDCP ")?;
    let mode = HdcpMode::from_status_text(rest.strip_suffix('!')?)?;
    combined_output(output).then_some(Message::HdcpChanged { output, mode })
}

fn try_preset_header(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("Preset ")?;
    let (preset, rest) = two_digits(rest)?;
    (rest == " Sta:").then_some(Message::PresetHeader { preset })
}

fn try_preset_slot(line: &str) -> Option<Message> {
    let rest = line.strip_prefix("Out ")?;
    let (slot, rest) = two_digits(rest)?;
    let rest = rest.strip_prefix(" in ")?;
    let (input, rest) = two_digits(rest)?;
    if rest != "!" || !port_index(slot) {
        return None;
    }
    Some(Message::PresetSlot { slot, input })
}

/// `<prefix>NN<infix>ON!` / `<prefix>NN<infix>OFF!`
fn index_then_switch(line: &str, prefix: &str, infix: &str) -> Option<(u8, bool)> {
    let rest = line.strip_prefix(prefix)?;
    let (index, rest) = two_digits(rest)?;
    let rest = rest.strip_prefix(infix)?;
    let on = match rest {
        "ON!" => true,
        "OFF!" => false,
        _ => return None,
    };
    Some((index, on))
}

/// Split exactly two ASCII digits off the front of `s`
fn two_digits(s: &str) -> Option<(u8, &str)> {
    let (digits, rest) = s.split_at_checked(2)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, rest))
}

fn parse_version(s: &str) -> Option<String> {
    let mut parts = s.split('.');
    for _ in 0..3 {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    if parts.next().is_some() {
        return None;
    }
    Some(s.to_string())
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

fn port_index(n: u8) -> bool {
    (1..=8).contains(&n)
}

fn local_output(n: u8) -> bool {
    (1..=8).contains(&n)
}

fn combined_output(n: u8) -> bool {
    (1..=16).contains(&n)
}
