//! Error types for command validation and encoding

use thiserror::Error;

/// Errors raised while validating a command, before any I/O happens
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Output address outside the range this command accepts
    #[error("output {output} out of range (valid: {min}..={max})")]
    OutputOutOfRange { output: u8, min: u8, max: u8 },

    /// Input or source index outside 1..=8
    #[error("input {0} out of range (valid: 1..=8)")]
    InputOutOfRange(u8),

    /// Absolute volume level above 100
    #[error("volume level {0} out of range (valid: 0..=100)")]
    VolumeOutOfRange(u8),

    /// Preset index outside the status probe range
    #[error("preset {0} out of range (valid: 1..=9)")]
    PresetOutOfRange(u8),

    /// IP assignment text is not a dotted quad
    #[error("invalid IPv4 address: {0:?}")]
    InvalidIp(String),

    /// Routing source token could not be parsed ("in3", "out5", "arc1")
    #[error("invalid source token: {0:?}")]
    InvalidSource(String),
}
