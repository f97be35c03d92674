//! State-change notifications
//!
//! Every successful state mutation yields one [`StateChange`], delivered
//! synchronously to the optional session callback after the mirror has been
//! updated. This is the only asynchronous-visibility mechanism: setter
//! commands do not touch the mirror, so callers watch for the device's
//! confirmation here.

/// Matrix-level scalar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixField {
    Version,
    CpldVersion,
    VideoDriverVersion,
    Power,
    HdbtPoc,
    FrontPanelLock,
    Ip,
    IrFollowVideo,
}

/// Per-input fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    Link,
    Edid,
}

/// Per-output fields, shared across all output categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputField {
    Power,
    Link,
    Hdcp,
    Input,
    Downscale,
    Rs232RemoteMcu,
    IrRemoteMcu,
    Mute,
    Volume,
    IrInput,
}

/// Identifies one output by category and 1-based local index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputId {
    Hdbt(u8),
    Hdmi(u8),
    Analog(u8),
    Spdif(u8),
    Ir(u8),
}

/// One observed state mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChange {
    /// A matrix-level scalar changed
    Matrix(MatrixField),
    /// A field on input `index` (1-based) changed
    Input { index: u8, field: InputField },
    /// A field on one output changed
    Output { id: OutputId, field: OutputField },
    /// One slot of a preset mirror changed (both 1-based)
    PresetSlot { preset: u8, slot: u8 },
}

/// Callback signature for state-change notification
pub type NotifyFn = dyn Fn(&StateChange) + Send + Sync;
