//! The session/protocol engine
//!
//! A [`Session`] owns one transport exclusively. Every operation takes
//! `&mut self`, so the read/write interleaving discipline the device needs
//! is enforced by ownership: compound operations (a command's
//! write-then-wait, a refresh) run their inner steps on the same exclusive
//! borrow instead of re-acquiring a lock. To share a session across tasks,
//! wrap it in a `tokio::sync::Mutex` and hold the guard across each whole
//! operation.
//!
//! The device pushes status lines with no framing beyond `\r\n` and no
//! end-of-response marker, so burst completion is inferred: read whatever
//! is available, dispatch complete lines, and declare the burst finished
//! once a quiescence window passes with no further data. A command's
//! responses may interleave with unsolicited traffic; the dispatcher, not
//! line position, decides what each line means.

use std::time::Duration;

use blackbird_protocol::{
    parse_line, AudioSource, Command, HdcpMode, LineCodec, ParsedLine, SpdifSource, VolumeCommand,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::SessionError;
use crate::events::{NotifyFn, StateChange};
use crate::state::MatrixState;
use crate::transport::{self, AsyncStream, DEFAULT_BAUD};

/// Window used when draining stale bytes before the handshake
const DRAIN_WINDOW: Duration = Duration::from_millis(25);

/// Timing bounds for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle window after which a burst of device output is considered
    /// complete
    pub quiescence: Duration,
    /// How long to wait for the first line after a command before deciding
    /// the device has nothing to say
    pub reply_timeout: Duration,
    /// Bound on waiting for the remainder of a partially received line
    pub read_timeout: Duration,
    /// Settle window used when the device had to be powered on during the
    /// handshake and is slow to produce its first status dump
    pub wake_settle: Duration,
    /// Baud rate for serial and telnet-redirected transports
    pub baud: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_millis(100),
            reply_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            wake_settle: Duration::from_millis(500),
            baud: DEFAULT_BAUD,
        }
    }
}

/// A live session with one matrix
pub struct Session<T> {
    io: T,
    codec: LineCodec,
    state: MatrixState,
    dispatcher: Dispatcher,
    config: SessionConfig,
    notify: Option<Box<NotifyFn>>,
    /// Armed during the handshake to capture a free-text reply (device
    /// name or type) that the grammar cannot recognize
    capture_armed: bool,
    captured: Option<String>,
}

impl Session<Box<dyn AsyncStream>> {
    /// Connect to a device address and run the handshake.
    ///
    /// Accepts `tcp://host:port`, `telnet://host[:port]`,
    /// `serial:///dev/ttyUSB0`, or a bare serial device path.
    pub async fn connect(addr: &str) -> Result<Self, SessionError> {
        Self::connect_with_config(addr, SessionConfig::default()).await
    }

    /// Connect with custom timing bounds
    pub async fn connect_with_config(
        addr: &str,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let io = transport::connect(addr, config.baud).await?;
        Self::open(io, config).await
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Session<T> {
    /// Run the handshake over an already-open byte stream.
    ///
    /// Tests use this with `tokio::io::duplex`; production code usually
    /// goes through [`Session::connect`].
    pub async fn open(io: T, config: SessionConfig) -> Result<Self, SessionError> {
        let mut session = Self {
            io,
            codec: LineCodec::new(),
            state: MatrixState::new(),
            dispatcher: Dispatcher::new(),
            config,
            notify: None,
            capture_armed: false,
            captured: None,
        };
        session.handshake().await?;
        Ok(session)
    }

    /// Read-only view of the mirrored device state.
    ///
    /// Fields reflect the last status line the device pushed, which for a
    /// just-sent command means the old value until the confirmation
    /// arrives via [`Session::poll`] or any other read.
    pub fn state(&self) -> &MatrixState {
        &self.state
    }

    /// Owned copy of the mirror, decoupled from the session borrow
    pub fn snapshot(&self) -> MatrixState {
        self.state.clone()
    }

    /// Device name captured during the handshake
    pub fn name(&self) -> Option<&str> {
        self.state.name.as_deref()
    }

    /// Device type string captured during the handshake
    pub fn device_type(&self) -> Option<&str> {
        self.state.device_type.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Install the state-change callback, invoked synchronously after
    /// every mutation the dispatcher performs
    pub fn set_notify(&mut self, callback: impl Fn(&StateChange) + Send + Sync + 'static) {
        self.notify = Some(Box::new(callback));
    }

    pub fn clear_notify(&mut self) {
        self.notify = None;
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub async fn set_power(&mut self, on: bool) -> Result<(), SessionError> {
        self.write_and_wait(&Command::Power(on)).await
    }

    pub async fn set_hdbt_poc(&mut self, on: bool) -> Result<(), SessionError> {
        self.write_and_wait(&Command::HdbtPoc(on)).await
    }

    pub async fn set_front_panel_lock(&mut self, locked: bool) -> Result<(), SessionError> {
        self.write_and_wait(&Command::FrontPanelLock(locked)).await
    }

    pub async fn set_ip(&mut self, ip: &str) -> Result<(), SessionError> {
        self.write_and_wait(&Command::SetIp(ip.to_string())).await
    }

    pub async fn set_ir_follow_video(&mut self, on: bool) -> Result<(), SessionError> {
        self.write_and_wait(&Command::IrFollowVideo(on)).await
    }

    /// Power one output by combined wire address (1..=8 HDBT, 9..=16 HDMI,
    /// 0 for all)
    pub async fn set_output_power(&mut self, output: u8, on: bool) -> Result<(), SessionError> {
        self.write_and_wait(&Command::OutputPower { on, output }).await
    }

    /// Set HDCP mode by combined wire address (0 for all)
    pub async fn set_output_hdcp(
        &mut self,
        output: u8,
        mode: HdcpMode,
    ) -> Result<(), SessionError> {
        self.write_and_wait(&Command::OutputHdcp { mode, output }).await
    }

    /// Route video input `input` to HDBT output `output` (0 for all)
    pub async fn set_hdbt_input(&mut self, output: u8, input: u8) -> Result<(), SessionError> {
        self.write_and_wait(&Command::HdbtInput { input, output }).await
    }

    pub async fn set_hdbt_downscale(&mut self, output: u8, on: bool) -> Result<(), SessionError> {
        self.write_and_wait(&Command::HdbtDownscale { on, output }).await
    }

    pub async fn set_hdbt_rs232_remote_mcu(
        &mut self,
        output: u8,
        on: bool,
    ) -> Result<(), SessionError> {
        self.write_and_wait(&Command::HdbtRs232RemoteMcu { on, output }).await
    }

    pub async fn set_hdbt_ir_remote_mcu(
        &mut self,
        output: u8,
        on: bool,
    ) -> Result<(), SessionError> {
        self.write_and_wait(&Command::HdbtIrRemoteMcu { on, output }).await
    }

    pub async fn set_analog_input(
        &mut self,
        output: u8,
        source: AudioSource,
    ) -> Result<(), SessionError> {
        self.write_and_wait(&Command::AnalogInput { source, output }).await
    }

    pub async fn set_analog_mute(&mut self, output: u8, on: bool) -> Result<(), SessionError> {
        self.write_and_wait(&Command::AnalogMute { on, output }).await
    }

    pub async fn set_analog_volume(
        &mut self,
        output: u8,
        volume: VolumeCommand,
    ) -> Result<(), SessionError> {
        self.write_and_wait(&Command::AnalogVolume { volume, output }).await
    }

    pub async fn set_spdif_input(
        &mut self,
        output: u8,
        source: SpdifSource,
    ) -> Result<(), SessionError> {
        self.write_and_wait(&Command::SpdifInput { source, output }).await
    }

    /// Route the IR channel of HDMI-family output `input` to local IR
    /// output `output`
    pub async fn set_ir_input(&mut self, output: u8, input: u8) -> Result<(), SessionError> {
        self.write_and_wait(&Command::IrInput { input, output }).await
    }

    /// Request a full input and output status dump.
    ///
    /// No-op while the device is not known to be powered on.
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        if self.state.power != Some(true) {
            debug!("skipping refresh, device power is not on");
            return Ok(());
        }
        self.write_and_wait(&Command::QueryInputStatus).await?;
        self.write_and_wait(&Command::QueryOutputStatus).await
    }

    /// Drain any pending unsolicited lines without writing anything.
    ///
    /// Returns the number of lines dispatched. Waits at most one
    /// quiescence window if nothing is pending.
    pub async fn poll(&mut self) -> Result<usize, SessionError> {
        let idle = self.config.quiescence;
        self.read_burst(idle, idle).await
    }

    // ------------------------------------------------------------------
    // Handshake
    // ------------------------------------------------------------------

    async fn handshake(&mut self) -> Result<(), SessionError> {
        self.drain().await?;

        // The name reply is free text the grammar cannot recognize, so it
        // is routed to a capture slot instead of the dispatcher.
        self.arm_capture();
        self.write_command(&Command::QueryName).await?;
        self.read_burst(self.config.reply_timeout, self.config.quiescence).await?;

        let mut woke_device = false;
        if let Some(name) = self.take_captured() {
            self.state.name = Some(name);
        } else {
            // A silent device is powered off; wake it long enough to
            // identify it, and restore the old power state afterwards.
            info!("no name reply, powering the device on to identify it");
            woke_device = true;
            self.write_command(&Command::Power(true)).await?;
            self.read_burst(self.config.wake_settle, self.config.quiescence).await?;
            self.arm_capture();
            self.write_command(&Command::QueryName).await?;
            self.read_burst(self.config.reply_timeout, self.config.quiescence).await?;
            self.state.name = self.take_captured();
        }

        self.arm_capture();
        self.write_command(&Command::QueryType).await?;
        self.read_burst(self.config.reply_timeout, self.config.quiescence).await?;
        self.state.device_type = self.take_captured();

        self.write_and_wait(&Command::QueryVersion).await?;

        self.write_command(&Command::QueryStatus).await?;
        // probe one index past the 8 modeled presets, matching the device's
        // documented dump sequence
        for preset in 1..=blackbird_protocol::command::MAX_PRESET_PROBE {
            self.write_command(&Command::QueryPresetStatus(preset)).await?;
        }
        let settle = if woke_device {
            self.config.wake_settle
        } else {
            self.config.quiescence
        };
        self.read_burst(settle, settle).await?;

        if woke_device {
            self.write_and_wait(&Command::Power(false)).await?;
        }

        info!(
            name = self.state.name.as_deref().unwrap_or("<unknown>"),
            device_type = self.state.device_type.as_deref().unwrap_or("<unknown>"),
            "session ready"
        );
        Ok(())
    }

    fn arm_capture(&mut self) {
        self.capture_armed = true;
        self.captured = None;
    }

    fn take_captured(&mut self) -> Option<String> {
        self.capture_armed = false;
        self.captured.take()
    }

    // ------------------------------------------------------------------
    // I/O plumbing
    // ------------------------------------------------------------------

    /// Encode and send a command, honoring the power-off write gate.
    ///
    /// Returns whether bytes actually went out. Validation errors surface
    /// before any I/O.
    async fn write_command(&mut self, command: &Command) -> Result<bool, SessionError> {
        let wire = command.encode()?;
        if self.state.power == Some(false) && !command.is_power_on() {
            debug!(command = %wire, "device is powered off, dropping command");
            return Ok(false);
        }
        debug!(command = %wire, "writing");
        self.io.write_all(wire.as_bytes()).await?;
        self.io.flush().await?;
        Ok(true)
    }

    /// Send a command and dispatch whatever response burst it provokes
    async fn write_and_wait(&mut self, command: &Command) -> Result<(), SessionError> {
        if self.write_command(command).await? {
            self.read_burst(self.config.reply_timeout, self.config.quiescence).await?;
        }
        Ok(())
    }

    /// Discard stale bytes buffered on the transport from a previous
    /// session
    async fn drain(&mut self) -> Result<(), SessionError> {
        self.codec.clear();
        let mut chunk = [0u8; 4096];
        let mut discarded = 0usize;
        loop {
            match timeout(DRAIN_WINDOW, self.io.read(&mut chunk)).await {
                Ok(Ok(0)) => return Err(SessionError::Disconnected),
                Ok(Ok(n)) => discarded += n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            }
        }
        if discarded > 0 {
            debug!(discarded, "dropped stale bytes");
        }
        Ok(())
    }

    /// Read one burst of device output.
    ///
    /// Waits up to `first_wait` for the burst to start, then dispatches
    /// every complete line as it arrives. After the buffered data drains
    /// without leaving a partial line, waits `idle` for more; if nothing
    /// arrives the burst is complete. A partial line extends the wait to
    /// the configured read bound, and failing that bound is an error:
    /// partial lines are never dispatched.
    async fn read_burst(
        &mut self,
        first_wait: Duration,
        idle: Duration,
    ) -> Result<usize, SessionError> {
        let mut count = 0usize;
        let mut chunk = [0u8; 4096];
        let mut wait = first_wait;
        loop {
            match timeout(wait, self.io.read(&mut chunk)).await {
                Ok(Ok(0)) => return Err(SessionError::Disconnected),
                Ok(Ok(n)) => self.codec.push_bytes(&chunk[..n]),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    if self.codec.has_partial() && wait == self.config.read_timeout {
                        return Err(SessionError::Timeout(
                            self.config.read_timeout.as_millis() as u64,
                        ));
                    }
                    if !self.codec.has_partial() {
                        return Ok(count);
                    }
                    wait = self.config.read_timeout;
                    continue;
                }
            }
            while let Some(line) = self.codec.next_line() {
                self.handle_line(&line);
                count += 1;
            }
            wait = if self.codec.has_partial() {
                self.config.read_timeout
            } else {
                idle
            };
        }
    }

    /// Route one complete line: capture slot first, then echo
    /// suppression, then the grammar.
    fn handle_line(&mut self, line: &str) {
        if self.capture_armed {
            self.capture_armed = false;
            self.captured = Some(line.to_string());
            return;
        }
        // the device echoes its own name/type header lines in status dumps
        if self.state.name.as_deref() == Some(line)
            || self.state.device_type.as_deref() == Some(line)
        {
            return;
        }
        match parse_line(line) {
            ParsedLine::Message(message) => {
                let changes = self.dispatcher.dispatch(&mut self.state, message);
                if let Some(callback) = &self.notify {
                    for change in &changes {
                        callback(change);
                    }
                }
            }
            ParsedLine::Ignored => {}
            ParsedLine::Unrecognized => warn!(line, "unrecognized line from device"),
        }
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.state.name)
            .field("device_type", &self.state.device_type)
            .field("power", &self.state.power)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
