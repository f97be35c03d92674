//! Transport selection for matrix sessions
//!
//! The engine only needs a duplex byte stream; this module builds one from
//! a device address:
//!
//! - `tcp://host:port`: direct socket
//! - `telnet://host[:port]` (or `rfc2217://`): serial-over-telnet
//!   redirector, default port 23, with a minimal RFC 854 layer
//! - `serial:///dev/ttyUSB0` or a bare device path: local serial port,
//!   8 data bits, no parity, 1 stop bit

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

use crate::error::SessionError;

/// Default baud rate for serial and telnet-redirected transports
pub const DEFAULT_BAUD: u32 = 9600;

const DEFAULT_TELNET_PORT: u16 = 23;

/// Marker trait for anything the session can drive
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// Open the transport named by `addr`.
pub async fn connect(addr: &str, baud: u32) -> Result<Box<dyn AsyncStream>, SessionError> {
    match addr.split_once("://") {
        Some(("tcp", target)) => {
            info!(target, "connecting over tcp");
            Ok(Box::new(TcpStream::connect(target).await?))
        }
        Some(("telnet" | "rfc2217", host)) => {
            let target = if host.contains(':') {
                host.to_string()
            } else {
                format!("{host}:{DEFAULT_TELNET_PORT}")
            };
            info!(target = %target, "connecting over telnet");
            Ok(Box::new(TelnetStream::new(TcpStream::connect(&target).await?)))
        }
        Some(("serial", path)) => Ok(Box::new(open_serial(path, baud)?)),
        Some((scheme, _)) => Err(SessionError::UnsupportedScheme(scheme.to_string())),
        None => Ok(Box::new(open_serial(addr, baud)?)),
    }
}

fn open_serial(path: &str, baud: u32) -> Result<SerialStream, SessionError> {
    info!(path, baud, "opening serial port");
    let stream = tokio_serial::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(100))
        .open_native_async()?;
    Ok(stream)
}

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TelnetParse {
    Data,
    Iac,
    Verb(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Byte stream with a minimal RFC 854 layer over an inner transport.
///
/// Every option the peer proposes is refused and IAC sequences never reach
/// the session, so serial-over-telnet redirectors degrade to a plain byte
/// pipe at their configured baud. Outbound traffic is the ASCII command
/// set, which contains no IAC byte, so writes pass through unescaped.
pub struct TelnetStream<S> {
    inner: S,
    parse: TelnetParse,
    /// Queued negotiation refusals, flushed opportunistically
    pending: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> TelnetStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parse: TelnetParse::Data,
            pending: Vec::new(),
        }
    }

    fn flush_pending(&mut self, cx: &mut Context<'_>) -> io::Result<()> {
        while !self.pending.is_empty() {
            match Pin::new(&mut self.inner).poll_write(cx, &self.pending) {
                Poll::Ready(Ok(0)) => return Err(io::ErrorKind::WriteZero.into()),
                Poll::Ready(Ok(n)) => {
                    self.pending.drain(..n);
                }
                Poll::Ready(Err(e)) => return Err(e),
                // retried on the next poll
                Poll::Pending => break,
            }
        }
        Ok(())
    }

    fn decode(&mut self, data: &[u8], out: &mut ReadBuf<'_>) -> bool {
        let mut produced = false;
        for &byte in data {
            match self.parse {
                TelnetParse::Data => {
                    if byte == IAC {
                        self.parse = TelnetParse::Iac;
                    } else {
                        out.put_slice(&[byte]);
                        produced = true;
                    }
                }
                TelnetParse::Iac => match byte {
                    IAC => {
                        // escaped literal 0xFF
                        out.put_slice(&[IAC]);
                        produced = true;
                        self.parse = TelnetParse::Data;
                    }
                    WILL | WONT | DO | DONT => self.parse = TelnetParse::Verb(byte),
                    SB => self.parse = TelnetParse::Subnegotiation,
                    _ => self.parse = TelnetParse::Data,
                },
                TelnetParse::Verb(verb) => {
                    match verb {
                        WILL => self.pending.extend_from_slice(&[IAC, DONT, byte]),
                        DO => self.pending.extend_from_slice(&[IAC, WONT, byte]),
                        _ => {}
                    }
                    self.parse = TelnetParse::Data;
                }
                TelnetParse::Subnegotiation => {
                    if byte == IAC {
                        self.parse = TelnetParse::SubnegotiationIac;
                    }
                }
                TelnetParse::SubnegotiationIac => {
                    self.parse = if byte == SE {
                        TelnetParse::Data
                    } else {
                        TelnetParse::Subnegotiation
                    };
                }
            }
        }
        produced
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for TelnetStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.flush_pending(cx)?;
        loop {
            let mut raw = [0u8; 4096];
            let cap = buf.remaining().min(raw.len());
            let mut raw_buf = ReadBuf::new(&mut raw[..cap]);
            match Pin::new(&mut this.inner).poll_read(cx, &mut raw_buf) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
            let data = raw_buf.filled();
            if data.is_empty() {
                // EOF
                return Poll::Ready(Ok(()));
            }
            let produced = this.decode(data, buf);
            this.flush_pending(cx)?;
            if produced {
                return Poll::Ready(Ok(()));
            }
            // the whole chunk was negotiation traffic; read again
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncWrite for TelnetStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
