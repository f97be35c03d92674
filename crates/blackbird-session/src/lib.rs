//! Session driver for the Monoprice Blackbird 27842 8x8 HDBaseT matrix.
//!
//! Builds on [`blackbird_protocol`] to run a live conversation with the
//! device: connect over serial, TCP, or telnet, perform the identifying
//! handshake, mirror every status line the device pushes into a
//! [`MatrixState`], and expose typed setters for everything the matrix can
//! be told to do.
//!
//! ```rust,no_run
//! use blackbird_session::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), blackbird_session::SessionError> {
//!     let mut session = Session::connect("tcp://matrix.local:8000").await?;
//!     session.set_notify(|change| println!("changed: {change:?}"));
//!
//!     // route input 5 to HDBT output 3, then pull a fresh status dump
//!     session.set_hdbt_input(3, 5).await?;
//!     session.refresh().await?;
//!
//!     println!("output 3 input: {:?}", session.state().hdbt_outputs[2].input);
//!     Ok(())
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod events;
pub mod session;
pub mod state;
pub mod transport;

pub use error::SessionError;
pub use events::{InputField, MatrixField, OutputField, OutputId, StateChange};
pub use session::{Session, SessionConfig};
pub use state::MatrixState;
