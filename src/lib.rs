//! A transport-agnostic MQTT 3.1.1 client core.
//!
//! This crate implements the wire format, the incremental parser, and the
//! connection state machine of an MQTT 3.1.1 client, but deliberately knows
//! nothing about sockets, TLS, or a clock — those are supplied by the
//! embedding application through the [`client::Transport`] trait. This
//! split keeps the crate usable over any byte-oriented, non-blocking
//! connection, cellular AT-modem stacks included.
//!
//! See [`client::Client`] for the entry point.

mod log;

pub mod client;
pub mod protocol;
pub mod request;
pub mod ring;

pub use client::{Client, ClientInfo, ConnState, ConnectStatus, Error, Event, EventHandler, OpResult, Result, Transport};
pub use protocol::encode::Will;
pub use protocol::qos::QoS;
