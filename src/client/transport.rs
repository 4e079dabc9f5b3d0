//! The boundary the client core talks across (`spec.md` §6, "Transport
//! interface consumed by the core"). Everything that actually opens
//! sockets, owns a monotonic clock, and knows whether the underlying
//! network is attached lives on the other side of this trait and is out of
//! scope for this crate.

/// A non-blocking, byte-oriented connection.
///
/// All methods are non-blocking: `send` and `start` report whether the
/// operation was *accepted*, not whether it has completed. Completion is
/// reported back into the client core through
/// [`Client::on_sent`](crate::client::Client::on_sent) and
/// [`Client::on_connected`](crate::client::Client::on_connected), which the
/// transport driver (not this crate) is responsible for calling.
pub trait Transport {
    /// The error type surfaced by this transport's own operations.
    type Error;

    /// Initiates a non-blocking dial to `host:port`.
    fn start(&mut self, host: &str, port: u16) -> Result<(), Self::Error>;

    /// Submits `data` for sending. Returns `Ok(true)` if the transport
    /// accepted the buffer for sending (completion reported later via
    /// `on_sent`), `Ok(false)` if it could not accept it right now (the
    /// caller should retry later).
    fn send(&mut self, data: &[u8]) -> Result<bool, Self::Error>;

    /// Initiates a non-blocking close of the connection.
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Acknowledges that `len` received bytes have been consumed, for
    /// transports that implement flow control.
    fn recved(&mut self, len: usize);

    /// Whether the underlying network (e.g. cellular registration) is
    /// attached. `connect` refuses to start a dial when this is `false`.
    fn is_attached(&self) -> bool;

    /// Current time in milliseconds, from a monotonic clock. Used only to
    /// stamp [`Request::timeout_start`](crate::request::Request::timeout_start);
    /// nothing in this crate currently acts on elapsed time (`spec.md` §9,
    /// "Open question — pending-request timeout").
    fn now_ms(&self) -> u64;
}
