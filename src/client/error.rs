use core::fmt;

/// The client's error taxonomy (`spec.md` §7): `ERR`, `ERRMEM`, and `CLOSED`
/// from the source, plus `Transport(E)` so a synchronous transport failure
/// (e.g. `Transport::start` itself erroring) is not swallowed — mirrors the
/// teacher crate's own `Error<E>` / `Connection(E)` wrapping.
#[derive(Debug)]
pub enum Error<E> {
    /// `ERR`: a generic, non-specific failure (e.g. an empty topic).
    Generic,
    /// `ERRMEM`: the tx ring or the request table has no room for this
    /// operation.
    OutOfMemory,
    /// `CLOSED`: the operation is not valid in the client's current
    /// connection state.
    NotConnected,
    /// An underlying transport error occurred on a synchronous call.
    Transport(E),
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Transport(value)
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "operation failed"),
            Self::OutOfMemory => write!(f, "no room for this operation"),
            Self::NotConnected => write!(f, "client is not connected"),
            Self::Transport(err) => write!(f, "transport error: {err}"),
        }
    }
}

impl<E> core::error::Error for Error<E> where E: core::error::Error {}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
