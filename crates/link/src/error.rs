use std::io;

pub type LinkResult<T> = Result<T, LinkError>;

/// Failures raised by link drivers.
///
/// The supervisor classifies these: transient transport failures are logged
/// in summary only, interrupts latch shutdown, anything else is persisted
/// through the exception sink.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("operation canceled")]
    Canceled,

    #[error("link is not connected")]
    NotConnected,

    #[error("interrupted by signal")]
    Interrupt,

    #[error("protocol failure: {0}")]
    Protocol(String),
}

impl LinkError {
    /// A user interrupt or signal. Latches shutdown instead of reconnecting.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupt)
    }

    /// Common transient transport failures: refused, reset, aborted, timed
    /// out, unreachable, stale socket, or any generic i/o failure. Also
    /// anything whose message mentions cancellation or a timeout.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(_) | Self::Timeout | Self::Canceled | Self::NotConnected => true,
            Self::Interrupt => false,
            Self::Protocol(message) => {
                let message = message.to_ascii_lowercase();
                message.contains("canceled")
                    || message.contains("cancelled")
                    || message.contains("timeout")
            }
        }
    }
}
