use crate::socket::addr::ConnectionInfo;
use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Closed resources. Raised locally, no syscall is made.
    #[error("Socket is closed")]
    SocketClosed,
    #[error("TLS engine is closed")]
    EngineClosed,

    // OS errors with a dedicated kind
    #[error("Connection refused (os error {code})")]
    ConnectionRefused { code: i32 },
    #[error("Connection reset (os error {code})")]
    ConnectionReset { code: i32 },
    #[error("Connection aborted (os error {code})")]
    ConnectionAborted { code: i32 },
    #[error("Broken pipe (os error {code})")]
    BrokenPipe { code: i32 },
    #[error("Connection timed out (os error {code})")]
    ConnectionTimedOut { code: i32 },
    #[error("Network unreachable (os error {code})")]
    NetworkUnreachable { code: i32 },
    #[error("Address unreachable (os error {code})")]
    AddressUnreachable { code: i32 },
    #[error("Permission denied (os error {code})")]
    PermissionDenied { code: i32 },
    #[error("Address in use (os error {code})")]
    AddressInUse { code: i32 },
    #[error("Address not available (os error {code})")]
    AddressNotAvailable { code: i32 },
    #[error("Address family not supported (os error {code})")]
    AddressFamilyNotSupported { code: i32 },

    // Any other OS error
    #[error("{message} (os error {code})")]
    Os { code: i32, message: String },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    // TLS engine failures
    #[error("TLS error: {reason}")]
    Tls { reason: String },

    // Programmer misuse
    #[error("Contract violation: {0}")]
    ContractViolation(&'static str),

    #[error("All connections failed ({} candidates)", candidates.len())]
    AllConnectionsFailed { candidates: Vec<ConnectionInfo> },

    // Resolution
    #[error("Name not resolved: {domain}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Invalid address: {0}")]
    InvalidAddress(&'static str),
}

impl NetError {
    /// Maps a raw platform error code onto the taxonomy.
    ///
    /// This is the only place errno values are interpreted.
    pub fn from_os(code: i32) -> Self {
        match code {
            libc::ECONNREFUSED => NetError::ConnectionRefused { code },
            libc::ECONNRESET => NetError::ConnectionReset { code },
            libc::ECONNABORTED => NetError::ConnectionAborted { code },
            libc::EPIPE => NetError::BrokenPipe { code },
            libc::ETIMEDOUT => NetError::ConnectionTimedOut { code },
            libc::ENETUNREACH => NetError::NetworkUnreachable { code },
            libc::EHOSTUNREACH => NetError::AddressUnreachable { code },
            libc::EACCES | libc::EPERM => NetError::PermissionDenied { code },
            libc::EADDRINUSE => NetError::AddressInUse { code },
            libc::EADDRNOTAVAIL => NetError::AddressNotAvailable { code },
            libc::EAFNOSUPPORT => NetError::AddressFamilyNotSupported { code },
            _ => NetError::Os {
                code,
                message: io::Error::from_raw_os_error(code).to_string(),
            },
        }
    }

    /// Builds an error from the calling thread's current `errno`.
    pub fn last_os_error() -> Self {
        io::Error::last_os_error().into()
    }

    /// Wraps an engine diagnostic.
    pub fn tls(reason: impl Into<String>) -> Self {
        NetError::Tls {
            reason: reason.into(),
        }
    }

    /// Raw platform code for every OS-derived variant.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            NetError::ConnectionRefused { code }
            | NetError::ConnectionReset { code }
            | NetError::ConnectionAborted { code }
            | NetError::BrokenPipe { code }
            | NetError::ConnectionTimedOut { code }
            | NetError::NetworkUnreachable { code }
            | NetError::AddressUnreachable { code }
            | NetError::PermissionDenied { code }
            | NetError::AddressInUse { code }
            | NetError::AddressNotAvailable { code }
            | NetError::AddressFamilyNotSupported { code }
            | NetError::Os { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for failures raised before touching the OS because the
    /// resource was already closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, NetError::SocketClosed | NetError::EngineClosed)
    }

    /// Chromium `net_error_list.h` code for this error.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::SocketClosed => -15,
            NetError::EngineClosed => -15,
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset { .. } => -101,
            NetError::ConnectionRefused { .. } => -102,
            NetError::ConnectionAborted { .. } => -103,
            NetError::AllConnectionsFailed { .. } => -104,
            NetError::NameNotResolvedFor { .. } => -105,
            NetError::Tls { .. } => -107,
            NetError::InvalidAddress(_) => -108,
            NetError::AddressUnreachable { .. } => -109,
            NetError::BrokenPipe { .. } => -100,
            NetError::ConnectionTimedOut { .. } => -118,
            NetError::NetworkUnreachable { .. } => -109,
            NetError::PermissionDenied { .. } => -138,
            NetError::AddressInUse { .. } => -147,
            NetError::AddressNotAvailable { .. } => -108,
            NetError::AddressFamilyNotSupported { .. } => -4,
            NetError::ContractViolation(_) => -4,
            NetError::Os { .. } => -2,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => NetError::from_os(code),
            None => NetError::Os {
                code: 0,
                message: err.to_string(),
            },
        }
    }
}

impl From<boring::error::ErrorStack> for NetError {
    fn from(stack: boring::error::ErrorStack) -> Self {
        NetError::tls(stack.to_string())
    }
}

impl From<NetError> for io::Error {
    fn from(err: NetError) -> Self {
        let kind = match &err {
            NetError::SocketClosed | NetError::EngineClosed => io::ErrorKind::NotConnected,
            NetError::ConnectionRefused { .. } => io::ErrorKind::ConnectionRefused,
            NetError::ConnectionReset { .. } => io::ErrorKind::ConnectionReset,
            NetError::ConnectionAborted { .. } => io::ErrorKind::ConnectionAborted,
            NetError::BrokenPipe { .. } => io::ErrorKind::BrokenPipe,
            NetError::ConnectionTimedOut { .. } => io::ErrorKind::TimedOut,
            NetError::PermissionDenied { .. } => io::ErrorKind::PermissionDenied,
            NetError::AddressInUse { .. } => io::ErrorKind::AddrInUse,
            NetError::AddressNotAvailable { .. } => io::ErrorKind::AddrNotAvailable,
            NetError::ConnectionClosed => io::ErrorKind::UnexpectedEof,
            NetError::ContractViolation(_) | NetError::InvalidAddress(_) => {
                io::ErrorKind::InvalidInput
            }
            NetError::NameNotResolvedFor { .. } => io::ErrorKind::NotFound,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
