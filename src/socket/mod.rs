//! Sockets, the candidate dialer and TLS.
//!
//! Mirrors the transport half of Chromium's `net/socket/`:
//! - [`handle`]: owned OS socket with blocking/non-blocking I/O
//! - [`options`]: typed socket option descriptors
//! - [`connectjob`]: sequential fallback across resolved candidates
//! - [`tls`]: BoringSSL engine over memory queues, and the socket pump

pub mod addr;
pub mod connectjob;
pub mod handle;
pub mod options;
mod sys;
pub mod tls;

pub use addr::{AddressFamily, ConnectionInfo, Protocol, SocketType};
pub use connectjob::ConnectJob;
pub use handle::{Shutdown, Socket};
pub use options::{BooleanOption, SocketOption, UnsignedLongOption};
