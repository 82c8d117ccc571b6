//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::io;
use std::sync::Arc;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Map an IO error through the errno taxonomy.
    ///
    /// # Example
    /// ```ignore
    /// use syncnet::base::context::IoResultExt;
    ///
    /// let n = std::io::Read::read(&mut file, &mut buf).net_context()?;
    /// ```
    fn net_context(self) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn net_context(self) -> Result<T, NetError> {
        self.map_err(NetError::from)
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            source: Arc::new(e),
        })
    }
}

/// Converts a `-1`-on-failure syscall return into a `Result`.
#[inline]
pub(crate) fn cvt(ret: libc::c_int) -> Result<libc::c_int, NetError> {
    if ret == -1 {
        Err(NetError::last_os_error())
    } else {
        Ok(ret)
    }
}
