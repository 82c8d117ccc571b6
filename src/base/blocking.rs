//! Would-block aware I/O results.
//!
//! Every socket and engine primitive reports "the operation would block" as a
//! value rather than an error. A raw `-1` count is the wire-level sentinel;
//! `0` is a legitimate count (EOF on read, zero-byte success elsewhere) whose
//! meaning depends on the call site.

use crate::base::neterror::NetError;
use std::fmt;

/// Outcome of a single non-throwing I/O step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockingResult {
    /// No bytes were transferred; retry after a readiness notification.
    WouldBlock,
    /// Exact number of bytes transferred.
    Count(usize),
}

impl BlockingResult {
    /// Raw sentinel used for `WouldBlock`.
    pub const SENTINEL: i64 = -1;

    /// Decodes a signed count. `-1` is would-block; any other negative
    /// value is rejected.
    pub fn from_raw(raw: i64) -> Result<Self, NetError> {
        match raw {
            Self::SENTINEL => Ok(BlockingResult::WouldBlock),
            n if n >= 0 => usize::try_from(n)
                .map(BlockingResult::Count)
                .map_err(|_| NetError::ContractViolation("blocking result count exceeds usize")),
            _ => Err(NetError::ContractViolation(
                "negative blocking result other than the would-block sentinel",
            )),
        }
    }

    /// Signed encoding; `-1` for `WouldBlock`.
    ///
    /// Fails for counts that do not fit in an `i64`.
    pub fn as_raw(self) -> Result<i64, NetError> {
        match self {
            BlockingResult::WouldBlock => Ok(Self::SENTINEL),
            BlockingResult::Count(n) => i64::try_from(n)
                .map_err(|_| NetError::ContractViolation("blocking result count exceeds i64")),
        }
    }

    /// True for every value except the would-block sentinel.
    #[inline]
    pub fn is_success(self) -> bool {
        !matches!(self, BlockingResult::WouldBlock)
    }

    #[inline]
    pub fn is_would_block(self) -> bool {
        matches!(self, BlockingResult::WouldBlock)
    }

    /// Byte count, or `None` on would-block.
    #[inline]
    pub fn count(self) -> Option<usize> {
        match self {
            BlockingResult::WouldBlock => None,
            BlockingResult::Count(n) => Some(n),
        }
    }

    /// Unwraps the count of a call made in blocking mode.
    ///
    /// A blocking call must never report would-block, so that case is a
    /// contract violation rather than something to retry.
    pub fn ensure_non_block(self) -> Result<usize, NetError> {
        match self {
            BlockingResult::Count(n) => Ok(n),
            BlockingResult::WouldBlock => Err(NetError::ContractViolation(
                "blocking operation reported would-block",
            )),
        }
    }
}

impl From<usize> for BlockingResult {
    fn from(n: usize) -> Self {
        BlockingResult::Count(n)
    }
}

impl fmt::Display for BlockingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingResult::WouldBlock => f.write_str("would block"),
            BlockingResult::Count(n) => write!(f, "{} bytes", n),
        }
    }
}
