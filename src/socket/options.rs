//! Self-marshalling socket option descriptors.
//!
//! Each descriptor names a native option by `(level, option, name)` and knows
//! how to encode a typed value into a fixed-size native payload and decode it
//! back. The syscall layer only ever sees byte slices of the declared size.
//!
//! ```ignore
//! use syncnet::socket::options;
//!
//! socket.set_option(&options::TCP_NO_DELAY, true)?;
//! let size = socket.get_option(&options::RECEIVE_BUFFER_SIZE)?;
//! ```

use std::mem;

/// A typed native socket option.
pub trait SocketOption {
    /// Rust-side value type.
    type Value;

    /// Protocol level (`SOL_SOCKET`, `IPPROTO_TCP`, ...).
    fn level(&self) -> libc::c_int;

    /// Option number within the level.
    fn option(&self) -> libc::c_int;

    /// Human readable name, used in errors and logs.
    fn name(&self) -> &'static str;

    /// Size in bytes of the native payload.
    fn native_size(&self) -> usize;

    /// Encodes `value` into exactly `native_size()` bytes.
    fn encode(&self, value: Self::Value) -> Vec<u8>;

    /// Decodes the bytes the kernel returned. `raw` may be shorter than
    /// `native_size()` when the kernel reports a narrower type.
    fn decode(&self, raw: &[u8]) -> Self::Value;
}

/// Boolean option, encoded as a native `int` holding 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanOption {
    level: libc::c_int,
    option: libc::c_int,
    name: &'static str,
}

impl BooleanOption {
    pub const fn new(level: libc::c_int, option: libc::c_int, name: &'static str) -> Self {
        Self {
            level,
            option,
            name,
        }
    }
}

impl SocketOption for BooleanOption {
    type Value = bool;

    fn level(&self) -> libc::c_int {
        self.level
    }

    fn option(&self) -> libc::c_int {
        self.option
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn native_size(&self) -> usize {
        mem::size_of::<libc::c_int>()
    }

    fn encode(&self, value: bool) -> Vec<u8> {
        (value as libc::c_int).to_ne_bytes().to_vec()
    }

    fn decode(&self, raw: &[u8]) -> bool {
        // Some kernels answer with a single byte for boolean options.
        raw.iter().any(|b| *b != 0)
    }
}

/// Unsigned integer option, encoded as a native `unsigned long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsignedLongOption {
    level: libc::c_int,
    option: libc::c_int,
    name: &'static str,
}

impl UnsignedLongOption {
    pub const fn new(level: libc::c_int, option: libc::c_int, name: &'static str) -> Self {
        Self {
            level,
            option,
            name,
        }
    }
}

impl SocketOption for UnsignedLongOption {
    type Value = u64;

    fn level(&self) -> libc::c_int {
        self.level
    }

    fn option(&self) -> libc::c_int {
        self.option
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn native_size(&self) -> usize {
        mem::size_of::<libc::c_ulong>()
    }

    fn encode(&self, value: u64) -> Vec<u8> {
        (value as libc::c_ulong).to_ne_bytes().to_vec()
    }

    fn decode(&self, raw: &[u8]) -> u64 {
        // The kernel reports how many bytes it wrote: int-sized options come
        // back as four bytes even when a wider buffer was offered.
        // Shorter replies are zero-extended in native byte order.
        let raw = &raw[..raw.len().min(8)];
        let mut bytes = [0u8; 8];
        if cfg!(target_endian = "little") {
            bytes[..raw.len()].copy_from_slice(raw);
        } else {
            bytes[8 - raw.len()..].copy_from_slice(raw);
        }
        u64::from_ne_bytes(bytes)
    }
}

pub const REUSE_ADDRESS: BooleanOption =
    BooleanOption::new(libc::SOL_SOCKET, libc::SO_REUSEADDR, "SO_REUSEADDR");

pub const KEEP_ALIVE: BooleanOption =
    BooleanOption::new(libc::SOL_SOCKET, libc::SO_KEEPALIVE, "SO_KEEPALIVE");

pub const BROADCAST: BooleanOption =
    BooleanOption::new(libc::SOL_SOCKET, libc::SO_BROADCAST, "SO_BROADCAST");

pub const OOB_INLINE: BooleanOption =
    BooleanOption::new(libc::SOL_SOCKET, libc::SO_OOBINLINE, "SO_OOBINLINE");

pub const TCP_NO_DELAY: BooleanOption =
    BooleanOption::new(libc::IPPROTO_TCP, libc::TCP_NODELAY, "TCP_NODELAY");

pub const IPV6_ONLY: BooleanOption =
    BooleanOption::new(libc::IPPROTO_IPV6, libc::IPV6_V6ONLY, "IPV6_V6ONLY");

#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
pub const REUSE_PORT: BooleanOption =
    BooleanOption::new(libc::SOL_SOCKET, libc::SO_REUSEPORT, "SO_REUSEPORT");

/// Linux reports twice the requested value to account for bookkeeping.
pub const RECEIVE_BUFFER_SIZE: UnsignedLongOption =
    UnsignedLongOption::new(libc::SOL_SOCKET, libc::SO_RCVBUF, "SO_RCVBUF");

/// Linux reports twice the requested value to account for bookkeeping.
pub const SEND_BUFFER_SIZE: UnsignedLongOption =
    UnsignedLongOption::new(libc::SOL_SOCKET, libc::SO_SNDBUF, "SO_SNDBUF");

pub const IP_TTL: UnsignedLongOption =
    UnsignedLongOption::new(libc::IPPROTO_IP, libc::IP_TTL, "IP_TTL");

pub const IPV6_UNICAST_HOPS: UnsignedLongOption =
    UnsignedLongOption::new(libc::IPPROTO_IPV6, libc::IPV6_UNICAST_HOPS, "IPV6_UNICAST_HOPS");

/// Boolean options applicable to a TCP socket of either family.
pub fn boolean_tcp_options() -> Vec<BooleanOption> {
    let mut opts = vec![REUSE_ADDRESS, KEEP_ALIVE, OOB_INLINE, TCP_NO_DELAY];
    #[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
    opts.push(REUSE_PORT);
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_encoding() {
        let bytes = TCP_NO_DELAY.encode(true);
        assert_eq!(bytes.len(), TCP_NO_DELAY.native_size());
        assert!(TCP_NO_DELAY.decode(&bytes));
        assert!(!TCP_NO_DELAY.decode(&TCP_NO_DELAY.encode(false)));
        assert!(TCP_NO_DELAY.decode(&[1]));
    }

    #[test]
    fn test_unsigned_long_encoding() {
        let bytes = RECEIVE_BUFFER_SIZE.encode(131_072);
        assert_eq!(bytes.len(), mem::size_of::<libc::c_ulong>());
        assert_eq!(RECEIVE_BUFFER_SIZE.decode(&bytes), 131_072);
    }

    #[test]
    fn test_unsigned_long_decodes_int_sized_reply() {
        let reply = (4096 as libc::c_int).to_ne_bytes();
        assert_eq!(SEND_BUFFER_SIZE.decode(&reply), 4096);
    }

    #[test]
    fn test_unsigned_long_zero_extends_odd_widths() {
        let value: u64 = 0x00ab_cdef;
        for width in [3usize, 5, 6, 7] {
            let full = value.to_ne_bytes();
            let reply = if cfg!(target_endian = "little") {
                &full[..width]
            } else {
                &full[8 - width..]
            };
            assert_eq!(IP_TTL.decode(reply), value, "width {}", width);
        }
        assert_eq!(IP_TTL.decode(&[]), 0);
    }

    #[test]
    fn test_descriptor_identity() {
        assert_eq!(REUSE_ADDRESS.level(), libc::SOL_SOCKET);
        assert_eq!(REUSE_ADDRESS.option(), libc::SO_REUSEADDR);
        assert_eq!(IP_TTL.name(), "IP_TTL");
    }
}
