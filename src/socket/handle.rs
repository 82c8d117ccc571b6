//! Owned OS socket handle.
//!
//! A [`Socket`] owns exactly one descriptor. Every operation first checks the
//! open flag and fails with [`NetError::SocketClosed`] without a syscall once
//! the socket has been closed. `close` is guarded by a compare-and-swap so
//! concurrent callers collapse into a single `close(2)`.
//!
//! Blocking and non-blocking sockets share one API: transfers return a
//! [`BlockingResult`] and `EAGAIN` never surfaces as an error.

use super::addr::{AddressFamily, ConnectionInfo, Protocol, SockAddr, SocketType};
use super::options::SocketOption;
use super::sys;
use crate::base::blocking::BlockingResult;
use crate::base::neterror::NetError;
use bytes::{Buf, BufMut};
use std::fmt;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Which halves of a connection to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Read,
    Write,
    Both,
}

impl Shutdown {
    fn raw(self) -> libc::c_int {
        match self {
            Shutdown::Read => libc::SHUT_RD,
            Shutdown::Write => libc::SHUT_WR,
            Shutdown::Both => libc::SHUT_RDWR,
        }
    }
}

pub struct Socket {
    fd: RawFd,
    family: AddressFamily,
    socket_type: SocketType,
    protocol: Protocol,
    open: AtomicBool,
}

impl Socket {
    /// Creates a new, unconnected socket.
    pub fn open(
        family: AddressFamily,
        socket_type: SocketType,
        protocol: Protocol,
    ) -> Result<Self, NetError> {
        let fd = sys::socket(family.raw(), socket_type.raw(), protocol.raw())?;
        tracing::debug!(fd, ?family, ?socket_type, ?protocol, "socket opened");
        Ok(Self::from_parts(fd, family, socket_type, protocol))
    }

    /// Opens a socket matching an endpoint's family, type and protocol.
    pub fn open_for(info: &ConnectionInfo) -> Result<Self, NetError> {
        Self::open(info.family(), info.socket_type(), info.protocol())
    }

    fn from_parts(
        fd: RawFd,
        family: AddressFamily,
        socket_type: SocketType,
        protocol: Protocol,
    ) -> Self {
        Self {
            fd,
            family,
            socket_type,
            protocol,
            open: AtomicBool::new(true),
        }
    }

    /// Descriptor, or `SocketClosed` once closed.
    #[inline]
    fn fd(&self) -> Result<RawFd, NetError> {
        if self.open.load(Ordering::Acquire) {
            Ok(self.fd)
        } else {
            Err(NetError::SocketClosed)
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn bind(&self, addr: &ConnectionInfo) -> Result<(), NetError> {
        let fd = self.fd()?;
        sys::bind(fd, &SockAddr::from_std(&addr.addr()))?;
        tracing::debug!(fd, addr = %addr, "socket bound");
        Ok(())
    }

    pub fn listen(&self, backlog: i32) -> Result<(), NetError> {
        sys::listen(self.fd()?, backlog)
    }

    /// Connects to `addr`.
    ///
    /// Returns `true` when the connection completed, `false` when it is still
    /// in progress on a non-blocking socket (poll for writability, then check
    /// [`take_error`](Self::take_error)).
    ///
    /// On a blocking socket `timeout` bounds the wait; `None` or a zero
    /// duration blocks indefinitely. A timed-out socket cannot be reused for
    /// another connect attempt.
    pub fn connect(
        &self,
        addr: &ConnectionInfo,
        timeout: Option<Duration>,
    ) -> Result<bool, NetError> {
        let fd = self.fd()?;
        let native = SockAddr::from_std(&addr.addr());

        if sys::is_nonblocking(fd)? {
            return sys::connect(fd, &native);
        }

        let timeout = match timeout {
            Some(t) if !t.is_zero() => t,
            _ => {
                sys::connect(fd, &native)?;
                return Ok(true);
            }
        };

        // Bounded blocking connect: start non-blocking, wait for
        // writability, then restore blocking mode.
        sys::set_nonblocking(fd, true)?;
        let outcome = self.finish_connect(fd, &native, timeout);
        let restored = sys::set_nonblocking(fd, false);
        outcome?;
        restored?;
        Ok(true)
    }

    fn finish_connect(
        &self,
        fd: RawFd,
        native: &SockAddr,
        timeout: Duration,
    ) -> Result<(), NetError> {
        if sys::connect(fd, native)? {
            return Ok(());
        }
        if !sys::poll(fd, libc::POLLOUT, Some(timeout))? {
            return Err(NetError::ConnectionTimedOut {
                code: libc::ETIMEDOUT,
            });
        }
        match self.take_error()? {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Accepts a pending connection.
    ///
    /// Returns `None` only on a non-blocking socket with nothing pending.
    /// The child inherits the listener's blocking mode.
    pub fn accept(&self) -> Result<Option<Socket>, NetError> {
        Ok(self.accept_with_addr()?.map(|(socket, _)| socket))
    }

    /// Like [`accept`](Self::accept), also returning the peer endpoint.
    pub fn accept_with_addr(&self) -> Result<Option<(Socket, ConnectionInfo)>, NetError> {
        let fd = self.fd()?;
        let nonblocking = sys::is_nonblocking(fd)?;
        let mut peer = SockAddr::empty();
        let child = match sys::accept(fd, &mut peer, nonblocking)? {
            Some(child) => child,
            None => return Ok(None),
        };
        let socket = Socket::from_parts(child, self.family, self.socket_type, self.protocol);
        let peer = ConnectionInfo::new(peer.to_std()?, self.socket_type, self.protocol);
        tracing::debug!(fd = child, peer = %peer, "connection accepted");
        Ok(Some((socket, peer)))
    }

    /// A single `recv(2)`; `Count(0)` is EOF on stream sockets.
    pub fn recv(&self, buf: &mut [u8], flags: i32) -> Result<BlockingResult, NetError> {
        sys::recv(self.fd()?, buf, flags)
    }

    /// A single `send(2)`.
    pub fn send(&self, buf: &[u8], flags: i32) -> Result<BlockingResult, NetError> {
        sys::send(self.fd()?, buf, flags)
    }

    /// Sends until all of `buf` is written or the socket would block.
    ///
    /// Returns `Count(buf.len())` on a blocking socket. On a non-blocking
    /// socket the count may be short; `WouldBlock` means nothing was sent.
    pub fn sendall(&self, buf: &[u8], flags: i32) -> Result<BlockingResult, NetError> {
        let fd = self.fd()?;
        let mut sent = 0;
        while sent < buf.len() {
            match sys::send(fd, &buf[sent..], flags)? {
                BlockingResult::Count(0) => break,
                BlockingResult::Count(n) => sent += n,
                BlockingResult::WouldBlock if sent == 0 => return Ok(BlockingResult::WouldBlock),
                BlockingResult::WouldBlock => break,
            }
        }
        Ok(BlockingResult::Count(sent))
    }

    /// Receives a datagram and the endpoint it came from.
    pub fn recvfrom(
        &self,
        buf: &mut [u8],
        flags: i32,
    ) -> Result<(BlockingResult, Option<ConnectionInfo>), NetError> {
        let fd = self.fd()?;
        self.require_connectionless()?;
        let mut from = SockAddr::empty();
        let result = sys::recv_from(fd, buf, flags, &mut from)?;
        if result.is_would_block() {
            return Ok((result, None));
        }
        let peer = ConnectionInfo::new(from.to_std()?, self.socket_type, self.protocol);
        Ok((result, Some(peer)))
    }

    /// Sends a datagram to `addr`.
    pub fn sendto(
        &self,
        buf: &[u8],
        flags: i32,
        addr: &ConnectionInfo,
    ) -> Result<BlockingResult, NetError> {
        let fd = self.fd()?;
        self.require_connectionless()?;
        sys::send_to(fd, buf, flags, &SockAddr::from_std(&addr.addr()))
    }

    fn require_connectionless(&self) -> Result<(), NetError> {
        if self.socket_type.is_connection_oriented() {
            Err(NetError::ContractViolation(
                "recvfrom/sendto called on a connection-oriented socket",
            ))
        } else {
            Ok(())
        }
    }

    /// Receives directly into the spare capacity of `buf`.
    pub fn recv_buf<B: BufMut>(&self, buf: &mut B, flags: i32) -> Result<BlockingResult, NetError> {
        let fd = self.fd()?;
        let chunk = buf.chunk_mut();
        // SAFETY: recv writes at most `chunk.len()` bytes into the chunk.
        let result = unsafe { sys::recv_into(fd, chunk.as_mut_ptr(), chunk.len(), flags)? };
        if let BlockingResult::Count(n) = result {
            // SAFETY: the kernel initialized the first `n` bytes.
            unsafe { buf.advance_mut(n) };
        }
        Ok(result)
    }

    /// Sends the current chunk of `buf`, advancing it by what was written.
    pub fn send_buf<B: Buf>(&self, buf: &mut B, flags: i32) -> Result<BlockingResult, NetError> {
        let result = self.send(buf.chunk(), flags)?;
        if let BlockingResult::Count(n) = result {
            buf.advance(n);
        }
        Ok(result)
    }

    pub fn get_option<O: SocketOption>(&self, option: &O) -> Result<O::Value, NetError> {
        let fd = self.fd()?;
        let mut payload = vec![0u8; option.native_size()];
        let len = sys::getsockopt(fd, option.level(), option.option(), &mut payload)
            .inspect_err(|e| tracing::debug!(option = option.name(), error = %e, "getsockopt failed"))?;
        Ok(option.decode(&payload[..len.min(payload.len())]))
    }

    pub fn set_option<O: SocketOption>(&self, option: &O, value: O::Value) -> Result<(), NetError> {
        let fd = self.fd()?;
        let payload = option.encode(value);
        sys::setsockopt(fd, option.level(), option.option(), &payload)
            .inspect_err(|e| tracing::debug!(option = option.name(), error = %e, "setsockopt failed"))
    }

    /// Reads and clears `SO_ERROR`.
    pub fn take_error(&self) -> Result<Option<NetError>, NetError> {
        let fd = self.fd()?;
        let mut payload = [0u8; std::mem::size_of::<libc::c_int>()];
        sys::getsockopt(fd, libc::SOL_SOCKET, libc::SO_ERROR, &mut payload)?;
        match libc::c_int::from_ne_bytes(payload) {
            0 => Ok(None),
            code => Ok(Some(NetError::from_os(code))),
        }
    }

    /// Queries the OS flag; never cached.
    pub fn is_nonblocking(&self) -> Result<bool, NetError> {
        sys::is_nonblocking(self.fd()?)
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), NetError> {
        sys::set_nonblocking(self.fd()?, nonblocking)
    }

    /// Waits until the socket is readable. Returns `false` on timeout.
    pub fn wait_readable(&self, timeout: Option<Duration>) -> Result<bool, NetError> {
        sys::poll(self.fd()?, libc::POLLIN, timeout)
    }

    /// Waits until the socket is writable. Returns `false` on timeout.
    pub fn wait_writable(&self, timeout: Option<Duration>) -> Result<bool, NetError> {
        sys::poll(self.fd()?, libc::POLLOUT, timeout)
    }

    pub fn shutdown(&self, how: Shutdown) -> Result<(), NetError> {
        sys::shutdown(self.fd()?, how.raw())
    }

    pub fn local_addr(&self) -> Result<ConnectionInfo, NetError> {
        let addr = sys::local_addr(self.fd()?)?.to_std()?;
        Ok(ConnectionInfo::new(addr, self.socket_type, self.protocol))
    }

    pub fn peer_addr(&self) -> Result<ConnectionInfo, NetError> {
        let addr = sys::peer_addr(self.fd()?)?.to_std()?;
        Ok(ConnectionInfo::new(addr, self.socket_type, self.protocol))
    }

    /// Releases the descriptor. Only the first call reaches the OS.
    pub fn close(&self) -> Result<(), NetError> {
        if self
            .open
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        tracing::debug!(fd = self.fd, "socket closed");
        sys::close(self.fd)
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(fd = self.fd, error = %e, "close on drop failed");
        }
    }
}

impl AsRawFd for Socket {
    /// Raw descriptor, still returned after close; do not use it then.
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("fd", &self.fd)
            .field("family", &self.family)
            .field("socket_type", &self.socket_type)
            .field("protocol", &self.protocol)
            .field("open", &self.is_open())
            .finish()
    }
}
