//! POSIX syscall layer.
//!
//! Thin wrappers that translate `-1`/`errno` into [`NetError`] and
//! `EAGAIN`/`EWOULDBLOCK` into [`BlockingResult::WouldBlock`]. Nothing here
//! retries or tracks state; [`Socket`](super::Socket) owns both.

use super::addr::SockAddr;
use crate::base::blocking::BlockingResult;
use crate::base::context::cvt;
use crate::base::neterror::NetError;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub(crate) fn errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[inline]
fn is_would_block(code: i32) -> bool {
    code == libc::EAGAIN || code == libc::EWOULDBLOCK
}

/// Converts an `ssize_t` transfer result.
fn cvt_transfer(n: libc::ssize_t) -> Result<BlockingResult, NetError> {
    if n >= 0 {
        return Ok(BlockingResult::Count(n as usize));
    }
    let code = errno();
    if is_would_block(code) {
        Ok(BlockingResult::WouldBlock)
    } else {
        Err(NetError::from_os(code))
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd",
                 target_os = "netbsd", target_os = "openbsd", target_os = "dragonfly"))] {
        pub(crate) fn socket(family: libc::c_int, ty: libc::c_int, proto: libc::c_int) -> Result<RawFd, NetError> {
            cvt(unsafe { libc::socket(family, ty | libc::SOCK_CLOEXEC, proto) })
        }

        pub(crate) fn accept(fd: RawFd, addr: &mut SockAddr, nonblocking: bool) -> Result<Option<RawFd>, NetError> {
            let mut flags = libc::SOCK_CLOEXEC;
            if nonblocking {
                flags |= libc::SOCK_NONBLOCK;
            }
            let ret = unsafe { libc::accept4(fd, addr.as_mut_ptr(), addr.len_mut(), flags) };
            accepted(ret)
        }

        const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
    } else {
        pub(crate) fn socket(family: libc::c_int, ty: libc::c_int, proto: libc::c_int) -> Result<RawFd, NetError> {
            let fd = cvt(unsafe { libc::socket(family, ty, proto) })?;
            if let Err(e) = prepare_fd(fd) {
                unsafe { libc::close(fd) };
                return Err(e);
            }
            Ok(fd)
        }

        pub(crate) fn accept(fd: RawFd, addr: &mut SockAddr, nonblocking: bool) -> Result<Option<RawFd>, NetError> {
            let ret = unsafe { libc::accept(fd, addr.as_mut_ptr(), addr.len_mut()) };
            let child = match accepted(ret)? {
                Some(child) => child,
                None => return Ok(None),
            };
            let prepared = prepare_fd(child).and_then(|_| set_nonblocking(child, nonblocking));
            if let Err(e) = prepared {
                unsafe { libc::close(child) };
                return Err(e);
            }
            Ok(Some(child))
        }

        /// FD_CLOEXEC and, where available, SO_NOSIGPIPE.
        fn prepare_fd(fd: RawFd) -> Result<(), NetError> {
            cvt(unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) })?;
            #[cfg(any(target_os = "macos", target_os = "ios"))]
            {
                let one: libc::c_int = 1;
                cvt(unsafe {
                    libc::setsockopt(
                        fd,
                        libc::SOL_SOCKET,
                        libc::SO_NOSIGPIPE,
                        &one as *const _ as *const libc::c_void,
                        std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                    )
                })?;
            }
            Ok(())
        }

        const SEND_FLAGS: libc::c_int = 0;
    }
}

fn accepted(ret: libc::c_int) -> Result<Option<RawFd>, NetError> {
    if ret >= 0 {
        return Ok(Some(ret));
    }
    let code = errno();
    if is_would_block(code) {
        Ok(None)
    } else {
        Err(NetError::from_os(code))
    }
}

pub(crate) fn close(fd: RawFd) -> Result<(), NetError> {
    cvt(unsafe { libc::close(fd) }).map(|_| ())
}

pub(crate) fn bind(fd: RawFd, addr: &SockAddr) -> Result<(), NetError> {
    cvt(unsafe { libc::bind(fd, addr.as_ptr(), addr.len()) }).map(|_| ())
}

pub(crate) fn listen(fd: RawFd, backlog: libc::c_int) -> Result<(), NetError> {
    cvt(unsafe { libc::listen(fd, backlog) }).map(|_| ())
}

/// Returns `Ok(false)` when the connect is in progress.
pub(crate) fn connect(fd: RawFd, addr: &SockAddr) -> Result<bool, NetError> {
    let ret = unsafe { libc::connect(fd, addr.as_ptr(), addr.len()) };
    if ret == 0 {
        return Ok(true);
    }
    match errno() {
        libc::EINPROGRESS => Ok(false),
        code if is_would_block(code) => Ok(false),
        code => Err(NetError::from_os(code)),
    }
}

pub(crate) fn recv(fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> Result<BlockingResult, NetError> {
    // SAFETY: the slice is valid for writes of its full length.
    unsafe { recv_into(fd, buf.as_mut_ptr(), buf.len(), flags) }
}

/// `recv(2)` into possibly uninitialized memory.
///
/// # Safety
///
/// `ptr` must be valid for writes of `len` bytes.
pub(crate) unsafe fn recv_into(
    fd: RawFd,
    ptr: *mut u8,
    len: usize,
    flags: libc::c_int,
) -> Result<BlockingResult, NetError> {
    cvt_transfer(libc::recv(fd, ptr as *mut libc::c_void, len, flags))
}

pub(crate) fn send(fd: RawFd, buf: &[u8], flags: libc::c_int) -> Result<BlockingResult, NetError> {
    cvt_transfer(unsafe {
        libc::send(
            fd,
            buf.as_ptr() as *const libc::c_void,
            buf.len(),
            flags | SEND_FLAGS,
        )
    })
}

pub(crate) fn recv_from(
    fd: RawFd,
    buf: &mut [u8],
    flags: libc::c_int,
    from: &mut SockAddr,
) -> Result<BlockingResult, NetError> {
    cvt_transfer(unsafe {
        libc::recvfrom(
            fd,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            flags,
            from.as_mut_ptr(),
            from.len_mut(),
        )
    })
}

pub(crate) fn send_to(
    fd: RawFd,
    buf: &[u8],
    flags: libc::c_int,
    to: &SockAddr,
) -> Result<BlockingResult, NetError> {
    cvt_transfer(unsafe {
        libc::sendto(
            fd,
            buf.as_ptr() as *const libc::c_void,
            buf.len(),
            flags | SEND_FLAGS,
            to.as_ptr(),
            to.len(),
        )
    })
}

/// Reads an option into `payload`, returning the length the kernel wrote.
pub(crate) fn getsockopt(
    fd: RawFd,
    level: libc::c_int,
    option: libc::c_int,
    payload: &mut [u8],
) -> Result<usize, NetError> {
    let mut len = payload.len() as libc::socklen_t;
    cvt(unsafe {
        libc::getsockopt(
            fd,
            level,
            option,
            payload.as_mut_ptr() as *mut libc::c_void,
            &mut len,
        )
    })?;
    Ok(len as usize)
}

pub(crate) fn setsockopt(
    fd: RawFd,
    level: libc::c_int,
    option: libc::c_int,
    payload: &[u8],
) -> Result<(), NetError> {
    cvt(unsafe {
        libc::setsockopt(
            fd,
            level,
            option,
            payload.as_ptr() as *const libc::c_void,
            payload.len() as libc::socklen_t,
        )
    })
    .map(|_| ())
}

pub(crate) fn is_nonblocking(fd: RawFd) -> Result<bool, NetError> {
    let flags = cvt(unsafe { libc::fcntl(fd, libc::F_GETFL) })?;
    Ok(flags & libc::O_NONBLOCK != 0)
}

pub(crate) fn set_nonblocking(fd: RawFd, nonblocking: bool) -> Result<(), NetError> {
    let flags = cvt(unsafe { libc::fcntl(fd, libc::F_GETFL) })?;
    let new_flags = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    if new_flags != flags {
        cvt(unsafe { libc::fcntl(fd, libc::F_SETFL, new_flags) })?;
    }
    Ok(())
}

pub(crate) fn shutdown(fd: RawFd, how: libc::c_int) -> Result<(), NetError> {
    cvt(unsafe { libc::shutdown(fd, how) }).map(|_| ())
}

pub(crate) fn local_addr(fd: RawFd) -> Result<SockAddr, NetError> {
    let mut addr = SockAddr::empty();
    cvt(unsafe { libc::getsockname(fd, addr.as_mut_ptr(), addr.len_mut()) })?;
    Ok(addr)
}

pub(crate) fn peer_addr(fd: RawFd) -> Result<SockAddr, NetError> {
    let mut addr = SockAddr::empty();
    cvt(unsafe { libc::getpeername(fd, addr.as_mut_ptr(), addr.len_mut()) })?;
    Ok(addr)
}

/// Waits for `events` on `fd`. `None` waits forever.
///
/// Returns `false` on timeout. `EINTR` restarts the wait with the full
/// timeout, which can only lengthen it.
pub(crate) fn poll(fd: RawFd, events: libc::c_short, timeout: Option<Duration>) -> Result<bool, NetError> {
    let timeout_ms = poll_timeout_ms(timeout);
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    loop {
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret >= 0 {
            return Ok(ret > 0);
        }
        let code = errno();
        if code != libc::EINTR {
            return Err(NetError::from_os(code));
        }
    }
}

/// Converts a wait to `poll`'s millisecond argument, rounding up so a
/// sub-millisecond remainder still waits.
fn poll_timeout_ms(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(t) => {
            let ms = t.as_nanos().div_ceil(1_000_000);
            ms.min(libc::c_int::MAX as u128) as libc::c_int
        }
    }
}
