//! Endpoint descriptions and native address marshalling.
//!
//! [`ConnectionInfo`] is the immutable endpoint value passed between the
//! resolver, the dialer and [`Socket`](super::Socket). The address family is
//! carried by the `SocketAddr` variant itself; family-specific constants are
//! resolved in one place ([`AddressFamily::wildcard`] and
//! [`AddressFamily::loopback`]).

use crate::base::neterror::NetError;
use std::fmt;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// IP protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub(crate) fn raw(self) -> libc::c_int {
        match self {
            AddressFamily::Ipv4 => libc::AF_INET,
            AddressFamily::Ipv6 => libc::AF_INET6,
        }
    }

    /// `0.0.0.0` or `::`.
    pub fn wildcard(self) -> IpAddr {
        match self {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// `127.0.0.1` or `::1`.
    pub fn loopback(self) -> IpAddr {
        match self {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::LOCALHOST),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::LOCALHOST),
        }
    }

    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

/// Socket type passed to `socket(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// Reliable, ordered byte stream (TCP).
    Stream,
    /// Unreliable packets (UDP).
    Datagram,
    Raw,
}

impl SocketType {
    pub(crate) fn raw(self) -> libc::c_int {
        match self {
            SocketType::Stream => libc::SOCK_STREAM,
            SocketType::Datagram => libc::SOCK_DGRAM,
            SocketType::Raw => libc::SOCK_RAW,
        }
    }

    /// Stream sockets are connection-oriented; `recvfrom`/`sendto` are
    /// rejected on them.
    pub fn is_connection_oriented(self) -> bool {
        matches!(self, SocketType::Stream)
    }
}

/// Transport protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Let the OS pick the default for the socket type.
    Default,
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
}

impl Protocol {
    pub(crate) fn raw(self) -> libc::c_int {
        match self {
            Protocol::Default => 0,
            Protocol::Tcp => libc::IPPROTO_TCP,
            Protocol::Udp => libc::IPPROTO_UDP,
            Protocol::Icmp => libc::IPPROTO_ICMP,
            Protocol::Icmpv6 => libc::IPPROTO_ICMPV6,
        }
    }

    /// Natural protocol for a socket type.
    pub fn default_for(ty: SocketType) -> Self {
        match ty {
            SocketType::Stream => Protocol::Tcp,
            SocketType::Datagram => Protocol::Udp,
            SocketType::Raw => Protocol::Default,
        }
    }
}

/// An immutable endpoint: address, port, socket type and protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    addr: SocketAddr,
    socket_type: SocketType,
    protocol: Protocol,
}

impl ConnectionInfo {
    pub fn new(addr: SocketAddr, socket_type: SocketType, protocol: Protocol) -> Self {
        Self {
            addr,
            socket_type,
            protocol,
        }
    }

    /// TCP endpoint.
    pub fn tcp(addr: SocketAddr) -> Self {
        Self::new(addr, SocketType::Stream, Protocol::Tcp)
    }

    /// UDP endpoint.
    pub fn udp(addr: SocketAddr) -> Self {
        Self::new(addr, SocketType::Datagram, Protocol::Udp)
    }

    /// Wildcard address of `family` on `port`.
    pub fn any(family: AddressFamily, port: u16, socket_type: SocketType) -> Self {
        Self::new(
            SocketAddr::new(family.wildcard(), port),
            socket_type,
            Protocol::default_for(socket_type),
        )
    }

    /// Loopback address of `family` on `port`.
    pub fn localhost(family: AddressFamily, port: u16, socket_type: SocketType) -> Self {
        Self::new(
            SocketAddr::new(family.loopback(), port),
            socket_type,
            Protocol::default_for(socket_type),
        )
    }

    pub fn family(&self) -> AddressFamily {
        match self.addr {
            SocketAddr::V4(_) => AddressFamily::Ipv4,
            SocketAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Same endpoint on a different port.
    pub fn with_port(self, port: u16) -> Self {
        let mut addr = self.addr;
        addr.set_port(port);
        Self { addr, ..self }
    }
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{:?}/{:?}",
            self.addr, self.socket_type, self.protocol
        )
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.addr, f)
    }
}

/// Native `sockaddr` storage for one address.
pub(crate) struct SockAddr {
    storage: libc::sockaddr_storage,
    len: libc::socklen_t,
}

impl SockAddr {
    /// Zeroed storage, for calls the kernel fills in.
    pub(crate) fn empty() -> Self {
        Self {
            // SAFETY: sockaddr_storage is plain old data.
            storage: unsafe { mem::zeroed() },
            len: mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t,
        }
    }

    pub(crate) fn from_std(addr: &SocketAddr) -> Self {
        let mut out = Self::empty();
        match addr {
            SocketAddr::V4(a) => {
                // SAFETY: sockaddr_storage is large enough and suitably aligned
                // for every sockaddr type.
                let sin = unsafe { &mut *(&mut out.storage as *mut _ as *mut libc::sockaddr_in) };
                sin.sin_family = libc::AF_INET as libc::sa_family_t;
                sin.sin_port = a.port().to_be();
                sin.sin_addr = libc::in_addr {
                    s_addr: u32::from_ne_bytes(a.ip().octets()),
                };
                out.len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
            }
            SocketAddr::V6(a) => {
                // SAFETY: as above.
                let sin6 =
                    unsafe { &mut *(&mut out.storage as *mut _ as *mut libc::sockaddr_in6) };
                sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                sin6.sin6_port = a.port().to_be();
                sin6.sin6_flowinfo = a.flowinfo();
                sin6.sin6_scope_id = a.scope_id();
                sin6.sin6_addr = libc::in6_addr {
                    s6_addr: a.ip().octets(),
                };
                out.len = mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
            }
        }
        out
    }

    pub(crate) fn to_std(&self) -> Result<SocketAddr, NetError> {
        match self.storage.ss_family as libc::c_int {
            libc::AF_INET if self.len as usize >= mem::size_of::<libc::sockaddr_in>() => {
                // SAFETY: family and length checked above.
                let sin = unsafe { &*(&self.storage as *const _ as *const libc::sockaddr_in) };
                let ip = Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes());
                Ok(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(sin.sin_port))))
            }
            libc::AF_INET6 if self.len as usize >= mem::size_of::<libc::sockaddr_in6>() => {
                // SAFETY: family and length checked above.
                let sin6 = unsafe { &*(&self.storage as *const _ as *const libc::sockaddr_in6) };
                Ok(SocketAddr::V6(SocketAddrV6::new(
                    Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                    u16::from_be(sin6.sin6_port),
                    sin6.sin6_flowinfo,
                    sin6.sin6_scope_id,
                )))
            }
            _ => Err(NetError::InvalidAddress("unsupported address family")),
        }
    }

    pub(crate) fn as_ptr(&self) -> *const libc::sockaddr {
        &self.storage as *const _ as *const libc::sockaddr
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut libc::sockaddr {
        &mut self.storage as *mut _ as *mut libc::sockaddr
    }

    pub(crate) fn len(&self) -> libc::socklen_t {
        self.len
    }

    pub(crate) fn len_mut(&mut self) -> &mut libc::socklen_t {
        &mut self.len
    }
}
