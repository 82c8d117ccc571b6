//! Core DNS resolution types and traits.
//!
//! This module defines the `Resolve` trait and supporting types that form
//! the boundary between name resolution and the dialer.

use crate::base::neterror::NetError;
use crate::socket::addr::{AddressFamily, ConnectionInfo, Protocol, SocketType};
use std::{borrow::Cow, collections::HashMap, fmt, net::SocketAddr, sync::Arc};

/// A domain name to resolve into IP addresses.
///
/// This is a lightweight wrapper around a hostname string that provides
/// a type-safe way to pass domain names to resolvers.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`] from any string-like type.
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// Resolution hints, the `getaddrinfo` hints equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hints {
    /// Restrict results to one family; `None` accepts both.
    pub family: Option<AddressFamily>,
    pub socket_type: SocketType,
    pub protocol: Protocol,
    /// An empty host resolves to the wildcard address (for binding).
    pub passive: bool,
}

impl Hints {
    /// Stream/TCP hints for either family.
    pub fn tcp() -> Self {
        Self {
            family: None,
            socket_type: SocketType::Stream,
            protocol: Protocol::Tcp,
            passive: false,
        }
    }

    /// Datagram/UDP hints for either family.
    pub fn udp() -> Self {
        Self {
            family: None,
            socket_type: SocketType::Datagram,
            protocol: Protocol::Udp,
            passive: false,
        }
    }

    pub fn family(mut self, family: AddressFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// Filters `addrs` by family and stamps them with `port`, socket type
    /// and protocol. Addresses already carrying a non-zero port keep it.
    pub fn apply(
        &self,
        addrs: impl IntoIterator<Item = SocketAddr>,
        port: u16,
    ) -> Vec<ConnectionInfo> {
        addrs
            .into_iter()
            .filter(|a| {
                self.family
                    .map_or(true, |f| f == AddressFamily::of(&a.ip()))
            })
            .map(|mut a| {
                if a.port() == 0 {
                    a.set_port(port);
                }
                ConnectionInfo::new(a, self.socket_type, self.protocol)
            })
            .collect()
    }
}

impl Default for Hints {
    fn default() -> Self {
        Self::tcp()
    }
}

/// Trait for name resolution.
///
/// This is the boundary consumed by the dialer, equivalent to Chromium's
/// `HostResolver`. Implementations must be thread-safe and may block.
pub trait Resolve: Send + Sync {
    /// Resolves `name` into connection candidates for `port`, in the order
    /// they should be dialed.
    fn resolve(
        &self,
        name: &Name,
        port: u16,
        hints: &Hints,
    ) -> Result<Vec<ConnectionInfo>, NetError>;
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(
        &self,
        name: &Name,
        port: u16,
        hints: &Hints,
    ) -> Result<Vec<ConnectionInfo>, NetError> {
        (**self).resolve(name, port, hints)
    }
}

/// DNS resolver wrapper that supports hostname overrides.
///
/// This resolver first checks a map of hostname-to-address overrides before
/// falling back to the underlying resolver. Useful for:
/// - Testing without real DNS
/// - Forcing specific IPs for certain domains
/// - Local development with custom hostnames
///
/// # Example
///
/// ```rust,ignore
/// use syncnet::dns::{DnsResolverWithOverrides, GaiResolver};
/// use std::collections::HashMap;
///
/// let mut overrides = HashMap::new();
/// overrides.insert("api.local".into(), vec!["127.0.0.1:0".parse().unwrap()]);
///
/// let resolver = DnsResolverWithOverrides::new(Arc::new(GaiResolver::new()), overrides);
/// ```
pub struct DnsResolverWithOverrides {
    inner: Arc<dyn Resolve>,
    overrides: Arc<HashMap<Cow<'static, str>, Vec<SocketAddr>>>,
}

impl DnsResolverWithOverrides {
    /// Creates a new resolver with the given overrides.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fallback resolver for non-overridden hostnames.
    /// * `overrides` - Map of hostnames to their resolved addresses, in
    ///   dial order. Port 0 entries take the requested port.
    pub fn new(
        inner: Arc<dyn Resolve>,
        overrides: HashMap<Cow<'static, str>, Vec<SocketAddr>>,
    ) -> Self {
        Self {
            inner,
            overrides: Arc::new(overrides),
        }
    }

    /// Returns the number of configured overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl Resolve for DnsResolverWithOverrides {
    fn resolve(
        &self,
        name: &Name,
        port: u16,
        hints: &Hints,
    ) -> Result<Vec<ConnectionInfo>, NetError> {
        if let Some(addrs) = self.overrides.get(name.as_str()) {
            tracing::debug!(domain = %name, count = addrs.len(), "resolved from overrides");
            return Ok(hints.apply(addrs.iter().copied(), port));
        }
        self.inner.resolve(name, port, hints)
    }
}

impl fmt::Debug for DnsResolverWithOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolverWithOverrides")
            .field("override_count", &self.overrides.len())
            .finish_non_exhaustive()
    }
}
