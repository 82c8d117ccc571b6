//! System DNS resolver using getaddrinfo.
//!
//! This resolver uses the operating system's native DNS resolution via
//! `getaddrinfo`, called on the current thread.
//!
//! # When to Use
//!
//! - When you need to respect system DNS configuration (/etc/resolv.conf, etc.)
//! - When the caller is already prepared to block on I/O

use super::{Hints, Name, Resolve};
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::socket::addr::{AddressFamily, ConnectionInfo};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs},
    sync::Arc,
};

/// System DNS resolver backed by `getaddrinfo`.
///
/// Wraps the standard library's `ToSocketAddrs`, so resolution blocks the
/// calling thread for as long as the system resolver takes.
#[derive(Clone, Debug, Default)]
pub struct GaiResolver;

impl GaiResolver {
    /// Creates a new `GaiResolver`.
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for GaiResolver {
    fn resolve(
        &self,
        name: &Name,
        port: u16,
        hints: &Hints,
    ) -> Result<Vec<ConnectionInfo>, NetError> {
        let host = name.as_str();

        if host.is_empty() {
            if !hints.passive {
                return Err(not_resolved(
                    host,
                    io::Error::new(io::ErrorKind::InvalidInput, "empty host name"),
                ));
            }
            return Ok(passive_wildcards(port, hints));
        }

        if let Some(ip) = parse_ip_literal(host) {
            tracing::trace!(host, "IP literal, skipping getaddrinfo");
            let found = hints.apply([SocketAddr::new(ip, port)], port);
            return non_empty(host, found);
        }

        tracing::debug!(host, "resolving via getaddrinfo");
        let addrs = (host, port)
            .to_socket_addrs()
            .dns_context(host)
            .inspect_err(|e| tracing::debug!(domain = %host, error = %e, "DNS resolution failed"))?;

        let found = hints.apply(addrs, port);
        tracing::debug!(domain = %host, count = found.len(), "DNS resolution complete");
        non_empty(host, found)
    }
}

/// Accepts bare and bracketed IPv6 literals as well as IPv4.
fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    if let Ok(v4) = host.parse::<Ipv4Addr>() {
        return Some(IpAddr::V4(v4));
    }
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<Ipv6Addr>().ok().map(IpAddr::V6)
}

fn passive_wildcards(port: u16, hints: &Hints) -> Vec<ConnectionInfo> {
    let families = match hints.family {
        Some(family) => vec![family],
        None => vec![AddressFamily::Ipv6, AddressFamily::Ipv4],
    };
    families
        .into_iter()
        .map(|f| ConnectionInfo::new(SocketAddr::new(f.wildcard(), port), hints.socket_type, hints.protocol))
        .collect()
}

fn non_empty(host: &str, found: Vec<ConnectionInfo>) -> Result<Vec<ConnectionInfo>, NetError> {
    if found.is_empty() {
        return Err(not_resolved(
            host,
            io::Error::new(
                io::ErrorKind::NotFound,
                "No addresses returned by getaddrinfo",
            ),
        ));
    }
    Ok(found)
}

fn not_resolved(host: &str, source: io::Error) -> NetError {
    NetError::NameNotResolvedFor {
        domain: host.to_string(),
        source: Arc::new(source),
    }
}
