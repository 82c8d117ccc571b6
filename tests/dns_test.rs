//! DNS Module Tests
//!
//! Covers:
//! - `Name` struct
//! - `DnsResolverWithOverrides` using a MockResolver
//! - `GaiResolver` (Basic System Resolver)

use std::borrow::Cow;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use syncnet::dns::{DnsResolverWithOverrides, GaiResolver, Hints, Name, Resolve};
use syncnet::socket::{AddressFamily, ConnectionInfo, SocketType};
use syncnet::NetError;

struct MockResolver {
    response: Vec<SocketAddr>,
    calls: AtomicUsize,
}

impl Resolve for MockResolver {
    fn resolve(
        &self,
        _name: &Name,
        port: u16,
        hints: &Hints,
    ) -> Result<Vec<ConnectionInfo>, NetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(hints.apply(self.response.clone(), port))
    }
}

#[test]
fn test_name_api() {
    let name = Name::new("example.com");
    assert_eq!(name.as_str(), "example.com");
    assert_eq!(name.to_string(), "example.com");
    assert_eq!(format!("{:?}", name), "\"example.com\"");
}

#[test]
fn test_dns_overrides() {
    let mock = Arc::new(MockResolver {
        response: vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 0)],
        calls: AtomicUsize::new(0),
    });

    let mut overrides = HashMap::new();
    overrides.insert(
        Cow::Borrowed("local.override"),
        vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 80)],
    );

    let resolver = DnsResolverWithOverrides::new(mock.clone(), overrides);
    assert_eq!(resolver.override_count(), 1);

    // Test override hit: the override's own port wins.
    let addrs = resolver
        .resolve(&Name::new("local.override"), 443, &Hints::tcp())
        .unwrap();
    assert_eq!(addrs.len(), 1);
    assert_eq!(addrs[0].ip(), IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
    assert_eq!(addrs[0].port(), 80);
    assert_eq!(mock.calls.load(Ordering::SeqCst), 0);

    // Test passthrough (miss)
    let addrs = resolver
        .resolve(&Name::new("other.com"), 443, &Hints::tcp())
        .unwrap();
    assert_eq!(addrs[0].ip(), IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
    assert_eq!(addrs[0].port(), 443);
    assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_gai_localhost_family_filter() {
    let resolver = GaiResolver::new();
    let v4 = resolver
        .resolve(
            &Name::new("localhost"),
            8080,
            &Hints::tcp().family(AddressFamily::Ipv4),
        )
        .unwrap();
    assert!(!v4.is_empty());
    for candidate in &v4 {
        assert_eq!(candidate.family(), AddressFamily::Ipv4);
        assert_eq!(candidate.port(), 8080);
        assert_eq!(candidate.socket_type(), SocketType::Stream);
    }
}

#[test]
fn test_gai_invalid_name() {
    let err = GaiResolver::new()
        .resolve(&Name::new("name.invalid"), 80, &Hints::tcp())
        .unwrap_err();
    match err {
        NetError::NameNotResolvedFor { domain, .. } => assert_eq!(domain, "name.invalid"),
        other => panic!("Expected NameNotResolvedFor, got {:?}", other),
    }
}

#[test]
fn test_passive_wildcard_for_binding() {
    let found = GaiResolver::new()
        .resolve(
            &Name::new(""),
            0,
            &Hints::udp().family(AddressFamily::Ipv4).passive(true),
        )
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(found[0].socket_type(), SocketType::Datagram);
}
