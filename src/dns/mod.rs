//! DNS Resolution Module
//!
//! Provides pluggable, blocking DNS resolution with support for:
//! - System resolver (getaddrinfo)
//! - Hostname-to-IP override mechanism
//!
//! # Architecture
//!
//! This module mirrors Chromium's `HostResolver` concept. The `Resolve`
//! trait is the core abstraction consumed by
//! [`ConnectJob`](crate::socket::ConnectJob); resolvers produce ordered
//! [`ConnectionInfo`](crate::socket::ConnectionInfo) candidates.
//!
//! # Example
//!
//! ```rust,ignore
//! use syncnet::dns::{GaiResolver, Hints, Name, Resolve};
//!
//! let resolver = GaiResolver::new();
//! for candidate in resolver.resolve(&Name::new("example.com"), 443, &Hints::tcp())? {
//!     println!("Resolved: {}", candidate);
//! }
//! ```

mod gai;
mod resolve;

pub use gai::GaiResolver;
pub use resolve::{DnsResolverWithOverrides, Hints, Name, Resolve};
