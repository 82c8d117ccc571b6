//! # syncnet
//!
//! Synchronous sockets and memory-buffer TLS for Rust.
//!
//! `syncnet` is a small transport core in the spirit of Chromium's
//! `net/socket/`: blocking and non-blocking sockets behind one result type,
//! a candidate dialer with IPv6 fallback, and a BoringSSL engine that runs
//! TLS over in-memory queues so it can sit on top of any transport.
//!
//! ## Features
//!
//! - **Sockets**: IPv4/IPv6 stream, datagram and raw sockets with idempotent, thread-safe close
//! - **Would-block as a value**: [`BlockingResult`] instead of `EAGAIN` errors
//! - **Socket options**: typed, self-marshalling option descriptors
//! - **Dialer**: sequential fallback across resolved candidates
//! - **TLS**: BoringSSL engine with ALPN, SNI and hostname verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use syncnet::dns::GaiResolver;
//! use syncnet::socket::tls::{TlsContext, TlsOptions, TlsStream};
//! use syncnet::dns::{Hints, Name, Resolve};
//!
//! let candidates = GaiResolver::new().resolve(&Name::new("example.com"), 443, &Hints::tcp())?;
//! let context = TlsContext::client(&TlsOptions::builder().alpn_protocols(&["http/1.1"]).build())?;
//! let mut stream = TlsStream::connect(&candidates, "example.com", &context, None)?;
//! stream.write(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n")?;
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error type and the would-block result
//! - [`dns`] - Name resolution producing dial candidates
//! - [`socket`] - Sockets, options, dialer and TLS

pub mod base;
pub mod dns;
pub mod socket;

pub use base::{BlockingResult, NetError};
