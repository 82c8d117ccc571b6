//! TLS over memory buffers, backed by BoringSSL.
//!
//! - [`TlsContext`]: compiled configuration, shared across connections
//! - [`engine::TlsEngine`]: transport-agnostic handshake/record engine
//! - [`stream::TlsStream`]: engine bound to a [`Socket`](crate::socket::Socket)

use crate::base::neterror::NetError;
use boring::pkey::PKey;
use boring::ssl::{
    select_next_proto, AlpnError, SslContext, SslContextBuilder, SslContextRef, SslMethod,
    SslOptions, SslVerifyMode,
};
use boring::x509::X509;
use std::fmt;
use std::net::IpAddr;

pub mod engine;
pub mod options;
pub mod stream;

pub use self::engine::{PeerCertificate, TlsEngine};
pub use self::options::{TlsIdentity, TlsOptions, TlsOptionsBuilder, TlsVersion};
pub use self::stream::TlsStream;

/// Which end of the handshake an engine plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsRole {
    Client,
    Server,
}

/// [`TlsOptions`] compiled into a BoringSSL context.
///
/// Cloning is cheap (reference counted); one context serves any number of
/// engines.
#[derive(Clone)]
pub struct TlsContext {
    inner: SslContext,
    role: TlsRole,
    verify_peer: bool,
}

impl TlsContext {
    pub fn new(role: TlsRole, options: &TlsOptions) -> Result<Self, NetError> {
        let mut builder = SslContext::builder(SslMethod::tls())?;

        if let Some(min) = options.min_tls_version {
            builder.set_min_proto_version(Some(min.to_ssl()))?;
        }
        if let Some(max) = options.max_tls_version {
            builder.set_max_proto_version(Some(max.to_ssl()))?;
        }
        if let Some(ciphers) = &options.cipher_list {
            builder.set_cipher_list(ciphers)?;
        }
        if let Some(curves) = &options.curves_list {
            builder.set_curves_list(curves)?;
        }
        if let Some(sigalgs) = &options.sigalgs_list {
            builder.set_sigalgs_list(sigalgs)?;
        }
        if !options.session_ticket {
            builder.set_options(SslOptions::NO_TICKET);
        }

        if let Some(wire) = options.alpn_wire()? {
            match role {
                TlsRole::Client => builder.set_alpn_protos(&wire)?,
                TlsRole::Server => builder.set_alpn_select_callback(move |_, client| {
                    select_next_proto(&wire, client).ok_or(AlpnError::NOACK)
                }),
            }
        }

        Self::configure_trust(&mut builder, role, options)?;

        match &options.identity {
            Some(identity) => {
                let mut chain = X509::stack_from_pem(&identity.cert_chain_pem)?.into_iter();
                let leaf = chain
                    .next()
                    .ok_or_else(|| NetError::tls("identity certificate chain is empty"))?;
                builder.set_certificate(&leaf)?;
                for extra in chain {
                    builder.add_extra_chain_cert(extra)?;
                }
                let key = PKey::private_key_from_pem(&identity.private_key_pem)?;
                builder.set_private_key(&key)?;
                builder.check_private_key()?;
            }
            None if role == TlsRole::Server => {
                return Err(NetError::ContractViolation(
                    "server TLS context requires an identity",
                ));
            }
            None => {}
        }

        tracing::debug!(?role, verify_peer = options.verify_peer, "TLS context ready");

        Ok(Self {
            inner: builder.build(),
            role,
            verify_peer: options.verify_peer,
        })
    }

    pub fn client(options: &TlsOptions) -> Result<Self, NetError> {
        Self::new(TlsRole::Client, options)
    }

    pub fn server(options: &TlsOptions) -> Result<Self, NetError> {
        Self::new(TlsRole::Server, options)
    }

    pub fn role(&self) -> TlsRole {
        self.role
    }

    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    pub(crate) fn ssl_context(&self) -> &SslContextRef {
        &self.inner
    }

    fn configure_trust(
        builder: &mut SslContextBuilder,
        role: TlsRole,
        options: &TlsOptions,
    ) -> Result<(), NetError> {
        let mode = match (options.verify_peer, role) {
            (false, _) => SslVerifyMode::NONE,
            (true, TlsRole::Client) => SslVerifyMode::PEER,
            (true, TlsRole::Server) if options.require_client_certificate => {
                SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT
            }
            // Ask for a client certificate only when there is something to check it against.
            (true, TlsRole::Server) if !options.trusted_certificates.is_empty() => {
                SslVerifyMode::PEER
            }
            (true, TlsRole::Server) => SslVerifyMode::NONE,
        };
        builder.set_verify(mode);

        if options.use_system_roots {
            builder.set_default_verify_paths()?;
        }
        for pem in &options.trusted_certificates {
            for cert in X509::stack_from_pem(pem)? {
                builder.cert_store_mut().add_cert(cert)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("role", &self.role)
            .field("verify_peer", &self.verify_peer)
            .finish_non_exhaustive()
    }
}

/// Parses `host` as an IP literal, accepting bracketed IPv6.
pub(crate) fn ip_literal(host: &str) -> Option<IpAddr> {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse().ok()
}

/// Check if SNI should be set for this host.
/// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
pub fn should_set_sni(host: &str) -> bool {
    !host.is_empty() && ip_literal(host).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_set_sni() {
        assert!(should_set_sni("example.com"));
        assert!(!should_set_sni("127.0.0.1"));
        assert!(!should_set_sni("::1"));
        assert!(!should_set_sni("[::1]"));
        assert!(!should_set_sni(""));
    }

    #[test]
    fn test_client_context_defaults() {
        let ctx = TlsContext::client(&TlsOptions::default()).unwrap();
        assert_eq!(ctx.role(), TlsRole::Client);
        assert!(ctx.verify_peer());
    }

    #[test]
    fn test_server_context_requires_identity() {
        let err = TlsContext::server(&TlsOptions::default()).unwrap_err();
        assert!(matches!(err, NetError::ContractViolation(_)));
    }

    #[test]
    fn test_bad_cipher_list_is_tls_error() {
        let opts = TlsOptions::builder().cipher_list("NOT-A-CIPHER").build();
        let err = TlsContext::client(&opts).unwrap_err();
        assert!(matches!(err, NetError::Tls { .. }));
    }
}
