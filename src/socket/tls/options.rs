use crate::base::neterror::NetError;
use boring::ssl::SslVersion;
use std::fmt;

/// A TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    Tls1_0,
    Tls1_1,
    Tls1_2,
    Tls1_3,
}

impl TlsVersion {
    pub(crate) fn to_ssl(self) -> SslVersion {
        match self {
            TlsVersion::Tls1_0 => SslVersion::TLS1,
            TlsVersion::Tls1_1 => SslVersion::TLS1_1,
            TlsVersion::Tls1_2 => SslVersion::TLS1_2,
            TlsVersion::Tls1_3 => SslVersion::TLS1_3,
        }
    }

    /// Parses BoringSSL's `SSL_get_version` spelling.
    pub(crate) fn from_version_str(s: &str) -> Option<Self> {
        match s {
            "TLSv1" => Some(TlsVersion::Tls1_0),
            "TLSv1.1" => Some(TlsVersion::Tls1_1),
            "TLSv1.2" => Some(TlsVersion::Tls1_2),
            "TLSv1.3" => Some(TlsVersion::Tls1_3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls1_0 => "TLSv1",
            TlsVersion::Tls1_1 => "TLSv1.1",
            TlsVersion::Tls1_2 => "TLSv1.2",
            TlsVersion::Tls1_3 => "TLSv1.3",
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A certificate chain and its private key, both PEM encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsIdentity {
    pub cert_chain_pem: Vec<u8>,
    pub private_key_pem: Vec<u8>,
}

impl fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("cert_chain_pem", &self.cert_chain_pem.len())
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Builder for `TlsOptions`.
#[must_use]
#[derive(Debug, Clone)]
pub struct TlsOptionsBuilder {
    config: TlsOptions,
}

/// TLS connection configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// ALPN protocols, in preference order.
    pub alpn_protocols: Option<Vec<String>>,

    /// Minimum TLS version.
    pub min_tls_version: Option<TlsVersion>,

    /// Maximum TLS version.
    pub max_tls_version: Option<TlsVersion>,

    /// Enable session tickets.
    pub session_ticket: bool,

    /// Cipher suite configuration string.
    pub cipher_list: Option<String>,

    /// Supported curves list.
    pub curves_list: Option<String>,

    /// Supported signature algorithms.
    pub sigalgs_list: Option<String>,

    /// Verify the peer's certificate chain and, on clients, its name.
    pub verify_peer: bool,

    /// Load the platform's default trust roots.
    pub use_system_roots: bool,

    /// Extra trust anchors, PEM encoded.
    pub trusted_certificates: Vec<Vec<u8>>,

    /// Certificate presented to the peer. Required for servers.
    pub identity: Option<TlsIdentity>,

    /// Servers only: fail the handshake when the client sends no certificate.
    pub require_client_certificate: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            alpn_protocols: None,
            min_tls_version: Some(TlsVersion::Tls1_2),
            max_tls_version: Some(TlsVersion::Tls1_3),
            session_ticket: true,
            cipher_list: None,
            curves_list: None,
            sigalgs_list: None,
            verify_peer: true,
            use_system_roots: true,
            trusted_certificates: Vec::new(),
            identity: None,
            require_client_certificate: false,
        }
    }
}

impl TlsOptionsBuilder {
    pub fn new() -> Self {
        Self {
            config: TlsOptions::default(),
        }
    }

    pub fn alpn_protocols(mut self, alpn: &[&str]) -> Self {
        self.config.alpn_protocols = Some(alpn.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn min_tls_version(mut self, version: TlsVersion) -> Self {
        self.config.min_tls_version = Some(version);
        self
    }

    pub fn max_tls_version(mut self, version: TlsVersion) -> Self {
        self.config.max_tls_version = Some(version);
        self
    }

    pub fn session_ticket(mut self, enabled: bool) -> Self {
        self.config.session_ticket = enabled;
        self
    }

    pub fn cipher_list(mut self, ciphers: &str) -> Self {
        self.config.cipher_list = Some(ciphers.to_string());
        self
    }

    pub fn curves_list(mut self, curves: &str) -> Self {
        self.config.curves_list = Some(curves.to_string());
        self
    }

    pub fn sigalgs_list(mut self, sigalgs: &str) -> Self {
        self.config.sigalgs_list = Some(sigalgs.to_string());
        self
    }

    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.config.verify_peer = verify;
        self
    }

    pub fn use_system_roots(mut self, enabled: bool) -> Self {
        self.config.use_system_roots = enabled;
        self
    }

    /// Trusts every certificate in `pem` in addition to the configured roots.
    pub fn add_trusted_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.config.trusted_certificates.push(pem.into());
        self
    }

    pub fn identity(mut self, cert_chain_pem: impl Into<Vec<u8>>, private_key_pem: impl Into<Vec<u8>>) -> Self {
        self.config.identity = Some(TlsIdentity {
            cert_chain_pem: cert_chain_pem.into(),
            private_key_pem: private_key_pem.into(),
        });
        self
    }

    pub fn require_client_certificate(mut self, required: bool) -> Self {
        self.config.require_client_certificate = required;
        self
    }

    pub fn build(self) -> TlsOptions {
        self.config
    }
}

impl Default for TlsOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsOptions {
    pub fn builder() -> TlsOptionsBuilder {
        TlsOptionsBuilder::new()
    }

    /// ALPN protocols in wire format (length-prefixed), or `None` when
    /// ALPN is not configured.
    pub(crate) fn alpn_wire(&self) -> Result<Option<Vec<u8>>, NetError> {
        let protos = match &self.alpn_protocols {
            Some(protos) if !protos.is_empty() => protos,
            _ => return Ok(None),
        };
        let mut alpn_wire = Vec::new();
        for proto in protos {
            if proto.is_empty() || proto.len() > 255 {
                return Err(NetError::tls(format!("invalid ALPN protocol {:?}", proto)));
            }
            alpn_wire.push(proto.len() as u8);
            alpn_wire.extend_from_slice(proto.as_bytes());
        }
        Ok(Some(alpn_wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpn_wire_format() {
        let opts = TlsOptions::builder().alpn_protocols(&["h2", "http/1.1"]).build();
        let wire = opts.alpn_wire().unwrap().unwrap();
        assert_eq!(wire, b"\x02h2\x08http/1.1".to_vec());

        assert!(TlsOptions::default().alpn_wire().unwrap().is_none());
    }

    #[test]
    fn test_alpn_rejects_oversized_protocol() {
        let long = "x".repeat(256);
        let opts = TlsOptions::builder().alpn_protocols(&[long.as_str()]).build();
        assert!(matches!(opts.alpn_wire(), Err(NetError::Tls { .. })));
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(TlsVersion::from_version_str("TLSv1.3"), Some(TlsVersion::Tls1_3));
        assert_eq!(TlsVersion::from_version_str("TLSv1"), Some(TlsVersion::Tls1_0));
        assert_eq!(TlsVersion::from_version_str("unknown"), None);
        assert!(TlsVersion::Tls1_2 < TlsVersion::Tls1_3);
    }

    #[test]
    fn test_identity_debug_redacts_key() {
        let opts = TlsOptions::builder().identity("cert", "secret-key").build();
        let dbg = format!("{:?}", opts);
        assert!(!dbg.contains("secret-key"));
    }
}
