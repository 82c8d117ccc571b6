//! Transport-agnostic TLS engine.
//!
//! [`TlsEngine`] runs BoringSSL against two in-memory queues instead of a
//! socket. Ciphertext received from anywhere is pushed in with
//! [`incoming`](TlsEngine::incoming); ciphertext to transmit is pulled out
//! with [`outgoing`](TlsEngine::outgoing). Plaintext moves through
//! [`read`](TlsEngine::read) and [`write`](TlsEngine::write).
//!
//! ```text
//!   transport --incoming()--> [ in queue ] --> BoringSSL --> read()
//!   transport <--outgoing()-- [ out queue ] <-- BoringSSL <-- write()
//! ```
//!
//! A handshake is driven by a pump loop:
//!
//! ```ignore
//! while !engine.handshake()? {
//!     let n = engine.outgoing(&mut buf)?;
//!     transport.send(&buf[..n]);
//!     let n = transport.recv(&mut buf);
//!     engine.incoming(&buf[..n])?;
//! }
//! ```

use super::options::TlsVersion;
use super::{ip_literal, TlsContext, TlsRole};
use crate::base::blocking::BlockingResult;
use crate::base::neterror::NetError;
use boring::nid::Nid;
use boring::ssl::{
    ErrorCode, HandshakeError, MidHandshakeSslStream, Ssl, SslStream,
};
use boring::x509::X509;
use bytes::{Buf, BytesMut};
use std::fmt;
use std::io::{self, Read, Write};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// The two ciphertext queues BoringSSL reads from and writes to.
#[derive(Debug, Default)]
struct MemoryBio {
    incoming: BytesMut,
    outgoing: BytesMut,
}

impl Read for MemoryBio {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.incoming.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(self.incoming.len());
        buf[..n].copy_from_slice(&self.incoming[..n]);
        self.incoming.advance(n);
        Ok(n)
    }
}

impl Write for MemoryBio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum State {
    Created(Ssl, MemoryBio),
    Handshaking(MidHandshakeSslStream<MemoryBio>),
    Established(SslStream<MemoryBio>),
    /// A fatal error occurred. `pending` still holds any alert BoringSSL
    /// queued for the peer.
    Failed { reason: String, pending: BytesMut },
    Closed,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Created(..) => "created",
            State::Handshaking(_) => "handshaking",
            State::Established(_) => "established",
            State::Failed { .. } => "failed",
            State::Closed => "closed",
        }
    }
}

/// A TLS client or server over in-memory ciphertext queues.
///
/// States run `created -> handshaking -> established`, and
/// [`close`](Self::close) is legal from any of them. Any fatal engine error
/// moves the engine to a failed state in which every operation except
/// draining [`outgoing`](Self::outgoing) and closing reports the original
/// error again. A failed engine is never retried.
pub struct TlsEngine {
    id: u64,
    role: TlsRole,
    state: State,
    peer_certificate: Option<Arc<X509>>,
}

impl TlsEngine {
    /// Creates an engine for one connection.
    ///
    /// On clients `hostname` is sent as SNI when it is a DNS name and, if the
    /// context verifies peers, checked against the server certificate (as a
    /// DNS name or an IP address). Servers ignore it.
    pub fn new(context: &TlsContext, hostname: Option<&str>) -> Result<Self, NetError> {
        let mut ssl = Ssl::new(context.ssl_context())?;

        if context.role() == TlsRole::Client {
            if let Some(host) = hostname.filter(|h| !h.is_empty()) {
                match ip_literal(host) {
                    Some(ip) => {
                        if context.verify_peer() {
                            ssl.param_mut().set_ip(ip)?;
                        }
                    }
                    None => {
                        ssl.set_hostname(host)?;
                        if context.verify_peer() {
                            ssl.param_mut().set_host(host)?;
                        }
                    }
                }
            }
        }

        let id = NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(engine = id, role = ?context.role(), ?hostname, "TLS engine created");

        Ok(Self {
            id,
            role: context.role(),
            state: State::Created(ssl, MemoryBio::default()),
            peer_certificate: None,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> TlsRole {
        self.role
    }

    pub fn is_handshake_complete(&self) -> bool {
        matches!(self.state, State::Established(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    fn bio(&self) -> Option<&MemoryBio> {
        match &self.state {
            State::Created(_, bio) => Some(bio),
            State::Handshaking(mid) => Some(mid.get_ref()),
            State::Established(stream) => Some(stream.get_ref()),
            State::Failed { .. } | State::Closed => None,
        }
    }

    fn bio_mut(&mut self) -> Option<&mut MemoryBio> {
        match &mut self.state {
            State::Created(_, bio) => Some(bio),
            State::Handshaking(mid) => Some(mid.get_mut()),
            State::Established(stream) => Some(stream.get_mut()),
            State::Failed { .. } | State::Closed => None,
        }
    }

    /// The error to report for an engine that has no queues.
    fn unusable(&self) -> NetError {
        match &self.state {
            State::Failed { reason, .. } => NetError::tls(reason.clone()),
            _ => NetError::EngineClosed,
        }
    }

    /// Queues ciphertext received from the peer. Nothing is parsed until the
    /// next [`handshake`](Self::handshake) or [`read`](Self::read).
    pub fn incoming(&mut self, data: &[u8]) -> Result<(), NetError> {
        match self.bio_mut() {
            Some(bio) => {
                bio.incoming.extend_from_slice(data);
                Ok(())
            }
            None => Err(self.unusable()),
        }
    }

    /// Moves queued outgoing ciphertext into `buf`, returning how many bytes
    /// were copied. Call until it returns 0 to drain the queue.
    ///
    /// A failed engine still drains the alert it produced.
    pub fn outgoing(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        let queue = match &mut self.state {
            State::Created(_, bio) => &mut bio.outgoing,
            State::Handshaking(mid) => &mut mid.get_mut().outgoing,
            State::Established(stream) => &mut stream.get_mut().outgoing,
            State::Failed { pending, .. } => pending,
            State::Closed => return Err(NetError::EngineClosed),
        };
        let n = buf.len().min(queue.len());
        buf[..n].copy_from_slice(&queue[..n]);
        queue.advance(n);
        Ok(n)
    }

    /// Ciphertext bytes queued but not yet consumed by BoringSSL.
    pub fn incoming_pending(&self) -> usize {
        self.bio().map_or(0, |bio| bio.incoming.len())
    }

    /// Ciphertext bytes waiting to be drained with [`outgoing`](Self::outgoing).
    pub fn outgoing_pending(&self) -> usize {
        match &self.state {
            State::Failed { pending, .. } => pending.len(),
            _ => self.bio().map_or(0, |bio| bio.outgoing.len()),
        }
    }

    /// Advances the handshake as far as the queued input allows.
    ///
    /// Returns `true` once the handshake has completed. Outgoing ciphertext
    /// may still be queued at that point (the client's `Finished`, for one)
    /// and must be drained.
    pub fn handshake(&mut self) -> Result<bool, NetError> {
        let step = match mem::replace(&mut self.state, State::Closed) {
            State::Created(ssl, bio) => match self.role {
                TlsRole::Client => ssl.connect(bio),
                TlsRole::Server => ssl.accept(bio),
            },
            State::Handshaking(mid) => mid.handshake(),
            established @ State::Established(_) => {
                self.state = established;
                return Ok(true);
            }
            failed @ State::Failed { .. } => {
                self.state = failed;
                return Err(self.unusable());
            }
            State::Closed => return Err(NetError::EngineClosed),
        };

        match step {
            Ok(stream) => {
                self.peer_certificate = stream.ssl().peer_certificate().map(Arc::new);
                tracing::debug!(
                    engine = self.id,
                    role = ?self.role,
                    version = stream.ssl().version_str(),
                    "TLS handshake complete"
                );
                self.state = State::Established(stream);
                Ok(true)
            }
            Err(HandshakeError::WouldBlock(mid)) => {
                self.state = State::Handshaking(mid);
                Ok(false)
            }
            Err(HandshakeError::Failure(mut mid)) => {
                let reason = mid.error().to_string();
                let pending = mem::take(&mut mid.get_mut().outgoing);
                Err(self.fail(reason, pending))
            }
            Err(HandshakeError::SetupFailure(stack)) => {
                Err(self.fail(stack.to_string(), BytesMut::new()))
            }
        }
    }

    fn fail(&mut self, reason: String, pending: BytesMut) -> NetError {
        tracing::debug!(engine = self.id, role = ?self.role, %reason, "TLS engine failed");
        self.state = State::Failed {
            reason: reason.clone(),
            pending,
        };
        NetError::tls(reason)
    }

    /// Decrypts available application data into `buf`.
    ///
    /// Returns [`BlockingResult::WouldBlock`] when more ciphertext is needed
    /// (including before the handshake completes) and `Count(0)` once the
    /// peer has sent `close_notify`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<BlockingResult, NetError> {
        let result = match &mut self.state {
            State::Established(stream) => {
                if buf.is_empty() {
                    return Ok(BlockingResult::Count(0));
                }
                stream.ssl_read(buf)
            }
            State::Created(..) | State::Handshaking(_) => return Ok(BlockingResult::WouldBlock),
            State::Failed { .. } | State::Closed => return Err(self.unusable()),
        };
        self.record_result(result, "read")
    }

    /// Encrypts `buf` into the outgoing queue.
    ///
    /// Returns [`BlockingResult::WouldBlock`] when the engine cannot accept
    /// plaintext yet, which includes every call before the handshake
    /// completes.
    pub fn write(&mut self, buf: &[u8]) -> Result<BlockingResult, NetError> {
        let result = match &mut self.state {
            State::Established(stream) => {
                if buf.is_empty() {
                    return Ok(BlockingResult::Count(0));
                }
                stream.ssl_write(buf)
            }
            State::Created(..) | State::Handshaking(_) => return Ok(BlockingResult::WouldBlock),
            State::Failed { .. } | State::Closed => return Err(self.unusable()),
        };
        self.record_result(result, "write")
    }

    fn record_result(
        &mut self,
        result: Result<usize, boring::ssl::Error>,
        op: &'static str,
    ) -> Result<BlockingResult, NetError> {
        match result {
            Ok(n) => {
                tracing::trace!(engine = self.id, op, bytes = n, "TLS record");
                Ok(BlockingResult::Count(n))
            }
            Err(e) => match e.code() {
                ErrorCode::WANT_READ | ErrorCode::WANT_WRITE => Ok(BlockingResult::WouldBlock),
                ErrorCode::ZERO_RETURN => Ok(BlockingResult::Count(0)),
                _ => {
                    let pending = match &mut self.state {
                        State::Established(stream) => mem::take(&mut stream.get_mut().outgoing),
                        _ => BytesMut::new(),
                    };
                    Err(self.fail(e.to_string(), pending))
                }
            },
        }
    }

    /// Queues a `close_notify` alert. Drain it with
    /// [`outgoing`](Self::outgoing) before closing the transport.
    ///
    /// No-op before the handshake completes or after a failure.
    pub fn shutdown(&mut self) -> Result<(), NetError> {
        let result = match &mut self.state {
            State::Established(stream) => stream.shutdown(),
            State::Closed => return Err(NetError::EngineClosed),
            _ => return Ok(()),
        };
        match result {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.code(), ErrorCode::WANT_READ | ErrorCode::WANT_WRITE) => Ok(()),
            Err(e) => Err(NetError::tls(e.to_string())),
        }
    }

    /// Releases the BoringSSL state and both queues. Idempotent.
    ///
    /// Every [`PeerCertificate`] obtained from this engine becomes invalid.
    pub fn close(&mut self) {
        if !self.is_closed() {
            tracing::trace!(engine = self.id, state = self.state.name(), "TLS engine closed");
        }
        self.state = State::Closed;
        self.peer_certificate = None;
    }

    fn established(&self) -> Result<&SslStream<MemoryBio>, NetError> {
        match &self.state {
            State::Established(stream) => Ok(stream),
            State::Closed => Err(NetError::EngineClosed),
            _ => Err(NetError::ContractViolation(
                "TLS session property read before handshake completed",
            )),
        }
    }

    /// The negotiated ALPN protocol, if any.
    pub fn alpn_protocol(&self) -> Result<Option<&[u8]>, NetError> {
        Ok(self.established()?.ssl().selected_alpn_protocol())
    }

    /// The negotiated protocol version.
    pub fn version(&self) -> Result<TlsVersion, NetError> {
        let name = self.established()?.ssl().version_str();
        TlsVersion::from_version_str(name)
            .ok_or_else(|| NetError::tls(format!("unknown negotiated version {}", name)))
    }

    /// The peer's leaf certificate. `None` on a server whose client sent
    /// none.
    pub fn peer_certificate(&self) -> Result<Option<PeerCertificate>, NetError> {
        self.established()?;
        Ok(self.peer_certificate.as_ref().map(|cert| PeerCertificate {
            engine_id: self.id,
            cert: Arc::downgrade(cert),
        }))
    }
}

impl fmt::Debug for TlsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsEngine")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("state", &self.state.name())
            .field("incoming_pending", &self.incoming_pending())
            .field("outgoing_pending", &self.outgoing_pending())
            .finish()
    }
}

/// A borrowed view of a peer certificate.
///
/// The certificate belongs to the engine it came from. Once that engine is
/// closed or dropped, every accessor returns [`NetError::EngineClosed`].
#[derive(Clone)]
pub struct PeerCertificate {
    engine_id: u64,
    cert: Weak<X509>,
}

impl PeerCertificate {
    /// Id of the engine that owns the certificate.
    pub fn engine_id(&self) -> u64 {
        self.engine_id
    }

    pub fn is_valid(&self) -> bool {
        self.cert.strong_count() > 0
    }

    fn with<T>(&self, f: impl FnOnce(&X509) -> Result<T, NetError>) -> Result<T, NetError> {
        let cert = self.cert.upgrade().ok_or(NetError::EngineClosed)?;
        f(&cert)
    }

    /// DER encoding of the certificate.
    pub fn to_der(&self) -> Result<Vec<u8>, NetError> {
        self.with(|cert| Ok(cert.to_der()?))
    }

    /// The first subject common name.
    pub fn subject_common_name(&self) -> Result<Option<String>, NetError> {
        self.with(|cert| {
            let entry = match cert.subject_name().entries_by_nid(Nid::COMMONNAME).next() {
                Some(entry) => entry,
                None => return Ok(None),
            };
            Ok(Some(entry.data().as_utf8()?.to_string()))
        })
    }

    /// DNS names from the subject alternative name extension.
    pub fn dns_names(&self) -> Result<Vec<String>, NetError> {
        self.with(|cert| {
            Ok(cert
                .subject_alt_names()
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|name| name.dnsname().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default())
        })
    }
}

impl fmt::Debug for PeerCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerCertificate")
            .field("engine_id", &self.engine_id)
            .field("valid", &self.is_valid())
            .finish()
    }
}
