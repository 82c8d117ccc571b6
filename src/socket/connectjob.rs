use crate::base::neterror::NetError;
use crate::dns::{Hints, Name, Resolve};
use crate::socket::addr::{AddressFamily, ConnectionInfo};
use crate::socket::handle::Socket;
use std::time::Duration;

/// Dials a list of resolved candidates into one connected [`Socket`].
/// Roughly equivalent to net::ConnectJob's transport stage.
///
/// Candidates are tried one at a time in resolver order. This is a
/// sequential fallback, not an RFC 8305 race: the only failure it skips is
/// an IPv6 candidate on a network without IPv6 connectivity. Any other
/// failure ends the job immediately.
#[derive(Debug, Clone, Default)]
pub struct ConnectJob {
    attempt_timeout: Option<Duration>,
}

impl ConnectJob {
    /// `attempt_timeout` bounds each candidate's connect; `None` blocks.
    pub fn new(attempt_timeout: Option<Duration>) -> Self {
        Self { attempt_timeout }
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Connects to the first reachable candidate.
    ///
    /// Every socket opened for a failed attempt is closed before the next
    /// attempt or before the error is returned.
    pub fn connect(&self, candidates: &[ConnectionInfo]) -> Result<Socket, NetError> {
        for candidate in candidates {
            tracing::debug!(addr = %candidate, "connect attempt");
            match self.attempt(candidate) {
                Ok(socket) => {
                    tracing::debug!(addr = %candidate, "connected");
                    return Ok(socket);
                }
                Err(e) if Self::is_ipv6_unavailable(candidate, &e) => {
                    tracing::warn!(addr = %candidate, error = %e, "IPv6 unavailable, trying next candidate");
                }
                Err(e) => {
                    tracing::debug!(addr = %candidate, error = %e, "connect failed");
                    return Err(e);
                }
            }
        }

        Err(NetError::AllConnectionsFailed {
            candidates: candidates.to_vec(),
        })
    }

    /// Resolves `host` and dials the result.
    pub fn connect_host<R: Resolve + ?Sized>(
        &self,
        resolver: &R,
        host: &str,
        port: u16,
    ) -> Result<Socket, NetError> {
        let candidates = resolver.resolve(&Name::new(host), port, &Hints::tcp())?;
        self.connect(&candidates)
    }

    fn attempt(&self, candidate: &ConnectionInfo) -> Result<Socket, NetError> {
        let socket = Socket::open_for(candidate)?;
        match socket.connect(candidate, self.attempt_timeout) {
            Ok(_) => Ok(socket),
            Err(e) => {
                if let Err(close_err) = socket.close() {
                    tracing::warn!(error = %close_err, "closing failed attempt");
                }
                Err(e)
            }
        }
    }

    /// IPv6 candidates on hosts without an IPv6 route (or without IPv6
    /// support at all) are skipped rather than reported.
    fn is_ipv6_unavailable(candidate: &ConnectionInfo, err: &NetError) -> bool {
        candidate.family() == AddressFamily::Ipv6
            && matches!(
                err,
                NetError::NetworkUnreachable { .. } | NetError::AddressFamilyNotSupported { .. }
            )
    }
}
