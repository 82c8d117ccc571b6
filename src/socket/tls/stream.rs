use super::engine::{PeerCertificate, TlsEngine};
use super::options::TlsVersion;
use super::{TlsContext, TlsRole};
use crate::base::blocking::BlockingResult;
use crate::base::neterror::NetError;
use crate::socket::addr::ConnectionInfo;
use crate::socket::connectjob::ConnectJob;
use crate::socket::handle::Socket;
use std::io;
use std::time::{Duration, Instant};

/// Room for one maximum-size TLS record plus header and overhead.
const SCRATCH_SIZE: usize = 17 * 1024;

/// A [`TlsEngine`] pumped over a blocking [`Socket`].
///
/// The stream owns both halves. Closing or dropping it closes the engine
/// first and the socket second, each best-effort.
pub struct TlsStream {
    socket: Socket,
    engine: TlsEngine,
    scratch: Box<[u8]>,
}

impl TlsStream {
    /// Dials `candidates` and runs the client handshake against `hostname`.
    ///
    /// `timeout` bounds each connect attempt and, separately, the whole
    /// handshake. `None` or zero blocks indefinitely.
    pub fn connect(
        candidates: &[ConnectionInfo],
        hostname: &str,
        context: &TlsContext,
        timeout: Option<Duration>,
    ) -> Result<Self, NetError> {
        if context.role() != TlsRole::Client {
            return Err(NetError::ContractViolation(
                "TlsStream::connect needs a client context",
            ));
        }
        let socket = ConnectJob::new(timeout).connect(candidates)?;
        let engine = match TlsEngine::new(context, Some(hostname)) {
            Ok(engine) => engine,
            Err(e) => {
                if let Err(close_err) = socket.close() {
                    tracing::warn!(error = %close_err, "closing socket after engine setup failure");
                }
                return Err(e);
            }
        };
        Self::establish(socket, engine, timeout)
    }

    /// Runs the server handshake on an accepted socket.
    pub fn accept(
        socket: Socket,
        context: &TlsContext,
        timeout: Option<Duration>,
    ) -> Result<Self, NetError> {
        if context.role() != TlsRole::Server {
            return Err(NetError::ContractViolation(
                "TlsStream::accept needs a server context",
            ));
        }
        let engine = match TlsEngine::new(context, None) {
            Ok(engine) => engine,
            Err(e) => {
                if let Err(close_err) = socket.close() {
                    tracing::warn!(error = %close_err, "closing socket after engine setup failure");
                }
                return Err(e);
            }
        };
        Self::establish(socket, engine, timeout)
    }

    fn establish(socket: Socket, engine: TlsEngine, timeout: Option<Duration>) -> Result<Self, NetError> {
        let mut stream = Self::from_parts(socket, engine);
        match stream.handshake(timeout) {
            Ok(()) => Ok(stream),
            Err(e) => {
                if let Err(close_err) = stream.close() {
                    tracing::debug!(error = %close_err, "closing stream after handshake failure");
                }
                Err(e)
            }
        }
    }

    /// Pairs an existing socket and engine without any I/O.
    pub fn from_parts(socket: Socket, engine: TlsEngine) -> Self {
        Self {
            socket,
            engine,
            scratch: vec![0u8; SCRATCH_SIZE].into_boxed_slice(),
        }
    }

    /// Drives the handshake to completion.
    ///
    /// The socket is switched to blocking mode. On failure any alert the
    /// engine produced is sent before the error is returned.
    pub fn handshake(&mut self, timeout: Option<Duration>) -> Result<(), NetError> {
        let deadline = timeout.filter(|t| !t.is_zero()).map(|t| Instant::now() + t);
        self.socket.set_nonblocking(false)?;

        loop {
            let done = match self.engine.handshake() {
                Ok(done) => done,
                Err(e) => {
                    if let Err(flush_err) = self.flush() {
                        tracing::debug!(error = %flush_err, "sending TLS alert");
                    }
                    return Err(e);
                }
            };
            self.flush()?;
            if done {
                return Ok(());
            }

            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() || !self.socket.wait_readable(Some(remaining))? {
                    return Err(NetError::ConnectionTimedOut {
                        code: libc::ETIMEDOUT,
                    });
                }
            }
            if self.fill()? == 0 {
                return Err(NetError::ConnectionClosed);
            }
        }
    }

    /// Receives once from the socket into the engine. Returns the byte
    /// count, 0 on EOF.
    fn fill(&mut self) -> Result<usize, NetError> {
        let n = self.socket.recv(&mut self.scratch, 0)?.ensure_non_block()?;
        if n > 0 {
            self.engine.incoming(&self.scratch[..n])?;
        }
        tracing::trace!(bytes = n, "ciphertext in");
        Ok(n)
    }

    /// Sends everything the engine has queued.
    fn flush(&mut self) -> Result<(), NetError> {
        loop {
            let n = self.engine.outgoing(&mut self.scratch)?;
            if n == 0 {
                return Ok(());
            }
            self.socket.sendall(&self.scratch[..n], 0)?.ensure_non_block()?;
            tracing::trace!(bytes = n, "ciphertext out");
        }
    }

    /// Reads decrypted application data into `buf`.
    ///
    /// Blocks until at least one plaintext byte is available. `Count(0)`
    /// means the peer closed the connection, with or without
    /// `close_notify`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<BlockingResult, NetError> {
        if buf.is_empty() {
            return Ok(BlockingResult::Count(0));
        }
        loop {
            if let BlockingResult::Count(n) = self.engine.read(buf)? {
                return Ok(BlockingResult::Count(n));
            }
            // Post-handshake messages can queue output of their own.
            self.flush()?;
            if self.fill()? == 0 {
                return Ok(BlockingResult::Count(0));
            }
        }
    }

    /// Encrypts and sends all of `buf`.
    pub fn write(&mut self, buf: &[u8]) -> Result<BlockingResult, NetError> {
        let mut written = 0;
        while written < buf.len() {
            match self.engine.write(&buf[written..])? {
                BlockingResult::Count(n) => {
                    written += n;
                    self.flush()?;
                }
                BlockingResult::WouldBlock => {
                    self.flush()?;
                    if self.fill()? == 0 {
                        return Err(NetError::ConnectionClosed);
                    }
                }
            }
        }
        Ok(BlockingResult::Count(written))
    }

    /// Sends `close_notify`, then closes the engine and the socket.
    ///
    /// Every step runs even if an earlier one failed. The socket close
    /// result is returned.
    pub fn close(&mut self) -> Result<(), NetError> {
        if self.socket.is_open() && self.engine.is_handshake_complete() {
            if let Err(e) = self.engine.shutdown() {
                tracing::debug!(error = %e, "queueing close_notify");
            } else if let Err(e) = self.flush() {
                tracing::debug!(error = %e, "sending close_notify");
            }
        }
        self.engine.close();
        self.socket.close()
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn engine(&self) -> &TlsEngine {
        &self.engine
    }

    pub fn alpn_protocol(&self) -> Result<Option<&[u8]>, NetError> {
        self.engine.alpn_protocol()
    }

    pub fn version(&self) -> Result<TlsVersion, NetError> {
        self.engine.version()
    }

    pub fn peer_certificate(&self) -> Result<Option<PeerCertificate>, NetError> {
        self.engine.peer_certificate()
    }
}

impl Drop for TlsStream {
    fn drop(&mut self) {
        if self.socket.is_open() || !self.engine.is_closed() {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "closing TLS stream on drop");
            }
        }
    }
}

impl io::Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match TlsStream::read(self, buf)? {
            BlockingResult::Count(n) => Ok(n),
            BlockingResult::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

impl io::Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match TlsStream::write(self, buf)? {
            BlockingResult::Count(n) => Ok(n),
            BlockingResult::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        TlsStream::flush(self).map_err(io::Error::from)
    }
}

impl std::fmt::Debug for TlsStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsStream")
            .field("socket", &self.socket)
            .field("engine", &self.engine)
            .finish()
    }
}
