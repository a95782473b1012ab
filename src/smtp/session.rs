use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use native_tls::{HandshakeError, TlsConnector, TlsStream};
use regex::Regex;

use crate::error::ProbeError;
use crate::smtp::options::SessionOptions;
use crate::smtp::types::{SmtpReply, TranscriptLine};

static ENHANCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d\.\d{1,3}\.\d{1,3}$").expect("static regex is valid"));

/// Ports that speak TLS before any SMTP command (spec §4.3 step 2, glossary).
pub const IMPLICIT_TLS_PORTS: &[u16] = &[465];

/// Socket read timeout used while polling for cancellation (spec §4.4:
/// cancellation must interrupt in-flight reads promptly). The overall
/// session deadline is tracked separately and enforced across polls.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    /// Transiently held during a STARTTLS upgrade while the plain socket has
    /// been moved out and the TLS socket isn't built yet.
    Upgrading,
}

impl Read for StreamState {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(s) => s.read(buf),
            Self::Tls(s) => s.read(buf),
            Self::Upgrading => Err(io::Error::other("stream mid-upgrade")),
        }
    }
}

impl StreamState {
    /// Shuts down the underlying socket so a blocked read on another handle
    /// to it unblocks immediately, regardless of which layer (plain or TLS)
    /// currently owns it.
    fn shutdown(&self) {
        match self {
            Self::Plain(s) => {
                let _ = s.shutdown(Shutdown::Both);
            }
            Self::Tls(s) => {
                let _ = s.get_ref().shutdown(Shutdown::Both);
            }
            Self::Upgrading => {}
        }
    }
}

impl Write for StreamState {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(s) => s.write(buf),
            Self::Tls(s) => s.write(buf),
            Self::Upgrading => Err(io::Error::other("stream mid-upgrade")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(s) => s.flush(),
            Self::Tls(s) => s.flush(),
            Self::Upgrading => Err(io::Error::other("stream mid-upgrade")),
        }
    }
}

/// A single SMTP session against one host:port (spec §4.3).
///
/// Owns its transcript: every command sent and every reply read is recorded
/// in wire order, regardless of how the session ultimately concludes.
pub struct SmtpSession<'a> {
    host: String,
    stream: StreamState,
    buffer: Vec<u8>,
    cancelled: &'a AtomicBool,
    deadline: Instant,
    pub tls: bool,
    pub transcript: Vec<TranscriptLine>,
}

impl<'a> SmtpSession<'a> {
    /// Opens a TCP connection to `host:port`, wrapping it in TLS immediately
    /// if `port` is an implicit-TLS port.
    pub fn connect(
        host: &str,
        port: u16,
        options: &SessionOptions,
        connector: &TlsConnector,
        cancelled: &'a AtomicBool,
    ) -> Result<Self, ProbeError> {
        let addr = resolve_one(host, port)?;
        if cancelled.load(Ordering::Relaxed) {
            return Err(ProbeError::Protocol("cancelled before connect".to_string()));
        }

        let tcp = TcpStream::connect_timeout(&addr, options.timeout)
            .map_err(|source| ProbeError::network(host, source))?;
        let poll_interval = options.timeout.min(CANCEL_POLL_INTERVAL);
        tcp.set_read_timeout(Some(poll_interval))
            .map_err(|source| ProbeError::network(host, source))?;
        tcp.set_write_timeout(Some(options.timeout))
            .map_err(|source| ProbeError::network(host, source))?;

        let mut transcript = Vec::new();
        let (stream, tls) = if IMPLICIT_TLS_PORTS.contains(&port) {
            transcript.push(TranscriptLine::out(format!(
                "-- implicit TLS handshake with {host} --"
            )));
            let tls_stream = complete_handshake(connector, host, tcp)
                .map_err(|source| ProbeError::Tls {
                    host: host.to_string(),
                    source,
                })?;
            (StreamState::Tls(Box::new(tls_stream)), true)
        } else {
            (StreamState::Plain(tcp), false)
        };

        Ok(Self {
            host: host.to_string(),
            stream,
            buffer: Vec::new(),
            cancelled,
            deadline: Instant::now() + options.timeout,
            tls,
            transcript,
        })
    }

    pub fn read_banner(&mut self) -> Result<SmtpReply, ProbeError> {
        let reply = self.read_reply()?;
        self.record_reply(&reply);
        Ok(reply)
    }

    pub fn send_command(&mut self, command: &str) -> Result<SmtpReply, ProbeError> {
        self.transcript.push(TranscriptLine::out(command));
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&data)
            .and_then(|_| self.stream.flush())
            .map_err(|source| ProbeError::network(&self.host, source))?;
        let reply = self.read_reply()?;
        self.record_reply(&reply);
        Ok(reply)
    }

    /// Sends `STARTTLS` and, if accepted, upgrades the socket in place.
    pub fn starttls(
        &mut self,
        connector: &TlsConnector,
        options: &SessionOptions,
    ) -> Result<SmtpReply, ProbeError> {
        let reply = self.send_command("STARTTLS")?;
        if !reply.is_positive_completion() {
            return Ok(reply);
        }

        let plain = match std::mem::replace(&mut self.stream, StreamState::Upgrading) {
            StreamState::Plain(tcp) => tcp,
            other => {
                self.stream = other;
                return Ok(reply);
            }
        };
        plain
            .set_read_timeout(Some(options.timeout.min(CANCEL_POLL_INTERVAL)))
            .map_err(|source| ProbeError::network(&self.host, source))?;

        let host = self.host.clone();
        let tls_stream =
            complete_handshake(connector, &host, plain).map_err(|source| ProbeError::Tls {
                host: host.clone(),
                source,
            })?;
        self.stream = StreamState::Tls(Box::new(tls_stream));
        self.tls = true;
        self.transcript
            .push(TranscriptLine::inbound("-- STARTTLS handshake complete --"));
        Ok(reply)
    }

    /// Best-effort `QUIT`: sent on every clean exit path, result ignored.
    pub fn quit(&mut self) {
        if self.send_command("QUIT").is_ok() {}
    }

    fn read_reply(&mut self) -> Result<SmtpReply, ProbeError> {
        let mut lines: Vec<String> = Vec::new();
        let mut code: i32 = -1;
        loop {
            let line = self.read_line()?;
            if line.len() < 4 {
                lines.push(line);
                break;
            }
            let parsed_code: i32 = line[..3]
                .parse()
                .map_err(|_| ProbeError::Protocol(format!("invalid reply code in: {line}")))?;
            // The last line's code is authoritative (spec §3); earlier
            // continuation lines may carry a different code entirely.
            code = parsed_code;
            let is_last = line.as_bytes()[3] != b'-';
            lines.push(line[4..].to_string());
            if is_last {
                break;
            }
        }

        let enhanced = lines
            .last()
            .and_then(|last| last.split_whitespace().next())
            .filter(|token| ENHANCED_RE.is_match(token))
            .map(|token| token.to_string());

        Ok(SmtpReply {
            code,
            enhanced,
            text: lines.join("\n"),
        })
    }

    fn read_line(&mut self) -> Result<String, ProbeError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                if line.ends_with(b"\r\n") {
                    line.truncate(line.len() - 2);
                } else if line.ends_with(b"\n") {
                    line.truncate(line.len() - 1);
                }
                return String::from_utf8(line)
                    .map_err(|err| ProbeError::Protocol(format!("non-utf8 reply: {err}")));
            }

            if self.cancelled.load(Ordering::Relaxed) {
                self.stream.shutdown();
                return Err(ProbeError::Protocol("cancelled".to_string()));
            }

            let mut buf = [0u8; 512];
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    return Err(ProbeError::network(
                        &self.host,
                        io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"),
                    ));
                }
                Ok(read) => self.buffer.extend_from_slice(&buf[..read]),
                Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    if Instant::now() >= self.deadline {
                        return Err(ProbeError::network(
                            &self.host,
                            io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
                        ));
                    }
                }
                Err(source) => return Err(ProbeError::network(&self.host, source)),
            }
        }
    }

    fn record_reply(&mut self, reply: &SmtpReply) {
        if reply.text.is_empty() {
            self.transcript
                .push(TranscriptLine::inbound(reply.code.to_string()));
        } else {
            for line in reply.text.lines() {
                self.transcript
                    .push(TranscriptLine::inbound(format!("{} {line}", reply.code)));
            }
        }
    }
}

/// Resolves `host:port` to one socket address. Any failure here is a DNS
/// resolution failure (spec §4.3 step 1) — both branches are normalized to
/// `io::ErrorKind::NotFound` so callers can classify it as such regardless
/// of the originating platform resolver's own error kind.
fn resolve_one(host: &str, port: u16) -> Result<SocketAddr, ProbeError> {
    format!("{host}:{port}")
        .to_socket_addrs()
        .map_err(|source| {
            ProbeError::network(host, io::Error::new(io::ErrorKind::NotFound, source.to_string()))
        })?
        .next()
        .ok_or_else(|| {
            ProbeError::network(
                host,
                io::Error::new(io::ErrorKind::NotFound, "no address resolved"),
            )
        })
}

fn complete_handshake(
    connector: &TlsConnector,
    host: &str,
    tcp: TcpStream,
) -> Result<TlsStream<TcpStream>, native_tls::Error> {
    match connector.connect(host, tcp) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(err)) => Err(err),
        Err(HandshakeError::WouldBlock(mut mid)) => loop {
            match mid.handshake() {
                Ok(tls) => break Ok(tls),
                Err(HandshakeError::Failure(err)) => break Err(err),
                Err(HandshakeError::WouldBlock(next)) => mid = next,
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhanced_code_regex_matches() {
        assert!(ENHANCED_RE.is_match("5.1.1"));
        assert!(ENHANCED_RE.is_match("2.1.5"));
        assert!(!ENHANCED_RE.is_match("User"));
    }
}
