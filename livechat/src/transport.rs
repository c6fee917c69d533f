//! One-request-per-connection HTTP/1.0 over any byte stream.
//!
//! The session never keeps a connection open between calls: every request connects, writes a
//! minimal `GET`, reads the status line and then hands back a [`Response`] that owns the
//! connection. Dropping the response (on any path, including `?`) closes the connection.

use crate::error::{Error, Result};
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;

/// Opens the bidirectional byte stream a request is sent over.
pub trait Connect {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plaintext TCP. Useful against local mocks and TLS-terminating proxies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        TcpStream::connect((host, port)).await
    }
}

/// TCP wrapped in TLS using the platform's TLS implementation and trust store.
#[derive(Clone)]
pub struct TlsConnector {
    inner: tokio_native_tls::TlsConnector,
}

impl TlsConnector {
    pub fn new() -> io::Result<Self> {
        let connector = tokio_native_tls::native_tls::TlsConnector::new().map_err(io::Error::other)?;
        Ok(Self {
            inner: connector.into(),
        })
    }
}

impl fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnector").finish_non_exhaustive()
    }
}

impl Connect for TlsConnector {
    type Stream = tokio_native_tls::TlsStream<TcpStream>;

    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream> {
        let tcp = TcpStream::connect((host, port)).await?;
        self.inner
            .connect(host, tcp)
            .await
            .map_err(io::Error::other)
    }
}

/// A `GET` to send.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub accept: Option<&'a str>,
    pub cookie: Option<&'a str>,
}

impl HttpRequest<'_> {
    fn head(&self) -> String {
        let mut head = format!("GET {} HTTP/1.0\r\nHost: {}\r\n", self.path, self.host);
        if let Some(accept) = self.accept {
            head.push_str(&format!("Accept: {accept}\r\n"));
        }
        if let Some(cookie) = self.cookie {
            head.push_str(&format!("Cookie: {cookie}\r\n"));
        }
        head.push_str("Cache-Control: no-cache\r\n\r\n");
        head
    }
}

// long enough for any sane status line, short enough to bail on garbage
const MAX_STATUS_LINE: u64 = 64;
const MAX_HEADER_LINE: u64 = 8 * 1024;

/// Connects, writes `request`, and parses the status line.
///
/// Headers and body are left unread on the returned [`Response`].
pub async fn send<C: Connect>(
    connector: &C,
    port: u16,
    timeout: Duration,
    request: &HttpRequest<'_>,
) -> Result<Response<C::Stream>> {
    let stream = match tokio::time::timeout(timeout, connector.connect(request.host, port)).await
    {
        Err(_) => {
            tracing::warn!(host = request.host, "connection timed out");
            return Err(Error::Timeout);
        }
        Ok(Err(source)) => {
            tracing::warn!(host = request.host, %source, "connection failed");
            return Err(Error::Connect {
                host: request.host.to_string(),
                source,
            });
        }
        Ok(Ok(stream)) => stream,
    };

    let mut reader = BufReader::new(stream);
    let head = request.head();
    with_timeout(timeout, async {
        reader.get_mut().write_all(head.as_bytes()).await?;
        reader.get_mut().flush().await
    })
    .await?;

    let mut line = Vec::new();
    with_timeout(
        timeout,
        (&mut reader).take(MAX_STATUS_LINE).read_until(b'\n', &mut line),
    )
    .await?;
    let status = parse_status_line(&line).ok_or_else(|| {
        Error::Protocol(format!(
            "bad status line: {:?}",
            String::from_utf8_lossy(&line).trim_end()
        ))
    })?;
    tracing::debug!(host = request.host, %status, "received status");

    Ok(Response {
        reader,
        status,
        timeout,
    })
}

/// Parses `HTTP/1.x <code> <reason>`. Only HTTP/1.0 and HTTP/1.1 are accepted.
pub(crate) fn parse_status_line(line: &[u8]) -> Option<StatusCode> {
    let line = std::str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "HTTP/1.0" | "HTTP/1.1" => {}
        _ => return None,
    }
    let code: u16 = parts.next()?.parse().ok()?;
    StatusCode::from_u16(code).ok()
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Protocol(format!(
            "no data from server within {}ms",
            timeout.as_millis()
        ))),
    }
}

/// An in-flight response. Owns (and on drop, closes) the connection.
pub struct Response<S> {
    reader: BufReader<S>,
    status: StatusCode,
    timeout: Duration,
}

impl<S> fmt::Debug for Response<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Response<S> {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Consumes header lines up to and including the blank line that ends them.
    ///
    /// The status line is already gone, so a response without headers is just the blank line.
    /// With `toss_stray_bytes`, also discards anything before the first `{` of the body.
    pub async fn skip_headers(&mut self, toss_stray_bytes: bool) -> Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            with_timeout(
                self.timeout,
                (&mut self.reader)
                    .take(MAX_HEADER_LINE)
                    .read_until(b'\n', &mut line),
            )
            .await?;
            if !line.ends_with(b"\n") {
                return Err(Error::Protocol(if line.len() as u64 == MAX_HEADER_LINE {
                    "header line too long".into()
                } else {
                    "missing end of headers".into()
                }));
            }
            if line == b"\r\n" || line == b"\n" {
                break;
            }
        }
        if !toss_stray_bytes {
            return Ok(());
        }

        loop {
            let buf = with_timeout(self.timeout, self.reader.fill_buf()).await?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|&b| b == b'{') {
                Some(0) => return Ok(()),
                Some(pos) => {
                    tracing::trace!(tossed = ?String::from_utf8_lossy(&buf[..pos]), "tossing unexpected bytes");
                    self.reader.consume(pos);
                    return Ok(());
                }
                None => {
                    let len = buf.len();
                    tracing::trace!(tossed = ?String::from_utf8_lossy(buf), "tossing unexpected bytes");
                    self.reader.consume(len);
                }
            }
        }
    }

    /// Reads the rest of the body, refusing bodies larger than `max_bytes`.
    pub async fn read_body(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
        with_timeout(
            self.timeout,
            (&mut self.reader).take(limit).read_to_end(&mut body),
        )
        .await?;
        if body.len() > max_bytes {
            return Err(Error::Protocol(format!(
                "body exceeds {max_bytes} bytes"
            )));
        }
        Ok(body)
    }

    /// Reads the rest of the body and deserializes it.
    ///
    /// Only the fields `T` declares are kept; everything else in the payload is skipped.
    pub async fn read_json<T: DeserializeOwned>(&mut self, max_bytes: usize) -> Result<T> {
        let body = self.read_body(max_bytes).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Consumes bytes until `marker` has been read. Returns `false` if the stream ended first.
    pub async fn find(&mut self, marker: &[u8]) -> Result<bool> {
        if marker.is_empty() {
            return Ok(true);
        }
        let failure = failure_table(marker);
        let mut matched = 0;
        loop {
            let buf = with_timeout(self.timeout, self.reader.fill_buf()).await?;
            if buf.is_empty() {
                return Ok(false);
            }
            let mut used = 0;
            let mut found = false;
            for &b in buf {
                used += 1;
                while matched > 0 && b != marker[matched] {
                    matched = failure[matched - 1];
                }
                if b == marker[matched] {
                    matched += 1;
                }
                if matched == marker.len() {
                    found = true;
                    break;
                }
            }
            self.reader.consume(used);
            if found {
                return Ok(true);
            }
        }
    }

    /// Reads up to (and consumes) `delim`, keeping at most `max_len` bytes.
    ///
    /// Reading stops once `max_len` bytes are kept even if `delim` has not been seen.
    pub async fn read_until(&mut self, delim: u8, max_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let buf = with_timeout(self.timeout, self.reader.fill_buf()).await?;
            if buf.is_empty() {
                return Ok(out);
            }
            let mut used = 0;
            let mut done = false;
            for &b in buf {
                if b == delim {
                    used += 1;
                    done = true;
                    break;
                }
                if out.len() == max_len {
                    done = true;
                    break;
                }
                out.push(b);
                used += 1;
            }
            self.reader.consume(used);
            if done || out.len() == max_len {
                return Ok(out);
            }
        }
    }

    /// Drains what is left of the body for diagnostics. Never fails.
    pub async fn drain_lossy(&mut self, max_bytes: usize) -> String {
        match self.read_body(max_bytes).await {
            Ok(body) => String::from_utf8_lossy(&body).into_owned(),
            Err(e) => format!("<unreadable body: {e}>"),
        }
    }

    /// Shuts the connection down. Dropping the response also closes it, just less politely.
    pub async fn close(mut self) {
        let _ = tokio::time::timeout(self.timeout, self.reader.get_mut().shutdown()).await;
        tracing::trace!("closed connection");
    }
}

/// KMP failure table, so `find` never needs to look back at bytes it already consumed.
fn failure_table(pattern: &[u8]) -> Vec<usize> {
    let mut table = vec![0; pattern.len()];
    let mut k = 0;
    for i in 1..pattern.len() {
        while k > 0 && pattern[i] != pattern[k] {
            k = table[k - 1];
        }
        if pattern[i] == pattern[k] {
            k += 1;
        }
        table[i] = k;
    }
    table
}
