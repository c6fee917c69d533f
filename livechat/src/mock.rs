//! In-memory connector for testing sessions without a network.
//!
//! Each call to [`Connect::connect`] pops the next canned response. A background task plays the
//! server side of a [`tokio::io::duplex`] pipe: it reads the request head, records it, writes the
//! canned bytes and hangs up, just like an HTTP/1.0 server would.

use crate::transport::Connect;
use http::StatusCode;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum Canned {
    Respond(Vec<u8>),
    Refuse,
    /// Never finish connecting.
    Stall,
    /// Accept the request, then never answer or hang up.
    Silent,
}

#[derive(Debug, Default)]
struct MockState {
    canned: VecDeque<Canned>,
    requests: Vec<RecordedRequest>,
}

/// A request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub host: String,
    pub port: u16,
    /// Everything up to and including the blank line.
    pub head: String,
}

impl RecordedRequest {
    /// The request target from the request line.
    pub fn path(&self) -> Option<&str> {
        let line = self.head.lines().next()?;
        let mut parts = line.split(' ');
        match parts.next()? {
            "GET" => parts.next(),
            _ => None,
        }
    }

    /// The value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    /// The value of a query parameter in the request target.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let (_, query) = self.path()?.split_once('?')?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON response with the given status.
    pub fn push_json(&self, status: u16, body: &str) {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        self.push_raw(format!(
            "HTTP/1.0 {status} {reason}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{body}"
        ));
    }

    /// Queues a response exactly as given, status line and all.
    pub fn push_raw(&self, raw: impl Into<Vec<u8>>) {
        self.lock().canned.push_back(Canned::Respond(raw.into()));
    }

    /// Makes the next connection attempt fail.
    pub fn push_refused(&self) {
        self.lock().canned.push_back(Canned::Refuse);
    }

    /// Makes the next connection attempt hang forever.
    pub fn push_stalled(&self) {
        self.lock().canned.push_back(Canned::Stall);
    }

    /// Makes the next connection succeed and then go quiet: the request is recorded, but no
    /// response byte is ever sent.
    pub fn push_silent(&self) {
        self.lock().canned.push_back(Canned::Silent);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Canned responses not yet handed out.
    pub fn pending(&self) -> usize {
        self.lock().canned.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Connect for MockConnector {
    type Stream = DuplexStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<DuplexStream> {
        let canned = self.lock().canned.pop_front();
        let response = match canned {
            Some(Canned::Respond(bytes)) => Some(bytes),
            Some(Canned::Silent) => None,
            Some(Canned::Stall) => std::future::pending().await,
            Some(Canned::Refuse) => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "mock refused connection",
                ));
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "mock has no canned response left",
                ));
            }
        };

        let (client, mut server) = tokio::io::duplex(PIPE_CAPACITY);
        let state = Arc::clone(&self.state);
        let host = host.to_string();
        tokio::spawn(async move {
            let mut head = Vec::new();
            let mut chunk = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match server.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&chunk[..n]),
                }
            }
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .requests
                .push(RecordedRequest {
                    host,
                    port,
                    head: String::from_utf8_lossy(&head).into_owned(),
                });
            let Some(response) = response else {
                // hold the pipe open until the test's runtime goes away
                std::future::pending::<()>().await;
                return;
            };
            let _ = server.write_all(&response).await;
            let _ = server.shutdown().await;
        });

        Ok(client)
    }
}
