//! The procbridge client.

use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use procbridge_common::transport::FrameCodec;
use procbridge_common::{ProcBridgeError, Request, Response, Result, UNKNOWN_SERVER_ERROR};

use crate::guard::{self, Spawn};

/// A client for a procbridge server.
///
/// Each [`request`](Client::request) opens a fresh connection, writes one
/// request frame, reads one response frame and closes. When a timeout is
/// configured, the write/read exchange is wrapped by the deadline guard;
/// without one, the call blocks for as long as the transport allows.
///
/// # Example
///
/// ```no_run
/// use procbridge_client::Client;
/// use serde_json::json;
/// use std::time::Duration;
///
/// let client = Client::new("127.0.0.1", 8000).with_timeout(Duration::from_secs(5));
/// let reply = client.request(Some("sum"), Some(json!([1, 2, 3, 4]))).unwrap();
/// assert_eq!(reply, Some(json!(10)));
/// ```
pub struct Client {
    host: String,
    port: u16,
    timeout: Option<Duration>,
    pool: Option<Arc<dyn Spawn>>,
}

impl Client {
    /// Creates a client with no timeout: requests wait forever.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Client {
            host: host.into(),
            port,
            timeout: None,
            pool: None,
        }
    }

    /// Bounds every request to `timeout`. A zero duration means forever.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs guarded exchanges on `pool` instead of a fresh thread per call.
    /// Only relevant when a timeout is configured.
    pub fn with_pool(mut self, pool: Arc<dyn Spawn>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Invokes `method` on the server with an optional payload.
    ///
    /// Returns the result payload of a good response; `None` means the
    /// handler produced no value, which is not an error.
    ///
    /// # Errors
    ///
    /// - [`ProcBridgeError::Connection`] / [`ProcBridgeError::Io`] - the
    ///   transport broke (connect or read/write failure)
    /// - [`ProcBridgeError::Timeout`] - the configured deadline elapsed
    /// - [`ProcBridgeError::Server`] - the server answered with a bad
    ///   response; carries the remote message, or `"unknown server error"`
    ///   if the server sent none
    /// - [`ProcBridgeError::Internal`] - the guarded exchange died without
    ///   producing any of the above
    pub fn request(&self, method: Option<&str>, payload: Option<Value>) -> Result<Option<Value>> {
        tracing::debug!(?method, host = %self.host, port = self.port, "sending request");

        let stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(|e| {
            ProcBridgeError::Connection(format!(
                "failed to connect to {}:{}: {}",
                self.host, self.port, e
            ))
        })?;

        let request = Request {
            method: method.map(str::to_owned),
            payload,
        };
        let response = guard::run_with_deadline(self.timeout, self.pool.as_deref(), move || {
            exchange(stream, &request)
        })??;

        match response {
            Response::Good(payload) => Ok(payload),
            Response::Bad(message) => Err(ProcBridgeError::Server(
                message.unwrap_or_else(|| UNKNOWN_SERVER_ERROR.to_owned()),
            )),
        }
    }
}

/// The blocking write-request/read-response pair, strictly sequential on
/// one connection.
fn exchange(mut stream: TcpStream, request: &Request) -> Result<Response> {
    FrameCodec::write_request(&mut stream, request)?;
    let response = FrameCodec::read_response(&mut stream)?;
    let _ = stream.shutdown(Shutdown::Both);
    Ok(response)
}
