//! Per-connection request handling.
//!
//! One invocation per accepted connection, run to completion on its own
//! thread: decode one request frame, dispatch it, write one response frame,
//! close. Strictly one request and one response per connection.

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use procbridge_common::transport::FrameCodec;
use procbridge_common::{ProcBridgeError, Result};
use serde_json::Value;

use crate::dispatch::Dispatcher;

/// The message written into a bad response. A handler-reported error is
/// relayed verbatim; everything else keeps its error rendering.
fn bad_response_message(e: &ProcBridgeError) -> String {
    match e {
        ProcBridgeError::Server(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Serves one request/response pair and closes the connection.
///
/// A decode or dispatch failure gets a best-effort bad response; if the
/// response write itself fails, the connection is simply dropped. A failing
/// connection never affects any other connection.
pub(crate) fn handle_connection(mut stream: TcpStream, dispatcher: Arc<Dispatcher>) {
    let outcome = FrameCodec::read_request(&mut stream)
        .and_then(|request| dispatcher.invoke(request.method.as_deref(), request.payload));
    respond(&mut stream, outcome);

    let _ = stream.shutdown(Shutdown::Both);
}

/// Writes the single response frame for `outcome`.
///
/// Once any good-response bytes may be on the wire, a follow-up frame would
/// only corrupt the stream, so a failed write is logged and nothing more is
/// written.
fn respond(stream: &mut impl Write, outcome: Result<Option<Value>>) {
    match outcome {
        Ok(result) => {
            if let Err(e) = FrameCodec::write_good_response(stream, result.as_ref()) {
                tracing::debug!("failed to write response: {}", e);
            }
        }
        Err(e) => {
            tracing::debug!("request failed: {}", e);
            let _ = FrameCodec::write_bad_response(stream, Some(&bad_response_message(&e)));
        }
    }
}
