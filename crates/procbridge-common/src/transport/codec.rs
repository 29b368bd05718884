use std::io::{self, Read, Write};

use serde_json::Value;

use crate::protocol::error::{ProcBridgeError, Result};
use crate::protocol::frame::{
    keys, Body, Request, Response, StatusCode, CURRENT_VERSION, PROTOCOL_FLAG,
};

/// Codec for encoding/decoding procbridge frames.
///
/// # Wire Format
///
/// Frames are written in this exact order, with multi-byte integers
/// little-endian:
///
/// ```text
/// [2-byte flag "pb"] [2-byte version] [1-byte status code]
/// [2 reserved bytes, zero] [4-byte body length] [body]
/// ```
///
/// The body is the UTF-8 JSON encoding of an object. The length field is
/// always recomputed from the encoded body on write, never trusted from the
/// caller.
///
/// # Example
///
/// ```
/// use procbridge_common::transport::FrameCodec;
/// use procbridge_common::Request;
/// use serde_json::json;
/// use std::io::Cursor;
///
/// let request = Request::new("echo", json!(123));
///
/// let mut buf = Vec::new();
/// FrameCodec::write_request(&mut buf, &request).unwrap();
///
/// let decoded = FrameCodec::read_request(&mut Cursor::new(buf)).unwrap();
/// assert_eq!(decoded, request);
/// ```
pub struct FrameCodec;

/// Cap on the buffer capacity reserved from an announced body length.
const INITIAL_BODY_CAPACITY: usize = 1024 * 1024;

impl FrameCodec {
    /// Reads one frame from the stream.
    ///
    /// # Errors
    ///
    /// - `UnrecognizedProtocol` - the stream does not begin with `"pb"`
    /// - `IncompatibleVersion` - version bytes differ from [`CURRENT_VERSION`]
    /// - `InvalidStatusCode` - unknown status byte
    /// - `IncompleteData` - the stream ended before the header or the
    ///   announced body length was fully read
    /// - `InvalidBody` - the body is not a JSON object
    pub fn read_frame(stream: &mut impl Read) -> Result<(StatusCode, Body)> {
        // 1. FLAG
        let mut flag = [0u8; 2];
        read_exact_or(stream, &mut flag, ProcBridgeError::UnrecognizedProtocol)?;
        if flag != PROTOCOL_FLAG {
            return Err(ProcBridgeError::UnrecognizedProtocol);
        }

        // 2. VERSION (strict equality, no negotiation)
        let mut version = [0u8; 2];
        read_exact_or(stream, &mut version, ProcBridgeError::IncompleteData)?;
        if version != CURRENT_VERSION {
            return Err(ProcBridgeError::IncompatibleVersion);
        }

        // 3. STATUS CODE
        let mut status = [0u8; 1];
        read_exact_or(stream, &mut status, ProcBridgeError::IncompleteData)?;
        let status =
            StatusCode::from_raw_value(status[0]).ok_or(ProcBridgeError::InvalidStatusCode)?;

        // 4. RESERVED BYTES (ignored)
        let mut reserved = [0u8; 2];
        read_exact_or(stream, &mut reserved, ProcBridgeError::IncompleteData)?;

        // 5. BODY LENGTH
        let mut len_buf = [0u8; 4];
        read_exact_or(stream, &mut len_buf, ProcBridgeError::IncompleteData)?;
        let body_len = u32::from_le_bytes(len_buf) as usize;

        // 6. BODY
        // The announced length bounds the read but only seeds the initial
        // capacity (capped), so a hostile length field cannot force a huge
        // up-front allocation; bytes are accumulated as they arrive.
        let mut body_buf = Vec::with_capacity(body_len.min(INITIAL_BODY_CAPACITY));
        let read = stream
            .by_ref()
            .take(body_len as u64)
            .read_to_end(&mut body_buf)?;
        if read < body_len {
            return Err(ProcBridgeError::IncompleteData);
        }

        match serde_json::from_slice::<Value>(&body_buf) {
            Ok(Value::Object(body)) => Ok((status, body)),
            _ => Err(ProcBridgeError::InvalidBody),
        }
    }

    /// Writes one frame to the stream and flushes it.
    pub fn write_frame(stream: &mut impl Write, status: StatusCode, body: &Body) -> Result<()> {
        let encoded = serde_json::to_vec(body)?;
        let body_len = u32::try_from(encoded.len())
            .map_err(|_| ProcBridgeError::Internal("frame body exceeds u32 length".to_owned()))?;

        stream.write_all(&PROTOCOL_FLAG)?;
        stream.write_all(&CURRENT_VERSION)?;
        stream.write_all(&[status.raw_value()])?;
        stream.write_all(&[0, 0])?;
        stream.write_all(&body_len.to_le_bytes())?;
        stream.write_all(&encoded)?;
        stream.flush()?;

        Ok(())
    }

    /// Reads a frame and requires it to be a request.
    pub fn read_request(stream: &mut impl Read) -> Result<Request> {
        let (status, body) = Self::read_frame(stream)?;
        if status != StatusCode::Request {
            return Err(ProcBridgeError::InvalidStatusCode);
        }
        Ok(Request::from_body(body))
    }

    /// Reads a frame and requires it to be a good or bad response.
    ///
    /// A good response yields the `payload` key's value; a bad response
    /// yields the `message` key interpreted as a string. An absent key is
    /// `None`; substituting a fallback message is the consumer's job.
    pub fn read_response(stream: &mut impl Read) -> Result<Response> {
        let (status, mut body) = Self::read_frame(stream)?;
        match status {
            StatusCode::GoodResponse => Ok(Response::Good(body.remove(keys::PAYLOAD))),
            StatusCode::BadResponse => {
                let message = match body.remove(keys::MESSAGE) {
                    Some(Value::String(s)) => Some(s),
                    _ => None,
                };
                Ok(Response::Bad(message))
            }
            StatusCode::Request => Err(ProcBridgeError::InvalidStatusCode),
        }
    }

    /// Writes a request frame.
    pub fn write_request(stream: &mut impl Write, request: &Request) -> Result<()> {
        Self::write_frame(stream, StatusCode::Request, &request.to_body())
    }

    /// Writes a good-response frame carrying an optional result payload.
    pub fn write_good_response(stream: &mut impl Write, payload: Option<&Value>) -> Result<()> {
        let response = Response::Good(payload.cloned());
        Self::write_frame(stream, response.status_code(), &response.to_body())
    }

    /// Writes a bad-response frame carrying an optional error message.
    pub fn write_bad_response(stream: &mut impl Write, message: Option<&str>) -> Result<()> {
        let response = Response::Bad(message.map(str::to_owned));
        Self::write_frame(stream, response.status_code(), &response.to_body())
    }
}

/// Reads exactly `buf.len()` bytes, mapping a premature end-of-stream to the
/// given protocol error. Other IO errors propagate unchanged.
fn read_exact_or(stream: &mut impl Read, buf: &mut [u8], eof_err: ProcBridgeError) -> Result<()> {
    stream.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => eof_err,
        _ => ProcBridgeError::Io(e),
    })
}
