//! Frame-level protocol types.
//!
//! A frame carries a status code and a JSON object body. The body holds at
//! most the keys `method`, `payload` and `message`; an absent key means "no
//! value", which is distinct from an explicit JSON null.

use serde_json::{Map, Value};

/// Magic bytes identifying a procbridge frame.
pub const PROTOCOL_FLAG: [u8; 2] = *b"pb";

/// Protocol version 1.0 (historical, no longer accepted).
pub const VERSION_1_0: [u8; 2] = [1, 0];

/// Protocol version 1.1.
pub const VERSION_1_1: [u8; 2] = [1, 1];

/// The version written to every outgoing frame. Incoming frames must match
/// it exactly; there is no version negotiation.
pub const CURRENT_VERSION: [u8; 2] = VERSION_1_1;

/// Keys recognized in a frame body.
pub mod keys {
    pub const METHOD: &str = "method";
    pub const PAYLOAD: &str = "payload";
    pub const MESSAGE: &str = "message";
}

/// A frame body: a JSON object.
pub type Body = Map<String, Value>;

/// Wire-level tag distinguishing a request from the two response kinds.
///
/// The raw wire value is a single byte; any other byte is a protocol error,
/// never a silently-ignored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    Request = 0,
    GoodResponse = 1,
    BadResponse = 2,
}

impl StatusCode {
    pub fn raw_value(self) -> u8 {
        self as u8
    }

    pub fn from_raw_value(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(StatusCode::Request),
            1 => Some(StatusCode::GoodResponse),
            2 => Some(StatusCode::BadResponse),
            _ => None,
        }
    }
}

/// Logical view of a request frame.
///
/// Both fields are optional: a request may name no method (handled by the
/// server's unknown-method fallback) and may carry no payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Option<String>,
    pub payload: Option<Value>,
}

impl Request {
    /// Creates a request with a method and a payload.
    pub fn new(method: impl Into<String>, payload: Value) -> Self {
        Request {
            method: Some(method.into()),
            payload: Some(payload),
        }
    }

    /// Creates a request with neither method nor payload.
    pub fn empty() -> Self {
        Request {
            method: None,
            payload: None,
        }
    }

    /// Assembles the frame body. Absent fields produce absent keys.
    pub fn to_body(&self) -> Body {
        let mut body = Body::new();
        if let Some(method) = &self.method {
            body.insert(keys::METHOD.to_owned(), Value::String(method.clone()));
        }
        if let Some(payload) = &self.payload {
            body.insert(keys::PAYLOAD.to_owned(), payload.clone());
        }
        body
    }

    /// Extracts the logical view from a decoded frame body.
    ///
    /// A non-string `method` value is treated as if the key were absent.
    pub fn from_body(mut body: Body) -> Self {
        let method = match body.remove(keys::METHOD) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        let payload = body.remove(keys::PAYLOAD);
        Request { method, payload }
    }
}

/// Logical view of a response frame: either a result payload or an error
/// message from the remote handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Good(Option<Value>),
    Bad(Option<String>),
}

impl Response {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Response::Good(_) => StatusCode::GoodResponse,
            Response::Bad(_) => StatusCode::BadResponse,
        }
    }

    /// Assembles the frame body for this response.
    pub fn to_body(&self) -> Body {
        let mut body = Body::new();
        match self {
            Response::Good(Some(payload)) => {
                body.insert(keys::PAYLOAD.to_owned(), payload.clone());
            }
            Response::Bad(Some(message)) => {
                body.insert(keys::MESSAGE.to_owned(), Value::String(message.clone()));
            }
            Response::Good(None) | Response::Bad(None) => {}
        }
        body
    }
}
