//! procbridge Common Types and Wire Codec
//!
//! This crate provides the core protocol definitions and frame codec for the
//! procbridge RPC protocol: a one-shot request/response exchange over TCP.
//!
//! # Overview
//!
//! procbridge lets two processes invoke named operations with structured
//! (JSON) arguments. Each call opens a fresh connection, sends exactly one
//! request frame and reads exactly one response frame. This crate contains
//! the pieces shared by the client and server crates:
//!
//! - **Protocol Layer**: status codes, version constants, request/response
//!   views, and error handling
//! - **Transport Layer**: byte-level frame encoding/decoding over any
//!   `Read`/`Write` stream
//!
//! # Wire Format
//!
//! Each frame is laid out as follows (multi-byte integers little-endian):
//!
//! ```text
//! [2-byte flag "pb"] [2-byte version] [1-byte status code]
//! [2 reserved bytes] [4-byte body length] [UTF-8 JSON object body]
//! ```
//!
//! # Components
//!
//! - [`protocol`] - Core protocol types (StatusCode, Request, Response, Error)
//! - [`transport`] - Frame codec implementation
//!
//! # Example
//!
//! ```
//! use procbridge_common::Request;
//! use procbridge_common::transport::FrameCodec;
//! use serde_json::json;
//! use std::io::Cursor;
//!
//! let request = Request::new("compute", json!({"n": 1000}));
//!
//! let mut buf = Vec::new();
//! FrameCodec::write_request(&mut buf, &request).unwrap();
//!
//! let decoded = FrameCodec::read_request(&mut Cursor::new(buf)).unwrap();
//! assert_eq!(decoded, request);
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
