//! procbridge Client
//!
//! This crate provides the client side of the procbridge protocol: a
//! [`Client`] that opens one connection per call, and a deadline guard that
//! bounds how long the caller waits for the blocking write/read exchange.
//!
//! # Example
//!
//! ```no_run
//! use procbridge_client::Client;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let client = Client::new("127.0.0.1", 8000).with_timeout(Duration::from_secs(5));
//! let reply = client.request(Some("echo"), Some(json!(123))).unwrap();
//! assert_eq!(reply, Some(json!(123)));
//! ```

pub mod client;
pub mod guard;

pub use client::Client;
pub use guard::{run_with_deadline, Spawn};
pub use procbridge_common::{ProcBridgeError, Result};
