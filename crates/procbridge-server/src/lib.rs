//! procbridge Server
//!
//! This crate provides the server side of the procbridge protocol: a
//! dispatch registry mapping method names to handlers, a per-connection
//! handler processing exactly one request/response pair, and a `Server`
//! owning the listening socket and its start/stop lifecycle.
//!
//! # Example
//!
//! ```no_run
//! use procbridge_server::{Dispatcher, Server};
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::new()
//!     .handle1("echo", |payload| Ok(payload))
//!     .handle_n("add", 2, |args| {
//!         let sum = args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0);
//!         Ok(Some(json!(sum)))
//!     });
//!
//! let server = Server::new(8000, dispatcher);
//! server.start().unwrap();
//! // ... later:
//! server.stop().unwrap();
//! ```

pub mod dispatch;
pub mod server;

mod connection;

pub use dispatch::{Dispatcher, HandlerResult};
pub use procbridge_common::{ProcBridgeError, Result};
pub use server::Server;
