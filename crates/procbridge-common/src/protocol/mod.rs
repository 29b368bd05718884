pub mod error;
pub mod frame;


pub use error::{ProcBridgeError, Result, UNKNOWN_SERVER_ERROR};
pub use frame::{Body, Request, Response, StatusCode, CURRENT_VERSION, PROTOCOL_FLAG};
