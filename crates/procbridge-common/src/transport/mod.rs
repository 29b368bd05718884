//! procbridge Transport Layer
//!
//! This module provides the frame codec used on both ends of a connection.
//!
//! The codec is purely byte-level: it reads and writes frames over any
//! blocking `Read`/`Write` stream and applies no I/O policy of its own. The
//! guard against a stream that stalls forever lives in the client's deadline
//! guard, not here.
//!
//! # Components
//!
//! - **[`FrameCodec`]**: Encode/decode frames, with request- and
//!   response-specific entry points

pub mod codec;

pub use codec::FrameCodec;
