//! JSON-RPC 2.0 message model and framing.
//!
//! This crate provides the wire-level pieces shared by the language client and
//! by in-process fake servers:
//! * [`Message`]: A classified inbound or outbound JSON-RPC message
//! * [`AnyRequest`], [`AnyResponse`], [`AnyNotification`]: Untyped message bodies
//! * [`read_message`] / [`write_message`]: `Content-Length` framed stream I/O
//! * [`CounterIdGen`]: Sequential request ID generation

#![warn(missing_docs)]

mod framing;
mod message;
mod types;

pub use framing::{read_message, write_message};
pub use message::Message;
pub use serde_json::Value as JsonValue;
pub use types::{AnyNotification, AnyRequest, AnyResponse, CounterIdGen, ErrorCode, RequestId, ResponseError};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors while reading or writing framed messages.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The peer sent a body that is not valid JSON or not a JSON-RPC message.
	#[error("deserialization failed: {0}")]
	Deserialize(String),
	/// The peer violates the framing or message protocol.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// Input/output errors from the underlying stream.
	#[error("{0}")]
	Io(String),
	/// The stream reached EOF in the middle of a message.
	#[error("the underlying stream reached EOF")]
	Eof,
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Self {
		Self::Deserialize(e.to_string())
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Self {
		if e.kind() == std::io::ErrorKind::UnexpectedEof {
			return Self::Eof;
		}
		Self::Io(e.to_string())
	}
}
