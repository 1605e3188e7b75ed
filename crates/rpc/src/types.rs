//! Untyped JSON-RPC message bodies.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Identifier of a request, echoed back by its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
	/// Numeric ID.
	Number(i64),
	/// String ID.
	String(String),
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::String(s) => write!(f, "{s:?}"),
		}
	}
}

/// Simple counter-based request ID generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterIdGen(pub i64);

impl CounterIdGen {
	/// Creates a new counter starting at 0.
	#[must_use]
	pub const fn new() -> Self {
		Self(0)
	}

	/// Generates the next unique ID and increments the counter.
	#[allow(clippy::should_implement_trait, reason = "convention")]
	pub fn next(&mut self) -> RequestId {
		let id = self.0;
		self.0 += 1;
		RequestId::Number(id)
	}
}

/// A request with untyped parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyRequest {
	/// The request ID.
	pub id: RequestId,
	/// The method to be invoked.
	pub method: String,
	/// The method's parameters.
	#[serde(default)]
	pub params: JsonValue,
}

/// A notification with untyped parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyNotification {
	/// The method to be invoked.
	pub method: String,
	/// The notification's parameters.
	#[serde(default)]
	pub params: JsonValue,
}

impl AnyNotification {
	/// Builds a notification from a method name and serializable parameters.
	pub fn new(method: impl Into<String>, params: impl Serialize) -> crate::Result<Self> {
		Ok(Self {
			method: method.into(),
			params: serde_json::to_value(params)?,
		})
	}
}

/// A response to a request, carrying either a result or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyResponse {
	/// The ID of the request being answered.
	pub id: RequestId,
	/// The result on success.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<JsonValue>,
	/// The error on failure.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ResponseError>,
}

impl AnyResponse {
	/// Creates a successful response.
	#[must_use]
	pub fn ok(id: RequestId, result: JsonValue) -> Self {
		Self {
			id,
			result: Some(result),
			error: None,
		}
	}

	/// Creates an error response.
	#[must_use]
	pub fn err(id: RequestId, error: ResponseError) -> Self {
		Self {
			id,
			result: None,
			error: Some(error),
		}
	}
}

/// JSON-RPC error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
	/// Invalid JSON was received.
	pub const PARSE_ERROR: Self = Self(-32700);
	/// The JSON sent is not a valid request object.
	pub const INVALID_REQUEST: Self = Self(-32600);
	/// The method does not exist or is not available.
	pub const METHOD_NOT_FOUND: Self = Self(-32601);
	/// Invalid method parameters.
	pub const INVALID_PARAMS: Self = Self(-32602);
	/// Internal JSON-RPC error.
	pub const INTERNAL_ERROR: Self = Self(-32603);
	/// The server received a request before `initialize`.
	pub const SERVER_NOT_INITIALIZED: Self = Self(-32002);
	/// The request was cancelled by the client.
	pub const REQUEST_CANCELLED: Self = Self(-32800);
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// The error object of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct ResponseError {
	/// The error code.
	pub code: ErrorCode,
	/// A short description of the error.
	pub message: String,
	/// Additional information about the error.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<JsonValue>,
}

impl ResponseError {
	/// Creates a new error with code and message.
	pub fn new(code: ErrorCode, message: impl fmt::Display) -> Self {
		Self {
			code,
			message: message.to_string(),
			data: None,
		}
	}
}
