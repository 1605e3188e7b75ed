//! Classified JSON-RPC messages.

use serde_json::Value as JsonValue;

use crate::types::{AnyNotification, AnyRequest, AnyResponse};
use crate::{Error, Result};

const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC message in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
	/// A request expecting a response.
	Request(AnyRequest),
	/// A response to an earlier request.
	Response(AnyResponse),
	/// A notification, which never gets a response.
	Notification(AnyNotification),
}

impl Message {
	/// Classifies a decoded JSON value.
	///
	/// Objects with both `id` and `method` are requests, objects with only
	/// `method` are notifications and objects with only `id` are responses.
	pub fn from_value(value: JsonValue) -> Result<Self> {
		let has_id = value.get("id").is_some_and(|id| !id.is_null());
		let has_method = value.get("method").is_some();
		match (has_id, has_method) {
			(true, true) => Ok(Self::Request(serde_json::from_value(value)?)),
			(false, true) => Ok(Self::Notification(serde_json::from_value(value)?)),
			(true, false) => Ok(Self::Response(serde_json::from_value(value)?)),
			(false, false) => Err(Error::Protocol("message has neither `id` nor `method`".into())),
		}
	}

	/// Serializes the message with the `jsonrpc` version tag.
	pub fn to_value(&self) -> Result<JsonValue> {
		let mut value = match self {
			Self::Request(req) => serde_json::to_value(req)?,
			Self::Response(resp) => serde_json::to_value(resp)?,
			Self::Notification(notif) => serde_json::to_value(notif)?,
		};
		if let Some(obj) = value.as_object_mut() {
			obj.insert("jsonrpc".into(), JsonValue::String(JSONRPC_VERSION.into()));
		}
		Ok(value)
	}

	/// Returns the method name for requests and notifications.
	pub fn method(&self) -> Option<&str> {
		match self {
			Self::Request(req) => Some(&req.method),
			Self::Notification(notif) => Some(&notif.method),
			Self::Response(_) => None,
		}
	}
}
