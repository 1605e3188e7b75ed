//! Minimal editor host model for end-to-end runs of a grammar-checking extension.
//!
//! The host implements the interface boundary of [`quill_harness::host`]:
//!
//! * [`Host`]: Extension registry plus document host; opening a document of an
//!   activation language activates the matching extensions.
//! * [`Workspace`]: Untitled in-memory documents with host-assigned identities.
//! * [`LogChannel`]: Append-only output channel with atomic snapshot-and-subscribe.
//! * [`GrammarExtension`]: Launches the language server, exports the client and
//!   both log channels, and forwards matching documents with `didOpen`.
//! * [`LanguageClient`]: JSON-RPC client over any async byte stream.
//! * [`ServerLauncher`] / [`ProcessLauncher`]: How the server's stdio is obtained.

#![warn(missing_docs)]

mod channel;
pub mod client;
mod extension;
mod host;
mod launcher;
mod workspace;

pub use channel::LogChannel;
pub use client::{LanguageClient, ServerConfig, ServerState};
pub use extension::{ExtensionExports, ExtensionManifest, GrammarExtension};
pub use host::Host;
pub use launcher::{ProcessLauncher, ServerIo, ServerLauncher};
pub use workspace::{DocumentListener, TextDocument, Workspace};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The client I/O loop stopped.
	#[error("service stopped")]
	ServiceStopped,
	/// A request got no response in time.
	#[error("request timed out: {0}")]
	RequestTimeout(String),
	/// The server answered with an error.
	#[error("{0}")]
	Response(#[from] quill_rpc::ResponseError),
	/// Framing or transport failure.
	#[error(transparent)]
	Rpc(#[from] quill_rpc::Error),
	/// A payload could not be (de)serialized.
	#[error("deserialization failed: {0}")]
	Deserialize(String),
	/// Failed to spawn the language server process.
	#[error("failed to spawn language server '{server}': {reason}")]
	ServerSpawn {
		/// The server command that failed.
		server: String,
		/// The failure reason.
		reason: String,
	},
	/// A document identity is not a valid URI.
	#[error("invalid document uri: {0}")]
	InvalidUri(String),
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Self {
		Self::Deserialize(e.to_string())
	}
}
