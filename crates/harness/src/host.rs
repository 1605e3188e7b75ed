//! Interface boundary to the host editing environment.
//!
//! The harness never looks anything up globally: the registry and document
//! host are handed to [`Suite::setup`](crate::Suite::setup), which keeps the
//! core testable against fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::BoxError;
use crate::document::SampleDocument;

/// Listener invoked with every fragment appended to an [`OutputChannel`].
pub type AppendListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handler invoked with the raw parameters of an inbound notification.
pub type NotificationHandler = Arc<dyn Fn(&JsonValue) + Send + Sync>;

/// Registration key returned by [`AnalysisClient::on_notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

/// Locates extensions owned by the host.
pub trait ExtensionRegistry: Send + Sync {
	/// Looks up an extension by its stable identifier.
	fn get_extension(&self, id: &str) -> Option<Arc<dyn ExtensionHandle>>;
}

/// Read-only view of an extension inside the host.
pub trait ExtensionHandle: Send + Sync {
	/// The stable identifier the extension was looked up by.
	fn id(&self) -> &str;

	/// Whether the host has finished activating the extension.
	fn is_active(&self) -> bool;

	/// The extension's public API, available once active.
	fn exports(&self) -> Option<Arc<dyn ExtensionApi>>;
}

/// Public API exported by an active extension.
///
/// Every member may be absent when the extension failed to initialize it.
pub trait ExtensionApi: Send + Sync {
	/// Log channel written by the client side of the extension.
	fn client_output_channel(&self) -> Option<Arc<dyn OutputChannel>>;

	/// Log channel written with the background analysis process's output.
	fn server_output_channel(&self) -> Option<Arc<dyn OutputChannel>>;

	/// Handle to the background analysis process.
	fn language_client(&self) -> Option<Arc<dyn AnalysisClient>>;
}

/// Append-only text log.
pub trait OutputChannel: Send + Sync {
	/// Display name of the channel.
	fn name(&self) -> &str;

	/// Everything appended so far.
	fn contents(&self) -> String;

	/// Registers a listener for all future appends. Listeners are never removed.
	fn on_append(&self, listener: AppendListener);

	/// Hands the contents accumulated so far to `replay`, then registers
	/// `listener` for every later append.
	///
	/// Implementations should hold off appends across both steps so that every
	/// fragment is seen exactly once, and the replayed contents come first.
	fn replay_and_subscribe(&self, replay: &mut dyn FnMut(&str), listener: AppendListener) {
		replay(&self.contents());
		self.on_append(listener);
	}
}

/// Handle to the background analysis process (a language client).
#[async_trait]
pub trait AnalysisClient: Send + Sync {
	/// Completes once the analysis process is initialized.
	async fn on_ready(&self) -> Result<(), BoxError>;

	/// Registers a handler for every inbound notification named `method`.
	fn on_notification(&self, method: &str, handler: NotificationHandler) -> HandlerId;

	/// Removes a handler registered with [`on_notification`](Self::on_notification).
	fn remove_notification_handler(&self, id: HandlerId);
}

/// Creates in-memory documents inside the host.
#[async_trait]
pub trait DocumentHost: Send + Sync {
	/// Opens a new untitled document of `language` with optional initial text.
	async fn open_text_document(&self, language: &str, content: Option<&str>) -> Result<SampleDocument, BoxError>;
}
