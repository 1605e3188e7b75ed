use std::sync::Arc;

use tracing::info;

use crate::error::{ConfigurationError, HarnessError};
use crate::host::{ExtensionApi, OutputChannel};

/// Destination for relayed log text.
pub trait RelaySink: Send + Sync {
	/// Receives one fragment of `channel`'s output.
	fn emit(&self, channel: &str, text: &str);
}

/// Sink writing every fragment as an INFO event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RelaySink for TracingSink {
	fn emit(&self, channel: &str, text: &str) {
		let text = text.trim_end_matches(['\r', '\n']);
		if text.is_empty() {
			return;
		}
		info!(target: "harness::output", channel, "{text}");
	}
}

/// Forwards the extension's client and server log channels to a [`RelaySink`].
///
/// Each channel's accumulated contents are forwarded once, then every later
/// append. Listeners stay registered for the life of the process.
#[derive(Clone)]
pub struct OutputRelay {
	sink: Arc<dyn RelaySink>,
}

impl OutputRelay {
	/// Creates a relay writing to `sink`.
	pub fn new(sink: Arc<dyn RelaySink>) -> Self {
		Self { sink }
	}

	/// Subscribes to both log channels of `api`.
	///
	/// # Errors
	///
	/// [`HarnessError::Configuration`] when either channel is absent. The
	/// client channel is checked and relayed before the server channel.
	pub fn attach(&self, api: &dyn ExtensionApi) -> Result<(), HarnessError> {
		let client = api.client_output_channel().ok_or(ConfigurationError::MissingClientOutputChannel)?;
		self.relay(client.as_ref());

		let server = api.server_output_channel().ok_or(ConfigurationError::MissingServerOutputChannel)?;
		self.relay(server.as_ref());
		Ok(())
	}

	fn relay(&self, channel: &dyn OutputChannel) {
		let name: Arc<str> = channel.name().into();
		let sink = self.sink.clone();
		let listener_name = name.clone();
		channel.replay_and_subscribe(
			&mut |snapshot: &str| self.sink.emit(&name, snapshot),
			Arc::new(move |text: &str| sink.emit(&listener_name, text)),
		);
	}
}
