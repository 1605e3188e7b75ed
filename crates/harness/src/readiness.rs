use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{ConfigurationError, HarnessError, SetupError, SetupStage};
use crate::host::{AnalysisClient, ExtensionApi};
use crate::wait::bounded;

/// Waits once for the analysis client to become ready.
///
/// The first successful wait is memoized: later calls return the same client
/// without invoking [`AnalysisClient::on_ready`] again. A failed wait is not
/// memoized, but failures are fatal to the suite anyway.
pub struct ReadinessGate {
	timeout: Duration,
	ready: OnceCell<Arc<dyn AnalysisClient>>,
}

impl ReadinessGate {
	/// Creates a gate bounding the readiness wait by `timeout`.
	pub fn new(timeout: Duration) -> Self {
		Self {
			timeout,
			ready: OnceCell::new(),
		}
	}

	/// Whether readiness has already been established.
	pub fn is_ready(&self) -> bool {
		self.ready.initialized()
	}

	/// Returns the ready analysis client of `api`.
	///
	/// # Errors
	///
	/// * [`ConfigurationError::MissingLanguageClient`] when `api` has no client.
	/// * [`SetupError::ReadinessFailed`] when the client reports a failure.
	/// * [`HarnessError::SetupTimeout`] when the bound elapses.
	pub async fn ensure_ready(&self, api: &dyn ExtensionApi) -> Result<Arc<dyn AnalysisClient>, HarnessError> {
		if let Some(client) = self.ready.get() {
			return Ok(client.clone());
		}

		let client = api.language_client().ok_or(ConfigurationError::MissingLanguageClient)?;
		let client = self
			.ready
			.get_or_try_init(|| async {
				info!(target: "harness", "Waiting for language client to be ready...");
				match bounded(self.timeout, client.on_ready()).await {
					Some(Ok(())) => Ok(client.clone()),
					Some(Err(e)) => Err(HarnessError::Setup(SetupError::ReadinessFailed(e))),
					None => Err(HarnessError::SetupTimeout {
						stage: SetupStage::Readiness,
						after: self.timeout,
					}),
				}
			})
			.await?;
		info!(target: "harness", "Language client is ready.");
		Ok(client.clone())
	}
}
