use std::time::Duration;

use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, SetupStage};
use crate::host::ExtensionHandle;
use crate::wait::poll_until;

/// Waits for an extension to report itself active.
///
/// The host offers no activation event, so the flag is polled.
#[derive(Debug, Clone, Copy)]
pub struct ActivationWaiter {
	interval: Duration,
	timeout: Duration,
}

impl ActivationWaiter {
	/// Creates a waiter polling every `interval`, giving up after `timeout`.
	pub fn new(interval: Duration, timeout: Duration) -> Self {
		Self { interval, timeout }
	}

	/// Creates a waiter from the harness configuration.
	pub fn from_config(config: &HarnessConfig) -> Self {
		Self::new(config.poll_interval(), config.activation_timeout())
	}

	/// Suspends until `extension.is_active()` holds.
	///
	/// # Errors
	///
	/// [`HarnessError::SetupTimeout`] with [`SetupStage::Activation`] when the
	/// flag is still false after the configured bound.
	pub async fn wait(&self, extension: &dyn ExtensionHandle) -> Result<(), HarnessError> {
		info!(target: "harness", extension = extension.id(), "Waiting for activation of {}...", extension.id());
		poll_until(self.interval, self.timeout, || extension.is_active())
			.await
			.map_err(|_| HarnessError::SetupTimeout {
				stage: SetupStage::Activation,
				after: self.timeout,
			})?;
		debug!(target: "harness", extension = extension.id(), "Extension active");
		Ok(())
	}
}
