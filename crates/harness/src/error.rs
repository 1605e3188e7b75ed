use std::fmt;
use std::time::Duration;

use crate::BoxError;

/// Errors surfaced by the harness.
///
/// Setup-class errors abort the whole suite; notification timeouts and
/// assertion failures are local to the scenario that raised them.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HarnessError {
	/// No extension is registered under the requested identifier.
	#[error("could not find extension '{0}'")]
	ExtensionNotFound(String),
	/// The extension is active but its public API is incomplete.
	#[error("extension API incomplete: {0}")]
	Configuration(#[from] ConfigurationError),
	/// A host collaborator failed during suite setup.
	#[error("setup failed: {0}")]
	Setup(#[from] SetupError),
	/// A setup stage did not complete within its bound.
	#[error("timed out after {after:?} waiting for {stage}")]
	SetupTimeout {
		/// The stage that timed out.
		stage: SetupStage,
		/// The bound that was exceeded.
		after: Duration,
	},
	/// No notification for the document arrived within the bound.
	#[error("no diagnostics received for {uri} within {after:?}")]
	NotificationTimeout {
		/// Identity of the document that was waited for.
		uri: String,
		/// The bound that was exceeded.
		after: Duration,
	},
	/// The matching notification did not meet the expectation.
	#[error(transparent)]
	Assertion(#[from] AssertionError),
}

impl HarnessError {
	/// Returns true for errors that invalidate every remaining scenario.
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Self::NotificationTimeout { .. } | Self::Assertion(_))
	}
}

/// A missing piece of the extension's exported API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
	/// The extension is active but exports nothing.
	#[error("extension exports not available")]
	MissingExports,
	/// The client-side log channel was never created.
	#[error("client output channel not initialized")]
	MissingClientOutputChannel,
	/// The server-side log channel was never created.
	#[error("server output channel not initialized")]
	MissingServerOutputChannel,
	/// The analysis process handle was never created.
	#[error("language client not initialized")]
	MissingLanguageClient,
}

/// Failure of a host collaborator during setup or document creation.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
	/// The analysis client failed to become ready.
	#[error("language client failed to become ready: {0}")]
	ReadinessFailed(#[source] BoxError),
	/// The host refused to create a sample document.
	#[error("could not create {language} document: {source}")]
	DocumentCreation {
		/// Requested content language.
		language: String,
		/// Host error.
		#[source]
		source: BoxError,
	},
	/// The notification stream went away while a scenario was waiting on it.
	#[error("notification stream closed while waiting for {uri}")]
	NotificationStreamClosed {
		/// Identity of the document that was waited for.
		uri: String,
	},
}

/// Bounded setup stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
	/// Waiting for the extension to report itself active.
	Activation,
	/// Waiting for the analysis client to become ready.
	Readiness,
}

impl fmt::Display for SetupStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Activation => "extension activation",
			Self::Readiness => "language client readiness",
		})
	}
}

/// A matched notification that violated the scenario's expectation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
	/// Wrong number of diagnostics.
	#[error("expected {expected} diagnostic(s) for {uri}, got {actual} (sources: {actual_sources:?})")]
	DiagnosticCount {
		/// Document identity.
		uri: String,
		/// Expected count.
		expected: usize,
		/// Received count.
		actual: usize,
		/// Sources of the received diagnostics, for triage.
		actual_sources: Vec<Option<String>>,
	},
	/// A diagnostic carried the wrong source label.
	#[error("diagnostic #{index} for {uri}: expected source {expected:?}, got {actual:?}")]
	Source {
		/// Document identity.
		uri: String,
		/// Position in the diagnostics sequence.
		index: usize,
		/// Expected source label.
		expected: String,
		/// Received source label, if any.
		actual: Option<String>,
	},
	/// The notification for the document could not be decoded.
	#[error("malformed diagnostics notification for {uri}: {reason}")]
	MalformedNotification {
		/// Document identity.
		uri: String,
		/// Decoder message.
		reason: String,
	},
}
