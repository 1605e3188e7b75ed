//! End-to-end verification harness for a diagnostics-publishing editor extension.
//!
//! The harness boots an extension inside a host, waits until it reports itself
//! active, opens sample documents and asserts that the extension's background
//! analysis process publishes exactly the expected diagnostics for each one.
//!
//! The host is only seen through the traits in [`host`], so the whole flow can
//! run against a real editor host or an in-process fake.
//!
//! * [`ActivationWaiter`]: Poll the extension's activation flag with a bound.
//! * [`OutputRelay`]: Forward the client and server log channels to a sink.
//! * [`ReadinessGate`]: Await the analysis client's one-shot readiness, memoized.
//! * [`DocumentFactory`]: Create sample documents with host-assigned identities.
//! * [`DiagnosticMatcher`]: Resolve one expectation from the first matching notification.
//! * [`Suite`] / [`run_suite`]: Sequential scenario orchestration.

#![warn(missing_docs)]

mod activation;
mod config;
mod diagnostics;
mod document;
mod error;
pub mod host;
mod matcher;
mod readiness;
mod relay;
pub mod scenario;
mod wait;

#[cfg(test)]
mod test_support;

pub use activation::ActivationWaiter;
pub use config::{ConfigError, DEFAULT_EXTENSION_ID, HarnessConfig};
pub use diagnostics::{Diagnostic, DiagnosticExpectation, DiagnosticNotification};
pub use document::{DocumentFactory, SampleDocument};
pub use error::{AssertionError, ConfigurationError, HarnessError, SetupError, SetupStage};
pub use matcher::{DiagnosticMatcher, MatcherState, NotificationSubscription, PUBLISH_DIAGNOSTICS, PendingVerification};
pub use readiness::ReadinessGate;
pub use relay::{OutputRelay, RelaySink, TracingSink};
pub use scenario::{Scenario, ScenarioOutcome, Suite, SuiteReport, run_suite};
pub use wait::{PollTimeout, bounded, poll_until};

/// A convenient type alias for `Result` with `E` = [`HarnessError`].
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Boxed error used at host trait seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
