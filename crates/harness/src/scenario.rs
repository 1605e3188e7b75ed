//! Scenario orchestration.
//!
//! [`Suite::setup`] runs the once-per-suite stages (lookup, activation,
//! output relay, readiness); each [`Scenario`] then creates one document and
//! waits for one matcher resolution. Scenarios never run concurrently.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::activation::ActivationWaiter;
use crate::config::HarnessConfig;
use crate::diagnostics::DiagnosticExpectation;
use crate::document::DocumentFactory;
use crate::error::{ConfigurationError, HarnessError};
use crate::host::{DocumentHost, ExtensionApi, ExtensionRegistry};
use crate::matcher::DiagnosticMatcher;
use crate::readiness::ReadinessGate;
use crate::relay::{OutputRelay, RelaySink};

/// Source label of the grammar rule flagging "an" before a consonant sound.
pub const EN_A_VS_AN: &str = "LTeX - EN_A_VS_AN";

/// One test case: a document to create and the diagnostics it must produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
	/// Display name.
	pub name: String,
	/// Content language of the document.
	pub language: String,
	/// Literal document text.
	pub text: String,
	/// Expected diagnostics.
	pub expectation: DiagnosticExpectation,
}

impl Scenario {
	/// Creates a scenario.
	pub fn new(name: impl Into<String>, language: impl Into<String>, text: impl Into<String>, expectation: DiagnosticExpectation) -> Self {
		Self {
			name: name.into(),
			language: language.into(),
			text: text.into(),
			expectation,
		}
	}
}

/// The built-in scenarios: the same article misuse in Markdown and in LaTeX.
pub fn builtin() -> Vec<Scenario> {
	vec![
		Scenario::new("test1.md - Test checking of Markdown files", "markdown", "This is an *test*.", DiagnosticExpectation::single(EN_A_VS_AN)),
		Scenario::new("test1.tex - Test checking of LaTeX files", "latex", "This is an \\textbf{test}.", DiagnosticExpectation::single(EN_A_VS_AN)),
	]
}

/// A suite whose setup stages have completed.
pub struct Suite {
	config: HarnessConfig,
	api: Arc<dyn ExtensionApi>,
	gate: ReadinessGate,
	documents: DocumentFactory,
}

impl Suite {
	/// Runs lookup, activation, output relay and readiness.
	///
	/// # Errors
	///
	/// Any error here is fatal: the extension is missing, never activates,
	/// exports an incomplete API or its language client never gets ready.
	pub async fn setup(
		registry: &dyn ExtensionRegistry,
		documents: Arc<dyn DocumentHost>,
		config: HarnessConfig,
		sink: Arc<dyn RelaySink>,
	) -> Result<Self, HarnessError> {
		let extension = registry
			.get_extension(&config.extension_id)
			.ok_or_else(|| HarnessError::ExtensionNotFound(config.extension_id.clone()))?;
		let documents = DocumentFactory::new(documents);

		if let Some(language) = &config.activation_language {
			documents.create(language, None).await?;
		}
		ActivationWaiter::from_config(&config).wait(extension.as_ref()).await?;

		let api = extension.exports().ok_or(ConfigurationError::MissingExports)?;
		OutputRelay::new(sink).attach(api.as_ref())?;

		let gate = ReadinessGate::new(config.readiness_timeout());
		gate.ensure_ready(api.as_ref()).await?;

		Ok(Self {
			config,
			api,
			gate,
			documents,
		})
	}

	/// Creates the scenario's document and waits for its diagnostics.
	pub async fn run_scenario(&self, scenario: &Scenario) -> Result<(), HarnessError> {
		let client = self.gate.ensure_ready(self.api.as_ref()).await?;
		let document = self.documents.create(&scenario.language, Some(&scenario.text)).await?;
		DiagnosticMatcher::arm(client, &document, scenario.expectation.clone())
			.wait(self.config.notification_timeout())
			.await
	}
}

/// Result of one scenario.
#[derive(Debug)]
pub enum ScenarioOutcome {
	/// The expectation held.
	Passed,
	/// The scenario failed on its own.
	Failed(HarnessError),
	/// A fatal error elsewhere prevented the scenario from running.
	Aborted(String),
}

impl ScenarioOutcome {
	/// Whether the scenario passed.
	pub fn is_passed(&self) -> bool {
		matches!(self, Self::Passed)
	}
}

/// Per-scenario outcomes of a suite run, in execution order.
#[derive(Debug, Default)]
pub struct SuiteReport {
	/// `(scenario name, outcome)` pairs.
	pub outcomes: Vec<(String, ScenarioOutcome)>,
}

impl SuiteReport {
	/// Whether every scenario passed. An empty report passes.
	pub fn all_passed(&self) -> bool {
		self.outcomes.iter().all(|(_, o)| o.is_passed())
	}

	/// Number of passed scenarios.
	pub fn passed(&self) -> usize {
		self.outcomes.iter().filter(|(_, o)| o.is_passed()).count()
	}

	fn abort_all<'a>(&mut self, scenarios: impl IntoIterator<Item = &'a Scenario>, cause: &HarnessError) {
		let cause = cause.to_string();
		for scenario in scenarios {
			self.outcomes.push((scenario.name.clone(), ScenarioOutcome::Aborted(cause.clone())));
		}
	}
}

impl fmt::Display for SuiteReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (name, outcome) in &self.outcomes {
			match outcome {
				ScenarioOutcome::Passed => writeln!(f, "  ok      {name}")?,
				ScenarioOutcome::Failed(e) => writeln!(f, "  FAILED  {name}: {e}")?,
				ScenarioOutcome::Aborted(cause) => writeln!(f, "  ABORTED {name}: {cause}")?,
			}
		}
		write!(f, "{} passed, {} total", self.passed(), self.outcomes.len())
	}
}

/// Sets up the suite and runs `scenarios` one after another.
///
/// A setup failure, or a fatal error raised by a scenario, aborts every
/// remaining scenario with the root cause.
pub async fn run_suite(
	registry: &dyn ExtensionRegistry,
	documents: Arc<dyn DocumentHost>,
	config: HarnessConfig,
	sink: Arc<dyn RelaySink>,
	scenarios: &[Scenario],
) -> SuiteReport {
	let mut report = SuiteReport::default();
	let suite = match Suite::setup(registry, documents, config, sink).await {
		Ok(suite) => suite,
		Err(e) => {
			error!(target: "harness", error = %e, "Suite setup failed");
			report.abort_all(scenarios, &e);
			return report;
		}
	};

	for (i, scenario) in scenarios.iter().enumerate() {
		info!(target: "harness", scenario = %scenario.name, "Running scenario");
		match suite.run_scenario(scenario).await {
			Ok(()) => {
				info!(target: "harness", scenario = %scenario.name, "Scenario passed");
				report.outcomes.push((scenario.name.clone(), ScenarioOutcome::Passed));
			}
			Err(e) if e.is_fatal() => {
				error!(target: "harness", scenario = %scenario.name, error = %e, "Fatal error, aborting remaining scenarios");
				let remaining = &scenarios[i + 1..];
				let cause = e.to_string();
				report.outcomes.push((scenario.name.clone(), ScenarioOutcome::Failed(e)));
				report.outcomes.extend(remaining.iter().map(|s| (s.name.clone(), ScenarioOutcome::Aborted(cause.clone()))));
				break;
			}
			Err(e) => {
				warn!(target: "harness", scenario = %scenario.name, error = %e, "Scenario failed");
				report.outcomes.push((scenario.name.clone(), ScenarioOutcome::Failed(e)));
			}
		}
	}
	report
}
