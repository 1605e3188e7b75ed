mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use quill_harness::host::ExtensionRegistry;
use quill_harness::scenario::builtin;
use quill_harness::{ConfigurationError, DiagnosticExpectation, HarnessError, Scenario, ScenarioOutcome, SetupError, run_suite};
use serde_json::json;

use common::{Behavior, DuplexLauncher, EN_A_VS_AN, MissingBinaryLauncher, RecordingSink, harness_config, host_with, wait_until};

#[tokio::test]
async fn builtin_scenarios_pass_against_conforming_server() {
	let launcher = Arc::new(DuplexLauncher::new(Behavior::Conforming));
	let log = launcher.log();
	let host = host_with(launcher.clone());
	let sink = Arc::new(RecordingSink::default());

	let report = run_suite(host.as_ref(), host.clone(), harness_config(), sink.clone(), &builtin()).await;

	assert!(report.all_passed(), "{report}");
	assert_eq!(report.passed(), 2);
	assert_eq!(launcher.launches(), 1);
	// Warm-up document plus one per scenario, each sent exactly once.
	assert_eq!(*log.opened.lock(), vec!["untitled:Untitled-1", "untitled:Untitled-2", "untitled:Untitled-3"]);

	host.shutdown().await;
	assert!(wait_until(Duration::from_secs(2), || *log.exited.lock()).await);
}

#[tokio::test]
async fn relay_forwards_both_log_channels() {
	let launcher = Arc::new(DuplexLauncher::new(Behavior::Conforming));
	let host = host_with(launcher);
	let sink = Arc::new(RecordingSink::default());

	let report = run_suite(host.as_ref(), host.clone(), harness_config(), sink.clone(), &builtin()).await;
	assert!(report.all_passed(), "{report}");

	let client_log = sink.text_of("LTeX Language Client");
	assert!(client_log.contains("Starting fake-ltex"), "{client_log:?}");
	assert!(client_log.contains("fake-ltex is ready"), "{client_log:?}");
	assert!(sink.text_of("LTeX Language Server").contains("fake-ltex initialized"));
}

#[tokio::test]
async fn configuration_requests_get_the_configured_settings() {
	let launcher = Arc::new(DuplexLauncher::new(Behavior::Conforming));
	let log = launcher.log();
	let host = host_with(launcher);

	let report = run_suite(host.as_ref(), host.clone(), harness_config(), Arc::new(RecordingSink::default()), &builtin()).await;
	assert!(report.all_passed(), "{report}");

	assert!(wait_until(Duration::from_secs(2), || !log.config_replies.lock().is_empty()).await);
	assert_eq!(log.config_replies.lock()[0], json!([{"language": "en-US"}]));
}

#[tokio::test]
async fn silent_server_times_out_per_scenario() {
	let host = host_with(Arc::new(DuplexLauncher::new(Behavior::Silent)));
	let mut config = harness_config();
	config.notification_timeout_ms = 150;

	let report = run_suite(host.as_ref(), host.clone(), config, Arc::new(RecordingSink::default()), &builtin()).await;

	assert_eq!(report.passed(), 0);
	assert_eq!(report.outcomes.len(), 2);
	for (_, outcome) in &report.outcomes {
		assert!(matches!(outcome, ScenarioOutcome::Failed(HarnessError::NotificationTimeout { .. })), "{outcome:?}");
	}
}

#[tokio::test]
async fn first_notification_decides_even_when_incomplete() {
	let host = host_with(Arc::new(DuplexLauncher::new(Behavior::NoisyFirst)));

	let report = run_suite(host.as_ref(), host.clone(), harness_config(), Arc::new(RecordingSink::default()), &builtin()).await;

	for (_, outcome) in &report.outcomes {
		assert!(matches!(outcome, ScenarioOutcome::Failed(HarnessError::Assertion(_))), "{outcome:?}");
	}
}

#[tokio::test]
async fn crashing_server_aborts_the_suite() {
	let host = host_with(Arc::new(DuplexLauncher::new(Behavior::CrashOnInitialize)));

	let report = run_suite(host.as_ref(), host.clone(), harness_config(), Arc::new(RecordingSink::default()), &builtin()).await;

	assert_eq!(report.outcomes.len(), 2);
	for (_, outcome) in &report.outcomes {
		assert!(matches!(outcome, ScenarioOutcome::Aborted(cause) if cause.contains("service stopped")), "{outcome:?}");
	}
}

#[tokio::test]
async fn server_dying_mid_suite_aborts_the_rest() {
	let host = host_with(Arc::new(DuplexLauncher::new(Behavior::CrashOnFirstCheck)));
	let mut config = harness_config();
	config.notification_timeout_ms = 0;

	let report = tokio::time::timeout(
		Duration::from_secs(5),
		run_suite(host.as_ref(), host.clone(), config, Arc::new(RecordingSink::default()), &builtin()),
	)
	.await
	.expect("suite should stop once the server is gone");

	assert_eq!(report.outcomes.len(), 2);
	assert!(
		matches!(report.outcomes[0].1, ScenarioOutcome::Failed(HarnessError::Setup(SetupError::NotificationStreamClosed { .. }))),
		"{report}"
	);
	assert!(matches!(&report.outcomes[1].1, ScenarioOutcome::Aborted(cause) if cause.contains("notification stream closed")), "{report}");
}

#[tokio::test]
async fn launch_failure_leaves_no_language_client() {
	let host = host_with(Arc::new(MissingBinaryLauncher));

	let report = run_suite(host.as_ref(), host.clone(), harness_config(), Arc::new(RecordingSink::default()), &builtin()).await;

	let expected = HarnessError::from(ConfigurationError::MissingLanguageClient).to_string();
	for (_, outcome) in &report.outcomes {
		assert!(matches!(outcome, ScenarioOutcome::Aborted(cause) if *cause == expected), "{outcome:?}");
	}
}

#[tokio::test]
async fn unknown_extension_is_reported() {
	let host = host_with(Arc::new(DuplexLauncher::new(Behavior::Conforming)));
	assert!(host.get_extension("someone.else").is_none());

	let config = harness_config().extension_id("someone.else");
	let report = run_suite(host.as_ref(), host.clone(), config, Arc::new(RecordingSink::default()), &builtin()).await;

	for (_, outcome) in &report.outcomes {
		assert!(matches!(outcome, ScenarioOutcome::Aborted(cause) if cause.contains("someone.else")), "{outcome:?}");
	}
}

#[tokio::test]
async fn clean_text_expects_no_diagnostics() {
	let host = host_with(Arc::new(DuplexLauncher::new(Behavior::Conforming)));
	let scenarios = [
		Scenario::new("clean markdown", "markdown", "This is a *test*.", DiagnosticExpectation::none()),
		Scenario::new("article in latex", "latex", "This is an \\emph{example} and an \\textbf{test}.", DiagnosticExpectation::single(EN_A_VS_AN)),
	];

	let report = run_suite(host.as_ref(), host.clone(), harness_config(), Arc::new(RecordingSink::default()), &scenarios).await;
	assert!(report.all_passed(), "{report}");
}

#[tokio::test]
async fn readiness_failure_is_a_setup_error() {
	let host = host_with(Arc::new(DuplexLauncher::new(Behavior::CrashOnInitialize)));

	let err = match quill_harness::Suite::setup(host.as_ref(), host.clone(), harness_config(), Arc::new(RecordingSink::default())).await {
		Ok(_) => panic!("setup should fail"),
		Err(e) => e,
	};
	assert!(matches!(err, HarnessError::Setup(SetupError::ReadinessFailed(_))), "{err:?}");
}
