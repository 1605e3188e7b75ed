//! Correlation of diagnostics notifications to a single pending expectation.
//!
//! A [`DiagnosticMatcher`] starts in [`MatcherState::Waiting`] and leaves it
//! on the first notification whose `uri` equals its document's identity:
//! to [`MatcherState::Matched`] when the expectation holds, to
//! [`MatcherState::Failed`] otherwise. Notifications for other documents and
//! everything after the first match are ignored.
//!
//! The first matching notification is authoritative. If the analysis process
//! publishes a partial result before settling, the partial result decides.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize as _;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::diagnostics::{DiagnosticExpectation, DiagnosticNotification};
use crate::document::SampleDocument;
use crate::error::{AssertionError, HarnessError, SetupError};
use crate::host::{AnalysisClient, HandlerId};
use crate::wait::bounded;


/// Method name of the diagnostics notification.
pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";

/// Matcher lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherState {
	/// No notification for the document has arrived yet.
	Waiting,
	/// The first matching notification met the expectation.
	Matched,
	/// The first matching notification violated the expectation.
	Failed,
}

type Resolution = Result<(), AssertionError>;

/// Resolves one expectation for one document identity, exactly once.
///
/// The resolution sender lives inside the matcher. Once the matcher is armed,
/// the registered handler holds the only strong reference, so a client that
/// drops its handlers closes the pending wait.
pub struct DiagnosticMatcher {
	uri: String,
	expectation: DiagnosticExpectation,
	state: Arc<Mutex<MatcherState>>,
	resolve: Mutex<Option<oneshot::Sender<Resolution>>>,
}

impl DiagnosticMatcher {
	/// Creates a waiting matcher and the receiver its resolution is sent to.
	pub fn new(uri: impl Into<String>, expectation: DiagnosticExpectation) -> (Self, oneshot::Receiver<Resolution>) {
		let (tx, rx) = oneshot::channel();
		let matcher = Self {
			uri: uri.into(),
			expectation,
			state: Arc::new(Mutex::new(MatcherState::Waiting)),
			resolve: Mutex::new(Some(tx)),
		};
		(matcher, rx)
	}

	/// Identity of the document this matcher waits for.
	pub fn uri(&self) -> &str {
		&self.uri
	}

	/// Current state.
	pub fn state(&self) -> MatcherState {
		*self.state.lock()
	}

	/// Offers a decoded notification. Returns true iff it caused a transition.
	pub fn offer(&self, notification: &DiagnosticNotification) -> bool {
		if notification.uri != self.uri {
			trace!(target: "harness", expected = %self.uri, got = %notification.uri, "Ignoring diagnostics for other document");
			return false;
		}
		let outcome = self.expectation.check(&self.uri, &notification.diagnostics);
		self.resolve(outcome)
	}

	/// Offers raw notification parameters.
	///
	/// Parameters without a string `uri` cannot belong to this document and are
	/// ignored. A matching `uri` with an undecodable body fails the matcher.
	pub fn offer_params(&self, params: &JsonValue) -> bool {
		let Some(uri) = params.get("uri").and_then(JsonValue::as_str) else {
			warn!(target: "harness", "Diagnostics notification without uri");
			return false;
		};
		if uri != self.uri {
			trace!(target: "harness", expected = %self.uri, got = uri, "Ignoring diagnostics for other document");
			return false;
		}
		match DiagnosticNotification::deserialize(params) {
			Ok(notification) => self.offer(&notification),
			Err(e) => self.resolve(Err(AssertionError::MalformedNotification {
				uri: self.uri.clone(),
				reason: e.to_string(),
			})),
		}
	}

	fn resolve(&self, outcome: Resolution) -> bool {
		let mut state = self.state.lock();
		if *state != MatcherState::Waiting {
			debug!(target: "harness", uri = %self.uri, state = ?*state, "Ignoring repeated diagnostics");
			return false;
		}
		*state = if outcome.is_ok() {
			MatcherState::Matched
		} else {
			MatcherState::Failed
		};
		debug!(target: "harness", uri = %self.uri, state = ?*state, "Matcher resolved");
		if let Some(tx) = self.resolve.lock().take() {
			let _ = tx.send(outcome);
		}
		true
	}

	/// Registers a matcher for `document` on `client` and returns the pending wait.
	///
	/// Registration is synchronous, so a caller that arms the matcher right
	/// after creating the document cannot miss a notification in between.
	pub fn arm(client: Arc<dyn AnalysisClient>, document: &SampleDocument, expectation: DiagnosticExpectation) -> PendingVerification {
		let (matcher, resolution) = Self::new(document.uri.clone(), expectation);
		let uri = matcher.uri.clone();
		let state = matcher.state.clone();
		let subscription = NotificationSubscription::register(
			client,
			PUBLISH_DIAGNOSTICS,
			Arc::new(move |params: &JsonValue| {
				matcher.offer_params(params);
			}),
		);
		PendingVerification {
			uri,
			state,
			resolution,
			_subscription: subscription,
		}
	}
}

/// An armed matcher awaiting its resolution.
///
/// Dropping it, including after a timeout, unregisters the handler.
pub struct PendingVerification {
	uri: String,
	state: Arc<Mutex<MatcherState>>,
	resolution: oneshot::Receiver<Resolution>,
	_subscription: NotificationSubscription,
}

impl PendingVerification {
	/// Identity of the document being waited for.
	pub fn uri(&self) -> &str {
		&self.uri
	}

	/// Current state of the armed matcher.
	pub fn state(&self) -> MatcherState {
		*self.state.lock()
	}

	/// Waits for the resolution, bounded by `timeout`.
	///
	/// # Errors
	///
	/// * [`HarnessError::Assertion`] when the matching notification violated
	///   the expectation.
	/// * [`HarnessError::NotificationTimeout`] when nothing matched in time.
	/// * [`SetupError::NotificationStreamClosed`] when the client dropped the
	///   handler first, e.g. because its connection died. This one is fatal.
	pub async fn wait(self, timeout: Duration) -> Result<(), HarnessError> {
		let uri = self.uri;
		match bounded(timeout, self.resolution).await {
			Some(Ok(outcome)) => outcome.map_err(HarnessError::Assertion),
			Some(Err(_)) => Err(HarnessError::Setup(SetupError::NotificationStreamClosed { uri })),
			None => Err(HarnessError::NotificationTimeout { uri, after: timeout }),
		}
	}
}

/// A notification handler registration removed on drop.
pub struct NotificationSubscription {
	client: Arc<dyn AnalysisClient>,
	id: HandlerId,
}

impl NotificationSubscription {
	/// Registers `handler` for `method` on `client`.
	pub fn register(client: Arc<dyn AnalysisClient>, method: &str, handler: crate::host::NotificationHandler) -> Self {
		let id = client.on_notification(method, handler);
		Self { client, id }
	}

	/// The registration key.
	pub fn id(&self) -> HandlerId {
		self.id
	}
}

impl Drop for NotificationSubscription {
	fn drop(&mut self) {
		self.client.remove_notification_handler(self.id);
	}
}
