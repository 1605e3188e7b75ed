//! Diagnostics notification model and expectations.

use serde::{Deserialize, Serialize};

use crate::error::AssertionError;

/// One reported issue. Only the fields the harness asserts on are decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
	/// Label of the rule or tool that produced the diagnostic.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
	/// Human-readable description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

/// Parameters of a `textDocument/publishDiagnostics` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticNotification {
	/// Identity of the document the diagnostics belong to.
	pub uri: String,
	/// Diagnostics in server order.
	#[serde(default)]
	pub diagnostics: Vec<Diagnostic>,
	/// Document version the diagnostics were computed for.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<i32>,
}

/// What a scenario expects to receive for its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticExpectation {
	count: usize,
	sources: Vec<(usize, String)>,
}

impl DiagnosticExpectation {
	/// Expect exactly `count` diagnostics.
	pub fn count(count: usize) -> Self {
		Self {
			count,
			sources: Vec::new(),
		}
	}

	/// Expect no diagnostics at all.
	pub fn none() -> Self {
		Self::count(0)
	}

	/// Expect exactly one diagnostic with the given source label.
	pub fn single(source: impl Into<String>) -> Self {
		Self::count(1).with_source(0, source)
	}

	/// Additionally expect the diagnostic at `index` to carry `source`.
	pub fn with_source(mut self, index: usize, source: impl Into<String>) -> Self {
		self.sources.push((index, source.into()));
		self
	}

	/// Expected number of diagnostics.
	pub fn expected_count(&self) -> usize {
		self.count
	}

	/// Checks `diagnostics` received for `uri`: count first, then each source.
	pub fn check(&self, uri: &str, diagnostics: &[Diagnostic]) -> Result<(), AssertionError> {
		if diagnostics.len() != self.count {
			return Err(AssertionError::DiagnosticCount {
				uri: uri.to_owned(),
				expected: self.count,
				actual: diagnostics.len(),
				actual_sources: diagnostics.iter().map(|d| d.source.clone()).collect(),
			});
		}

		for (index, expected) in &self.sources {
			let actual = diagnostics.get(*index).and_then(|d| d.source.as_deref());
			if actual != Some(expected.as_str()) {
				return Err(AssertionError::Source {
					uri: uri.to_owned(),
					index: *index,
					expected: expected.clone(),
					actual: actual.map(str::to_owned),
				});
			}
		}
		Ok(())
	}
}
