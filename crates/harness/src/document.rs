use std::sync::Arc;

use tracing::debug;

use crate::error::{HarnessError, SetupError};
use crate::host::DocumentHost;

/// An in-memory sample document created for one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDocument {
	/// Host-assigned identity; equals the `uri` of later notifications.
	pub uri: String,
	/// Content language tag, e.g. `markdown` or `latex`.
	pub language: String,
	/// Literal text content.
	pub text: String,
}

/// Creates sample documents through the host.
#[derive(Clone)]
pub struct DocumentFactory {
	host: Arc<dyn DocumentHost>,
}

impl DocumentFactory {
	/// Creates a factory over `host`.
	pub fn new(host: Arc<dyn DocumentHost>) -> Self {
		Self { host }
	}

	/// Opens a new document. Analysis, if any, happens later in the background.
	///
	/// # Errors
	///
	/// [`SetupError::DocumentCreation`] when the host rejects the document.
	pub async fn create(&self, language: &str, text: Option<&str>) -> Result<SampleDocument, HarnessError> {
		let document = self
			.host
			.open_text_document(language, text)
			.await
			.map_err(|source| SetupError::DocumentCreation {
				language: language.to_owned(),
				source,
			})?;
		debug!(target: "harness", uri = %document.uri, language, "Created document");
		Ok(document)
	}
}
