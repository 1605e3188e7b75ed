use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

/// An open in-memory document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
	/// Identity assigned at creation.
	pub uri: String,
	/// Content language, e.g. `markdown`.
	pub language_id: String,
	/// Document version; untitled documents start at 1 and are never edited.
	pub version: i32,
	/// Full text.
	pub text: String,
}

/// Listener invoked for every document opened after registration.
pub type DocumentListener = Arc<dyn Fn(&Arc<TextDocument>) + Send + Sync>;

/// The set of open documents.
#[derive(Default)]
pub struct Workspace {
	next_untitled: AtomicU64,
	inner: Mutex<WorkspaceState>,
}

#[derive(Default)]
struct WorkspaceState {
	documents: Vec<Arc<TextDocument>>,
	listeners: Vec<DocumentListener>,
}

impl std::fmt::Debug for Workspace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("Workspace")
			.field("documents", &inner.documents.len())
			.field("listeners", &inner.listeners.len())
			.finish()
	}
}

impl Workspace {
	/// Creates an empty workspace.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Opens an untitled document named `untitled:Untitled-N`.
	pub fn open_untitled(&self, language_id: &str, content: Option<&str>) -> Arc<TextDocument> {
		let n = self.next_untitled.fetch_add(1, Ordering::Relaxed) + 1;
		let document = Arc::new(TextDocument {
			uri: format!("untitled:Untitled-{n}"),
			language_id: language_id.to_owned(),
			version: 1,
			text: content.unwrap_or_default().to_owned(),
		});
		debug!(target: "host", uri = %document.uri, language = language_id, "Opened document");

		let listeners = {
			let mut inner = self.inner.lock();
			inner.documents.push(document.clone());
			inner.listeners.clone()
		};
		for listener in listeners {
			listener(&document);
		}
		document
	}

	/// All open documents in opening order.
	pub fn documents(&self) -> Vec<Arc<TextDocument>> {
		self.inner.lock().documents.clone()
	}

	/// Registers `listener` and returns the documents opened before it, atomically.
	pub fn subscribe_with_snapshot(&self, listener: DocumentListener) -> Vec<Arc<TextDocument>> {
		let mut inner = self.inner.lock();
		inner.listeners.push(listener);
		inner.documents.clone()
	}
}
