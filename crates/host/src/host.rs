use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use quill_harness::host::{DocumentHost, ExtensionHandle, ExtensionRegistry};
use quill_harness::{BoxError, SampleDocument};
use tracing::debug;

use crate::extension::GrammarExtension;
use crate::workspace::Workspace;

/// Editor host: the open documents plus the installed extensions.
#[derive(Debug, Default)]
pub struct Host {
	workspace: Arc<Workspace>,
	extensions: RwLock<Vec<Arc<GrammarExtension>>>,
}

impl Host {
	/// Creates a host with an empty workspace and no extensions.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Installs an extension. It stays inactive until a document activates it.
	pub fn register(&self, extension: Arc<GrammarExtension>) {
		debug!(extension = %extension.manifest().id, "Registered extension");
		self.extensions.write().push(extension);
	}

	/// The host's workspace.
	pub fn workspace(&self) -> &Arc<Workspace> {
		&self.workspace
	}

	/// Deactivates every extension, shutting their servers down.
	pub async fn shutdown(&self) {
		let extensions = self.extensions.read().clone();
		for extension in extensions {
			extension.deactivate().await;
		}
	}
}

impl ExtensionRegistry for Host {
	fn get_extension(&self, id: &str) -> Option<Arc<dyn ExtensionHandle>> {
		self.extensions
			.read()
			.iter()
			.find(|e| e.manifest().id == id)
			.map(|e| e.clone() as Arc<dyn ExtensionHandle>)
	}
}

#[async_trait]
impl DocumentHost for Host {
	async fn open_text_document(&self, language: &str, content: Option<&str>) -> Result<SampleDocument, BoxError> {
		let document = self.workspace.open_untitled(language, content);
		let triggered: Vec<_> = self
			.extensions
			.read()
			.iter()
			.filter(|e| e.activates_on(language))
			.cloned()
			.collect();
		for extension in triggered {
			extension.begin_activation(&self.workspace);
		}
		Ok(SampleDocument {
			uri: document.uri.clone(),
			language: document.language_id.clone(),
			text: document.text.clone(),
		})
	}
}
