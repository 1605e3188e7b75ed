//! Grammar-checking extension adapter.
//!
//! Activation mirrors an editor extension with `onLanguage:` activation
//! events: the first document of an activation language triggers it, the
//! server is launched, and documents are forwarded once the client is ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use quill_harness::host::{AnalysisClient, ExtensionApi, ExtensionHandle, OutputChannel};
use tracing::{debug, error, info, warn};

use crate::channel::LogChannel;
use crate::client::{LanguageClient, ServerConfig};
use crate::launcher::ServerLauncher;
use crate::workspace::{TextDocument, Workspace};

/// Static description of an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionManifest {
	/// Stable identifier, `publisher.name`.
	pub id: String,
	/// Human-readable name used for log channel titles.
	pub display_name: String,
	/// Languages whose first document activates the extension.
	pub activation_languages: Vec<String>,
	/// Languages whose documents are sent to the server.
	pub document_selector: Vec<String>,
}

impl Default for ExtensionManifest {
	fn default() -> Self {
		let languages: Vec<String> = ["bibtex", "latex", "markdown", "org", "restructuredtext", "rsweave"]
			.into_iter()
			.map(String::from)
			.collect();
		Self {
			id: quill_harness::DEFAULT_EXTENSION_ID.into(),
			display_name: "LTeX".into(),
			activation_languages: languages.clone(),
			document_selector: languages,
		}
	}
}

impl ExtensionManifest {
	/// Manifest with the given identifier and default languages.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Self::default()
		}
	}

	fn selects(&self, document: &TextDocument) -> bool {
		self.document_selector.iter().any(|l| *l == document.language_id)
	}
}

/// Public API of an active [`GrammarExtension`].
#[derive(Debug)]
pub struct ExtensionExports {
	client_output: Arc<LogChannel>,
	server_output: Arc<LogChannel>,
	client: Option<Arc<LanguageClient>>,
}

impl ExtensionExports {
	/// The running client, absent when the server failed to launch.
	pub fn client(&self) -> Option<&Arc<LanguageClient>> {
		self.client.as_ref()
	}
}

impl ExtensionApi for ExtensionExports {
	fn client_output_channel(&self) -> Option<Arc<dyn OutputChannel>> {
		Some(self.client_output.clone())
	}

	fn server_output_channel(&self) -> Option<Arc<dyn OutputChannel>> {
		Some(self.server_output.clone())
	}

	fn language_client(&self) -> Option<Arc<dyn AnalysisClient>> {
		self.client.clone().map(|c| c as Arc<dyn AnalysisClient>)
	}
}

/// Extension that runs a grammar language server.
pub struct GrammarExtension {
	manifest: ExtensionManifest,
	config: ServerConfig,
	launcher: Arc<dyn ServerLauncher>,
	activating: AtomicBool,
	active: AtomicBool,
	exports: OnceLock<Arc<ExtensionExports>>,
}

impl std::fmt::Debug for GrammarExtension {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GrammarExtension")
			.field("id", &self.manifest.id)
			.field("active", &self.is_active())
			.finish_non_exhaustive()
	}
}

impl GrammarExtension {
	/// Creates an inactive extension.
	pub fn new(manifest: ExtensionManifest, config: ServerConfig, launcher: Arc<dyn ServerLauncher>) -> Arc<Self> {
		Arc::new(Self {
			manifest,
			config,
			launcher,
			activating: AtomicBool::new(false),
			active: AtomicBool::new(false),
			exports: OnceLock::new(),
		})
	}

	/// The extension's manifest.
	pub fn manifest(&self) -> &ExtensionManifest {
		&self.manifest
	}

	/// Whether opening a `language` document activates the extension.
	pub fn activates_on(&self, language: &str) -> bool {
		self.manifest.activation_languages.iter().any(|l| l == language)
	}

	/// Starts activation in the background; later calls are no-ops.
	///
	/// Must be called from within a tokio runtime.
	pub fn begin_activation(self: &Arc<Self>, workspace: &Arc<Workspace>) {
		if self.activating.swap(true, Ordering::AcqRel) {
			return;
		}
		debug!(extension = %self.manifest.id, "Activating");
		let this = self.clone();
		let workspace = workspace.clone();
		tokio::spawn(async move { this.activate(workspace) });
	}

	fn activate(self: Arc<Self>, workspace: Arc<Workspace>) {
		let name = &self.manifest.display_name;
		let client_output = LogChannel::new(format!("{name} Language Client"));
		let server_output = LogChannel::new(format!("{name} Language Server"));

		let client = match self.launcher.launch(&self.config) {
			Ok(io) => {
				let client = LanguageClient::start(self.config.command.clone(), io, self.config.clone(), client_output.clone(), server_output.clone());
				tokio::spawn(sync_documents(self.manifest.clone(), client.clone(), workspace));
				Some(client)
			}
			Err(e) => {
				error!(extension = %self.manifest.id, error = %e, "Could not start language server");
				client_output.append_line(&format!("Could not start language server: {e}"));
				None
			}
		};

		let _ = self.exports.set(Arc::new(ExtensionExports {
			client_output,
			server_output,
			client,
		}));
		self.active.store(true, Ordering::Release);
		info!(extension = %self.manifest.id, "Extension activated");
	}

	/// Shuts the language server down, if one is running.
	pub async fn deactivate(&self) {
		let Some(client) = self.exports.get().and_then(|e| e.client.clone()) else {
			return;
		};
		if let Err(e) = client.shutdown().await {
			warn!(extension = %self.manifest.id, error = %e, "Language server shutdown failed");
		}
	}
}

/// Sends `didOpen` for every selected document once the client is ready.
async fn sync_documents(manifest: ExtensionManifest, client: Arc<LanguageClient>, workspace: Arc<Workspace>) {
	if let Err(e) = client.wait_ready().await {
		debug!(extension = %manifest.id, error = %e, "Not syncing documents; client never became ready");
		return;
	}

	let listener_client = client.clone();
	let listener_manifest = manifest.clone();
	let existing = workspace.subscribe_with_snapshot(Arc::new(move |document: &Arc<TextDocument>| {
		if listener_manifest.selects(document) {
			open_document(&listener_client, document);
		}
	}));
	for document in existing.iter().filter(|d| manifest.selects(d)) {
		open_document(&client, document);
	}
}

fn open_document(client: &LanguageClient, document: &TextDocument) {
	if let Err(e) = client.did_open(document) {
		warn!(uri = %document.uri, error = %e, "didOpen failed");
	}
}

impl ExtensionHandle for GrammarExtension {
	fn id(&self) -> &str {
		&self.manifest.id
	}

	fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	fn exports(&self) -> Option<Arc<dyn ExtensionApi>> {
		self.exports.get().map(|e| e.clone() as Arc<dyn ExtensionApi>)
	}
}
