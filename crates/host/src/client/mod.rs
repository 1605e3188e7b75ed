//! JSON-RPC language client.
//!
//! The client talks to the server over any buffered reader and writer. All
//! writes go through one I/O task in submission order; inbound notifications
//! are dispatched from that task to handlers registered by method.

mod config;
mod io;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lsp_types::notification::Notification;
use lsp_types::request::Request;
use lsp_types::{ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, Uri, WorkspaceFolder};
use parking_lot::Mutex;
use quill_harness::BoxError;
use quill_harness::host::{AnalysisClient, HandlerId, NotificationHandler};
use quill_rpc::{AnyNotification, AnyRequest, CounterIdGen, JsonValue};
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::sync::{OnceCell, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

pub use self::config::ServerConfig;
use self::io::{Outbound, run_client_io};
use crate::channel::LogChannel;
use crate::launcher::ServerIo;
use crate::workspace::TextDocument;
use crate::{Error, Result};

/// Language server lifecycle state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ServerState {
	/// Connected; the handshake has not completed.
	Starting,
	/// `initialize`/`initialized` done, documents may be opened.
	Ready,
	/// The connection is gone.
	Dead,
}

/// State shared between the client handle and its I/O task.
pub(crate) struct Shared {
	pub(crate) name: String,
	pub(crate) config: ServerConfig,
	pub(crate) server_output: Arc<LogChannel>,
	pub(crate) state_tx: watch::Sender<ServerState>,
	handlers: Mutex<HandlerTable>,
}

#[derive(Default)]
struct HandlerTable {
	next_id: u64,
	closed: bool,
	entries: Vec<(HandlerId, String, NotificationHandler)>,
}

impl Shared {
	/// Invokes every handler registered for `method`, outside the table lock.
	pub(crate) fn dispatch(&self, method: &str, params: &JsonValue) {
		let handlers: Vec<_> = self
			.handlers
			.lock()
			.entries
			.iter()
			.filter(|(_, m, _)| m == method)
			.map(|(_, _, h)| h.clone())
			.collect();
		for handler in handlers {
			handler(params);
		}
	}

	/// Drops every handler and refuses new ones once the connection is gone.
	pub(crate) fn close_handlers(&self) {
		let dropped = {
			let mut table = self.handlers.lock();
			table.closed = true;
			std::mem::take(&mut table.entries)
		};
		debug!(server = %self.name, count = dropped.len(), "Dropped notification handlers");
	}
}

/// Client handle for one language server connection.
pub struct LanguageClient {
	shared: Arc<Shared>,
	outbound_tx: mpsc::UnboundedSender<Outbound>,
	ids: Mutex<CounterIdGen>,
	timeout: Duration,
	ready: OnceCell<Result<()>>,
	client_output: Arc<LogChannel>,
	child: Mutex<Option<Child>>,
}

impl std::fmt::Debug for LanguageClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LanguageClient")
			.field("name", &self.shared.name)
			.field("state", &self.state())
			.field("handlers", &self.shared.handlers.lock().entries.len())
			.finish_non_exhaustive()
	}
}

impl LanguageClient {
	/// Connects to a server over `io` and spawns the I/O task.
	///
	/// Must be called from within a tokio runtime. Server stderr, when
	/// present, is appended line by line to `server_output`.
	pub fn start(name: impl Into<String>, io: ServerIo, config: ServerConfig, client_output: Arc<LogChannel>, server_output: Arc<LogChannel>) -> Arc<Self> {
		let name = name.into();
		let (state_tx, _) = watch::channel(ServerState::Starting);
		let timeout = config.request_timeout();
		let shared = Arc::new(Shared {
			name,
			config,
			server_output,
			state_tx,
			handlers: Mutex::new(HandlerTable::default()),
		});

		let ServerIo { reader, writer, stderr, child } = io;
		if let Some(stderr) = stderr {
			tokio::spawn(crate::launcher::pump_lines(stderr, shared.server_output.clone()));
		}

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		tokio::spawn(run_client_io(shared.clone(), BufReader::new(reader), writer, outbound_rx));

		client_output.append_line(&format!("Starting {}", shared.name));
		Arc::new(Self {
			shared,
			outbound_tx,
			ids: Mutex::new(CounterIdGen::new()),
			timeout,
			ready: OnceCell::new(),
			client_output,
			child: Mutex::new(child),
		})
	}

	/// Server name used in logs.
	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Current lifecycle state.
	pub fn state(&self) -> ServerState {
		*self.shared.state_tx.borrow()
	}

	/// Subscribe to state changes.
	pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
		self.shared.state_tx.subscribe()
	}

	/// Send a request to the language server.
	pub async fn request<R: Request>(&self, params: R::Params) -> Result<R::Result> {
		let request = AnyRequest {
			id: self.ids.lock().next(),
			method: R::METHOD.into(),
			params: serde_json::to_value(params)?,
		};
		let (tx, rx) = oneshot::channel();
		self.outbound_tx
			.send(Outbound::Request { request, response_tx: tx })
			.map_err(|_| Error::ServiceStopped)?;
		let resp = if self.timeout == Duration::ZERO {
			rx.await.map_err(|_| Error::ServiceStopped)??
		} else {
			match tokio::time::timeout(self.timeout, rx).await {
				Ok(resp) => resp.map_err(|_| Error::ServiceStopped)??,
				Err(_) => return Err(Error::RequestTimeout(R::METHOD.into())),
			}
		};
		match resp.error {
			None => Ok(serde_json::from_value(resp.result.unwrap_or_default())?),
			Some(err) => Err(Error::Response(err)),
		}
	}

	/// Send a notification to the language server.
	pub fn notify<N: Notification>(&self, params: N::Params) -> Result<()> {
		self.send_notification::<N>(params, None)
	}

	/// Send a notification and wait until it has been written.
	pub async fn notify_flushed<N: Notification>(&self, params: N::Params) -> Result<()> {
		let (tx, rx) = oneshot::channel();
		self.send_notification::<N>(params, Some(tx))?;
		rx.await.map_err(|_| Error::ServiceStopped)?
	}

	fn send_notification<N: Notification>(&self, params: N::Params, written: Option<oneshot::Sender<Result<()>>>) -> Result<()> {
		let notif = AnyNotification {
			method: N::METHOD.into(),
			params: serde_json::to_value(params)?,
		};
		self.outbound_tx
			.send(Outbound::Notify { notif, written })
			.map_err(|_| Error::ServiceStopped)
	}

	/// Performs the `initialize` request followed by `initialized`.
	pub async fn initialize(&self) -> Result<InitializeResult> {
		let root_uri = uri_from_path(&self.shared.config.root_path);
		#[allow(deprecated, reason = "root_path field deprecated but required by some servers")]
		let params = InitializeParams {
			process_id: Some(std::process::id()),
			root_path: self.shared.config.root_path.to_str().map(String::from),
			root_uri: root_uri.clone(),
			workspace_folders: root_uri.map(|uri| vec![workspace_folder_from_uri(uri)]),
			initialization_options: self.shared.config.initialization_options.clone(),
			capabilities: client_capabilities(),
			client_info: Some(ClientInfo {
				name: String::from("quill"),
				version: Some(String::from(env!("CARGO_PKG_VERSION"))),
			}),
			..Default::default()
		};

		let result = self.request::<lsp_types::request::Initialize>(params).await?;
		self.notify_flushed::<lsp_types::notification::Initialized>(lsp_types::InitializedParams {})
			.await?;
		self.shared.state_tx.send_replace(ServerState::Ready);
		self.client_output.append_line(&format!("{} is ready", self.shared.name));
		info!(server = %self.shared.name, "Language server initialized");
		Ok(result)
	}

	/// Runs the handshake once; later calls observe the first outcome.
	pub async fn wait_ready(&self) -> Result<()> {
		self.ready
			.get_or_init(|| async {
				let outcome = self.initialize().await.map(drop);
				if let Err(e) = &outcome {
					self.client_output.append_line(&format!("Initialization failed: {e}"));
				}
				outcome
			})
			.await
			.clone()
	}

	/// Notify the server that a document was opened.
	pub fn did_open(&self, document: &TextDocument) -> Result<()> {
		let uri = Uri::from_str(&document.uri).map_err(|_| Error::InvalidUri(document.uri.clone()))?;
		debug!(server = %self.shared.name, uri = %document.uri, "didOpen");
		self.notify::<lsp_types::notification::DidOpenTextDocument>(lsp_types::DidOpenTextDocumentParams {
			text_document: lsp_types::TextDocumentItem {
				uri,
				language_id: document.language_id.clone(),
				version: document.version,
				text: document.text.clone(),
			},
		})
	}

	/// Shutdown and exit the language server, then reap the process.
	pub async fn shutdown(&self) -> Result<()> {
		if self.state() == ServerState::Dead {
			return Ok(());
		}
		let result = match self.request::<lsp_types::request::Shutdown>(()).await {
			Ok(()) => self.notify_flushed::<lsp_types::notification::Exit>(()).await,
			Err(e) => Err(e),
		};

		let child = self.child.lock().take();
		if let Some(mut child) = child
			&& tokio::time::timeout(Duration::from_secs(5), child.wait()).await.is_err()
		{
			warn!(server = %self.shared.name, "Language server did not exit; killing it");
			let _ = child.kill().await;
		}
		result
	}
}

#[async_trait]
impl AnalysisClient for LanguageClient {
	async fn on_ready(&self) -> std::result::Result<(), BoxError> {
		self.wait_ready().await.map_err(Into::into)
	}

	fn on_notification(&self, method: &str, handler: NotificationHandler) -> HandlerId {
		let mut table = self.shared.handlers.lock();
		table.next_id += 1;
		let id = HandlerId(table.next_id);
		if !table.closed {
			table.entries.push((id, method.to_owned(), handler));
		}
		id
	}

	fn remove_notification_handler(&self, id: HandlerId) {
		self.shared.handlers.lock().entries.retain(|(entry, _, _)| *entry != id);
	}
}

/// Client capabilities advertised to the grammar server.
fn client_capabilities() -> ClientCapabilities {
	ClientCapabilities {
		workspace: Some(lsp_types::WorkspaceClientCapabilities {
			configuration: Some(true),
			workspace_folders: Some(true),
			..Default::default()
		}),
		text_document: Some(lsp_types::TextDocumentClientCapabilities {
			publish_diagnostics: Some(lsp_types::PublishDiagnosticsClientCapabilities {
				version_support: Some(true),
				..Default::default()
			}),
			code_action: Some(lsp_types::CodeActionClientCapabilities::default()),
			..Default::default()
		}),
		window: Some(lsp_types::WindowClientCapabilities {
			work_done_progress: Some(true),
			..Default::default()
		}),
		..Default::default()
	}
}

fn uri_from_path(path: &Path) -> Option<Uri> {
	let abs_path = path.canonicalize().or_else(|_| std::path::absolute(path)).ok()?;
	let url = url::Url::from_directory_path(abs_path).ok()?;
	Uri::from_str(url.as_str()).ok()
}

fn workspace_folder_from_uri(uri: Uri) -> WorkspaceFolder {
	let name = uri
		.as_str()
		.trim_end_matches('/')
		.rsplit('/')
		.next()
		.unwrap_or_default()
		.to_string();
	WorkspaceFolder { name, uri }
}
