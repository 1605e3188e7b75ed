//! In-process fakes of the host collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::BoxError;
use crate::document::SampleDocument;
use crate::host::{
	AnalysisClient, AppendListener, DocumentHost, ExtensionApi, ExtensionHandle, ExtensionRegistry, HandlerId, NotificationHandler,
	OutputChannel,
};

pub(crate) struct FakeExtension {
	active: AtomicBool,
	exports: Option<Arc<FakeApi>>,
}

impl FakeExtension {
	pub fn inactive() -> Self {
		Self {
			active: AtomicBool::new(false),
			exports: None,
		}
	}

	pub fn with_exports(api: Arc<FakeApi>) -> Self {
		Self {
			active: AtomicBool::new(false),
			exports: Some(api),
		}
	}

	pub fn activate(&self) {
		self.active.store(true, Ordering::SeqCst);
	}
}

impl ExtensionHandle for FakeExtension {
	fn id(&self) -> &str {
		"valentjn.vscode-ltex"
	}

	fn is_active(&self) -> bool {
		self.active.load(Ordering::SeqCst)
	}

	fn exports(&self) -> Option<Arc<dyn ExtensionApi>> {
		self.exports.clone().map(|api| api as Arc<dyn ExtensionApi>)
	}
}

#[derive(Default)]
pub(crate) struct FakeRegistry {
	pub extensions: HashMap<String, Arc<FakeExtension>>,
}

impl FakeRegistry {
	pub fn with(extension: Arc<FakeExtension>) -> Self {
		let mut extensions = HashMap::new();
		extensions.insert(extension.id().to_owned(), extension);
		Self { extensions }
	}
}

impl ExtensionRegistry for FakeRegistry {
	fn get_extension(&self, id: &str) -> Option<Arc<dyn ExtensionHandle>> {
		self.extensions.get(id).cloned().map(|ext| ext as Arc<dyn ExtensionHandle>)
	}
}

#[derive(Default)]
pub(crate) struct FakeApi {
	pub client: Option<Arc<FakeChannel>>,
	pub server: Option<Arc<FakeChannel>>,
	pub language_client: Option<Arc<FakeClient>>,
}

impl FakeApi {
	pub fn complete(client: Arc<FakeChannel>, server: Arc<FakeChannel>) -> Self {
		Self {
			client: Some(client),
			server: Some(server),
			language_client: Some(Arc::new(FakeClient::ready())),
		}
	}
}

impl ExtensionApi for FakeApi {
	fn client_output_channel(&self) -> Option<Arc<dyn OutputChannel>> {
		self.client.clone().map(|c| c as Arc<dyn OutputChannel>)
	}

	fn server_output_channel(&self) -> Option<Arc<dyn OutputChannel>> {
		self.server.clone().map(|c| c as Arc<dyn OutputChannel>)
	}

	fn language_client(&self) -> Option<Arc<dyn AnalysisClient>> {
		self.language_client.clone().map(|c| c as Arc<dyn AnalysisClient>)
	}
}

pub(crate) struct FakeChannel {
	name: String,
	inner: Mutex<(String, Vec<AppendListener>)>,
}

impl FakeChannel {
	pub fn new(name: &str) -> Self {
		Self {
			name: name.into(),
			inner: Mutex::new((String::new(), Vec::new())),
		}
	}

	pub fn append(&self, text: &str) {
		let listeners = {
			let mut inner = self.inner.lock();
			inner.0.push_str(text);
			inner.1.clone()
		};
		for listener in listeners {
			listener(text);
		}
	}
}

impl OutputChannel for FakeChannel {
	fn name(&self) -> &str {
		&self.name
	}

	fn contents(&self) -> String {
		self.inner.lock().0.clone()
	}

	fn on_append(&self, listener: AppendListener) {
		self.inner.lock().1.push(listener);
	}
}

pub(crate) enum ReadyBehavior {
	Ready,
	Failing(String),
	Never,
}

pub(crate) struct FakeClient {
	behavior: ReadyBehavior,
	ready_calls: AtomicUsize,
	next_id: AtomicU64,
	handlers: Mutex<HashMap<HandlerId, (String, NotificationHandler)>>,
}

impl FakeClient {
	fn with_behavior(behavior: ReadyBehavior) -> Self {
		Self {
			behavior,
			ready_calls: AtomicUsize::new(0),
			next_id: AtomicU64::new(1),
			handlers: Mutex::new(HashMap::new()),
		}
	}

	pub fn ready() -> Self {
		Self::with_behavior(ReadyBehavior::Ready)
	}

	pub fn failing(reason: &str) -> Self {
		Self::with_behavior(ReadyBehavior::Failing(reason.into()))
	}

	pub fn never_ready() -> Self {
		Self::with_behavior(ReadyBehavior::Never)
	}

	pub fn ready_calls(&self) -> usize {
		self.ready_calls.load(Ordering::SeqCst)
	}

	pub fn handler_count(&self) -> usize {
		self.handlers.lock().len()
	}

	/// Drops every handler, as a client does when its connection dies.
	pub fn disconnect(&self) {
		self.handlers.lock().clear();
	}

	/// Dispatches a notification to every handler registered for `method`.
	pub fn publish(&self, method: &str, params: JsonValue) {
		let handlers: Vec<NotificationHandler> = self
			.handlers
			.lock()
			.values()
			.filter(|(m, _)| m == method)
			.map(|(_, h)| h.clone())
			.collect();
		for handler in handlers {
			handler(&params);
		}
	}
}

#[async_trait]
impl AnalysisClient for FakeClient {
	async fn on_ready(&self) -> Result<(), BoxError> {
		self.ready_calls.fetch_add(1, Ordering::SeqCst);
		match &self.behavior {
			ReadyBehavior::Ready => Ok(()),
			ReadyBehavior::Failing(reason) => Err(reason.clone().into()),
			ReadyBehavior::Never => std::future::pending().await,
		}
	}

	fn on_notification(&self, method: &str, handler: NotificationHandler) -> HandlerId {
		let id = HandlerId(self.next_id.fetch_add(1, Ordering::SeqCst));
		self.handlers.lock().insert(id, (method.to_owned(), handler));
		id
	}

	fn remove_notification_handler(&self, id: HandlerId) {
		self.handlers.lock().remove(&id);
	}
}

type OpenHook = Arc<dyn Fn(&SampleDocument) + Send + Sync>;

#[derive(Default)]
pub(crate) struct FakeDocumentHost {
	next: AtomicU64,
	pub opened: Mutex<Vec<SampleDocument>>,
	on_open: Mutex<Option<OpenHook>>,
	reject: AtomicBool,
}

impl FakeDocumentHost {
	pub fn on_open(&self, hook: impl Fn(&SampleDocument) + Send + Sync + 'static) {
		*self.on_open.lock() = Some(Arc::new(hook));
	}

	pub fn reject_all(&self) {
		self.reject.store(true, Ordering::SeqCst);
	}
}

#[async_trait]
impl DocumentHost for FakeDocumentHost {
	async fn open_text_document(&self, language: &str, content: Option<&str>) -> Result<SampleDocument, BoxError> {
		if self.reject.load(Ordering::SeqCst) {
			return Err("workspace is read-only".into());
		}
		let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
		let document = SampleDocument {
			uri: format!("untitled:Untitled-{n}"),
			language: language.to_owned(),
			text: content.unwrap_or_default().to_owned(),
		};
		self.opened.lock().push(document.clone());
		let hook = self.on_open.lock().clone();
		if let Some(hook) = hook {
			hook(&document);
		}
		Ok(document)
	}
}

#[derive(Default)]
pub(crate) struct RecordingSink {
	fragments: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
	pub fn fragments_of(&self, channel: &str) -> Vec<String> {
		self.fragments
			.lock()
			.iter()
			.filter(|(c, _)| c == channel)
			.map(|(_, t)| t.clone())
			.collect()
	}

	pub fn text_of(&self, channel: &str) -> String {
		self.fragments_of(channel).concat()
	}
}

impl crate::relay::RelaySink for RecordingSink {
	fn emit(&self, channel: &str, text: &str) {
		self.fragments.lock().push((channel.to_owned(), text.to_owned()));
	}
}
