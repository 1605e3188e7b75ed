//! In-process fake grammar server and fixtures for host integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lsp_types::{DiagnosticSeverity, PublishDiagnosticsParams, Uri};
use parking_lot::Mutex;
use quill_harness::{HarnessConfig, RelaySink};
use quill_host::{Error, ExtensionManifest, GrammarExtension, Host, ServerConfig, ServerIo, ServerLauncher};
use quill_rpc::{AnyNotification, AnyRequest, AnyResponse, JsonValue, Message, RequestId, read_message, write_message};
use serde_json::json;
use tokio::io::{AsyncWrite, BufReader, DuplexStream};

/// Source label the fake server puts on article diagnostics.
pub const EN_A_VS_AN: &str = "LTeX - EN_A_VS_AN";

/// How the fake server reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
	/// Analyzes every opened document once.
	Conforming,
	/// Publishes an empty diagnostic set before the real one.
	NoisyFirst,
	/// Completes the handshake but never publishes diagnostics.
	Silent,
	/// Closes the connection when asked to initialize.
	CrashOnInitialize,
	/// Closes the connection on the first document with text in it.
	CrashOnFirstCheck,
}

/// What the fake server observed.
#[derive(Debug, Default)]
pub struct ServerLog {
	/// Results of the server's `workspace/configuration` requests.
	pub config_replies: Mutex<Vec<JsonValue>>,
	/// URIs received with `didOpen`, in order.
	pub opened: Mutex<Vec<String>>,
	/// Whether `exit` arrived.
	pub exited: Mutex<bool>,
}

/// Launcher connecting the client to a fake server over an in-memory pipe.
pub struct DuplexLauncher {
	behavior: Behavior,
	launches: AtomicUsize,
	log: Arc<ServerLog>,
}

impl DuplexLauncher {
	pub fn new(behavior: Behavior) -> Self {
		Self {
			behavior,
			launches: AtomicUsize::new(0),
			log: Arc::new(ServerLog::default()),
		}
	}

	pub fn log(&self) -> Arc<ServerLog> {
		self.log.clone()
	}

	pub fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}
}

impl ServerLauncher for DuplexLauncher {
	fn launch(&self, _config: &ServerConfig) -> quill_host::Result<ServerIo> {
		self.launches.fetch_add(1, Ordering::SeqCst);
		let (client_side, server_side) = tokio::io::duplex(1 << 16);
		let (reader, writer) = tokio::io::split(client_side);
		tokio::spawn(serve(server_side, self.behavior, self.log.clone()));
		Ok(ServerIo::from_streams(reader, writer))
	}
}

/// Launcher whose command never starts.
pub struct MissingBinaryLauncher;

impl ServerLauncher for MissingBinaryLauncher {
	fn launch(&self, config: &ServerConfig) -> quill_host::Result<ServerIo> {
		Err(Error::ServerSpawn {
			server: config.command.clone(),
			reason: "No such file or directory (os error 2)".into(),
		})
	}
}

async fn serve(stream: DuplexStream, behavior: Behavior, log: Arc<ServerLog>) {
	let (read, mut write) = tokio::io::split(stream);
	let mut reader = BufReader::new(read);
	let mut next_id = 1000;

	while let Ok(Some(msg)) = read_message(&mut reader).await {
		match msg {
			Message::Request(req) if req.method == "initialize" => {
				if behavior == Behavior::CrashOnInitialize {
					return;
				}
				reply(&mut write, &req, json!({"capabilities": {"textDocumentSync": 1}, "serverInfo": {"name": "fake-ltex"}})).await;
			}
			Message::Request(req) if req.method == "shutdown" => reply(&mut write, &req, JsonValue::Null).await,
			Message::Request(req) => {
				let error = quill_rpc::ResponseError::new(quill_rpc::ErrorCode::METHOD_NOT_FOUND, &req.method);
				send(&mut write, Message::Response(AnyResponse::err(req.id, error))).await;
			}
			Message::Notification(n) if n.method == "initialized" => {
				notify(&mut write, "window/logMessage", json!({"type": 3, "message": "fake-ltex initialized"})).await;
				send(
					&mut write,
					Message::Request(AnyRequest {
						id: RequestId::Number(next_id),
						method: "workspace/configuration".into(),
						params: json!({"items": [{"section": "ltex"}]}),
					}),
				)
				.await;
				next_id += 1;
			}
			Message::Notification(n) if n.method == "textDocument/didOpen" => {
				let item = &n.params["textDocument"];
				let uri = item["uri"].as_str().unwrap_or_default().to_owned();
				let text = item["text"].as_str().unwrap_or_default();
				log.opened.lock().push(uri.clone());
				match behavior {
					Behavior::CrashOnFirstCheck if !text.is_empty() => return,
					Behavior::Silent | Behavior::CrashOnInitialize | Behavior::CrashOnFirstCheck => {}
					Behavior::NoisyFirst => {
						publish(&mut write, &uri, Vec::new()).await;
						publish(&mut write, &uri, check_articles(text)).await;
					}
					Behavior::Conforming => publish(&mut write, &uri, check_articles(text)).await,
				}
			}
			Message::Notification(n) if n.method == "exit" => {
				*log.exited.lock() = true;
				return;
			}
			Message::Notification(_) => {}
			Message::Response(resp) => log.config_replies.lock().push(resp.result.unwrap_or_default()),
		}
	}
}

/// Flags "an" before a word starting with a consonant. Markup characters and
/// LaTeX command names are skipped.
pub fn check_articles(text: &str) -> Vec<lsp_types::Diagnostic> {
	let words: Vec<&str> = text
		.split(|c: char| c.is_whitespace() || "*_{}.,;:!?".contains(c))
		.filter(|w| !w.is_empty() && !w.starts_with('\\'))
		.collect();
	words
		.windows(2)
		.filter(|pair| pair[0].eq_ignore_ascii_case("an") && !pair[1].starts_with(|c: char| "aeiouAEIOU".contains(c)))
		.map(|pair| lsp_types::Diagnostic {
			severity: Some(DiagnosticSeverity::INFORMATION),
			source: Some(EN_A_VS_AN.into()),
			message: format!("Use 'a' instead of 'an' if the following word doesn't start with a vowel sound, e.g. 'a {}'", pair[1]),
			..Default::default()
		})
		.collect()
}

async fn publish(write: &mut (impl AsyncWrite + Unpin), uri: &str, diagnostics: Vec<lsp_types::Diagnostic>) {
	let Ok(uri) = uri.parse::<Uri>() else {
		return;
	};
	let params = PublishDiagnosticsParams {
		uri,
		diagnostics,
		version: Some(1),
	};
	notify(write, "textDocument/publishDiagnostics", serde_json::to_value(params).unwrap()).await;
}

async fn reply(write: &mut (impl AsyncWrite + Unpin), req: &AnyRequest, result: JsonValue) {
	send(write, Message::Response(AnyResponse::ok(req.id.clone(), result))).await;
}

async fn notify(write: &mut (impl AsyncWrite + Unpin), method: &str, params: JsonValue) {
	send(
		write,
		Message::Notification(AnyNotification {
			method: method.into(),
			params,
		}),
	)
	.await;
}

async fn send(write: &mut (impl AsyncWrite + Unpin), msg: Message) {
	let _ = write_message(write, &msg).await;
}

/// Sink recording every relayed fragment.
#[derive(Debug, Default)]
pub struct RecordingSink {
	fragments: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
	/// Concatenated text relayed for `channel`.
	pub fn text_of(&self, channel: &str) -> String {
		self.fragments
			.lock()
			.iter()
			.filter(|(c, _)| c == channel)
			.map(|(_, t)| t.as_str())
			.collect()
	}
}

impl RelaySink for RecordingSink {
	fn emit(&self, channel: &str, text: &str) {
		self.fragments.lock().push((channel.to_owned(), text.to_owned()));
	}
}

/// Host with one LTeX-like extension backed by `launcher`.
pub fn host_with(launcher: Arc<dyn ServerLauncher>) -> Arc<Host> {
	let _ = tracing_subscriber::fmt::try_init();
	let config = ServerConfig::new("fake-ltex", ".")
		.timeout(5)
		.settings(json!({"ltex": {"language": "en-US"}}));
	let host = Host::new();
	host.register(GrammarExtension::new(ExtensionManifest::default(), config, launcher));
	host
}

/// Harness configuration with short bounds for real-time tests.
pub fn harness_config() -> HarnessConfig {
	let mut config = HarnessConfig::default().timeouts(Duration::from_secs(5));
	config.poll_interval_ms = 10;
	config
}

/// Polls a condition with a timeout.
pub async fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
	let start = std::time::Instant::now();
	while start.elapsed() < timeout {
		if f() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	false
}
