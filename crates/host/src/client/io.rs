use std::collections::HashMap;
use std::sync::Arc;

use lsp_types::notification::{LogMessage, Notification as _, ShowMessage};
use lsp_types::request::{RegisterCapability, Request as _, UnregisterCapability, WorkDoneProgressCreate, WorkspaceConfiguration};
use quill_rpc::{AnyNotification, AnyRequest, AnyResponse, ErrorCode, JsonValue, Message, RequestId, ResponseError, read_message, write_message};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::{ServerState, Shared};
use crate::{Error, Result};

/// Outbound message envelope; the I/O task writes them in submission order.
pub(super) enum Outbound {
	Notify {
		notif: AnyNotification,
		written: Option<oneshot::Sender<Result<()>>>,
	},
	Request {
		request: AnyRequest,
		response_tx: oneshot::Sender<Result<AnyResponse>>,
	},
}

pub(super) type Pending = HashMap<RequestId, oneshot::Sender<Result<AnyResponse>>>;

/// Records an in-flight request, forgetting those whose callers gave up.
pub(super) fn track(pending: &mut Pending, id: RequestId, response_tx: oneshot::Sender<Result<AnyResponse>>) {
	pending.retain(|_, tx| !tx.is_closed());
	pending.insert(id, response_tx);
}

/// Runs the I/O loop for one server connection.
///
/// Reading happens on a separate task so that a partially read frame is never
/// dropped by `select!`.
pub(super) async fn run_client_io<R, W>(shared: Arc<Shared>, reader: R, mut writer: W, mut outbound_rx: mpsc::UnboundedReceiver<Outbound>)
where
	R: AsyncBufRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin,
{
	let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
	let reader_task = tokio::spawn(read_loop(shared.name.clone(), reader, inbound_tx));
	let mut pending = Pending::new();

	loop {
		tokio::select! {
			out = outbound_rx.recv() => {
				let Some(out) = out else {
					debug!(server = %shared.name, "Client dropped; stopping I/O loop");
					break;
				};
				if let Err(e) = write_outbound(&mut writer, out, &mut pending).await {
					error!(server = %shared.name, error = %e, "Outbound write failed; terminating I/O loop");
					break;
				}
			}
			inbound = inbound_rx.recv() => {
				let Some(msg) = inbound else {
					info!(server = %shared.name, "Language server closed connection");
					break;
				};
				if let Err(e) = handle_inbound(&shared, msg, &mut pending, &mut writer).await {
					error!(server = %shared.name, error = %e, "Reply write failed; terminating I/O loop");
					break;
				}
			}
		}
	}

	reader_task.abort();
	shared.state_tx.send_replace(ServerState::Dead);
	shared.close_handlers();

	for (_, tx) in pending {
		let _ = tx.send(Err(Error::ServiceStopped));
	}
	outbound_rx.close();
	while let Ok(out) = outbound_rx.try_recv() {
		match out {
			Outbound::Notify { written: Some(tx), .. } => {
				let _ = tx.send(Err(Error::ServiceStopped));
			}
			Outbound::Request { response_tx, .. } => {
				let _ = response_tx.send(Err(Error::ServiceStopped));
			}
			Outbound::Notify { written: None, .. } => {}
		}
	}
}

async fn read_loop<R: AsyncBufRead + Unpin>(name: String, mut reader: R, inbound_tx: mpsc::UnboundedSender<Message>) {
	loop {
		match read_message(&mut reader).await {
			Ok(Some(msg)) => {
				if inbound_tx.send(msg).is_err() {
					return;
				}
			}
			Ok(None) => return,
			// The frame was consumed, so the stream is still aligned.
			Err(quill_rpc::Error::Deserialize(e)) => {
				warn!(server = %name, error = %e, "Skipping undecodable message");
			}
			Err(e) => {
				error!(server = %name, error = %e, "Error reading from language server");
				return;
			}
		}
	}
}

async fn write_outbound(writer: &mut (impl AsyncWrite + Unpin), out: Outbound, pending: &mut Pending) -> Result<()> {
	match out {
		Outbound::Notify { notif, written } => {
			let r = write_message(writer, &Message::Notification(notif)).await.map_err(Error::from);
			if let Some(tx) = written {
				let _ = tx.send(r.clone());
			}
			r
		}
		Outbound::Request { request, response_tx } => {
			let id = request.id.clone();
			match write_message(writer, &Message::Request(request)).await {
				Ok(()) => {
					track(pending, id, response_tx);
					Ok(())
				}
				Err(e) => {
					let e = Error::from(e);
					let _ = response_tx.send(Err(e.clone()));
					Err(e)
				}
			}
		}
	}
}

async fn handle_inbound(shared: &Shared, msg: Message, pending: &mut Pending, writer: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
	match msg {
		Message::Response(resp) => {
			match pending.remove(&resp.id) {
				Some(tx) => {
					let _ = tx.send(Ok(resp));
				}
				None => warn!(server = %shared.name, id = %resp.id, "Response for unknown request"),
			}
			Ok(())
		}
		Message::Notification(notif) => {
			if (notif.method == LogMessage::METHOD || notif.method == ShowMessage::METHOD)
				&& let Some(text) = notif.params.get("message").and_then(JsonValue::as_str)
			{
				shared.server_output.append_line(text);
			}
			shared.dispatch(&notif.method, &notif.params);
			Ok(())
		}
		Message::Request(req) => {
			debug!(server = %shared.name, method = %req.method, id = %req.id, "Server request");
			let reply = answer_server_request(shared, req);
			write_message(writer, &Message::Response(reply)).await?;
			Ok(())
		}
	}
}

fn answer_server_request(shared: &Shared, req: AnyRequest) -> AnyResponse {
	match req.method.as_str() {
		m if m == WorkspaceConfiguration::METHOD => match serde_json::from_value::<lsp_types::ConfigurationParams>(req.params) {
			Ok(params) => {
				let values = params.items.iter().map(|item| shared.config.section(item.section.as_deref())).collect();
				AnyResponse::ok(req.id, JsonValue::Array(values))
			}
			Err(e) => AnyResponse::err(req.id, ResponseError::new(ErrorCode::INVALID_PARAMS, e)),
		},
		m if m == WorkDoneProgressCreate::METHOD || m == RegisterCapability::METHOD || m == UnregisterCapability::METHOD => {
			AnyResponse::ok(req.id, JsonValue::Null)
		}
		method => {
			warn!(server = %shared.name, method, "Unhandled server request");
			AnyResponse::err(req.id, ResponseError::new(ErrorCode::METHOD_NOT_FOUND, format!("unhandled method {method}")))
		}
	}
}
