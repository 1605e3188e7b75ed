//! `Content-Length` framed message I/O.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::message::Message;
use crate::{Error, Result};

const CONTENT_LENGTH: &str = "content-length";

/// Reads one framed message.
///
/// Returns `Ok(None)` on a clean EOF before any header byte. Header names are
/// matched case-insensitively and unknown headers (e.g. `Content-Type`) are
/// skipped.
pub async fn read_message(reader: &mut (impl AsyncBufRead + Unpin)) -> Result<Option<Message>> {
	let mut content_length: Option<usize> = None;
	let mut line = String::new();
	let mut first = true;

	loop {
		line.clear();
		let read = reader.read_line(&mut line).await?;
		if read == 0 {
			if first {
				return Ok(None);
			}
			return Err(Error::Eof);
		}
		first = false;

		let header = line.trim_end_matches(['\r', '\n']);
		if header.is_empty() {
			if content_length.is_none() {
				// Tolerate stray blank lines between messages.
				first = true;
				continue;
			}
			break;
		}

		let Some((name, value)) = header.split_once(':') else {
			return Err(Error::Protocol(format!("malformed header line: {header:?}")));
		};
		if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
			let len = value
				.trim()
				.parse()
				.map_err(|_| Error::Protocol(format!("invalid Content-Length: {:?}", value.trim())))?;
			content_length = Some(len);
		}
	}

	let length = content_length.ok_or_else(|| Error::Protocol("missing Content-Length".into()))?;
	let mut body = vec![0u8; length];
	reader.read_exact(&mut body).await?;

	let value = serde_json::from_slice(&body)?;
	let msg = Message::from_value(value)?;
	tracing::trace!(target: "rpc", method = msg.method(), bytes = length, "read message");
	Ok(Some(msg))
}

/// Writes one framed message and flushes the stream.
pub async fn write_message(writer: &mut (impl AsyncWrite + Unpin), msg: &Message) -> Result<()> {
	let json = serde_json::to_string(&msg.to_value()?)?;
	let frame = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
	writer.write_all(frame.as_bytes()).await?;
	writer.flush().await?;
	tracing::trace!(target: "rpc", method = msg.method(), bytes = json.len(), "wrote message");
	Ok(())
}
