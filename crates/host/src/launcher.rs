//! Language server launcher abstraction for production and testing.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, error};

use crate::channel::LogChannel;
use crate::client::ServerConfig;
use crate::{Error, Result};

/// Byte streams connecting the client to a server.
pub struct ServerIo {
	/// Server output (its stdout).
	pub reader: Box<dyn AsyncRead + Send + Unpin>,
	/// Server input (its stdin).
	pub writer: Box<dyn AsyncWrite + Send + Unpin>,
	/// Diagnostic output, forwarded to the server log channel.
	pub stderr: Option<Box<dyn AsyncRead + Send + Unpin>>,
	/// The server process, reaped on shutdown.
	pub child: Option<Child>,
}

impl ServerIo {
	/// Streams without a process, e.g. one end of an in-memory pipe.
	pub fn from_streams(reader: impl AsyncRead + Send + Unpin + 'static, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
		Self {
			reader: Box::new(reader),
			writer: Box::new(writer),
			stderr: None,
			child: None,
		}
	}
}

impl std::fmt::Debug for ServerIo {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServerIo")
			.field("stderr", &self.stderr.is_some())
			.field("child", &self.child)
			.finish_non_exhaustive()
	}
}

/// Obtains a connection to a language server.
///
/// Production uses [`ProcessLauncher`]; tests hand out in-process fakes.
pub trait ServerLauncher: Send + Sync + 'static {
	/// Launches the server described by `config`.
	fn launch(&self, config: &ServerConfig) -> Result<ServerIo>;
}

/// Production launcher that spawns the configured command.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
	/// Create a new process launcher.
	#[must_use]
	pub fn new() -> Self {
		Self
	}
}

impl ServerLauncher for ProcessLauncher {
	fn launch(&self, config: &ServerConfig) -> Result<ServerIo> {
		let spawn_error = |reason: String| Error::ServerSpawn {
			server: config.command.clone(),
			reason,
		};

		let mut child = Command::new(&config.command)
			.args(&config.args)
			.envs(&config.env)
			.current_dir(&config.root_path)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| {
				error!(command = %config.command, error = %e, "Failed to spawn language server");
				spawn_error(e.to_string())
			})?;
		debug!(command = %config.command, pid = child.id(), "Spawned language server");

		let stdin = child.stdin.take().ok_or_else(|| spawn_error("failed to capture stdin".into()))?;
		let stdout = child.stdout.take().ok_or_else(|| spawn_error("failed to capture stdout".into()))?;
		let stderr = child.stderr.take().map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>);

		Ok(ServerIo {
			reader: Box::new(stdout),
			writer: Box::new(stdin),
			stderr,
			child: Some(child),
		})
	}
}

/// Appends every line read from `stream` to `channel` until EOF.
pub(crate) async fn pump_lines(stream: Box<dyn AsyncRead + Send + Unpin>, channel: Arc<LogChannel>) {
	let mut lines = BufReader::new(stream).lines();
	loop {
		match lines.next_line().await {
			Ok(Some(line)) => channel.append_line(&line),
			Ok(None) => return,
			Err(e) => {
				debug!(error = %e, "Stopped reading server stderr");
				return;
			}
		}
	}
}
