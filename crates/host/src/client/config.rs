//! Configuration for the grammar language server.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Configuration for starting and talking to the language server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
	/// Command to spawn the language server.
	pub command: String,
	/// Arguments to pass to the command.
	pub args: Vec<String>,
	/// Environment variables to set.
	pub env: HashMap<String, String>,
	/// Root path for the workspace.
	pub root_path: PathBuf,
	/// Request timeout in seconds; zero waits forever.
	pub timeout_secs: u64,
	/// Sent verbatim as `initializationOptions`.
	pub initialization_options: Option<JsonValue>,
	/// Settings tree served to `workspace/configuration` requests.
	pub settings: JsonValue,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self::new("ltex-ls", ".")
	}
}

impl ServerConfig {
	/// Create a new server configuration.
	pub fn new(command: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
		Self {
			command: command.into(),
			args: Vec::new(),
			env: HashMap::new(),
			root_path: root_path.into(),
			timeout_secs: 30,
			initialization_options: None,
			settings: JsonValue::Object(Default::default()),
		}
	}

	/// Add command line arguments.
	pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	/// Add environment variables.
	pub fn env(mut self, env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
		self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
		self
	}

	/// Set request timeout.
	pub fn timeout(mut self, secs: u64) -> Self {
		self.timeout_secs = secs;
		self
	}

	/// Set the settings tree.
	pub fn settings(mut self, settings: JsonValue) -> Self {
		self.settings = settings;
		self
	}

	/// Per-request timeout.
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}

	/// Looks up a dotted settings `section` such as `ltex.language`.
	///
	/// `None` or an empty section returns the whole tree; unknown sections
	/// return `null`.
	pub fn section(&self, section: Option<&str>) -> JsonValue {
		let Some(section) = section.filter(|s| !s.is_empty()) else {
			return self.settings.clone();
		};
		section
			.split('.')
			.try_fold(&self.settings, |node, key| node.get(key))
			.cloned()
			.unwrap_or(JsonValue::Null)
	}
}
