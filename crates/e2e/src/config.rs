//! Configuration file and command line overrides.

use std::path::Path;

use quill_harness::{ConfigError, HarnessConfig};
use quill_host::ServerConfig;
use serde::Deserialize;

/// Contents of the TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
	/// Timings, extension id and activation language.
	pub harness: HarnessConfig,
	/// Language server command and settings.
	pub server: ServerConfig,
}

/// Values given on the command line, which win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub server_command: Option<String>,
	pub server_args: Vec<String>,
	pub extension_id: Option<String>,
}

impl FileConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.harness.validate()?;
		Ok(config)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}

	/// Applies command line values. Server arguments replace the file's list
	/// only when at least one was given.
	pub fn apply(mut self, overrides: Overrides) -> Self {
		if let Some(command) = overrides.server_command {
			self.server.command = command;
		}
		if !overrides.server_args.is_empty() {
			self.server.args = overrides.server_args;
		}
		if let Some(id) = overrides.extension_id {
			self.harness.extension_id = id;
		}
		self
	}
}
