//! Harness configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of the grammar-checking extension exercised by default.
pub const DEFAULT_EXTENSION_ID: &str = "valentjn.vscode-ltex";

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The file could not be read.
	#[error("failed to read {path}: {source}")]
	Read {
		/// Path of the file.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: std::io::Error,
	},
	/// The file is not valid TOML or has unknown keys.
	#[error("failed to parse configuration: {0}")]
	Parse(#[from] toml::de::Error),
	/// A value parsed but is out of range.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

/// Timings and identifiers for one suite run.
///
/// A zero timeout disables the corresponding bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
	/// Identifier the extension is looked up by.
	pub extension_id: String,
	/// Language of an empty document opened before waiting, to trigger
	/// language-based activation. `None` skips the warm-up document.
	pub activation_language: Option<String>,
	/// Delay between activation polls, in milliseconds.
	pub poll_interval_ms: u64,
	/// Bound on activation, in milliseconds.
	pub activation_timeout_ms: u64,
	/// Bound on language client readiness, in milliseconds.
	pub readiness_timeout_ms: u64,
	/// Bound on each scenario's notification wait, in milliseconds.
	pub notification_timeout_ms: u64,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			extension_id: DEFAULT_EXTENSION_ID.into(),
			activation_language: Some("markdown".into()),
			poll_interval_ms: 200,
			activation_timeout_ms: 60_000,
			readiness_timeout_ms: 60_000,
			notification_timeout_ms: 60_000,
		}
	}
}

impl HarnessConfig {
	/// Parses a configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects values the waits cannot work with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.poll_interval_ms == 0 {
			return Err(ConfigError::Invalid("poll_interval_ms must be at least 1".into()));
		}
		Ok(())
	}

	/// Reads and parses a TOML configuration file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}

	/// Set the extension identifier.
	pub fn extension_id(mut self, id: impl Into<String>) -> Self {
		self.extension_id = id.into();
		self
	}

	/// Set the warm-up document language.
	pub fn activation_language(mut self, language: Option<String>) -> Self {
		self.activation_language = language;
		self
	}

	/// Set all three wait bounds at once.
	pub fn timeouts(mut self, limit: Duration) -> Self {
		let ms = limit.as_millis().try_into().unwrap_or(u64::MAX);
		self.activation_timeout_ms = ms;
		self.readiness_timeout_ms = ms;
		self.notification_timeout_ms = ms;
		self
	}

	/// Delay between activation polls.
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	/// Bound on activation.
	pub fn activation_timeout(&self) -> Duration {
		Duration::from_millis(self.activation_timeout_ms)
	}

	/// Bound on readiness.
	pub fn readiness_timeout(&self) -> Duration {
		Duration::from_millis(self.readiness_timeout_ms)
	}

	/// Bound on each notification wait.
	pub fn notification_timeout(&self) -> Duration {
		Duration::from_millis(self.notification_timeout_ms)
	}
}
