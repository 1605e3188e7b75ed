use std::sync::Arc;

use parking_lot::Mutex;
use quill_harness::host::{AppendListener, OutputChannel};

/// Append-only text log shown to the user as an output channel.
pub struct LogChannel {
	name: String,
	inner: Mutex<ChannelState>,
}

#[derive(Default)]
struct ChannelState {
	contents: String,
	listeners: Vec<AppendListener>,
}

impl std::fmt::Debug for LogChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("LogChannel")
			.field("name", &self.name)
			.field("len", &inner.contents.len())
			.field("listeners", &inner.listeners.len())
			.finish()
	}
}

impl LogChannel {
	/// Creates an empty channel.
	pub fn new(name: impl Into<String>) -> Arc<Self> {
		Arc::new(Self {
			name: name.into(),
			inner: Mutex::new(ChannelState::default()),
		})
	}

	/// Appends `text` and notifies listeners registered so far.
	///
	/// Listeners run outside the lock, so a listener may append itself.
	pub fn append(&self, text: &str) {
		if text.is_empty() {
			return;
		}
		let listeners = {
			let mut inner = self.inner.lock();
			inner.contents.push_str(text);
			inner.listeners.clone()
		};
		for listener in listeners {
			listener(text);
		}
	}

	/// Appends `line` followed by a newline.
	pub fn append_line(&self, line: &str) {
		self.append(&format!("{line}\n"));
	}
}

impl OutputChannel for LogChannel {
	fn name(&self) -> &str {
		&self.name
	}

	fn contents(&self) -> String {
		self.inner.lock().contents.clone()
	}

	fn on_append(&self, listener: AppendListener) {
		self.inner.lock().listeners.push(listener);
	}

	fn replay_and_subscribe(&self, replay: &mut dyn FnMut(&str), listener: AppendListener) {
		let mut inner = self.inner.lock();
		replay(&inner.contents);
		inner.listeners.push(listener);
	}
}
