//! Quill end-to-end runner.
//!
//! Builds a host around a real grammar language server, runs the built-in
//! scenarios and exits non-zero unless every one passed.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use quill_harness::scenario::builtin;
use quill_harness::{TracingSink, run_suite};
use quill_host::{ExtensionManifest, GrammarExtension, Host, ProcessLauncher};
use tracing::info;

use crate::config::{FileConfig, Overrides};

/// Runner command line arguments.
#[derive(Parser, Debug)]
#[command(name = "quill-e2e")]
#[command(about = "End-to-end checks for a grammar-checking editor extension")]
struct Args {
	/// TOML configuration file
	#[arg(short, long, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Language server command
	#[arg(long, value_name = "CMD")]
	server_command: Option<String>,

	/// Language server argument, repeatable
	#[arg(long = "server-arg", value_name = "ARG", allow_hyphen_values = true)]
	server_args: Vec<String>,

	/// Identifier of the extension under test
	#[arg(long, value_name = "ID")]
	extension_id: Option<String>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let file = match &args.config {
		Some(path) => FileConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => FileConfig::default(),
	};
	let FileConfig { harness, server } = file.apply(Overrides {
		server_command: args.server_command,
		server_args: args.server_args,
		extension_id: args.extension_id,
	});

	info!(server = %server.command, extension = %harness.extension_id, "starting quill-e2e");

	let host = Host::new();
	let manifest = ExtensionManifest::new(harness.extension_id.clone());
	host.register(GrammarExtension::new(manifest, server, Arc::new(ProcessLauncher::new())));

	let report = run_suite(host.as_ref(), host.clone(), harness, Arc::new(TracingSink), &builtin()).await;
	println!("{report}");

	host.shutdown().await;
	Ok(if report.all_passed() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	})
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("debug")
		} else {
			EnvFilter::new("info")
		}
	});

	// QUILL_LOG_DIR redirects logs to a per-process file.
	if let Some(log_dir) = std::env::var("QUILL_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("quill-e2e.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);
			tracing_subscriber::registry().with(filter).with(file_layer).init();
			tracing::info!(path = ?log_path, "quill-e2e tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
