#![doc = include_str!("../README.md")]

use miette::{miette, Context, IntoDiagnostic, Result};
use once_cell::sync::OnceCell;
use std::{env::var as env_var, net::SocketAddr};
use tracing::debug;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
	fmt::layer as tracing_fmt_layer, prelude::*, registry as subscriber_registry, EnvFilter,
};

/// The environment variable that overrides the default log filter.
pub const LOGGING_ENV_NAME: &str = "ADSSCAN_LOGGING";
/// The environment variable that turns on `tokio-console`.
pub const TOKIO_CONSOLE_ENV_NAME: &str = "ADSSCAN_TOKIO_CONSOLE_ADDR";

/// Set once logging has been installed.
static LOGGING_INSTALLED: OnceCell<()> = OnceCell::new();

/// Determine if our logger will use ANSI escape codes.
///
/// This mirrors the check `tracing-subscriber` itself does:
/// <https://github.com/tokio-rs/tracing/blob/07b490067c0e2af61f48a3d2afb85a20ab70ba95/tracing-subscriber/src/fmt/fmt_subscriber.rs#L697>
#[must_use]
pub fn will_ansi() -> bool {
	env_var("NO_COLOR").map_or(true, |v| v.is_empty())
}

/// The filter directive to use when `RUST_LOG` isn't set.
///
/// tokio-console needs the runtime traced, so it bumps those targets up.
fn default_filter_directive(explicit_level: Option<String>, console_enabled: bool) -> String {
	if let Some(level) = explicit_level {
		level
	} else if console_enabled {
		"info,tokio=trace,runtime=trace".to_owned()
	} else {
		"info".to_owned()
	}
}

/// Install all the logging configuration needed for an application.
///
/// This should only ever be called as the very first part of `main`, and
/// nowhere else. If you try to call it again, you'll just get an error.
///
/// See the tracing docs for logging for more information:
/// <https://docs.rs/tracing/latest/tracing/#shorthand-macros>
///
/// # Errors
///
/// - If logging has already been installed.
/// - If the log filter can't be parsed.
/// - If the tokio-console address can't be parsed.
pub fn install_logging_handlers(use_json: bool) -> Result<()> {
	if LOGGING_INSTALLED.set(()).is_err() {
		return Err(miette!("Logging has already been initialized!"));
	}
	let explicit_level = env_var(LOGGING_ENV_NAME).ok();
	let console_address = env_var(TOKIO_CONSOLE_ENV_NAME).ok();

	let filter_layer = EnvFilter::try_from_default_env().or_else(|_| {
		EnvFilter::try_new(default_filter_directive(
			explicit_level,
			console_address.is_some(),
		))
		.into_diagnostic()
		.wrap_err_with(|| format!("Failed to parse `{LOGGING_ENV_NAME}` as a log filter!"))
	})?;
	let registry = subscriber_registry().with(filter_layer);

	if let Some(addr) = console_address.as_ref() {
		let console_uri = addr
			.parse::<SocketAddr>()
			.into_diagnostic()
			.wrap_err_with(|| format!("Failed to parse `{TOKIO_CONSOLE_ENV_NAME}` as an address to listen on!"))?;

		if use_json {
			registry
				.with(tracing_fmt_layer().with_target(false).json())
				.with(ErrorLayer::default())
				.with(
					console_subscriber::ConsoleLayer::builder()
						.enable_self_trace(true)
						.server_addr(console_uri)
						.spawn(),
				)
				.init();
		} else {
			registry
				.with(tracing_fmt_layer().with_target(true).with_ansi(will_ansi()))
				.with(ErrorLayer::default())
				.with(
					console_subscriber::ConsoleLayer::builder()
						.enable_self_trace(true)
						.server_addr(console_uri)
						.spawn(),
				)
				.init();
		}
	} else if use_json {
		registry
			.with(tracing_fmt_layer().with_target(true).json())
			.with(ErrorLayer::default())
			.init();
	} else {
		registry
			.with(tracing_fmt_layer().with_target(true).with_ansi(will_ansi()))
			.with(ErrorLayer::default())
			.init();
	}

	debug!(
		console_enabled = console_address.is_some(),
		"tokio-console-status"
	);
	Ok(())
}
