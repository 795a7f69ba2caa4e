//! Utility functions that don't have one place that they should live.

use crate::{
	exit_codes::{
		DISCOVERY_COULD_NOT_SEARCH, DISCOVERY_INTERRUPTED, INVALID_SUBNET, NO_INTERFACE_IN_SUBNET,
	},
	knobs::env::SUBNET,
};
use ads_discovery::{
	ads::{discovery::discover_devices_until, proto::RemotePlcInfo, subnet::ManagedSubnet},
	errors::{AdsScanError, NetworkError},
};
use miette::{miette, Report};
use std::fmt::Display;
use tokio::time::Duration;
use tracing::{error, field::valuable, warn};

/// Add context to a specific error, where you can have like a list of
/// suggestions.
///
/// NOTE: we cannot reassign a reports severity, so your last items severity
///       is where the real severity gets taken.
pub fn add_context_to(
	original_error: Report,
	suggestions: impl DoubleEndedIterator<Item = Report>,
) -> Report {
	let mut latest_error: Option<Report> = None;

	for suggestion in suggestions.rev() {
		if let Some(last_error) = latest_error {
			latest_error = Some(last_error.wrap_err(suggestion));
		} else {
			latest_error = Some(suggestion);
		}
	}

	if let Some(latest) = latest_error {
		latest.wrap_err(original_error)
	} else {
		original_error
	}
}

/// Pad (or truncate with `...`) a value so table columns line up.
pub fn get_padded_string(ty: impl Display, max_length: usize) -> String {
	let as_display = format!("{ty}");
	let length = as_display.chars().count();
	if length > max_length {
		let mut to_return = as_display
			.chars()
			.take(max_length.saturating_sub(3))
			.collect::<String>();
		to_return.push_str("...");
		to_return
	} else {
		let mut to_return = as_display;
		to_return.extend(std::iter::repeat(' ').take(max_length - length));
		to_return
	}
}

/// Figure out which subnet to scan: the cli argument, then the environment,
/// then the default.
///
/// ## Panics
///
/// If the subnet that was passed in can't be parsed.
pub fn resolve_subnet(cli_arg: Option<&str>, use_json: bool) -> ManagedSubnet {
	let (source, text) = if let Some(value) = cli_arg {
		("--subnet", value.to_owned())
	} else if let Some(value) = SUBNET.as_ref() {
		("ADSSCAN_SUBNET", value.clone())
	} else {
		return ManagedSubnet::DEFAULT;
	};

	match text.parse::<ManagedSubnet>() {
		Ok(subnet) => subnet,
		Err(cause) => {
			if use_json {
				error!(
					id = "adsscan::cli::invalid_subnet",
					?cause,
					subnet = text,
					source,
					"could not parse subnet",
				);
			} else {
				error!(
					"\n{:?}",
					miette!(
						help = format!("The subnet came from: {source}"),
						"Could not parse the subnet to scan!",
					)
					.wrap_err(cause),
				);
			}
			std::process::exit(INVALID_SUBNET);
		}
	}
}

/// Run a discovery session that stops early on Ctrl-C, exiting the process on
/// any failure.
///
/// ## Panics
///
/// If the session could not run, or failed part way through.
pub async fn discover_or_exit(
	subnet: &ManagedSubnet,
	listen_for: Duration,
	use_json: bool,
) -> Vec<RemotePlcInfo> {
	let cancel = async {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!(id = "adsscan::discovery::cancelled", "Ctrl-C pressed, stopping the search early.");
		} else {
			// Without a signal handler we can never be cancelled.
			std::future::pending::<()>().await;
		}
	};

	match discover_devices_until(subnet, listen_for, cancel).await {
		Ok(devices) => devices,
		Err(cause) => report_discovery_failure(subnet, cause, use_json),
	}
}

fn report_discovery_failure(subnet: &ManagedSubnet, cause: AdsScanError, use_json: bool) -> ! {
	let exit_code = match &cause {
		AdsScanError::NetworkError(NetworkError::NoInterfaceInSubnet(_)) => NO_INTERFACE_IN_SUBNET,
		AdsScanError::DiscoveryInterrupted { .. } => DISCOVERY_INTERRUPTED,
		_ => DISCOVERY_COULD_NOT_SEARCH,
	};

	if let AdsScanError::DiscoveryInterrupted { collected, .. } = &cause {
		for device in collected {
			if use_json {
				warn!(
					id = "adsscan::discovery::partial_result",
					device = valuable(device),
					"Found a device before the search failed",
				);
			} else {
				warn!("found before the search failed: {device}");
			}
		}
	}

	if use_json {
		error!(
			id = "adsscan::discovery::failed",
			?cause,
			%subnet,
			suggestions = valuable(&[
				"Make sure this machine has an address inside of the subnet you're scanning.",
				"Make sure nothing else is stopping us from sending UDP broadcasts, like a firewall.",
			]),
			"Could not search the subnet for ADS devices",
		);
	} else {
		error!(
			"\n{:?}",
			add_context_to(
				miette!("Could not search {subnet} for ADS devices.").wrap_err(cause),
				[
					miette!("Make sure this machine has an address inside of the subnet you're scanning, or pass `--subnet`."),
					miette!("Make sure nothing else is stopping us from sending UDP broadcasts, like a firewall."),
				]
				.into_iter(),
			),
		);
	}

	std::process::exit(exit_code);
}
