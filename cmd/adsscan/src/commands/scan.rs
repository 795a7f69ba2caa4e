//! Handling the `scan` command, searching the subnet for ADS devices.

use crate::utils::{add_context_to, discover_or_exit, get_padded_string, resolve_subnet};
use ads_discovery::ads::{proto::RemotePlcInfo, subnet::ManagedSubnet};
use miette::miette;
use terminal_size::{terminal_size, Width as TermWidth};
use tokio::time::Duration;
use tracing::{field::valuable, info, warn};

const TABLE_TRACING_ID: &str = "adsscan::scan::table_output_line";
const TABLE_HEADER: &str =      "IP Address      | AMS Net Id            | Name                 | OS                             | TwinCAT      | Runtime | Hostname             | Comment";
const TABLE_HEADER_LINE: &str = "---------------------------------------------------------------------------------------------------------------------------------------------------------------";
const TABLE_WIDTH: u16 = 160;

/// Handle the actual `scan` command.
pub async fn handle_scan(use_json: bool, output_as_table: bool, subnet: Option<String>, timeout_ms: u64) {
	let subnet = resolve_subnet(subnet.as_deref(), use_json);
	let devices = discover_or_exit(&subnet, Duration::from_millis(timeout_ms), use_json).await;

	if devices.is_empty() {
		print_no_device_found_warning(use_json, &subnet, timeout_ms);
		return;
	}

	if output_as_table {
		if let Some((TermWidth(characters_wide), _)) = terminal_size() {
			if characters_wide < TABLE_WIDTH {
				warn!(
					id = "adsscan::scan::terminal_may_be_small",
					width.expected = TABLE_WIDTH,
					width.was = characters_wide,
					"!!! HEY! Your terminal width seems to be smaller than 160 characters! The table renders at ~160 characters, so we recommend making you terminal wider to see the table best !!!",
				);
			}
		}

		if use_json {
			info!(id = TABLE_TRACING_ID, line = TABLE_HEADER);
			info!(id = TABLE_TRACING_ID, line = TABLE_HEADER_LINE);
		} else {
			println!("{TABLE_HEADER}");
			println!("{TABLE_HEADER_LINE}");
		}
	}

	for device in &devices {
		print_device(device, use_json, output_as_table);
	}
}

fn print_device(device: &RemotePlcInfo, use_json: bool, use_table: bool) {
	if use_table {
		let line = table_line(device);
		if use_json {
			info!(id = TABLE_TRACING_ID, line, device = valuable(device));
		} else {
			println!("{line}");
		}
	} else if use_json {
		info!(
			id = "adsscan::scan::discovered_device",
			device = valuable(device),
			"Found an ADS device on the network",
		);
	} else {
		info!(
			device.address = %device.address(),
			device.ams_net_id = device.ams_net_id_string(),
			device.name = device.name(),
			device.os_version = device.os_version(),
			device.tc_version = %device.tc_version(),
			device.runtime = %device.runtime_status(),
			device.hostname = device.hostname(),
			device.comment = device.comment(),
			"Found an ADS device on the network!",
		);
	}
}

fn table_line(device: &RemotePlcInfo) -> String {
	let address = get_padded_string(device.address(), 15);
	let ams_net_id = get_padded_string(device.ams_net_id_string(), 21);
	let name = get_padded_string(device.name(), 20);
	let os = get_padded_string(device.os_version(), 30);
	let tc_version = get_padded_string(
		if device.tc_version().is_unknown() {
			String::new()
		} else {
			device.tc_version().to_string()
		},
		12,
	);
	let runtime = get_padded_string(device.runtime_status(), 7);
	let hostname = get_padded_string(device.hostname(), 20);

	format!(
		"{address} | {ams_net_id} | {name} | {os} | {tc_version} | {runtime} | {hostname} | {}",
		device.comment(),
	)
}

fn print_no_device_found_warning(use_json: bool, subnet: &ManagedSubnet, timeout_ms: u64) {
	if use_json {
		warn!(
			id = "adsscan::scan::failed_to_find_any_device",
			%subnet,
			suggestions = valuable(&[
				"Please ensure the controllers are powered on, and running.".to_owned(),
				"Make sure you are on the same Local Network, Subnet, and VLAN as the controllers.".to_owned(),
				format!("We only listened for {timeout_ms}ms, you can listen for longer with `--timeout-ms`."),
			]),
			"Could not find any ADS devices while broadcasting",
		);
	} else {
		warn!(
			"\n{:?}",
			add_context_to(
				miette!("Could not find any ADS devices on {subnet}."),
				[
					miette!("Please ensure the controllers are powered on, and running."),
					miette!("Make sure you are on the same Local Network, Subnet, and VLAN as the controllers."),
					miette!("We only listened for {timeout_ms}ms, you can listen for longer with `--timeout-ms`."),
				]
				.into_iter(),
			),
		);
	}
}

#[cfg(test)]
mod unit_tests {
	use super::*;
	use std::net::Ipv4Addr;

	#[test]
	pub fn table_lines_line_up_with_the_header() {
		let device = RemotePlcInfo::empty(Ipv4Addr::new(172, 17, 76, 10));
		let line = table_line(&device);
		let header_columns = TABLE_HEADER.match_indices('|').map(|(idx, _)| idx).collect::<Vec<_>>();
		let line_columns = line.match_indices('|').map(|(idx, _)| idx).collect::<Vec<_>>();
		assert_eq!(header_columns, line_columns);
		assert!(line.starts_with("172.17.76.10 "));
	}
}
