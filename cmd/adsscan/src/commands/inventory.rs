//! Handling the `inventory` command, searching and then probing a subnet.

use crate::{
	exit_codes::INVENTORY_PROBE_FAILURE,
	utils::{add_context_to, discover_or_exit, get_padded_string, resolve_subnet},
};
use ads_discovery::inventory::{Inventory, InventoryRecord, NoProbe};
use miette::miette;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, field::valuable, info};

const TABLE_HEADER: &str =      "IP Address      | Up  | MAC Address       | Hostname             | AMS Net Id            | OS                             | TwinCAT      | Runtime";
const TABLE_HEADER_LINE: &str = "-------------------------------------------------------------------------------------------------------------------------------------------------";

/// Handle the actual `inventory` command.
pub async fn handle_inventory(
	use_json: bool,
	concurrency: usize,
	show_all: bool,
	subnet: Option<String>,
	timeout_ms: u64,
) {
	let subnet = resolve_subnet(subnet.as_deref(), use_json);
	let mut inventory = Inventory::for_subnet(&subnet);
	let devices = discover_or_exit(&subnet, Duration::from_millis(timeout_ms), use_json).await;
	inventory.merge_discovered(&devices);

	if let Err(cause) = inventory.probe_all(Arc::new(NoProbe), concurrency).await {
		if use_json {
			error!(
				id = "adsscan::inventory::probe_failure",
				?cause,
				%subnet,
				"Failed to probe the hosts in the subnet",
			);
		} else {
			error!(
				"\n{:?}",
				add_context_to(
					miette!("Failed to probe the hosts in {subnet}.").wrap_err(cause),
					[miette!("`--concurrency` must be at least one.")].into_iter(),
				),
			);
		}
		std::process::exit(INVENTORY_PROBE_FAILURE);
	}

	let records = inventory
		.sorted()
		.into_iter()
		.filter(|record| show_all || record.is_interesting())
		.collect::<Vec<_>>();

	if use_json {
		for record in &records {
			info!(
				id = "adsscan::inventory::record",
				record = valuable(*record),
				"inventory record",
			);
		}
		info!(
			id = "adsscan::inventory::summary",
			%subnet,
			hosts = inventory.len(),
			shown = records.len(),
			discovered = devices.len(),
		);
	} else {
		println!("{TABLE_HEADER}");
		println!("{TABLE_HEADER_LINE}");
		for record in &records {
			println!("{}", table_line(record));
		}
		info!(
			"{} of {} hosts shown, {} answered the ADS search.",
			records.len(),
			inventory.len(),
			devices.len(),
		);
	}
}

fn table_line(record: &InventoryRecord) -> String {
	let address = get_padded_string(record.address(), 15);
	let up = get_padded_string(if record.is_reachable() { "yes" } else { "no" }, 3);
	let mac = get_padded_string(
		record
			.mac_address()
			.map(|mac| mac.to_string())
			.unwrap_or_default(),
		17,
	);
	let hostname = get_padded_string(record.hostname(), 20);
	let ams_net_id = get_padded_string(record.ams_net_id(), 21);
	let os = get_padded_string(record.os_version(), 30);
	let tc_version = get_padded_string(record.tc_version(), 12);

	format!(
		"{address} | {up} | {mac} | {hostname} | {ams_net_id} | {os} | {tc_version} | {}",
		record.runtime_status(),
	)
}

#[cfg(test)]
mod unit_tests {
	use super::*;
	use std::net::Ipv4Addr;

	#[test]
	pub fn table_lines_line_up_with_the_header() {
		let record = InventoryRecord::new(Ipv4Addr::new(10, 0, 0, 1));
		let line = table_line(&record);
		let header_columns = TABLE_HEADER.match_indices('|').map(|(idx, _)| idx).collect::<Vec<_>>();
		let line_columns = line.match_indices('|').map(|(idx, _)| idx).collect::<Vec<_>>();
		assert_eq!(header_columns, line_columns);
		assert!(line.starts_with("10.0.0.1        | no "));
	}
}
