//! Defines the command line interface a.k.a. all the arguments & flags.

use ads_discovery::ads::ADS_DISCOVERY_TIMEOUT_MILLISECONDS;
use clap::Parser;

/// The default amount of probes we run at the same time for an inventory.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 20;

#[derive(Parser, Debug)]
#[command(about, author, name = "adsscan", propagate_version = true, version)]
pub struct CliArguments {
	#[command(subcommand)]
	pub commands: Subcommands,
	#[arg(
		global = true,
		short = 'j',
		long = "json",
		help = "Ensures all logging comes out in JSON instead of text.",
		long_help = "Switch all logging and output to JSON for machine parsable output. NOTE: there is no necissarily guaranteed structure, though we will not break it unnecissarily."
	)]
	pub json: bool,
	#[arg(
		global = true,
		short = 's',
		long = "subnet",
		help = "The subnet to search, e.g. `172.17.76.0/24`.",
		long_help = "The IPv4 subnet the controllers live on. We search from whichever local interface has an address inside of it. Falls back to `ADSSCAN_SUBNET`, and then `172.17.76.0/24`."
	)]
	pub subnet: Option<String>,
	#[arg(
		global = true,
		short = 't',
		long = "timeout-ms",
		default_value_t = ADS_DISCOVERY_TIMEOUT_MILLISECONDS,
		help = "How long to listen for answers, in milliseconds.",
		long_help = "How long to listen for answers after sending the search, in milliseconds. Devices almost always answer within a few hundred milliseconds, but busy networks may need longer."
	)]
	pub timeout_ms: u64,
}

#[derive(Parser, Debug)]
pub enum Subcommands {
	/// Search the subnet, and print every ADS device that answers.
	#[command(name = "scan", visible_alias = "ls")]
	Scan {
		#[arg(
			long = "table-output",
			visible_alias = "table",
			help = "Output the devices as a table.",
			long_help = "Rather than outputting the information as a bunch of log lines, output the information in a table"
		)]
		output_as_table: bool,
	},
	/// Search the subnet, and print an inventory of every host on it.
	///
	/// No host probe (ping, ARP, reverse DNS) ships with `adsscan` yet, so the
	/// `Up` and `MAC Address` columns stay empty, and only hosts that answered
	/// the search have any data.
	#[command(name = "inventory", visible_alias = "inv")]
	Inventory {
		#[arg(
			short = 'c',
			long = "concurrency",
			default_value_t = DEFAULT_PROBE_CONCURRENCY,
			help = "How many hosts to probe at the same time.",
			long_help = "How many hosts to probe at the same time, must be at least one. No host probe ships with `adsscan` yet, so this only matters once one does."
		)]
		concurrency: usize,
		#[arg(
			short = 'a',
			long = "all",
			help = "Include hosts we know nothing about.",
			long_help = "By default only hosts that were reachable, or answered the search are printed. This prints every host in the subnet."
		)]
		show_all: bool,
	},
}
