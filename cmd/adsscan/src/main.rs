#![allow(
	// Imports are mostly used without the module name, so the repetition only
	// shows up in the top level import.
	clippy::module_name_repetitions,
)]

pub mod commands;
pub mod exit_codes;
pub mod knobs;
pub mod utils;

use crate::{
	commands::{handle_inventory, handle_scan},
	exit_codes::{ARGUMENT_PARSING_FAILURE, LOGGING_HANDLER_INSTALL_FAILURE},
	knobs::{
		cli::{CliArguments, Subcommands},
		env::USE_JSON_OUTPUT,
	},
};
use clap::{error::ErrorKind, Parser};
use miette::miette;
use scanlog::install_logging_handlers;
use tracing::error;

#[tokio::main]
async fn main() {
	let (argv, use_json) = bootstrap_cli();

	match argv.commands {
		Subcommands::Scan { output_as_table } => {
			handle_scan(use_json, output_as_table, argv.subnet, argv.timeout_ms).await;
		}
		Subcommands::Inventory {
			concurrency,
			show_all,
		} => {
			handle_inventory(
				use_json,
				concurrency,
				show_all,
				argv.subnet,
				argv.timeout_ms,
			)
			.await;
		}
	}
}

fn bootstrap_cli() -> (CliArguments, bool) {
	let args_opt = CliArguments::try_parse();

	let use_json_cli = args_opt.as_ref().map_or_else(
		|_error| {
			// Try to identify if the user is wanting to use JSON.
			std::env::args().any(|arg| arg.as_str() == "-j" || arg.as_str() == "--json")
		},
		|args| args.json,
	);
	let use_json = *USE_JSON_OUTPUT || use_json_cli;

	if let Err(cause) = install_logging_handlers(use_json) {
		// Logging isn't setup yet, so we have to print by hand.
		if use_json {
			println!(
				r#"{{"id": "adsscan::logging::install_failure", "inner_display_error": "{}", "message": "Failed to install the logging handlers!"}}"#,
				format!("{cause:?}").replace('"', "\\\"")
			);
		} else {
			println!("Failed to install the logging handler to setup logging:\n{cause:?}");
		}
		std::process::exit(LOGGING_HANDLER_INSTALL_FAILURE);
	}

	match args_opt {
		Ok(args) => (args, use_json),
		Err(cause) => {
			if matches!(
				cause.kind(),
				ErrorKind::DisplayHelp
					| ErrorKind::DisplayVersion
					| ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
			) {
				cause.exit();
			}

			if use_json {
				error!(
					id = "adsscan::cli::arg_parse_failure",
					error.kind = %cause.kind(),
					error.context = ?cause.context().map(|(kind, value)| format!("{kind}: {value}")).collect::<Vec<String>>(),
					error.rendered = %cause.render(),
					"Failed parsing CLI arguments"
				);
			} else {
				error!(
					"\n{:?}",
					miette!("Failed parsing CLI arguments!").wrap_err(cause),
				);
			}

			std::process::exit(ARGUMENT_PARSING_FAILURE);
		}
	}
}
