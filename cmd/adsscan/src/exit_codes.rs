//! Every exit code `adsscan` can exit with, so scripts can tell failures
//! apart.

/// We could not install the logging handlers.
pub const LOGGING_HANDLER_INSTALL_FAILURE: i32 = 1;
/// The arguments passed on the command line were not valid.
pub const ARGUMENT_PARSING_FAILURE: i32 = 2;
/// The subnet (from the cli, or the environment) could not be parsed.
pub const INVALID_SUBNET: i32 = 3;
/// Nothing on this machine has an address inside of the subnet.
pub const NO_INTERFACE_IN_SUBNET: i32 = 4;
/// We could not set up a socket to search with.
pub const DISCOVERY_COULD_NOT_SEARCH: i32 = 5;
/// The search started, but the socket failed part way through.
pub const DISCOVERY_INTERRUPTED: i32 = 6;
/// Probing the hosts of the inventory failed.
pub const INVENTORY_PROBE_FAILURE: i32 = 7;
