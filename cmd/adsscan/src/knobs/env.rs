//! The list of environment variables that influence behavior for `adsscan`.

use once_cell::sync::Lazy;
use std::env::var as env_var;

/// Another way of configuring `adsscan` to output it's data in JSON.
///
/// Environment Variable Name: `ADSSCAN_OUTPUT_JSON`
/// Expected Values: ("1" or "0"), and ("true" or "false")
/// Type: Boolean
pub static USE_JSON_OUTPUT: Lazy<bool> =
	Lazy::new(|| env_var("ADSSCAN_OUTPUT_JSON").map_or(false, |var| var == "1" || var == "true"));

/// The subnet to scan when `--subnet` isn't passed.
///
/// Environment Variable Name: `ADSSCAN_SUBNET`
/// Expected Values: An IPv4 network, e.g. `172.17.76.0/24`
/// Type: String, parsed into a subnet when used.
pub static SUBNET: Lazy<Option<String>> =
	Lazy::new(|| env_var("ADSSCAN_SUBNET").ok().filter(|value| !value.trim().is_empty()));
