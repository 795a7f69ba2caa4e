//! ADS is the protocol TwinCAT controllers (and engineering installs) speak.
//!
//! The only part of it we deal with here is the UDP broadcast search, which
//! every device answers regardless of routes or credentials. That makes it
//! the cheapest way to figure out what is actually plugged into a controller
//! network.

pub mod discovery;
pub mod proto;
pub mod subnet;

/// The port every ADS device listens for broadcast searches on.
pub const ADS_DISCOVERY_PORT: u16 = 48899;
/// How long a discovery session listens for answers by default.
pub const ADS_DISCOVERY_TIMEOUT_MILLISECONDS: u64 = 2500;
/// How long we're willing to wait for the search request to be written out.
pub const ADS_DISCOVERY_WRITE_TIMEOUT_MILLISECONDS: u64 = 500;
