//! A container for all the types of errors generated crate-wide.
//!
//! The top level error type is: [`AdsScanError`], which wraps all the other
//! types of errors. You can find more specific error types documented on each
//! specific item.
//!
//! Note that decoding a discovery *response* never produces an error. Devices
//! answer with whatever their firmware feels like sending, so bad data just
//! ends up as empty fields on a [`crate::ads::proto::RemotePlcInfo`].

use crate::ads::proto::RemotePlcInfo;
use bytes::Bytes;
use miette::Diagnostic;
use thiserror::Error;
use tokio::{io::Error as IoError, task::JoinError};

/// The 'top-level' error type for this entire crate, all error types
/// wrap underneath this.
#[derive(Error, Diagnostic, Debug)]
pub enum AdsScanError {
	/// See [`APIError`] for details.
	#[error(transparent)]
	#[diagnostic(transparent)]
	ApiError(#[from] APIError),
	/// A discovery session had already received some answers when the socket
	/// failed underneath it.
	///
	/// Everything that was received before the failure is kept in `collected`
	/// (sorted the same way a successful session would sort it), so callers can
	/// still show partial results.
	#[error("The discovery session failed after collecting {} device(s).", .collected.len())]
	#[diagnostic(code(ads_discovery::discovery_interrupted))]
	DiscoveryInterrupted {
		collected: Vec<RemotePlcInfo>,
		#[source]
		cause: NetworkError,
	},
	/// We spawned a background task, and for whatever reason we could not
	/// wait for it to finish.
	///
	/// For the potential reasons for this, take a peek at [`tokio`]'s
	/// documentation. Which is our asynchronous runtime.
	#[error("We could not await an asynchronous task we spawned: {0:?}")]
	#[diagnostic(code(ads_discovery::join_failure))]
	JoinFailure(JoinError),
	/// See [`NetworkError`] for details.
	#[error(transparent)]
	#[diagnostic(transparent)]
	NetworkError(#[from] NetworkError),
}

/// An error that comes from one of our APIs, e.g. passing in a parameter
/// that wasn't expected.
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum APIError {
	/// The inventory needs at least one probe in flight to make progress.
	#[error("The probe concurrency must be at least one.")]
	#[diagnostic(code(ads_discovery::api::concurrency_cannot_be_zero))]
	ProbeConcurrencyCannotBeZero,
	/// A subnet was not written as `a.b.c.d/prefix`.
	#[error("The subnet `{0}` is not valid, it must look like `172.17.76.0/24`.")]
	#[diagnostic(code(ads_discovery::api::subnet_invalid))]
	SubnetInvalid(String),
	/// An IPv4 prefix can only be up to 32 bits long.
	#[error("A subnet prefix can be at most 32 bits long, but you specified: /{0}.")]
	#[diagnostic(code(ads_discovery::api::subnet_prefix_too_long))]
	SubnetPrefixTooLong(u8),
}

/// Trying to interact with the network has resulted in an error.
///
/// *NOTE: this does not cover bogus data coming in from the network. This only
/// covers errors related to interacting with the network. If you're looking
/// for bogus data from the network errors look at [`NetworkParseError`].*
#[derive(Error, Diagnostic, Debug)]
pub enum NetworkError {
	/// We failed to bind to a local address to listen for packets from the
	/// network.
	///
	/// This can happen for numerous reason, such as:
	///
	/// - The program does not have permission to listen on this specific port.
	/// - The address is already being used by another process.
	/// - The network interface returned some type of error.
	#[error("Failed to bind to a local address to receive packets.")]
	#[diagnostic(code(ads_discovery::net::bind_address_error))]
	BindAddressError,
	/// See [`tokio::io::Error`] for details.
	#[error("Error talking to the network could not send/receive data: {0}")]
	#[diagnostic(code(ads_discovery::net::native_failure))]
	IOError(#[from] IoError),
	/// See [`network_interface::Error::GetIfAddrsError`] for details.
	#[error("Failed to list the network interfaces on your device.")]
	#[diagnostic(code(ads_discovery::net::list_interfaces_error))]
	ListInterfacesError,
	/// None of the interfaces that are up had an IPv4 address inside the subnet
	/// we were asked to scan.
	#[error("No local network interface has an IPv4 address inside of {0}.")]
	#[diagnostic(
		code(ads_discovery::net::no_interface_in_subnet),
		help("Check that this machine is actually plugged into the controller network, or pass a different subnet.")
	)]
	NoInterfaceInSubnet(String),
	/// If we failed to call `setsockopt` for `SO_BROADCAST`.
	#[error("Failed to set the socket we're bound on as a broadcast address, this is needed to discover ADS devices.")]
	#[diagnostic(code(ads_discovery::net::set_broadcast_failure))]
	SetBroadcastFailure,
	#[error("Timed out while writing the discovery request to the network.")]
	#[diagnostic(code(ads_discovery::net::timeout))]
	TimeoutError,
}

/// We tried parsing a discovery request, but someone sent us some junk.
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum NetworkParseError {
	/// A field encoded within a packet was not correct.
	#[error("Reading Field {1} from Packet {0}, was not encoded correctly must be encoded as {2}")]
	#[diagnostic(code(ads_discovery::net::parse::field_encoded_incorrectly))]
	FieldEncodedIncorrectly(&'static str, &'static str, &'static str),
	/// The overall size of the packet was too short, and we cannot successfully
	/// parse it.
	#[error("Tried to read Packet of type ({0}) from network needs at least {1} bytes, but only got {2} bytes: {3:02x?}")]
	#[diagnostic(code(ads_discovery::net::parse::not_enough_data))]
	NotEnoughData(&'static str, usize, usize, Bytes),
	#[error("Tried to read Packet of type ({0}) from network, must be encoded exactly as [{1:02x?}], but got [{2:02x?}]")]
	#[diagnostic(code(ads_discovery::net::parse::packet_doesnt_match_static_data))]
	PacketDoesntMatchStaticPayload(&'static str, &'static [u8], Bytes),
	/// The overall size of the packet was too long, and there was unexpected
	/// data at the end, a.k.a. the "Trailer".
	#[error("Unexpected Trailer for Packet `{0}` received from the network (we're not sure what do with this extra data), extra bytes: {1:02x?}")]
	#[diagnostic(code(ads_discovery::net::parse::unexpected_trailer))]
	UnexpectedTrailer(&'static str, Bytes),
}
