//! This module is a wrapper for all the underlying protocol types used for
//! the ADS broadcast search.
//!
//! In general as a user you probably don't need to interact with this directly
//! except for maybe importing a few types that APIs return. In general you
//! probably want to use the functions available in
//! [`crate::ads::discovery`] in order to actually scan a network.
//!
//! The search is a single UDP datagram sent to port 48899 on the broadcast
//! address of the local subnet. Every controller that hears it answers
//! directly back to the sender with a response that is _mostly_ a fixed
//! layout, followed by a tail whose contents depend on the firmware:
//!
//! ```text
//! HEADER(4) END(4) RESPONSE(4) AMS_NETID(6) PORT(2) ROUTE_TYPE(4)
//! NAME_LEN(4) NAME(NAME_LEN - 1) PAD(1) DEVICE_TYPE(8) OS_VERSION(12)
//! <optional tail: hostname, version fingerprint(s), comment>
//! ```
//!
//! Nothing in the tail is length-prefixed, so the response decoder leans on a
//! handful of byte patterns that have been observed in real captures. See
//! [`tail`] for those.

mod ams_net_id;
mod cursor;
mod request;
mod response;
pub mod tail;
pub mod text;
pub mod version_tables;

pub use ams_net_id::*;
pub use request::*;
pub use response::*;

/// Every discovery packet, in both directions, starts with this magic.
pub const SEGMENT_HEADER: [u8; 4] = [0x03, 0x66, 0x14, 0x71];
/// The all-zero separator that follows the header, and terminates requests.
pub const SEGMENT_END: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
/// Marks a packet as a "please identify yourself" request.
pub const SEGMENT_REQUEST_DISCOVER: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
/// Marks a packet as the answer to [`SEGMENT_REQUEST_DISCOVER`].
pub const SEGMENT_RESPONSE_DISCOVER: [u8; 4] = [0x01, 0x00, 0x00, 0x80];
/// The AMS port we claim to be listening on in requests (10000, little endian).
pub const SEGMENT_PORT: [u8; 2] = [0x10, 0x27];
/// The route type tag that follows the port in a response.
pub const SEGMENT_ROUTE_TYPE_STATIC: [u8; 4] = [0x05, 0x00, 0x00, 0x00];
/// The device type tag of a controller running the runtime.
pub const SEGMENT_TCAT_TYPE_RUNTIME: [u8; 8] = [0x04, 0x00, 0x14, 0x01, 0x14, 0x01, 0x00, 0x00];
/// The device type tag of an engineering (development) install.
pub const SEGMENT_TCAT_TYPE_ENGINEERING: [u8; 8] =
	[0x04, 0x00, 0x94, 0x00, 0x94, 0x00, 0x00, 0x00];

/// The length of the name length field, which also carries a `{5, 0}` tag.
pub const NAME_LENGTH_FIELD_LENGTH: usize = 4;
/// The length of the block that identifies the operating system.
pub const OS_VERSION_FIELD_LENGTH: usize = 12;
/// The length of the marker that may introduce a free-text comment.
pub const DESCRIPTION_MARKER_LENGTH: usize = 4;
/// The length of the envelope that identifies a packet as belonging to us.
pub const ENVELOPE_LENGTH: usize =
	SEGMENT_HEADER.len() + SEGMENT_END.len() + SEGMENT_RESPONSE_DISCOVER.len();
