//! The broadcast search request, asking every ADS device to identify itself.

use crate::{
	ads::proto::{
		AmsNetId, SEGMENT_END, SEGMENT_HEADER, SEGMENT_PORT, SEGMENT_REQUEST_DISCOVER,
	},
	errors::NetworkParseError,
};
use bytes::{Bytes, BytesMut};
use std::{
	fmt::{Display, Formatter, Result as FmtResult},
	net::{IpAddr, Ipv4Addr},
	ops::Range,
};

/// The size of a request on the wire.
pub const DISCOVERY_REQUEST_LENGTH: usize = SEGMENT_HEADER.len()
	+ SEGMENT_END.len()
	+ SEGMENT_REQUEST_DISCOVER.len()
	+ 6 + SEGMENT_PORT.len()
	+ SEGMENT_END.len();

/// A request asking all ADS devices on the broadcast domain to identify
/// themselves.
///
/// The only variable part of the request is the AMS Net Id of the sender,
/// which is derived from the local IPv4 address the request goes out on.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct DiscoveryRequest {
	/// The address of the interface we're sending on.
	local_address: Ipv4Addr,
}

impl DiscoveryRequest {
	#[must_use]
	pub const fn new(local_address: Ipv4Addr) -> Self {
		Self { local_address }
	}

	/// Create a request for any kind of local address.
	///
	/// The protocol only has room for four address bytes, so an IPv6 address
	/// that isn't an IPv4-mapped one is replaced with `0.0.0.0`.
	#[must_use]
	pub fn for_local_address(local: IpAddr) -> Self {
		match local {
			IpAddr::V4(v4) => Self::new(v4),
			IpAddr::V6(v6) => Self::new(v6.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED)),
		}
	}

	#[must_use]
	pub const fn local_address(&self) -> Ipv4Addr {
		self.local_address
	}

	/// The AMS Net Id we introduce ourselves with.
	#[must_use]
	pub fn sender_ams_net_id(&self) -> AmsNetId {
		AmsNetId::from_local_address(IpAddr::V4(self.local_address))
	}
}
impl Display for DiscoveryRequest {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		write!(fmt, "DiscoveryRequest(from {})", self.sender_ams_net_id())
	}
}
impl From<&DiscoveryRequest> for Bytes {
	fn from(this: &DiscoveryRequest) -> Self {
		let mut buff = BytesMut::with_capacity(DISCOVERY_REQUEST_LENGTH);
		buff.extend_from_slice(&SEGMENT_HEADER);
		buff.extend_from_slice(&SEGMENT_END);
		buff.extend_from_slice(&SEGMENT_REQUEST_DISCOVER);
		buff.extend_from_slice(&this.sender_ams_net_id().octets());
		buff.extend_from_slice(&SEGMENT_PORT);
		buff.extend_from_slice(&SEGMENT_END);
		buff.freeze()
	}
}
impl From<DiscoveryRequest> for Bytes {
	fn from(value: DiscoveryRequest) -> Self {
		Self::from(&value)
	}
}
impl TryFrom<Bytes> for DiscoveryRequest {
	type Error = NetworkParseError;

	fn try_from(packet: Bytes) -> Result<Self, Self::Error> {
		if packet.len() < DISCOVERY_REQUEST_LENGTH {
			return Err(NetworkParseError::NotEnoughData(
				"DiscoveryRequest",
				DISCOVERY_REQUEST_LENGTH,
				packet.len(),
				packet,
			));
		}
		if packet.len() > DISCOVERY_REQUEST_LENGTH {
			return Err(NetworkParseError::UnexpectedTrailer(
				"DiscoveryRequest",
				packet.slice(DISCOVERY_REQUEST_LENGTH..),
			));
		}

		let static_segments: [(Range<usize>, &'static [u8]); 5] = [
			(0..4, &SEGMENT_HEADER),
			(4..8, &SEGMENT_END),
			(8..12, &SEGMENT_REQUEST_DISCOVER),
			(18..20, &SEGMENT_PORT),
			(20..24, &SEGMENT_END),
		];
		for (range, expected) in static_segments {
			if packet[range.clone()] != *expected {
				return Err(NetworkParseError::PacketDoesntMatchStaticPayload(
					"DiscoveryRequest",
					expected,
					packet.slice(range),
				));
			}
		}

		let Some(local_address) = AmsNetId::from_slice(&packet[12..18])
			.and_then(|ams_net_id| ams_net_id.as_local_address())
		else {
			return Err(NetworkParseError::FieldEncodedIncorrectly(
				"DiscoveryRequest",
				"ams_net_id",
				"an IPv4 address followed by `.1.1`",
			));
		};

		Ok(Self { local_address })
	}
}
