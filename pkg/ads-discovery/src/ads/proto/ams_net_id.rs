//! The address every ADS device is known by.

use crate::errors::NetworkParseError;
use std::{
	fmt::{Display, Formatter, Result as FmtResult},
	net::{IpAddr, Ipv4Addr},
	str::FromStr,
};

/// The two bytes every "derived from an IP" AMS Net Id ends in.
const LOCAL_SUFFIX: [u8; 2] = [1, 1];

/// A 6 byte AMS Net Id, rendered as six dot separated decimal octets, e.g.
/// `5.124.195.176.1.1`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AmsNetId([u8; 6]);

impl AmsNetId {
	#[must_use]
	pub const fn new(bytes: [u8; 6]) -> Self {
		Self(bytes)
	}

	/// Build the conventional AMS Net Id for a host: the IPv4 address followed
	/// by `.1.1`.
	///
	/// Anything that can't be expressed as four bytes (a real IPv6 address)
	/// becomes `0.0.0.0.1.1`.
	#[must_use]
	pub fn from_local_address(local: IpAddr) -> Self {
		let ipv4 = match local {
			IpAddr::V4(v4) => v4,
			IpAddr::V6(v6) => v6.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
		};
		let octets = ipv4.octets();
		Self([
			octets[0],
			octets[1],
			octets[2],
			octets[3],
			LOCAL_SUFFIX[0],
			LOCAL_SUFFIX[1],
		])
	}

	/// Create an AMS Net Id from a slice, only if it is exactly 6 bytes long.
	#[must_use]
	pub fn from_slice(bytes: &[u8]) -> Option<Self> {
		<[u8; 6]>::try_from(bytes).ok().map(Self)
	}

	#[must_use]
	pub const fn octets(&self) -> [u8; 6] {
		self.0
	}

	/// If this id follows the `<ipv4>.1.1` convention, the IPv4 part of it.
	#[must_use]
	pub fn as_local_address(&self) -> Option<Ipv4Addr> {
		if self.0[4..] == LOCAL_SUFFIX {
			Some(Ipv4Addr::new(self.0[0], self.0[1], self.0[2], self.0[3]))
		} else {
			None
		}
	}
}
impl Display for AmsNetId {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		write!(
			fmt,
			"{}.{}.{}.{}.{}.{}",
			self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
		)
	}
}
impl FromStr for AmsNetId {
	type Err = NetworkParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let mut bytes = [0_u8; 6];
		let mut parts = value.split('.');
		for byte in &mut bytes {
			*byte = parts
				.next()
				.and_then(|part| part.parse::<u8>().ok())
				.ok_or(NetworkParseError::FieldEncodedIncorrectly(
					"AmsNetId",
					"octets",
					"six dot separated decimal numbers between 0 and 255",
				))?;
		}
		if parts.next().is_some() {
			return Err(NetworkParseError::FieldEncodedIncorrectly(
				"AmsNetId",
				"octets",
				"six dot separated decimal numbers between 0 and 255",
			));
		}
		Ok(Self(bytes))
	}
}

#[cfg(test)]
mod unit_tests {
	use super::*;
	use std::net::Ipv6Addr;

	#[test]
	pub fn renders_dotted_decimal() {
		assert_eq!(
			format!("{}", AmsNetId::new([5, 124, 195, 176, 1, 1])),
			"5.124.195.176.1.1",
		);
	}

	#[test]
	pub fn derives_from_local_address() {
		assert_eq!(
			AmsNetId::from_local_address(IpAddr::V4(Ipv4Addr::new(172, 17, 76, 10))),
			AmsNetId::new([172, 17, 76, 10, 1, 1]),
		);
		assert_eq!(
			AmsNetId::from_local_address(IpAddr::V6(Ipv4Addr::new(10, 0, 0, 2).to_ipv6_mapped())),
			AmsNetId::new([10, 0, 0, 2, 1, 1]),
		);
		assert_eq!(
			AmsNetId::from_local_address(IpAddr::V6(Ipv6Addr::LOCALHOST)),
			AmsNetId::new([0, 0, 0, 0, 1, 1]),
			"A real IPv6 address can't be turned into an AMS Net Id, and should become all zeros.",
		);
		assert_eq!(
			AmsNetId::new([172, 17, 76, 10, 1, 1]).as_local_address(),
			Some(Ipv4Addr::new(172, 17, 76, 10)),
		);
		assert_eq!(AmsNetId::new([172, 17, 76, 10, 2, 1]).as_local_address(), None);
	}

	#[test]
	pub fn from_slice_requires_exactly_six_bytes() {
		assert!(AmsNetId::from_slice(&[1, 2, 3, 4, 5]).is_none());
		assert!(AmsNetId::from_slice(&[1, 2, 3, 4, 5, 6, 7]).is_none());
		assert_eq!(
			AmsNetId::from_slice(&[1, 2, 3, 4, 5, 6]),
			Some(AmsNetId::new([1, 2, 3, 4, 5, 6])),
		);
	}

	#[test]
	pub fn parse_from_string() {
		assert_eq!(
			"5.124.195.176.1.1".parse::<AmsNetId>(),
			Ok(AmsNetId::new([5, 124, 195, 176, 1, 1])),
		);
		assert!("5.124.195.176.1".parse::<AmsNetId>().is_err());
		assert!("5.124.195.176.1.1.1".parse::<AmsNetId>().is_err());
		assert!("5.124.195.276.1.1".parse::<AmsNetId>().is_err());
		assert!("a.b.c.d.e.f".parse::<AmsNetId>().is_err());
	}
}
