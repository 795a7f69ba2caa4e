//! The IPv4 subnet controllers live on.
//!
//! Discovery only ever happens on a single broadcast domain, so rather than
//! blasting every interface on the machine we pick the one interface that has
//! an address inside of the subnet we've been told to manage.

use crate::errors::APIError;
use std::{
	fmt::{Display, Formatter, Result as FmtResult},
	net::Ipv4Addr,
	str::FromStr,
};

/// An IPv4 network, e.g. `172.17.76.0/24`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ManagedSubnet {
	network: Ipv4Addr,
	prefix_length: u8,
}

impl ManagedSubnet {
	/// The controller network we scan when nobody tells us otherwise.
	pub const DEFAULT: Self = Self {
		network: Ipv4Addr::new(172, 17, 76, 0),
		prefix_length: 24,
	};

	/// Create a new subnet, any host bits in `address` are masked off.
	///
	/// ## Errors
	///
	/// If the prefix length is longer than 32 bits.
	pub fn new(address: Ipv4Addr, prefix_length: u8) -> Result<Self, APIError> {
		if prefix_length > 32 {
			return Err(APIError::SubnetPrefixTooLong(prefix_length));
		}
		let mask = Self::mask_bits(prefix_length);
		Ok(Self {
			network: Ipv4Addr::from(u32::from(address) & mask),
			prefix_length,
		})
	}

	#[must_use]
	pub const fn network(&self) -> Ipv4Addr {
		self.network
	}

	#[must_use]
	pub const fn prefix_length(&self) -> u8 {
		self.prefix_length
	}

	#[must_use]
	pub fn netmask(&self) -> Ipv4Addr {
		Ipv4Addr::from(Self::mask_bits(self.prefix_length))
	}

	/// The directed broadcast address of this subnet.
	#[must_use]
	pub fn broadcast(&self) -> Ipv4Addr {
		Ipv4Addr::from(u32::from(self.network) | !Self::mask_bits(self.prefix_length))
	}

	#[must_use]
	pub fn contains(&self, address: Ipv4Addr) -> bool {
		let mask = Self::mask_bits(self.prefix_length);
		u32::from(address) & mask == u32::from(self.network)
	}

	/// Every address a host could have inside of this subnet.
	///
	/// The network and broadcast addresses are skipped, except on `/31` and
	/// `/32` where there's no room for them.
	pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
		let first = u32::from(self.network);
		let last = u32::from(self.broadcast());
		let (first, last) = if self.prefix_length >= 31 {
			(first, last)
		} else {
			(first + 1, last - 1)
		};
		(first..=last).map(Ipv4Addr::from)
	}

	fn mask_bits(prefix_length: u8) -> u32 {
		u32::MAX
			.checked_shl(32 - u32::from(prefix_length))
			.unwrap_or(0)
	}
}
impl Default for ManagedSubnet {
	fn default() -> Self {
		Self::DEFAULT
	}
}
impl Display for ManagedSubnet {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		write!(fmt, "{}/{}", self.network, self.prefix_length)
	}
}
impl FromStr for ManagedSubnet {
	type Err = APIError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let trimmed = value.trim();
		let Some((address, prefix)) = trimmed.split_once('/') else {
			return Err(APIError::SubnetInvalid(value.to_owned()));
		};
		let address = address
			.parse::<Ipv4Addr>()
			.map_err(|_| APIError::SubnetInvalid(value.to_owned()))?;
		let prefix = prefix
			.parse::<u8>()
			.map_err(|_| APIError::SubnetInvalid(value.to_owned()))?;
		Self::new(address, prefix)
	}
}

#[cfg(test)]
mod unit_tests {
	use super::*;

	#[test]
	pub fn default_subnet() {
		let subnet = ManagedSubnet::default();
		assert_eq!(subnet.to_string(), "172.17.76.0/24");
		assert_eq!(subnet.netmask(), Ipv4Addr::new(255, 255, 255, 0));
		assert_eq!(subnet.broadcast(), Ipv4Addr::new(172, 17, 76, 255));
	}

	#[test]
	pub fn parsing() {
		assert_eq!(
			"10.1.2.3/16".parse::<ManagedSubnet>(),
			ManagedSubnet::new(Ipv4Addr::new(10, 1, 0, 0), 16),
		);
		assert_eq!(
			"10.1.2.3/16"
				.parse::<ManagedSubnet>()
				.expect("Failed to parse subnet!")
				.network(),
			Ipv4Addr::new(10, 1, 0, 0),
			"Host bits should be masked off.",
		);
		assert_eq!(
			"10.1.2.3/33".parse::<ManagedSubnet>(),
			Err(APIError::SubnetPrefixTooLong(33)),
		);
		for bad in ["10.1.2.3", "10.1.2/24", "10.1.2.3/x", "", "/24"] {
			assert_eq!(
				bad.parse::<ManagedSubnet>(),
				Err(APIError::SubnetInvalid(bad.to_owned())),
			);
		}
	}

	#[test]
	pub fn containment() {
		let subnet = ManagedSubnet::DEFAULT;
		assert!(subnet.contains(Ipv4Addr::new(172, 17, 76, 1)));
		assert!(subnet.contains(Ipv4Addr::new(172, 17, 76, 255)));
		assert!(!subnet.contains(Ipv4Addr::new(172, 17, 77, 1)));

		let everything = ManagedSubnet::new(Ipv4Addr::new(8, 8, 8, 8), 0).expect("/0 is valid");
		assert_eq!(everything.network(), Ipv4Addr::UNSPECIFIED);
		assert_eq!(everything.broadcast(), Ipv4Addr::BROADCAST);
		assert!(everything.contains(Ipv4Addr::new(192, 168, 1, 1)));
	}

	#[test]
	pub fn host_addresses() {
		let hosts = ManagedSubnet::DEFAULT.hosts().collect::<Vec<_>>();
		assert_eq!(hosts.len(), 254);
		assert_eq!(hosts.first(), Some(&Ipv4Addr::new(172, 17, 76, 1)));
		assert_eq!(hosts.last(), Some(&Ipv4Addr::new(172, 17, 76, 254)));

		let point_to_point = ManagedSubnet::new(Ipv4Addr::new(10, 0, 0, 0), 31).expect("/31 is valid");
		assert_eq!(
			point_to_point.hosts().collect::<Vec<_>>(),
			vec![Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 1)],
		);
		let single = ManagedSubnet::new(Ipv4Addr::new(10, 0, 0, 7), 32).expect("/32 is valid");
		assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 0, 0, 7)]);
	}
}
