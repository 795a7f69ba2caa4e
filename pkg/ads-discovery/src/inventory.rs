//! A best effort inventory of every host on the controller network.
//!
//! The inventory starts out with one (empty) record for every host address in
//! the subnet. Discovery results are merged in, and then every host is probed
//! for reachability, its MAC address, and a reverse DNS name. How a host is
//! probed is left up to a [`HostProbe`], since that generally means shelling
//! out to platform tools, or needing elevated permissions.

use crate::{
	ads::{
		proto::{AmsNetId, RemotePlcInfo, RuntimeStatus},
		subnet::ManagedSubnet,
	},
	errors::{APIError, AdsScanError},
};
use fnv::FnvHashMap;
use mac_address::MacAddress;
use std::{
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	net::{IpAddr, Ipv4Addr},
	sync::Arc,
};
use time::OffsetDateTime;
use tokio::task::JoinSet;
use tracing::{debug, field::valuable, trace};
use valuable::{Fields, NamedField, NamedValues, StructDef, Structable, Valuable, Value, Visit};

/// We never pre-seed more records than this, a `/16` would otherwise mean
/// probing 65 thousand hosts.
pub const MAX_SEEDED_HOSTS: usize = 1024;

/// Everything a probe found out about a single host.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct ProbeResult {
	pub is_reachable: bool,
	pub mac_address: Option<MacAddress>,
	pub hostname: Option<String>,
}

/// Something that can check on a single host.
///
/// Implementations are expected to swallow their own failures, a host that
/// can't be checked is simply reported as unreachable.
pub trait HostProbe: Send + Sync {
	/// If the host answered at all (e.g. to a ping).
	fn is_reachable(&self, address: Ipv4Addr) -> impl Future<Output = bool> + Send;

	/// The MAC address of the host, e.g. from the ARP table.
	fn mac_address(&self, address: Ipv4Addr) -> impl Future<Output = Option<MacAddress>> + Send;

	/// The name the host resolves to in reverse DNS, without a trailing dot.
	fn reverse_lookup(&self, address: Ipv4Addr) -> impl Future<Output = Option<String>> + Send;

	/// Run every check for a host. MAC and name are only looked up for hosts
	/// that are reachable.
	fn probe(&self, address: Ipv4Addr) -> impl Future<Output = ProbeResult> + Send {
		async move {
			if !self.is_reachable(address).await {
				return ProbeResult::default();
			}
			ProbeResult {
				is_reachable: true,
				mac_address: self.mac_address(address).await,
				hostname: self
					.reverse_lookup(address)
					.await
					.map(|name| name.trim_end_matches('.').to_owned())
					.filter(|name| !name.is_empty()),
			}
		}
	}
}

/// A probe that never finds anything, every host is unreachable.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct NoProbe;

impl HostProbe for NoProbe {
	async fn is_reachable(&self, _address: Ipv4Addr) -> bool {
		false
	}

	async fn mac_address(&self, _address: Ipv4Addr) -> Option<MacAddress> {
		None
	}

	async fn reverse_lookup(&self, _address: Ipv4Addr) -> Option<String> {
		None
	}
}

/// What we know about a single host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryRecord {
	address: Ipv4Addr,
	is_reachable: bool,
	mac_address: Option<MacAddress>,
	hostname: String,
	os_version: String,
	/// Either discovered, or the `<ip>.1.1` guess for reachable hosts.
	ams_net_id: String,
	tc_version: String,
	runtime_status: RuntimeStatus,
	last_update: OffsetDateTime,
}

impl InventoryRecord {
	#[must_use]
	pub fn new(address: Ipv4Addr) -> Self {
		Self {
			address,
			is_reachable: false,
			mac_address: None,
			hostname: String::new(),
			os_version: String::new(),
			ams_net_id: String::new(),
			tc_version: String::new(),
			runtime_status: RuntimeStatus::Unclassified,
			last_update: OffsetDateTime::now_utc(),
		}
	}

	#[must_use]
	pub const fn address(&self) -> Ipv4Addr {
		self.address
	}

	#[must_use]
	pub const fn is_reachable(&self) -> bool {
		self.is_reachable
	}

	#[must_use]
	pub const fn mac_address(&self) -> Option<MacAddress> {
		self.mac_address
	}

	#[must_use]
	pub fn hostname(&self) -> &str {
		&self.hostname
	}

	#[must_use]
	pub fn os_version(&self) -> &str {
		&self.os_version
	}

	#[must_use]
	pub fn ams_net_id(&self) -> &str {
		&self.ams_net_id
	}

	#[must_use]
	pub fn tc_version(&self) -> &str {
		&self.tc_version
	}

	#[must_use]
	pub const fn runtime_status(&self) -> RuntimeStatus {
		self.runtime_status
	}

	#[must_use]
	pub const fn last_update(&self) -> OffsetDateTime {
		self.last_update
	}

	/// If we know anything about this host beyond its address.
	#[must_use]
	pub fn is_interesting(&self) -> bool {
		self.is_reachable || !self.ams_net_id.is_empty()
	}
}
impl Display for InventoryRecord {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		write!(
			fmt,
			"{} {} mac: {} host: {} ams: {} os: {} tc: {} {}",
			self.address,
			if self.is_reachable { "up" } else { "down" },
			self.mac_address.map(|mac| mac.to_string()).unwrap_or_default(),
			self.hostname,
			self.ams_net_id,
			self.os_version,
			self.tc_version,
			self.runtime_status,
		)
	}
}

const INVENTORY_RECORD_FIELDS: &[NamedField<'static>] = &[
	NamedField::new("address"),
	NamedField::new("is_reachable"),
	NamedField::new("mac_address"),
	NamedField::new("hostname"),
	NamedField::new("os_version"),
	NamedField::new("ams_net_id"),
	NamedField::new("tc_version"),
	NamedField::new("runtime_status"),
	NamedField::new("last_update"),
];
impl Structable for InventoryRecord {
	fn definition(&self) -> StructDef<'_> {
		StructDef::new_static("InventoryRecord", Fields::Named(INVENTORY_RECORD_FIELDS))
	}
}
impl Valuable for InventoryRecord {
	fn as_value(&self) -> Value<'_> {
		Value::Structable(self)
	}

	fn visit(&self, visitor: &mut dyn Visit) {
		visitor.visit_named_fields(&NamedValues::new(
			INVENTORY_RECORD_FIELDS,
			&[
				Valuable::as_value(&format!("{}", self.address)),
				Valuable::as_value(&self.is_reachable),
				Valuable::as_value(&self.mac_address.map(|mac| mac.to_string()).unwrap_or_default()),
				Valuable::as_value(&self.hostname),
				Valuable::as_value(&self.os_version),
				Valuable::as_value(&self.ams_net_id),
				Valuable::as_value(&self.tc_version),
				Valuable::as_value(&self.runtime_status.marker()),
				Valuable::as_value(&format!("{}", self.last_update)),
			],
		));
	}
}

/// Every host we know about, keyed by address.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
	records: FnvHashMap<Ipv4Addr, InventoryRecord>,
}

impl Inventory {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed a record for every host address in `subnet`, up to
	/// [`MAX_SEEDED_HOSTS`].
	#[must_use]
	pub fn for_subnet(subnet: &ManagedSubnet) -> Self {
		let mut inventory = Self::new();
		for address in subnet.hosts().take(MAX_SEEDED_HOSTS) {
			inventory.records.insert(address, InventoryRecord::new(address));
		}
		debug!(%subnet, seeded = inventory.len(), "seeded inventory");
		inventory
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.records.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	#[must_use]
	pub fn get(&self, address: Ipv4Addr) -> Option<&InventoryRecord> {
		self.records.get(&address)
	}

	/// Merge the results of a discovery session.
	///
	/// Devices outside of the seeded range still get a record.
	pub fn merge_discovered(&mut self, devices: &[RemotePlcInfo]) {
		for device in devices {
			let record = self
				.records
				.entry(device.address())
				.or_insert_with(|| InventoryRecord::new(device.address()));

			if let Some(ams_net_id) = device.ams_net_id() {
				record.ams_net_id = ams_net_id.to_string();
			}
			if !device.os_version().is_empty() {
				record.os_version = device.os_version().to_owned();
			}
			if !device.tc_version().is_unknown() {
				record.tc_version = device.tc_version().to_string();
			}
			record.runtime_status = device.runtime_status();
			if record.hostname.is_empty() {
				if !device.hostname().is_empty() {
					record.hostname = device.hostname().to_owned();
				} else if !device.name().is_empty() {
					record.hostname = device.name().to_owned();
				}
			}
			record.last_update = OffsetDateTime::now_utc();
			trace!(record = valuable(&*record), "merged discovered device");
		}
	}

	/// Record the result of probing a single host.
	///
	/// A reachable host that discovery didn't find an AMS Net Id for is given
	/// the conventional `<ip>.1.1` one.
	pub fn apply_probe(&mut self, address: Ipv4Addr, result: ProbeResult) {
		let record = self
			.records
			.entry(address)
			.or_insert_with(|| InventoryRecord::new(address));

		record.is_reachable = result.is_reachable;
		record.mac_address = result.mac_address;
		if let Some(hostname) = result.hostname {
			record.hostname = hostname;
		}
		if record.is_reachable && record.ams_net_id.is_empty() {
			record.ams_net_id = AmsNetId::from_local_address(IpAddr::V4(address)).to_string();
		}
		record.last_update = OffsetDateTime::now_utc();
	}

	/// Probe every host in the inventory, with at most `concurrency` probes in
	/// flight at once.
	///
	/// ## Errors
	///
	/// - If `concurrency` is zero.
	/// - If a probe task panicked, or was cancelled.
	pub async fn probe_all<Probe>(
		&mut self,
		probe: Arc<Probe>,
		concurrency: usize,
	) -> Result<(), AdsScanError>
	where
		Probe: HostProbe + 'static,
	{
		if concurrency == 0 {
			return Err(APIError::ProbeConcurrencyCannotBeZero.into());
		}

		let mut pending = self.records.keys().copied().collect::<Vec<_>>();
		pending.sort_unstable_by_key(|address| u32::from(*address));
		let mut pending = pending.into_iter();
		let mut tasks = JoinSet::new();

		loop {
			while tasks.len() < concurrency {
				let Some(address) = pending.next() else {
					break;
				};
				let cloned_probe = Arc::clone(&probe);
				tasks.spawn(async move { (address, cloned_probe.probe(address).await) });
			}

			let Some(joined) = tasks.join_next().await else {
				break;
			};
			let (address, result) = match joined {
				Ok(data) => data,
				Err(cause) => {
					tasks.abort_all();
					return Err(AdsScanError::JoinFailure(cause));
				}
			};
			trace!(%address, reachable = result.is_reachable, "probed host");
			self.apply_probe(address, result);
		}

		Ok(())
	}

	/// Every record, reachable hosts first, then by address.
	#[must_use]
	pub fn sorted(&self) -> Vec<&InventoryRecord> {
		let mut records = self.records.values().collect::<Vec<_>>();
		records.sort_by_key(|record| (!record.is_reachable, u32::from(record.address)));
		records
	}
}

#[cfg(test)]
mod unit_tests {
	use super::*;
	use crate::ads::proto::{
		SEGMENT_END, SEGMENT_HEADER, SEGMENT_PORT, SEGMENT_RESPONSE_DISCOVER,
		SEGMENT_ROUTE_TYPE_STATIC, SEGMENT_TCAT_TYPE_RUNTIME,
	};
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn discovered(address: Ipv4Addr, name: &str) -> RemotePlcInfo {
		let octets = address.octets();
		let mut packet = Vec::new();
		packet.extend_from_slice(&SEGMENT_HEADER);
		packet.extend_from_slice(&SEGMENT_END);
		packet.extend_from_slice(&SEGMENT_RESPONSE_DISCOVER);
		packet.extend_from_slice(&[octets[0], octets[1], octets[2], octets[3], 1, 1]);
		packet.extend_from_slice(&SEGMENT_PORT);
		packet.extend_from_slice(&SEGMENT_ROUTE_TYPE_STATIC);
		let name_length = u16::try_from(name.len() + 1).expect("name too long for a test");
		packet.extend_from_slice(&[0x05, 0x00]);
		packet.extend_from_slice(&name_length.to_le_bytes());
		packet.extend_from_slice(name.as_bytes());
		packet.push(0x00);
		packet.extend_from_slice(&SEGMENT_TCAT_TYPE_RUNTIME);
		packet.extend_from_slice(&[0x0A, 0, 0, 0, 0x00, 0, 0, 0, 0x65, 0x4A, 0, 0]);
		RemotePlcInfo::parse(address, &packet)
	}

	/// Every host with an odd last octet is up.
	struct OddHostsAreUp {
		in_flight: AtomicUsize,
		max_in_flight: AtomicUsize,
	}

	impl HostProbe for OddHostsAreUp {
		async fn is_reachable(&self, address: Ipv4Addr) -> bool {
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
			self.max_in_flight.fetch_max(now, Ordering::SeqCst);
			tokio::task::yield_now().await;
			self.in_flight.fetch_sub(1, Ordering::SeqCst);
			address.octets()[3] % 2 == 1
		}

		async fn mac_address(&self, address: Ipv4Addr) -> Option<MacAddress> {
			Some(MacAddress::new([0, 1, 5, 0, 0, address.octets()[3]]))
		}

		async fn reverse_lookup(&self, address: Ipv4Addr) -> Option<String> {
			Some(format!("host-{}.plant.local.", address.octets()[3]))
		}
	}

	#[test]
	pub fn seeds_every_host() {
		let inventory = Inventory::for_subnet(&ManagedSubnet::DEFAULT);
		assert_eq!(inventory.len(), 254);
		assert!(inventory.get(Ipv4Addr::new(172, 17, 76, 0)).is_none());
		assert!(inventory.get(Ipv4Addr::new(172, 17, 76, 1)).is_some());
		assert!(inventory.get(Ipv4Addr::new(172, 17, 76, 255)).is_none());

		let huge = ManagedSubnet::new(Ipv4Addr::new(10, 0, 0, 0), 16).expect("valid subnet");
		assert_eq!(Inventory::for_subnet(&huge).len(), MAX_SEEDED_HOSTS);
	}

	#[test]
	pub fn merges_discovered_devices() {
		let mut inventory = Inventory::for_subnet(&ManagedSubnet::DEFAULT);
		inventory.merge_discovered(&[
			discovered(Ipv4Addr::new(172, 17, 76, 10), "CX-10"),
			discovered(Ipv4Addr::new(10, 9, 9, 9), "ELSEWHERE"),
		]);

		let record = inventory
			.get(Ipv4Addr::new(172, 17, 76, 10))
			.expect("Discovered device has no record!");
		assert_eq!(record.ams_net_id(), "172.17.76.10.1.1");
		assert_eq!(record.os_version(), "Windows 10 (19045) 22H2");
		assert_eq!(record.hostname(), "CX-10");
		assert_eq!(record.runtime_status(), RuntimeStatus::Runtime);
		assert_eq!(record.tc_version(), "");
		assert!(!record.is_reachable());

		assert!(
			inventory.get(Ipv4Addr::new(10, 9, 9, 9)).is_some(),
			"Devices outside of the subnet should still get a record.",
		);
		assert_eq!(inventory.len(), 255);
	}

	#[test]
	pub fn probe_fallback_ams_net_id() {
		let mut inventory = Inventory::for_subnet(&ManagedSubnet::DEFAULT);
		inventory.merge_discovered(&[discovered(Ipv4Addr::new(172, 17, 76, 10), "CX-10")]);
		let reachable = ProbeResult {
			is_reachable: true,
			mac_address: None,
			hostname: None,
		};

		inventory.apply_probe(Ipv4Addr::new(172, 17, 76, 10), reachable.clone());
		inventory.apply_probe(Ipv4Addr::new(172, 17, 76, 11), reachable);
		inventory.apply_probe(Ipv4Addr::new(172, 17, 76, 12), ProbeResult::default());

		assert_eq!(
			inventory.get(Ipv4Addr::new(172, 17, 76, 10)).map(InventoryRecord::ams_net_id),
			Some("172.17.76.10.1.1"),
		);
		assert_eq!(
			inventory.get(Ipv4Addr::new(172, 17, 76, 11)).map(InventoryRecord::ams_net_id),
			Some("172.17.76.11.1.1"),
			"A reachable host without a discovered id gets the conventional one.",
		);
		assert_eq!(
			inventory.get(Ipv4Addr::new(172, 17, 76, 12)).map(InventoryRecord::ams_net_id),
			Some(""),
			"An unreachable host never gets a guessed id.",
		);
		assert_eq!(
			inventory.get(Ipv4Addr::new(172, 17, 76, 10)).map(InventoryRecord::hostname),
			Some("CX-10"),
			"A probe without a name keeps the discovered one.",
		);
	}

	#[test]
	pub fn sorted_puts_reachable_first() {
		let mut inventory = Inventory::new();
		for last in [9_u8, 3, 7, 1] {
			inventory.apply_probe(
				Ipv4Addr::new(172, 17, 76, last),
				ProbeResult {
					is_reachable: last > 5,
					..ProbeResult::default()
				},
			);
		}

		assert_eq!(
			inventory
				.sorted()
				.into_iter()
				.map(|record| record.address().octets()[3])
				.collect::<Vec<_>>(),
			vec![7, 9, 1, 3],
		);
	}

	#[tokio::test]
	pub async fn probe_all_respects_concurrency() {
		let mut inventory = Inventory::for_subnet(&ManagedSubnet::DEFAULT);
		let probe = Arc::new(OddHostsAreUp {
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
		});

		inventory
			.probe_all(Arc::clone(&probe), 4)
			.await
			.expect("Probing every host failed!");

		assert!(probe.max_in_flight.load(Ordering::SeqCst) <= 4);
		let up = inventory.sorted().into_iter().filter(|record| record.is_reachable()).count();
		assert_eq!(up, 127);

		let record = inventory
			.get(Ipv4Addr::new(172, 17, 76, 33))
			.expect("Seeded host is missing!");
		assert!(record.is_reachable());
		assert_eq!(record.hostname(), "host-33.plant.local");
		assert_eq!(record.mac_address(), Some(MacAddress::new([0, 1, 5, 0, 0, 33])));
		assert_eq!(record.ams_net_id(), "172.17.76.33.1.1");

		let record = inventory
			.get(Ipv4Addr::new(172, 17, 76, 34))
			.expect("Seeded host is missing!");
		assert!(!record.is_reachable());
		assert_eq!(record.mac_address(), None);
	}

	#[tokio::test]
	pub async fn no_probe_finds_nothing() {
		let mut inventory = Inventory::for_subnet(&ManagedSubnet::DEFAULT);
		inventory
			.probe_all(Arc::new(NoProbe), 16)
			.await
			.expect("Probing with no probe failed!");
		assert!(inventory.sorted().iter().all(|record| !record.is_interesting()));

		assert!(matches!(
			inventory.probe_all(Arc::new(NoProbe), 0).await,
			Err(AdsScanError::ApiError(APIError::ProbeConcurrencyCannotBeZero)),
		));
	}
}
