//! The answer a device sends back to a [`crate::ads::proto::DiscoveryRequest`].
//!
//! Unlike most packets we deal with, decoding one of these can never fail.
//! Controllers in the field run a huge variety of firmware, and a scan is far
//! more useful with a half-filled row than with a missing one. So every field
//! that can't be read is simply left empty.

use crate::ads::proto::{
	cursor::Cursor,
	tail::TailScan,
	text::{decode_ascii_run, decode_utf16le_run},
	version_tables::describe_os_version,
	AmsNetId, DESCRIPTION_MARKER_LENGTH, ENVELOPE_LENGTH, NAME_LENGTH_FIELD_LENGTH,
	OS_VERSION_FIELD_LENGTH, SEGMENT_END, SEGMENT_HEADER, SEGMENT_PORT, SEGMENT_RESPONSE_DISCOVER,
	SEGMENT_ROUTE_TYPE_STATIC, SEGMENT_TCAT_TYPE_ENGINEERING, SEGMENT_TCAT_TYPE_RUNTIME,
};
use bytes::Bytes;
use std::{
	fmt::{Display, Formatter, Result as FmtResult},
	net::Ipv4Addr,
};
use valuable::{Fields, NamedField, NamedValues, StructDef, Structable, Valuable, Value, Visit};

/// The tag the name length field has to start with.
const NAME_LENGTH_TAG: [u8; 2] = [0x05, 0x00];
/// The first byte of a comment marker that is followed by a comment.
const DESCRIPTION_MARKER_PRESENT: u8 = 0x02;
/// The major version of the runtime that never reports its status correctly.
const NO_INFO_VERSION_PREFIX: &str = "3.";

/// The version of the runtime a device reported.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Valuable)]
pub struct AdsVersion {
	version: u8,
	revision: u8,
	build: i16,
}

impl AdsVersion {
	#[must_use]
	pub const fn new(version: u8, revision: u8, build: i16) -> Self {
		Self {
			version,
			revision,
			build,
		}
	}

	#[must_use]
	pub const fn version(&self) -> u8 {
		self.version
	}

	#[must_use]
	pub const fn revision(&self) -> u8 {
		self.revision
	}

	#[must_use]
	pub const fn build(&self) -> i16 {
		self.build
	}

	/// If no version could be located in the response.
	#[must_use]
	pub const fn is_unknown(&self) -> bool {
		self.version == 0 && self.revision == 0 && self.build == 0
	}
}
impl Display for AdsVersion {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		write!(fmt, "{}.{}.{}", self.version, self.revision, self.build)
	}
}

/// What kind of install answered the search.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Valuable)]
pub enum RuntimeStatus {
	/// The device type tag was missing, or wasn't one we know.
	#[default]
	Unclassified,
	/// A controller actually running the runtime.
	Runtime,
	/// An engineering (development) install.
	Engineering,
	/// A device running major version 3, which never reports this properly.
	NoInfo,
}

impl RuntimeStatus {
	/// Classify the 8 byte device type tag.
	///
	/// A tag that was cut short is never classified.
	#[must_use]
	pub fn from_device_type(tag: &[u8]) -> Self {
		if tag.len() != SEGMENT_TCAT_TYPE_RUNTIME.len() || tag[0] != SEGMENT_TCAT_TYPE_RUNTIME[0] {
			return Self::Unclassified;
		}
		match tag[2] {
			sub_tag if sub_tag == SEGMENT_TCAT_TYPE_RUNTIME[2] => Self::Runtime,
			sub_tag if sub_tag == SEGMENT_TCAT_TYPE_ENGINEERING[2] => Self::Engineering,
			_ => Self::Unclassified,
		}
	}

	/// The short marker shown in tables, `X` for a runtime.
	#[must_use]
	pub const fn marker(&self) -> &'static str {
		match self {
			Self::Runtime => "X",
			Self::NoInfo => "no Info",
			Self::Unclassified | Self::Engineering => "",
		}
	}
}
impl Display for RuntimeStatus {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		write!(fmt, "{}", self.marker())
	}
}

/// Everything we could learn about a single device from its answer.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct RemotePlcInfo {
	/// The address the answer came from, never read from the packet itself.
	address: Ipv4Addr,
	/// The symbolic name of the device.
	name: String,
	/// Only present if the answer was actually a discovery response.
	ams_net_id: Option<AmsNetId>,
	/// A human readable description of the operating system.
	os_version: String,
	tc_version: AdsVersion,
	runtime_status: RuntimeStatus,
	hostname: String,
	comment: String,
	/// A diagnostic chunk of the tail, only useful for debugging firmwares.
	fingerprint: String,
}

impl RemotePlcInfo {
	/// An answer we couldn't read anything from.
	#[must_use]
	pub const fn empty(address: Ipv4Addr) -> Self {
		Self {
			address,
			name: String::new(),
			ams_net_id: None,
			os_version: String::new(),
			tc_version: AdsVersion::new(0, 0, 0),
			runtime_status: RuntimeStatus::Unclassified,
			hostname: String::new(),
			comment: String::new(),
			fingerprint: String::new(),
		}
	}

	/// Decode a datagram received from `address`.
	///
	/// This never fails. A datagram that isn't a discovery response produces
	/// a descriptor with only the address set, and any field whose bytes are
	/// missing stays empty.
	#[must_use]
	pub fn parse(address: Ipv4Addr, packet: &[u8]) -> Self {
		let mut info = Self::empty(address);
		if !is_discovery_response(packet) {
			return info;
		}
		let mut cursor = Cursor::at(packet, ENVELOPE_LENGTH);

		info.ams_net_id = AmsNetId::from_slice(cursor.read(
			6,
			false,
			SEGMENT_PORT.len() + SEGMENT_ROUTE_TYPE_STATIC.len(),
		));

		// The length counts the NUL terminator, which we skip separately.
		let name_length = name_length(cursor.take(NAME_LENGTH_FIELD_LENGTH));
		info.name =
			String::from_utf8_lossy(cursor.read(name_length.saturating_sub(1), false, 1)).into_owned();

		info.runtime_status = RuntimeStatus::from_device_type(cursor.take(SEGMENT_TCAT_TYPE_RUNTIME.len()));

		if let Ok(os_block) = <&[u8; OS_VERSION_FIELD_LENGTH]>::try_from(cursor.take(OS_VERSION_FIELD_LENGTH)) {
			info.os_version = describe_os_version(os_block);
		}

		let tail = TailScan::scan(cursor.peek_remaining());
		if let Some(found) = tail.version {
			info.tc_version = found.version;
		}
		if let Some(hostname) = tail.hostname.as_ref() {
			info.hostname.clone_from(hostname);
		}
		if let Some(fingerprint) = tail.fingerprint.as_ref() {
			info.fingerprint.clone_from(fingerprint);
		}
		if info.tc_version.to_string().starts_with(NO_INFO_VERSION_PREFIX) {
			info.runtime_status = RuntimeStatus::NoInfo;
		}

		let marker = cursor.take(DESCRIPTION_MARKER_LENGTH);
		if marker.len() == DESCRIPTION_MARKER_LENGTH && marker[0] == DESCRIPTION_MARKER_PRESENT {
			let decoded = if tail.is_unicode() {
				decode_utf16le_run(cursor.buffer(), cursor.position())
			} else {
				decode_ascii_run(cursor.buffer(), cursor.position())
			};
			if let Some((comment, _end)) = decoded {
				info.comment = comment;
			}
		}

		info
	}

	#[must_use]
	pub const fn address(&self) -> Ipv4Addr {
		self.address
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub const fn ams_net_id(&self) -> Option<AmsNetId> {
		self.ams_net_id
	}

	#[must_use]
	pub fn os_version(&self) -> &str {
		&self.os_version
	}

	#[must_use]
	pub const fn tc_version(&self) -> AdsVersion {
		self.tc_version
	}

	#[must_use]
	pub const fn runtime_status(&self) -> RuntimeStatus {
		self.runtime_status
	}

	#[must_use]
	pub fn hostname(&self) -> &str {
		&self.hostname
	}

	#[must_use]
	pub fn comment(&self) -> &str {
		&self.comment
	}

	#[must_use]
	pub fn fingerprint(&self) -> &str {
		&self.fingerprint
	}

	/// The AMS Net Id as text, or an empty string if there wasn't one.
	#[must_use]
	pub fn ams_net_id_string(&self) -> String {
		self.ams_net_id.map(|id| id.to_string()).unwrap_or_default()
	}
}
impl Display for RemotePlcInfo {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		write!(
			fmt,
			"{} (aka {}) @ {} os: {} tc-v{}",
			if self.name.is_empty() {
				"<unnamed>"
			} else {
				self.name.as_str()
			},
			self.ams_net_id_string(),
			self.address,
			self.os_version,
			self.tc_version,
		)?;
		if !self.runtime_status.marker().is_empty() {
			write!(fmt, " [{}]", self.runtime_status)?;
		}
		if !self.hostname.is_empty() {
			write!(fmt, " host: {}", self.hostname)?;
		}
		if !self.comment.is_empty() {
			write!(fmt, " \"{}\"", self.comment)?;
		}
		Ok(())
	}
}
impl From<(Ipv4Addr, Bytes)> for RemotePlcInfo {
	fn from((address, packet): (Ipv4Addr, Bytes)) -> Self {
		Self::parse(address, &packet)
	}
}

/// If a datagram carries the envelope of a discovery response.
#[must_use]
pub fn is_discovery_response(packet: &[u8]) -> bool {
	packet.len() >= ENVELOPE_LENGTH
		&& packet[0..4] == SEGMENT_HEADER
		&& packet[4..8] == SEGMENT_END
		&& packet[8..12] == SEGMENT_RESPONSE_DISCOVER
}

/// Read the name length field, which must start with `{5, 0}`.
fn name_length(field: &[u8]) -> usize {
	if field.len() < NAME_LENGTH_FIELD_LENGTH || field[..2] != NAME_LENGTH_TAG {
		return 0;
	}
	usize::from(u16::from_le_bytes([field[2], field[3]]))
}

const REMOTE_PLC_INFO_FIELDS: &[NamedField<'static>] = &[
	NamedField::new("address"),
	NamedField::new("name"),
	NamedField::new("ams_net_id"),
	NamedField::new("os_version"),
	NamedField::new("tc_version"),
	NamedField::new("runtime_status"),
	NamedField::new("hostname"),
	NamedField::new("comment"),
	NamedField::new("fingerprint"),
];
impl Structable for RemotePlcInfo {
	fn definition(&self) -> StructDef<'_> {
		StructDef::new_static("RemotePlcInfo", Fields::Named(REMOTE_PLC_INFO_FIELDS))
	}
}
impl Valuable for RemotePlcInfo {
	fn as_value(&self) -> Value<'_> {
		Value::Structable(self)
	}

	fn visit(&self, visitor: &mut dyn Visit) {
		visitor.visit_named_fields(&NamedValues::new(
			REMOTE_PLC_INFO_FIELDS,
			&[
				Valuable::as_value(&format!("{}", self.address)),
				Valuable::as_value(&self.name),
				Valuable::as_value(&self.ams_net_id_string()),
				Valuable::as_value(&self.os_version),
				Valuable::as_value(&format!("{}", self.tc_version)),
				Valuable::as_value(&self.runtime_status.marker()),
				Valuable::as_value(&self.hostname),
				Valuable::as_value(&self.comment),
				Valuable::as_value(&self.fingerprint),
			],
		));
	}
}
