//! Heuristics for the undocumented tail of a discovery response.
//!
//! After the OS version block a response may carry a hostname, one or more
//! version fingerprints, and a comment. None of these are length prefixed,
//! and which ones are present depends on the firmware. What we know about
//! them comes from captured packets, so the offsets used here are kept
//! exactly as observed (333, 337, 339, 69, 65), along with the order that
//! bytes are copied in. "Cleaning up" the math is very likely to break real
//! devices.
//!
//! Every read in here goes through [`Tail::get`], which returns `0` for any
//! out of bounds index, so nothing in this module can fail.

use crate::ads::proto::AdsVersion;

/// Tails at least this long (minus the 4 byte trailer) may carry a hostname.
const HOSTNAME_SECTION_MIN_BODY: isize = 333;
/// Tails must be longer than this to carry a hostname.
const HOSTNAME_SECTION_MIN_LENGTH: usize = 339;
/// The index of the sentinel that says a hostname is actually there.
const HOSTNAME_SENTINEL_INDEX: usize = 337;
/// The value the sentinel has to have.
const HOSTNAME_SENTINEL: u8 = 20;
/// The index of the hostname length, which counts one byte too many.
const HOSTNAME_LENGTH_INDEX: usize = 339;
/// The size of the scratch buffer the hostname gets copied into, also the
/// (exclusive) maximum hostname length.
const HOSTNAME_SCRATCH_LENGTH: usize = 253;
/// How far before a version flag the newer fingerprint block starts.
const FINGERPRINT_BACK_OFFSET: isize = 69;
/// The size of the diagnostic fingerprint window.
const FINGERPRINT_WINDOW_LENGTH: isize = 65;
/// Tails shorter than this don't get a diagnostic fingerprint.
const FINGERPRINT_MIN_TAIL_LENGTH: usize = 80;
/// The distance between two candidate positions while scanning for a version.
const SCAN_STEP: isize = 4;

/// A view over the tail of a response where every out of bounds read is a
/// zero.
#[derive(Clone, Copy, Debug)]
pub struct Tail<'buff>(&'buff [u8]);

impl<'buff> Tail<'buff> {
	#[must_use]
	pub const fn new(bytes: &'buff [u8]) -> Self {
		Self(bytes)
	}

	#[must_use]
	pub const fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub const fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Read a single byte, or `0` if `index` is outside of the tail.
	#[must_use]
	pub fn get(&self, index: isize) -> u8 {
		usize::try_from(index)
			.ok()
			.and_then(|idx| self.0.get(idx))
			.copied()
			.unwrap_or(0)
	}

	fn signed_len(&self) -> isize {
		isize::try_from(self.0.len()).unwrap_or(isize::MAX)
	}

	/// If the tail is long enough to carry a hostname section at all.
	///
	/// This does not check the sentinel, the offset version scan and the
	/// fingerprint window only look at the length.
	#[must_use]
	pub fn is_long_enough_for_hostname(&self) -> bool {
		self.signed_len() - 4 > HOSTNAME_SECTION_MIN_BODY
			&& self.len() > HOSTNAME_SECTION_MIN_LENGTH
	}

	/// The (one too long) hostname length byte.
	#[must_use]
	pub fn hostname_length(&self) -> u8 {
		self.get(HOSTNAME_LENGTH_INDEX as isize)
	}

	/// If there's a `{3, _, 4}` version marker starting at `index`.
	fn has_version_marker_at(&self, index: isize) -> bool {
		self.get(index) == 3 && self.get(index + 2) == 4
	}

	/// Read the version that follows a version marker at `index`.
	fn version_after_marker(&self, index: isize) -> AdsVersion {
		AdsVersion::new(
			self.get(index + 4),
			self.get(index + 5),
			i16::from_le_bytes([self.get(index + 6), self.get(index + 7)]),
		)
	}
}

/// Which pattern located a version fingerprint.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum FingerprintMarker {
	/// The marker sits directly at the scan position (older runtimes).
	Legacy,
	/// The marker sits a fixed 69 bytes before the scan position.
	Offset,
	/// The marker sits 69 bytes plus the hostname length before the scan
	/// position.
	OffsetPastHostname,
}

/// A version fingerprint we located in a tail.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct FingerprintMatch {
	/// The pattern that matched.
	pub marker: FingerprintMarker,
	/// The index of the scan position the pattern matched at.
	pub scan_index: isize,
	/// The version that followed the marker.
	pub version: AdsVersion,
	/// If the comment (if any) is encoded as UTF-16LE.
	pub is_unicode: bool,
}

/// A test for one kind of version marker at a particular scan position.
pub type CandidateTester = fn(&Tail<'_>, isize) -> Option<FingerprintMatch>;

/// Every kind of version marker, in the order they're tried at each scan
/// position. The first one that matches ends the scan.
pub const VERSION_CANDIDATES: [CandidateTester; 3] = [
	legacy_marker,
	offset_marker,
	offset_marker_past_hostname,
];

/// The marker sits right at the scan position.
#[must_use]
pub fn legacy_marker(tail: &Tail<'_>, index: isize) -> Option<FingerprintMatch> {
	if !tail.has_version_marker_at(index) {
		return None;
	}
	Some(FingerprintMatch {
		marker: FingerprintMarker::Legacy,
		scan_index: index,
		version: tail.version_after_marker(index),
		is_unicode: false,
	})
}

/// The marker sits 69 bytes before the scan position. The byte 4 after the
/// scan position says whether the comment is UTF-16.
#[must_use]
pub fn offset_marker(tail: &Tail<'_>, index: isize) -> Option<FingerprintMatch> {
	marker_at_back_offset(tail, index, FINGERPRINT_BACK_OFFSET, FingerprintMarker::Offset)
}

/// Same as [`offset_marker`], but the hostname sits between the marker and
/// the scan position. Only tried on tails long enough to hold a hostname.
#[must_use]
pub fn offset_marker_past_hostname(tail: &Tail<'_>, index: isize) -> Option<FingerprintMatch> {
	if !tail.is_long_enough_for_hostname() {
		return None;
	}
	marker_at_back_offset(
		tail,
		index,
		FINGERPRINT_BACK_OFFSET + isize::from(tail.hostname_length()),
		FingerprintMarker::OffsetPastHostname,
	)
}

fn marker_at_back_offset(
	tail: &Tail<'_>,
	index: isize,
	back_offset: isize,
	marker: FingerprintMarker,
) -> Option<FingerprintMatch> {
	let marker_index = index - back_offset;
	if !tail.has_version_marker_at(marker_index) {
		return None;
	}
	Some(FingerprintMatch {
		marker,
		scan_index: index,
		version: tail.version_after_marker(marker_index),
		is_unicode: tail.get(index + 4) > 2,
	})
}

/// Walk backwards over the tail 4 bytes at a time, starting 4 bytes from the
/// end, stopping before index 0. At each position every candidate in
/// [`VERSION_CANDIDATES`] is tried in order.
#[must_use]
pub fn scan_for_version(tail: &Tail<'_>) -> Option<FingerprintMatch> {
	let mut index = tail.signed_len() - SCAN_STEP;
	while index > 0 {
		for candidate in VERSION_CANDIDATES {
			if let Some(found) = candidate(tail, index) {
				return Some(found);
			}
		}
		index -= SCAN_STEP;
	}
	None
}

/// Copy the hostname out of the end of the tail.
///
/// Only attempted when the tail is long enough, and the sentinel at index 337
/// is `20`. The length byte at 339 has to be in `(1, 253)`. Bytes are copied
/// walking backwards from 2 before the end into a 253 byte scratch buffer,
/// and the hostname is then `scratch[2..2 + (length - 1)]`.
#[must_use]
pub fn scan_for_hostname(tail: &Tail<'_>) -> Option<String> {
	if !tail.is_long_enough_for_hostname()
		|| tail.get(HOSTNAME_SENTINEL_INDEX as isize) != HOSTNAME_SENTINEL
	{
		return None;
	}
	let hostname_length = usize::from(tail.hostname_length());
	if hostname_length <= 1 || hostname_length >= HOSTNAME_SCRATCH_LENGTH {
		return None;
	}

	let mut scratch = [0_u8; HOSTNAME_SCRATCH_LENGTH];
	let walk_start = tail.len() - 2;
	let walk_stop = walk_start - hostname_length;
	let mut index = walk_start;
	while index > walk_stop {
		scratch[index - walk_stop] = tail.0[index];
		index -= 1;
	}

	Some(String::from_utf8_lossy(&scratch[2..2 + (hostname_length - 1)]).into_owned())
}

/// Grab the 65 byte diagnostic window that sits before the hostname (or
/// before the last 2 bytes when there's no room for one), minus its first
/// 2 bytes.
#[must_use]
pub fn scan_for_fingerprint(tail: &Tail<'_>) -> Option<String> {
	if tail.len() < FINGERPRINT_MIN_TAIL_LENGTH {
		return None;
	}

	let length = tail.signed_len();
	let (start, end) = if tail.is_long_enough_for_hostname() {
		let hostname_length = isize::from(tail.hostname_length());
		(
			length - 6 - FINGERPRINT_WINDOW_LENGTH - hostname_length,
			length - 6 - hostname_length,
		)
	} else {
		(length - 2 - FINGERPRINT_WINDOW_LENGTH, length - 2)
	};
	let start = usize::try_from(start).ok()?;
	let end = usize::try_from(end).ok()?;
	let window = tail.0.get(start..end)?;
	window
		.get(2..)
		.map(|rest| String::from_utf8_lossy(rest).into_owned())
}

/// Everything the heuristics managed to pull out of a tail.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct TailScan {
	pub hostname: Option<String>,
	pub fingerprint: Option<String>,
	pub version: Option<FingerprintMatch>,
}

impl TailScan {
	/// Run every heuristic over a tail.
	#[must_use]
	pub fn scan(bytes: &[u8]) -> Self {
		let tail = Tail::new(bytes);
		Self {
			hostname: scan_for_hostname(&tail),
			fingerprint: scan_for_fingerprint(&tail),
			version: scan_for_version(&tail),
		}
	}

	/// If the comment should be decoded as UTF-16LE.
	#[must_use]
	pub fn is_unicode(&self) -> bool {
		self.version.is_some_and(|found| found.is_unicode)
	}
}

#[cfg(test)]
mod unit_tests {
	use super::*;

	#[test]
	pub fn out_of_bounds_reads_are_zero() {
		let tail = Tail::new(&[1, 2, 3]);
		assert_eq!(tail.get(-1), 0);
		assert_eq!(tail.get(0), 1);
		assert_eq!(tail.get(2), 3);
		assert_eq!(tail.get(3), 0);
		assert_eq!(tail.get(isize::MAX), 0);
	}

	#[test]
	pub fn finds_legacy_marker() {
		let mut bytes = vec![0_u8; 40];
		bytes[16..24].copy_from_slice(&[3, 0xAA, 4, 0xBB, 2, 11, 0, 1]);
		let found = scan_for_version(&Tail::new(&bytes)).expect("Failed to find legacy marker!");

		assert_eq!(found.marker, FingerprintMarker::Legacy);
		assert_eq!(found.scan_index, 16);
		assert_eq!(found.version, AdsVersion::new(2, 11, 256));
		assert!(!found.is_unicode);
	}

	#[test]
	pub fn scan_only_visits_every_fourth_byte_from_the_end() {
		// Length 41 means we visit 37, 33, ..., 1. A marker at 16 is never seen.
		let mut bytes = vec![0_u8; 41];
		bytes[16..24].copy_from_slice(&[3, 0, 4, 0, 2, 11, 0, 1]);
		assert!(scan_for_version(&Tail::new(&bytes)).is_none());

		// But one at 17 is.
		let mut bytes = vec![0_u8; 41];
		bytes[17..25].copy_from_slice(&[3, 0, 4, 0, 2, 11, 0, 1]);
		assert_eq!(
			scan_for_version(&Tail::new(&bytes)).map(|found| found.scan_index),
			Some(17),
		);
	}

	#[test]
	pub fn never_looks_at_index_zero() {
		let mut bytes = vec![0_u8; 8];
		bytes[..8].copy_from_slice(&[3, 0, 4, 0, 2, 11, 0, 1]);
		assert!(scan_for_version(&Tail::new(&bytes)).is_none());
	}

	#[test]
	pub fn finds_offset_marker_and_unicode_flag() {
		let mut bytes = vec![0_u8; 120];
		// Scan positions: 116, 112, ..., 100. Put the marker 69 before 100.
		bytes[31..39].copy_from_slice(&[3, 0, 4, 0, 3, 1, 0xDA, 0x0F]);
		bytes[104] = 3;
		let found = scan_for_version(&Tail::new(&bytes)).expect("Failed to find offset marker!");

		assert_eq!(found.marker, FingerprintMarker::Offset);
		assert_eq!(found.scan_index, 100);
		assert_eq!(found.version, AdsVersion::new(3, 1, 4058));
		assert!(found.is_unicode);

		bytes[104] = 2;
		let found = scan_for_version(&Tail::new(&bytes)).expect("Failed to find offset marker!");
		assert!(!found.is_unicode, "A flag of 2 or less means ASCII.");
	}

	#[test]
	pub fn legacy_marker_wins_at_the_same_position() {
		let mut bytes = vec![0_u8; 120];
		bytes[31..39].copy_from_slice(&[3, 0, 4, 0, 3, 1, 0xDA, 0x0F]);
		bytes[100..108].copy_from_slice(&[3, 0, 4, 0, 2, 11, 0, 1]);
		let found = scan_for_version(&Tail::new(&bytes)).expect("Failed to find any marker!");

		assert_eq!(found.marker, FingerprintMarker::Legacy);
		assert_eq!(found.version, AdsVersion::new(2, 11, 256));
	}

	#[test]
	pub fn hostname_offset_needs_a_long_tail() {
		let tail_bytes = vec![0_u8; 200];
		assert!(offset_marker_past_hostname(&Tail::new(&tail_bytes), 150).is_none());

		let mut bytes = vec![0_u8; 400];
		bytes[339] = 10;
		// Marker at 300 - 69 - 10.
		bytes[221..229].copy_from_slice(&[3, 0, 4, 0, 3, 1, 0xE8, 0x03]);
		let found = offset_marker_past_hostname(&Tail::new(&bytes), 300)
			.expect("Failed to find hostname shifted marker!");
		assert_eq!(found.marker, FingerprintMarker::OffsetPastHostname);
		assert_eq!(found.version, AdsVersion::new(3, 1, 1000));
	}

	#[test]
	pub fn hostname_is_copied_from_the_end() {
		let mut bytes = vec![0_u8; 400];
		bytes[337] = HOSTNAME_SENTINEL;
		// "plc-01" plus the one extra byte the length counts.
		bytes[339] = 7;
		bytes[394..400].copy_from_slice(b"plc-01");
		// The copy covers tail[len - hLen .. len - 1], so we're one byte early.
		assert_eq!(
			scan_for_hostname(&Tail::new(&bytes)).as_deref(),
			Some("\0plc-0"),
		);

		bytes[393..399].copy_from_slice(b"plc-01");
		bytes[399] = 0;
		assert_eq!(
			scan_for_hostname(&Tail::new(&bytes)).as_deref(),
			Some("plc-01"),
		);
	}

	#[test]
	pub fn hostname_guards() {
		let mut bytes = vec![0_u8; 400];
		bytes[339] = 7;
		assert!(scan_for_hostname(&Tail::new(&bytes)).is_none(), "Sentinel is missing.");

		bytes[337] = HOSTNAME_SENTINEL;
		bytes[339] = 1;
		assert!(scan_for_hostname(&Tail::new(&bytes)).is_none(), "Length must be above 1.");
		bytes[339] = 253;
		assert!(scan_for_hostname(&Tail::new(&bytes)).is_none(), "Length must be below 253.");

		let mut short = vec![0_u8; 339];
		short[337] = HOSTNAME_SENTINEL;
		assert!(scan_for_hostname(&Tail::new(&short)).is_none(), "Tail must be over 339 bytes.");
	}

	#[test]
	pub fn fingerprint_windows() {
		assert!(scan_for_fingerprint(&Tail::new(&[0x41; 79])).is_none());

		let mut bytes = vec![0x41_u8; 100];
		bytes[98] = 0x42;
		// Window is [33, 98), we drop the first 2 bytes.
		let fingerprint = scan_for_fingerprint(&Tail::new(&bytes)).expect("No fingerprint?");
		assert_eq!(fingerprint.len(), 63);
		assert!(fingerprint.chars().all(|character| character == 'A'));

		let mut bytes = vec![0x41_u8; 400];
		bytes[339] = 10;
		bytes[384] = 0x42;
		// Window is [400 - 6 - 65 - 10, 400 - 6 - 10) = [319, 384).
		let fingerprint = scan_for_fingerprint(&Tail::new(&bytes)).expect("No fingerprint?");
		assert_eq!(fingerprint.len(), 63);
		assert!(!fingerprint.contains('B'));
	}

	#[test]
	pub fn empty_tail_finds_nothing() {
		let scanned = TailScan::scan(&[]);
		assert_eq!(scanned, TailScan::default());
		assert!(!scanned.is_unicode());
	}
}
