//! Static tables that turn the compact operating system identifiers inside of
//! a discovery response into something a human can read.
//!
//! A response carries a 12 byte OS version block. Two of those bytes form the
//! "OS key" (`block[0] << 8 | block[4]`), and two more form a "build key"
//! (`block[8] << 8 | block[9]`) that only means something for desktop Windows.

/// Look up the name of an operating system by its OS key.
#[must_use]
pub const fn os_name(os_key: u16) -> Option<&'static str> {
	match os_key {
		0x0A00 => Some("Windows"),
		0x0700 => Some("Win CE (7.0)"),
		0x0602 => Some("Win 8/8.1/10"),
		0x0601 => Some("Win 7"),
		0x0600 => Some("Win CE (6.0)"),
		0x0500 => Some("Win CE (5.0)"),
		0x0501 => Some("Win XP"),
		0x0009 => Some("RTOS"),
		_ => None,
	}
}

/// Look up a desktop Windows release by its build key.
#[must_use]
pub const fn os_build_name(build_key: u16) -> Option<&'static str> {
	match build_key {
		0x5866 => Some("11 (26200) 25H2"),
		0xF465 => Some("11 (26100) 24H2"),
		0x6758 => Some("11 (22631) 23H2"),
		0x5D58 => Some("11 (22621) 22H2"),
		0x654A => Some("10 (19045) 22H2"),
		0x644A => Some("10 (19044) 21H2"),
		0x634A => Some("10 (19043) 21H1"),
		0x624A => Some("10 (19042) 20H2"),
		0x614A => Some("10 (19041) 2004"),
		0x4447 => Some("10 (18363) 1909"),
		0xBA47 => Some("10 (18362) 1903"),
		0x6345 => Some("10 (17763) 1809"),
		0xEE42 => Some("10 (17134) 1803"),
		0xAB3F => Some("10 (16299) 1709"),
		0xD73A => Some("10 (15063) 1703"),
		0x3938 => Some("10 (14393) 1607"),
		0x5A29 => Some("10 (10586) 1511"),
		0x0028 => Some("10 (10240) 1507"),
		_ => None,
	}
}

/// The name of an operating system, or its key as uppercase hex when we
/// don't know it.
#[must_use]
pub fn os_name_or_hex(os_key: u16) -> String {
	os_name(os_key).map_or_else(|| format!("{os_key:02X}"), ToOwned::to_owned)
}

/// The name of a Windows build, or its key as uppercase hex when we don't
/// know it.
#[must_use]
pub fn os_build_name_or_hex(build_key: u16) -> String {
	os_build_name(build_key).map_or_else(|| format!("{build_key:02X}"), ToOwned::to_owned)
}

/// Render the 12 byte OS version block of a response.
///
/// Desktop Windows gets its build appended. Everything else is bucketed by
/// the numeric range its OS key falls into, in this order:
///
/// - above `0x0C00`: TwinCAT/BSD.
/// - between `0x0601` and `0x0700` (exclusive): Linux.
/// - below `0x0500`: the real time OS.
/// - otherwise: whatever [`os_name_or_hex`] says.
#[must_use]
pub fn describe_os_version(block: &[u8; 12]) -> String {
	let os_key = u16::from_be_bytes([block[0], block[4]]);
	let build_key = u16::from_be_bytes([block[8], block[9]]);
	let os = os_name_or_hex(os_key);

	if os.contains("Windows") {
		format!("{os} {}", os_build_name_or_hex(build_key))
	} else if os_key > 0x0C00 {
		format!("TwinCAT/BSD ({}.{})", block[0], block[4])
	} else if os_key > 0x0601 && os_key < 0x0700 {
		format!("Linux ({}.{})", block[0], block[4])
	} else if os_key < 0x0500 {
		format!("TC/RTOS ({}.{})", block[0], block[4])
	} else {
		os
	}
}
