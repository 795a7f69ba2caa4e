//! Decoders for the free-text comment at the end of a discovery response.
//!
//! Depending on the firmware the comment is either a NUL terminated run of
//! ASCII, or NUL terminated UTF-16LE. Which one it is isn't marked next to
//! the text itself, it comes from a flag byte found by the tail scanner.

/// Decode a NUL terminated ASCII run starting at `start`.
///
/// Stops at the first NUL byte or the end of the buffer. Returns the decoded
/// text along with the position the run ended at, or `None` if the run was
/// empty.
#[must_use]
pub fn decode_ascii_run(buffer: &[u8], start: usize) -> Option<(String, usize)> {
	let run = buffer.get(start..)?;
	let length = run.iter().position(|byte| *byte == 0).unwrap_or(run.len());
	if length == 0 {
		return None;
	}
	Some((
		String::from_utf8_lossy(&run[..length]).into_owned(),
		start + length,
	))
}

/// Decode a UTF-16LE run starting at `start`, 2 bytes at a time, until a
/// `0x0000` code unit or the end of the buffer.
///
/// Every code unit above 127 is replaced with `?`. Returns the decoded text
/// along with the position the run ended at, or `None` if the run was empty.
#[must_use]
pub fn decode_utf16le_run(buffer: &[u8], start: usize) -> Option<(String, usize)> {
	if start >= buffer.len() {
		return None;
	}

	let mut end = start;
	while end + 1 < buffer.len() {
		if buffer[end] == 0 && buffer[end + 1] == 0 {
			break;
		}
		end += 2;
	}
	if end <= start {
		return None;
	}

	Some((utf16le_to_ascii(&buffer[start..end]), end))
}

/// Squash UTF-16LE into ASCII, a dangling odd byte is ignored.
#[must_use]
pub fn utf16le_to_ascii(bytes: &[u8]) -> String {
	bytes
		.chunks_exact(2)
		.map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
		.take_while(|code_unit| *code_unit != 0)
		.map(|code_unit| match u8::try_from(code_unit) {
			Ok(ascii) if ascii <= 127 => char::from(ascii),
			_ => '?',
		})
		.collect()
}

#[cfg(test)]
mod unit_tests {
	use super::*;

	#[test]
	pub fn ascii_runs() {
		assert_eq!(
			decode_ascii_run(&[0x41, 0x42, 0x00], 0),
			Some(("AB".to_owned(), 2)),
		);
		assert_eq!(
			decode_ascii_run(&[0xFF, 0x41, 0x42], 1),
			Some(("AB".to_owned(), 3)),
			"An unterminated run should stop at the end of the buffer.",
		);
		assert_eq!(decode_ascii_run(&[0x00, 0x41], 0), None);
		assert_eq!(decode_ascii_run(&[0x41], 1), None);
		assert_eq!(decode_ascii_run(&[0x41], 7), None);
	}

	#[test]
	pub fn utf16_runs() {
		assert_eq!(
			decode_utf16le_run(&[0x41, 0x00, 0x42, 0x00, 0x00, 0x00], 0),
			Some(("AB".to_owned(), 4)),
		);
		assert_eq!(
			decode_utf16le_run(&[0x41, 0x00, 0xE4, 0x00, 0x3A, 0x26, 0x00, 0x00], 0),
			Some(("A??".to_owned(), 6)),
			"Anything outside of ASCII should turn into a question mark.",
		);
		assert_eq!(
			decode_utf16le_run(&[0x41, 0x00, 0x42], 0),
			Some(("A".to_owned(), 2)),
			"A dangling odd byte should be ignored.",
		);
		assert_eq!(decode_utf16le_run(&[0x00, 0x00, 0x41, 0x00], 0), None);
		assert_eq!(decode_utf16le_run(&[0x41, 0x00], 2), None);
	}
}
