//! A read position over a single received datagram.

/// Tracks how far into a datagram we've read.
///
/// A cursor is created for exactly one parse, and thrown away afterwards.
/// Reads are clamped to the end of the buffer: asking for more bytes than
/// are left returns a shorter slice rather than failing, because truncated
/// fields are expected from some firmwares.
#[derive(Clone, Debug)]
pub(crate) struct Cursor<'buff> {
	buffer: &'buff [u8],
	position: usize,
}

impl<'buff> Cursor<'buff> {
	pub(crate) const fn new(buffer: &'buff [u8]) -> Self {
		Self {
			buffer,
			position: 0,
		}
	}

	/// Start reading at a specific position.
	pub(crate) const fn at(buffer: &'buff [u8], position: usize) -> Self {
		Self { buffer, position }
	}

	/// The current read position, which may point past the end of the buffer
	/// if a skip went further than the data did.
	pub(crate) const fn position(&self) -> usize {
		self.position
	}

	/// The whole datagram this cursor reads from.
	pub(crate) const fn buffer(&self) -> &'buff [u8] {
		self.buffer
	}

	/// Read up to `length` bytes.
	///
	/// When `peek` is false the position moves forward by `length` plus
	/// `skip_after`, where `length` has already been clamped to what was
	/// actually available. When `peek` is true the position doesn't move at
	/// all.
	pub(crate) fn read(&mut self, length: usize, peek: bool, skip_after: usize) -> &'buff [u8] {
		let start = self.position.min(self.buffer.len());
		let clamped = length.min(self.buffer.len() - start);
		let chunk = &self.buffer[start..start + clamped];
		if !peek {
			self.position = self.position.saturating_add(clamped + skip_after);
		}
		chunk
	}

	/// Read `length` bytes, and move past them.
	pub(crate) fn take(&mut self, length: usize) -> &'buff [u8] {
		self.read(length, false, 0)
	}

	/// Everything that hasn't been read yet, without moving.
	pub(crate) fn peek_remaining(&mut self) -> &'buff [u8] {
		self.read(self.buffer.len().saturating_sub(self.position), true, 0)
	}
}
