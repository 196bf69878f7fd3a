// SPDX-License-Identifier: Apache-2.0

//! Delimiter search within contiguous byte runs. Cursors use this to scan each
//! block's published window for any of up to three candidate bytes.
//!
//! Runs are compared in lanes of [`LANE_WIDTH`] bytes: each lane is loaded as a
//! little-endian word, XOR-ed against each candidate broadcast across the word,
//! and reduced to a mask with one flag bit per matching byte. A zero mask skips
//! the whole lane; otherwise the lowest flag gives the earliest match. Tails
//! shorter than a lane fall back to a byte-by-byte scan. Both paths return the
//! same position for any input.
//!
//! The `scalar-seek` feature routes every search through the byte-by-byte path.
//! The `wide-lanes` feature widens lanes from 8 to 16 bytes.

mod lanes;
mod scalar;

use cfg_if::cfg_if;
pub use lanes::LANE_WIDTH;

/// A set of one to three candidate bytes. Candidates may repeat.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ByteSet {
	bytes: [u8; 3],
	len: usize,
}

impl ByteSet {
	/// Creates a set matching `byte`.
	pub const fn one(byte: u8) -> Self {
		Self { bytes: [byte; 3], len: 1 }
	}

	/// Creates a set matching either byte.
	pub const fn two(byte0: u8, byte1: u8) -> Self {
		Self { bytes: [byte0, byte1, byte1], len: 2 }
	}

	/// Creates a set matching any of three bytes.
	pub const fn three(byte0: u8, byte1: u8, byte2: u8) -> Self {
		Self { bytes: [byte0, byte1, byte2], len: 3 }
	}

	/// Returns the candidate bytes, in argument order.
	pub fn bytes(&self) -> &[u8] { &self.bytes[..self.len] }

	/// Returns `true` if `byte` is a candidate.
	#[inline]
	pub fn contains(&self, byte: u8) -> bool {
		let [b0, b1, b2] = self.bytes;
		// Unused slots repeat the last candidate, so all three can be compared.
		byte == b0 || byte == b1 || byte == b2
	}
}

impl From<u8> for ByteSet {
	fn from(byte: u8) -> Self { Self::one(byte) }
}

impl From<(u8, u8)> for ByteSet {
	fn from((byte0, byte1): (u8, u8)) -> Self { Self::two(byte0, byte1) }
}

impl From<(u8, u8, u8)> for ByteSet {
	fn from((byte0, byte1, byte2): (u8, u8, u8)) -> Self { Self::three(byte0, byte1, byte2) }
}

impl From<[u8; 1]> for ByteSet {
	fn from([byte]: [u8; 1]) -> Self { Self::one(byte) }
}

impl From<[u8; 2]> for ByteSet {
	fn from([byte0, byte1]: [u8; 2]) -> Self { Self::two(byte0, byte1) }
}

impl From<[u8; 3]> for ByteSet {
	fn from([byte0, byte1, byte2]: [u8; 3]) -> Self { Self::three(byte0, byte1, byte2) }
}

/// Finds the position of the first byte in `haystack` contained in `set`.
#[inline]
pub fn find(haystack: &[u8], set: &ByteSet) -> Option<usize> {
	cfg_if! {
		if #[cfg(feature = "scalar-seek")] {
			find_scalar(haystack, set)
		} else {
			find_lanes(haystack, set)
		}
	}
}

/// Finds the first match lane-by-lane, scanning the tail byte-by-byte.
pub fn find_lanes(haystack: &[u8], set: &ByteSet) -> Option<usize> {
	lanes::find(haystack, set)
}

/// Finds the first match byte-by-byte.
pub fn find_scalar(haystack: &[u8], set: &ByteSet) -> Option<usize> {
	scalar::find(haystack, set)
}

#[cfg(test)]
mod tests {
	use quickcheck_macros::quickcheck;
	use super::*;

	#[test]
	fn earliest_wins() {
		let haystack = b"abcdefghij:klmnop\r\nqrstuv";
		let set = ByteSet::three(b'\n', b'\r', b':');
		assert_eq!(find_lanes(haystack, &set), Some(10));
		assert_eq!(find_scalar(haystack, &set), Some(10));
	}

	#[test]
	fn lane_boundaries() {
		for len in 0..40 {
			for pos in 0..len {
				let mut haystack = vec![b'.'; len];
				haystack[pos] = b'!';
				let set = ByteSet::one(b'!');
				assert_eq!(find_lanes(&haystack, &set), Some(pos), "len {len}, pos {pos}");
				assert_eq!(find_scalar(&haystack, &set), Some(pos), "len {len}, pos {pos}");
			}
			assert_eq!(find_lanes(&vec![b'.'; len], &ByteSet::one(b'!')), None);
		}
	}

	#[test]
	fn high_and_zero_bytes() {
		let haystack = [0x80, 0xFF, 0x01, 0x00, 0x7F, 0x80, 0x00, 0x01, 0xFE];
		for byte in [0x00, 0x01, 0x7F, 0x80, 0xFE, 0xFF] {
			let set = ByteSet::one(byte);
			assert_eq!(find_lanes(&haystack, &set), find_scalar(&haystack, &set), "byte {byte:#X}");
		}
	}

	#[quickcheck]
	fn lanes_match_scalar(haystack: Vec<u8>, b0: u8, b1: u8, b2: u8) -> bool {
		[ByteSet::one(b0), ByteSet::two(b0, b1), ByteSet::three(b0, b1, b2)]
			.iter()
			.all(|set| find_lanes(&haystack, set) == find_scalar(&haystack, set))
	}
}
