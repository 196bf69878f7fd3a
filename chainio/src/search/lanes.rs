// SPDX-License-Identifier: Apache-2.0

use std::mem::size_of;
use cfg_if::cfg_if;
use super::{ByteSet, scalar};

cfg_if! {
	if #[cfg(feature = "wide-lanes")] {
		type Lane = u128;
	} else {
		type Lane = u64;
	}
}

/// The number of bytes compared at once.
pub const LANE_WIDTH: usize = size_of::<Lane>();

const LSB: Lane = Lane::from_ne_bytes([0x01; LANE_WIDTH]);
const MSB: Lane = Lane::from_ne_bytes([0x80; LANE_WIDTH]);
const TOP_SHIFT: u32 = Lane::BITS - 8;

/// Broadcasts `byte` across every position of a lane.
#[inline]
const fn splat(byte: u8) -> Lane {
	LSB * byte as Lane
}

/// Loads a lane in little-endian order, so byte `i` of the chunk occupies bits
/// `8i..8i + 8` on every platform.
#[inline]
fn load(chunk: &[u8]) -> Lane {
	Lane::from_le(bytemuck::pod_read_unaligned(chunk))
}

/// Returns a mask with the high bit of each zero byte set. Bits above the lowest
/// zero byte may be spurious, but the lowest set bit is always exact.
#[inline]
const fn zero_bytes(word: Lane) -> Lane {
	word.wrapping_sub(LSB) & !word & MSB
}

/// Returns the byte position of the lowest flag in a non-zero mask.
///
/// Isolating the lowest set bit and subtracting one sets every bit below it: one
/// full byte per position before the match, plus seven bits of the matching byte.
/// Keeping the low bit of each byte and multiplying by [`LSB`] sums those into the
/// top byte, which then holds the position plus one.
#[inline]
const fn lowest_position(mask: Lane) -> usize {
	let lowest = mask & mask.wrapping_neg();
	let counted = ((lowest - 1) & LSB).wrapping_mul(LSB) >> TOP_SHIFT;
	counted as usize - 1
}

/// Splatted candidates, unused slots repeating the last candidate.
struct Splats([Lane; 3]);

impl From<&ByteSet> for Splats {
	fn from(set: &ByteSet) -> Self {
		let [b0, b1, b2] = set.bytes;
		Self([splat(b0), splat(b1), splat(b2)])
	}
}

impl Splats {
	#[inline]
	fn mask(&self, lane: Lane) -> Lane {
		let Self([s0, s1, s2]) = *self;
		zero_bytes(lane ^ s0) | zero_bytes(lane ^ s1) | zero_bytes(lane ^ s2)
	}
}

pub fn find(haystack: &[u8], set: &ByteSet) -> Option<usize> {
	let splats = Splats::from(set);
	let mut chunks = haystack.chunks_exact(LANE_WIDTH);
	for (n, chunk) in chunks.by_ref().enumerate() {
		let mask = splats.mask(load(chunk));
		if mask != 0 {
			return Some(n * LANE_WIDTH + lowest_position(mask))
		}
	}

	let tail = chunks.remainder();
	let offset = haystack.len() - tail.len();
	scalar::find(tail, set).map(|pos| offset + pos)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lowest_position_matches_trailing_zeros() {
		for byte in 0..LANE_WIDTH {
			let flag = 0x80 << (byte * 8);
			// Spurious flags above the lowest must not shift the result.
			let mask = flag | (MSB & !(flag | (flag - 1)));
			assert_eq!(lowest_position(mask), byte);
			assert_eq!(lowest_position(mask), (mask.trailing_zeros() / 8) as usize);
		}
	}

	/// Loads `bytes` as the start of a lane filled out with `fill`.
	fn padded(bytes: &[u8], fill: u8) -> Lane {
		let mut chunk = [fill; LANE_WIDTH];
		chunk[..bytes.len()].copy_from_slice(bytes);
		load(&chunk)
	}

	#[test]
	fn zero_bytes_flags_lowest() {
		let mask = zero_bytes(padded(&[1, 2, 0, 0x01, 0, 7, 8, 9], 1));
		assert_ne!(mask, 0);
		assert_eq!(lowest_position(mask), 2);
		assert_eq!(zero_bytes(load(&[1; LANE_WIDTH])), 0);
		assert_eq!(lowest_position(zero_bytes(padded(&[], 0))), 0);
		assert_eq!(lowest_position(zero_bytes(padded(&[0xFF; LANE_WIDTH - 1], 0))), LANE_WIDTH - 1);
	}

	#[test]
	fn splat_mask() {
		let splats = Splats::from(&ByteSet::two(b'\r', b'\n'));
		let lane = padded(b"abc\ndef\r", b'.');
		assert_eq!(lowest_position(splats.mask(lane)), 3);
		assert_eq!(splats.mask(padded(b"abcdefgh", b'.')), 0);
	}
}
