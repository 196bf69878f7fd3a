// SPDX-License-Identifier: Apache-2.0

mod copy;
mod seek;
mod span;

pub use span::Chunks;

use std::{fmt, ptr};
use std::fmt::{Debug, Formatter};
use all_asserts::{assert_ge, assert_le};
use num_traits::{NumCast, PrimInt};
use tracing::debug;
use crate::{Block, Error, ErrorKind, OperationKind, Result};

/// A position within a block chain: a reference to a block and an absolute offset
/// into its storage.
///
/// Cursors are cheap to copy and don't own the blocks they point to. Reading
/// operations ([`take`], [`skip`], the `seek` family) move the cursor in place and
/// transparently cross into linked blocks. [`copy_to`] leaves the cursor where it
/// is and returns a new one past the copied bytes instead. Writing operations
/// ([`put`], the `copy_from` family) append at the chain's tail, so they need the
/// cursor to sit exactly at its block's write frontier.
///
/// The offset normally lies in `[start, end]` of its block, `end` meaning the block
/// has no more data and the next one should be checked.
///
/// [`take`]: Self::take
/// [`skip`]: Self::skip
/// [`copy_to`]: Self::copy_to
/// [`put`]: Self::put
#[derive(Copy, Clone, Default)]
pub struct Cursor<'a> {
	block: Option<&'a Block>,
	index: usize,
}

impl<'a> Cursor<'a> {
	/// Creates a cursor at the start of `block`'s valid window.
	#[inline]
	pub fn new(block: &'a Block) -> Self {
		Self::at(block, block.start())
	}

	/// Creates a cursor at an absolute `index` within `block`. Panics if `index` is
	/// before the block start or past its capacity.
	#[inline]
	pub fn at(block: &'a Block, index: usize) -> Self {
		assert_ge!(index, block.start());
		assert_le!(index, block.capacity());
		Self { block: Some(block), index }
	}

	/// Returns `true` if the cursor holds no block.
	#[inline]
	pub fn is_default(&self) -> bool { self.block.is_none() }

	/// Returns the block the cursor points into.
	#[inline]
	pub fn block(&self) -> Option<&'a Block> { self.block }

	/// Returns the absolute offset within the block.
	#[inline]
	pub fn index(&self) -> usize { self.index }

	/// Returns `true` if no byte is available at or after the cursor anywhere in the
	/// chain.
	pub fn is_end(&self) -> bool {
		let Some(mut block) = self.block else { return true };
		let mut index = self.index;
		loop {
			if index < block.end() {
				return false
			}

			let Some(next) = block.next() else { return true };
			block = next;
			index = next.start();
		}
	}

	/// Returns the next byte and advances past it, or `None` if the chain has no
	/// more data. The cursor doesn't move if `None` is returned.
	pub fn take(&mut self) -> Option<u8> {
		let (block, index) = self.locate()?;
		self.block = Some(block);
		self.index = index + 1;
		Some(block.byte(index))
	}

	/// Returns the next byte without advancing, or `None` if the chain has no more
	/// data.
	pub fn peek(&self) -> Option<u8> {
		let (block, index) = self.locate()?;
		Some(block.byte(index))
	}

	/// Advances by exactly `count` bytes. Fails with [`OutOfRange`] if fewer bytes
	/// remain in the chain, leaving the cursor in place.
	///
	/// [`OutOfRange`]: ErrorKind::OutOfRange
	pub fn skip(&mut self, count: usize) -> Result {
		if count == 0 {
			return Ok(())
		}

		let out_of_range = || {
			debug!(count, "skip past the end of the chain");
			Error::of(OperationKind::Skip, ErrorKind::OutOfRange)
		};

		let mut block = self.block.ok_or_else(out_of_range)?;
		let mut index = self.index;
		let mut remaining = count;
		loop {
			let available = block.end().saturating_sub(index);
			if remaining <= available {
				self.block = Some(block);
				self.index = index + remaining;
				return Ok(())
			}

			remaining -= available;
			block = block.next().ok_or_else(out_of_range)?;
			index = block.start();
		}
	}

	/// Writes one byte at the cursor and advances past it, moving into the next
	/// linked block if the current one is full. Never leases; returns `false`,
	/// leaving the cursor in place, if no linked block has room or the cursor isn't
	/// at a write frontier.
	pub fn put(&mut self, byte: u8) -> bool {
		let Some(mut block) = self.block else { return false };
		let mut index = self.index;
		loop {
			if index != block.end() {
				debug!(index, end = block.end(), "put away from the write frontier");
				return false
			}

			if !block.is_full() {
				let Ok(mut guard) = block.lock(OperationKind::Put) else { return false };
				if guard.frontier() != index || !guard.push(byte) {
					return false
				}

				self.block = Some(block);
				self.index = index + 1;
				return true
			}

			let Some(next) = block.next() else { return false };
			block = next;
			index = next.start();
		}
	}

	/// Reads 8 bytes at the cursor as a little-endian integer without advancing.
	/// The bytes may span the current block and the one linked after it, but no
	/// further. Returns `None` if fewer bytes are available there.
	pub fn try_peek_long(&self) -> Option<u64> {
		const WIDTH: usize = 8;

		/// Folds up to 8 bytes into a little-endian integer.
		fn fold_le(bytes: &[u8]) -> u64 {
			bytes.iter().rev().fold(0, |value, &b| value << 8 | b as u64)
		}

		let block = self.block?;
		let end = block.end();
		if self.index > end {
			return None
		}

		let available = end - self.index;
		if available >= WIDTH {
			let bytes = block.published(self.index, self.index + WIDTH);
			return Some(u64::from_le(bytemuck::pod_read_unaligned(bytes)))
		}

		let next = block.next()?;
		let needed = WIDTH - available;
		if next.len() < needed {
			return None
		}

		let head = block.published(self.index, end);
		let tail = next.published(next.start(), next.start() + needed);
		Some(fold_le(head) | fold_le(tail) << (available * 8))
	}

	/// Counts the bytes between the cursor and `other`, which must be reachable by
	/// forward traversal. Fails with [`InvalidOrder`] if the chain ends before
	/// `other` is reached, or with [`Overflow`] if the count doesn't fit.
	///
	/// [`InvalidOrder`]: ErrorKind::InvalidOrder
	/// [`Overflow`]: ErrorKind::Overflow
	pub fn length_to(&self, other: &Cursor<'a>) -> Result<usize> {
		self.length_to_as(other)
	}

	/// Counts the bytes between the cursor and `other` as an integer of type `T`,
	/// failing with [`Overflow`] rather than wrapping if the count doesn't fit.
	///
	/// [`Overflow`]: ErrorKind::Overflow
	pub fn length_to_as<T: PrimInt>(&self, other: &Cursor<'a>) -> Result<T> {
		let invalid_order = || {
			debug!(from = ?self, to = ?other, "length target is unreachable");
			Error::of(OperationKind::LengthTo, ErrorKind::InvalidOrder)
		};
		let overflow = || Error::of(OperationKind::LengthTo, ErrorKind::Overflow);
		let add = |length: T, count: usize| {
			<T as NumCast>::from(count)
				.and_then(|count| length.checked_add(&count))
				.ok_or_else(overflow)
		};

		let (mut block, target) = match (self.block, other.block) {
			(None, None) => return Ok(T::zero()),
			(Some(block), Some(target)) => (block, target),
			_ => return Err(invalid_order())
		};
		let mut index = self.index;
		let mut length = T::zero();
		loop {
			if ptr::eq(block, target) {
				let count = other.index.checked_sub(index).ok_or_else(invalid_order)?;
				return add(length, count)
			}

			length = add(length, block.end().saturating_sub(index))?;
			block = block.next().ok_or_else(invalid_order)?;
			index = block.start();
		}
	}

	/// Finds the next available byte, returning its block and index.
	fn locate(&self) -> Option<(&'a Block, usize)> {
		let mut block = self.block?;
		let mut index = self.index;
		loop {
			if index < block.end() {
				return Some((block, index))
			}

			block = block.next()?;
			index = block.start();
		}
	}
}

impl PartialEq for Cursor<'_> {
	/// Cursors are equal if they point to the same offset of the same block.
	fn eq(&self, other: &Self) -> bool {
		self.index == other.index &&
		match (self.block, other.block) {
			(Some(a), Some(b)) => ptr::eq(a, b),
			(None, None) => true,
			_ => false
		}
	}
}

impl Eq for Cursor<'_> { }

impl Debug for Cursor<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.block {
			None => f.write_str("Cursor(default)"),
			Some(block) =>
				f.debug_struct("Cursor")
					.field("block", &(block as *const Block))
					.field("index", &self.index)
					.field("end", &block.end())
					.finish()
		}
	}
}
