// SPDX-License-Identifier: Apache-2.0

use std::{fmt, mem, ptr, slice};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use all_asserts::assert_le;
use once_cell::sync::OnceCell;
use tracing::{debug, trace};
use crate::{Error, ErrorKind, OperationKind, Result};
use crate::pool::Pool;

/// A node in a block chain: a fixed-capacity byte buffer, a window of valid data
/// within it, and a forward link to the next block.
///
/// The window `[start, end)` only ever grows at its end. Bytes inside it are
/// never overwritten, so any number of readers may traverse the published part
/// of a chain while a single writer appends to its tail. The writer publishes
/// `end` and `next` with release stores, readers observe them with acquire loads.
///
/// Blocks own their successor. Dropping the root of a chain drops the whole chain
/// iteratively; to return blocks to their pool instead, [`detach`] them or hand
/// the root to [`Pool::collect`]. Both need exclusive access, which the borrow
/// checker only grants once no cursor into the chain is alive.
///
/// [`detach`]: Self::detach
pub struct Block {
	data: *mut [u8],
	capacity: usize,
	start: usize,
	end: AtomicUsize,
	next: OnceCell<Box<Block>>,
	pool: Option<Arc<dyn Pool>>,
	writing: AtomicBool,
}

// Safety: bytes below `end` are immutable once published, and bytes above it are
// only touched while holding the write latch.
unsafe impl Send for Block { }
unsafe impl Sync for Block { }

impl Block {
	/// Creates an unpooled block with `capacity` bytes of zeroed storage.
	pub fn new(capacity: usize) -> Self {
		Self::from_storage(vec![0; capacity].into_boxed_slice(), None)
	}

	/// Creates an unpooled block whose valid window is empty and begins at `start`.
	/// Panics if `start` is past `capacity`.
	pub fn with_start(capacity: usize, start: usize) -> Self {
		assert_le!(start, capacity);
		let mut block = Self::new(capacity);
		block.start = start;
		*block.end.get_mut() = start;
		block
	}

	/// Creates a block backed by `storage`, leased from `pool` if any. The valid
	/// window is empty.
	pub fn from_storage(storage: Box<[u8]>, pool: Option<Arc<dyn Pool>>) -> Self {
		let capacity = storage.len();
		Self {
			data: Box::into_raw(storage),
			capacity,
			start: 0,
			end: AtomicUsize::new(0),
			next: OnceCell::new(),
			pool,
			writing: AtomicBool::new(false),
		}
	}

	/// Returns the storage capacity in bytes.
	#[inline]
	pub fn capacity(&self) -> usize { self.capacity }

	/// Returns the offset of the first valid byte.
	#[inline]
	pub fn start(&self) -> usize { self.start }

	/// Returns the offset just past the last published byte.
	#[inline]
	pub fn end(&self) -> usize { self.end.load(Acquire) }

	/// Returns the number of published bytes.
	#[inline]
	pub fn len(&self) -> usize { self.end() - self.start }

	/// Returns `true` if no bytes are published.
	#[inline]
	pub fn is_empty(&self) -> bool { self.len() == 0 }

	/// Returns `true` if no more bytes can be appended.
	#[inline]
	pub fn is_full(&self) -> bool { self.remaining() == 0 }

	/// Returns the number of bytes that can still be appended.
	#[inline]
	pub fn remaining(&self) -> usize { self.capacity - self.end() }

	/// Returns the next block, if one was linked.
	#[inline]
	pub fn next(&self) -> Option<&Block> {
		self.next.get().map(Box::as_ref)
	}

	/// Returns the pool this block was leased from.
	#[inline]
	pub fn pool(&self) -> Option<&Arc<dyn Pool>> { self.pool.as_ref() }

	/// Returns the published bytes.
	pub fn as_slice(&self) -> &[u8] {
		self.published(self.start, self.end())
	}

	/// Returns an iterator over this block and all blocks linked after it.
	pub fn iter(&self) -> Blocks<'_> {
		Blocks(Some(self))
	}

	/// Publishes `next` as this block's successor, returning a reference to it.
	/// Fails if a successor is already linked or another writer holds the block.
	pub fn link(&self, next: Box<Block>) -> Result<&Block> {
		self.lock(OperationKind::Link)?.link(next, OperationKind::Link)
	}

	/// Unlinks and returns the rest of the chain.
	pub fn detach(&mut self) -> Option<Box<Block>> {
		self.next.take()
	}

	/// Consumes the block, returning its storage. Blocks linked after it are
	/// dropped.
	pub fn into_storage(mut self) -> Box<[u8]> {
		drop(self.detach());
		let empty: Box<[u8]> = Box::default();
		let data = mem::replace(&mut self.data, Box::into_raw(empty));
		self.capacity = 0;
		// Safety: the pointer came from Box::into_raw and was replaced, so it is
		// owned exclusively here.
		unsafe { Box::from_raw(data) }
	}

	/// Returns the byte at `index`, which must be published.
	#[inline]
	pub(crate) fn byte(&self, index: usize) -> u8 {
		self.published(index, index + 1)[0]
	}

	/// Returns published bytes in `from..to`. Panics if the range extends past
	/// `end` or before `start`.
	#[inline]
	pub(crate) fn published(&self, from: usize, to: usize) -> &[u8] {
		assert!(
			self.start <= from && from <= to && to <= self.end(),
			"range {from}..{to} should be within the published window"
		);
		// Safety: the range lies within [start, end), which is never written after
		// being published.
		unsafe {
			slice::from_raw_parts((self.data as *const u8).add(from), to - from)
		}
	}

	/// Acquires the write latch for `op`.
	pub(crate) fn lock(&self, op: OperationKind) -> Result<WriteGuard<'_>> {
		if self.writing.compare_exchange(false, true, Acquire, Relaxed).is_ok() {
			Ok(WriteGuard { block: self })
		} else {
			debug!(%op, "block is already held by another writer");
			Err(Error::of(op, ErrorKind::Concurrent))
		}
	}
}

impl Drop for Block {
	fn drop(&mut self) {
		// Unlink iteratively, long chains would overflow the stack otherwise.
		let mut next = self.detach();
		while let Some(mut block) = next {
			next = block.detach();
		}

		// Safety: the storage pointer came from Box::into_raw.
		drop(unsafe { Box::from_raw(self.data) });
	}
}

impl Debug for Block {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Block")
			.field("capacity", &self.capacity)
			.field("start", &self.start)
			.field("end", &self.end())
			.field("linked", &self.next.get().is_some())
			.field("pooled", &self.pool.is_some())
			.finish()
	}
}

/// An iterator over a block and its successors.
#[derive(Clone)]
pub struct Blocks<'a>(Option<&'a Block>);

impl<'a> Iterator for Blocks<'a> {
	type Item = &'a Block;

	fn next(&mut self) -> Option<&'a Block> {
		let block = self.0?;
		self.0 = block.next();
		Some(block)
	}
}

/// Exclusive write access to the unpublished part of a block. Released on drop.
#[derive(Debug)]
pub(crate) struct WriteGuard<'a> {
	block: &'a Block,
}

impl<'a> WriteGuard<'a> {
	/// Returns the write frontier, the offset the next byte will be written to.
	#[inline]
	pub fn frontier(&self) -> usize {
		// Only the latch holder stores to `end`.
		self.block.end.load(Relaxed)
	}

	/// Returns the number of bytes that can be appended.
	#[inline]
	pub fn spare(&self) -> usize {
		self.block.capacity - self.frontier()
	}

	/// Appends `count` bytes written by `write`, then publishes them. Panics if
	/// `count` exceeds the spare capacity.
	pub fn fill(&mut self, count: usize, write: impl FnOnce(&mut [u8])) {
		let end = self.frontier();
		assert_le!(count, self.spare());
		// Safety: [end, end + count) is within the storage, unpublished, and only
		// reachable through this guard.
		let spare = unsafe {
			slice::from_raw_parts_mut((self.block.data as *mut u8).add(end), count)
		};
		write(spare);
		self.block.end.store(end + count, Release);
	}

	/// Appends one byte, returning `false` if the block is full.
	pub fn push(&mut self, byte: u8) -> bool {
		if self.spare() == 0 {
			return false
		}

		self.fill(1, |spare| spare[0] = byte);
		true
	}

	/// Publishes `next` as the block's successor.
	pub fn link(&self, next: Box<Block>, op: OperationKind) -> Result<&'a Block> {
		match self.block.next.try_insert(next) {
			Ok(next) => {
				trace!(capacity = next.capacity(), "linked block");
				Ok(next)
			}
			Err(_) => {
				debug!(%op, "block already has a successor");
				Err(Error::of(op, ErrorKind::Linked))
			}
		}
	}
}

impl Drop for WriteGuard<'_> {
	fn drop(&mut self) {
		self.block.writing.store(false, Release);
	}
}

impl PartialEq for Block {
	/// Blocks compare by identity.
	fn eq(&self, other: &Self) -> bool { ptr::eq(self, other) }
}

impl Eq for Block { }

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn append_publishes() {
		let block = Block::new(4);
		let mut guard = block.lock(OperationKind::Put).unwrap();
		guard.fill(3, |spare| spare.copy_from_slice(b"abc"));
		assert!(guard.push(b'd'));
		assert!(!guard.push(b'e'));
		drop(guard);

		assert_eq!(block.as_slice(), b"abcd");
		assert!(block.is_full());
	}

	#[test]
	fn latch_is_exclusive() {
		let block = Block::new(4);
		let guard = block.lock(OperationKind::Put).unwrap();
		let error = block.lock(OperationKind::CopyFrom).unwrap_err();
		assert_eq!(error.kind(), ErrorKind::Concurrent);
		drop(guard);
		assert!(block.lock(OperationKind::CopyFrom).is_ok());
	}

	#[test]
	fn link_once() {
		let block = Block::new(1);
		let next = block.link(Box::new(Block::new(2))).unwrap();
		assert_eq!(next.capacity(), 2);
		let error = block.link(Box::new(Block::new(3))).unwrap_err();
		assert_eq!(error.kind(), ErrorKind::Linked);
		assert_eq!(block.iter().count(), 2);
	}

	#[test]
	fn with_start() {
		let block = Block::with_start(8, 3);
		assert_eq!((block.start(), block.end(), block.remaining()), (3, 3, 5));
		assert!(block.is_empty());
	}

	#[test]
	fn into_storage() {
		let block = Block::new(4);
		block.lock(OperationKind::Put).unwrap().fill(2, |s| s.copy_from_slice(b"hi"));
		block.link(Box::new(Block::new(4))).unwrap();
		let storage = block.into_storage();
		assert_eq!(&storage[..], b"hi\0\0");
	}

	#[test]
	fn drop_long_chain() {
		let root = Block::new(1);
		let mut tail = &root;
		for _ in 0..100_000 {
			tail = tail.link(Box::new(Block::new(1))).unwrap();
		}
		drop(root);
	}

	#[test]
	#[should_panic]
	fn unpublished_read() {
		let block = Block::new(4);
		block.published(0, 1);
	}
}
