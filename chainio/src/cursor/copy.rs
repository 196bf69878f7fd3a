// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use arrayvec::ArrayVec;
use tracing::{debug, trace};
use crate::{Block, Error, ErrorKind, OperationKind, Result};
use crate::block::WriteGuard;
use super::Cursor;

impl<'a> Cursor<'a> {
	/// Copies bytes from the cursor into `target`, crossing blocks as needed,
	/// until `target` is full or the chain runs out. Returns a cursor just past the
	/// last copied byte and the number of bytes copied, which is less than the
	/// length of `target` if the chain ran out first. The cursor itself doesn't
	/// move.
	pub fn copy_to(&self, target: &mut [u8]) -> (Cursor<'a>, usize) {
		let Some(mut block) = self.block else {
			return (Cursor::default(), 0)
		};
		let mut index = self.index;
		let mut copied = 0;
		loop {
			let end = block.end();
			let count = end.saturating_sub(index).min(target.len() - copied);
			if count > 0 {
				target[copied..copied + count].copy_from_slice(block.published(index, index + count));
				copied += count;
				index += count;
			}

			if copied == target.len() {
				break
			}

			let Some(next) = block.next() else { break };
			block = next;
			index = next.start();
		}
		(Cursor::at(block, index), copied)
	}

	/// Appends `source` to the chain. The cursor must sit at its block's write
	/// frontier, and is left at the new frontier. When a block fills, a fresh one
	/// is leased from its pool and linked after it. Bytes are published as each
	/// block is written, so readers can observe them before the copy finishes.
	///
	/// Fails with [`NotAtTail`] if the cursor isn't at the write frontier, with
	/// [`NoPool`] if the chain must grow but the tail block has no pool, or with
	/// [`Concurrent`] if another writer holds a block. On failure, the cursor is
	/// left after the last byte written.
	///
	/// [`NotAtTail`]: ErrorKind::NotAtTail
	/// [`NoPool`]: ErrorKind::NoPool
	/// [`Concurrent`]: ErrorKind::Concurrent
	pub fn copy_from(&mut self, mut source: &[u8]) -> Result {
		self.append(OperationKind::CopyFrom, source.len(), |spare| {
			let (head, rest) = source.split_at(spare.len());
			spare.copy_from_slice(head);
			source = rest;
		})
	}

	/// Appends `text` to the chain, converting each character to the byte of the
	/// same value, with the same growth as [`copy_from`](Self::copy_from). Fails
	/// with [`NonLatin1`] before writing anything if a character is outside
	/// `U+0000..=U+00FF`.
	///
	/// [`NonLatin1`]: ErrorKind::NonLatin1
	pub fn copy_from_ascii(&mut self, text: &str) -> Result {
		const OP: OperationKind = OperationKind::CopyFromAscii;

		if text.is_ascii() {
			return self.append_slice(OP, text.as_bytes())
		}

		if let Some(c) = text.chars().find(|&c| u32::from(c) > 0xFF) {
			debug!(char = ?c, "character can't be copied as a single byte");
			return Err(Error::of(OP, ErrorKind::NonLatin1))
		}

		let mut chars = text.chars().map(|c| u32::from(c) as u8);
		self.append(OP, text.chars().count(), |spare| {
			let mut quads = spare.chunks_exact_mut(4);
			for quad in quads.by_ref() {
				let packed = chars.by_ref()
								  .take(4)
								  .enumerate()
								  .fold(0u32, |word, (i, b)| word | (b as u32) << (i * 8));
				quad.copy_from_slice(&packed.to_le_bytes());
			}

			for byte in quads.into_remainder() {
				*byte = chars.next().unwrap_or_default();
			}
		})
	}

	/// Appends the decimal representation of `value`, with the same growth as
	/// [`copy_from`](Self::copy_from).
	pub fn copy_from_numeric(&mut self, mut value: u64) -> Result {
		let mut digits = ArrayVec::<u8, 20>::new();
		loop {
			digits.push(b'0' + (value % 10) as u8);
			value /= 10;
			if value == 0 {
				break
			}
		}
		digits.reverse();
		self.append_slice(OperationKind::CopyFromNumeric, &digits)
	}

	fn append_slice(&mut self, op: OperationKind, mut source: &[u8]) -> Result {
		self.append(op, source.len(), |spare| {
			let (head, rest) = source.split_at(spare.len());
			spare.copy_from_slice(head);
			source = rest;
		})
	}

	/// Appends `count` bytes, calling `write` to fill each block's spare capacity
	/// in order.
	fn append(
		&mut self,
		op: OperationKind,
		mut count: usize,
		mut write: impl FnMut(&mut [u8])
	) -> Result {
		let Some(mut block) = self.block else {
			debug!(%op, "write through a default cursor");
			return Err(Error::of(op, ErrorKind::Default))
		};

		let mut guard = lock_frontier(block, self.index, op)?;
		loop {
			let n = count.min(guard.spare());
			if n > 0 {
				guard.fill(n, &mut write);
				count -= n;
				self.block = Some(block);
				self.index = guard.frontier();
			}

			if count == 0 {
				return Ok(())
			}

			let next = match block.next() {
				Some(next) => next,
				None => lease_next(block, &guard, op)?
			};
			drop(guard);
			guard = lock_frontier(next, next.start(), op)?;
			block = next;
			self.block = Some(block);
			self.index = next.start();
		}
	}
}

/// Locks `block` for writing, checking that `index` is its write frontier.
fn lock_frontier(block: &Block, index: usize, op: OperationKind) -> Result<WriteGuard<'_>> {
	let guard = block.lock(op)?;
	let frontier = guard.frontier();
	if frontier != index {
		debug!(%op, index, frontier, "write away from the tail");
		return Err(Error::of(op, ErrorKind::NotAtTail))
	}
	Ok(guard)
}

/// Leases a block from the pool `block` was leased from and links it after
/// `block`, which `guard` must hold.
fn lease_next<'a>(block: &'a Block, guard: &WriteGuard<'a>, op: OperationKind) -> Result<&'a Block> {
	let Some(pool) = block.pool() else {
		debug!(%op, "chain must grow, but its tail has no pool");
		return Err(Error::of(op, ErrorKind::NoPool))
	};

	let next = Arc::clone(pool).lease().map_err(|error| Error::pool(op, error))?;
	trace!(%op, capacity = next.capacity(), "growing chain");
	guard.link(next, op)
}
