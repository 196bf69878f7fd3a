// SPDX-License-Identifier: Apache-2.0

use std::ptr;
use crate::Block;
use crate::search::{self, ByteSet};
use super::Cursor;

/// The bound of a delimiter search.
#[derive(Copy, Clone)]
enum Limit<'a> {
	/// Scan to the end of the chain.
	Unbounded,
	/// Scan at most this many bytes.
	Count(usize),
	/// Scan up to and including the byte at `stop`, resting at `rest` on a miss.
	At {
		stop: (&'a Block, usize),
		rest: Cursor<'a>,
	},
}

impl<'a> Cursor<'a> {
	/// Advances to the first byte in `set`, returning it. `set` is one byte, or a
	/// tuple or array of two or three bytes. If no byte matches, the cursor is left
	/// at the end of the chain and `None` is returned.
	///
	/// ```
	/// # use chainio::{Block, Cursor};
	/// let block = Block::new(16);
	/// let mut tail = Cursor::new(&block);
	/// tail.copy_from(b"Host: x\r\n").unwrap();
	///
	/// let mut cursor = Cursor::new(&block);
	/// assert_eq!(cursor.seek((b'\r', b'\n')), Some(b'\r'));
	/// assert_eq!(cursor.index(), 7);
	/// ```
	pub fn seek(&mut self, set: impl Into<ByteSet>) -> Option<u8> {
		self.seek_bounded(&set.into(), Limit::Unbounded).0
	}

	/// Advances to the first byte in `set` within the next `limit` bytes, returning
	/// it and the number of bytes scanned before it. If no byte matches, the cursor
	/// is left exactly `limit` bytes ahead, in whichever block that offset falls,
	/// or at the end of the chain if fewer bytes remain.
	pub fn seek_within(&mut self, set: impl Into<ByteSet>, limit: usize) -> (Option<u8>, usize) {
		self.seek_bounded(&set.into(), Limit::Count(limit))
	}

	/// Advances to the first byte in `set` at or before `limit`, returning it. If no
	/// byte matches, the cursor is left exactly at `limit`. If `limit` isn't
	/// reachable, the search behaves as [`seek`](Self::seek).
	pub fn seek_until(&mut self, set: impl Into<ByteSet>, limit: &Cursor<'a>) -> Option<u8> {
		let limit = match limit.block {
			Some(block) => Limit::At {
				stop: first_at_or_after(block, limit.index),
				rest: *limit,
			},
			None => Limit::Unbounded
		};
		self.seek_bounded(&set.into(), limit).0
	}

	fn seek_bounded(&mut self, set: &ByteSet, limit: Limit<'a>) -> (Option<u8>, usize) {
		let Some(mut block) = self.block else { return (None, 0) };
		let mut index = self.index;
		let mut scanned = 0;
		loop {
			let mut to = block.end();
			let mut at_limit = false;
			match limit {
				Limit::Count(count) =>
					to = to.min(index.saturating_add(count - scanned)),
				// Only positions at or before the limit are eligible.
				Limit::At { stop: (stop, stop_index), .. } if ptr::eq(block, stop) => {
					to = to.min(stop_index.saturating_add(1));
					at_limit = true;
				}
				_ => { }
			}

			if index < to {
				let haystack = block.published(index, to);
				if let Some(pos) = search::find(haystack, set) {
					self.block = Some(block);
					self.index = index + pos;
					return (Some(haystack[pos]), scanned + pos)
				}

				scanned += to - index;
				index = to;
			}

			if at_limit {
				if let Limit::At { rest, .. } = limit {
					*self = rest;
				}
				return (None, scanned)
			}

			let next = match limit {
				Limit::Count(count) if scanned == count => None,
				_ => block.next()
			};
			let Some(next) = next else {
				self.block = Some(block);
				self.index = index;
				return (None, scanned)
			};
			block = next;
			index = next.start();
		}
	}
}

/// Moves a position sitting on its block's end to the first byte after it, so a
/// limit on a block seam admits the byte it stands for.
fn first_at_or_after(mut block: &Block, mut index: usize) -> (&Block, usize) {
	while index >= block.end() {
		let Some(next) = block.next() else { break };
		block = next;
		index = next.start();
	}
	(block, index)
}
