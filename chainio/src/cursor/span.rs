// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;
use std::iter::FusedIterator;
use std::ptr;
use simdutf8::compat::from_utf8;
use crate::{Block, Error, ErrorKind, OperationKind, Result};
use super::Cursor;

/// An iterator over the contiguous published runs between two cursors, created
/// by [`Cursor::chunks_to`].
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
	block: Option<&'a Block>,
	index: usize,
	stop: Option<(&'a Block, usize)>,
}

impl<'a> Iterator for Chunks<'a> {
	type Item = &'a [u8];

	fn next(&mut self) -> Option<&'a [u8]> {
		loop {
			let block = self.block?;
			let end = block.end();
			let (to, last) = match self.stop {
				Some((stop, index)) if ptr::eq(block, stop) => (index.min(end), true),
				_ => (end, false)
			};

			let chunk = (self.index < to).then(|| block.published(self.index, to));
			if last {
				self.block = None;
			} else {
				self.block = block.next();
				self.index = self.block.map_or(0, Block::start);
			}

			if chunk.is_some() {
				return chunk
			}
		}
	}
}

impl FusedIterator for Chunks<'_> { }

impl<'a> Cursor<'a> {
	/// Returns an iterator over the published runs from the cursor up to `end`,
	/// skipping empty blocks. If `end` isn't reachable, iterates to the end of the
	/// chain.
	pub fn chunks_to(&self, end: &Cursor<'a>) -> Chunks<'a> {
		Chunks {
			block: self.block,
			index: self.index,
			stop: end.block.map(|block| (block, end.index)),
		}
	}

	/// Returns the bytes from the cursor up to `end`, borrowed if they lie in one
	/// block and copied otherwise. Fails with [`InvalidOrder`] if `end` isn't
	/// reachable.
	///
	/// [`InvalidOrder`]: ErrorKind::InvalidOrder
	pub fn slice_to(&self, end: &Cursor<'a>) -> Result<Cow<'a, [u8]>> {
		let length = self.length_to(end).map_err(|e| e.with_operation(OperationKind::Decode))?;
		let mut chunks = self.chunks_to(end);
		let Some(first) = chunks.next() else {
			return Ok(Cow::Borrowed(&[]))
		};

		if first.len() == length {
			return Ok(Cow::Borrowed(first))
		}

		let mut bytes = Vec::with_capacity(length);
		bytes.extend_from_slice(first);
		chunks.for_each(|chunk| bytes.extend_from_slice(chunk));
		Ok(Cow::Owned(bytes))
	}

	/// Decodes the bytes from the cursor up to `end`, widening each byte to the
	/// `char` of the same value.
	pub fn ascii_string_to(&self, end: &Cursor<'a>) -> Result<String> {
		let length = self.length_to(end).map_err(|e| e.with_operation(OperationKind::Decode))?;
		let mut string = String::with_capacity(length);
		string.extend(
			self.chunks_to(end)
				.flatten()
				.map(|&b| char::from(b))
		);
		Ok(string)
	}

	/// Decodes the bytes from the cursor up to `end` as UTF-8.
	pub fn utf8_string_to(&self, end: &Cursor<'a>) -> Result<String> {
		let bytes = self.slice_to(end)?;
		match from_utf8(&bytes) {
			Ok(str) => Ok(str.to_owned()),
			Err(error) => Err(Error::new(OperationKind::Decode, ErrorKind::Utf8, Some(error.into())))
		}
	}
}
