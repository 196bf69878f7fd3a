// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use crate::{Block, Cursor, Error, OperationKind, Result};
use crate::pool::{pool, Pool};

/// An owned block chain and the pool it grows from.
///
/// Writers append through [`tail`](Self::tail), readers scan from
/// [`cursor`](Self::cursor). Cursors borrow the chain, so [`recycle`](Self::recycle)
/// can only return its blocks once every cursor is gone.
pub struct Chain {
	head: Box<Block>,
	pool: Arc<dyn Pool>,
}

impl Chain {
	/// Creates a chain with one block leased from `pool`.
	pub fn new(pool: Arc<dyn Pool>) -> Result<Self> {
		let head = Arc::clone(&pool)
			.lease()
			.map_err(|error| Error::pool(OperationKind::Other("lease root block"), error))?;
		Ok(Self { head, pool })
	}

	/// Creates a chain leasing from the default pool.
	pub fn with_default_pool() -> Result<Self> {
		Self::new(pool())
	}

	/// Returns the root block.
	pub fn head(&self) -> &Block { &self.head }

	/// Returns a cursor at the start of the chain's data.
	pub fn cursor(&self) -> Cursor<'_> {
		Cursor::new(&self.head)
	}

	/// Returns a cursor at the write frontier of the last block.
	pub fn tail(&self) -> Cursor<'_> {
		let mut last: &Block = &self.head;
		while let Some(next) = last.next() {
			last = next;
		}
		Cursor::at(last, last.end())
	}

	/// Returns the number of published bytes in the chain.
	pub fn len(&self) -> usize {
		self.head.iter().map(Block::len).sum()
	}

	/// Returns `true` if the chain holds no published bytes.
	pub fn is_empty(&self) -> bool {
		self.head.iter().all(Block::is_empty)
	}

	/// Returns the number of blocks in the chain.
	pub fn block_count(&self) -> usize {
		self.head.iter().count()
	}

	/// Returns every block in the chain to the pool.
	pub fn recycle(self) {
		let Self { head, pool } = self;
		pool.collect(head);
	}
}

impl Debug for Chain {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Chain")
			.field("len", &self.len())
			.field("blocks", &self.block_count())
			.field("block_size", &self.pool.block_size())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use crate::pool::{DefaultPool, PoolOptions};
	use super::*;

	#[test]
	fn grows_from_pool() {
		let pool = DefaultPool::new(PoolOptions::new().with_block_size(4));
		let chain = Chain::new(pool.clone()).unwrap();
		assert!(chain.is_empty());
		assert_eq!(chain.tail(), chain.cursor());

		let mut tail = chain.tail();
		tail.copy_from(b"0123456789").unwrap();
		assert_eq!(chain.len(), 10);
		assert_eq!(chain.block_count(), 3);
		assert_eq!(chain.tail(), tail);

		chain.recycle();
		assert_eq!(pool.retained().unwrap(), 3);
	}
}
