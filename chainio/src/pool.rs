// SPDX-License-Identifier: Apache-2.0

mod options;

pub use options::*;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use once_cell::sync::Lazy;
use tracing::trace;
use crate::Block;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PoolError {
	#[error("failed to lock the pool")]
	Poisoned,
}

impl<T> From<PoisonError<T>> for PoolError {
	fn from(_: PoisonError<T>) -> Self { Self::Poisoned }
}

/// A source of blocks. Only [`lease`](Self::lease) is used when a chain grows;
/// returning blocks is left to whoever owns the chain.
pub trait Pool: Send + Sync {
	/// Leases a block with an empty valid window, backed by fresh or recycled
	/// storage. The block should carry a reference back to this pool, so chains
	/// grown from it can lease more blocks.
	fn lease(self: Arc<Self>) -> Result<Box<Block>, PoolError>;

	/// Collects a block and every block linked after it back into the pool.
	fn collect(&self, block: Box<Block>);

	/// Returns the capacity of leased blocks.
	fn block_size(&self) -> usize;

	/// Clears retained storage to free memory. The amount actually cleared is left
	/// up to implementation.
	fn shed(&self) { }
}

/// A pool of fixed-size block buffers, reused in last-in-first-out order.
#[derive(Debug, Default)]
pub struct DefaultPool {
	options: PoolOptions,
	free: Mutex<Vec<Box<[u8]>>>,
}

impl DefaultPool {
	/// Creates a new pool with `options`.
	pub fn new(options: PoolOptions) -> Arc<Self> {
		Arc::new(Self {
			options,
			free: Mutex::default(),
		})
	}

	/// Returns the pool options.
	pub fn options(&self) -> PoolOptions { self.options }

	/// Returns the number of retained buffers.
	pub fn retained(&self) -> Result<usize, PoolError> {
		Ok(self.free()?.len())
	}

	/// Reserves at least `count` retained buffers, up to the retain limit.
	pub fn reserve(&self, count: usize) -> Result<(), PoolError> {
		let mut free = self.free()?;
		let count = count.min(self.options.retain_limit);
		let missing = count.saturating_sub(free.len());
		free.extend((0..missing).map(|_| self.alloc()));
		Ok(())
	}

	fn free(&self) -> Result<MutexGuard<'_, Vec<Box<[u8]>>>, PoolError> {
		Ok(self.free.lock()?)
	}

	fn alloc(&self) -> Box<[u8]> {
		vec![0; self.options.block_size].into_boxed_slice()
	}
}

impl Pool for DefaultPool {
	fn lease(self: Arc<Self>) -> Result<Box<Block>, PoolError> {
		let storage = if self.options.allocation.is_recycle() {
			self.free()?.pop()
		} else {
			None
		};
		let storage = storage.unwrap_or_else(|| self.alloc());
		trace!(size = storage.len(), "leased block");
		let pool: Arc<dyn Pool> = self;
		Ok(Box::new(Block::from_storage(storage, Some(pool))))
	}

	fn collect(&self, block: Box<Block>) {
		let Ok(mut free) = self.free() else { return };
		let mut next = Some(block);
		while let Some(mut block) = next {
			next = block.detach();
			if block.capacity() == self.options.block_size &&
			   free.len() < self.options.retain_limit {
				free.push(block.into_storage());
			}
		}
		trace!(retained = free.len(), "collected blocks");
	}

	fn block_size(&self) -> usize { self.options.block_size }

	fn shed(&self) {
		if let Ok(mut free) = self.free() {
			trace!(count = free.len(), "shed retained buffers");
			free.clear();
		}
	}
}

/// Clones a shared reference to the default block pool.
#[inline]
pub fn pool() -> Arc<DefaultPool> { POOL.clone() }

static POOL: Lazy<Arc<DefaultPool>> = Lazy::new(|| DefaultPool::new(PoolOptions::default()));

#[cfg(test)]
mod tests {
	use super::*;

	fn small() -> Arc<DefaultPool> {
		DefaultPool::new(PoolOptions::new().with_block_size(4).with_retain_limit(2))
	}

	#[test]
	fn lease_is_empty() {
		let pool = small();
		let block = pool.clone().lease().unwrap();
		assert_eq!(block.capacity(), 4);
		assert_eq!(block.start(), block.end());
		assert!(block.pool().is_some());
	}

	#[test]
	fn collect_recycles_chain() {
		let pool = small();
		let root = pool.clone().lease().unwrap();
		let next = root.link(pool.clone().lease().unwrap()).unwrap();
		next.link(pool.clone().lease().unwrap()).unwrap();

		pool.collect(root);
		assert_eq!(pool.retained().unwrap(), 2, "should retain up to the limit");
		pool.clone().lease().unwrap();
		assert_eq!(pool.retained().unwrap(), 1);
		pool.shed();
		assert_eq!(pool.retained().unwrap(), 0);
	}

	#[test]
	fn collect_skips_foreign_sizes() {
		let pool = small();
		pool.collect(Box::new(Block::new(16)));
		assert_eq!(pool.retained().unwrap(), 0);
	}

	#[test]
	fn always_allocate() {
		let pool = DefaultPool::new(PoolOptions::new().with_block_size(4).always_allocate());
		pool.reserve(3).unwrap();
		pool.clone().lease().unwrap();
		assert_eq!(pool.retained().unwrap(), 3);
	}

	#[test]
	fn default_pool() {
		assert_eq!(pool().block_size(), crate::BLOCK_SIZE);
	}
}
