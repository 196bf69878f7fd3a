// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! ## How it works
//!
//! Data lives in fixed-capacity memory *blocks* leased from a *pool*. Blocks are
//! linked into an append-only *chain*: each block holds a window of valid bytes
//! and a link to the next block. The window only grows at its end, and the link is
//! set at most once, so published bytes never change.
//!
//! A *cursor* is a copyable position in a chain: a block reference and an offset.
//! Cursors read, scan, measure, and copy across block seams without copying the
//! chain itself. Parsing code can then find delimiters and extract fields directly
//! from pooled memory.
//!
//! ### Writers and readers
//!
//! One cursor at the chain's tail appends bytes, leasing and linking new blocks as
//! it goes. Each block's end offset and link are published with release stores,
//! so any number of reader cursors, on any thread, can traverse what has been
//! written while the writer continues. Blocks carry a write latch; a second writer
//! racing the first gets an error rather than corrupting data.
//!
//! ### Delimiter search
//!
//! Cursors scan for one of up to three bytes a lane at a time, comparing several
//! bytes per step and falling back to a byte-by-byte loop for short tails. See
//! [`search`] for details.
//!
//! ### Block lifetime
//!
//! Cursors borrow the chain, so blocks can only be returned to their pool once no
//! cursor references them. This crate never returns blocks itself; that is left
//! to whoever owns the chain, such as [`Chain::recycle`].

mod block;
mod chain;
mod cursor;
mod error;
pub mod pool;
pub mod search;

pub use block::{Block, Blocks};
pub use chain::Chain;
pub use cursor::*;
pub use error::*;
pub use pool::{DefaultPool, Pool, PoolError, PoolOptions};
pub use search::ByteSet;

/// The default block size.
pub const BLOCK_SIZE: usize = 4096;
