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

use std::fmt;
use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};
use amplify_derive::Display;
use crate::pool::PoolError;

pub type ErrorBox = Box<dyn StdError + Send + Sync>;

/// A cursor operation error.
pub type Error = OpError<OperationKind, ErrorKind>;
pub type Result<T = ()> = std::result::Result<T, Error>;

pub trait Operation: Copy + Debug + Display {
	fn unknown() -> Self;
}

pub trait Kind: Copy + Debug + Display {
	fn other(message: &'static str) -> Self;
}

/// An error raised by an operation, with an optional source error.
#[derive(Debug)]
pub struct OpError<O: Operation, K: Kind> {
	op: O,
	kind: K,
	source: Option<ErrorBox>,
}

impl<O: Operation, K: Kind> Display for OpError<O, K> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Self { op, kind, source } = self;
		if let Some(source) = source {
			write!(f, "{op} failed; {kind} ({source})")
		} else {
			write!(f, "{op} failed; {kind}")
		}
	}
}

impl<O: Operation, K: Kind> StdError for OpError<O, K> {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		if let Some(ref source) = self.source {
			Some(source.as_ref())
		} else {
			None
		}
	}
}

impl<O: Operation, K: Kind> OpError<O, K> {
	pub(crate) fn new(
		op: O,
		kind: K,
		source: Option<ErrorBox>
	) -> Self {
		Self { op, kind, source }
	}

	/// Creates a new error with a custom message.
	pub fn other(
		op: O,
		message: &'static str,
		source: Option<ErrorBox>
	) -> Self {
		Self::new(op, K::other(message), source)
	}

	/// Returns the operation kind.
	pub fn operation(&self) -> O { self.op }

	/// Sets the operation kind.
	pub fn with_operation(mut self, op: O) -> Self {
		self.op = op;
		self
	}

	/// Returns the error kind.
	pub fn kind(&self) -> K { self.kind }
}

impl<O: Operation, K: Kind> From<&'static str> for OpError<O, K> {
	fn from(value: &'static str) -> Self {
		Self::other(O::unknown(), value, None)
	}
}

#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq)]
pub enum OperationKind {
	#[default]
	#[display("unknown operation")]
	Unknown,
	#[display("skip")]
	Skip,
	#[display("put")]
	Put,
	#[display("measure length")]
	LengthTo,
	#[display("copy from slice")]
	CopyFrom,
	#[display("copy from ASCII text")]
	CopyFromAscii,
	#[display("copy from number")]
	CopyFromNumeric,
	#[display("decode span")]
	Decode,
	#[display("link block")]
	Link,
	#[display("{0}")]
	Other(&'static str)
}

impl Operation for OperationKind {
	fn unknown() -> Self { Self::Unknown }
}

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	/// Fewer bytes remain in the chain than requested.
	#[display("not enough bytes remain in the chain")]
	OutOfRange,
	/// The target cursor is not reachable by forward traversal.
	#[display("target cursor is not reachable from this position")]
	InvalidOrder,
	/// A length could not be represented.
	#[display("length overflow")]
	Overflow,
	/// A write was attempted away from the tail block's write frontier.
	#[display("cursor is not at the tail of its block")]
	NotAtTail,
	/// A write was attempted through a cursor holding no block.
	#[display("default cursor")]
	Default,
	/// The chain must grow, but its tail block was not leased from a pool.
	#[display("tail block has no pool")]
	NoPool,
	/// Another writer holds the block.
	#[display("block is being written concurrently")]
	Concurrent,
	/// A block is already linked to a successor.
	#[display("block already has a successor")]
	Linked,
	/// A character can't be represented as a single byte.
	#[display("character outside of the Latin-1 range")]
	NonLatin1,
	/// A span isn't valid UTF-8.
	#[display("invalid UTF-8")]
	Utf8,
	/// The pool failed to lease a block.
	#[display("block pool error")]
	Pool,
	#[display("{0}")]
	Other(&'static str),
}

impl Kind for ErrorKind {
	fn other(message: &'static str) -> Self { Self::Other(message) }
}

impl Error {
	/// Creates an error without a source.
	pub(crate) fn of(op: OperationKind, kind: ErrorKind) -> Self {
		Self::new(op, kind, None)
	}

	/// Creates a new pool error.
	pub fn pool(op: OperationKind, error: PoolError) -> Self {
		Self::new(op, ErrorKind::Pool, Some(error.into()))
	}

	/// Returns `true` if this error is a violated caller precondition, rather than
	/// a failure of an external collaborator.
	pub fn is_contract_violation(&self) -> bool {
		!matches!(self.kind, ErrorKind::Pool | ErrorKind::Utf8 | ErrorKind::Other(_))
	}
}
