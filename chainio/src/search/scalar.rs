// SPDX-License-Identifier: Apache-2.0

use super::ByteSet;

pub fn find(haystack: &[u8], set: &ByteSet) -> Option<usize> {
	haystack.iter().position(|&b| set.contains(b))
}
