//! Undo journal of fill records written by a settler transaction.

use oif_types::Bytes32;

/// Identity of a fill record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FillKey {
	pub order_id: Bytes32,
	pub output_hash: Bytes32,
}

/// Records inserted by the running transaction, oldest first.
#[derive(Debug, Default)]
pub struct Journal {
	entries: Vec<FillKey>,
}

impl Journal {
	pub fn checkpoint(&self) -> usize {
		self.entries.len()
	}

	pub fn push(&mut self, key: FillKey) {
		self.entries.push(key);
	}

	/// Removes and returns every key recorded after `checkpoint`, newest
	/// first.
	pub fn revert_to(&mut self, checkpoint: usize) -> Vec<FillKey> {
		let mut undone = self.entries.split_off(checkpoint.min(self.entries.len()));
		undone.reverse();
		undone
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}
}
