//! Token ledger collaborator.

use alloy_primitives::U256;
use oif_types::Bytes32;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
	#[error("Insufficient balance of {token} for {owner}: have {balance}, need {required}")]
	InsufficientBalance {
		token: Bytes32,
		owner: Bytes32,
		balance: U256,
		required: U256,
	},
	#[error("Balance overflow")]
	Overflow,
	#[error("Transfer rejected: {0}")]
	Rejected(String),
}

/// Position in a ledger's undo log, returned by [`TokenLedger::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCheckpoint(usize);

/// Moves tokens on behalf of the settler.
///
/// The settler pulls from the caller of a fill and pays the output's
/// recipient. Each settler transaction opens a checkpoint and closes it
/// with either [`commit`](TokenLedger::commit) or
/// [`revert_to`](TokenLedger::revert_to). Every balance change made while
/// a checkpoint is open, including transfers made by recipient callbacks,
/// must be undone by `revert_to`. Checkpoints nest.
pub trait TokenLedger: Send + Sync {
	fn transfer_from(
		&self,
		token: Bytes32,
		from: Bytes32,
		to: Bytes32,
		amount: U256,
	) -> Result<(), LedgerError>;

	fn checkpoint(&self) -> LedgerCheckpoint;

	/// Keeps the changes made since `checkpoint`. An enclosing checkpoint
	/// can still revert them.
	fn commit(&self, checkpoint: LedgerCheckpoint);

	/// Restores every balance changed since `checkpoint`.
	fn revert_to(&self, checkpoint: LedgerCheckpoint);
}

type BalanceKey = (Bytes32, Bytes32);

#[derive(Debug, Default)]
struct LedgerState {
	balances: HashMap<BalanceKey, U256>,
	/// Previous value of every balance written while a checkpoint is open.
	undo: Vec<(BalanceKey, U256)>,
	open_checkpoints: usize,
}

impl LedgerState {
	fn balance(&self, key: &BalanceKey) -> U256 {
		self.balances.get(key).copied().unwrap_or_default()
	}

	fn write(&mut self, key: BalanceKey, value: U256) {
		let previous = self.balances.insert(key, value).unwrap_or_default();
		if self.open_checkpoints > 0 {
			self.undo.push((key, previous));
		}
	}

	fn close(&mut self) {
		self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
		if self.open_checkpoints == 0 {
			self.undo.clear();
		}
	}
}

/// Balance table for simulations and tests.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
	state: Mutex<LedgerState>,
}

impl InMemoryLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mint(&self, token: Bytes32, owner: Bytes32, amount: U256) -> Result<(), LedgerError> {
		let mut state = self.state.lock();
		let balance = state
			.balance(&(token, owner))
			.checked_add(amount)
			.ok_or(LedgerError::Overflow)?;
		state.write((token, owner), balance);
		Ok(())
	}

	pub fn balance_of(&self, token: Bytes32, owner: Bytes32) -> U256 {
		self.state.lock().balance(&(token, owner))
	}
}

impl TokenLedger for InMemoryLedger {
	fn transfer_from(
		&self,
		token: Bytes32,
		from: Bytes32,
		to: Bytes32,
		amount: U256,
	) -> Result<(), LedgerError> {
		let mut state = self.state.lock();

		let from_balance = state.balance(&(token, from));
		if from_balance < amount {
			return Err(LedgerError::InsufficientBalance {
				token,
				owner: from,
				balance: from_balance,
				required: amount,
			});
		}
		if from == to {
			return Ok(());
		}

		let new_to_balance = state
			.balance(&(token, to))
			.checked_add(amount)
			.ok_or(LedgerError::Overflow)?;

		state.write((token, from), from_balance - amount);
		state.write((token, to), new_to_balance);
		Ok(())
	}

	fn checkpoint(&self) -> LedgerCheckpoint {
		let mut state = self.state.lock();
		state.open_checkpoints += 1;
		LedgerCheckpoint(state.undo.len())
	}

	fn commit(&self, _checkpoint: LedgerCheckpoint) {
		self.state.lock().close();
	}

	fn revert_to(&self, checkpoint: LedgerCheckpoint) {
		let mut state = self.state.lock();
		while state.undo.len() > checkpoint.0 {
			if let Some((key, previous)) = state.undo.pop() {
				state.balances.insert(key, previous);
			}
		}
		state.close();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transfer_moves_balance() {
		let ledger = InMemoryLedger::new();
		let token = Bytes32::repeat_byte(1);
		let (alice, bob) = (Bytes32::repeat_byte(2), Bytes32::repeat_byte(3));

		ledger.mint(token, alice, U256::from(10)).unwrap();
		ledger.transfer_from(token, alice, bob, U256::from(4)).unwrap();

		assert_eq!(ledger.balance_of(token, alice), U256::from(6));
		assert_eq!(ledger.balance_of(token, bob), U256::from(4));
	}

	#[test]
	fn test_insufficient_balance_changes_nothing() {
		let ledger = InMemoryLedger::new();
		let token = Bytes32::repeat_byte(1);
		let (alice, bob) = (Bytes32::repeat_byte(2), Bytes32::repeat_byte(3));
		ledger.mint(token, alice, U256::from(1)).unwrap();

		assert!(matches!(
			ledger.transfer_from(token, alice, bob, U256::from(2)),
			Err(LedgerError::InsufficientBalance { .. })
		));
		assert_eq!(ledger.balance_of(token, alice), U256::from(1));
		assert_eq!(ledger.balance_of(token, bob), U256::ZERO);
	}

	#[test]
	fn test_revert_restores_balances() {
		let ledger = InMemoryLedger::new();
		let token = Bytes32::repeat_byte(1);
		let (alice, bob, carol) = (
			Bytes32::repeat_byte(2),
			Bytes32::repeat_byte(3),
			Bytes32::repeat_byte(4),
		);
		ledger.mint(token, alice, U256::from(10)).unwrap();

		let checkpoint = ledger.checkpoint();
		ledger.transfer_from(token, alice, bob, U256::from(4)).unwrap();
		ledger.transfer_from(token, bob, carol, U256::from(3)).unwrap();
		ledger.revert_to(checkpoint);

		assert_eq!(ledger.balance_of(token, alice), U256::from(10));
		assert_eq!(ledger.balance_of(token, bob), U256::ZERO);
		assert_eq!(ledger.balance_of(token, carol), U256::ZERO);
	}

	#[test]
	fn test_nested_commit_is_reverted_by_outer() {
		let ledger = InMemoryLedger::new();
		let token = Bytes32::repeat_byte(1);
		let (alice, bob) = (Bytes32::repeat_byte(2), Bytes32::repeat_byte(3));
		ledger.mint(token, alice, U256::from(10)).unwrap();

		let outer = ledger.checkpoint();
		ledger.transfer_from(token, alice, bob, U256::from(1)).unwrap();
		let inner = ledger.checkpoint();
		ledger.transfer_from(token, alice, bob, U256::from(2)).unwrap();
		ledger.commit(inner);
		assert_eq!(ledger.balance_of(token, bob), U256::from(3));

		ledger.revert_to(outer);
		assert_eq!(ledger.balance_of(token, alice), U256::from(10));
		assert_eq!(ledger.balance_of(token, bob), U256::ZERO);
	}

	#[test]
	fn test_committed_changes_stay() {
		let ledger = InMemoryLedger::new();
		let token = Bytes32::repeat_byte(1);
		let (alice, bob) = (Bytes32::repeat_byte(2), Bytes32::repeat_byte(3));
		ledger.mint(token, alice, U256::from(10)).unwrap();

		let checkpoint = ledger.checkpoint();
		ledger.transfer_from(token, alice, bob, U256::from(4)).unwrap();
		ledger.commit(checkpoint);

		// A later revert to a fresh checkpoint does not reach committed work.
		let later = ledger.checkpoint();
		ledger.revert_to(later);
		assert_eq!(ledger.balance_of(token, bob), U256::from(4));
	}

	#[test]
	fn test_mint_overflow() {
		let ledger = InMemoryLedger::new();
		ledger
			.mint(Bytes32::ZERO, Bytes32::ZERO, U256::MAX)
			.unwrap();
		assert_eq!(
			ledger.mint(Bytes32::ZERO, Bytes32::ZERO, U256::from(1)),
			Err(LedgerError::Overflow)
		);
	}
}
