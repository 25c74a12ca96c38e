//! Output settler state machine.
//!
//! Per (order id, output hash) an output is either unfilled or filled by a
//! (solver, timestamp) pair, stored as `keccak256(solver || timestamp)`.
//! Records are written before any external call and never change afterwards.
//!
//! Every public operation runs as one transaction. Transactions are
//! serialized by a reentrant lock: a recipient callback may call back into
//! the settler on the same thread, while other threads wait for the whole
//! transaction to finish. Each transaction journals the records it writes
//! and holds a ledger checkpoint; a failing transaction removes its records
//! and reverts the ledger, including transfers made by callbacks. Events are
//! published only when the outermost transaction commits.

use crate::callback::{CallbackError, OutputCallback};
use crate::journal::{FillKey, Journal};
use crate::ledger::TokenLedger;
use crate::order_type::resolve_output;
use crate::SettlerError;
use alloy_primitives::U256;
use oif_encoding::{
	fill_description_common_payload, fill_description_order_id, fill_description_solver,
	fill_description_timestamp, hash_mandate_output, keccak256,
	mandate_output_hash_from_common_payload, EncodingError,
};
use oif_types::{
	Bytes32, CallContext, EventBus, FillableOutput, MandateOutput, PayloadCreator, SettlerEvent,
	Timestamp,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A persisted fill record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRecordEntry {
	pub order_id: Bytes32,
	pub output_hash: Bytes32,
	pub fill_record_hash: Bytes32,
}

#[derive(Default)]
struct SettlerState {
	records: HashMap<FillKey, Bytes32>,
	journal: Journal,
	pending_events: Vec<SettlerEvent>,
	/// Nesting depth of running transactions.
	depth: usize,
}

/// `keccak256(solver || timestamp)` with a 4-byte big-endian timestamp.
pub fn fill_record_hash(solver: &Bytes32, timestamp: Timestamp) -> Bytes32 {
	let mut data = [0u8; 36];
	data[..32].copy_from_slice(solver.as_slice());
	data[32..].copy_from_slice(&timestamp.to_be_bytes());
	keccak256(data)
}

/// Reads the solver proposed in the first 32 bytes of `filler_data`.
pub fn proposed_solver(filler_data: &[u8]) -> Result<Bytes32, SettlerError> {
	let solver = filler_data
		.get(..32)
		.map(Bytes32::from_slice)
		.ok_or(SettlerError::InvalidFillerData(filler_data.len()))?;
	if solver.is_zero() {
		return Err(SettlerError::ZeroValue);
	}
	Ok(solver)
}

fn check_deadline(fill_deadline: Timestamp, now: Timestamp) -> Result<(), SettlerError> {
	if fill_deadline < now {
		return Err(SettlerError::FillDeadline {
			deadline: fill_deadline,
			now,
		});
	}
	Ok(())
}

pub struct OutputSettler {
	chain_id: U256,
	address: Bytes32,
	ledger: Arc<dyn TokenLedger>,
	callbacks: RwLock<HashMap<Bytes32, Arc<dyn OutputCallback>>>,
	events: EventBus,
	transaction: ReentrantMutex<()>,
	state: Mutex<SettlerState>,
}

impl OutputSettler {
	pub fn new(
		chain_id: u64,
		address: Bytes32,
		ledger: Arc<dyn TokenLedger>,
		events: EventBus,
	) -> Self {
		Self {
			chain_id: U256::from(chain_id),
			address,
			ledger,
			callbacks: RwLock::new(HashMap::new()),
			events,
			transaction: ReentrantMutex::new(()),
			state: Mutex::new(SettlerState::default()),
		}
	}

	pub fn chain_id(&self) -> U256 {
		self.chain_id
	}

	pub fn address(&self) -> Bytes32 {
		self.address
	}

	/// Registers the callback invoked for outputs paid to `recipient`.
	pub fn register_callback(&self, recipient: Bytes32, callback: Arc<dyn OutputCallback>) {
		self.callbacks.write().insert(recipient, callback);
	}

	/// Fills one output, or returns the existing record if it is already
	/// filled.
	pub fn fill(
		&self,
		ctx: &CallContext,
		order_id: Bytes32,
		output: &FillableOutput,
		filler_data: &[u8],
	) -> Result<Bytes32, SettlerError> {
		let result = self.transact(|| self.fill_output(ctx, order_id, output, filler_data));
		if let Err(e) = &result {
			warn!(%order_id, caller = %ctx.caller, error = %e, "Fill rejected");
		}
		result
	}

	/// Fills every output of an order, left to right.
	///
	/// The caller must win the first output: if it was already filled by
	/// anyone else, or at another time, the batch fails with
	/// [`SettlerError::AlreadyFilled`]. Later outputs that are already filled
	/// are skipped. Any failure reverts the whole batch.
	pub fn fill_order_outputs(
		&self,
		ctx: &CallContext,
		order_id: Bytes32,
		outputs: &[FillableOutput],
		filler_data: &[u8],
	) -> Result<(), SettlerError> {
		let result = self.transact(|| {
			let (first, rest) = outputs.split_first().ok_or(SettlerError::NoOutputs)?;
			check_deadline(first.fill_deadline, ctx.timestamp)?;
			let solver = proposed_solver(filler_data)?;

			let record = self.fill_output(ctx, order_id, first, filler_data)?;
			if record != fill_record_hash(&solver, ctx.timestamp) {
				return Err(SettlerError::AlreadyFilled);
			}

			for output in rest {
				self.fill_output(ctx, order_id, output, filler_data)?;
			}
			Ok(())
		});
		if let Err(e) = &result {
			warn!(%order_id, caller = %ctx.caller, outputs = outputs.len(), error = %e, "Batch fill rejected");
		}
		result
	}

	pub fn get_fill_record(&self, order_id: Bytes32, output_hash: Bytes32) -> Option<Bytes32> {
		self.state
			.lock()
			.records
			.get(&FillKey {
				order_id,
				output_hash,
			})
			.copied()
	}

	pub fn get_fill_record_for_output(
		&self,
		order_id: Bytes32,
		output: &MandateOutput,
	) -> Result<Option<Bytes32>, SettlerError> {
		Ok(self.get_fill_record(order_id, hash_mandate_output(output)?))
	}

	/// All committed fill records, sorted by key.
	pub fn snapshot(&self) -> Vec<FillRecordEntry> {
		let _transaction = self.transaction.lock();
		let state = self.state.lock();
		let mut entries: Vec<_> = state
			.records
			.iter()
			.map(|(key, record)| FillRecordEntry {
				order_id: key.order_id,
				output_hash: key.output_hash,
				fill_record_hash: *record,
			})
			.collect();
		entries.sort_by_key(|entry| (entry.order_id, entry.output_hash));
		entries
	}

	/// Loads persisted fill records. Existing records are kept as they are.
	pub fn restore(&self, entries: impl IntoIterator<Item = FillRecordEntry>) {
		let _transaction = self.transaction.lock();
		let mut state = self.state.lock();
		for entry in entries {
			state
				.records
				.entry(FillKey {
					order_id: entry.order_id,
					output_hash: entry.output_hash,
				})
				.or_insert(entry.fill_record_hash);
		}
	}

	fn fill_output(
		&self,
		ctx: &CallContext,
		order_id: Bytes32,
		fillable: &FillableOutput,
		filler_data: &[u8],
	) -> Result<Bytes32, SettlerError> {
		check_deadline(fillable.fill_deadline, ctx.timestamp)?;

		let output = &fillable.output;
		if output.chain_id != self.chain_id {
			return Err(SettlerError::WrongChain {
				expected: self.chain_id,
				actual: output.chain_id,
			});
		}
		if output.settler != self.address {
			return Err(SettlerError::WrongOutputSettler(output.settler));
		}

		let (solver, amount) =
			resolve_output(output, proposed_solver(filler_data)?, ctx.timestamp)?;
		let key = FillKey {
			order_id,
			output_hash: hash_mandate_output(output)?,
		};

		// Record first; the state lock is released before any external call.
		let record = {
			let mut state = self.state.lock();
			if let Some(existing) = state.records.get(&key) {
				debug!(%order_id, output_hash = %key.output_hash, "Output already filled");
				return Ok(*existing);
			}
			let record = fill_record_hash(&solver, ctx.timestamp);
			state.records.insert(key, record);
			state.journal.push(key);
			record
		};

		self.ledger
			.transfer_from(output.token, ctx.caller, output.recipient, amount)?;

		if !output.callback_data.is_empty() {
			let callback = self
				.callbacks
				.read()
				.get(&output.recipient)
				.cloned()
				.ok_or(CallbackError::NotRegistered(output.recipient))?;
			callback.output_filled(output.token, amount, &output.callback_data)?;
		}

		info!(
			%order_id,
			%solver,
			output_hash = %key.output_hash,
			amount = %amount,
			timestamp = ctx.timestamp,
			"Output filled"
		);
		self.state
			.lock()
			.pending_events
			.push(SettlerEvent::OutputFilled {
				order_id,
				solver,
				timestamp: ctx.timestamp,
				output: output.clone(),
				final_amount: amount,
			});

		Ok(record)
	}

	fn transact<T>(
		&self,
		operation: impl FnOnce() -> Result<T, SettlerError>,
	) -> Result<T, SettlerError> {
		let _transaction = self.transaction.lock();
		let (journal_checkpoint, events_checkpoint) = {
			let mut state = self.state.lock();
			state.depth += 1;
			(state.journal.checkpoint(), state.pending_events.len())
		};
		let ledger_checkpoint = self.ledger.checkpoint();

		let result = operation();

		let committed = {
			let mut state = self.state.lock();
			state.depth -= 1;
			match &result {
				Ok(_) => {
					self.ledger.commit(ledger_checkpoint);
					if state.depth == 0 {
						state.journal.clear();
						std::mem::take(&mut state.pending_events)
					} else {
						Vec::new()
					}
				}
				Err(_) => {
					self.ledger.revert_to(ledger_checkpoint);
					state.pending_events.truncate(events_checkpoint);
					for key in state.journal.revert_to(journal_checkpoint) {
						state.records.remove(&key);
					}
					Vec::new()
				}
			}
		};

		for event in committed {
			self.events.publish(event);
		}

		result
	}

	fn payload_is_recorded(
		&self,
		records: &HashMap<FillKey, Bytes32>,
		oracle: &Bytes32,
		payload: &[u8],
	) -> Result<bool, EncodingError> {
		let order_id = fill_description_order_id(payload)?;
		let solver = fill_description_solver(payload)?;
		let timestamp = fill_description_timestamp(payload)?;
		let output_hash = mandate_output_hash_from_common_payload(
			oracle,
			&self.address,
			&self.chain_id,
			fill_description_common_payload(payload)?,
		);

		Ok(records.get(&FillKey {
			order_id,
			output_hash,
		}) == Some(&fill_record_hash(&solver, timestamp)))
	}
}

impl PayloadCreator for OutputSettler {
	fn application(&self) -> Bytes32 {
		self.address
	}

	/// True when every payload is a fill description matching a committed
	/// fill of an output that names `oracle`, this settler and this chain.
	fn has_attested(&self, oracle: Bytes32, payloads: &[Vec<u8>]) -> bool {
		let _transaction = self.transaction.lock();
		let state = self.state.lock();
		payloads.iter().all(|payload| {
			self.payload_is_recorded(&state.records, &oracle, payload)
				.unwrap_or(false)
		})
	}
}
