//! Order types carried in a mandate output's `context`.
//!
//! | Tag    | Order type      | Length | Layout after the tag                  |
//! |--------|-----------------|--------|---------------------------------------|
//! | (none) | limit           | 0      |                                       |
//! | `0x00` | limit           | 1      |                                       |
//! | `0x01` | Dutch auction   | 41     | start(4) stop(4) slope(32)            |
//! | `0xe0` | exclusive limit | 37     | exclusiveFor(32) start(4)             |
//! | `0xe1` | exclusive Dutch | 73     | exclusiveFor(32) start(4) stop(4) slope(32) |
//!
//! The context is decoded once into an [`OrderType`] and resolved against
//! the proposed solver and the current time.

use crate::SettlerError;
use alloy_primitives::U256;
use oif_types::{Bytes32, MandateOutput, Timestamp};

pub const LIMIT: u8 = 0x00;
pub const DUTCH_AUCTION: u8 = 0x01;
pub const EXCLUSIVE_LIMIT: u8 = 0xe0;
pub const EXCLUSIVE_DUTCH_AUCTION: u8 = 0xe1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
	Limit,
	DutchAuction {
		start_time: Timestamp,
		stop_time: Timestamp,
		slope: U256,
	},
	ExclusiveLimit {
		exclusive_for: Bytes32,
		start_time: Timestamp,
	},
	ExclusiveDutchAuction {
		exclusive_for: Bytes32,
		start_time: Timestamp,
		stop_time: Timestamp,
		slope: U256,
	},
}

fn u32_at(context: &[u8], offset: usize) -> Timestamp {
	u32::from_be_bytes([
		context[offset],
		context[offset + 1],
		context[offset + 2],
		context[offset + 3],
	])
}

fn expect_length(context: &[u8], tag: u8, expected: usize) -> Result<(), SettlerError> {
	if context.len() != expected {
		return Err(SettlerError::InvalidContextDataLength {
			tag,
			length: context.len(),
		});
	}
	Ok(())
}

impl OrderType {
	pub fn decode(context: &[u8]) -> Result<Self, SettlerError> {
		let Some(&tag) = context.first() else {
			return Ok(OrderType::Limit);
		};

		match tag {
			LIMIT => {
				expect_length(context, tag, 1)?;
				Ok(OrderType::Limit)
			}
			DUTCH_AUCTION => {
				expect_length(context, tag, 41)?;
				Ok(OrderType::DutchAuction {
					start_time: u32_at(context, 1),
					stop_time: u32_at(context, 5),
					slope: U256::from_be_slice(&context[9..41]),
				})
			}
			EXCLUSIVE_LIMIT => {
				expect_length(context, tag, 37)?;
				Ok(OrderType::ExclusiveLimit {
					exclusive_for: Bytes32::from_slice(&context[1..33]),
					start_time: u32_at(context, 33),
				})
			}
			EXCLUSIVE_DUTCH_AUCTION => {
				expect_length(context, tag, 73)?;
				Ok(OrderType::ExclusiveDutchAuction {
					exclusive_for: Bytes32::from_slice(&context[1..33]),
					start_time: u32_at(context, 33),
					stop_time: u32_at(context, 37),
					slope: U256::from_be_slice(&context[41..73]),
				})
			}
			other => Err(SettlerError::NotImplemented(other)),
		}
	}

	/// Returns the solver to credit and the amount to pay.
	pub fn resolve(
		&self,
		amount: U256,
		proposed_solver: Bytes32,
		now: Timestamp,
	) -> Result<(Bytes32, U256), SettlerError> {
		match *self {
			OrderType::Limit => Ok((proposed_solver, amount)),
			OrderType::DutchAuction {
				start_time,
				stop_time,
				slope,
			} => Ok((
				proposed_solver,
				dutch_auction_amount(amount, start_time, stop_time, slope, now)?,
			)),
			OrderType::ExclusiveLimit {
				exclusive_for,
				start_time,
			} => {
				check_exclusivity(exclusive_for, start_time, proposed_solver, now)?;
				Ok((proposed_solver, amount))
			}
			OrderType::ExclusiveDutchAuction {
				exclusive_for,
				start_time,
				stop_time,
				slope,
			} => {
				check_exclusivity(exclusive_for, start_time, proposed_solver, now)?;
				Ok((
					proposed_solver,
					dutch_auction_amount(amount, start_time, stop_time, slope, now)?,
				))
			}
		}
	}
}

fn check_exclusivity(
	exclusive_for: Bytes32,
	start_time: Timestamp,
	solver: Bytes32,
	now: Timestamp,
) -> Result<(), SettlerError> {
	if now < start_time && solver != exclusive_for {
		return Err(SettlerError::ExclusiveTo(exclusive_for));
	}
	Ok(())
}

/// Linear decay from `amount + slope * (stop - start)` down to `amount`.
///
/// Before `start_time` the price is held at its maximum; after `stop_time`
/// it stays at `amount`.
fn dutch_auction_amount(
	amount: U256,
	start_time: Timestamp,
	stop_time: Timestamp,
	slope: U256,
	now: Timestamp,
) -> Result<U256, SettlerError> {
	let current = now.max(start_time);
	if stop_time < current {
		return Ok(amount);
	}

	let remaining = U256::from(stop_time - current);
	slope
		.checked_mul(remaining)
		.and_then(|premium| amount.checked_add(premium))
		.ok_or(SettlerError::AmountOverflow)
}

/// Decodes `output.context` and resolves it for `proposed_solver` at `now`.
pub fn resolve_output(
	output: &MandateOutput,
	proposed_solver: Bytes32,
	now: Timestamp,
) -> Result<(Bytes32, U256), SettlerError> {
	OrderType::decode(&output.context)?.resolve(output.amount, proposed_solver, now)
}
