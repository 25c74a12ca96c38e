//! Solidity bindings for the EVM output settler and input oracle.

use alloy_sol_types::sol;

pub use alloy_primitives::aliases::U48;

use crate::output;

sol! {
	/// MandateOutput structure used in fill operations.
	#[derive(Debug, PartialEq, Eq)]
	struct MandateOutput {
		bytes32 oracle;
		bytes32 settler;
		uint256 chainId;
		bytes32 token;
		uint256 amount;
		bytes32 recipient;
		bytes callbackData;
		bytes context;
	}

	/// IOutputSettler interface for filling orders.
	interface IOutputSettler {
		function fill(bytes32 orderId, MandateOutput calldata output, uint48 fillDeadline, bytes calldata fillerData) external returns (bytes32);
		function fillOrderOutputs(bytes32 orderId, MandateOutput[] calldata outputs, bytes calldata fillerData) external;
	}

	/// IInputOracle interface consumed by input settlers.
	interface IInputOracle {
		function efficientRequireProven(bytes proofSeries) external view;
		function isProven(uint256 remoteChainId, bytes32 remoteOracle, bytes32 application, bytes32 dataHash) external view returns (bool);
	}
}

impl From<&output::MandateOutput> for MandateOutput {
	fn from(output: &output::MandateOutput) -> Self {
		Self {
			oracle: output.oracle,
			settler: output.settler,
			chainId: output.chain_id,
			token: output.token,
			amount: output.amount,
			recipient: output.recipient,
			callbackData: output.callback_data.clone().into(),
			context: output.context.clone().into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Bytes32, U256};
	use alloy_sol_types::SolCall;

	#[test]
	fn test_fill_selectors() {
		assert_eq!(IOutputSettler::fillCall::SELECTOR, [0x97, 0x8f, 0xb8, 0x96]);
		assert_eq!(
			IOutputSettler::fillOrderOutputsCall::SELECTOR,
			[0xdd, 0xc1, 0xf8, 0x82]
		);
		assert_eq!(
			IInputOracle::efficientRequireProvenCall::SELECTOR,
			[0xae, 0x0d, 0xd7, 0x70]
		);
		assert_eq!(IInputOracle::isProvenCall::SELECTOR, [0x3f, 0xf0, 0x4a, 0xff]);
	}

	#[test]
	fn test_fill_call_encoding_starts_with_selector() {
		let output = output::MandateOutput {
			oracle: Bytes32::repeat_byte(1),
			settler: Bytes32::repeat_byte(2),
			chain_id: U256::from(1),
			token: Bytes32::repeat_byte(3),
			amount: U256::from(5),
			recipient: Bytes32::repeat_byte(4),
			callback_data: vec![],
			context: vec![],
		};
		let call = IOutputSettler::fillCall {
			orderId: Bytes32::repeat_byte(7),
			output: (&output).into(),
			fillDeadline: U48::from(100u32),
			fillerData: Bytes32::repeat_byte(9).to_vec().into(),
		};
		let encoded = call.abi_encode();

		assert_eq!(&encoded[..4], &IOutputSettler::fillCall::SELECTOR);
		// orderId is the first static word after the selector.
		assert_eq!(&encoded[4..36], Bytes32::repeat_byte(7).as_slice());
	}
}
