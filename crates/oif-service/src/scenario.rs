//! Local fill-and-prove simulation.
//!
//! A scenario fills outputs on the configured output settler, sends the
//! fill descriptions through the local oracle pair and checks that the
//! origin side accepts them as proven. Fill records and attestations are
//! kept in the configured storage backend, so a file-backed scenario run
//! twice sees the first run's state.

use anyhow::{Context, Result};
use oif_encoding::{encode_fill_description_from_output, hash_mandate_output, keccak256};
use oif_oracle::attestation::{encode_proof_series, AttestationKey};
use oif_oracle::chain_map::ChainMap;
use oif_oracle::implementations::direct::DirectAdapter;
use oif_oracle::oracle::{InputOracle, OutputOracle};
use oif_settler::{
	fill_record_hash, FillRecordEntry, InMemoryLedger, OutputSettler, SettlerError,
};
use oif_storage::{create_storage, StorageService};
use oif_types::serde_helpers::{padded_bytes32, u256_string};
use oif_types::{
	chain_id, Bytes32, CallContext, Config, EventBus, FillableOutput, MandateOutput, ProtocolEvent,
	Timestamp, U256,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const SETTLER_NAMESPACE: &str = "settler";
const ORACLE_NAMESPACE: &str = "oracle";
const FILL_RECORDS: &str = "fill_records";
const ATTESTATIONS: &str = "attestations";

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
	/// Protocol identifier the origin chain's input oracle is reached at.
	pub origin_chain: u64,
	#[serde(default)]
	pub balances: Vec<Balance>,
	#[serde(default)]
	pub fills: Vec<FillStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
	#[serde(with = "padded_bytes32")]
	pub token: Bytes32,
	#[serde(with = "padded_bytes32")]
	pub owner: Bytes32,
	#[serde(with = "u256_string")]
	pub amount: U256,
}

/// One call to the settler, made by `solver` at `timestamp`.
#[derive(Debug, Clone, Deserialize)]
pub struct FillStep {
	#[serde(with = "padded_bytes32")]
	pub order_id: Bytes32,
	#[serde(with = "padded_bytes32")]
	pub solver: Bytes32,
	pub timestamp: Timestamp,
	/// Fill all outputs in one `fill_order_outputs` call.
	#[serde(default)]
	pub batch: bool,
	/// Send the resulting fill descriptions to the origin chain.
	#[serde(default = "default_submit")]
	pub submit: bool,
	pub outputs: Vec<FillableOutput>,
}

fn default_submit() -> bool {
	true
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputReport {
	output_hash: Bytes32,
	fill_record: Option<Bytes32>,
	/// Whether this step's solver owns the fill.
	filled_by_solver: bool,
	proven: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepReport {
	order_id: Bytes32,
	solver: Bytes32,
	outputs: Vec<OutputReport>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<String>,
}

pub async fn load(path: &Path) -> Result<Scenario> {
	let content = tokio::fs::read_to_string(path)
		.await
		.with_context(|| format!("Failed to read scenario {}", path.display()))?;
	toml::from_str(&content).with_context(|| format!("Invalid scenario {}", path.display()))
}

/// The settler, its ledger and the oracle pair wired together from
/// configuration.
struct Simulation {
	config: Config,
	events: EventBus,
	ledger: Arc<InMemoryLedger>,
	settler: Arc<OutputSettler>,
	input_oracle: Arc<InputOracle>,
	output_oracle: OutputOracle,
	storage: StorageService,
	origin_chain: u64,
}

impl Simulation {
	fn new(config: &Config, origin_chain: u64) -> Result<Self> {
		let events = EventBus::default();
		let ledger = Arc::new(InMemoryLedger::new());
		let settler = Arc::new(OutputSettler::new(
			config.settler.chain_id,
			config.settler.address,
			ledger.clone(),
			events.clone(),
		));

		let chain_map = ChainMap::from_mappings(&config.oracle.chain_map)?;
		let settler_protocol_id = chain_map
			.get_protocol_id(config.settler.chain_id)
			.context("Settler chain has no chain mapping")?;
		let input_oracle = Arc::new(InputOracle::new(
			config.oracle.address,
			chain_map,
			events.clone(),
		));

		let adapter = DirectAdapter::new(settler_protocol_id);
		adapter.register(origin_chain, input_oracle.clone());
		let output_oracle = OutputOracle::new(config.oracle.address, Arc::new(adapter), events.clone());

		Ok(Self {
			config: config.clone(),
			events,
			ledger,
			settler,
			input_oracle,
			output_oracle,
			storage: StorageService::new(create_storage(&config.storage)),
			origin_chain,
		})
	}

	async fn restore(&self) -> Result<()> {
		if let Some(records) = self
			.storage
			.retrieve_optional::<Vec<FillRecordEntry>>(SETTLER_NAMESPACE, FILL_RECORDS)
			.await?
		{
			info!(count = records.len(), "Restoring fill records");
			self.settler.restore(records);
		}
		if let Some(keys) = self
			.storage
			.retrieve_optional::<Vec<AttestationKey>>(ORACLE_NAMESPACE, ATTESTATIONS)
			.await?
		{
			info!(count = keys.len(), "Restoring attestations");
			self.input_oracle.attestations().restore(keys);
		}
		Ok(())
	}

	async fn persist(&self) -> Result<()> {
		self.storage
			.store(SETTLER_NAMESPACE, FILL_RECORDS, &self.settler.snapshot())
			.await?;
		self.storage
			.store(
				ORACLE_NAMESPACE,
				ATTESTATIONS,
				&self.input_oracle.attestations().snapshot(),
			)
			.await?;
		Ok(())
	}

	fn fill(&self, step: &FillStep) -> Result<(), SettlerError> {
		let ctx = CallContext::new(step.solver, step.timestamp);
		let filler_data = step.solver.as_slice();
		if step.batch {
			self.settler
				.fill_order_outputs(&ctx, step.order_id, &step.outputs, filler_data)
		} else {
			for output in &step.outputs {
				self.settler.fill(&ctx, step.order_id, output, filler_data)?;
			}
			Ok(())
		}
	}

	async fn run_step(&self, step: &FillStep) -> Result<StepReport> {
		let error = self.fill(step).err().map(|e| e.to_string());
		let own_record = fill_record_hash(&step.solver, step.timestamp);

		let mut outputs = Vec::with_capacity(step.outputs.len());
		let mut payloads = Vec::new();
		for fillable in &step.outputs {
			let output = &fillable.output;
			let fill_record = self
				.settler
				.get_fill_record_for_output(step.order_id, output)?;
			let filled_by_solver = fill_record == Some(own_record);
			if filled_by_solver {
				payloads.push(encode_fill_description_from_output(
					&step.solver,
					&step.order_id,
					step.timestamp,
					output,
				)?);
			}
			outputs.push(OutputReport {
				output_hash: hash_mandate_output(output)?,
				fill_record,
				filled_by_solver,
				proven: false,
			});
		}

		if step.submit && !payloads.is_empty() {
			if let Err(e) = self
				.output_oracle
				.submit(self.origin_chain, self.settler.as_ref(), &payloads)
				.await
			{
				warn!(order_id = %step.order_id, error = %e, "Submission failed");
			}
		}

		for (report, fillable) in outputs.iter_mut().zip(&step.outputs) {
			if report.filled_by_solver {
				report.proven = self.is_proven(step, &fillable.output)?;
			}
		}

		Ok(StepReport {
			order_id: step.order_id,
			solver: step.solver,
			outputs,
			error,
		})
	}

	/// Checks the fill of `output` the way an input settler on the origin
	/// chain would.
	fn is_proven(&self, step: &FillStep, output: &MandateOutput) -> Result<bool> {
		let payload = encode_fill_description_from_output(
			&step.solver,
			&step.order_id,
			step.timestamp,
			output,
		)?;
		let key = AttestationKey::new(
			chain_id(self.config.settler.chain_id),
			output.oracle,
			self.settler.address(),
			keccak256(&payload),
		);
		Ok(self
			.input_oracle
			.efficient_require_proven(&encode_proof_series([&key]))
			.is_ok())
	}
}

/// Runs `scenario` and reports every step, the resulting balances and the
/// committed events.
pub async fn run(config: &Config, scenario: &Scenario) -> Result<Value> {
	let simulation = Simulation::new(config, scenario.origin_chain)?;
	let mut receiver = simulation.events.subscribe();
	simulation.restore().await?;

	for balance in &scenario.balances {
		simulation
			.ledger
			.mint(balance.token, balance.owner, balance.amount)?;
	}

	let mut steps = Vec::with_capacity(scenario.fills.len());
	for step in &scenario.fills {
		steps.push(simulation.run_step(step).await?);
	}
	simulation.persist().await?;

	let mut events: Vec<ProtocolEvent> = Vec::new();
	while let Ok(event) = receiver.try_recv() {
		events.push(event);
	}

	let balances: Vec<Value> = scenario
		.balances
		.iter()
		.map(|balance| {
			json!({
				"token": balance.token.to_string(),
				"owner": balance.owner.to_string(),
				"balance": simulation
					.ledger
					.balance_of(balance.token, balance.owner)
					.to_string(),
			})
		})
		.collect();

	Ok(json!({
		"steps": steps,
		"balances": balances,
		"events": events,
		"attestations": simulation.input_oracle.attestations().len(),
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use oif_types::{
		ChainMapping, OracleSettings, ServiceSettings, SettlerEvent, SettlerSettings,
		StorageBackend, StorageSettings,
	};

	fn word(byte: u8) -> String {
		format!("0x{}", hex::encode([byte; 32]))
	}

	fn config(storage: StorageSettings) -> Config {
		Config {
			service: ServiceSettings {
				name: "test".to_string(),
				log_level: "info".to_string(),
			},
			settler: SettlerSettings {
				chain_id: 10,
				address: Bytes32::repeat_byte(0x5e),
			},
			oracle: OracleSettings {
				address: Bytes32::repeat_byte(0x0b),
				chain_map: vec![ChainMapping {
					protocol_id: 2,
					chain_id: 10,
				}],
			},
			storage,
		}
	}

	fn memory() -> StorageSettings {
		StorageSettings {
			backend: StorageBackend::Memory,
			path: String::new(),
		}
	}

	fn scenario(second_solver: u8, batch: bool) -> Scenario {
		let content = format!(
			r#"
origin_chain = 1

[[balances]]
token = "{token}"
owner = "{solver}"
amount = "1000"

[[balances]]
token = "{token}"
owner = "{other}"
amount = "1000"

[[fills]]
order_id = "0x01"
solver = "{solver}"
timestamp = 1000
batch = {batch}
[[fills.outputs]]
fillDeadline = 2000
oracle = "{oracle}"
settler = "{settler}"
chainId = "10"
token = "{token}"
amount = "100"
recipient = "{recipient}"
callbackData = "0x"
context = "0x"

[[fills]]
order_id = "0x01"
solver = "{other}"
timestamp = 1001
[[fills.outputs]]
fillDeadline = 2000
oracle = "{oracle}"
settler = "{settler}"
chainId = "10"
token = "{token}"
amount = "100"
recipient = "{recipient}"
callbackData = "0x"
context = "0x"
"#,
			token = word(0x70),
			solver = word(0x50),
			other = word(second_solver),
			oracle = word(0x0b),
			settler = word(0x5e),
			recipient = word(0x4e),
			batch = batch,
		);
		toml::from_str(&content).unwrap()
	}

	fn filled_events(report: &Value) -> usize {
		let events: Vec<ProtocolEvent> = serde_json::from_value(report["events"].clone()).unwrap();
		events
			.iter()
			.filter(|event| matches!(event, ProtocolEvent::Settler(SettlerEvent::OutputFilled { .. })))
			.count()
	}

	#[test]
	fn test_scenario_parses() {
		let scenario = scenario(0x51, false);
		assert_eq!(scenario.origin_chain, 1);
		assert_eq!(scenario.fills.len(), 2);
		assert!(scenario.fills[0].submit);
		assert_eq!(scenario.fills[0].outputs[0].fill_deadline, 2000);
		assert_eq!(scenario.fills[0].outputs[0].output.amount, U256::from(100));
		assert_eq!(scenario.fills[0].order_id, Bytes32::left_padding_from(&[1]));
	}

	#[tokio::test]
	async fn test_fill_is_proven_once() {
		let report = run(&config(memory()), &scenario(0x51, false))
			.await
			.unwrap();

		let first = &report["steps"][0]["outputs"][0];
		assert_eq!(first["filledBySolver"], true);
		assert_eq!(first["proven"], true);

		// The second solver finds the output taken and proves nothing.
		let second = &report["steps"][1]["outputs"][0];
		assert_eq!(second["filledBySolver"], false);
		assert_eq!(second["proven"], false);
		assert_eq!(second["fillRecord"], first["fillRecord"]);

		assert_eq!(report["balances"][0]["balance"], "900");
		assert_eq!(report["balances"][1]["balance"], "1000");
		assert_eq!(report["attestations"], 1);
		assert_eq!(filled_events(&report), 1);
	}

	#[tokio::test]
	async fn test_batch_step_reports_error() {
		let mut scenario = scenario(0x51, true);
		scenario.fills[1].batch = true;
		let report = run(&config(memory()), &scenario).await.unwrap();

		assert!(report["steps"][0].get("error").is_none());
		assert!(report["steps"][1]["error"]
			.as_str()
			.unwrap()
			.contains("Already filled"));
		assert_eq!(report["balances"][1]["balance"], "1000");
	}

	#[tokio::test]
	async fn test_unmapped_settler_chain_is_rejected() {
		let mut config = config(memory());
		config.oracle.chain_map.clear();
		assert!(run(&config, &scenario(0x51, false)).await.is_err());
	}

	#[tokio::test]
	async fn test_file_storage_carries_state_between_runs() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(StorageSettings {
			backend: StorageBackend::File,
			path: dir.path().to_string_lossy().to_string(),
		});

		let first = run(&config, &scenario(0x51, false)).await.unwrap();
		assert_eq!(filled_events(&first), 1);

		// Same fills again: the restored records make every fill a no-op.
		let second = run(&config, &scenario(0x51, false)).await.unwrap();
		assert_eq!(filled_events(&second), 0);
		assert_eq!(second["balances"][0]["balance"], "1000");
		assert_eq!(second["steps"][0]["outputs"][0]["proven"], true);
		assert_eq!(second["attestations"], 1);
	}
}
