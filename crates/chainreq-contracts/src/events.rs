//! Event log decoding against decorator events.

use crate::encoding::event_topic;
use crate::params::{is_reference_type, parameter_sol_type, value_to_json};
use alloy::dyn_abi::{DynSolType, DynSolValue};
use chainreq_types::{ContractEvent, EventArgument, EventInfo, RawLog, B256};
use std::collections::HashMap;

struct PreparedEvent {
	signature: String,
	/// Argument name, ABI type and whether it is indexed, in declaration order.
	inputs: Vec<(String, DynSolType, bool)>,
}

/// Decodes raw logs into [`EventInfo`] values for a set of known events.
///
/// Logs are matched on topic zero. Logs of unknown events and anonymous logs
/// are skipped; a log whose payload does not fit the event is dropped.
pub struct EventLogDecoder {
	events: HashMap<B256, PreparedEvent>,
}

impl EventLogDecoder {
	pub fn new(events: &[ContractEvent]) -> Self {
		let mut prepared = HashMap::new();

		for event in events {
			let inputs = event
				.inputs
				.iter()
				.map(|input| {
					parameter_sol_type(&input.solidity_type, input.parameters.as_deref())
						.map(|sol_type| (input.name.clone(), sol_type, input.indexed))
				})
				.collect::<Result<Vec<_>, _>>();

			match inputs {
				Ok(inputs) => {
					prepared.entry(event_topic(&event.signature)).or_insert(PreparedEvent {
						signature: event.signature.clone(),
						inputs,
					});
				}
				Err(e) => {
					tracing::debug!(signature = %event.signature, error = %e, "Skipping undecodable event");
				}
			}
		}

		Self { events: prepared }
	}

	/// Decodes every log this decoder knows, preserving log order.
	pub fn decode(&self, logs: &[RawLog]) -> Vec<EventInfo> {
		logs.iter().filter_map(|log| self.decode_log(log)).collect()
	}

	fn decode_log(&self, log: &RawLog) -> Option<EventInfo> {
		let topic = log.topics.first()?;
		let event = self.events.get(topic)?;

		match decode_arguments(event, log) {
			Ok(arguments) => Some(EventInfo {
				signature: event.signature.clone(),
				arguments,
			}),
			Err(reason) => {
				tracing::debug!(
					signature = %event.signature,
					address = %log.address,
					reason = %reason,
					"Dropping log that does not match its event"
				);
				None
			}
		}
	}
}

fn decode_arguments(event: &PreparedEvent, log: &RawLog) -> Result<Vec<EventArgument>, String> {
	let indexed_count = event.inputs.iter().filter(|(_, _, indexed)| *indexed).count();
	if log.topics.len() != indexed_count + 1 {
		return Err(format!(
			"expected {} topics, got {}",
			indexed_count + 1,
			log.topics.len()
		));
	}

	let data_types: Vec<DynSolType> = event
		.inputs
		.iter()
		.filter(|(_, _, indexed)| !*indexed)
		.map(|(_, sol_type, _)| sol_type.clone())
		.collect();

	let mut data_values = match DynSolType::Tuple(data_types).abi_decode_params(&log.data) {
		Ok(DynSolValue::Tuple(values)) => values.into_iter(),
		Ok(other) => return Err(format!("unexpected data: {:?}", other)),
		Err(e) => return Err(e.to_string()),
	};
	let mut topics = log.topics.iter().skip(1);

	let mut arguments = Vec::with_capacity(event.inputs.len());
	for (name, sol_type, indexed) in &event.inputs {
		if *indexed {
			let topic = topics.next().ok_or("missing topic")?;
			if is_reference_type(sol_type) {
				arguments.push(EventArgument::hash(name, *topic));
			} else {
				let value = sol_type
					.abi_decode(topic.as_slice())
					.map_err(|e| e.to_string())?;
				arguments.push(EventArgument::value(name, value_to_json(&value)));
			}
		} else {
			let value = data_values.next().ok_or("missing data value")?;
			arguments.push(EventArgument::value(name, value_to_json(&value)));
		}
	}

	Ok(arguments)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::predefined::transfer_event;
	use alloy::primitives::keccak256;
	use chainreq_types::{Address, Bytes, ContractParameter, EventArgumentType, EventParameter, U256};
	use serde_json::json;

	fn word(address: Address) -> B256 {
		address.into_word()
	}

	fn parameter(solidity_type: &str) -> ContractParameter {
		ContractParameter {
			name: String::new(),
			description: String::new(),
			solidity_name: String::new(),
			solidity_type: solidity_type.to_string(),
			recommended_types: vec![],
			parameters: None,
			hints: None,
		}
	}

	fn tuple_event() -> ContractEvent {
		let tuple_parameter = |name: &str, indexed: bool| EventParameter {
			name: name.to_string(),
			description: String::new(),
			indexed,
			solidity_name: name.to_string(),
			solidity_type: "tuple".to_string(),
			recommended_types: vec![],
			parameters: Some(vec![parameter("address")]),
			hints: None,
		};

		ContractEvent {
			name: "Example".to_string(),
			description: String::new(),
			solidity_name: "ExampleEvent".to_string(),
			signature: "ExampleEvent(tuple(address),tuple(address))".to_string(),
			inputs: vec![
				tuple_parameter("nonIndexedStruct", false),
				tuple_parameter("indexedStruct", true),
			],
		}
	}

	#[test]
	fn test_decode_transfer() {
		let from = Address::repeat_byte(0x01);
		let to = Address::repeat_byte(0x02);
		let log = RawLog {
			address: Address::repeat_byte(0x99),
			topics: vec![
				event_topic("Transfer(address,address,uint256)"),
				word(from),
				word(to),
			],
			data: Bytes::from(U256::from(500).to_be_bytes::<32>().to_vec()),
		};

		let decoded = EventLogDecoder::new(&[transfer_event()]).decode(&[log]);
		assert_eq!(decoded.len(), 1);
		assert_eq!(decoded[0].signature, "Transfer(address,address,uint256)");

		let arguments = &decoded[0].arguments;
		assert_eq!(arguments[0].name, "from");
		assert_eq!(arguments[0].value, Some(json!("0x0101010101010101010101010101010101010101")));
		assert_eq!(arguments[1].value, Some(json!("0x0202020202020202020202020202020202020202")));
		assert_eq!(arguments[2].value, Some(json!("500")));
		assert!(arguments.iter().all(|a| a.argument_type == EventArgumentType::Value));
	}

	#[test]
	fn test_indexed_tuple_is_reported_as_hash() {
		let owner = Address::repeat_byte(0x0a);
		let indexed_hash = keccak256(word(owner));
		let log = RawLog {
			address: Address::repeat_byte(0x99),
			topics: vec![event_topic("ExampleEvent((address),(address))"), indexed_hash],
			data: Bytes::from(word(owner).to_vec()),
		};

		let decoded = EventLogDecoder::new(&[tuple_event()]).decode(&[log]);
		assert_eq!(decoded.len(), 1);

		let arguments = &decoded[0].arguments;
		assert_eq!(arguments[0].name, "nonIndexedStruct");
		assert_eq!(arguments[0].argument_type, EventArgumentType::Value);
		assert_eq!(
			arguments[0].value,
			Some(json!(["0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a"]))
		);
		assert_eq!(arguments[1].name, "indexedStruct");
		assert_eq!(arguments[1].argument_type, EventArgumentType::Hash);
		assert_eq!(arguments[1].hash, Some(indexed_hash));
		assert_eq!(arguments[1].value, None);
	}

	#[test]
	fn test_unknown_and_malformed_logs_are_skipped() {
		let decoder = EventLogDecoder::new(&[transfer_event()]);
		let unknown = RawLog {
			address: Address::ZERO,
			topics: vec![B256::repeat_byte(0x42)],
			data: Bytes::new(),
		};
		let anonymous = RawLog {
			address: Address::ZERO,
			topics: vec![],
			data: Bytes::new(),
		};
		let truncated = RawLog {
			address: Address::ZERO,
			topics: vec![event_topic("Transfer(address,address,uint256)")],
			data: Bytes::new(),
		};

		assert!(decoder.decode(&[unknown, anonymous, truncated]).is_empty());
	}
}
