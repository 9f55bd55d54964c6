//! Serde helpers for configuration deserialization

use chainreq_types::ChainId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Deserializes a map keyed by chain id. Config formats only allow string
/// keys, so `[chains.31337]` arrives as `"31337"`.
pub fn deserialize_chain_id_map<'de, D, T>(
	deserializer: D,
) -> Result<HashMap<ChainId, T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	let map = HashMap::<String, T>::deserialize(deserializer)?;

	map.into_iter()
		.map(|(k, v)| {
			k.parse::<u64>()
				.map(|id| (id, v))
				.map_err(|_| serde::de::Error::custom(format!("Invalid chain ID: {}", k)))
		})
		.collect()
}

/// Serializes a chain id keyed map with string keys.
pub fn serialize_chain_id_map<S, T>(
	map: &HashMap<ChainId, T>,
	serializer: S,
) -> Result<S::Ok, S::Error>
where
	S: Serializer,
	T: Serialize,
{
	let string_map: HashMap<String, &T> = map.iter().map(|(k, v)| (k.to_string(), v)).collect();
	string_map.serialize(serializer)
}
