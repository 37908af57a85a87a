//! Transaction-level payload variants.
//!
//! The transaction type tag selects the payload variant, so decoding always
//! knows the variant in advance. Unknown tags are decode failures.

use crate::chain::asset::Asset;
use crate::chain::hashes::{UInt168, UInt256};
use crate::codec::{ByteReader, ByteWriter, CodecError};
use serde_json::{Value, json};
use tracing::error;

/// Transaction type tag. Doubles as the payload discriminant on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxType {
	CoinBase = 0x00,
	RegisterAsset = 0x01,
	TransferAsset = 0x02,
	WithdrawAsset = 0x07,
	TransferCrossChainAsset = 0x08,
}

impl TxType {
	pub fn from_u8(tag: u8) -> Option<Self> {
		match tag {
			0x00 => Some(TxType::CoinBase),
			0x01 => Some(TxType::RegisterAsset),
			0x02 => Some(TxType::TransferAsset),
			0x07 => Some(TxType::WithdrawAsset),
			0x08 => Some(TxType::TransferCrossChainAsset),
			_ => None,
		}
	}
}

/// Closed set of transaction payloads, one variant per [`TxType`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionPayload {
	/// Block-reward transaction; carries only the miner's nonce bytes.
	CoinBase { nonce: Vec<u8> },
	RegisterAsset {
		asset: Asset,
		amount: u64,
		controller: UInt168,
	},
	/// Plain transfer; no payload fields.
	TransferAsset,
	/// Withdrawal from a side chain back to the genesis chain.
	WithdrawAsset {
		block_height: u32,
		genesis_block_address: String,
		side_chain_tx_hashes: Vec<UInt256>,
	},
	/// Deposit towards a side chain; parallel per-output records.
	TransferCrossChainAsset {
		cross_chain_addresses: Vec<String>,
		output_indexes: Vec<u64>,
		cross_chain_amounts: Vec<u64>,
	},
}

impl TransactionPayload {
	/// Default payload for a transaction type.
	pub fn for_type(tx_type: TxType) -> Self {
		match tx_type {
			TxType::CoinBase => TransactionPayload::CoinBase { nonce: Vec::new() },
			TxType::RegisterAsset => TransactionPayload::RegisterAsset {
				asset: Asset::default(),
				amount: 0,
				controller: UInt168::ZERO,
			},
			TxType::TransferAsset => TransactionPayload::TransferAsset,
			TxType::WithdrawAsset => TransactionPayload::WithdrawAsset {
				block_height: 0,
				genesis_block_address: String::new(),
				side_chain_tx_hashes: Vec::new(),
			},
			TxType::TransferCrossChainAsset => TransactionPayload::TransferCrossChainAsset {
				cross_chain_addresses: Vec::new(),
				output_indexes: Vec::new(),
				cross_chain_amounts: Vec::new(),
			},
		}
	}

	pub fn tx_type(&self) -> TxType {
		match self {
			TransactionPayload::CoinBase { .. } => TxType::CoinBase,
			TransactionPayload::RegisterAsset { .. } => TxType::RegisterAsset,
			TransactionPayload::TransferAsset => TxType::TransferAsset,
			TransactionPayload::WithdrawAsset { .. } => TxType::WithdrawAsset,
			TransactionPayload::TransferCrossChainAsset { .. } => TxType::TransferCrossChainAsset,
		}
	}

	pub fn serialize(&self, w: &mut ByteWriter) {
		match self {
			TransactionPayload::CoinBase { nonce } => {
				w.write_var_bytes(nonce);
			}
			TransactionPayload::RegisterAsset {
				asset,
				amount,
				controller,
			} => {
				asset.serialize(w);
				w.write_u64(*amount);
				w.write_bytes(controller.as_bytes());
			}
			TransactionPayload::TransferAsset => {}
			TransactionPayload::WithdrawAsset {
				block_height,
				genesis_block_address,
				side_chain_tx_hashes,
			} => {
				w.write_u32(*block_height);
				w.write_var_string(genesis_block_address);
				w.write_var_uint(side_chain_tx_hashes.len() as u64);
				for hash in side_chain_tx_hashes {
					w.write_bytes(hash.as_bytes());
				}
			}
			TransactionPayload::TransferCrossChainAsset {
				cross_chain_addresses,
				output_indexes,
				cross_chain_amounts,
			} => {
				// The lists are parallel but independently mutable; emit only
				// complete records so the count prefix stays consistent.
				let records = cross_chain_addresses
					.iter()
					.zip(output_indexes)
					.zip(cross_chain_amounts);
				w.write_var_uint(records.clone().count() as u64);
				for ((address, index), amount) in records {
					w.write_var_string(address);
					w.write_var_uint(*index);
					w.write_u64(*amount);
				}
			}
		}
	}

	pub fn deserialize(r: &mut ByteReader<'_>, tx_type: TxType) -> Result<Self, CodecError> {
		match tx_type {
			TxType::CoinBase => Ok(TransactionPayload::CoinBase {
				nonce: r.read_var_bytes("coinbase nonce")?,
			}),
			TxType::RegisterAsset => {
				let asset = Asset::deserialize(r)?;
				let amount = r.read_u64("register asset amount")?;
				let controller = UInt168::new(r.read_array("register asset controller")?);
				Ok(TransactionPayload::RegisterAsset {
					asset,
					amount,
					controller,
				})
			}
			TxType::TransferAsset => Ok(TransactionPayload::TransferAsset),
			TxType::WithdrawAsset => {
				let block_height = r.read_u32("withdraw asset block height")?;
				let genesis_block_address = r.read_var_string("withdraw asset genesis address")?;
				let count = r.read_var_uint("withdraw asset hash count")?;
				let mut side_chain_tx_hashes = Vec::with_capacity(count.min(1024) as usize);
				for _ in 0..count {
					side_chain_tx_hashes.push(UInt256::new(r.read_array("withdraw asset side chain hash")?));
				}
				Ok(TransactionPayload::WithdrawAsset {
					block_height,
					genesis_block_address,
					side_chain_tx_hashes,
				})
			}
			TxType::TransferCrossChainAsset => {
				let count = r.read_var_uint("cross chain record count")?;
				let mut cross_chain_addresses = Vec::with_capacity(count.min(1024) as usize);
				let mut output_indexes = Vec::with_capacity(count.min(1024) as usize);
				let mut cross_chain_amounts = Vec::with_capacity(count.min(1024) as usize);
				for _ in 0..count {
					cross_chain_addresses.push(r.read_var_string("cross chain address")?);
					output_indexes.push(r.read_var_uint("cross chain output index")?);
					cross_chain_amounts.push(r.read_u64("cross chain amount")?);
				}
				Ok(TransactionPayload::TransferCrossChainAsset {
					cross_chain_addresses,
					output_indexes,
					cross_chain_amounts,
				})
			}
		}
	}

	pub fn to_json(&self) -> Value {
		match self {
			TransactionPayload::CoinBase { nonce } => {
				json!({ "CoinBaseData": hex::encode(nonce) })
			}
			TransactionPayload::RegisterAsset {
				asset,
				amount,
				controller,
			} => json!({
				"Asset": asset.to_json(),
				"Amount": amount,
				"Controller": controller.to_hex(),
			}),
			TransactionPayload::TransferAsset => json!({}),
			TransactionPayload::WithdrawAsset {
				block_height,
				genesis_block_address,
				side_chain_tx_hashes,
			} => json!({
				"BlockHeight": block_height,
				"GenesisBlockAddress": genesis_block_address,
				"SideChainTransactionHash": side_chain_tx_hashes
					.iter()
					.map(UInt256::to_hex)
					.collect::<Vec<_>>(),
			}),
			TransactionPayload::TransferCrossChainAsset {
				cross_chain_addresses,
				output_indexes,
				cross_chain_amounts,
			} => json!({
				"CrossChainAddress": cross_chain_addresses,
				"OutputIndex": output_indexes,
				"CrossChainAmount": cross_chain_amounts,
			}),
		}
	}

	pub fn from_json(j: &Value, tx_type: TxType) -> Result<Self, CodecError> {
		match tx_type {
			TxType::CoinBase => {
				let s = j
					.get("CoinBaseData")
					.and_then(Value::as_str)
					.ok_or(CodecError::ShortRead("coinbase nonce"))?;
				Ok(TransactionPayload::CoinBase {
					nonce: hex::decode(s).map_err(|_| CodecError::BadString("coinbase nonce"))?,
				})
			}
			TxType::RegisterAsset => {
				let asset = Asset::from_json(
					j.get("Asset").ok_or(CodecError::ShortRead("register asset"))?,
				)?;
				let amount = j
					.get("Amount")
					.and_then(Value::as_u64)
					.ok_or(CodecError::ShortRead("register asset amount"))?;
				let controller = j
					.get("Controller")
					.and_then(Value::as_str)
					.ok_or(CodecError::ShortRead("register asset controller"))?;
				Ok(TransactionPayload::RegisterAsset {
					asset,
					amount,
					controller: UInt168::from_hex(controller)
						.map_err(|_| CodecError::BadString("register asset controller"))?,
				})
			}
			TxType::TransferAsset => Ok(TransactionPayload::TransferAsset),
			TxType::WithdrawAsset => {
				let block_height = j
					.get("BlockHeight")
					.and_then(Value::as_u64)
					.ok_or(CodecError::ShortRead("withdraw asset block height"))? as u32;
				let genesis_block_address = j
					.get("GenesisBlockAddress")
					.and_then(Value::as_str)
					.ok_or(CodecError::ShortRead("withdraw asset genesis address"))?
					.to_string();
				let mut side_chain_tx_hashes = Vec::new();
				for h in j
					.get("SideChainTransactionHash")
					.and_then(Value::as_array)
					.ok_or(CodecError::ShortRead("withdraw asset side chain hashes"))?
				{
					let s = h
						.as_str()
						.ok_or(CodecError::ShortRead("withdraw asset side chain hash"))?;
					side_chain_tx_hashes.push(
						UInt256::from_hex(s)
							.map_err(|_| CodecError::BadString("withdraw asset side chain hash"))?,
					);
				}
				Ok(TransactionPayload::WithdrawAsset {
					block_height,
					genesis_block_address,
					side_chain_tx_hashes,
				})
			}
			TxType::TransferCrossChainAsset => {
				let addresses = j
					.get("CrossChainAddress")
					.and_then(Value::as_array)
					.ok_or(CodecError::ShortRead("cross chain addresses"))?;
				let indexes = j
					.get("OutputIndex")
					.and_then(Value::as_array)
					.ok_or(CodecError::ShortRead("cross chain output indexes"))?;
				let amounts = j
					.get("CrossChainAmount")
					.and_then(Value::as_array)
					.ok_or(CodecError::ShortRead("cross chain amounts"))?;
				if addresses.len() != indexes.len() || addresses.len() != amounts.len() {
					error!("cross chain payload field lists have mismatched lengths");
					return Err(CodecError::BadLength {
						field: "cross chain records",
						len: addresses.len() as u64,
					});
				}
				let mut cross_chain_addresses = Vec::with_capacity(addresses.len());
				let mut output_indexes = Vec::with_capacity(indexes.len());
				let mut cross_chain_amounts = Vec::with_capacity(amounts.len());
				for i in 0..addresses.len() {
					cross_chain_addresses.push(
						addresses[i]
							.as_str()
							.ok_or(CodecError::ShortRead("cross chain address"))?
							.to_string(),
					);
					output_indexes.push(
						indexes[i]
							.as_u64()
							.ok_or(CodecError::ShortRead("cross chain output index"))?,
					);
					cross_chain_amounts.push(
						amounts[i]
							.as_u64()
							.ok_or(CodecError::ShortRead("cross chain amount"))?,
					);
				}
				Ok(TransactionPayload::TransferCrossChainAsset {
					cross_chain_addresses,
					output_indexes,
					cross_chain_amounts,
				})
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn withdraw() -> TransactionPayload {
		TransactionPayload::WithdrawAsset {
			block_height: 2000,
			genesis_block_address: "XKUh4GLhFJiqAMTF6HyWQrV9pK9HcGUdfJ".to_string(),
			side_chain_tx_hashes: vec![UInt256::new([0x11; 32]), UInt256::new([0x22; 32])],
		}
	}

	fn cross_chain() -> TransactionPayload {
		TransactionPayload::TransferCrossChainAsset {
			cross_chain_addresses: vec!["EJonBz8U1gYnANjSafRF9EAJW9KTwRKTDh".to_string()],
			output_indexes: vec![1],
			cross_chain_amounts: vec![10_000],
		}
	}

	#[test]
	fn withdraw_binary_round_trip() {
		let payload = withdraw();
		let mut w = ByteWriter::new();
		payload.serialize(&mut w);
		let mut r = ByteReader::new(w.bytes());
		let decoded = TransactionPayload::deserialize(&mut r, TxType::WithdrawAsset).unwrap();
		assert_eq!(decoded, payload);
		assert_eq!(r.remaining(), 0);
	}

	#[test]
	fn withdraw_json_round_trip() {
		let payload = withdraw();
		let decoded = TransactionPayload::from_json(&payload.to_json(), TxType::WithdrawAsset).unwrap();
		assert_eq!(decoded, payload);
	}

	#[test]
	fn cross_chain_round_trips() {
		let payload = cross_chain();
		let mut w = ByteWriter::new();
		payload.serialize(&mut w);
		let mut r = ByteReader::new(w.bytes());
		assert_eq!(
			TransactionPayload::deserialize(&mut r, TxType::TransferCrossChainAsset).unwrap(),
			payload
		);
		assert_eq!(
			TransactionPayload::from_json(&payload.to_json(), TxType::TransferCrossChainAsset).unwrap(),
			payload
		);
	}

	#[test]
	fn truncated_withdraw_fails_on_the_right_field() {
		let payload = withdraw();
		let mut w = ByteWriter::new();
		payload.serialize(&mut w);
		// Cut into the middle of the second side-chain hash.
		let cut = w.bytes().len() - 8;
		let mut r = ByteReader::new(&w.bytes()[..cut]);
		let err = TransactionPayload::deserialize(&mut r, TxType::WithdrawAsset).unwrap_err();
		assert_eq!(err, CodecError::ShortRead("withdraw asset side chain hash"));
	}

	#[test]
	fn unknown_tx_type_is_rejected() {
		assert_eq!(TxType::from_u8(0x5a), None);
	}

	#[test]
	fn for_type_always_yields_matching_payload() {
		for tx_type in [
			TxType::CoinBase,
			TxType::RegisterAsset,
			TxType::TransferAsset,
			TxType::WithdrawAsset,
			TxType::TransferCrossChainAsset,
		] {
			assert_eq!(TransactionPayload::for_type(tx_type).tx_type(), tx_type);
		}
	}

	#[test]
	fn mismatched_cross_chain_lists_serialize_only_complete_records() {
		let payload = TransactionPayload::TransferCrossChainAsset {
			cross_chain_addresses: vec![
				"EJonBz8U1gYnANjSafRF9EAJW9KTwRKTDh".to_string(),
				"EKsSQae7goXYQobuWsWwLvf5kBbSjSeGoL".to_string(),
			],
			output_indexes: vec![1],
			cross_chain_amounts: vec![10_000, 20_000],
		};
		let mut w = ByteWriter::new();
		payload.serialize(&mut w);
		let mut r = ByteReader::new(w.bytes());
		let decoded = TransactionPayload::deserialize(&mut r, TxType::TransferCrossChainAsset).unwrap();
		assert_eq!(r.remaining(), 0);
		assert_eq!(
			decoded,
			TransactionPayload::TransferCrossChainAsset {
				cross_chain_addresses: vec!["EJonBz8U1gYnANjSafRF9EAJW9KTwRKTDh".to_string()],
				output_indexes: vec![1],
				cross_chain_amounts: vec![10_000],
			}
		);
	}

	#[test]
	fn mismatched_json_lists_are_rejected() {
		let j = json!({
			"CrossChainAddress": ["a", "b"],
			"OutputIndex": [1],
			"CrossChainAmount": [5, 6],
		});
		assert!(TransactionPayload::from_json(&j, TxType::TransferCrossChainAsset).is_err());
	}
}
