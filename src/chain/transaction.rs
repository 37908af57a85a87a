//! Transactions and their wire/JSON codecs.

use crate::chain::hashes::UInt256;
use crate::chain::output::TransactionOutput;
use crate::chain::tx_payload::{TransactionPayload, TxType};
use crate::codec::{ByteReader, ByteWriter, CodecError};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::error;

/// Transaction format version. The raw byte is preserved so re-serializing a
/// decoded transaction reproduces the input exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxVersion(pub u8);

impl TxVersion {
	pub const DEFAULT: Self = Self(0x00);
	pub const V09: Self = Self(0x09);

	/// Whether outputs carry a type tag and payload at this version.
	pub fn supports_output_type(self) -> bool {
		self.0 >= Self::V09.0
	}
}

/// Reference to a previous transaction output being spent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxInput {
	pub prev_hash: UInt256,
	pub index: u16,
	pub sequence: u32,
}

impl TxInput {
	pub fn serialize(&self, w: &mut ByteWriter) {
		w.write_bytes(self.prev_hash.as_bytes());
		w.write_u16(self.index);
		w.write_u32(self.sequence);
	}

	pub fn deserialize(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
		Ok(Self {
			prev_hash: UInt256::new(r.read_array("input tx hash")?),
			index: r.read_u16("input index")?,
			sequence: r.read_u32("input sequence")?,
		})
	}

	pub fn to_json(&self) -> Value {
		json!({
			"TxHash": self.prev_hash.to_hex(),
			"Index": self.index,
			"Sequence": self.sequence,
		})
	}

	pub fn from_json(j: &Value) -> Result<Self, CodecError> {
		Ok(Self {
			prev_hash: j
				.get("TxHash")
				.and_then(Value::as_str)
				.ok_or(CodecError::ShortRead("input tx hash"))
				.and_then(|s| {
					UInt256::from_hex(s).map_err(|_| CodecError::BadString("input tx hash"))
				})?,
			index: j
				.get("Index")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("input index"))? as u16,
			sequence: j
				.get("Sequence")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("input sequence"))? as u32,
		})
	}
}

/// A wallet-visible transaction.
///
/// Block height and timestamp are bookkeeping the network assigns after the
/// fact; they are not part of the wire bytes and do not affect the hash.
/// Height 0 means unconfirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
	pub version: TxVersion,
	pub payload_version: u8,
	pub payload: TransactionPayload,
	pub inputs: Vec<TxInput>,
	pub outputs: Vec<TransactionOutput>,
	pub lock_time: u32,
	pub block_height: u32,
	pub timestamp: u64,
}

impl Default for Transaction {
	fn default() -> Self {
		Self {
			version: TxVersion::DEFAULT,
			payload_version: 0,
			payload: TransactionPayload::for_type(TxType::TransferAsset),
			inputs: Vec::new(),
			outputs: Vec::new(),
			lock_time: 0,
			block_height: 0,
			timestamp: 0,
		}
	}
}

impl Transaction {
	pub fn new(version: TxVersion, payload: TransactionPayload) -> Self {
		Self {
			version,
			payload,
			..Self::default()
		}
	}

	pub fn tx_type(&self) -> TxType {
		self.payload.tx_type()
	}

	pub fn is_coinbase(&self) -> bool {
		self.tx_type() == TxType::CoinBase
	}

	/// Content-addressed hash: double SHA-256 over the serialized bytes.
	pub fn hash(&self) -> UInt256 {
		let mut w = ByteWriter::new();
		self.serialize(&mut w);
		let first = Sha256::digest(w.bytes());
		let second = Sha256::digest(first);
		UInt256::new(second.into())
	}

	pub fn serialize(&self, w: &mut ByteWriter) {
		w.write_u8(self.version.0);
		w.write_u8(self.tx_type() as u8);
		w.write_u8(self.payload_version);
		self.payload.serialize(w);

		w.write_var_uint(self.inputs.len() as u64);
		for input in &self.inputs {
			input.serialize(w);
		}

		w.write_var_uint(self.outputs.len() as u64);
		for output in &self.outputs {
			output.serialize(w, self.version);
		}

		w.write_u32(self.lock_time);
	}

	pub fn deserialize(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
		let version = TxVersion(r.read_u8("tx version")?);

		let tag = r.read_u8("tx type")?;
		let tx_type = TxType::from_u8(tag).ok_or_else(|| {
			error!("deserialize tx type error: unknown tag {}", tag);
			CodecError::UnknownTag {
				field: "tx type",
				tag,
			}
		})?;

		let payload_version = r.read_u8("tx payload version")?;
		let payload = TransactionPayload::deserialize(r, tx_type)?;

		let input_count = r.read_var_uint("tx input count")?;
		let mut inputs = Vec::with_capacity(input_count.min(1024) as usize);
		for _ in 0..input_count {
			inputs.push(TxInput::deserialize(r)?);
		}

		let output_count = r.read_var_uint("tx output count")?;
		let mut outputs = Vec::with_capacity(output_count.min(1024) as usize);
		for _ in 0..output_count {
			outputs.push(TransactionOutput::deserialize(r, version)?);
		}

		let lock_time = r.read_u32("tx lock time")?;

		Ok(Self {
			version,
			payload_version,
			payload,
			inputs,
			outputs,
			lock_time,
			block_height: 0,
			timestamp: 0,
		})
	}

	pub fn to_json(&self) -> Value {
		json!({
			"Version": self.version.0,
			"TxType": self.tx_type() as u8,
			"PayloadVersion": self.payload_version,
			"Payload": self.payload.to_json(),
			"Inputs": self.inputs.iter().map(TxInput::to_json).collect::<Vec<_>>(),
			"Outputs": self
				.outputs
				.iter()
				.map(|o| o.to_json(self.version))
				.collect::<Vec<_>>(),
			"LockTime": self.lock_time,
			"BlockHeight": self.block_height,
			"Timestamp": self.timestamp,
		})
	}

	pub fn from_json(j: &Value) -> Result<Self, CodecError> {
		let version = TxVersion(
			j.get("Version")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("tx version"))? as u8,
		);

		let tag = j
			.get("TxType")
			.and_then(Value::as_u64)
			.ok_or(CodecError::ShortRead("tx type"))? as u8;
		let tx_type = TxType::from_u8(tag).ok_or(CodecError::UnknownTag {
			field: "tx type",
			tag,
		})?;

		let payload_version = j
			.get("PayloadVersion")
			.and_then(Value::as_u64)
			.ok_or(CodecError::ShortRead("tx payload version"))? as u8;
		let payload = TransactionPayload::from_json(
			j.get("Payload").ok_or(CodecError::ShortRead("tx payload"))?,
			tx_type,
		)?;

		let mut inputs = Vec::new();
		for input in j
			.get("Inputs")
			.and_then(Value::as_array)
			.ok_or(CodecError::ShortRead("tx inputs"))?
		{
			inputs.push(TxInput::from_json(input)?);
		}

		let mut outputs = Vec::new();
		for output in j
			.get("Outputs")
			.and_then(Value::as_array)
			.ok_or(CodecError::ShortRead("tx outputs"))?
		{
			outputs.push(TransactionOutput::from_json(output, version)?);
		}

		Ok(Self {
			version,
			payload_version,
			payload,
			inputs,
			outputs,
			lock_time: j
				.get("LockTime")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("tx lock time"))? as u32,
			block_height: j.get("BlockHeight").and_then(Value::as_u64).unwrap_or(0) as u32,
			timestamp: j.get("Timestamp").and_then(Value::as_u64).unwrap_or(0),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain::hashes::UInt168;
	use crate::chain::output_payload::{OutputPayload, OutputType, VoteContent};

	fn sample_tx(version: TxVersion) -> Transaction {
		let mut tx = Transaction::new(version, TransactionPayload::TransferAsset);
		tx.inputs.push(TxInput {
			prev_hash: UInt256::new([0x55; 32]),
			index: 2,
			sequence: 0,
		});
		tx.outputs.push(TransactionOutput::new(
			1_000,
			UInt168::new([0x21; 21]),
			UInt256::new([0xaa; 32]),
			OutputType::Default,
		));
		tx.outputs.push(TransactionOutput::with_payload(
			2_000,
			UInt168::new([0x22; 21]),
			UInt256::new([0xaa; 32]),
			if version.supports_output_type() {
				OutputPayload::Vote {
					version: 0,
					contents: vec![VoteContent {
						vote_type: 0,
						candidates: vec![vec![0x02; 33]],
					}],
				}
			} else {
				OutputPayload::Default
			},
		));
		tx.lock_time = 99;
		tx
	}

	#[test]
	fn binary_round_trip_both_versions() {
		for version in [TxVersion::DEFAULT, TxVersion::V09] {
			let tx = sample_tx(version);
			let mut w = ByteWriter::new();
			tx.serialize(&mut w);
			let mut r = ByteReader::new(w.bytes());
			let decoded = Transaction::deserialize(&mut r).unwrap();
			assert_eq!(decoded, tx);
			assert_eq!(r.remaining(), 0);
		}
	}

	#[test]
	fn json_round_trip_both_versions() {
		for version in [TxVersion::DEFAULT, TxVersion::V09] {
			let tx = sample_tx(version);
			let decoded = Transaction::from_json(&tx.to_json()).unwrap();
			assert_eq!(decoded.hash(), tx.hash());
			assert_eq!(decoded, tx);
		}
	}

	#[test]
	fn hash_ignores_height_and_timestamp() {
		let tx = sample_tx(TxVersion::V09);
		let mut confirmed = tx.clone();
		confirmed.block_height = 1234;
		confirmed.timestamp = 1_700_000_000;
		assert_eq!(tx.hash(), confirmed.hash());
	}

	#[test]
	fn coinbase_detection() {
		let cb = Transaction::new(
			TxVersion::DEFAULT,
			TransactionPayload::CoinBase { nonce: vec![1, 2, 3] },
		);
		assert!(cb.is_coinbase());
		assert!(!sample_tx(TxVersion::DEFAULT).is_coinbase());
	}

	#[test]
	fn output_payload_failure_fails_the_whole_decode() {
		let tx = sample_tx(TxVersion::V09);
		let mut w = ByteWriter::new();
		tx.serialize(&mut w);
		// Drop the trailing lock time and part of the vote payload.
		let bytes = w.bytes();
		let mut r = ByteReader::new(&bytes[..bytes.len() - 10]);
		assert!(Transaction::deserialize(&mut r).is_err());
	}

	#[test]
	fn unknown_tx_type_fails_the_decode() {
		let tx = sample_tx(TxVersion::DEFAULT);
		let mut w = ByteWriter::new();
		tx.serialize(&mut w);
		let mut bytes = w.into_bytes();
		bytes[1] = 0x66;
		let mut r = ByteReader::new(&bytes);
		assert!(matches!(
			Transaction::deserialize(&mut r).unwrap_err(),
			CodecError::UnknownTag { field: "tx type", .. }
		));
	}
}
