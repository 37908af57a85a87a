//! Transaction outputs.
//!
//! The output-type tag and its payload are only on the wire from format
//! version V09 onward; older streams carry just the core fields and decode to
//! the `Default` type. The tag and payload are kept consistent by
//! construction: retyping an output regenerates the matching default payload.

use crate::chain::hashes::{UInt168, UInt256};
use crate::chain::output_payload::{OutputPayload, OutputType, PayloadMismatch};
use crate::chain::transaction::TxVersion;
use crate::codec::{ByteReader, ByteWriter, CodecError};
use serde_json::{Value, json};
use tracing::error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
	pub asset_id: UInt256,
	pub amount: u64,
	pub output_lock: u32,
	pub program_hash: UInt168,
	output_type: OutputType,
	payload: OutputPayload,
}

impl Default for TransactionOutput {
	fn default() -> Self {
		Self {
			asset_id: UInt256::ZERO,
			amount: 0,
			output_lock: 0,
			program_hash: UInt168::ZERO,
			output_type: OutputType::Default,
			payload: OutputPayload::for_type(OutputType::Default),
		}
	}
}

impl TransactionOutput {
	pub fn new(amount: u64, program_hash: UInt168, asset_id: UInt256, output_type: OutputType) -> Self {
		Self {
			asset_id,
			amount,
			output_lock: 0,
			program_hash,
			output_type,
			payload: OutputPayload::for_type(output_type),
		}
	}

	/// Build an output whose type tag is derived from the payload itself.
	pub fn with_payload(
		amount: u64,
		program_hash: UInt168,
		asset_id: UInt256,
		payload: OutputPayload,
	) -> Self {
		Self {
			asset_id,
			amount,
			output_lock: 0,
			program_hash,
			output_type: payload.output_type(),
			payload,
		}
	}

	pub fn output_type(&self) -> OutputType {
		self.output_type
	}

	pub fn payload(&self) -> &OutputPayload {
		&self.payload
	}

	/// Retype the output, regenerating the matching default payload.
	pub fn set_type(&mut self, output_type: OutputType) {
		self.output_type = output_type;
		self.payload = OutputPayload::for_type(output_type);
	}

	/// Checked payload assignment; a variant mismatch leaves the output
	/// unchanged.
	pub fn assign_payload(&mut self, payload: &OutputPayload) -> Result<(), PayloadMismatch> {
		self.payload.assign_from(payload)
	}

	pub fn serialize(&self, w: &mut ByteWriter, version: TxVersion) {
		w.write_bytes(self.asset_id.as_bytes());
		w.write_u64(self.amount);
		w.write_u32(self.output_lock);
		w.write_bytes(self.program_hash.as_bytes());

		if version.supports_output_type() {
			w.write_u8(self.output_type as u8);
			self.payload.serialize(w);
		}
	}

	pub fn deserialize(r: &mut ByteReader<'_>, version: TxVersion) -> Result<Self, CodecError> {
		let asset_id = UInt256::new(r.read_array("output asset id")?);
		let amount = r.read_u64("output amount")?;
		let output_lock = r.read_u32("output lock")?;
		let program_hash = UInt168::new(r.read_array("output program hash")?);

		let (output_type, payload) = if version.supports_output_type() {
			let tag = r.read_u8("output type")?;
			let output_type = OutputType::from_u8(tag).ok_or_else(|| {
				error!("deserialize output type error: unknown tag {}", tag);
				CodecError::UnknownTag {
					field: "output type",
					tag,
				}
			})?;
			let payload = OutputPayload::deserialize(r, output_type)?;
			(output_type, payload)
		} else {
			(OutputType::Default, OutputPayload::for_type(OutputType::Default))
		};

		Ok(Self {
			asset_id,
			amount,
			output_lock,
			program_hash,
			output_type,
			payload,
		})
	}

	pub fn to_json(&self, version: TxVersion) -> Value {
		let mut j = json!({
			"Amount": self.amount,
			"AssetId": self.asset_id.to_hex(),
			"OutputLock": self.output_lock,
			"ProgramHash": self.program_hash.to_hex(),
		});

		if version.supports_output_type() {
			j["OutputType"] = json!(self.output_type as u8);
			j["Payload"] = self.payload.to_json();
		}

		j
	}

	pub fn from_json(j: &Value, version: TxVersion) -> Result<Self, CodecError> {
		let amount = j
			.get("Amount")
			.and_then(Value::as_u64)
			.ok_or(CodecError::ShortRead("output amount"))?;
		let asset_id = j
			.get("AssetId")
			.and_then(Value::as_str)
			.ok_or(CodecError::ShortRead("output asset id"))
			.and_then(|s| {
				UInt256::from_hex(s).map_err(|_| CodecError::BadString("output asset id"))
			})?;
		let output_lock = j
			.get("OutputLock")
			.and_then(Value::as_u64)
			.ok_or(CodecError::ShortRead("output lock"))? as u32;
		let program_hash = j
			.get("ProgramHash")
			.and_then(Value::as_str)
			.ok_or(CodecError::ShortRead("output program hash"))
			.and_then(|s| {
				UInt168::from_hex(s).map_err(|_| CodecError::BadString("output program hash"))
			})?;

		let (output_type, payload) = if version.supports_output_type() {
			let tag = j
				.get("OutputType")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("output type"))? as u8;
			let output_type = OutputType::from_u8(tag).ok_or(CodecError::UnknownTag {
				field: "output type",
				tag,
			})?;
			let payload = OutputPayload::from_json(
				j.get("Payload").ok_or(CodecError::ShortRead("output payload"))?,
				output_type,
			)?;
			(output_type, payload)
		} else {
			(OutputType::Default, OutputPayload::for_type(OutputType::Default))
		};

		Ok(Self {
			asset_id,
			amount,
			output_lock,
			program_hash,
			output_type,
			payload,
		})
	}
}
