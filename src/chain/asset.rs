//! Asset definitions registered on chain.

use crate::chain::hashes::UInt256;
use crate::codec::{ByteReader, ByteWriter, CodecError};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

/// An asset definition. The hash is content-addressed over the serialized
/// bytes; the load path overwrites it with the stored id instead of
/// recomputing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Asset {
	pub name: String,
	pub description: String,
	pub precision: u8,
	pub asset_type: u8,
	pub record_type: u8,
	hash: Option<UInt256>,
}

impl Asset {
	pub fn new(name: String, description: String, precision: u8, asset_type: u8, record_type: u8) -> Self {
		Self {
			name,
			description,
			precision,
			asset_type,
			record_type,
			hash: None,
		}
	}

	/// Content-addressed id: double SHA-256 over the serialized bytes,
	/// computed once and cached.
	pub fn hash(&mut self) -> UInt256 {
		if let Some(hash) = self.hash {
			return hash;
		}
		let mut w = ByteWriter::new();
		self.serialize(&mut w);
		let first = Sha256::digest(w.bytes());
		let second = Sha256::digest(first);
		let hash = UInt256::new(second.into());
		self.hash = Some(hash);
		hash
	}

	pub fn set_hash(&mut self, hash: UInt256) {
		self.hash = Some(hash);
	}

	pub fn serialize(&self, w: &mut ByteWriter) {
		w.write_var_string(&self.name);
		w.write_var_string(&self.description);
		w.write_u8(self.precision);
		w.write_u8(self.asset_type);
		w.write_u8(self.record_type);
	}

	pub fn deserialize(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
		Ok(Self {
			name: r.read_var_string("asset name")?,
			description: r.read_var_string("asset description")?,
			precision: r.read_u8("asset precision")?,
			asset_type: r.read_u8("asset type")?,
			record_type: r.read_u8("asset record type")?,
			hash: None,
		})
	}

	pub fn to_json(&self) -> Value {
		json!({
			"Name": self.name,
			"Description": self.description,
			"Precision": self.precision,
			"AssetType": self.asset_type,
			"RecordType": self.record_type,
		})
	}

	pub fn from_json(j: &Value) -> Result<Self, CodecError> {
		Ok(Self {
			name: j
				.get("Name")
				.and_then(Value::as_str)
				.ok_or(CodecError::ShortRead("asset name"))?
				.to_string(),
			description: j
				.get("Description")
				.and_then(Value::as_str)
				.ok_or(CodecError::ShortRead("asset description"))?
				.to_string(),
			precision: j
				.get("Precision")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("asset precision"))? as u8,
			asset_type: j
				.get("AssetType")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("asset type"))? as u8,
			record_type: j
				.get("RecordType")
				.and_then(Value::as_u64)
				.ok_or(CodecError::ShortRead("asset record type"))? as u8,
			hash: None,
		})
	}
}
