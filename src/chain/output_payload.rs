//! Output-level payload variants.
//!
//! A transaction output carries a type tag and a payload matching that tag.
//! The set of variants is closed: an unknown tag is a decode failure, never a
//! silently absent payload. Constructing an output from a tag always produces
//! the matching default payload so serialization never observes a missing one.

use crate::codec::{ByteReader, ByteWriter, CodecError};
use serde_json::{Value, json};
use tracing::error;

/// Type tag stored on the wire ahead of the payload bytes (format V09+).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputType {
	Default = 0x00,
	VoteOutput = 0x01,
}

impl OutputType {
	pub fn from_u8(tag: u8) -> Option<Self> {
		match tag {
			0x00 => Some(OutputType::Default),
			0x01 => Some(OutputType::VoteOutput),
			_ => None,
		}
	}
}

/// One ballot inside a vote payload: what is being voted on and for whom.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteContent {
	pub vote_type: u8,
	pub candidates: Vec<Vec<u8>>,
}

/// Attempted to copy payload fields between two different variants.
///
/// The assignment is a checked no-op: the target keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("payload type mismatch: expected {expected:?}, found {found:?}")]
pub struct PayloadMismatch {
	pub expected: OutputType,
	pub found: OutputType,
}

/// Closed set of output payloads, one variant per [`OutputType`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputPayload {
	Default,
	Vote {
		version: u8,
		contents: Vec<VoteContent>,
	},
}

impl OutputPayload {
	/// Default payload for a tag — the eager-allocation path used whenever an
	/// output is constructed or retyped.
	pub fn for_type(output_type: OutputType) -> Self {
		match output_type {
			OutputType::Default => OutputPayload::Default,
			OutputType::VoteOutput => OutputPayload::Vote {
				version: 0,
				contents: Vec::new(),
			},
		}
	}

	pub fn output_type(&self) -> OutputType {
		match self {
			OutputPayload::Default => OutputType::Default,
			OutputPayload::Vote { .. } => OutputType::VoteOutput,
		}
	}

	/// Copy the fields of `other` into `self` if the variants match; on a
	/// mismatch, log it and leave `self` untouched.
	pub fn assign_from(&mut self, other: &OutputPayload) -> Result<(), PayloadMismatch> {
		if self.output_type() != other.output_type() {
			let mismatch = PayloadMismatch {
				expected: self.output_type(),
				found: other.output_type(),
			};
			error!("{}", mismatch);
			return Err(mismatch);
		}
		*self = other.clone();
		Ok(())
	}

	pub fn serialize(&self, w: &mut ByteWriter) {
		match self {
			OutputPayload::Default => {}
			OutputPayload::Vote { version, contents } => {
				w.write_u8(*version);
				w.write_var_uint(contents.len() as u64);
				for content in contents {
					w.write_u8(content.vote_type);
					w.write_var_uint(content.candidates.len() as u64);
					for candidate in &content.candidates {
						w.write_var_bytes(candidate);
					}
				}
			}
		}
	}

	/// Decode the payload bytes for a known tag. The variant must be chosen
	/// before decoding; the bytes themselves do not identify it.
	pub fn deserialize(r: &mut ByteReader<'_>, output_type: OutputType) -> Result<Self, CodecError> {
		match output_type {
			OutputType::Default => Ok(OutputPayload::Default),
			OutputType::VoteOutput => {
				let version = r.read_u8("vote payload version")?;
				let count = r.read_var_uint("vote content count")?;
				let mut contents = Vec::with_capacity(count.min(1024) as usize);
				for _ in 0..count {
					let vote_type = r.read_u8("vote type")?;
					let candidate_count = r.read_var_uint("vote candidate count")?;
					let mut candidates = Vec::with_capacity(candidate_count.min(1024) as usize);
					for _ in 0..candidate_count {
						candidates.push(r.read_var_bytes("vote candidate")?);
					}
					contents.push(VoteContent {
						vote_type,
						candidates,
					});
				}
				Ok(OutputPayload::Vote { version, contents })
			}
		}
	}

	pub fn to_json(&self) -> Value {
		match self {
			OutputPayload::Default => json!({}),
			OutputPayload::Vote { version, contents } => {
				let contents: Vec<Value> = contents
					.iter()
					.map(|c| {
						json!({
							"Type": c.vote_type,
							"Candidates": c.candidates.iter().map(hex::encode).collect::<Vec<_>>(),
						})
					})
					.collect();
				json!({ "Version": version, "VoteContent": contents })
			}
		}
	}

	pub fn from_json(j: &Value, output_type: OutputType) -> Result<Self, CodecError> {
		match output_type {
			OutputType::Default => Ok(OutputPayload::Default),
			OutputType::VoteOutput => {
				let version = j
					.get("Version")
					.and_then(Value::as_u64)
					.ok_or(CodecError::ShortRead("vote payload version"))? as u8;
				let mut contents = Vec::new();
				for c in j
					.get("VoteContent")
					.and_then(Value::as_array)
					.ok_or(CodecError::ShortRead("vote content"))?
				{
					let vote_type = c
						.get("Type")
						.and_then(Value::as_u64)
						.ok_or(CodecError::ShortRead("vote type"))? as u8;
					let mut candidates = Vec::new();
					for cand in c
						.get("Candidates")
						.and_then(Value::as_array)
						.ok_or(CodecError::ShortRead("vote candidates"))?
					{
						let s = cand
							.as_str()
							.ok_or(CodecError::ShortRead("vote candidate"))?;
						candidates
							.push(hex::decode(s).map_err(|_| CodecError::BadString("vote candidate"))?);
					}
					contents.push(VoteContent {
						vote_type,
						candidates,
					});
				}
				Ok(OutputPayload::Vote { version, contents })
			}
		}
	}
}
