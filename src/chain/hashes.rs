//! Fixed-size hash types shared by the wire and JSON formats.
//!
//! `UInt256` identifies transactions, blocks and assets; `UInt168` is a
//! program hash, the spending-condition identifier that stands in for an
//! address. On the wire both are raw bytes; in JSON a `UInt256` renders as
//! lowercase hex in display order (byte-reversed relative to wire order) while
//! a `UInt168` renders in wire order.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 256-bit hash (transaction, block or asset id).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UInt256([u8; 32]);

impl UInt256 {
	pub const ZERO: Self = Self([0u8; 32]);

	pub fn new(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0 == [0u8; 32]
	}

	/// Lowercase hex in display order: last wire byte first.
	pub fn to_hex(&self) -> String {
		let mut rev = self.0;
		rev.reverse();
		hex::encode(rev)
	}

	/// Parse display-order hex back into wire-order bytes.
	pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
		let bytes = hex::decode(s)?;
		if bytes.len() != 32 {
			return Err(hex::FromHexError::InvalidStringLength);
		}
		let mut out = [0u8; 32];
		out.copy_from_slice(&bytes);
		out.reverse();
		Ok(Self(out))
	}
}

impl fmt::Display for UInt256 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::Debug for UInt256 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "UInt256({})", self.to_hex())
	}
}

impl FromStr for UInt256 {
	type Err = hex::FromHexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_hex(s)
	}
}

impl Serialize for UInt256 {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for UInt256 {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		Self::from_hex(&s).map_err(D::Error::custom)
	}
}

/// A 168-bit program hash identifying a transaction output's recipient.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UInt168([u8; 21]);

impl UInt168 {
	pub const ZERO: Self = Self([0u8; 21]);

	pub fn new(bytes: [u8; 21]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 21] {
		&self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0 == [0u8; 21]
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}

	pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
		let bytes = hex::decode(s)?;
		if bytes.len() != 21 {
			return Err(hex::FromHexError::InvalidStringLength);
		}
		let mut out = [0u8; 21];
		out.copy_from_slice(&bytes);
		Ok(Self(out))
	}
}

impl fmt::Display for UInt168 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::Debug for UInt168 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "UInt168({})", self.to_hex())
	}
}

impl FromStr for UInt168 {
	type Err = hex::FromHexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_hex(s)
	}
}

impl Serialize for UInt168 {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for UInt168 {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		Self::from_hex(&s).map_err(D::Error::custom)
	}
}
