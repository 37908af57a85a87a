//! Durable record types, one per stored collection.
//!
//! Each record carries its own stable key (hash string, height, or composite)
//! so storage implementations can upsert deterministically: delivering the
//! same event twice mutates the same row instead of duplicating it.

use crate::chain::hashes::{UInt168, UInt256};
use serde::{Deserialize, Serialize};

/// A stored transaction: serialized wire bytes plus confirmation bookkeeping.
/// Keyed by `tx_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntity {
	pub raw: Vec<u8>,
	pub block_height: u32,
	pub timestamp: u64,
	pub tx_hash: String,
}

/// A stored merkle block: height plus serialized block bytes. Keyed by
/// `block_height`. Height 0 is the genesis placeholder and is never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleBlockEntity {
	pub block_height: u32,
	pub raw: Vec<u8>,
}

/// A reconnection hint, never authoritative. Keyed by `(address, port)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntity {
	pub address: String,
	pub port: u16,
	pub timestamp: u64,
}

/// A reconciled block-reward output owned by the wallet. Keyed by `tx_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinBaseEntity {
	pub spent: bool,
	pub tx_hash: String,
	pub block_height: u32,
	pub timestamp: u64,
	pub amount: u64,
	pub output_lock: u32,
	pub asset_id: UInt256,
	pub program_hash: UInt168,
	pub output_index: u16,
	pub payload: Option<Vec<u8>>,
}

/// A registered asset definition. Keyed by `asset_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntity {
	pub asset_id: String,
	pub amount: u64,
	pub raw: Vec<u8>,
}

/// Token-transfer audit record. Keyed by `txid`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nep5LogEntity {
	pub txid: String,
	pub contract_hash: String,
	pub from_addr: String,
	pub to_addr: String,
	pub value: String,
}
