//! Durable storage behind the sync session.
//!
//! [`WalletStorage`] is the logical view of the store as typed record
//! collections with upsert-by-key semantics. The session treats it as a
//! best-effort mirror: write failures are logged by the caller and never block
//! in-memory event propagation. Collections preserve insertion order; the
//! session imposes no sorting of its own.

pub mod entities;
pub mod file;
pub mod memory;

pub use entities::{
	AssetEntity, CoinBaseEntity, MerkleBlockEntity, Nep5LogEntity, PeerEntity, TransactionEntity,
};
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Replace-in-place upsert shared by the storage implementations.
pub(crate) fn upsert<T, K: PartialEq>(records: &mut Vec<T>, record: T, key: impl Fn(&T) -> K) {
	let k = key(&record);
	match records.iter_mut().find(|r| key(r) == k) {
		Some(existing) => *existing = record,
		None => records.push(record),
	}
}

/// Errors surfaced by storage implementations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("encode error: {0}")]
	Encode(String),
}

/// Typed record collections with deterministic upsert-by-key.
///
/// Every `put` is an upsert against the record's key; bulk variants upsert
/// each element. `update_*` operations touch only the named keys and only the
/// named fields.
#[async_trait::async_trait]
pub trait WalletStorage: Send + Sync {
	// Transactions, keyed by tx hash.
	async fn put_transaction(&self, tx: TransactionEntity) -> Result<(), StorageError>;
	async fn all_transactions(&self) -> Result<Vec<TransactionEntity>, StorageError>;
	async fn transaction_count(&self) -> Result<usize, StorageError>;
	async fn update_transactions(
		&self,
		tx_hashes: &[String],
		block_height: u32,
		timestamp: u64,
	) -> Result<(), StorageError>;
	async fn delete_transaction(&self, tx_hash: &str) -> Result<(), StorageError>;
	async fn delete_transactions(&self, tx_hashes: &[String]) -> Result<(), StorageError>;

	// Merkle blocks, keyed by height.
	async fn put_merkle_block(&self, block: MerkleBlockEntity) -> Result<(), StorageError>;
	async fn put_merkle_blocks(&self, blocks: Vec<MerkleBlockEntity>) -> Result<(), StorageError>;
	async fn all_merkle_blocks(&self) -> Result<Vec<MerkleBlockEntity>, StorageError>;
	async fn delete_all_merkle_blocks(&self) -> Result<(), StorageError>;

	// Peers, keyed by (address, port).
	async fn put_peers(&self, peers: Vec<PeerEntity>) -> Result<(), StorageError>;
	async fn all_peers(&self) -> Result<Vec<PeerEntity>, StorageError>;
	async fn delete_all_peers(&self) -> Result<(), StorageError>;

	// Coinbase outputs, keyed by owning tx hash.
	async fn put_coin_base(&self, utxo: CoinBaseEntity) -> Result<(), StorageError>;
	async fn put_coin_bases(&self, utxos: Vec<CoinBaseEntity>) -> Result<(), StorageError>;
	async fn all_coin_bases(&self) -> Result<Vec<CoinBaseEntity>, StorageError>;
	async fn update_coin_bases(
		&self,
		tx_hashes: &[String],
		block_height: u32,
		timestamp: u64,
	) -> Result<(), StorageError>;
	async fn mark_coin_bases_spent(&self, tx_hashes: &[String]) -> Result<(), StorageError>;
	async fn delete_coin_base(&self, tx_hash: &str) -> Result<(), StorageError>;

	// Assets, keyed by asset id.
	async fn put_asset(&self, asset: AssetEntity) -> Result<(), StorageError>;
	async fn all_assets(&self) -> Result<Vec<AssetEntity>, StorageError>;
	async fn asset(&self, asset_id: &str) -> Result<Option<AssetEntity>, StorageError>;
	async fn delete_asset(&self, asset_id: &str) -> Result<(), StorageError>;

	// Token-transfer audit logs, keyed by txid.
	async fn put_nep5_log(&self, log: Nep5LogEntity) -> Result<(), StorageError>;
	async fn all_nep5_logs(&self) -> Result<Vec<Nep5LogEntity>, StorageError>;
	async fn nep5_log(&self, txid: &str) -> Result<Option<Nep5LogEntity>, StorageError>;
}
