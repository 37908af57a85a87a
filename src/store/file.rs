//! File-backed storage.
//!
//! One bincode-framed file per collection under the data directory, with a
//! JSON sidecar recording the record count and last write time. Mutations load
//! the whole collection, apply the change, and rewrite the file; a single lock
//! serializes access across collections. Suited to wallet-scale data, not a
//! general database.

use crate::store::entities::{
	AssetEntity, CoinBaseEntity, MerkleBlockEntity, Nep5LogEntity, PeerEntity, TransactionEntity,
};
use crate::store::{StorageError, WalletStorage, upsert};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

pub struct FileStorage {
	data_dir: PathBuf,
	lock: Mutex<()>,
}

impl FileStorage {
	pub fn new(data_dir: PathBuf) -> Self {
		Self {
			data_dir,
			lock: Mutex::new(()),
		}
	}

	fn collection_path(&self, name: &str) -> PathBuf {
		self.data_dir.join(format!("{name}.bin"))
	}

	fn metadata_path(&self, name: &str) -> PathBuf {
		self.data_dir.join(format!("{name}.meta.json"))
	}

	async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StorageError> {
		let path = self.collection_path(name);
		if !path.exists() {
			return Ok(Vec::new());
		}
		let bytes = tokio::fs::read(&path).await?;
		bincode::deserialize(&bytes).map_err(|e| StorageError::Encode(e.to_string()))
	}

	async fn save<T: Serialize>(&self, name: &str, records: &[T]) -> Result<(), StorageError> {
		let bytes =
			bincode::serialize(&records).map_err(|e| StorageError::Encode(e.to_string()))?;
		tokio::fs::create_dir_all(&self.data_dir).await?;
		tokio::fs::write(self.collection_path(name), &bytes).await?;

		let metadata = serde_json::json!({
			"records": records.len(),
			"updated_at": chrono::Utc::now().to_rfc3339(),
		});
		let metadata = serde_json::to_string_pretty(&metadata)
			.map_err(|e| StorageError::Encode(e.to_string()))?;
		tokio::fs::write(self.metadata_path(name), metadata).await?;

		Ok(())
	}

	async fn mutate<T, F>(&self, name: &str, f: F) -> Result<(), StorageError>
	where
		T: Serialize + DeserializeOwned,
		F: FnOnce(&mut Vec<T>),
	{
		let _guard = self.lock.lock().await;
		let mut records = self.load::<T>(name).await?;
		f(&mut records);
		self.save(name, &records).await
	}

	async fn load_locked<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StorageError> {
		let _guard = self.lock.lock().await;
		self.load(name).await
	}
}

const TRANSACTIONS: &str = "transactions";
const MERKLE_BLOCKS: &str = "merkle_blocks";
const PEERS: &str = "peers";
const COIN_BASES: &str = "coin_bases";
const ASSETS: &str = "assets";
const NEP5_LOGS: &str = "nep5_logs";

#[async_trait::async_trait]
impl WalletStorage for FileStorage {
	async fn put_transaction(&self, tx: TransactionEntity) -> Result<(), StorageError> {
		self.mutate(TRANSACTIONS, |records: &mut Vec<TransactionEntity>| {
			upsert(records, tx, |t| t.tx_hash.clone());
		})
		.await
	}

	async fn all_transactions(&self) -> Result<Vec<TransactionEntity>, StorageError> {
		self.load_locked(TRANSACTIONS).await
	}

	async fn transaction_count(&self) -> Result<usize, StorageError> {
		Ok(self.load_locked::<TransactionEntity>(TRANSACTIONS).await?.len())
	}

	async fn update_transactions(
		&self,
		tx_hashes: &[String],
		block_height: u32,
		timestamp: u64,
	) -> Result<(), StorageError> {
		self.mutate(TRANSACTIONS, |records: &mut Vec<TransactionEntity>| {
			for tx in records.iter_mut() {
				if tx_hashes.contains(&tx.tx_hash) {
					tx.block_height = block_height;
					tx.timestamp = timestamp;
				}
			}
		})
		.await
	}

	async fn delete_transaction(&self, tx_hash: &str) -> Result<(), StorageError> {
		self.mutate(TRANSACTIONS, |records: &mut Vec<TransactionEntity>| {
			records.retain(|t| t.tx_hash != tx_hash);
		})
		.await
	}

	async fn delete_transactions(&self, tx_hashes: &[String]) -> Result<(), StorageError> {
		self.mutate(TRANSACTIONS, |records: &mut Vec<TransactionEntity>| {
			records.retain(|t| !tx_hashes.contains(&t.tx_hash));
		})
		.await
	}

	async fn put_merkle_block(&self, block: MerkleBlockEntity) -> Result<(), StorageError> {
		self.mutate(MERKLE_BLOCKS, |records: &mut Vec<MerkleBlockEntity>| {
			upsert(records, block, |b| b.block_height);
		})
		.await
	}

	async fn put_merkle_blocks(&self, blocks: Vec<MerkleBlockEntity>) -> Result<(), StorageError> {
		let count = blocks.len();
		self.mutate(MERKLE_BLOCKS, |records: &mut Vec<MerkleBlockEntity>| {
			for block in blocks {
				upsert(records, block, |b| b.block_height);
			}
		})
		.await?;
		info!("saved {} merkle blocks to {:?}", count, self.collection_path(MERKLE_BLOCKS));
		Ok(())
	}

	async fn all_merkle_blocks(&self) -> Result<Vec<MerkleBlockEntity>, StorageError> {
		self.load_locked(MERKLE_BLOCKS).await
	}

	async fn delete_all_merkle_blocks(&self) -> Result<(), StorageError> {
		self.mutate(MERKLE_BLOCKS, |records: &mut Vec<MerkleBlockEntity>| {
			records.clear();
		})
		.await
	}

	async fn put_peers(&self, peers: Vec<PeerEntity>) -> Result<(), StorageError> {
		self.mutate(PEERS, |records: &mut Vec<PeerEntity>| {
			for peer in peers {
				upsert(records, peer, |p| (p.address.clone(), p.port));
			}
		})
		.await
	}

	async fn all_peers(&self) -> Result<Vec<PeerEntity>, StorageError> {
		self.load_locked(PEERS).await
	}

	async fn delete_all_peers(&self) -> Result<(), StorageError> {
		self.mutate(PEERS, |records: &mut Vec<PeerEntity>| records.clear())
			.await
	}

	async fn put_coin_base(&self, utxo: CoinBaseEntity) -> Result<(), StorageError> {
		self.mutate(COIN_BASES, |records: &mut Vec<CoinBaseEntity>| {
			upsert(records, utxo, |c| c.tx_hash.clone());
		})
		.await
	}

	async fn put_coin_bases(&self, utxos: Vec<CoinBaseEntity>) -> Result<(), StorageError> {
		self.mutate(COIN_BASES, |records: &mut Vec<CoinBaseEntity>| {
			for utxo in utxos {
				upsert(records, utxo, |c| c.tx_hash.clone());
			}
		})
		.await
	}

	async fn all_coin_bases(&self) -> Result<Vec<CoinBaseEntity>, StorageError> {
		self.load_locked(COIN_BASES).await
	}

	async fn update_coin_bases(
		&self,
		tx_hashes: &[String],
		block_height: u32,
		timestamp: u64,
	) -> Result<(), StorageError> {
		self.mutate(COIN_BASES, |records: &mut Vec<CoinBaseEntity>| {
			for cb in records.iter_mut() {
				if tx_hashes.contains(&cb.tx_hash) {
					cb.block_height = block_height;
					cb.timestamp = timestamp;
				}
			}
		})
		.await
	}

	async fn mark_coin_bases_spent(&self, tx_hashes: &[String]) -> Result<(), StorageError> {
		self.mutate(COIN_BASES, |records: &mut Vec<CoinBaseEntity>| {
			for cb in records.iter_mut() {
				if tx_hashes.contains(&cb.tx_hash) {
					cb.spent = true;
				}
			}
		})
		.await
	}

	async fn delete_coin_base(&self, tx_hash: &str) -> Result<(), StorageError> {
		self.mutate(COIN_BASES, |records: &mut Vec<CoinBaseEntity>| {
			records.retain(|c| c.tx_hash != tx_hash);
		})
		.await
	}

	async fn put_asset(&self, asset: AssetEntity) -> Result<(), StorageError> {
		self.mutate(ASSETS, |records: &mut Vec<AssetEntity>| {
			upsert(records, asset, |a| a.asset_id.clone());
		})
		.await
	}

	async fn all_assets(&self) -> Result<Vec<AssetEntity>, StorageError> {
		self.load_locked(ASSETS).await
	}

	async fn asset(&self, asset_id: &str) -> Result<Option<AssetEntity>, StorageError> {
		Ok(self
			.load_locked::<AssetEntity>(ASSETS)
			.await?
			.into_iter()
			.find(|a| a.asset_id == asset_id))
	}

	async fn delete_asset(&self, asset_id: &str) -> Result<(), StorageError> {
		self.mutate(ASSETS, |records: &mut Vec<AssetEntity>| {
			records.retain(|a| a.asset_id != asset_id);
		})
		.await
	}

	async fn put_nep5_log(&self, log: Nep5LogEntity) -> Result<(), StorageError> {
		self.mutate(NEP5_LOGS, |records: &mut Vec<Nep5LogEntity>| {
			upsert(records, log, |l| l.txid.clone());
		})
		.await
	}

	async fn all_nep5_logs(&self) -> Result<Vec<Nep5LogEntity>, StorageError> {
		self.load_locked(NEP5_LOGS).await
	}

	async fn nep5_log(&self, txid: &str) -> Result<Option<Nep5LogEntity>, StorageError> {
		Ok(self
			.load_locked::<Nep5LogEntity>(NEP5_LOGS)
			.await?
			.into_iter()
			.find(|l| l.txid == txid))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain::hashes::{UInt168, UInt256};
	use rand::Rng;

	fn rand_bytes(len: usize) -> Vec<u8> {
		let mut bytes = vec![0u8; len];
		rand::rng().fill(&mut bytes[..]);
		bytes
	}

	fn rand_tx(i: u32) -> TransactionEntity {
		TransactionEntity {
			raw: rand_bytes(100),
			block_height: i,
			timestamp: rand::rng().random(),
			tx_hash: hex::encode(rand_bytes(32)),
		}
	}

	#[tokio::test]
	async fn collections_survive_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let saved: Vec<TransactionEntity> = (0..20).map(rand_tx).collect();

		{
			let store = FileStorage::new(dir.path().to_path_buf());
			for tx in &saved {
				store.put_transaction(tx.clone()).await.unwrap();
			}
		}

		let store = FileStorage::new(dir.path().to_path_buf());
		let loaded = store.all_transactions().await.unwrap();
		assert_eq!(loaded, saved);
	}

	#[tokio::test]
	async fn upsert_and_delete_by_key() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStorage::new(dir.path().to_path_buf());

		let mut tx = rand_tx(1);
		store.put_transaction(tx.clone()).await.unwrap();
		tx.block_height = 77;
		store.put_transaction(tx.clone()).await.unwrap();

		let all = store.all_transactions().await.unwrap();
		assert_eq!(all.len(), 1);
		assert_eq!(all[0].block_height, 77);

		store.delete_transaction(&tx.tx_hash).await.unwrap();
		assert_eq!(store.transaction_count().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn coin_bases_round_trip_with_hash_fields() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStorage::new(dir.path().to_path_buf());

		let cb = CoinBaseEntity {
			spent: false,
			tx_hash: hex::encode(rand_bytes(32)),
			block_height: 42,
			timestamp: 1_700_000_000,
			amount: 5_000_000,
			output_lock: 0,
			asset_id: UInt256::new([0xab; 32]),
			program_hash: UInt168::new([0xcd; 21]),
			output_index: 1,
			payload: Some(rand_bytes(16)),
		};
		store.put_coin_base(cb.clone()).await.unwrap();
		store
			.mark_coin_bases_spent(&[cb.tx_hash.clone()])
			.await
			.unwrap();

		let all = store.all_coin_bases().await.unwrap();
		assert_eq!(all.len(), 1);
		assert!(all[0].spent);
		assert_eq!(all[0].asset_id, cb.asset_id);
		assert_eq!(all[0].program_hash, cb.program_hash);
	}

	#[tokio::test]
	async fn missing_files_read_as_empty() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStorage::new(dir.path().to_path_buf());
		assert!(store.all_peers().await.unwrap().is_empty());
		assert!(store.nep5_log("none").await.unwrap().is_none());
	}
}
