//! In-memory storage: the default store and the test double.

use crate::store::entities::{
	AssetEntity, CoinBaseEntity, MerkleBlockEntity, Nep5LogEntity, PeerEntity, TransactionEntity,
};
use crate::store::{StorageError, WalletStorage, upsert};
use std::sync::Mutex;

/// Vec-backed collections so insertion order survives round-trips, with
/// upsert-by-key replacing in place.
#[derive(Default)]
struct Collections {
	transactions: Vec<TransactionEntity>,
	merkle_blocks: Vec<MerkleBlockEntity>,
	peers: Vec<PeerEntity>,
	coin_bases: Vec<CoinBaseEntity>,
	assets: Vec<AssetEntity>,
	nep5_logs: Vec<Nep5LogEntity>,
}

#[derive(Default)]
pub struct MemoryStorage {
	inner: Mutex<Collections>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait::async_trait]
impl WalletStorage for MemoryStorage {
	async fn put_transaction(&self, tx: TransactionEntity) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		upsert(&mut inner.transactions, tx, |t| t.tx_hash.clone());
		Ok(())
	}

	async fn all_transactions(&self) -> Result<Vec<TransactionEntity>, StorageError> {
		Ok(self.inner.lock().unwrap().transactions.clone())
	}

	async fn transaction_count(&self) -> Result<usize, StorageError> {
		Ok(self.inner.lock().unwrap().transactions.len())
	}

	async fn update_transactions(
		&self,
		tx_hashes: &[String],
		block_height: u32,
		timestamp: u64,
	) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		for tx in &mut inner.transactions {
			if tx_hashes.contains(&tx.tx_hash) {
				tx.block_height = block_height;
				tx.timestamp = timestamp;
			}
		}
		Ok(())
	}

	async fn delete_transaction(&self, tx_hash: &str) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		inner.transactions.retain(|t| t.tx_hash != tx_hash);
		Ok(())
	}

	async fn delete_transactions(&self, tx_hashes: &[String]) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		inner.transactions.retain(|t| !tx_hashes.contains(&t.tx_hash));
		Ok(())
	}

	async fn put_merkle_block(&self, block: MerkleBlockEntity) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		upsert(&mut inner.merkle_blocks, block, |b| b.block_height);
		Ok(())
	}

	async fn put_merkle_blocks(&self, blocks: Vec<MerkleBlockEntity>) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		for block in blocks {
			upsert(&mut inner.merkle_blocks, block, |b| b.block_height);
		}
		Ok(())
	}

	async fn all_merkle_blocks(&self) -> Result<Vec<MerkleBlockEntity>, StorageError> {
		Ok(self.inner.lock().unwrap().merkle_blocks.clone())
	}

	async fn delete_all_merkle_blocks(&self) -> Result<(), StorageError> {
		self.inner.lock().unwrap().merkle_blocks.clear();
		Ok(())
	}

	async fn put_peers(&self, peers: Vec<PeerEntity>) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		for peer in peers {
			upsert(&mut inner.peers, peer, |p| (p.address.clone(), p.port));
		}
		Ok(())
	}

	async fn all_peers(&self) -> Result<Vec<PeerEntity>, StorageError> {
		Ok(self.inner.lock().unwrap().peers.clone())
	}

	async fn delete_all_peers(&self) -> Result<(), StorageError> {
		self.inner.lock().unwrap().peers.clear();
		Ok(())
	}

	async fn put_coin_base(&self, utxo: CoinBaseEntity) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		upsert(&mut inner.coin_bases, utxo, |c| c.tx_hash.clone());
		Ok(())
	}

	async fn put_coin_bases(&self, utxos: Vec<CoinBaseEntity>) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		for utxo in utxos {
			upsert(&mut inner.coin_bases, utxo, |c| c.tx_hash.clone());
		}
		Ok(())
	}

	async fn all_coin_bases(&self) -> Result<Vec<CoinBaseEntity>, StorageError> {
		Ok(self.inner.lock().unwrap().coin_bases.clone())
	}

	async fn update_coin_bases(
		&self,
		tx_hashes: &[String],
		block_height: u32,
		timestamp: u64,
	) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		for cb in &mut inner.coin_bases {
			if tx_hashes.contains(&cb.tx_hash) {
				cb.block_height = block_height;
				cb.timestamp = timestamp;
			}
		}
		Ok(())
	}

	async fn mark_coin_bases_spent(&self, tx_hashes: &[String]) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		for cb in &mut inner.coin_bases {
			if tx_hashes.contains(&cb.tx_hash) {
				cb.spent = true;
			}
		}
		Ok(())
	}

	async fn delete_coin_base(&self, tx_hash: &str) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		inner.coin_bases.retain(|c| c.tx_hash != tx_hash);
		Ok(())
	}

	async fn put_asset(&self, asset: AssetEntity) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		upsert(&mut inner.assets, asset, |a| a.asset_id.clone());
		Ok(())
	}

	async fn all_assets(&self) -> Result<Vec<AssetEntity>, StorageError> {
		Ok(self.inner.lock().unwrap().assets.clone())
	}

	async fn asset(&self, asset_id: &str) -> Result<Option<AssetEntity>, StorageError> {
		Ok(self
			.inner
			.lock()
			.unwrap()
			.assets
			.iter()
			.find(|a| a.asset_id == asset_id)
			.cloned())
	}

	async fn delete_asset(&self, asset_id: &str) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		inner.assets.retain(|a| a.asset_id != asset_id);
		Ok(())
	}

	async fn put_nep5_log(&self, log: Nep5LogEntity) -> Result<(), StorageError> {
		let mut inner = self.inner.lock().unwrap();
		upsert(&mut inner.nep5_logs, log, |l| l.txid.clone());
		Ok(())
	}

	async fn all_nep5_logs(&self) -> Result<Vec<Nep5LogEntity>, StorageError> {
		Ok(self.inner.lock().unwrap().nep5_logs.clone())
	}

	async fn nep5_log(&self, txid: &str) -> Result<Option<Nep5LogEntity>, StorageError> {
		Ok(self
			.inner
			.lock()
			.unwrap()
			.nep5_logs
			.iter()
			.find(|l| l.txid == txid)
			.cloned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain::hashes::{UInt168, UInt256};

	fn tx(hash: &str, height: u32) -> TransactionEntity {
		TransactionEntity {
			raw: vec![height as u8],
			block_height: height,
			timestamp: 1000 + height as u64,
			tx_hash: hash.to_string(),
		}
	}

	fn coin_base(hash: &str) -> CoinBaseEntity {
		CoinBaseEntity {
			spent: false,
			tx_hash: hash.to_string(),
			block_height: 10,
			timestamp: 999,
			amount: 5_000,
			output_lock: 0,
			asset_id: UInt256::new([1; 32]),
			program_hash: UInt168::new([2; 21]),
			output_index: 0,
			payload: None,
		}
	}

	#[tokio::test]
	async fn put_is_an_upsert_by_key() {
		let store = MemoryStorage::new();
		store.put_transaction(tx("aa", 1)).await.unwrap();
		store.put_transaction(tx("aa", 7)).await.unwrap();
		let all = store.all_transactions().await.unwrap();
		assert_eq!(all.len(), 1);
		assert_eq!(all[0].block_height, 7);
	}

	#[tokio::test]
	async fn update_touches_only_named_keys() {
		let store = MemoryStorage::new();
		store.put_transaction(tx("aa", 1)).await.unwrap();
		store.put_transaction(tx("bb", 2)).await.unwrap();
		store
			.update_transactions(&["bb".to_string()], 500, 42)
			.await
			.unwrap();
		let all = store.all_transactions().await.unwrap();
		assert_eq!(all[0].block_height, 1);
		assert_eq!(all[1].block_height, 500);
		assert_eq!(all[1].timestamp, 42);
	}

	#[tokio::test]
	async fn insertion_order_is_preserved() {
		let store = MemoryStorage::new();
		for i in 0..5 {
			store.put_transaction(tx(&format!("h{i}"), i)).await.unwrap();
		}
		let hashes: Vec<_> = store
			.all_transactions()
			.await
			.unwrap()
			.into_iter()
			.map(|t| t.tx_hash)
			.collect();
		assert_eq!(hashes, vec!["h0", "h1", "h2", "h3", "h4"]);
	}

	#[tokio::test]
	async fn coin_base_spent_marking() {
		let store = MemoryStorage::new();
		store.put_coin_base(coin_base("cb1")).await.unwrap();
		store.put_coin_base(coin_base("cb2")).await.unwrap();
		store
			.mark_coin_bases_spent(&["cb2".to_string()])
			.await
			.unwrap();
		let all = store.all_coin_bases().await.unwrap();
		assert!(!all[0].spent);
		assert!(all[1].spent);
	}

	#[tokio::test]
	async fn delete_by_keys() {
		let store = MemoryStorage::new();
		store.put_transaction(tx("aa", 1)).await.unwrap();
		store.put_transaction(tx("bb", 2)).await.unwrap();
		store.put_transaction(tx("cc", 3)).await.unwrap();
		store
			.delete_transactions(&["aa".to_string(), "cc".to_string()])
			.await
			.unwrap();
		let all = store.all_transactions().await.unwrap();
		assert_eq!(all.len(), 1);
		assert_eq!(all[0].tx_hash, "bb");
	}
}
