//! The SPV sync session.
//!
//! `SpvSession` is the integration point between the peer network, durable
//! storage, and event consumers. It owns the event dispatchers and the
//! reconnect actor, and exposes two surfaces:
//!
//! - event-sourcing methods (`on_*`, `sync_*`, `save_*`) called by the network
//!   client as sync progresses; each persists first, then fans the event out
//!   to registered handlers
//! - a load path (`load_*`) that replays persisted state on restart,
//!   reconciling legacy coinbase transactions into dedicated UTXO records
//!
//! Storage writes on the event path are best effort: a failed write is logged
//! and the event still reaches every handler, so in-memory consumers never
//! fall behind the network because of a disk problem.

use crate::account::AddressBook;
use crate::chain::{Asset, Transaction, UInt168, UInt256};
use crate::codec::{ByteReader, ByteWriter};
use crate::network::{ConnectionState, PeerInfo, PeerManager};
use crate::store::{
	AssetEntity, CoinBaseEntity, MerkleBlockEntity, Nep5LogEntity, PeerEntity, TransactionEntity,
	WalletStorage,
};
use crate::sync::SessionError;
use crate::sync::events::{
	ChainEvent, ChainEventDispatcher, ChainEventHandler, WalletEvent, WalletEventDispatcher,
	WalletEventHandler,
};
use crate::sync::reconnect::{ReconnectActor, ReconnectCommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
	/// Interval the reconnect timer is pushed out to on a reset.
	pub reconnect_seconds: u64,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			reconnect_seconds: 60,
		}
	}
}

pub struct SpvSession {
	peer_manager: Arc<dyn PeerManager>,
	storage: Arc<dyn WalletStorage>,
	address_book: Arc<dyn AddressBook>,
	wallet_events: Mutex<WalletEventDispatcher>,
	chain_events: Mutex<ChainEventDispatcher>,
	reconnect_tx: mpsc::Sender<ReconnectCommand>,
	reconnect_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SpvSession {
	/// Create a session and spawn its reconnect actor.
	///
	/// Fails when called outside a tokio runtime, since the actor needs one
	/// to live on.
	pub fn new(
		peer_manager: Arc<dyn PeerManager>,
		storage: Arc<dyn WalletStorage>,
		address_book: Arc<dyn AddressBook>,
		config: SessionConfig,
	) -> Result<Self, SessionError> {
		Handle::try_current().map_err(|e| SessionError::Runtime(e.to_string()))?;

		let (reconnect_tx, reconnect_task) = ReconnectActor::spawn(
			peer_manager.clone(),
			storage.clone(),
			Duration::from_secs(config.reconnect_seconds),
		);

		Ok(Self {
			peer_manager,
			storage,
			address_book,
			wallet_events: Mutex::new(WalletEventDispatcher::new()),
			chain_events: Mutex::new(ChainEventDispatcher::new()),
			reconnect_tx,
			reconnect_task: std::sync::Mutex::new(Some(reconnect_task)),
		})
	}

	pub async fn register_wallet_handler(&self, handler: Box<dyn WalletEventHandler>) {
		self.wallet_events.lock().await.register_handler(handler);
	}

	pub async fn register_chain_handler(&self, handler: Box<dyn ChainEventHandler>) {
		self.chain_events.lock().await.register_handler(handler);
	}

	/// Enable auto-reconnect and open the connection.
	pub async fn start(&self) {
		info!("starting spv session");
		self.peer_manager.set_auto_reconnect(true);
		self.peer_manager.connect().await;
	}

	/// Shut down: stop the reconnect actor, then drop the connection.
	///
	/// The actor is drained before the disconnect so a timer that was about
	/// to fire cannot reconnect a session that is going away.
	pub async fn stop(&self) {
		info!("stopping spv session");
		let _ = self.reconnect_tx.send(ReconnectCommand::Stop).await;
		let task = self.reconnect_task.lock().unwrap().take();
		if let Some(task) = task {
			if let Err(e) = task.await {
				error!("reconnect actor ended abnormally: {}", e);
			}
		}
		self.peer_manager.set_outstanding_reconnect_count(0);
		self.peer_manager.set_auto_reconnect(false);
		self.peer_manager.disconnect().await;
	}

	/// Publish a transaction, forcing a fresh connection first when the
	/// session is not currently connected.
	pub async fn publish_transaction(&self, tx: &Transaction) {
		let mut w = ByteWriter::new();
		tx.serialize(&mut w);
		info!(tx_hash = %tx.hash(), "publishing transaction: {}", tx.to_json());
		info!("raw tx: {}", hex::encode(w.bytes()));

		if self.peer_manager.connection_state() != ConnectionState::Connected {
			// Reconnect by hand; suppress auto-reconnect and any pending
			// timer so they cannot race this cycle.
			self.peer_manager.set_auto_reconnect(false);
			let _ = self.reconnect_tx.send(ReconnectCommand::Cancel).await;
			self.peer_manager.disconnect().await;
			self.peer_manager.set_auto_reconnect(true);
			self.peer_manager.connect().await;
		}

		self.peer_manager.publish_transaction(tx).await;
	}

	// --- wallet event sourcing -------------------------------------------

	pub async fn balance_changed(&self, asset_id: UInt256, balance: u128) {
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::BalanceChanged { asset_id, balance })
			.await;
	}

	pub async fn on_coinbase_added(&self, utxo: CoinBaseEntity) {
		if let Err(e) = self.storage.put_coin_base(utxo.clone()).await {
			error!("failed to store coinbase output {}: {}", utxo.tx_hash, e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::CoinBaseAdded { utxo })
			.await;
	}

	pub async fn on_coinbase_updated(
		&self,
		tx_hashes: Vec<String>,
		block_height: u32,
		timestamp: u64,
	) {
		if let Err(e) = self
			.storage
			.update_coin_bases(&tx_hashes, block_height, timestamp)
			.await
		{
			error!("failed to update coinbase outputs: {}", e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::CoinBaseUpdated {
				tx_hashes,
				block_height,
				timestamp,
			})
			.await;
	}

	pub async fn on_coinbase_spent(&self, spent_hashes: Vec<String>) {
		if let Err(e) = self.storage.mark_coin_bases_spent(&spent_hashes).await {
			error!("failed to mark coinbase outputs spent: {}", e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::CoinBaseSpent { spent_hashes })
			.await;
	}

	/// Delete happens before the fan-out, so handlers observe the
	/// post-delete store.
	pub async fn on_coinbase_deleted(
		&self,
		tx_hash: String,
		notify_user: bool,
		recommend_rescan: bool,
	) {
		if let Err(e) = self.storage.delete_coin_base(&tx_hash).await {
			error!("failed to delete coinbase output {}: {}", tx_hash, e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::CoinBaseDeleted {
				tx_hash,
				notify_user,
				recommend_rescan,
			})
			.await;
	}

	pub async fn on_transaction_added(&self, tx: Transaction) {
		let mut w = ByteWriter::new();
		tx.serialize(&mut w);
		let entity = TransactionEntity {
			raw: w.into_bytes(),
			block_height: tx.block_height,
			timestamp: tx.timestamp,
			tx_hash: tx.hash().to_hex(),
		};
		if let Err(e) = self.storage.put_transaction(entity).await {
			error!("failed to store transaction {}: {}", tx.hash(), e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::TransactionAdded { tx })
			.await;
	}

	pub async fn on_transaction_updated(
		&self,
		tx_hashes: Vec<String>,
		block_height: u32,
		timestamp: u64,
	) {
		if let Err(e) = self
			.storage
			.update_transactions(&tx_hashes, block_height, timestamp)
			.await
		{
			error!("failed to update transactions: {}", e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::TransactionUpdated {
				tx_hashes,
				block_height,
				timestamp,
			})
			.await;
	}

	pub async fn on_transaction_deleted(
		&self,
		tx_hash: String,
		notify_user: bool,
		recommend_rescan: bool,
	) {
		if let Err(e) = self.storage.delete_transaction(&tx_hash).await {
			error!("failed to delete transaction {}: {}", tx_hash, e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::TransactionDeleted {
				tx_hash,
				notify_user,
				recommend_rescan,
			})
			.await;
	}

	pub async fn on_asset_registered(&self, mut asset: Asset, amount: u64, controller: UInt168) {
		let asset_id = asset.hash().to_hex();
		let mut w = ByteWriter::new();
		asset.serialize(&mut w);
		let entity = AssetEntity {
			asset_id: asset_id.clone(),
			amount,
			raw: w.into_bytes(),
		};
		if let Err(e) = self.storage.put_asset(entity).await {
			error!("failed to store asset {}: {}", asset_id, e);
		}
		self.wallet_events
			.lock()
			.await
			.dispatch(&WalletEvent::AssetRegistered {
				asset,
				amount,
				controller,
			})
			.await;
	}

	// --- chain event sourcing --------------------------------------------

	pub async fn sync_started(&self) {
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::SyncStarted)
			.await;
	}

	pub async fn sync_progress(
		&self,
		current_height: u32,
		estimated_height: u32,
		last_block_time: u64,
	) {
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::SyncProgress {
				current_height,
				estimated_height,
				last_block_time,
			})
			.await;
	}

	pub async fn sync_stopped(&self, error: String) {
		if !error.is_empty() {
			error!("sync stopped with error: {}", error);
		}
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::SyncStopped { error })
			.await;
	}

	pub async fn tx_status_update(&self) {
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::TxStatusUpdate)
			.await;
	}

	/// Persist merkle blocks. Height 0 marks a placeholder the network client
	/// emits before the chain tip is known; it is never written.
	pub async fn save_blocks(&self, replace: bool, blocks: Vec<MerkleBlockEntity>) {
		if replace {
			if let Err(e) = self.storage.delete_all_merkle_blocks().await {
				error!("failed to clear stored merkle blocks: {}", e);
			}
		}
		let to_store: Vec<_> = blocks.iter().filter(|b| b.block_height != 0).cloned().collect();
		if let Err(e) = self.storage.put_merkle_blocks(to_store).await {
			error!("failed to store merkle blocks: {}", e);
		}
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::BlocksSaved { replace, blocks })
			.await;
	}

	pub async fn save_peers(&self, replace: bool, peers: Vec<PeerInfo>) {
		if replace {
			if let Err(e) = self.storage.delete_all_peers().await {
				error!("failed to clear stored peers: {}", e);
			}
		}
		let entities = peers
			.iter()
			.map(|p| PeerEntity {
				address: p.address.clone(),
				port: p.port,
				timestamp: p.timestamp,
			})
			.collect();
		if let Err(e) = self.storage.put_peers(entities).await {
			error!("failed to store peers: {}", e);
		}
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::PeersSaved { replace, peers })
			.await;
	}

	pub async fn on_nep5_log(&self, log: Nep5LogEntity) {
		if let Err(e) = self.storage.put_nep5_log(log.clone()).await {
			error!("failed to store token transfer log {}: {}", log.txid, e);
		}
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::Nep5LogSaved { log })
			.await;
	}

	pub async fn tx_published(&self, hash: String, result: String) {
		self.chain_events
			.lock()
			.await
			.dispatch(&ChainEvent::TxPublished { hash, result })
			.await;
	}

	pub async fn network_is_reachable(&self) -> bool {
		self.chain_events.lock().await.network_is_reachable()
	}

	/// Forward an idle notification to the reconnect actor.
	pub async fn sync_inactive(&self, delay: Duration) {
		let _ = self
			.reconnect_tx
			.send(ReconnectCommand::SyncInactive { delay })
			.await;
	}

	/// Push a pending reconnect deadline out by the configured interval.
	pub async fn reset_reconnect(&self) {
		let _ = self.reconnect_tx.send(ReconnectCommand::Reset).await;
	}

	// --- load path --------------------------------------------------------

	/// Replay stored transactions, migrating coinbase transactions into
	/// dedicated UTXO records.
	///
	/// Coinbase transactions found in the transaction store are an older
	/// layout: each is converted to a [`CoinBaseEntity`] for its first
	/// wallet-owned output, marked spent when any other stored transaction
	/// consumes it, and then removed from the transaction store. Undecodable
	/// records are logged and skipped.
	pub async fn load_transactions(&self) -> Result<Vec<Transaction>, SessionError> {
		let entities = self.storage.all_transactions().await?;

		let mut txs = Vec::with_capacity(entities.len());
		let mut coinbase_txs = Vec::new();
		for entity in entities {
			let mut r = ByteReader::new(&entity.raw);
			let mut tx = match Transaction::deserialize(&mut r) {
				Ok(tx) => tx,
				Err(e) => {
					error!("discarding undecodable stored transaction {}: {}", entity.tx_hash, e);
					continue;
				}
			};
			tx.block_height = entity.block_height;
			tx.timestamp = entity.timestamp;
			if tx.is_coinbase() {
				coinbase_txs.push(tx);
			} else {
				txs.push(tx);
			}
		}

		if !coinbase_txs.is_empty() {
			info!(count = coinbase_txs.len(), "migrating stored coinbase transactions");
			let mut utxos = Vec::with_capacity(coinbase_txs.len());
			let mut migrated_hashes = Vec::with_capacity(coinbase_txs.len());
			for tx in &coinbase_txs {
				let tx_hash = tx.hash();
				migrated_hashes.push(tx_hash.to_hex());

				let owned = tx.outputs.iter().enumerate().find(|(_, o)| {
					self.address_book.contains_program_hash(&o.program_hash)
				});
				let Some((index, output)) = owned else {
					continue;
				};

				let spent = txs
					.iter()
					.any(|other| other.inputs.iter().any(|i| i.prev_hash == tx_hash));

				let payload = if tx.version.supports_output_type() {
					let mut w = ByteWriter::new();
					output.payload().serialize(&mut w);
					Some(w.into_bytes())
				} else {
					None
				};

				utxos.push(CoinBaseEntity {
					spent,
					tx_hash: tx_hash.to_hex(),
					block_height: tx.block_height,
					timestamp: tx.timestamp,
					amount: output.amount,
					output_lock: output.output_lock,
					asset_id: output.asset_id,
					program_hash: output.program_hash,
					output_index: index as u16,
					payload,
				});
			}

			self.storage.put_coin_bases(utxos).await?;
			self.storage.delete_transactions(&migrated_hashes).await?;
		}

		Ok(txs)
	}

	pub async fn load_coinbase_utxos(&self) -> Result<Vec<CoinBaseEntity>, SessionError> {
		Ok(self.storage.all_coin_bases().await?)
	}

	pub async fn load_blocks(&self) -> Result<Vec<MerkleBlockEntity>, SessionError> {
		Ok(self.storage.all_merkle_blocks().await?)
	}

	pub async fn load_peers(&self) -> Result<Vec<PeerInfo>, SessionError> {
		Ok(self
			.storage
			.all_peers()
			.await?
			.into_iter()
			.map(|p| PeerInfo::new(p.address, p.port, p.timestamp))
			.collect())
	}

	/// Replay stored assets. The stored id wins over a recomputed hash, so
	/// ids assigned by genesis stay stable. Undecodable records are logged
	/// and skipped.
	pub async fn load_assets(&self) -> Result<Vec<Asset>, SessionError> {
		let entities = self.storage.all_assets().await?;
		let mut assets = Vec::with_capacity(entities.len());
		for entity in entities {
			let mut r = ByteReader::new(&entity.raw);
			let mut asset = match Asset::deserialize(&mut r) {
				Ok(asset) => asset,
				Err(e) => {
					error!("discarding undecodable stored asset {}: {}", entity.asset_id, e);
					continue;
				}
			};
			match UInt256::from_hex(&entity.asset_id) {
				Ok(id) => asset.set_hash(id),
				Err(_) => {
					error!("discarding asset with malformed id {}", entity.asset_id);
					continue;
				}
			}
			assets.push(asset);
		}
		Ok(assets)
	}

	pub async fn load_nep5_logs(&self) -> Result<Vec<Nep5LogEntity>, SessionError> {
		Ok(self.storage.all_nep5_logs().await?)
	}

	pub async fn nep5_log(&self, txid: &str) -> Result<Option<Nep5LogEntity>, SessionError> {
		Ok(self.storage.nep5_log(txid).await?)
	}

	pub async fn transaction_count(&self) -> Result<usize, SessionError> {
		Ok(self.storage.transaction_count().await?)
	}
}
