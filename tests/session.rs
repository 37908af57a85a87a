//! End-to-end tests for the sync session: coinbase migration on load,
//! publish connection handling, and the reconnect state machine.

use spv_state_sync::{
	ChainEvent, ChainEventHandler, CoinBaseEntity, ConnectionState, MemoryStorage, OutputType,
	PeerEntity, PeerInfo, PeerManager, SessionConfig, SessionError, SpvSession, StaticAddressBook,
	Transaction, TransactionEntity, TransactionOutput, TransactionPayload, TxInput, TxVersion,
	UInt168, UInt256, WalletEvent, WalletEventHandler, WalletStorage, codec::ByteWriter,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockPeerManager {
	auto_reconnect: AtomicBool,
	outstanding: AtomicU32,
	state: Mutex<ConnectionState>,
	peers: Mutex<Vec<PeerInfo>>,
	calls: Mutex<Vec<&'static str>>,
}

impl MockPeerManager {
	fn new(state: ConnectionState) -> Arc<Self> {
		Arc::new(Self {
			auto_reconnect: AtomicBool::new(false),
			outstanding: AtomicU32::new(0),
			state: Mutex::new(state),
			peers: Mutex::new(Vec::new()),
			calls: Mutex::new(Vec::new()),
		})
	}

	fn calls(&self) -> Vec<&'static str> {
		self.calls.lock().unwrap().clone()
	}

	fn count(&self, name: &str) -> usize {
		self.calls().iter().filter(|c| **c == name).count()
	}
}

#[async_trait::async_trait]
impl PeerManager for MockPeerManager {
	async fn connect(&self) {
		self.calls.lock().unwrap().push("connect");
		*self.state.lock().unwrap() = ConnectionState::Connected;
	}

	async fn async_connect(&self) {
		self.calls.lock().unwrap().push("async_connect");
		*self.state.lock().unwrap() = ConnectionState::Connected;
	}

	async fn disconnect(&self) {
		self.calls.lock().unwrap().push("disconnect");
		*self.state.lock().unwrap() = ConnectionState::Disconnected;
	}

	fn set_auto_reconnect(&self, enabled: bool) {
		self.auto_reconnect.store(enabled, Ordering::SeqCst);
	}

	fn auto_reconnect(&self) -> bool {
		self.auto_reconnect.load(Ordering::SeqCst)
	}

	fn set_outstanding_reconnect_count(&self, count: u32) {
		self.outstanding.store(count, Ordering::SeqCst);
	}

	fn outstanding_reconnect_count(&self) -> u32 {
		self.outstanding.load(Ordering::SeqCst)
	}

	fn connection_state(&self) -> ConnectionState {
		*self.state.lock().unwrap()
	}

	fn peers(&self) -> Vec<PeerInfo> {
		self.peers.lock().unwrap().clone()
	}

	fn set_peers(&self, peers: Vec<PeerInfo>) {
		self.calls.lock().unwrap().push("set_peers");
		*self.peers.lock().unwrap() = peers;
	}

	async fn publish_transaction(&self, _tx: &Transaction) {
		self.calls.lock().unwrap().push("publish");
	}
}

const OWNED: [u8; 21] = [9; 21];

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

fn session_with(
	pm: Arc<MockPeerManager>,
	storage: Arc<MemoryStorage>,
) -> SpvSession {
	init_tracing();
	SpvSession::new(
		pm,
		storage,
		Arc::new(StaticAddressBook::new(vec![UInt168::new(OWNED)])),
		SessionConfig::default(),
	)
	.unwrap()
}

fn entity_for(tx: &Transaction) -> TransactionEntity {
	let mut w = ByteWriter::new();
	tx.serialize(&mut w);
	TransactionEntity {
		raw: w.into_bytes(),
		block_height: tx.block_height,
		timestamp: tx.timestamp,
		tx_hash: tx.hash().to_hex(),
	}
}

fn transfer_tx(lock_time: u32) -> Transaction {
	let mut tx = Transaction::new(TxVersion::DEFAULT, TransactionPayload::TransferAsset);
	tx.outputs.push(TransactionOutput::new(
		500,
		UInt168::new([3; 21]),
		UInt256::new([0xaa; 32]),
		OutputType::Default,
	));
	tx.lock_time = lock_time;
	tx
}

fn coinbase_tx() -> Transaction {
	let mut tx = Transaction::new(
		TxVersion::DEFAULT,
		TransactionPayload::CoinBase { nonce: vec![1, 2, 3, 4] },
	);
	// Foundation and miner outputs first; the wallet's reward comes third.
	for recipient in [[1u8; 21], [2u8; 21]] {
		tx.outputs.push(TransactionOutput::new(
			100,
			UInt168::new(recipient),
			UInt256::new([0xaa; 32]),
			OutputType::Default,
		));
	}
	tx.outputs.push(TransactionOutput::new(
		5_000,
		UInt168::new(OWNED),
		UInt256::new([0xaa; 32]),
		OutputType::Default,
	));
	tx.block_height = 100;
	tx.timestamp = 1_600_000_000;
	tx
}

#[tokio::test]
async fn load_migrates_coinbase_transactions_to_utxo_records() {
	let storage = Arc::new(MemoryStorage::new());
	let cb = coinbase_tx();
	let cb_hash = cb.hash();

	let mut spender = transfer_tx(1);
	spender.inputs.push(TxInput {
		prev_hash: cb_hash,
		index: 2,
		sequence: 0,
	});
	let unrelated = transfer_tx(2);

	for tx in [&cb, &spender, &unrelated] {
		storage.put_transaction(entity_for(tx)).await.unwrap();
	}

	let pm = MockPeerManager::new(ConnectionState::Disconnected);
	let session = session_with(pm, storage.clone());

	let txs = session.load_transactions().await.unwrap();
	let hashes: Vec<_> = txs.iter().map(|t| t.hash()).collect();
	assert_eq!(txs.len(), 2);
	assert!(!hashes.contains(&cb_hash));

	// The coinbase became a UTXO record for the wallet's output.
	let utxos = storage.all_coin_bases().await.unwrap();
	assert_eq!(utxos.len(), 1);
	assert_eq!(utxos[0].tx_hash, cb_hash.to_hex());
	assert_eq!(utxos[0].output_index, 2);
	assert_eq!(utxos[0].amount, 5_000);
	assert_eq!(utxos[0].block_height, 100);
	assert!(utxos[0].spent, "spender's input must mark the reward spent");

	// And left the transaction store for good.
	assert_eq!(session.transaction_count().await.unwrap(), 2);
	let again = session.load_transactions().await.unwrap();
	assert_eq!(again.len(), 2);
	assert_eq!(storage.all_coin_bases().await.unwrap().len(), 1);
}

#[tokio::test]
async fn load_restores_height_and_timestamp() {
	let storage = Arc::new(MemoryStorage::new());
	let mut tx = transfer_tx(9);
	tx.block_height = 77;
	tx.timestamp = 1_650_000_000;
	storage.put_transaction(entity_for(&tx)).await.unwrap();

	let session = session_with(MockPeerManager::new(ConnectionState::Disconnected), storage);
	let txs = session.load_transactions().await.unwrap();
	assert_eq!(txs[0].block_height, 77);
	assert_eq!(txs[0].timestamp, 1_650_000_000);
}

#[tokio::test]
async fn load_skips_undecodable_transactions() {
	let storage = Arc::new(MemoryStorage::new());
	storage
		.put_transaction(TransactionEntity {
			raw: vec![0xff, 0x00],
			block_height: 1,
			timestamp: 1,
			tx_hash: "garbage".to_string(),
		})
		.await
		.unwrap();
	storage.put_transaction(entity_for(&transfer_tx(3))).await.unwrap();

	let session = session_with(MockPeerManager::new(ConnectionState::Disconnected), storage);
	let txs = session.load_transactions().await.unwrap();
	assert_eq!(txs.len(), 1);
}

#[tokio::test]
async fn publish_while_connected_publishes_directly() {
	let pm = MockPeerManager::new(ConnectionState::Connected);
	let session = session_with(pm.clone(), Arc::new(MemoryStorage::new()));

	session.publish_transaction(&transfer_tx(1)).await;

	assert_eq!(pm.calls(), vec!["publish"]);
}

#[tokio::test]
async fn publish_while_disconnected_reconnects_first() {
	let pm = MockPeerManager::new(ConnectionState::Disconnected);
	let session = session_with(pm.clone(), Arc::new(MemoryStorage::new()));

	session.publish_transaction(&transfer_tx(1)).await;

	assert_eq!(pm.calls(), vec!["disconnect", "connect", "publish"]);
	assert!(pm.auto_reconnect(), "auto-reconnect must be restored");
}

#[tokio::test(start_paused = true)]
async fn repeated_idle_notifications_collapse_into_one_reconnect_cycle() {
	let pm = MockPeerManager::new(ConnectionState::Connected);
	pm.set_auto_reconnect(true);
	let session = session_with(pm.clone(), Arc::new(MemoryStorage::new()));

	session.sync_inactive(Duration::from_secs(5)).await;
	session.sync_inactive(Duration::from_secs(5)).await;
	tokio::time::sleep(Duration::from_millis(10)).await;

	assert_eq!(pm.outstanding_reconnect_count(), 1);
	assert_eq!(pm.count("disconnect"), 1);
	assert_eq!(pm.count("async_connect"), 0);

	tokio::time::sleep(Duration::from_secs(6)).await;
	assert_eq!(pm.count("async_connect"), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_guard_respects_auto_reconnect_and_outstanding_count() {
	let pm = MockPeerManager::new(ConnectionState::Connected);
	pm.set_auto_reconnect(false);
	let session = session_with(pm.clone(), Arc::new(MemoryStorage::new()));

	session.sync_inactive(Duration::from_secs(5)).await;
	tokio::time::sleep(Duration::from_secs(10)).await;

	assert_eq!(pm.outstanding_reconnect_count(), 0);
	assert_eq!(pm.count("async_connect"), 0);
}

#[tokio::test(start_paused = true)]
async fn idle_cycle_seeds_peers_from_storage_when_empty() {
	let storage = Arc::new(MemoryStorage::new());
	storage
		.put_peers(vec![PeerEntity {
			address: "10.0.0.1".to_string(),
			port: 20866,
			timestamp: 42,
		}])
		.await
		.unwrap();

	let pm = MockPeerManager::new(ConnectionState::Disconnected);
	pm.set_auto_reconnect(true);
	let session = session_with(pm.clone(), storage);

	session.sync_inactive(Duration::from_secs(5)).await;
	tokio::time::sleep(Duration::from_millis(10)).await;

	assert_eq!(pm.count("set_peers"), 1);
	assert_eq!(pm.peers(), vec![PeerInfo::new("10.0.0.1".to_string(), 20866, 42)]);
}

#[tokio::test(start_paused = true)]
async fn reset_pushes_a_pending_deadline_out() {
	let pm = MockPeerManager::new(ConnectionState::Connected);
	pm.set_auto_reconnect(true);
	let session = session_with(pm.clone(), Arc::new(MemoryStorage::new()));

	session.sync_inactive(Duration::from_secs(5)).await;
	tokio::time::sleep(Duration::from_secs(3)).await;
	session.reset_reconnect().await;
	tokio::time::sleep(Duration::from_secs(5)).await;

	// The original 5s deadline has passed but the reset moved it out to the
	// configured 60s interval.
	assert_eq!(pm.count("async_connect"), 0);

	tokio::time::sleep(Duration::from_secs(60)).await;
	assert_eq!(pm.count("async_connect"), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_drains_the_actor_before_a_pending_timer_fires() {
	let pm = MockPeerManager::new(ConnectionState::Connected);
	pm.set_auto_reconnect(true);
	let session = session_with(pm.clone(), Arc::new(MemoryStorage::new()));

	session.sync_inactive(Duration::from_secs(5)).await;
	tokio::time::sleep(Duration::from_millis(10)).await;
	session.stop().await;
	tokio::time::sleep(Duration::from_secs(10)).await;

	assert_eq!(pm.count("async_connect"), 0);
	assert_eq!(pm.outstanding_reconnect_count(), 0);
	assert!(!pm.auto_reconnect());
}

struct RecordingWalletHandler {
	seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl WalletEventHandler for RecordingWalletHandler {
	async fn handle(&mut self, event: &WalletEvent) -> Result<(), SessionError> {
		let name = match event {
			WalletEvent::BalanceChanged { .. } => "balance_changed",
			WalletEvent::CoinBaseAdded { .. } => "coinbase_added",
			WalletEvent::TransactionAdded { .. } => "transaction_added",
			WalletEvent::TransactionDeleted { .. } => "transaction_deleted",
			_ => "other",
		};
		self.seen.lock().unwrap().push(name.to_string());
		Ok(())
	}

	fn name(&self) -> &'static str {
		"RecordingWalletHandler"
	}
}

struct ReachabilityHandler {
	reachable: bool,
}

#[async_trait::async_trait]
impl ChainEventHandler for ReachabilityHandler {
	async fn handle(&mut self, _event: &ChainEvent) -> Result<(), SessionError> {
		Ok(())
	}

	fn network_is_reachable(&self) -> Option<bool> {
		Some(self.reachable)
	}

	fn name(&self) -> &'static str {
		"ReachabilityHandler"
	}
}

#[tokio::test]
async fn events_are_persisted_then_fanned_out() {
	let storage = Arc::new(MemoryStorage::new());
	let session = session_with(
		MockPeerManager::new(ConnectionState::Connected),
		storage.clone(),
	);
	let seen = Arc::new(Mutex::new(Vec::new()));
	session
		.register_wallet_handler(Box::new(RecordingWalletHandler { seen: seen.clone() }))
		.await;

	let tx = transfer_tx(4);
	let hash = tx.hash().to_hex();
	session.on_transaction_added(tx).await;
	assert_eq!(session.transaction_count().await.unwrap(), 1);

	session.on_transaction_deleted(hash, true, false).await;
	assert_eq!(session.transaction_count().await.unwrap(), 0);

	session.balance_changed(UInt256::new([0xaa; 32]), 1u128 << 80).await;

	assert_eq!(
		*seen.lock().unwrap(),
		vec!["transaction_added", "transaction_deleted", "balance_changed"]
	);
}

#[tokio::test]
async fn coinbase_events_round_trip_through_storage() {
	let storage = Arc::new(MemoryStorage::new());
	let session = session_with(
		MockPeerManager::new(ConnectionState::Connected),
		storage.clone(),
	);

	let utxo = CoinBaseEntity {
		spent: false,
		tx_hash: "cb".to_string(),
		block_height: 0,
		timestamp: 0,
		amount: 1_000,
		output_lock: 0,
		asset_id: UInt256::new([0xaa; 32]),
		program_hash: UInt168::new(OWNED),
		output_index: 0,
		payload: None,
	};
	session.on_coinbase_added(utxo).await;
	session
		.on_coinbase_updated(vec!["cb".to_string()], 321, 1_700_000_000)
		.await;
	session.on_coinbase_spent(vec!["cb".to_string()]).await;

	let stored = session.load_coinbase_utxos().await.unwrap();
	assert_eq!(stored.len(), 1);
	assert_eq!(stored[0].block_height, 321);
	assert!(stored[0].spent);

	session.on_coinbase_deleted("cb".to_string(), true, true).await;
	assert!(session.load_coinbase_utxos().await.unwrap().is_empty());
}

#[tokio::test]
async fn reachability_is_an_or_across_handlers() {
	let session = session_with(
		MockPeerManager::new(ConnectionState::Connected),
		Arc::new(MemoryStorage::new()),
	);
	assert!(session.network_is_reachable().await);

	session
		.register_chain_handler(Box::new(ReachabilityHandler { reachable: false }))
		.await;
	assert!(!session.network_is_reachable().await);

	session
		.register_chain_handler(Box::new(ReachabilityHandler { reachable: true }))
		.await;
	assert!(session.network_is_reachable().await);
}
