//! Event system for the sync session.
//!
//! This module defines the event types, event handler traits, and the event
//! dispatchers used by [`SpvSession`](crate::sync::SpvSession). Events decouple
//! the persistence path from the consumers that react to wallet and chain
//! changes: the session persists first, then fans each event out to every
//! registered handler in registration order.

use crate::chain::{Asset, Transaction, UInt168, UInt256};
use crate::network::PeerInfo;
use crate::store::{CoinBaseEntity, MerkleBlockEntity, Nep5LogEntity};
use crate::sync::SessionError;

/// Events about the wallet's own holdings.
pub enum WalletEvent {
	/// The confirmed balance of an asset changed.
	BalanceChanged { asset_id: UInt256, balance: u128 },
	/// A coinbase output paying the wallet was recorded.
	CoinBaseAdded { utxo: CoinBaseEntity },
	/// Recorded coinbase outputs were confirmed at a new height.
	CoinBaseUpdated {
		tx_hashes: Vec<String>,
		block_height: u32,
		timestamp: u64,
	},
	/// Recorded coinbase outputs were consumed by later transactions.
	CoinBaseSpent { spent_hashes: Vec<String> },
	/// A recorded coinbase output was removed, usually by a reorg.
	CoinBaseDeleted {
		tx_hash: String,
		notify_user: bool,
		recommend_rescan: bool,
	},
	/// A relevant non-coinbase transaction entered the wallet.
	TransactionAdded { tx: Transaction },
	/// Known transactions were confirmed at a new height.
	TransactionUpdated {
		tx_hashes: Vec<String>,
		block_height: u32,
		timestamp: u64,
	},
	/// A known transaction was removed, usually by a reorg.
	TransactionDeleted {
		tx_hash: String,
		notify_user: bool,
		recommend_rescan: bool,
	},
	/// A new asset registration was observed on chain.
	AssetRegistered {
		asset: Asset,
		amount: u64,
		controller: UInt168,
	},
}

/// Events about the chain connection and sync progress.
pub enum ChainEvent {
	SyncStarted,
	SyncProgress {
		current_height: u32,
		estimated_height: u32,
		last_block_time: u64,
	},
	/// Sync halted; `error` is empty on a clean stop.
	SyncStopped { error: String },
	/// Mempool or confirmation status of tracked transactions changed.
	TxStatusUpdate,
	/// Merkle blocks were persisted. `replace` means the stored set was
	/// rebuilt from scratch rather than extended.
	BlocksSaved {
		replace: bool,
		blocks: Vec<MerkleBlockEntity>,
	},
	/// The known-peer list was persisted.
	PeersSaved { replace: bool, peers: Vec<PeerInfo> },
	/// A transaction publish attempt completed. `result` is the relay
	/// outcome reported by the network, empty on success.
	TxPublished { hash: String, result: String },
	/// A token-transfer log entry was persisted.
	Nep5LogSaved { log: Nep5LogEntity },
}

/// Trait for handling wallet events.
///
/// Implementors receive every wallet event dispatched by the session and can
/// perform side effects or state updates.
#[async_trait::async_trait]
pub trait WalletEventHandler: Send + Sync {
	async fn handle(&mut self, event: &WalletEvent) -> Result<(), SessionError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Trait for handling chain events.
#[async_trait::async_trait]
pub trait ChainEventHandler: Send + Sync {
	async fn handle(&mut self, event: &ChainEvent) -> Result<(), SessionError>;

	/// Whether this handler believes the network is reachable. `None` means
	/// the handler has no opinion and is left out of the vote.
	fn network_is_reachable(&self) -> Option<bool> {
		None
	}

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Dispatcher for wallet events.
///
/// Handlers are called in the order they are registered. Errors from handlers
/// are logged, but do not stop other handlers from running.
pub struct WalletEventDispatcher {
	handlers: Vec<Box<dyn WalletEventHandler>>,
}

impl WalletEventDispatcher {
	pub fn new() -> Self {
		Self {
			handlers: Vec::new(),
		}
	}

	pub fn register_handler(&mut self, handler: Box<dyn WalletEventHandler>) {
		self.handlers.push(handler);
	}

	pub async fn dispatch(&mut self, event: &WalletEvent) {
		for handler in &mut self.handlers {
			if let Err(e) = handler.handle(event).await {
				tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
				// Continue processing with other handlers
			}
		}
	}
}

impl Default for WalletEventDispatcher {
	fn default() -> Self {
		Self::new()
	}
}

/// Dispatcher for chain events.
pub struct ChainEventDispatcher {
	handlers: Vec<Box<dyn ChainEventHandler>>,
}

impl ChainEventDispatcher {
	pub fn new() -> Self {
		Self {
			handlers: Vec::new(),
		}
	}

	pub fn register_handler(&mut self, handler: Box<dyn ChainEventHandler>) {
		self.handlers.push(handler);
	}

	pub async fn dispatch(&mut self, event: &ChainEvent) {
		for handler in &mut self.handlers {
			if let Err(e) = handler.handle(event).await {
				tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
				// Continue processing with other handlers
			}
		}
	}

	/// OR of every handler that casts a vote. No handlers, or no votes,
	/// means the network is assumed reachable.
	pub fn network_is_reachable(&self) -> bool {
		let mut voted = false;
		let mut reachable = false;
		for handler in &self.handlers {
			if let Some(vote) = handler.network_is_reachable() {
				voted = true;
				reachable |= vote;
			}
		}
		!voted || reachable
	}
}

impl Default for ChainEventDispatcher {
	fn default() -> Self {
		Self::new()
	}
}
