//! The consumed network capability.
//!
//! The peer-to-peer protocol itself (handshake, merkle-proof verification,
//! gossip) lives behind [`PeerManager`]; this crate only drives its lifecycle
//! and mirrors the state it reports. Connection-affecting calls from the
//! session and the reconnect machine are serialized per session, so
//! implementations only need internal consistency, not external locking.

use crate::chain::Transaction;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
}

/// A known peer. Persisted only as a reconnection hint, never authoritative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
	pub address: String,
	pub port: u16,
	pub timestamp: u64,
}

impl PeerInfo {
	pub fn new(address: String, port: u16, timestamp: u64) -> Self {
		Self {
			address,
			port,
			timestamp,
		}
	}

	pub fn host(&self) -> String {
		format!("{}:{}", self.address, self.port)
	}
}

/// Lifecycle and publish surface of the peer-network client.
///
/// `connect` and `async_connect` issue connection requests without waiting for
/// the connection to be established; completion is reported through the
/// session's event callbacks.
#[async_trait::async_trait]
pub trait PeerManager: Send + Sync {
	async fn connect(&self);
	async fn async_connect(&self);
	async fn disconnect(&self);

	fn set_auto_reconnect(&self, enabled: bool);
	fn auto_reconnect(&self) -> bool;

	fn set_outstanding_reconnect_count(&self, count: u32);
	fn outstanding_reconnect_count(&self) -> u32;

	fn connection_state(&self) -> ConnectionState;

	fn peers(&self) -> Vec<PeerInfo>;
	fn set_peers(&self, peers: Vec<PeerInfo>);

	async fn publish_transaction(&self, tx: &Transaction);
}
