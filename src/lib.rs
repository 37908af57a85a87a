//! SPV wallet synchronization and persistence bridge.
//!
//! This crate sits between a peer-network client and a wallet: it decodes the
//! chain's wire formats, persists what the network reports, fans events out to
//! registered handlers, and replays the persisted state on restart. The
//! network protocol itself lives behind the [`network::PeerManager`] trait;
//! storage lives behind [`store::WalletStorage`].

pub mod account;
pub mod chain;
pub mod codec;
pub mod network;
pub mod store;
pub mod sync;

pub use account::{AddressBook, StaticAddressBook};
pub use chain::{
	Asset, OutputPayload, OutputType, PayloadMismatch, Transaction, TransactionOutput,
	TransactionPayload, TxInput, TxType, TxVersion, UInt168, UInt256, VoteContent,
};
pub use network::{ConnectionState, PeerInfo, PeerManager};
pub use store::{
	AssetEntity, CoinBaseEntity, FileStorage, MemoryStorage, MerkleBlockEntity, Nep5LogEntity,
	PeerEntity, StorageError, TransactionEntity, WalletStorage,
};
pub use sync::{
	ChainEvent, ChainEventDispatcher, ChainEventHandler, SessionConfig, SessionError, SpvSession,
	WalletEvent, WalletEventDispatcher, WalletEventHandler,
};
