//! The synchronization session: network lifecycle, event fan-out, reconnect
//! policy, and the persistence bridge between them.

pub mod events;
pub mod reconnect;
pub mod session;

pub use events::{
	ChainEvent, ChainEventDispatcher, ChainEventHandler, WalletEvent, WalletEventDispatcher,
	WalletEventHandler,
};
pub use reconnect::{ReconnectActor, ReconnectCommand};
pub use session::{SessionConfig, SpvSession};

/// Errors surfaced by the sync session and its event handlers.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error("storage error: {0}")]
	Storage(#[from] crate::store::StorageError),

	#[error("codec error: {0}")]
	Codec(#[from] crate::codec::CodecError),

	#[error("handler error: {0}")]
	Handler(String),

	#[error("no tokio runtime available: {0}")]
	Runtime(String),
}
