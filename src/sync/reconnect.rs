//! Reconnect policy as a message-driven task.
//!
//! All reconnect decisions run inside one actor, so the check-then-act
//! sequences (the idle guard, peer seeding, timer arming) are serialized by
//! construction. The session talks to the actor through a channel and never
//! touches the timer directly.

use crate::network::{ConnectionState, PeerInfo, PeerManager};
use crate::store::WalletStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info};

/// Commands accepted by the reconnect actor.
#[derive(Debug)]
pub enum ReconnectCommand {
	/// Sync went quiet: run the idle guard and, if it passes, schedule a
	/// reconnect after `delay`.
	SyncInactive { delay: Duration },
	/// Push a pending reconnect deadline out by the configured interval.
	Reset,
	/// Drop any pending reconnect deadline.
	Cancel,
	/// Shut the actor down.
	Stop,
}

pub struct ReconnectActor {
	peer_manager: Arc<dyn PeerManager>,
	storage: Arc<dyn WalletStorage>,
	reconnect_interval: Duration,
	rx: mpsc::Receiver<ReconnectCommand>,
}

impl ReconnectActor {
	/// Spawn the actor on the current runtime.
	pub fn spawn(
		peer_manager: Arc<dyn PeerManager>,
		storage: Arc<dyn WalletStorage>,
		reconnect_interval: Duration,
	) -> (mpsc::Sender<ReconnectCommand>, JoinHandle<()>) {
		let (tx, rx) = mpsc::channel(16);
		let actor = Self {
			peer_manager,
			storage,
			reconnect_interval,
			rx,
		};
		let handle = tokio::spawn(actor.run());
		(tx, handle)
	}

	async fn run(mut self) {
		let mut deadline: Option<Instant> = None;

		loop {
			tokio::select! {
				command = self.rx.recv() => match command {
					Some(ReconnectCommand::SyncInactive { delay }) => {
						self.handle_sync_inactive(delay, &mut deadline).await;
					}
					Some(ReconnectCommand::Reset) => {
						if deadline.is_some() {
							deadline = Some(Instant::now() + self.reconnect_interval);
						}
					}
					Some(ReconnectCommand::Cancel) => {
						deadline = None;
					}
					Some(ReconnectCommand::Stop) | None => break,
				},
				_ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
						if deadline.is_some() => {
					deadline = None;
					info!("reconnect timer fired, reconnecting");
					self.peer_manager.async_connect().await;
				}
			}
		}
	}

	/// The idle guard and the disconnect-reseed-rearm transition.
	///
	/// Fires only when auto-reconnect is enabled and no reconnect is already
	/// outstanding, so repeated idle notifications collapse into one cycle.
	async fn handle_sync_inactive(&self, delay: Duration, deadline: &mut Option<Instant>) {
		let pm = &self.peer_manager;
		if !pm.auto_reconnect() || pm.outstanding_reconnect_count() != 0 {
			return;
		}

		info!(delay_secs = delay.as_secs(), "sync inactive, scheduling reconnect");
		*deadline = None;
		pm.set_outstanding_reconnect_count(pm.outstanding_reconnect_count() + 1);

		// Disconnect without letting the peer manager's own auto-reconnect
		// race the timer we are about to arm.
		pm.set_auto_reconnect(false);
		if pm.connection_state() == ConnectionState::Connected {
			pm.disconnect().await;
		}
		pm.set_auto_reconnect(true);

		if pm.peers().is_empty() {
			self.seed_peers_from_storage().await;
		}

		*deadline = Some(Instant::now() + delay);
	}

	async fn seed_peers_from_storage(&self) {
		match self.storage.all_peers().await {
			Ok(peers) if !peers.is_empty() => {
				info!(count = peers.len(), "seeding peer manager from stored peers");
				let peers = peers
					.into_iter()
					.map(|p| PeerInfo::new(p.address, p.port, p.timestamp))
					.collect();
				self.peer_manager.set_peers(peers);
			}
			Ok(_) => {}
			Err(e) => error!("failed to load stored peers: {}", e),
		}
	}
}
