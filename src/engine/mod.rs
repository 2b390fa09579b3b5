/// Ledger engine for the STACKING prediction market
///
/// Every mutation runs as one transaction: read the working set with
/// versions, apply the operation to the snapshot, commit under version
/// guards. A conflicting concurrent writer aborts the commit and the whole
/// transaction re-runs against fresh reads, so each operation's effect is
/// applied exactly once no matter how calls interleave.

pub mod accounts;
pub mod comments;
pub mod markets;
pub mod settlement;
pub mod trading;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::LedgerError;
use crate::models::{Account, Comment, Market};
use crate::store::{Entity, EntityKey, EntityStore, StoreError, TxSnapshot};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Balance granted to every account on first connect
pub const STARTING_BALANCE: u64 = 100_000;

/// Paid to the author each time their comment gains a like
pub const LIKE_REWARD: u64 = 5;

/// Price a reader pays the author to reveal a blurred comment
pub const UNLOCK_COST: u64 = 100;

/// Like count at which a comment blurs
pub const BLUR_THRESHOLD: usize = 10;

/// Payout per winning contract at claim time
pub const PAYOUT_PER_CONTRACT: u64 = 100;

/// Re-run budget for version-conflicted transactions
const MAX_TXN_ATTEMPTS: u32 = 16;

// ============================================================================
// CHANGE FEED
// ============================================================================

/// Emitted after a committed transaction, one event per written entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ChangeEvent {
    Market { market: Market },
    Account { account: Account },
    Comment { comment: Comment },
}

impl ChangeEvent {
    fn from_entity(entity: &Entity) -> Self {
        match entity {
            Entity::Market(m) => ChangeEvent::Market { market: m.clone() },
            Entity::Account(a) => ChangeEvent::Account { account: a.clone() },
            Entity::Comment(c) => ChangeEvent::Comment { comment: c.clone() },
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct LedgerEngine {
    store: Arc<dyn EntityStore>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self { store, changes }
    }

    /// Live feed of committed entity snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        self.store.flush()?;
        Ok(())
    }

    /// Run one ledger transaction over the given working set.
    ///
    /// The body sees a snapshot with staged writes shadowing the loaded
    /// state. On a version conflict the body re-runs against fresh reads,
    /// up to `MAX_TXN_ATTEMPTS` times; the body must therefore re-derive
    /// every decision from the snapshot it is handed. Errors returned by
    /// the body abort the transaction without retrying.
    pub(crate) fn transact<T>(
        &self,
        keys: &[EntityKey],
        mut body: impl FnMut(&mut TxSnapshot) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut snap = TxSnapshot::load(self.store.as_ref(), keys)?;
            let value = body(&mut snap)?;
            let guards = snap.guards();
            let writes = snap.into_writes();
            match self.store.commit(&guards, &writes) {
                Ok(()) => {
                    for entity in &writes {
                        // Nobody listening is fine
                        let _ = self.changes.send(ChangeEvent::from_entity(entity));
                    }
                    return Ok(value);
                }
                Err(StoreError::Conflict) if attempts < MAX_TXN_ATTEMPTS => {
                    tracing::debug!("Transaction conflicted, retrying (attempt {})", attempts);
                    std::thread::yield_now();
                }
                Err(StoreError::Conflict) => {
                    return Err(LedgerError::Conflict(format!(
                        "gave up after {} attempts",
                        attempts
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
