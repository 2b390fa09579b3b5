// Ledger store: versioned entities with atomic multi-key commit

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::LedgerError;
use crate::models::{Account, Comment, Market};

// ============================================================================
// KEYS & RECORDS
// ============================================================================

/// Addresses one entity in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Market(String),
    Account(String),
    Comment(String),
}

impl EntityKey {
    /// Stable text encoding, also used as the on-disk key
    pub fn encode(&self) -> String {
        match self {
            EntityKey::Market(id) => format!("market/{}", id),
            EntityKey::Account(id) => format!("account/{}", id),
            EntityKey::Comment(id) => format!("comment/{}", id),
        }
    }
}

/// Entity kinds, used for listing scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Market,
    Account,
    Comment,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Market => "market/",
            EntityKind::Account => "account/",
            EntityKind::Comment => "comment/",
        }
    }
}

/// One stored entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entity {
    Market(Market),
    Account(Account),
    Comment(Comment),
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        match self {
            Entity::Market(m) => EntityKey::Market(m.id.clone()),
            Entity::Account(a) => EntityKey::Account(a.user_id.clone()),
            Entity::Comment(c) => EntityKey::Comment(c.id.clone()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Market(_) => EntityKind::Market,
            Entity::Account(_) => EntityKind::Account,
            Entity::Comment(_) => EntityKind::Comment,
        }
    }
}

/// Version paired with the current value; version 0 means absent
#[derive(Debug, Clone)]
pub struct VersionedEntity {
    pub version: u64,
    pub entity: Option<Entity>,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone)]
pub enum StoreError {
    /// A guarded version moved underneath the commit
    Conflict,
    Backend(String),
    Codec(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict => write!(f, "conflicting concurrent write"),
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
            StoreError::Codec(msg) => write!(f, "store codec error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Keyed persistence with optimistic multi-entity commit.
///
/// `read_many` returns each requested entity with the version a later
/// `commit` must guard on; `commit` applies all writes only if every guard
/// still matches and fails with `Conflict` otherwise. Point reads and scans
/// observe the latest committed state and never block writers beyond the
/// map access itself.
pub trait EntityStore: Send + Sync {
    fn read_many(&self, keys: &[EntityKey]) -> Result<Vec<VersionedEntity>, StoreError>;

    fn commit(&self, guards: &[(EntityKey, u64)], writes: &[Entity]) -> Result<(), StoreError>;

    fn get(&self, key: &EntityKey) -> Result<Option<Entity>, StoreError>;

    fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, StoreError>;

    fn flush(&self) -> Result<(), StoreError>;
}

// ============================================================================
// TRANSACTION SNAPSHOT
// ============================================================================

/// Working set of one transaction: the versions it read and the writes it
/// staged. Staged writes shadow the loaded snapshot for reads inside the
/// same transaction body.
pub struct TxSnapshot {
    entries: HashMap<EntityKey, VersionedEntity>,
    writes: Vec<Entity>,
}

impl TxSnapshot {
    pub fn load(store: &dyn EntityStore, keys: &[EntityKey]) -> Result<Self, StoreError> {
        let versioned = store.read_many(keys)?;
        let mut entries = HashMap::with_capacity(keys.len());
        for (key, v) in keys.iter().zip(versioned) {
            entries.insert(key.clone(), v);
        }
        Ok(Self {
            entries,
            writes: Vec::new(),
        })
    }

    /// Every key this transaction read, with the version it saw
    pub fn guards(&self) -> Vec<(EntityKey, u64)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.version))
            .collect()
    }

    pub fn writes(&self) -> &[Entity] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Entity> {
        self.writes
    }

    /// Stage a write, replacing any earlier staged write for the same key
    pub fn put(&mut self, entity: Entity) {
        let key = entity.key();
        if let Some(existing) = self.writes.iter_mut().find(|w| w.key() == key) {
            *existing = entity;
        } else {
            self.writes.push(entity);
        }
    }

    fn lookup(&self, key: &EntityKey) -> Option<&Entity> {
        if let Some(w) = self.writes.iter().find(|w| w.key() == *key) {
            return Some(w);
        }
        self.entries.get(key).and_then(|v| v.entity.as_ref())
    }

    pub fn market(&self, id: &str) -> Result<Market, LedgerError> {
        match self.lookup(&EntityKey::Market(id.to_string())) {
            Some(Entity::Market(m)) => Ok(m.clone()),
            _ => Err(LedgerError::MarketNotFound(id.to_string())),
        }
    }

    pub fn account(&self, user_id: &str) -> Result<Account, LedgerError> {
        match self.lookup(&EntityKey::Account(user_id.to_string())) {
            Some(Entity::Account(a)) => Ok(a.clone()),
            _ => Err(LedgerError::AccountNotFound(user_id.to_string())),
        }
    }

    pub fn account_opt(&self, user_id: &str) -> Option<Account> {
        match self.lookup(&EntityKey::Account(user_id.to_string())) {
            Some(Entity::Account(a)) => Some(a.clone()),
            _ => None,
        }
    }

    pub fn comment(&self, id: &str) -> Result<Comment, LedgerError> {
        match self.lookup(&EntityKey::Comment(id.to_string())) {
            Some(Entity::Comment(c)) => Ok(c.clone()),
            _ => Err(LedgerError::CommentNotFound(id.to_string())),
        }
    }

    pub fn put_market(&mut self, market: Market) {
        self.put(Entity::Market(market));
    }

    pub fn put_account(&mut self, account: Account) {
        self.put(Entity::Account(account));
    }

    pub fn put_comment(&mut self, comment: Comment) {
        self.put(Entity::Comment(comment));
    }
}
