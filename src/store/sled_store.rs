// Persistent store on sled: one tree, prefixed keys, JSON records

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Entity, EntityKey, EntityKind, EntityStore, StoreError, VersionedEntity};

/// On-disk record: the entity plus the version its next commit guards on
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    version: u64,
    entity: Entity,
}

pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { db })
    }

    /// Ephemeral database, removed when dropped. Used by tests.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { db })
    }

    fn decode(raw: &[u8]) -> Result<StoredRecord, StoreError> {
        serde_json::from_slice(raw).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn encode(record: &StoredRecord) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(record).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

impl EntityStore for SledStore {
    fn read_many(&self, keys: &[EntityKey]) -> Result<Vec<VersionedEntity>, StoreError> {
        keys.iter()
            .map(|key| {
                let raw = self
                    .db
                    .get(key.encode())
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                match raw {
                    Some(raw) => {
                        let record = Self::decode(&raw)?;
                        Ok(VersionedEntity {
                            version: record.version,
                            entity: Some(record.entity),
                        })
                    }
                    None => Ok(VersionedEntity {
                        version: 0,
                        entity: None,
                    }),
                }
            })
            .collect()
    }

    fn commit(&self, guards: &[(EntityKey, u64)], writes: &[Entity]) -> Result<(), StoreError> {
        // Encode up front; sled may run the transaction closure more than once.
        let mut encoded: Vec<(String, Vec<u8>)> = Vec::with_capacity(writes.len());
        for entity in writes {
            let key = entity.key();
            let expected = guards
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or_else(|| {
                    StoreError::Backend(format!("write without version guard: {}", key.encode()))
                })?;
            let record = StoredRecord {
                version: expected + 1,
                entity: entity.clone(),
            };
            encoded.push((key.encode(), Self::encode(&record)?));
        }

        let result: Result<(), sled::transaction::TransactionError<StoreError>> =
            self.db.transaction(|tx| {
                for (key, expected) in guards {
                    let current = match tx.get(key.encode())? {
                        Some(raw) => match Self::decode(&raw) {
                            Ok(record) => record.version,
                            Err(e) => return sled::transaction::abort(e),
                        },
                        None => 0,
                    };
                    if current != *expected {
                        return sled::transaction::abort(StoreError::Conflict);
                    }
                }
                for (key, raw) in &encoded {
                    tx.insert(key.as_str(), raw.clone())?;
                }
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(sled::transaction::TransactionError::Abort(e)) => Err(e),
            Err(sled::transaction::TransactionError::Storage(e)) => {
                Err(StoreError::Backend(e.to_string()))
            }
        }
    }

    fn get(&self, key: &EntityKey) -> Result<Option<Entity>, StoreError> {
        let raw = self
            .db
            .get(key.encode())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match raw {
            Some(raw) => Ok(Some(Self::decode(&raw)?.entity)),
            None => Ok(None),
        }
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, StoreError> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(kind.prefix()) {
            let (_, raw) = item.map_err(|e| StoreError::Backend(e.to_string()))?;
            out.push(Self::decode(&raw)?.entity);
        }
        Ok(out)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
