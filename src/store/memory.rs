// In-process store backed by a versioned hash map

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Entity, EntityKey, EntityKind, EntityStore, StoreError, VersionedEntity};

#[derive(Debug)]
struct Slot {
    version: u64,
    entity: Entity,
}

/// Non-persistent backend. Versions give it the same conflict detection as
/// the sled backend, so engine behavior is identical across the two.
pub struct MemoryStore {
    entries: RwLock<HashMap<EntityKey, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

impl EntityStore for MemoryStore {
    fn read_many(&self, keys: &[EntityKey]) -> Result<Vec<VersionedEntity>, StoreError> {
        let map = self.entries.read().map_err(|_| poisoned())?;
        Ok(keys
            .iter()
            .map(|key| match map.get(key) {
                Some(slot) => VersionedEntity {
                    version: slot.version,
                    entity: Some(slot.entity.clone()),
                },
                None => VersionedEntity {
                    version: 0,
                    entity: None,
                },
            })
            .collect())
    }

    fn commit(&self, guards: &[(EntityKey, u64)], writes: &[Entity]) -> Result<(), StoreError> {
        let mut map = self.entries.write().map_err(|_| poisoned())?;

        for (key, expected) in guards {
            let current = map.get(key).map(|s| s.version).unwrap_or(0);
            if current != *expected {
                return Err(StoreError::Conflict);
            }
        }

        for entity in writes {
            match map.get_mut(&entity.key()) {
                Some(slot) => {
                    slot.version += 1;
                    slot.entity = entity.clone();
                }
                None => {
                    map.insert(
                        entity.key(),
                        Slot {
                            version: 1,
                            entity: entity.clone(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn get(&self, key: &EntityKey) -> Result<Option<Entity>, StoreError> {
        let map = self.entries.read().map_err(|_| poisoned())?;
        Ok(map.get(key).map(|s| s.entity.clone()))
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, StoreError> {
        let map = self.entries.read().map_err(|_| poisoned())?;
        Ok(map
            .values()
            .filter(|slot| slot.entity.kind() == kind)
            .map(|slot| slot.entity.clone())
            .collect())
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
