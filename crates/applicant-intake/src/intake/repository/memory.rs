use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{
    Entity, Filter, QueryResults, Repository, RepositoryError, Store, INITIAL_VERSION,
};

/// Arena of entity slots plus an identifier index into it.
struct Table<E: Entity> {
    slots: Vec<Option<E>>,
    index: HashMap<E::Id, usize>,
    vacant: Vec<usize>,
}

impl<E: Entity> Table<E> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            vacant: Vec::new(),
        }
    }

    fn get(&self, id: &E::Id) -> Option<&E> {
        self.index
            .get(id)
            .and_then(|slot| self.slots.get(*slot))
            .and_then(Option::as_ref)
    }

    fn insert(&mut self, entity: E) {
        let id = entity.id().clone();
        let slot = match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entity);
                slot
            }
            None => {
                self.slots.push(Some(entity));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
    }

    fn replace(&mut self, id: &E::Id, entity: E) -> bool {
        match self.index.get(id) {
            Some(slot) => {
                self.slots[*slot] = Some(entity);
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: &E::Id) -> bool {
        match self.index.remove(id) {
            Some(slot) => {
                self.slots[slot] = None;
                self.vacant.push(slot);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Vec<E> {
        self.slots.iter().flatten().cloned().collect()
    }
}

struct Shared<E: Entity> {
    name: String,
    table: RwLock<Table<E>>,
    online: AtomicBool,
    open_sessions: AtomicUsize,
}

impl<E: Entity> Shared<E> {
    fn ensure_online(&self) -> Result<(), RepositoryError> {
        if self.online.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable(format!(
                "memory store '{}' is offline",
                self.name
            )))
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table<E>>, RepositoryError> {
        self.ensure_online()?;
        self.table
            .read()
            .map_err(|_| RepositoryError::Unavailable(format!("{} table poisoned", E::KIND)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table<E>>, RepositoryError> {
        self.ensure_online()?;
        self.table
            .write()
            .map_err(|_| RepositoryError::Unavailable(format!("{} table poisoned", E::KIND)))
    }
}

/// In-process store. Clones share the same table.
pub struct MemoryStore<E: Entity> {
    shared: Arc<Shared<E>>,
}

impl<E: Entity> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                table: RwLock::new(Table::new()),
                online: AtomicBool::new(true),
                open_sessions: AtomicUsize::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Simulate an outage: while offline every session operation fails with
    /// `Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.shared.online.store(online, Ordering::Release);
    }

    /// Sessions opened and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.shared
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity> Store<E> for MemoryStore<E> {
    type Session = MemorySession<E>;

    fn open_session(&self) -> Result<MemorySession<E>, RepositoryError> {
        self.shared.ensure_online()?;
        let open = self.shared.open_sessions.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(store = %self.shared.name, open, "repository session opened");
        Ok(MemorySession {
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Request-scoped handle on a [`MemoryStore`]; released on drop.
pub struct MemorySession<E: Entity> {
    shared: Arc<Shared<E>>,
}

impl<E: Entity> Drop for MemorySession<E> {
    fn drop(&mut self) {
        let open = self
            .shared
            .open_sessions
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        debug!(store = %self.shared.name, open, "repository session released");
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemorySession<E> {
    async fn add(&self, mut entity: E) -> Result<E::Id, RepositoryError> {
        let mut table = self.shared.write()?;
        let id = entity.id().clone();
        if table.index.contains_key(&id) {
            return Err(RepositoryError::conflict::<E>(
                &id,
                "identifier already exists",
            ));
        }
        entity.set_version(INITIAL_VERSION);
        table.insert(entity);
        Ok(id)
    }

    async fn get(&self, id: &E::Id) -> Result<E, RepositoryError> {
        let table = self.shared.read()?;
        table
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found::<E>(id))
    }

    async fn update(&self, id: &E::Id, mut entity: E) -> Result<E, RepositoryError> {
        if entity.id() != id {
            return Err(RepositoryError::conflict::<E>(
                id,
                format!("payload carries identifier {}", entity.id()),
            ));
        }

        let mut table = self.shared.write()?;
        let stored_version = table
            .get(id)
            .map(E::version)
            .ok_or_else(|| RepositoryError::not_found::<E>(id))?;
        if stored_version != entity.version() {
            return Err(RepositoryError::conflict::<E>(
                id,
                format!(
                    "stale version {} (stored {stored_version})",
                    entity.version()
                ),
            ));
        }

        entity.set_version(stored_version + 1);
        table.replace(id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &E::Id) -> Result<(), RepositoryError> {
        let mut table = self.shared.write()?;
        if table.remove(id) {
            Ok(())
        } else {
            Err(RepositoryError::not_found::<E>(id))
        }
    }

    async fn query(&self, filter: &Filter) -> Result<QueryResults<E>, RepositoryError> {
        let table = self.shared.read()?;
        Ok(QueryResults::new(table.snapshot(), filter.clone()))
    }
}
