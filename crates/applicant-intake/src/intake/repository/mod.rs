//! Storage-agnostic repository contract.
//!
//! A [`Store`] hands out per-request sessions; each session implements
//! [`Repository`] for one entity type. Engines plug in by implementing both
//! traits; [`MemoryStore`] is the in-process adapter.

mod filter;
mod memory;

use std::fmt::{Debug, Display};
use std::hash::Hash;

use async_trait::async_trait;

pub use filter::{Condition, Filter, QueryResults};
pub use memory::{MemorySession, MemoryStore};

use super::domain::FieldValue;
use super::ErrorCode;

/// Version assigned to an entity when it is first added.
pub const INITIAL_VERSION: u64 = 1;

/// Entity persisted through a repository.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Name used in error messages and logs.
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
    /// Queryable field lookup used by [`Filter`].
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// CRUD and query contract over a single entity type.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Persist a new entity at [`INITIAL_VERSION`]. Fails with `Conflict` when
    /// the identifier is taken.
    async fn add(&self, entity: E) -> Result<E::Id, RepositoryError>;

    async fn get(&self, id: &E::Id) -> Result<E, RepositoryError>;

    /// Replace a stored entity. `entity.version()` must match the stored
    /// version; the stored copy (with its new version) is returned.
    async fn update(&self, id: &E::Id, entity: E) -> Result<E, RepositoryError>;

    async fn delete(&self, id: &E::Id) -> Result<(), RepositoryError>;

    /// Lazily evaluated, finite result set. Each call starts a fresh sequence.
    async fn query(&self, filter: &Filter) -> Result<QueryResults<E>, RepositoryError>;
}

/// Backing store able to open request-scoped repository sessions.
///
/// Dropping the session releases whatever the engine acquired for it.
pub trait Store<E: Entity>: Send + Sync + 'static {
    type Session: Repository<E>;

    fn open_session(&self) -> Result<Self::Session, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {id} conflicts with stored state: {reason}")]
    Conflict {
        entity: &'static str,
        id: String,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub(crate) fn not_found<E: Entity>(id: &E::Id) -> Self {
        Self::NotFound {
            entity: E::KIND,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict<E: Entity>(id: &E::Id, reason: impl Into<String>) -> Self {
        Self::Conflict {
            entity: E::KIND,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RepositoryError::NotFound { .. } => ErrorCode::NotFound,
            RepositoryError::Conflict { .. } => ErrorCode::Conflict,
            RepositoryError::Unavailable(_) => ErrorCode::StoreUnavailable,
        }
    }
}
