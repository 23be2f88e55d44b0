//! Storage backend boundary for legal entities and bank accounts.
//!
//! A `RegistryStore` executes single, atomic statements against the two
//! tables. It knows nothing about notifications or hooks; the repository
//! layers those on top.
//!
//! ## Contract
//!
//! - Every read and every update/delete filters out soft-deleted rows.
//! - `insert_legal_entity` and `rename_legal_entity` must reject a name that
//!   another live entity already carries with `StoreError::UniqueViolation`,
//!   even under concurrent writers. This is the authoritative uniqueness guard.
//! - `soft_delete_legal_entity` soft-deletes the entity's live bank accounts
//!   in the same atomic step.
//! - `insert_bank_account` fails with `StoreError::OwnerNotFound` when the
//!   owning entity is missing or soft-deleted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use federation_core::{
    BankAccount, BankAccountDetails, BankAccountId, EntityName, LegalEntity, LegalEntityId,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRegistryStore;
pub use postgres::PostgresRegistryStore;

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A live legal entity already carries this name.
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    /// The referenced legal entity does not exist or is soft-deleted.
    #[error("owner legal entity {0} not found")]
    OwnerNotFound(LegalEntityId),

    /// Anything else the backend reported (connection loss, bad row, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Live entity with exactly this name, if any.
    async fn find_live_legal_entity_by_name(
        &self,
        name: &EntityName,
    ) -> Result<Option<LegalEntity>, StoreError>;

    async fn insert_legal_entity(&self, entity: &LegalEntity) -> Result<(), StoreError>;

    /// Rename a live entity. `Ok(None)` when no live row matched.
    async fn rename_legal_entity(
        &self,
        id: LegalEntityId,
        name: &EntityName,
        at: DateTime<Utc>,
    ) -> Result<Option<LegalEntity>, StoreError>;

    /// Soft-delete a live entity (and its live accounts). `Ok(false)` when no live row matched.
    async fn soft_delete_legal_entity(
        &self,
        id: LegalEntityId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn list_legal_entities(&self) -> Result<Vec<LegalEntity>, StoreError>;

    async fn insert_bank_account(&self, account: &BankAccount) -> Result<(), StoreError>;

    /// Replace the details of a live account. `Ok(None)` when no live row matched.
    async fn update_bank_account(
        &self,
        id: BankAccountId,
        details: &BankAccountDetails,
        at: DateTime<Utc>,
    ) -> Result<Option<BankAccount>, StoreError>;

    /// `Ok(false)` when no live row matched.
    async fn soft_delete_bank_account(
        &self,
        id: BankAccountId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn list_bank_accounts(
        &self,
        legal_entity_id: LegalEntityId,
    ) -> Result<Vec<BankAccount>, StoreError>;
}

#[async_trait]
impl<S> RegistryStore for Arc<S>
where
    S: RegistryStore + ?Sized,
{
    async fn find_live_legal_entity_by_name(
        &self,
        name: &EntityName,
    ) -> Result<Option<LegalEntity>, StoreError> {
        (**self).find_live_legal_entity_by_name(name).await
    }

    async fn insert_legal_entity(&self, entity: &LegalEntity) -> Result<(), StoreError> {
        (**self).insert_legal_entity(entity).await
    }

    async fn rename_legal_entity(
        &self,
        id: LegalEntityId,
        name: &EntityName,
        at: DateTime<Utc>,
    ) -> Result<Option<LegalEntity>, StoreError> {
        (**self).rename_legal_entity(id, name, at).await
    }

    async fn soft_delete_legal_entity(
        &self,
        id: LegalEntityId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        (**self).soft_delete_legal_entity(id, at).await
    }

    async fn list_legal_entities(&self) -> Result<Vec<LegalEntity>, StoreError> {
        (**self).list_legal_entities().await
    }

    async fn insert_bank_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        (**self).insert_bank_account(account).await
    }

    async fn update_bank_account(
        &self,
        id: BankAccountId,
        details: &BankAccountDetails,
        at: DateTime<Utc>,
    ) -> Result<Option<BankAccount>, StoreError> {
        (**self).update_bank_account(id, details, at).await
    }

    async fn soft_delete_bank_account(
        &self,
        id: BankAccountId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        (**self).soft_delete_bank_account(id, at).await
    }

    async fn list_bank_accounts(
        &self,
        legal_entity_id: LegalEntityId,
    ) -> Result<Vec<BankAccount>, StoreError> {
        (**self).list_bank_accounts(legal_entity_id).await
    }
}
