//! Application service over the registry repository.
//!
//! Builds domain records from caller input. It allocates ids and stamps
//! timestamps, and parses the raw name into an `EntityName` only because the
//! record cannot be constructed without one. Uniqueness, soft delete and the
//! post-commit work belong to the repository, whose errors pass through
//! unchanged.

use std::sync::Arc;

use chrono::Utc;

use federation_core::{
    BankAccount, BankAccountDetails, BankAccountId, EntityName, LegalEntity, LegalEntityId,
};

use crate::repository::{Repository, RepositoryResult};
use crate::store::RegistryStore;

pub struct RegistryService<S> {
    repo: Arc<Repository<S>>,
}

impl<S> Clone for RegistryService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<S: RegistryStore> RegistryService<S> {
    pub fn new(repo: Repository<S>) -> Self {
        Self {
            repo: Arc::new(repo),
        }
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    pub async fn create_legal_entity(&self, name: &str) -> RepositoryResult<LegalEntity> {
        let name = EntityName::parse(name)?;
        let entity = LegalEntity::create(LegalEntityId::new(), name, Utc::now());
        self.repo.create_legal_entity(entity).await
    }

    pub async fn update_legal_entity(
        &self,
        id: LegalEntityId,
        name: &str,
    ) -> RepositoryResult<LegalEntity> {
        self.repo.update_legal_entity(id, name).await
    }

    pub async fn delete_legal_entity(&self, id: LegalEntityId) -> RepositoryResult<()> {
        self.repo.delete_legal_entity(id).await
    }

    pub async fn get_all_legal_entities(&self) -> RepositoryResult<Vec<LegalEntity>> {
        self.repo.get_all_legal_entities().await
    }

    pub async fn create_bank_account(
        &self,
        legal_entity_id: LegalEntityId,
        details: BankAccountDetails,
    ) -> RepositoryResult<BankAccount> {
        let account = BankAccount::create(
            BankAccountId::new(),
            legal_entity_id,
            details.normalized()?,
            Utc::now(),
        );
        self.repo.create_bank_account(account).await
    }

    pub async fn update_bank_account(
        &self,
        id: BankAccountId,
        details: BankAccountDetails,
    ) -> RepositoryResult<BankAccount> {
        self.repo.update_bank_account(id, details).await
    }

    pub async fn delete_bank_account(&self, id: BankAccountId) -> RepositoryResult<()> {
        self.repo.delete_bank_account(id).await
    }

    pub async fn get_all_bank_accounts(
        &self,
        legal_entity_id: LegalEntityId,
    ) -> RepositoryResult<Vec<BankAccount>> {
        self.repo.get_all_bank_accounts(legal_entity_id).await
    }
}
