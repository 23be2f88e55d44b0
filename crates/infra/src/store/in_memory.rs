use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use federation_core::{
    BankAccount, BankAccountDetails, BankAccountId, EntityName, LegalEntity, LegalEntityId,
};

use super::{RegistryStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    legal_entities: BTreeMap<LegalEntityId, LegalEntity>,
    bank_accounts: BTreeMap<BankAccountId, BankAccount>,
}

impl Tables {
    fn live_name_taken(&self, name: &str, except: Option<LegalEntityId>) -> bool {
        self.legal_entities
            .values()
            .any(|e| e.deleted_at.is_none() && e.name == name && Some(e.uuid) != except)
    }

    fn live_entity_mut(&mut self, id: LegalEntityId) -> Option<&mut LegalEntity> {
        self.legal_entities
            .get_mut(&id)
            .filter(|e| e.deleted_at.is_none())
    }

    fn live_account_mut(&mut self, id: BankAccountId) -> Option<&mut BankAccount> {
        self.bank_accounts
            .get_mut(&id)
            .filter(|a| a.deleted_at.is_none())
    }
}

/// In-memory registry storage for tests/dev.
///
/// All writes run under a single write lock, so check-and-insert is atomic and
/// the live-name uniqueness rule holds under concurrent callers just like the
/// partial unique index in Postgres. Rows come back in id order (UUIDv7, so
/// roughly creation order).
#[derive(Debug, Default)]
pub struct InMemoryRegistryStore {
    tables: RwLock<Tables>,
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every legal entity row, soft-deleted ones included.
    pub fn all_legal_entity_rows(&self) -> Vec<LegalEntity> {
        let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        tables.legal_entities.values().cloned().collect()
    }

    /// Every bank account row, soft-deleted ones included.
    pub fn all_bank_account_rows(&self) -> Vec<BankAccount> {
        let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        tables.bank_accounts.values().cloned().collect()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn find_live_legal_entity_by_name(
        &self,
        name: &EntityName,
    ) -> Result<Option<LegalEntity>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .legal_entities
            .values()
            .find(|e| e.deleted_at.is_none() && e.name == name.as_str())
            .cloned())
    }

    async fn insert_legal_entity(&self, entity: &LegalEntity) -> Result<(), StoreError> {
        let mut tables = self.write()?;

        if tables.legal_entities.contains_key(&entity.uuid) {
            return Err(StoreError::Backend(format!(
                "legal entity {} already exists",
                entity.uuid
            )));
        }
        if entity.deleted_at.is_none() && tables.live_name_taken(&entity.name, None) {
            return Err(StoreError::UniqueViolation(entity.name.clone()));
        }

        tables.legal_entities.insert(entity.uuid, entity.clone());
        Ok(())
    }

    async fn rename_legal_entity(
        &self,
        id: LegalEntityId,
        name: &EntityName,
        at: DateTime<Utc>,
    ) -> Result<Option<LegalEntity>, StoreError> {
        let mut tables = self.write()?;

        if tables.live_entity_mut(id).is_none() {
            return Ok(None);
        }
        if tables.live_name_taken(name.as_str(), Some(id)) {
            return Err(StoreError::UniqueViolation(name.as_str().to_string()));
        }

        let entity = match tables.live_entity_mut(id) {
            Some(e) => e,
            None => return Ok(None),
        };
        entity.rename(name.clone(), at);
        Ok(Some(entity.clone()))
    }

    async fn soft_delete_legal_entity(
        &self,
        id: LegalEntityId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;

        match tables.live_entity_mut(id) {
            Some(entity) => entity.mark_deleted(at),
            None => return Ok(false),
        }

        for account in tables
            .bank_accounts
            .values_mut()
            .filter(|a| a.legal_entity_id == id && a.deleted_at.is_none())
        {
            account.mark_deleted(at);
        }

        Ok(true)
    }

    async fn list_legal_entities(&self) -> Result<Vec<LegalEntity>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .legal_entities
            .values()
            .filter(|e| e.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn insert_bank_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        let mut tables = self.write()?;

        if tables.live_entity_mut(account.legal_entity_id).is_none() {
            return Err(StoreError::OwnerNotFound(account.legal_entity_id));
        }
        if tables.bank_accounts.contains_key(&account.id) {
            return Err(StoreError::Backend(format!(
                "bank account {} already exists",
                account.id
            )));
        }

        tables.bank_accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_bank_account(
        &self,
        id: BankAccountId,
        details: &BankAccountDetails,
        at: DateTime<Utc>,
    ) -> Result<Option<BankAccount>, StoreError> {
        let mut tables = self.write()?;

        Ok(tables.live_account_mut(id).map(|account| {
            account.replace_details(details.clone(), at);
            account.clone()
        }))
    }

    async fn soft_delete_bank_account(
        &self,
        id: BankAccountId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;

        match tables.live_account_mut(id) {
            Some(account) => {
                account.mark_deleted(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_bank_accounts(
        &self,
        legal_entity_id: LegalEntityId,
    ) -> Result<Vec<BankAccount>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .bank_accounts
            .values()
            .filter(|a| a.legal_entity_id == legal_entity_id && a.deleted_at.is_none())
            .cloned()
            .collect())
    }
}
