//! Postgres-backed registry storage.
//!
//! ## Uniqueness
//!
//! The partial unique index `legal_entities_live_name_key` (see
//! `sql/schema.sql`) guarantees at most one live entity per name. Two
//! concurrent inserts of the same name cannot both commit; the loser gets a
//! `23505` which is mapped to `StoreError::UniqueViolation`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation on the live-name index) | `23505` | `UniqueViolation` |
//! | Database (foreign key violation on `legal_entity_id`) | `23503` | `Backend` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / Tls / ... | N/A | `Backend` |
//!
//! ## Transactions
//!
//! Single-row writes rely on per-statement atomicity. The cascade soft delete
//! and the owner check for new bank accounts run in explicit transactions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use federation_core::{
    BankAccount, BankAccountDetails, BankAccountId, EntityName, LegalEntity, LegalEntityId,
};

use super::{RegistryStore, StoreError};

/// Idempotent DDL for both tables and their indexes.
pub const SCHEMA: &str = include_str!("../../sql/schema.sql");

const LIVE_NAME_INDEX: &str = "legal_entities_live_name_key";

const LEGAL_ENTITY_COLUMNS: &str = "uuid, name, created_at, updated_at, deleted_at";

const BANK_ACCOUNT_COLUMNS: &str = "id, legal_entity_id, bik, bank_name, address, corr_account, \
     account_number, currency, comment, created_at, updated_at, deleted_at";

/// Postgres-backed `RegistryStore`.
///
/// Cheap to clone; shares one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresRegistryStore {
    pool: Arc<PgPool>,
}

impl PostgresRegistryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables and indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for PostgresRegistryStore {
    #[instrument(skip(self, name), fields(name = %name), err)]
    async fn find_live_legal_entity_by_name(
        &self,
        name: &EntityName,
    ) -> Result<Option<LegalEntity>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {LEGAL_ENTITY_COLUMNS} FROM legal_entities \
             WHERE name = $1 AND deleted_at IS NULL LIMIT 1"
        ))
        .bind(name.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_live_legal_entity_by_name", e))?;

        row.map(|r| legal_entity_from_row(&r)).transpose()
    }

    #[instrument(skip(self, entity), fields(uuid = %entity.uuid), err)]
    async fn insert_legal_entity(&self, entity: &LegalEntity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO legal_entities (uuid, name, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entity.uuid.as_uuid())
        .bind(&entity.name)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .bind(entity.deleted_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_live_name_violation(&e) {
                StoreError::UniqueViolation(entity.name.clone())
            } else {
                map_sqlx_error("insert_legal_entity", e)
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self, id, name), fields(uuid = %id, name = %name), err)]
    async fn rename_legal_entity(
        &self,
        id: LegalEntityId,
        name: &EntityName,
        at: DateTime<Utc>,
    ) -> Result<Option<LegalEntity>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE legal_entities SET name = $2, updated_at = $3 \
             WHERE uuid = $1 AND deleted_at IS NULL \
             RETURNING {LEGAL_ENTITY_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(name.as_str())
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| {
            if is_live_name_violation(&e) {
                StoreError::UniqueViolation(name.as_str().to_string())
            } else {
                map_sqlx_error("rename_legal_entity", e)
            }
        })?;

        row.map(|r| legal_entity_from_row(&r)).transpose()
    }

    #[instrument(skip(self, id), fields(uuid = %id), err)]
    async fn soft_delete_legal_entity(
        &self,
        id: LegalEntityId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let deleted = sqlx::query(
            r#"
            UPDATE legal_entities
            SET deleted_at = $2, updated_at = $2
            WHERE uuid = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("soft_delete_legal_entity", e))?;

        if deleted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(false);
        }

        let cascaded = sqlx::query(
            r#"
            UPDATE bank_accounts
            SET deleted_at = $2, updated_at = $2
            WHERE legal_entity_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("cascade_bank_accounts", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::debug!(cascaded = cascaded.rows_affected(), "bank accounts soft-deleted with owner");
        Ok(true)
    }

    #[instrument(skip(self), err)]
    async fn list_legal_entities(&self) -> Result<Vec<LegalEntity>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {LEGAL_ENTITY_COLUMNS} FROM legal_entities \
             WHERE deleted_at IS NULL ORDER BY created_at ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_legal_entities", e))?;

        rows.iter().map(legal_entity_from_row).collect()
    }

    #[instrument(
        skip(self, account),
        fields(id = %account.id, legal_entity_id = %account.legal_entity_id),
        err
    )]
    async fn insert_bank_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock the owner row so a concurrent soft delete either runs before us
        // (and we see no live owner) or after us (and cascades over this row).
        let owner = sqlx::query(
            "SELECT uuid FROM legal_entities WHERE uuid = $1 AND deleted_at IS NULL FOR SHARE",
        )
        .bind(account.legal_entity_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_owner", e))?;

        if owner.is_none() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::OwnerNotFound(account.legal_entity_id));
        }

        let d = &account.details;
        sqlx::query(
            r#"
            INSERT INTO bank_accounts (
                id,
                legal_entity_id,
                bik,
                bank_name,
                address,
                corr_account,
                account_number,
                currency,
                comment,
                created_at,
                updated_at,
                deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.legal_entity_id.as_uuid())
        .bind(&d.bik)
        .bind(&d.bank_name)
        .bind(&d.address)
        .bind(&d.corr_account)
        .bind(&d.account_number)
        .bind(&d.currency)
        .bind(&d.comment)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_bank_account", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(())
    }

    #[instrument(skip(self, id, details), fields(id = %id), err)]
    async fn update_bank_account(
        &self,
        id: BankAccountId,
        details: &BankAccountDetails,
        at: DateTime<Utc>,
    ) -> Result<Option<BankAccount>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE bank_accounts SET \
                 bik = $2, bank_name = $3, address = $4, corr_account = $5, \
                 account_number = $6, currency = $7, comment = $8, updated_at = $9 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {BANK_ACCOUNT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&details.bik)
        .bind(&details.bank_name)
        .bind(&details.address)
        .bind(&details.corr_account)
        .bind(&details.account_number)
        .bind(&details.currency)
        .bind(&details.comment)
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_bank_account", e))?;

        row.map(|r| bank_account_from_row(&r)).transpose()
    }

    #[instrument(skip(self, id), fields(id = %id), err)]
    async fn soft_delete_bank_account(
        &self,
        id: BankAccountId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE bank_accounts
            SET deleted_at = $2, updated_at = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("soft_delete_bank_account", e))?;

        Ok(res.rows_affected() > 0)
    }

    #[instrument(skip(self, legal_entity_id), fields(legal_entity_id = %legal_entity_id), err)]
    async fn list_bank_accounts(
        &self,
        legal_entity_id: LegalEntityId,
    ) -> Result<Vec<BankAccount>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BANK_ACCOUNT_COLUMNS} FROM bank_accounts \
             WHERE legal_entity_id = $1 AND deleted_at IS NULL ORDER BY created_at ASC"
        ))
        .bind(legal_entity_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_bank_accounts", e))?;

        rows.iter().map(bank_account_from_row).collect()
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            // Live-name violations are recognised by the callers, which know the name.
            StoreError::Backend(format!(
                "database error in {} ({}): {}",
                operation,
                db_err.code().as_deref().unwrap_or("no code"),
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Unique violation raised by the live-name index (not the primary key).
fn is_live_name_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(LIVE_NAME_INDEX);
    }
    false
}

// SQLx row types

#[derive(Debug)]
struct LegalEntityRow {
    uuid: uuid::Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for LegalEntityRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(LegalEntityRow {
            uuid: row.try_get("uuid")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl From<LegalEntityRow> for LegalEntity {
    fn from(row: LegalEntityRow) -> Self {
        LegalEntity {
            uuid: LegalEntityId::from_uuid(row.uuid),
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug)]
struct BankAccountRow {
    id: uuid::Uuid,
    legal_entity_id: uuid::Uuid,
    bik: String,
    bank_name: Option<String>,
    address: Option<String>,
    corr_account: Option<String>,
    account_number: String,
    currency: Option<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for BankAccountRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(BankAccountRow {
            id: row.try_get("id")?,
            legal_entity_id: row.try_get("legal_entity_id")?,
            bik: row.try_get("bik")?,
            bank_name: row.try_get("bank_name")?,
            address: row.try_get("address")?,
            corr_account: row.try_get("corr_account")?,
            account_number: row.try_get("account_number")?,
            currency: row.try_get("currency")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl From<BankAccountRow> for BankAccount {
    fn from(row: BankAccountRow) -> Self {
        BankAccount {
            id: BankAccountId::from_uuid(row.id),
            legal_entity_id: LegalEntityId::from_uuid(row.legal_entity_id),
            details: BankAccountDetails {
                bik: row.bik,
                bank_name: row.bank_name,
                address: row.address,
                corr_account: row.corr_account,
                account_number: row.account_number,
                currency: row.currency,
                comment: row.comment,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

fn legal_entity_from_row(row: &sqlx::postgres::PgRow) -> Result<LegalEntity, StoreError> {
    LegalEntityRow::from_row(row)
        .map(Into::into)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize legal entity row: {}", e)))
}

fn bank_account_from_row(row: &sqlx::postgres::PgRow) -> Result<BankAccount, StoreError> {
    BankAccountRow::from_row(row)
        .map(Into::into)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize bank account row: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_partial_unique_index_on_live_names() {
        assert!(SCHEMA.contains(LIVE_NAME_INDEX));
        assert!(SCHEMA.contains("WHERE deleted_at IS NULL"));
    }

    #[test]
    fn non_database_errors_map_to_backend() {
        let err = map_sqlx_error("list_legal_entities", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Backend(msg) if msg.contains("list_legal_entities")));
        assert!(!is_live_name_violation(&sqlx::Error::RowNotFound));
    }

    // The tests below need a scratch Postgres:
    // DATABASE_URL=postgres://... cargo test -p federation-infra -- --ignored

    static SCHEMA_READY: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

    async fn pg_store() -> PostgresRegistryStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
        let pool = PgPool::connect(&url).await.expect("failed to connect to Postgres");
        let store = PostgresRegistryStore::new(pool);
        SCHEMA_READY
            .get_or_init(|| async {
                store.ensure_schema().await.expect("failed to apply schema");
            })
            .await;
        store
    }

    /// Names carry a fresh UUID so reruns against the same database never collide.
    fn unique_name(prefix: &str) -> EntityName {
        EntityName::parse(&format!("{prefix} {}", uuid::Uuid::now_v7())).unwrap()
    }

    fn entity(name: &EntityName) -> LegalEntity {
        LegalEntity::create(LegalEntityId::new(), name.clone(), Utc::now())
    }

    fn account(owner: LegalEntityId) -> BankAccount {
        let details = BankAccountDetails {
            bik: "044525225".to_string(),
            account_number: "40702810938000000001".to_string(),
            ..Default::default()
        };
        BankAccount::create(BankAccountId::new(), owner, details, Utc::now())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_inserts_of_one_name_admit_exactly_one() {
        let store = pg_store().await;
        let name = unique_name("Acme");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let e = entity(&name);
            handles.push(tokio::spawn(async move { store.insert_legal_entity(&e).await }));
        }

        let mut inserted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => inserted += 1,
                Err(StoreError::UniqueViolation(n)) => assert_eq!(n, name.as_str()),
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(inserted, 1);

        let found = store.find_live_legal_entity_by_name(&name).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn soft_deleted_name_is_reusable() {
        let store = pg_store().await;
        let name = unique_name("Acme");

        let first = entity(&name);
        store.insert_legal_entity(&first).await.unwrap();
        assert!(store.soft_delete_legal_entity(first.uuid, Utc::now()).await.unwrap());
        assert!(!store.soft_delete_legal_entity(first.uuid, Utc::now()).await.unwrap());

        store.insert_legal_entity(&entity(&name)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn rename_onto_live_name_is_unique_violation() {
        let store = pg_store().await;
        let taken = unique_name("Acme");
        let other = entity(&unique_name("Globex"));
        store.insert_legal_entity(&entity(&taken)).await.unwrap();
        store.insert_legal_entity(&other).await.unwrap();

        let err = store
            .rename_legal_entity(other.uuid, &taken, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UniqueViolation(taken.as_str().to_string()));

        let missing = store
            .rename_legal_entity(LegalEntityId::new(), &taken, Utc::now())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn entity_soft_delete_cascades_to_accounts() {
        let store = pg_store().await;
        let owner = entity(&unique_name("Acme"));
        store.insert_legal_entity(&owner).await.unwrap();
        let acc = account(owner.uuid);
        store.insert_bank_account(&acc).await.unwrap();
        store.insert_bank_account(&account(owner.uuid)).await.unwrap();
        assert_eq!(store.list_bank_accounts(owner.uuid).await.unwrap().len(), 2);

        assert!(store.soft_delete_legal_entity(owner.uuid, Utc::now()).await.unwrap());

        assert!(store.list_bank_accounts(owner.uuid).await.unwrap().is_empty());
        assert!(!store.soft_delete_bank_account(acc.id, Utc::now()).await.unwrap());
        let updated = store
            .update_bank_account(acc.id, &acc.details, Utc::now())
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn account_under_missing_or_deleted_owner_is_owner_not_found() {
        let store = pg_store().await;

        let missing = LegalEntityId::new();
        let err = store.insert_bank_account(&account(missing)).await.unwrap_err();
        assert_eq!(err, StoreError::OwnerNotFound(missing));

        let owner = entity(&unique_name("Acme"));
        store.insert_legal_entity(&owner).await.unwrap();
        store.soft_delete_legal_entity(owner.uuid, Utc::now()).await.unwrap();

        let err = store.insert_bank_account(&account(owner.uuid)).await.unwrap_err();
        assert_eq!(err, StoreError::OwnerNotFound(owner.uuid));
    }
}
