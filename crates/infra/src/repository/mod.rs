//! Write-path integrity for legal entities and bank accounts.
//!
//! The repository sits between the service and a `RegistryStore` and owns
//! every rule that has to hold no matter who calls it:
//!
//! - **Unique live names**: a create is rejected with `DuplicateName` when a
//!   live entity already has the name. The lookup before the insert is only a
//!   fast path; the store's own guard (a partial unique index in Postgres)
//!   decides races, and its violation maps to the same error.
//! - **Soft deletion**: delete sets `deleted_at`; soft-deleted rows are
//!   invisible to reads, updates, deletes and the uniqueness rule. Deleting
//!   twice yields `NotFound`.
//! - **Change notification**: every committed mutation publishes one notice
//!   (`update` / `legal_entities` by default). Publishing is bounded by a
//!   timeout and its failure is logged, never returned.
//! - **Hooks**: registered `MutationHook`s run after the notice, in
//!   registration order, and a failing or stalled hook does not stop the
//!   next one. Each hook call is bounded by its own timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use federation_core::{
    BankAccount, BankAccountDetails, BankAccountId, DomainError, EntityName, LegalEntity,
    LegalEntityId,
};

use crate::notify::{ChangeNotice, ChangeNotifier, NotifyError};
use crate::store::{RegistryStore, StoreError};

pub mod hooks;

pub use hooks::{MutationEvent, MutationHook, Operation, TracingAuditHook};

/// Default upper bound on a single change-notice publish.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_millis(500);

/// Default upper bound on a single hook call.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_millis(500);

/// Kind of record an error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordKind {
    LegalEntity,
    BankAccount,
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordKind::LegalEntity => f.write_str("legal entity"),
            RecordKind::BankAccount => f.write_str("bank account"),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Failure of a repository operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("legal entity with name '{0}' already exists")]
    DuplicateName(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: Uuid },

    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn not_found(kind: RecordKind, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<DomainError> for RepositoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(name) => Self::DuplicateName(name),
            StoreError::OwnerNotFound(id) => Self::not_found(RecordKind::LegalEntity, id),
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}

/// Registry repository over a storage backend `S`.
pub struct Repository<S> {
    store: S,
    notifier: Arc<dyn ChangeNotifier>,
    notice: ChangeNotice,
    notify_timeout: Duration,
    hook_timeout: Duration,
    hooks: Vec<Arc<dyn MutationHook>>,
}

impl<S> Repository<S> {
    pub fn new(store: S, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            store,
            notifier,
            notice: ChangeNotice::default(),
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            hooks: Vec::new(),
        }
    }

    pub fn with_notice(mut self, notice: ChangeNotice) -> Self {
        self.notice = notice;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// Register a hook; hooks run in the order they were added.
    pub fn with_hook(mut self, hook: Arc<dyn MutationHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: RegistryStore> Repository<S> {
    #[instrument(skip_all, fields(uuid = %entity.uuid))]
    pub async fn create_legal_entity(&self, mut entity: LegalEntity) -> RepositoryResult<LegalEntity> {
        let name = EntityName::parse(&entity.name)?;
        entity.name = name.as_str().to_string();

        if self.store.find_live_legal_entity_by_name(&name).await?.is_some() {
            return Err(RepositoryError::DuplicateName(entity.name));
        }

        self.store.insert_legal_entity(&entity).await?;

        self.after_commit(Operation::CreateLegalEntity, *entity.uuid.as_uuid())
            .await;
        Ok(entity)
    }

    /// Rename a live entity.
    ///
    /// There is no lookup before the write: the store reports an unknown id
    /// as "no row" and a taken name as a unique violation, in that order.
    #[instrument(skip_all, fields(uuid = %id))]
    pub async fn update_legal_entity(
        &self,
        id: LegalEntityId,
        name: &str,
    ) -> RepositoryResult<LegalEntity> {
        let name = EntityName::parse(name)?;

        let updated = self
            .store
            .rename_legal_entity(id, &name, Utc::now())
            .await?
            .ok_or_else(|| RepositoryError::not_found(RecordKind::LegalEntity, id))?;

        self.after_commit(Operation::UpdateLegalEntity, *id.as_uuid())
            .await;
        Ok(updated)
    }

    /// Soft-delete a live entity together with its live bank accounts.
    #[instrument(skip_all, fields(uuid = %id))]
    pub async fn delete_legal_entity(&self, id: LegalEntityId) -> RepositoryResult<()> {
        if !self.store.soft_delete_legal_entity(id, Utc::now()).await? {
            return Err(RepositoryError::not_found(RecordKind::LegalEntity, id));
        }

        self.after_commit(Operation::DeleteLegalEntity, *id.as_uuid())
            .await;
        Ok(())
    }

    pub async fn get_all_legal_entities(&self) -> RepositoryResult<Vec<LegalEntity>> {
        Ok(self.store.list_legal_entities().await?)
    }

    #[instrument(skip_all, fields(id = %account.id, legal_entity_id = %account.legal_entity_id))]
    pub async fn create_bank_account(&self, mut account: BankAccount) -> RepositoryResult<BankAccount> {
        account.details = account.details.normalized()?;

        self.store.insert_bank_account(&account).await?;

        self.after_commit(Operation::CreateBankAccount, *account.id.as_uuid())
            .await;
        Ok(account)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_bank_account(
        &self,
        id: BankAccountId,
        details: BankAccountDetails,
    ) -> RepositoryResult<BankAccount> {
        let details = details.normalized()?;

        let updated = self
            .store
            .update_bank_account(id, &details, Utc::now())
            .await?
            .ok_or_else(|| RepositoryError::not_found(RecordKind::BankAccount, id))?;

        self.after_commit(Operation::UpdateBankAccount, *id.as_uuid())
            .await;
        Ok(updated)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_bank_account(&self, id: BankAccountId) -> RepositoryResult<()> {
        if !self.store.soft_delete_bank_account(id, Utc::now()).await? {
            return Err(RepositoryError::not_found(RecordKind::BankAccount, id));
        }

        self.after_commit(Operation::DeleteBankAccount, *id.as_uuid())
            .await;
        Ok(())
    }

    pub async fn get_all_bank_accounts(
        &self,
        legal_entity_id: LegalEntityId,
    ) -> RepositoryResult<Vec<BankAccount>> {
        Ok(self.store.list_bank_accounts(legal_entity_id).await?)
    }

    /// Publish the change notice, then run hooks in registration order.
    ///
    /// The work runs on a detached task: a caller that goes away after the
    /// write committed does not cancel it. The caller still waits for it, but
    /// never longer than the notify timeout plus one hook timeout per hook.
    async fn after_commit(&self, operation: Operation, entity_id: Uuid) {
        let notifier = self.notifier.clone();
        let notice = self.notice.clone();
        let notify_timeout = self.notify_timeout;
        let hook_timeout = self.hook_timeout;
        let hooks = self.hooks.clone();

        let task = tokio::spawn(async move {
            publish_change(notifier.as_ref(), &notice, notify_timeout, operation).await;

            let event = MutationEvent {
                operation,
                entity_id,
                occurred_at: Utc::now(),
            };
            for hook in &hooks {
                match tokio::time::timeout(hook_timeout, hook.after_mutation(&event)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(%operation, error = %e, "mutation hook failed"),
                    Err(_) => tracing::warn!(
                        %operation,
                        timeout_ms = hook_timeout.as_millis() as u64,
                        "mutation hook timed out"
                    ),
                }
            }
        });

        if let Err(e) = task.await {
            tracing::error!(%operation, error = %e, "post-commit task failed");
        }
    }
}

async fn publish_change(
    notifier: &dyn ChangeNotifier,
    notice: &ChangeNotice,
    timeout: Duration,
    operation: Operation,
) {
    let publish = notifier.publish(&notice.channel, &notice.message);

    let result = match tokio::time::timeout(timeout, publish).await {
        Ok(res) => res,
        Err(_) => Err(NotifyError::Timeout(timeout.as_millis() as u64)),
    };

    if let Err(e) = result {
        tracing::error!(
            %operation,
            channel = %notice.channel,
            error = %e,
            "change notification failed; mutation stays committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::notify::{NoopNotifier, RecordingNotifier};
    use crate::store::InMemoryRegistryStore;
    use async_trait::async_trait;

    fn entity(name: &str) -> LegalEntity {
        let now = Utc::now();
        LegalEntity {
            uuid: LegalEntityId::new(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn account(owner: LegalEntityId) -> BankAccount {
        let details = BankAccountDetails {
            bik: "044525225".to_string(),
            account_number: "40702810938000000001".to_string(),
            currency: Some("RUB".to_string()),
            ..Default::default()
        };
        BankAccount::create(BankAccountId::new(), owner, details, Utc::now())
    }

    fn repo() -> Repository<InMemoryRegistryStore> {
        Repository::new(InMemoryRegistryStore::new(), Arc::new(NoopNotifier))
    }

    /// Hook that appends `label` to a shared log, optionally failing.
    struct LabelHook {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl MutationHook for LabelHook {
        async fn after_mutation(&self, event: &MutationEvent) -> anyhow::Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.operation));
            if self.fail {
                anyhow::bail!("{} refused", self.label);
            }
            Ok(())
        }
    }

    /// Notifier that never answers.
    struct StalledNotifier;

    #[async_trait]
    impl ChangeNotifier for StalledNotifier {
        async fn publish(&self, _channel: &str, _message: &str) -> Result<(), NotifyError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_live_name_is_rejected() {
        let repo = repo();
        repo.create_legal_entity(entity("Acme LLC")).await.unwrap();

        let err = repo.create_legal_entity(entity("Acme LLC")).await.unwrap_err();
        assert_eq!(err, RepositoryError::DuplicateName("Acme LLC".to_string()));
    }

    #[tokio::test]
    async fn duplicate_check_uses_trimmed_name() {
        let repo = repo();
        let created = repo.create_legal_entity(entity("  Acme LLC ")).await.unwrap();
        assert_eq!(created.name, "Acme LLC");

        let err = repo.create_legal_entity(entity("Acme LLC")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn blank_name_is_a_validation_error() {
        let err = repo().create_legal_entity(entity("   ")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn acme_scenario_allows_reuse_after_delete() {
        let repo = repo();

        let a = repo.create_legal_entity(entity("Acme LLC")).await.unwrap();
        let dup = repo.create_legal_entity(entity("Acme LLC")).await.unwrap_err();
        assert!(matches!(dup, RepositoryError::DuplicateName(_)));

        repo.delete_legal_entity(a.uuid).await.unwrap();

        let b = repo.create_legal_entity(entity("Acme LLC")).await.unwrap();
        assert_ne!(a.uuid, b.uuid);

        let live = repo.get_all_legal_entities().await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].uuid, b.uuid);
    }

    #[tokio::test]
    async fn delete_twice_is_not_found_the_second_time() {
        let repo = repo();
        let a = repo.create_legal_entity(entity("Acme")).await.unwrap();

        repo.delete_legal_entity(a.uuid).await.unwrap();
        let err = repo.delete_legal_entity(a.uuid).await.unwrap_err();
        assert_eq!(err, RepositoryError::not_found(RecordKind::LegalEntity, a.uuid));

        let row = &repo.store().all_legal_entity_rows()[0];
        assert!(row.deleted_at.is_some());
    }

    #[tokio::test]
    async fn list_never_returns_soft_deleted_entities() {
        let repo = repo();
        let a = repo.create_legal_entity(entity("A")).await.unwrap();
        repo.create_legal_entity(entity("B")).await.unwrap();
        repo.delete_legal_entity(a.uuid).await.unwrap();

        let live = repo.get_all_legal_entities().await.unwrap();
        assert_eq!(live.len(), 1);
        assert!(live.iter().all(|e| e.deleted_at.is_none()));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found_and_changes_nothing() {
        let repo = repo();
        repo.create_legal_entity(entity("Acme")).await.unwrap();
        let before = repo.store().all_legal_entity_rows();

        let missing = LegalEntityId::new();
        let err = repo.update_legal_entity(missing, "Globex").await.unwrap_err();

        assert_eq!(err, RepositoryError::not_found(RecordKind::LegalEntity, missing));
        assert_eq!(repo.store().all_legal_entity_rows(), before);
    }

    #[tokio::test]
    async fn update_soft_deleted_entity_is_not_found() {
        let repo = repo();
        let a = repo.create_legal_entity(entity("Acme")).await.unwrap();
        repo.delete_legal_entity(a.uuid).await.unwrap();

        let err = repo.update_legal_entity(a.uuid, "Acme 2").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rename_onto_live_name_is_duplicate() {
        let repo = repo();
        repo.create_legal_entity(entity("Acme")).await.unwrap();
        let globex = repo.create_legal_entity(entity("Globex")).await.unwrap();

        let err = repo.update_legal_entity(globex.uuid, "Acme").await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn update_renames_and_bumps_updated_at() {
        let repo = repo();
        let a = repo.create_legal_entity(entity("Acme")).await.unwrap();

        let updated = repo.update_legal_entity(a.uuid, "Acme Holdings").await.unwrap();
        assert_eq!(updated.name, "Acme Holdings");
        assert_eq!(updated.created_at, a.created_at);
        assert!(updated.updated_at >= a.updated_at);
    }

    #[tokio::test]
    async fn every_mutation_publishes_update_notice() {
        let notifier = Arc::new(RecordingNotifier::new());
        let repo = Repository::new(InMemoryRegistryStore::new(), notifier.clone());

        let a = repo.create_legal_entity(entity("Acme")).await.unwrap();
        repo.update_legal_entity(a.uuid, "Acme 2").await.unwrap();
        let acc = repo.create_bank_account(account(a.uuid)).await.unwrap();
        repo.update_bank_account(acc.id, acc.details.clone()).await.unwrap();
        repo.delete_bank_account(acc.id).await.unwrap();
        repo.delete_legal_entity(a.uuid).await.unwrap();

        let published = notifier.published();
        assert_eq!(published.len(), 6);
        assert!(published
            .iter()
            .all(|(c, m)| c == "update" && m == "legal_entities"));
    }

    #[tokio::test]
    async fn failed_mutation_publishes_nothing() {
        let notifier = Arc::new(RecordingNotifier::new());
        let repo = Repository::new(InMemoryRegistryStore::new(), notifier.clone());

        let _ = repo.delete_legal_entity(LegalEntityId::new()).await;
        let _ = repo.create_legal_entity(entity("")).await;

        assert!(notifier.published().is_empty());
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_create() {
        let notifier = Arc::new(RecordingNotifier::failing(NotifyError::Backend(
            "connection refused".to_string(),
        )));
        let repo = Repository::new(InMemoryRegistryStore::new(), notifier.clone());

        let created = repo.create_legal_entity(entity("Acme")).await.unwrap();

        assert_eq!(notifier.published().len(), 1);
        assert_eq!(repo.get_all_legal_entities().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn stalled_notifier_is_cut_off_by_timeout() {
        let repo = Repository::new(InMemoryRegistryStore::new(), Arc::new(StalledNotifier))
            .with_notify_timeout(Duration::from_millis(20));

        let created = tokio::time::timeout(
            Duration::from_secs(5),
            repo.create_legal_entity(entity("Acme")),
        )
        .await
        .expect("create must not wait for the notifier")
        .unwrap();

        assert_eq!(created.name, "Acme");
    }

    #[tokio::test]
    async fn hooks_run_in_order_and_survive_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let repo = Repository::new(InMemoryRegistryStore::new(), Arc::new(NoopNotifier))
            .with_hook(Arc::new(LabelHook {
                label: "first",
                log: log.clone(),
                fail: true,
            }))
            .with_hook(Arc::new(LabelHook {
                label: "second",
                log: log.clone(),
                fail: false,
            }));

        let a = repo.create_legal_entity(entity("Acme")).await.unwrap();
        repo.delete_legal_entity(a.uuid).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first:CreateLegalEntity",
                "second:CreateLegalEntity",
                "first:DeleteLegalEntity",
                "second:DeleteLegalEntity",
            ]
        );
    }

    /// Hook that never answers.
    struct StalledHook;

    #[async_trait]
    impl MutationHook for StalledHook {
        async fn after_mutation(&self, _event: &MutationEvent) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Hook that waits, then records the operation.
    struct SlowRecordingHook {
        delay: Duration,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MutationHook for SlowRecordingHook {
        async fn after_mutation(&self, event: &MutationEvent) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            self.log.lock().unwrap().push(event.operation.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn stalled_hook_is_cut_off_and_later_hooks_still_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let repo = Repository::new(InMemoryRegistryStore::new(), Arc::new(NoopNotifier))
            .with_hook_timeout(Duration::from_millis(20))
            .with_hook(Arc::new(StalledHook))
            .with_hook(Arc::new(LabelHook {
                label: "after",
                log: log.clone(),
                fail: false,
            }));

        let created = tokio::time::timeout(
            Duration::from_secs(5),
            repo.create_legal_entity(entity("Acme")),
        )
        .await
        .expect("create must not wait on a stalled hook")
        .unwrap();

        assert_eq!(created.name, "Acme");
        assert_eq!(*log.lock().unwrap(), vec!["after:CreateLegalEntity"]);
    }

    #[tokio::test]
    async fn notice_and_hooks_survive_a_cancelled_caller() {
        let notifier = Arc::new(RecordingNotifier::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let repo = Repository::new(InMemoryRegistryStore::new(), notifier.clone()).with_hook(
            Arc::new(SlowRecordingHook {
                delay: Duration::from_millis(50),
                log: log.clone(),
            }),
        );

        // The caller gives up while the hook is still running.
        let res = tokio::time::timeout(
            Duration::from_millis(10),
            repo.create_legal_entity(entity("Acme")),
        )
        .await;
        assert!(res.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(repo.store().all_legal_entity_rows().len(), 1);
        assert_eq!(notifier.published().len(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["CreateLegalEntity"]);
    }

    #[tokio::test]
    async fn hooks_do_not_run_for_failed_mutations() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let repo = repo().with_hook(Arc::new(LabelHook {
            label: "audit",
            log: log.clone(),
            fail: false,
        }));

        let _ = repo.update_legal_entity(LegalEntityId::new(), "Nope").await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bank_account_lifecycle() {
        let repo = repo();
        let owner = repo.create_legal_entity(entity("Acme")).await.unwrap();

        let acc = repo.create_bank_account(account(owner.uuid)).await.unwrap();
        assert_eq!(repo.get_all_bank_accounts(owner.uuid).await.unwrap(), vec![acc.clone()]);

        let mut details = acc.details.clone();
        details.comment = Some("payroll".to_string());
        let updated = repo.update_bank_account(acc.id, details).await.unwrap();
        assert_eq!(updated.details.comment.as_deref(), Some("payroll"));

        repo.delete_bank_account(acc.id).await.unwrap();
        assert!(repo.get_all_bank_accounts(owner.uuid).await.unwrap().is_empty());

        let err = repo.delete_bank_account(acc.id).await.unwrap_err();
        assert_eq!(err, RepositoryError::not_found(RecordKind::BankAccount, acc.id));
    }

    #[tokio::test]
    async fn bank_account_for_missing_owner_is_not_found() {
        let missing = LegalEntityId::new();
        let err = repo().create_bank_account(account(missing)).await.unwrap_err();
        assert_eq!(err, RepositoryError::not_found(RecordKind::LegalEntity, missing));
    }

    #[tokio::test]
    async fn bank_account_validation_runs_before_storage() {
        let repo = repo();
        let owner = repo.create_legal_entity(entity("Acme")).await.unwrap();
        let mut bad = account(owner.uuid);
        bad.details.bik = " ".to_string();

        let err = repo.create_bank_account(bad).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
        assert!(repo.store().all_bank_account_rows().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_with_same_name_admit_exactly_one() {
        let repo = Arc::new(repo());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create_legal_entity(entity("Acme LLC")).await
            }));
        }

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RepositoryError::DuplicateName(_)) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(repo.get_all_legal_entities().await.unwrap().len(), 1);
    }

    proptest::proptest! {
        #[test]
        fn distinct_names_all_get_stored(names in proptest::collection::hash_set("[A-Za-z]{1,12}", 1..12)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let repo = repo();
                for name in &names {
                    repo.create_legal_entity(entity(name)).await.unwrap();
                }
                let live = repo.get_all_legal_entities().await.unwrap();
                assert_eq!(live.len(), names.len());

                let ids: std::collections::HashSet<_> = live.iter().map(|e| e.uuid).collect();
                assert_eq!(ids.len(), names.len());
            });
        }
    }

    #[tokio::test]
    async fn deleting_owner_hides_its_accounts() {
        let repo = repo();
        let owner = repo.create_legal_entity(entity("Acme")).await.unwrap();
        let acc = repo.create_bank_account(account(owner.uuid)).await.unwrap();

        repo.delete_legal_entity(owner.uuid).await.unwrap();

        assert!(repo.get_all_bank_accounts(owner.uuid).await.unwrap().is_empty());
        let err = repo.update_bank_account(acc.id, acc.details.clone()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { kind: RecordKind::BankAccount, .. }));
    }
}
