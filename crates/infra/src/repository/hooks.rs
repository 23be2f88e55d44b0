//! Post-mutation observer hooks.
//!
//! Hooks are fire-and-forget: they run after the write has committed, in
//! registration order, and their failures are only logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository call that produced a mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateLegalEntity,
    UpdateLegalEntity,
    DeleteLegalEntity,
    CreateBankAccount,
    UpdateBankAccount,
    DeleteBankAccount,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateLegalEntity => "CreateLegalEntity",
            Operation::UpdateLegalEntity => "UpdateLegalEntity",
            Operation::DeleteLegalEntity => "DeleteLegalEntity",
            Operation::CreateBankAccount => "CreateBankAccount",
            Operation::UpdateBankAccount => "UpdateBankAccount",
            Operation::DeleteBankAccount => "DeleteBankAccount",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook is told about a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub operation: Operation,
    /// Id of the legal entity or bank account that changed.
    pub entity_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

#[async_trait]
pub trait MutationHook: Send + Sync {
    async fn after_mutation(&self, event: &MutationEvent) -> anyhow::Result<()>;
}

/// Writes one `info` line per committed mutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditHook;

#[async_trait]
impl MutationHook for TracingAuditHook {
    async fn after_mutation(&self, event: &MutationEvent) -> anyhow::Result<()> {
        tracing::info!(
            operation = %event.operation,
            entity_id = %event.entity_id,
            occurred_at = %event.occurred_at,
            "registry mutation committed"
        );
        Ok(())
    }
}
