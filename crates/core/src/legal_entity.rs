use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, Entity, LegalEntityId, ValueObject};

/// Upper bound on a legal entity name, in characters (`varchar(255)`).
pub const MAX_NAME_LEN: usize = 255;

/// Validated legal entity name.
///
/// Surrounding whitespace is trimmed, so `" Acme LLC "` and `"Acme LLC"` are the
/// same name for the uniqueness rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityName(String);

impl EntityName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("legal entity name must not be empty"));
        }
        let len = trimmed.chars().count();
        if len > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "legal entity name is {len} characters long, the limit is {MAX_NAME_LEN}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl ValueObject for EntityName {}

impl core::fmt::Display for EntityName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A company registered in the federation.
///
/// At most one live (non-deleted) entity may carry a given `name`. Deletion is
/// soft: `deleted_at` is set and the row stays in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalEntity {
    pub uuid: LegalEntityId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl LegalEntity {
    /// Build a fresh, live entity with both timestamps set to `now`.
    pub fn create(uuid: LegalEntityId, name: EntityName, now: DateTime<Utc>) -> Self {
        Self {
            uuid,
            name: name.into_inner(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn rename(&mut self, name: EntityName, now: DateTime<Utc>) {
        self.name = name.into_inner();
        self.updated_at = now;
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

impl Entity for LegalEntity {
    type Id = LegalEntityId;

    fn id(&self) -> &Self::Id {
        &self.uuid
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}
