use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BankAccountId, DomainError, DomainResult, Entity, LegalEntityId, ValueObject};

/// Longest `bik`, in characters (`varchar(32)`).
pub const MAX_BIK_LEN: usize = 32;
/// Longest `account_number` / `corr_account`, in characters (`varchar(64)`).
pub const MAX_ACCOUNT_NUMBER_LEN: usize = 64;
/// Longest `currency`, in characters (`varchar(16)`).
pub const MAX_CURRENCY_LEN: usize = 16;

/// Editable fields of a bank account.
///
/// `bik` and `account_number` are required; the rest are optional. Blank
/// optional strings are stored as `None`. Length limits mirror the column
/// widths of `bank_accounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountDetails {
    pub bik: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corr_account: Option<String>,
    pub account_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl BankAccountDetails {
    /// Trim every field, drop blank optionals and check the required ones.
    pub fn normalized(self) -> DomainResult<Self> {
        let bik = self.bik.trim().to_string();
        if bik.is_empty() {
            return Err(DomainError::validation("bank account bik must not be empty"));
        }
        let account_number = self.account_number.trim().to_string();
        if account_number.is_empty() {
            return Err(DomainError::validation(
                "bank account number must not be empty",
            ));
        }

        let corr_account = non_blank(self.corr_account);
        let currency = non_blank(self.currency);

        check_len("bik", &bik, MAX_BIK_LEN)?;
        check_len("account number", &account_number, MAX_ACCOUNT_NUMBER_LEN)?;
        if let Some(corr) = &corr_account {
            check_len("correspondent account", corr, MAX_ACCOUNT_NUMBER_LEN)?;
        }
        if let Some(cur) = &currency {
            check_len("currency", cur, MAX_CURRENCY_LEN)?;
        }

        Ok(Self {
            bik,
            bank_name: non_blank(self.bank_name),
            address: non_blank(self.address),
            corr_account,
            account_number,
            currency,
            comment: non_blank(self.comment),
        })
    }
}

impl ValueObject for BankAccountDetails {}

fn check_len(field: &str, value: &str, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(DomainError::validation(format!(
            "bank account {field} is {len} characters long, the limit is {max}"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Bank account owned by a legal entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: BankAccountId,
    pub legal_entity_id: LegalEntityId,
    #[serde(flatten)]
    pub details: BankAccountDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl BankAccount {
    pub fn create(
        id: BankAccountId,
        legal_entity_id: LegalEntityId,
        details: BankAccountDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            legal_entity_id,
            details,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn replace_details(&mut self, details: BankAccountDetails, now: DateTime<Utc>) {
        self.details = details;
        self.updated_at = now;
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

impl Entity for BankAccount {
    type Id = BankAccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}
