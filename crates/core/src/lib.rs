//! `federation-core`: domain building blocks for the legal entity registry.
//!
//! This crate contains **pure domain** types (no storage, no HTTP, no pub/sub).

pub mod bank_account;
pub mod entity;
pub mod error;
pub mod id;
pub mod legal_entity;
pub mod value_object;

pub use bank_account::{BankAccount, BankAccountDetails};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BankAccountId, LegalEntityId};
pub use legal_entity::{EntityName, LegalEntity};
pub use value_object::ValueObject;
