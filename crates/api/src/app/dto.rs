use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use federation_core::{BankAccountDetails, BankAccountId, DomainError, LegalEntityId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LegalEntityRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountRequest {
    pub bik: String,
    pub bank_name: Option<String>,
    pub address: Option<String>,
    pub corr_account: Option<String>,
    pub account_number: String,
    pub currency: Option<String>,
    pub comment: Option<String>,
}

impl From<BankAccountRequest> for BankAccountDetails {
    fn from(req: BankAccountRequest) -> Self {
        BankAccountDetails {
            bik: req.bik,
            bank_name: req.bank_name,
            address: req.address,
            corr_account: req.corr_account,
            account_number: req.account_number,
            currency: req.currency,
            comment: req.comment,
        }
    }
}

// -------------------------
// Extraction helpers
// -------------------------

/// Unwrap a JSON body, answering 400 `invalid_body` for anything axum rejects.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()))
}

pub fn parse_legal_entity_id(raw: &str) -> Result<LegalEntityId, axum::response::Response> {
    raw.parse::<LegalEntityId>().map_err(invalid_id)
}

pub fn parse_bank_account_id(raw: &str) -> Result<BankAccountId, axum::response::Response> {
    raw.parse::<BankAccountId>().map_err(invalid_id)
}

fn invalid_id(e: DomainError) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string())
}
