//! The module contains the errors the ledger engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidKind`] thrown when an entry kind is neither `income` nor `outcome`.
//! - [`InvalidValue`] thrown when an entry value is malformed or negative.
//! - [`InsufficientFunds`] thrown when an outcome would overdraw the balance.
//! - [`NotFound`] thrown when an entry does not exist (or its id is malformed).
//! - [`InvalidImport`] thrown when an import source cannot be read or decoded.
//! - [`Database`] thrown on any storage failure.
//!
//!  [`InvalidKind`]: EngineError::InvalidKind
//!  [`InvalidValue`]: EngineError::InvalidValue
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`NotFound`]: EngineError::NotFound
//!  [`InvalidImport`]: EngineError::InvalidImport
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid transaction type: {0}")]
    InvalidKind(String),
    #[error("Invalid transaction value: {0}")]
    InvalidValue(String),
    #[error("Insufficient account balance: {0}")]
    InsufficientFunds(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Invalid import: {0}")]
    InvalidImport(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::InvalidValue(a), Self::InvalidValue(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidImport(a), Self::InvalidImport(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
