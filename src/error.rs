//! Error taxonomy.
//!
//! - `DefinitionError`: a field kind, target kind, type or rule was declared
//!   incorrectly. Raised once, when the descriptor is built.
//! - `AddressError`, `FieldError`: validation of user input (address strings,
//!   raw field values), carrying enough context for diagnostics.
//! - `NoSuchField`: a target was asked for a field its kind does not declare.
//! - `RuleError`: applying a rule failed, including contract violations.

use crate::address::Address;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid target `{target}`: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("invalid type `{name}`: {reason}")]
    InvalidType { name: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address spec {spec:?}: {reason}")]
    InvalidSpec { spec: String, reason: &'static str },

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: &'static str },
}

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("field `{kind}` is abstract and cannot be instantiated")]
    AbstractField { kind: String },

    #[error("{address}: required field `{field_alias}` is missing")]
    RequiredFieldMissing {
        address: Address,
        field_alias: String,
    },

    #[error("{address}: field `{field_alias}` expects {expected_type}, got {raw_value}")]
    InvalidFieldType {
        address: Address,
        field_alias: String,
        raw_value: Value,
        expected_type: &'static str,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("target `{address}` of type `{target}` has no field `{field}`")]
pub struct NoSuchField {
    pub address: Address,
    pub target: String,
    pub field: String,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule `{rule}` needs an input of type {type_name} for parameter `{param}`")]
    MissingInput {
        rule: String,
        param: String,
        type_name: &'static str,
    },

    #[error("rule `{rule}`: argument `{param}` is not a {expected}")]
    InvalidArgument {
        rule: String,
        param: String,
        expected: &'static str,
    },

    #[error("rule `{rule}` failed")]
    Failed {
        rule: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("rule `{rule}` must return object of type {expected} but actually returned {actual}")]
    ContractViolated {
        rule: String,
        expected: &'static str,
        actual: &'static str,
    },
}
