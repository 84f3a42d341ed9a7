//! Metadata core of a build-description tool.
//!
//! - `address`: where targets live and how specs select them
//! - `target`: typed, validated target fields grouped into target kinds
//! - `rules`: type-directed registry of transformation rules

pub mod address;
pub mod error;
mod ident;
pub mod rules;
pub mod target;

pub use address::{Address, AddressSpec};
pub use error::{AddressError, DefinitionError, FieldError, NoSuchField, RuleError};
pub use rules::{Artifact, Rule, RuleArgs, RuleInputs, RuleSet, Signature, TypeRegistry, TypeTag};
pub use target::{Field, FieldKind, FieldValue, RawFields, Target, TargetKind};
