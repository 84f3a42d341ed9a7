//! Rule layer: typed transformations and the registry that answers
//! "which rules can produce a `T`?".
//!
//! Only single-hop candidate selection lives here; planning chains of rules
//! and running them is up to the caller.

pub mod rule;
pub mod ruleset;
pub mod types;

pub use rule::{Param, Rule, RuleArgs, RuleFn, RuleInputs, Signature, TypeRef};
pub use ruleset::RuleSet;
pub use types::{Artifact, TypeRegistry, TypeTag};
