//! Target layer: typed field descriptors and the target kinds built from them.
//!
//! Raw target data (alias -> JSON value) enters here and leaves as validated,
//! immutable `Target`s.

pub mod field;
pub mod kind;

pub use field::{
    AnyField, BoolField, Field, FieldKind, FieldKindBuilder, FieldKindId, FieldValue, FloatField,
    IntField, Presence, StringField, StringListField,
};
pub use kind::{RawFields, Target, TargetKind, TargetKindBuilder};
