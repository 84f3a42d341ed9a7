//! Typed target fields.
//!
//! A `FieldKind<V>` is the immutable descriptor of one field "class": its alias
//! (the keyword used in raw target data), and whether it is required or falls
//! back to a default. Descriptors are validated once, in `build()`. Every
//! descriptor gets its own identity; clones share it.
//!
//! A `Field<V>` is one validated value of a kind, bound to a target address.

use crate::address::Address;
use crate::error::{DefinitionError, FieldError};
use crate::ident::is_identifier;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Value types a field can hold, with coercion from raw JSON input.
pub trait FieldValue: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Name used in type mismatch diagnostics.
    const TYPE_NAME: &'static str;

    fn coerce(raw: &Value) -> Option<Self>;
}

impl FieldValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn coerce(raw: &Value) -> Option<Self> {
        raw.as_i64()
    }
}

impl FieldValue for f64 {
    const TYPE_NAME: &'static str = "float";

    // Integers are accepted for float fields.
    fn coerce(raw: &Value) -> Option<Self> {
        raw.as_f64()
    }
}

impl FieldValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn coerce(raw: &Value) -> Option<Self> {
        raw.as_bool()
    }
}

impl FieldValue for String {
    const TYPE_NAME: &'static str = "str";

    fn coerce(raw: &Value) -> Option<Self> {
        raw.as_str().map(str::to_string)
    }
}

impl FieldValue for Vec<String> {
    const TYPE_NAME: &'static str = "list[str]";

    fn coerce(raw: &Value) -> Option<Self> {
        raw.as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

impl FieldValue for Value {
    const TYPE_NAME: &'static str = "any";

    fn coerce(raw: &Value) -> Option<Self> {
        Some(raw.clone())
    }
}

pub type IntField = FieldKind<i64>;
pub type FloatField = FieldKind<f64>;
pub type BoolField = FieldKind<bool>;
pub type StringField = FieldKind<String>;
pub type StringListField = FieldKind<Vec<String>>;
pub type AnyField = FieldKind<Value>;

/// Identity of a field kind. Unique per `build()` / `abstract_kind()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldKindId(u64);

impl FieldKindId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presence<V> {
    Required,
    Default(V),
}

#[derive(Debug)]
struct KindInner<V> {
    id: FieldKindId,
    name: String,
    // Both `None` for abstract kinds.
    alias: Option<String>,
    presence: Option<Presence<V>>,
}

#[derive(Debug, Clone)]
pub struct FieldKind<V: FieldValue> {
    inner: Arc<KindInner<V>>,
}

impl<V: FieldValue> FieldKind<V> {
    pub fn builder(alias: impl Into<String>) -> FieldKindBuilder<V> {
        FieldKindBuilder {
            alias: alias.into(),
            name: None,
            required: false,
            default: None,
        }
    }

    /// Declare an abstract kind: it has no alias and no presence rule, and
    /// constructing a field from it always fails.
    pub fn abstract_kind(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(KindInner {
                id: FieldKindId::next(),
                name: name.into(),
                alias: None,
                presence: None,
            }),
        }
    }

    pub fn id(&self) -> FieldKindId {
        self.inner.id
    }

    /// Display name, used when reporting a missing field on a target.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.inner.alias.as_deref()
    }

    pub fn presence(&self) -> Option<&Presence<V>> {
        self.inner.presence.as_ref()
    }

    pub fn is_abstract(&self) -> bool {
        self.inner.presence.is_none()
    }

    pub fn construct(
        &self,
        raw_value: Option<Value>,
        address: &Address,
    ) -> Result<Field<V>, FieldError> {
        let (Some(alias), Some(presence)) = (self.alias(), self.presence()) else {
            return Err(FieldError::AbstractField {
                kind: self.name().to_string(),
            });
        };

        // JSON null is the explicit absence marker.
        let raw_value = raw_value.filter(|v| !v.is_null());

        let value = match (&raw_value, presence) {
            (None, Presence::Required) => {
                return Err(FieldError::RequiredFieldMissing {
                    address: address.clone(),
                    field_alias: alias.to_string(),
                });
            }
            (None, Presence::Default(default)) => default.clone(),
            (Some(raw), _) => V::coerce(raw).ok_or_else(|| FieldError::InvalidFieldType {
                address: address.clone(),
                field_alias: alias.to_string(),
                raw_value: raw.clone(),
                expected_type: V::TYPE_NAME,
            })?,
        };

        Ok(Field {
            kind: self.clone(),
            raw_value,
            address: address.clone(),
            value,
        })
    }
}

pub struct FieldKindBuilder<V> {
    alias: String,
    name: Option<String>,
    required: bool,
    default: Option<V>,
}

impl<V: FieldValue> FieldKindBuilder<V> {
    /// Display name for diagnostics; defaults to the alias.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: V) -> Self {
        self.default = Some(value);
        self
    }

    pub fn build(self) -> Result<FieldKind<V>, DefinitionError> {
        let name = self.name.unwrap_or_else(|| self.alias.clone());
        let invalid = |reason: &str| DefinitionError::InvalidField {
            field: name.clone(),
            reason: reason.to_string(),
        };

        if self.alias.is_empty() {
            return Err(invalid("missing alias"));
        }
        if !is_identifier(&self.alias) {
            return Err(invalid("alias must be an identifier"));
        }

        let presence = match (self.required, self.default) {
            (true, None) => Presence::Required,
            (false, Some(default)) => Presence::Default(default),
            (true, Some(_)) => return Err(invalid("declares both `required` and a default")),
            (false, None) => return Err(invalid("must be required or have a default value")),
        };

        Ok(FieldKind {
            inner: Arc::new(KindInner {
                id: FieldKindId::next(),
                name,
                alias: Some(self.alias),
                presence: Some(presence),
            }),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Field<V: FieldValue> {
    kind: FieldKind<V>,
    raw_value: Option<Value>,
    address: Address,
    value: V,
}

impl<V: FieldValue> Field<V> {
    pub fn kind(&self) -> &FieldKind<V> {
        &self.kind
    }

    pub fn raw_value(&self) -> Option<&Value> {
        self.raw_value.as_ref()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<V: FieldValue> PartialEq for Field<V> {
    fn eq(&self, other: &Self) -> bool {
        self.kind.id() == other.kind.id()
            && self.raw_value == other.raw_value
            && self.address == other.address
            && self.value == other.value
    }
}

/// Field kinds with the value type erased, as held by a target kind.
pub(crate) trait ErasedFieldKind: fmt::Debug + Send + Sync {
    fn id(&self) -> FieldKindId;
    fn name(&self) -> &str;
    fn alias(&self) -> Option<&str>;
    fn construct_erased(
        &self,
        raw_value: Option<Value>,
        address: &Address,
    ) -> Result<Box<dyn ErasedField>, FieldError>;
}

pub(crate) trait ErasedField: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<V: FieldValue> ErasedFieldKind for FieldKind<V> {
    fn id(&self) -> FieldKindId {
        FieldKind::id(self)
    }

    fn name(&self) -> &str {
        FieldKind::name(self)
    }

    fn alias(&self) -> Option<&str> {
        FieldKind::alias(self)
    }

    fn construct_erased(
        &self,
        raw_value: Option<Value>,
        address: &Address,
    ) -> Result<Box<dyn ErasedField>, FieldError> {
        Ok(Box::new(self.construct(raw_value, address)?))
    }
}

impl<V: FieldValue> ErasedField for Field<V> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn addr() -> Address {
        Address::new("test", "a").unwrap()
    }

    #[test]
    fn abstract_kind_can_be_declared_but_not_constructed() {
        let base = AnyField::abstract_kind("MyField");
        assert!(base.is_abstract());
        assert_eq!(
            base.construct(Some(json!(1)), &addr()),
            Err(FieldError::AbstractField {
                kind: "MyField".to_string()
            })
        );
    }

    #[test]
    fn concrete_kind_needs_alias_and_presence() {
        assert!(AnyField::builder("field1").required().build().is_ok());
        assert!(AnyField::builder("field2").default(json!(42)).build().is_ok());

        // Missing alias.
        assert!(matches!(
            AnyField::builder("").default(json!(42)).build(),
            Err(DefinitionError::InvalidField { .. })
        ));
        // Neither required nor default.
        assert!(matches!(
            AnyField::builder("field4").build(),
            Err(DefinitionError::InvalidField { .. })
        ));
        // Both.
        assert!(IntField::builder("field5").required().default(1).build().is_err());
        // Not a keyword.
        assert!(IntField::builder("field-6").required().build().is_err());
    }

    #[test]
    fn absent_value_becomes_default() {
        let kind = StringField::builder("field").default("foo".to_string()).build().unwrap();
        assert_eq!(kind.construct(None, &addr()).unwrap().value(), "foo");

        let field = kind.construct(Some(Value::Null), &addr()).unwrap();
        assert_eq!(field.value(), "foo");
        assert_eq!(field.raw_value(), None);
    }

    #[test]
    fn absent_required_value_is_an_error() {
        let kind = AnyField::builder("field").required().build().unwrap();
        assert_eq!(
            kind.construct(None, &addr()),
            Err(FieldError::RequiredFieldMissing {
                address: addr(),
                field_alias: "field".to_string(),
            })
        );
    }

    #[test]
    fn coerces_raw_values() {
        let int = IntField::builder("n").required().build().unwrap();
        assert_eq!(*int.construct(Some(json!(42)), &addr()).unwrap().value(), 42);

        let float = FloatField::builder("x").required().build().unwrap();
        assert_eq!(*float.construct(Some(json!(3)), &addr()).unwrap().value(), 3.0);

        let list = StringListField::builder("srcs").default(vec![]).build().unwrap();
        assert_eq!(
            list.construct(Some(json!(["a.rs", "b.rs"])), &addr()).unwrap().value(),
            &vec!["a.rs".to_string(), "b.rs".to_string()]
        );
    }

    #[test]
    fn rejects_wrong_value_type() {
        let int = IntField::builder("a").required().build().unwrap();
        assert_eq!(
            int.construct(Some(json!("foo")), &addr()),
            Err(FieldError::InvalidFieldType {
                address: addr(),
                field_alias: "a".to_string(),
                raw_value: json!("foo"),
                expected_type: "int",
            })
        );
        assert!(int.construct(Some(json!(1.5)), &addr()).is_err());
        assert!(int.construct(Some(json!(true)), &addr()).is_err());

        let list = StringListField::builder("srcs").required().build().unwrap();
        assert!(list.construct(Some(json!(["a", 1])), &addr()).is_err());
    }

    #[test]
    fn clones_share_identity() {
        let a = IntField::builder("a").required().build().unwrap();
        let b = IntField::builder("a").required().build().unwrap();
        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "a");
    }
}
