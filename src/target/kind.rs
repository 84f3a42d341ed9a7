//! Target kinds and target instances.
//!
//! A `TargetKind` is declared once with its ordered field kinds; the alias and
//! identity maps are validated and frozen in `build()`. A `Target` is built
//! from raw values keyed by alias, all fields or nothing.

use crate::address::Address;
use crate::error::{DefinitionError, FieldError, NoSuchField};
use crate::ident::is_identifier;
use crate::target::field::{ErasedField, ErasedFieldKind, Field, FieldKind, FieldKindId, FieldValue};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw field values keyed by alias. `null` marks an absent value.
pub type RawFields = BTreeMap<String, Value>;

#[derive(Debug)]
pub struct TargetKind {
    alias: String,
    fields: Vec<Arc<dyn ErasedFieldKind>>,
    by_alias: BTreeMap<String, usize>,
    by_id: HashMap<FieldKindId, usize>,
}

pub struct TargetKindBuilder {
    alias: String,
    fields: Vec<Arc<dyn ErasedFieldKind>>,
}

impl TargetKind {
    pub fn builder(alias: impl Into<String>) -> TargetKindBuilder {
        TargetKindBuilder {
            alias: alias.into(),
            fields: Vec::new(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Field aliases in declaration order.
    pub fn field_aliases(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().filter_map(|f| f.alias())
    }

    /// Display name of the field kind declared under `alias`.
    pub fn field_for_alias(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(|&i| self.fields[i].name())
    }

    pub fn declares<V: FieldValue>(&self, field: &FieldKind<V>) -> bool {
        self.by_id.contains_key(&field.id())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TargetKindBuilder {
    pub fn field<V: FieldValue>(mut self, kind: &FieldKind<V>) -> Self {
        self.fields.push(Arc::new(kind.clone()));
        self
    }

    pub fn build(self) -> Result<Arc<TargetKind>, DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidTarget {
            target: self.alias.clone(),
            reason,
        };

        if !is_identifier(&self.alias) {
            return Err(invalid("alias must be a non-empty identifier".to_string()));
        }

        let mut by_alias: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_id: HashMap<FieldKindId, usize> = HashMap::new();
        for (idx, field) in self.fields.iter().enumerate() {
            let Some(alias) = field.alias() else {
                return Err(invalid(format!("field `{}` is abstract", field.name())));
            };
            if by_id.insert(field.id(), idx).is_some() {
                return Err(invalid(format!("field `{}` is declared twice", field.name())));
            }
            if let Some(prev) = by_alias.insert(alias.to_string(), idx) {
                return Err(invalid(format!(
                    "fields `{}` and `{}` share the alias `{}`",
                    self.fields[prev].name(),
                    field.name(),
                    alias
                )));
            }
        }

        debug!(kind = %self.alias, fields = self.fields.len(), "declared target kind");

        Ok(Arc::new(TargetKind {
            alias: self.alias,
            fields: self.fields,
            by_alias,
            by_id,
        }))
    }
}

#[derive(Debug)]
pub struct Target {
    kind: Arc<TargetKind>,
    address: Address,
    // Parallel to `kind.fields`.
    fields: Vec<Box<dyn ErasedField>>,
}

impl Target {
    pub fn new(
        kind: &Arc<TargetKind>,
        mut raw_values: RawFields,
        address: Address,
    ) -> Result<Self, FieldError> {
        let mut fields = Vec::with_capacity(kind.fields.len());
        for field_kind in &kind.fields {
            let raw = field_kind.alias().and_then(|alias| raw_values.remove(alias));
            fields.push(field_kind.construct_erased(raw, &address)?);
        }

        for alias in raw_values.keys() {
            warn!(
                address = %address,
                kind = %kind.alias,
                alias = %alias,
                "ignoring value for undeclared field"
            );
        }

        debug!(address = %address, kind = %kind.alias, "constructed target");

        Ok(Self {
            kind: Arc::clone(kind),
            address,
            fields,
        })
    }

    pub fn kind(&self) -> &TargetKind {
        &self.kind
    }

    pub fn alias(&self) -> &str {
        &self.kind.alias
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Look up a field by its exact kind. Supertypes do not match.
    pub fn get<V: FieldValue>(&self, field: &FieldKind<V>) -> Result<&Field<V>, NoSuchField> {
        self.kind
            .by_id
            .get(&field.id())
            .and_then(|&i| self.fields[i].as_any().downcast_ref::<Field<V>>())
            .ok_or_else(|| NoSuchField {
                address: self.address.clone(),
                target: self.kind.alias.clone(),
                field: field.name().to_string(),
            })
    }

    pub fn value<V: FieldValue>(&self, field: &FieldKind<V>) -> Result<&V, NoSuchField> {
        self.get(field).map(Field::value)
    }
}
