//! Type tags, the explicit subtype relation, and type-tagged artifacts.
//!
//! Rules are keyed by the Rust types they consume and produce. `TypeTag` is the
//! stable identity of such a type. Rust has no subclassing, so "a `Binary` is
//! an `Artifact`" is declared in a `TypeRegistry`; queries take the reflexive,
//! transitive closure of those declarations.

use crate::error::DefinitionError;
use crate::ident::is_type_path;
use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    qualified_name: &'static str,
}

impl TypeTag {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            qualified_name: type_name::<T>(),
        }
    }

    pub fn qualified_name(&self) -> &'static str {
        self.qualified_name
    }

    /// Name without the module path of the outermost type,
    /// e.g. `alloc::string::String` => `String`. Tuples, slices, arrays and
    /// references have no single outermost path and keep the full name.
    pub fn name(&self) -> &'static str {
        let s = self.qualified_name;
        if s.starts_with(['(', '[', '&']) {
            return s;
        }
        let head_end = s.find('<').unwrap_or(s.len());
        let start = s[..head_end].rfind("::").map(|i| i + 2).unwrap_or(0);
        &s[start..]
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Known types by name, plus declared direct supertypes.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    names: BTreeMap<String, TypeTag>,
    // Short names claimed implicitly by more than one type; never resolved.
    ambiguous: BTreeSet<String>,
    supertypes: HashMap<TypeTag, Vec<TypeTag>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the scalar types rules commonly pass around.
    pub fn with_primitives() -> Self {
        let mut types = Self::new();
        types.insert(TypeTag::of::<bool>());
        types.insert(TypeTag::of::<i32>());
        types.insert(TypeTag::of::<i64>());
        types.insert(TypeTag::of::<u32>());
        types.insert(TypeTag::of::<u64>());
        types.insert(TypeTag::of::<f64>());
        types.insert(TypeTag::of::<String>());
        types
    }

    /// Register `T` under its short name (`TypeTag::name`).
    pub fn register<T: Any>(&mut self) -> Result<TypeTag, DefinitionError> {
        let tag = TypeTag::of::<T>();
        self.bind_name(tag.name(), tag)?;
        Ok(tag)
    }

    /// Register `T` under an explicit name, e.g. to disambiguate two types
    /// sharing a short name.
    pub fn register_as<T: Any>(&mut self, name: &str) -> Result<TypeTag, DefinitionError> {
        let tag = TypeTag::of::<T>();
        self.bind_name(name, tag)?;
        Ok(tag)
    }

    /// Declare `Sub` a direct subtype of `Super`. Both become known types.
    pub fn register_subtype<Sub: Any, Super: Any>(&mut self) -> Result<(), DefinitionError> {
        self.declare_subtype(TypeTag::of::<Sub>(), TypeTag::of::<Super>())
    }

    pub fn declare_subtype(&mut self, sub: TypeTag, sup: TypeTag) -> Result<(), DefinitionError> {
        if self.is_subtype(sup, sub) {
            return Err(DefinitionError::InvalidType {
                name: sub.name().to_string(),
                reason: format!("`{}` is already a subtype of it", sup.name()),
            });
        }

        self.insert(sup);
        self.insert(sub);
        let direct = self.supertypes.entry(sub).or_default();
        if !direct.contains(&sup) {
            direct.push(sup);
        }
        Ok(())
    }

    pub fn contains(&self, tag: TypeTag) -> bool {
        self.supertypes.contains_key(&tag)
    }

    pub fn resolve(&self, name: &str) -> Option<TypeTag> {
        self.names.get(name).copied()
    }

    /// Whether `name` is the short name of several known types, so that it
    /// must not resolve to any of them.
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains(name)
    }

    /// Direct supertypes in declaration order.
    pub fn supertypes_of(&self, tag: TypeTag) -> &[TypeTag] {
        self.supertypes.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `candidate` is `requested` or (transitively) declared a subtype of it.
    pub fn is_subtype(&self, candidate: TypeTag, requested: TypeTag) -> bool {
        if candidate == requested {
            return true;
        }

        let mut seen: HashSet<TypeTag> = HashSet::new();
        let mut stack = vec![candidate];
        while let Some(t) = stack.pop() {
            for &sup in self.supertypes_of(t) {
                if sup == requested {
                    return true;
                }
                if seen.insert(sup) {
                    stack.push(sup);
                }
            }
        }
        false
    }

    /// Make `tag` known and name it by its short name. A short name already
    /// held by another type becomes ambiguous for both.
    fn insert(&mut self, tag: TypeTag) {
        self.supertypes.entry(tag).or_default();

        let name = tag.name();
        if !is_type_path(name) || self.ambiguous.contains(name) {
            return;
        }
        match self.names.get(name) {
            None => {
                self.names.insert(name.to_string(), tag);
            }
            Some(existing) if *existing != tag => {
                warn!(
                    type_name = name,
                    first = existing.qualified_name(),
                    second = tag.qualified_name(),
                    "type name is ambiguous; register the types under explicit names"
                );
                self.names.remove(name);
                self.ambiguous.insert(name.to_string());
            }
            Some(_) => {}
        }
    }

    fn bind_name(&mut self, name: &str, tag: TypeTag) -> Result<(), DefinitionError> {
        if !is_type_path(name) {
            return Err(DefinitionError::InvalidType {
                name: name.to_string(),
                reason: "not a plain type name".to_string(),
            });
        }
        if self.ambiguous.contains(name) {
            return Err(DefinitionError::InvalidType {
                name: name.to_string(),
                reason: "name is shared by several types".to_string(),
            });
        }
        if let Some(existing) = self.names.get(name) {
            if *existing != tag {
                return Err(DefinitionError::InvalidType {
                    name: name.to_string(),
                    reason: format!("name already registered for `{}`", existing.qualified_name()),
                });
            }
        }
        self.names.insert(name.to_string(), tag);
        self.supertypes.entry(tag).or_default();
        Ok(())
    }
}

/// A computed value tagged with its runtime type.
#[derive(Clone)]
pub struct Artifact {
    tag: TypeTag,
    value: Arc<dyn Any + Send + Sync>,
}

impl Artifact {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Artifact<{}>", self.tag)
    }
}
