//! Rules: typed transformation functions.
//!
//! A rule function takes its arguments through `RuleArgs` and returns an
//! `Artifact`. Which arguments it takes, and which type it promises to return,
//! is declared by a `Signature`, either built in code or written as text:
//!
//!   compile(srcs: SourceSet, flags: String) -> Library
//!
//! `Rule::of` resolves and validates the signature once, at registration.

use crate::error::{DefinitionError, RuleError};
use crate::ident::{is_identifier, is_type_path};
use crate::rules::types::{Artifact, TypeRegistry, TypeTag};
use regex::Regex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;
use tracing::trace;

pub type RuleFn = fn(&RuleArgs<'_>) -> anyhow::Result<Artifact>;

/// A parameter or output type as written by the rule author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Tag(TypeTag),
    /// Resolved through the `TypeRegistry` when the rule is built.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// `None` when the parameter was written without a type.
    pub ty: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
    output: Option<TypeRef>,
}

static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*)\s*\((.*)\)\s*(?:->\s*(.*?))?\s*$")
        .expect("signature regex")
});

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            output: None,
        }
    }

    pub fn param<T: Any>(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty: Some(TypeRef::Tag(TypeTag::of::<T>())),
        });
        self
    }

    pub fn param_named(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty: Some(TypeRef::Named(type_name.into())),
        });
        self
    }

    pub fn returns<T: Any>(mut self) -> Self {
        self.output = Some(TypeRef::Tag(TypeTag::of::<T>()));
        self
    }

    pub fn returns_named(mut self, type_name: impl Into<String>) -> Self {
        self.output = Some(TypeRef::Named(type_name.into()));
        self
    }

    /// Parse `name(a: A, b: B) -> C`. Types stay unresolved names; a parameter
    /// without `: Type` or a missing `-> Type` is kept as such and rejected
    /// later by `Rule::of`.
    pub fn parse(text: &str) -> Result<Self, DefinitionError> {
        let malformed = |reason: &str| DefinitionError::InvalidRule {
            rule: text.trim().to_string(),
            reason: reason.to_string(),
        };

        let caps = SIGNATURE_RE
            .captures(text)
            .ok_or_else(|| malformed("expected `name(param: Type, ...) -> Type`"))?;

        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let params_text = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let mut signature = Signature::new(name);
        for piece in split_top_level(params_text) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let (param_name, ty) = match piece.split_once(':') {
                Some((n, t)) => (n.trim(), Some(TypeRef::Named(t.trim().to_string()))),
                None => (piece, None),
            };
            if !is_identifier(param_name) {
                return Err(malformed(&format!("malformed parameter `{piece}`")));
            }
            signature.params.push(Param {
                name: param_name.to_string(),
                ty,
            });
        }

        signature.output = caps
            .get(3)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(|s| TypeRef::Named(s.to_string()));

        Ok(signature)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn output(&self) -> Option<&TypeRef> {
        self.output.as_ref()
    }
}

/// Split on commas that are not nested inside `<>`, `[]` or `()`. The `>` of
/// an arrow (`fn() -> T`) does not close anything.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = None;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' if prev == Some('-') => {}
            '>' | ']' | ')' => depth = (depth - 1).max(0),
            ',' if depth == 0 => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        prev = Some(c);
    }
    out.push(&s[start..]);
    out
}

/// A named transformation from typed inputs to one output type.
#[derive(Clone)]
pub struct Rule {
    name: String,
    // Declaration order is call order; names are unique.
    input_types: Vec<(String, TypeTag)>,
    output_type: TypeTag,
    function: RuleFn,
}

impl Rule {
    /// Build a rule from already-resolved types. The name may be a `::` path;
    /// parameter names must be identifiers.
    pub fn new(
        name: impl Into<String>,
        input_types: Vec<(String, TypeTag)>,
        output_type: TypeTag,
        function: RuleFn,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        if !is_type_path(&name) {
            return Err(DefinitionError::InvalidRule {
                reason: format!("`{name}` is not a valid rule name"),
                rule: name,
            });
        }
        let mut seen = HashSet::new();
        for (param, _) in &input_types {
            if !is_identifier(param) {
                return Err(DefinitionError::InvalidRule {
                    rule: name,
                    reason: format!("parameter name `{param}` is not an identifier"),
                });
            }
            if !seen.insert(param.as_str()) {
                return Err(DefinitionError::InvalidRule {
                    rule: name,
                    reason: format!("parameter `{param}` is declared twice"),
                });
            }
        }
        Ok(Self {
            name,
            input_types,
            output_type,
            function,
        })
    }

    pub fn of(
        types: &TypeRegistry,
        signature: &Signature,
        function: RuleFn,
    ) -> Result<Self, DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidRule {
            rule: signature.name.clone(),
            reason,
        };

        let output_type = match &signature.output {
            None => return Err(invalid("must have a return type".to_string())),
            Some(ty) => resolve(types, ty).map_err(|e| invalid(format!("return type {e}")))?,
        };

        let mut input_types = Vec::with_capacity(signature.params.len());
        for param in &signature.params {
            let Some(ty) = &param.ty else {
                return Err(invalid(format!(
                    "is missing a type for parameter `{}`",
                    param.name
                )));
            };
            let tag = resolve(types, ty)
                .map_err(|e| invalid(format!("parameter `{}` type {e}", param.name)))?;
            input_types.push((param.name.clone(), tag));
        }

        Self::new(signature.name.clone(), input_types, output_type, function)
    }

    /// `Signature::parse` followed by `Rule::of`.
    pub fn parse(
        types: &TypeRegistry,
        signature: &str,
        function: RuleFn,
    ) -> Result<Self, DefinitionError> {
        Self::of(types, &Signature::parse(signature)?, function)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_types(&self) -> &[(String, TypeTag)] {
        &self.input_types
    }

    pub fn output_type(&self) -> TypeTag {
        self.output_type
    }

    pub fn function(&self) -> RuleFn {
        self.function
    }

    pub fn matches_inputs(&self, available: &HashSet<TypeTag>) -> bool {
        self.input_types.iter().all(|(_, t)| available.contains(t))
    }

    /// Call the rule with the inputs of its parameter types and check that the
    /// result is an instance of the output type (or a declared subtype).
    pub fn apply_to_inputs(
        &self,
        inputs: &RuleInputs,
        types: &TypeRegistry,
    ) -> Result<Artifact, RuleError> {
        let mut bindings = Vec::with_capacity(self.input_types.len());
        for (param, tag) in &self.input_types {
            let artifact = inputs.get(*tag).ok_or_else(|| RuleError::MissingInput {
                rule: self.name.clone(),
                param: param.clone(),
                type_name: tag.name(),
            })?;
            bindings.push((param.as_str(), artifact));
        }

        trace!(rule = %self, "applying rule");
        let args = RuleArgs {
            rule: &self.name,
            bindings,
        };
        let result = (self.function)(&args).map_err(|source| RuleError::Failed {
            rule: self.name.clone(),
            source,
        })?;

        let actual = result.type_tag();
        if !types.is_subtype(actual, self.output_type) {
            // Same short name, different types: only the full paths tell them apart.
            let (expected, actual) = if actual.name() == self.output_type.name() {
                (self.output_type.qualified_name(), actual.qualified_name())
            } else {
                (self.output_type.name(), actual.name())
            };
            return Err(RuleError::ContractViolated {
                rule: self.name.clone(),
                expected,
                actual,
            });
        }
        Ok(result)
    }
}

fn resolve(types: &TypeRegistry, ty: &TypeRef) -> Result<TypeTag, String> {
    match ty {
        TypeRef::Tag(tag) => Ok(*tag),
        TypeRef::Named(name) if !is_type_path(name) => {
            Err(format!("`{name}` is not a concrete type"))
        }
        TypeRef::Named(name) if types.is_ambiguous(name) => Err(format!(
            "`{name}` is ambiguous: several registered types share that name"
        )),
        TypeRef::Named(name) => types
            .resolve(name)
            .ok_or_else(|| format!("`{name}` does not resolve to a registered type")),
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.input_types == other.input_types
            && self.output_type == other.output_type
            && std::ptr::fn_addr_eq(self.function, other.function)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (param, tag)) in self.input_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}: {tag}")?;
        }
        write!(f, ") -> {}", self.output_type)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule<{self}>")
    }
}

/// Arguments bound to a rule's parameters for one call.
pub struct RuleArgs<'a> {
    rule: &'a str,
    bindings: Vec<(&'a str, &'a Artifact)>,
}

impl<'a> RuleArgs<'a> {
    pub fn artifact(&self, param: &str) -> Option<&'a Artifact> {
        self.bindings
            .iter()
            .find(|(name, _)| *name == param)
            .map(|(_, artifact)| *artifact)
    }

    pub fn get<T: Any>(&self, param: &str) -> Result<&'a T, RuleError> {
        self.artifact(param)
            .and_then(|a| a.downcast_ref::<T>())
            .ok_or_else(|| RuleError::InvalidArgument {
                rule: self.rule.to_string(),
                param: param.to_string(),
                expected: TypeTag::of::<T>().name(),
            })
    }
}

/// Computed values available to a rule, keyed by type.
#[derive(Debug, Clone, Default)]
pub struct RuleInputs {
    values: HashMap<TypeTag, Artifact>,
}

impl RuleInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add under the artifact's own type, replacing any previous value.
    pub fn insert(&mut self, artifact: Artifact) -> Option<Artifact> {
        self.values.insert(artifact.type_tag(), artifact)
    }

    /// Add under a different key, e.g. a subtype value offered as its supertype.
    pub fn insert_as(&mut self, tag: TypeTag, artifact: Artifact) -> Option<Artifact> {
        self.values.insert(tag, artifact)
    }

    pub fn with(mut self, artifact: Artifact) -> Self {
        self.insert(artifact);
        self
    }

    pub fn get(&self, tag: TypeTag) -> Option<&Artifact> {
        self.values.get(&tag)
    }

    pub fn available_types(&self) -> HashSet<TypeTag> {
        self.values.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<Artifact> for RuleInputs {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        let mut inputs = Self::new();
        for artifact in iter {
            inputs.insert(artifact);
        }
        inputs
    }
}
