//! The session's rule registry, indexed by output type.
//!
//! Lookup order: buckets (one per distinct output type) are visited in the
//! order their output type was first registered; rules inside a bucket come in
//! registration order. With inheritance, a request for `T` visits every bucket
//! whose output type is `T` or a declared subtype of `T`.

use crate::error::{DefinitionError, RuleError};
use crate::rules::rule::{Rule, RuleFn, RuleInputs, Signature};
use crate::rules::types::{Artifact, TypeRegistry, TypeTag};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct RuleSet {
    types: TypeRegistry,
    rules: Vec<Rule>,
    // Derived from `rules`: (output type, indices into `rules`).
    buckets: Vec<(TypeTag, Vec<usize>)>,
    bucket_of: HashMap<TypeTag, usize>,
}

impl RuleSet {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            ..Self::default()
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn add_rule(&mut self, rule: Rule) {
        let output = rule.output_type();
        let idx = self.rules.len();

        let bucket = match self.bucket_of.get(&output) {
            Some(&b) => b,
            None => {
                self.buckets.push((output, Vec::new()));
                self.bucket_of.insert(output, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[bucket].1.push(idx);

        debug!(rule = %rule, "registered rule");
        self.rules.push(rule);
    }

    /// Build a rule against this set's types and add it.
    pub fn register(&mut self, signature: &Signature, function: RuleFn) -> Result<(), DefinitionError> {
        let rule = Rule::of(&self.types, signature, function)?;
        self.add_rule(rule);
        Ok(())
    }

    /// All rules in registration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get_rules_for_output_type(
        &self,
        output_type: TypeTag,
        respect_inheritance: bool,
    ) -> impl Iterator<Item = &Rule> + '_ {
        self.buckets
            .iter()
            .filter(move |(produced, _)| {
                if respect_inheritance {
                    self.types.is_subtype(*produced, output_type)
                } else {
                    *produced == output_type
                }
            })
            .flat_map(move |(_, indices)| indices.iter().map(move |&i| &self.rules[i]))
    }

    /// Inheritance-aware lookup by Rust type.
    pub fn rules_for<T: Any>(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.get_rules_for_output_type(TypeTag::of::<T>(), true)
    }

    /// Rules producing `output_type` (or a subtype) whose inputs are all available.
    pub fn candidates<'a>(
        &'a self,
        output_type: TypeTag,
        available: &'a HashSet<TypeTag>,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.get_rules_for_output_type(output_type, true)
            .filter(move |rule| rule.matches_inputs(available))
    }

    pub fn apply(&self, rule: &Rule, inputs: &RuleInputs) -> Result<Artifact, RuleError> {
        rule.apply_to_inputs(inputs, &self.types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::rule::RuleArgs;
    use pretty_assertions::assert_eq;

    fn rule1(args: &RuleArgs<'_>) -> anyhow::Result<Artifact> {
        Ok(Artifact::new(args.get::<i64>("a")?.to_string()))
    }

    fn rule2(args: &RuleArgs<'_>) -> anyhow::Result<Artifact> {
        Ok(Artifact::new(args.get::<String>("a")?.parse::<f64>()?))
    }

    fn rule3(args: &RuleArgs<'_>) -> anyhow::Result<Artifact> {
        Ok(Artifact::new(args.get::<f64>("a")? * 2.0))
    }

    fn three_rules() -> (RuleSet, Vec<Rule>) {
        let mut set = RuleSet::new(TypeRegistry::with_primitives());
        let rules = vec![
            Rule::parse(set.types(), "rule1(a: i64) -> String", rule1).unwrap(),
            Rule::parse(set.types(), "rule2(a: String) -> f64", rule2).unwrap(),
            Rule::parse(set.types(), "rule3(a: f64) -> f64", rule3).unwrap(),
        ];
        for rule in &rules {
            set.add_rule(rule.clone());
        }
        (set, rules)
    }

    #[test]
    fn finds_rules_by_exact_output_type() {
        let (set, rules) = three_rules();
        let lookup = |tag: TypeTag| set.get_rules_for_output_type(tag, true).cloned().collect::<Vec<_>>();

        assert_eq!(lookup(TypeTag::of::<i64>()), vec![]);
        assert_eq!(lookup(TypeTag::of::<String>()), vec![rules[0].clone()]);
        assert_eq!(lookup(TypeTag::of::<f64>()), vec![rules[1].clone(), rules[2].clone()]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.rules(), rules.as_slice());
    }

    #[test]
    fn lookup_is_restartable() {
        let (set, _) = three_rules();
        let first: Vec<_> = set.get_rules_for_output_type(TypeTag::of::<f64>(), false).collect();
        let second: Vec<_> = set.get_rules_for_output_type(TypeTag::of::<f64>(), false).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    struct Output;
    struct Library;
    struct StaticLibrary;
    struct Binary;

    fn make_static(_: &RuleArgs<'_>) -> anyhow::Result<Artifact> {
        Ok(Artifact::new(StaticLibrary))
    }

    fn make_binary(_: &RuleArgs<'_>) -> anyhow::Result<Artifact> {
        Ok(Artifact::new(Binary))
    }

    fn make_library(_: &RuleArgs<'_>) -> anyhow::Result<Artifact> {
        Ok(Artifact::new(Library))
    }

    fn hierarchy() -> RuleSet {
        let mut types = TypeRegistry::with_primitives();
        types.register_subtype::<Library, Output>().unwrap();
        types.register_subtype::<StaticLibrary, Library>().unwrap();
        types.register_subtype::<Binary, Output>().unwrap();

        let mut set = RuleSet::new(types);
        set.register(&Signature::parse("make_static(srcs: String) -> StaticLibrary").unwrap(), make_static)
            .unwrap();
        set.register(&Signature::parse("make_binary(main: String) -> Binary").unwrap(), make_binary)
            .unwrap();
        set.register(&Signature::parse("make_library(n: i64) -> Library").unwrap(), make_library)
            .unwrap();
        set.register(&Signature::parse("make_static2(n: i64) -> StaticLibrary").unwrap(), make_static)
            .unwrap();
        set
    }

    fn names<'a>(rules: impl Iterator<Item = &'a Rule>) -> Vec<&'a str> {
        rules.map(Rule::name).collect()
    }

    #[test]
    fn inheritance_includes_subtype_buckets_in_first_registration_order() {
        let set = hierarchy();
        assert_eq!(
            names(set.rules_for::<Output>()),
            vec!["make_static", "make_static2", "make_binary", "make_library"]
        );
        assert_eq!(
            names(set.rules_for::<Library>()),
            vec!["make_static", "make_static2", "make_library"]
        );
        assert_eq!(names(set.rules_for::<Binary>()), vec!["make_binary"]);
    }

    #[test]
    fn without_inheritance_only_the_exact_bucket() {
        let set = hierarchy();
        assert_eq!(
            names(set.get_rules_for_output_type(TypeTag::of::<Library>(), false)),
            vec!["make_library"]
        );
        assert!(names(set.get_rules_for_output_type(TypeTag::of::<Output>(), false)).is_empty());
    }

    #[test]
    fn candidates_filter_on_available_inputs() {
        let set = hierarchy();
        let available: HashSet<TypeTag> = [TypeTag::of::<i64>()].into();
        assert_eq!(
            names(set.candidates(TypeTag::of::<Library>(), &available)),
            vec!["make_static2", "make_library"]
        );
    }

    #[test]
    fn subtype_result_satisfies_supertype_contract() {
        let set = hierarchy();
        let rule = Rule::parse(set.types(), "as_library(n: i64) -> Library", make_static).unwrap();
        let out = set.apply(&rule, &RuleInputs::new().with(Artifact::new(1i64))).unwrap();
        assert!(out.downcast_ref::<StaticLibrary>().is_some());

        let wrong = Rule::parse(set.types(), "as_library(n: i64) -> Library", make_binary).unwrap();
        let err = set.apply(&wrong, &RuleInputs::new().with(Artifact::new(1i64))).unwrap_err();
        assert!(matches!(err, RuleError::ContractViolated { expected: "Library", actual: "Binary", .. }));
    }

    #[test]
    fn duplicates_are_kept() {
        let (mut set, rules) = three_rules();
        set.add_rule(rules[0].clone());
        assert_eq!(set.rules_for::<String>().count(), 2);
    }
}
