use regex::Regex;
use std::sync::LazyLock;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").expect("type path regex")
});

/// Field and target aliases are written as keywords in build descriptions.
pub(crate) fn is_identifier(s: &str) -> bool {
    IDENT_RE.is_match(s)
}

/// A plain (possibly `::`-qualified) type name without generic arguments.
pub(crate) fn is_type_path(s: &str) -> bool {
    PATH_RE.is_match(s)
}
