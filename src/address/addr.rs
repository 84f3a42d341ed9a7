//! Target address: the directory a target lives in plus its name.
//!
//! Display form: `src/lib:core`  =>  Address { directory: "src/lib", name: "core" }
//!
//! The directory is normalized on construction so that `.`, `./` and the empty
//! string all name the current directory, and `./src/` equals `src`.

use crate::error::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    directory: String,
    name: String,
}

impl Address {
    /// The name must be non-empty and neither part may contain `:`, so that
    /// the display form always parses back.
    pub fn new(directory: impl AsRef<str>, name: impl Into<String>) -> Result<Self, AddressError> {
        let directory = directory.as_ref();
        let name = name.into();
        let invalid = |reason| AddressError::InvalidAddress {
            address: format!("{directory}:{name}"),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.contains(':') {
            return Err(invalid("name contains `:`"));
        }
        if directory.contains(':') {
            return Err(invalid("directory contains `:`"));
        }
        Ok(Self {
            directory: normalize_directory(directory),
            name,
        })
    }

    /// Parse the `directory:name` display form. An empty directory means `.`.
    pub fn of(s: &str) -> Result<Self, AddressError> {
        let invalid = |reason| AddressError::InvalidAddress {
            address: s.to_string(),
            reason,
        };

        let (directory, name) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected `directory:name`"))?;
        if name.contains(':') {
            return Err(invalid("more than one `:` separator"));
        }
        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        Self::new(directory, name)
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.directory, self.name)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::of(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::of(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Strip leading `./` and trailing `/`; the empty, `.` and `./` forms become `.`.
pub(crate) fn normalize_directory(directory: &str) -> String {
    let mut dir = directory;
    while let Some(rest) = dir.strip_prefix("./") {
        dir = rest;
    }

    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        // Only slashes left: that is the root, not the current directory.
        return if dir.starts_with('/') { "/" } else { "." }.to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_current_directory_forms() {
        for dir in ["", ".", "./", "././"] {
            assert_eq!(normalize_directory(dir), ".", "input {dir:?}");
        }
    }

    #[test]
    fn normalizes_relative_and_root_directories() {
        assert_eq!(normalize_directory("./src"), "src");
        assert_eq!(normalize_directory("src/"), "src");
        assert_eq!(normalize_directory("./src/sub/"), "src/sub");
        assert_eq!(normalize_directory("/"), "/");
        assert_eq!(normalize_directory("/bar/"), "/bar");
    }

    #[test]
    fn equal_after_normalization() {
        assert_eq!(Address::new("./src", "foo").unwrap(), Address::new("src/", "foo").unwrap());
        assert_eq!(Address::new("./", "foo").unwrap(), Address::new(".", "foo").unwrap());
    }

    #[test]
    fn parses_display_form() {
        let addr = Address::of("test:a").unwrap();
        assert_eq!(addr.directory(), "test");
        assert_eq!(addr.name(), "a");
        assert_eq!(addr.to_string(), "test:a");

        assert_eq!(Address::of(":a").unwrap(), Address::new(".", "a").unwrap());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "test", "test:", "a:b:c"] {
            assert!(Address::of(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn serde_uses_display_form() {
        let addr: Address = serde_json::from_str("\"./src:core\"").unwrap();
        assert_eq!(addr, Address::new("src", "core").unwrap());
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"src:core\"");
        assert!(serde_json::from_str::<Address>("\"nocolon\"").is_err());
    }

    #[test]
    fn new_rejects_what_the_display_form_cannot_carry() {
        assert!(Address::new("src", "").is_err());
        assert!(Address::new("src", "a:b").is_err());
        assert!(Address::new("x:y", "a").is_err());
    }

    #[test]
    fn constructed_addresses_survive_serde() {
        for (dir, name) in [("", "a"), ("./src/", "core"), ("/", "root"), ("a/b/c", "x_y")] {
            let addr = Address::new(dir, name).unwrap();
            assert_eq!(Address::of(&addr.to_string()).unwrap(), addr);
            let json = serde_json::to_string(&addr).unwrap();
            assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
        }
    }
}
