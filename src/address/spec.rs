//! Address specs select sets of targets.
//!
//! Grammar: `[<directory>][:[<name>]]`, at most one `:`.
//!
//!   ":foo"     any directory, name `foo`
//!   "src:"     directory `src`, any name
//!   "src"      same as "src:"
//!   "src:foo"  exactly `src:foo`
//!   ":"        everything
//!
//! Directory matching is exact after normalization, never a prefix match.

use crate::address::addr::{Address, normalize_directory};
use crate::error::AddressError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressSpec {
    directory_part: Option<String>,
    name_part: Option<String>,
}

impl AddressSpec {
    /// Empty parts mean "match anything"; neither part may contain `:`.
    pub fn new(
        directory_part: Option<String>,
        name_part: Option<String>,
    ) -> Result<Self, AddressError> {
        for part in [&directory_part, &name_part].into_iter().flatten() {
            if part.contains(':') {
                return Err(AddressError::InvalidSpec {
                    spec: format!(
                        "{}:{}",
                        directory_part.as_deref().unwrap_or(""),
                        name_part.as_deref().unwrap_or("")
                    ),
                    reason: "part contains `:`",
                });
            }
        }
        Ok(Self {
            directory_part: directory_part.filter(|s| !s.is_empty()),
            name_part: name_part.filter(|s| !s.is_empty()),
        })
    }

    pub fn of(spec: &str) -> Result<Self, AddressError> {
        if spec.is_empty() {
            return Err(AddressError::InvalidSpec {
                spec: spec.to_string(),
                reason: "empty spec",
            });
        }

        let (directory, name) = spec.split_once(':').unwrap_or((spec, ""));
        if name.contains(':') {
            return Err(AddressError::InvalidSpec {
                spec: spec.to_string(),
                reason: "more than one `:` separator",
            });
        }

        Self::new(Some(directory.to_string()), Some(name.to_string()))
    }

    pub fn directory_part(&self) -> Option<&str> {
        self.directory_part.as_deref()
    }

    pub fn name_part(&self) -> Option<&str> {
        self.name_part.as_deref()
    }

    pub fn matches_all(&self) -> bool {
        self.directory_part.is_none() && self.name_part.is_none()
    }

    pub fn matches_address(&self, address: &Address) -> bool {
        if let Some(name) = &self.name_part {
            if name != address.name() {
                return false;
            }
        }
        if let Some(directory) = &self.directory_part {
            if normalize_directory(directory) != address.directory() {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for AddressSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.directory_part.as_deref().unwrap_or(""),
            self.name_part.as_deref().unwrap_or("")
        )
    }
}

impl FromStr for AddressSpec {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::of(s)
    }
}
