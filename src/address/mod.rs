//! Addressing layer: target addresses and the spec sublanguage that selects them.

pub mod addr;
pub mod spec;

pub use addr::Address;
pub use spec::AddressSpec;
