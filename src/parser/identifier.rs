//! Validated identifiers
//!
//! An [`Identifier`] is the only way to name a variable. User-written names
//! must match `[A-Za-z_][A-Za-z0-9_]*` and stay within
//! [`MAX_IDENTIFIER_LEN`]; synthetic names for temporaries and heap blocks
//! start with a `$` prefix that no user name can contain.

use crate::interpreter::constants::{HEAP_PREFIX, MAX_IDENTIFIER_LEN, TEMP_PREFIX};
use crate::interpreter::errors::{MachineError, Result};
use std::borrow::Borrow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a user-supplied name
    pub fn new(name: &str) -> Result<Self> {
        if Self::is_valid(name) {
            Ok(Identifier(name.to_string()))
        } else {
            Err(MachineError::InvalidIdentifier(name.to_string()))
        }
    }

    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        first_ok
            && name.len() <= MAX_IDENTIFIER_LEN
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub(crate) fn temporary(serial: u64) -> Self {
        Identifier(format!("{}{}", TEMP_PREFIX, serial))
    }

    pub(crate) fn heap_block(serial: u64) -> Self {
        Identifier(format!("{}{}", HEAP_PREFIX, serial))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Heap blocks are recognised by name alone
    pub fn is_heap(&self) -> bool {
        self.0.starts_with(HEAP_PREFIX)
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(Identifier::new("x").is_ok());
        assert!(Identifier::new("_tmp9").is_ok());
        assert!(Identifier::new("camelCase_42").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            Identifier::new("9lives"),
            Err(MachineError::InvalidIdentifier(_))
        ));
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("a-b").is_err());
        assert!(Identifier::new("$heap0").is_err());
        assert!(Identifier::new(&"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn test_synthetic_prefixes() {
        let heap = Identifier::heap_block(3);
        assert_eq!(heap.as_str(), "$heap3");
        assert!(heap.is_heap());
        assert!(!heap.is_temporary());

        let temp = Identifier::temporary(0);
        assert!(temp.is_temporary());
        assert!(!temp.is_heap());
    }
}
