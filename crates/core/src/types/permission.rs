//! Permission names.
//!
//! Permissions are identified by snake_case capability names such as
//! `view_firms` or `assign_roles`. The name is the stable key the
//! authorization gate checks against; the numeric row ID is incidental.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PermissionName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionNameError {
    /// The name is empty.
    #[error("permission name cannot be empty")]
    Empty,
    /// The name is too long.
    #[error("permission name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The name contains characters other than `a-z`, `0-9` and `_`.
    #[error("permission name may only contain lowercase letters, digits and underscores")]
    InvalidCharacter,
}

/// A validated permission name.
///
/// ```
/// use addressbook_core::PermissionName;
///
/// assert!(PermissionName::parse("view_firms").is_ok());
/// assert!(PermissionName::parse("View Firms").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PermissionName(String);

impl PermissionName {
    /// Maximum length of a permission name.
    pub const MAX_LENGTH: usize = 100;

    /// Parse and validate a permission name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, or contains anything
    /// besides lowercase ASCII letters, digits and underscores.
    pub fn parse(s: &str) -> Result<Self, PermissionNameError> {
        if s.is_empty() {
            return Err(PermissionNameError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(PermissionNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(PermissionNameError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Wrap a name that is already known to be valid (catalog constants,
    /// rows read back from the store).
    #[must_use]
    pub fn from_trusted(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PermissionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::borrow::Borrow<str> for PermissionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_style_names() {
        assert!(PermissionName::parse("view_firms").is_ok());
        assert!(PermissionName::parse("admin_panel").is_ok());
        assert!(PermissionName::parse("level2_access").is_ok());
    }

    #[test]
    fn test_parse_rejections() {
        assert_eq!(PermissionName::parse(""), Err(PermissionNameError::Empty));
        assert_eq!(
            PermissionName::parse("view-firms"),
            Err(PermissionNameError::InvalidCharacter)
        );
        assert_eq!(
            PermissionName::parse("ViewFirms"),
            Err(PermissionNameError::InvalidCharacter)
        );
        assert!(matches!(
            PermissionName::parse(&"a".repeat(101)),
            Err(PermissionNameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_borrow_allows_str_lookup_in_sets() {
        let set: std::collections::BTreeSet<PermissionName> =
            [PermissionName::from_trusted("view_firms")].into();
        assert!(set.contains("view_firms"));
        assert!(!set.contains("edit_firms"));
    }
}
