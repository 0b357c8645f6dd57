//! Hierarchical permission matching.
//!
//! Permission strings are dot-separated, most general segment first, e.g.
//! `clinical.orders.create`. A grant can name a permission exactly or cover
//! a whole subtree with a trailing `*` segment.

use std::collections::HashSet;

/// The set of permission strings granted to a user session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet(HashSet<String>);

impl PermissionSet {
    /// Creates a permission set from any collection of grant strings.
    pub fn new(granted: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(granted.into_iter().map(Into::into).collect())
    }

    /// Adds a grant to the set.
    pub fn grant(&mut self, permission: impl Into<String>) {
        self.0.insert(permission.into());
    }

    /// Decides whether this set grants the required permission.
    ///
    /// `"*"` grants everything and an exact match grants. Otherwise, for a
    /// required permission `a.b.c`, any granted wildcard of the form
    /// `a.b.c.*`, `a.b.*`, or `a.*` grants, checked from the most specific
    /// prefix down to the least specific.
    pub fn grants(&self, required: &str) -> bool {
        if self.0.contains("*") || self.0.contains(required) {
            return true;
        }

        let segments: Vec<&str> = required.split('.').collect();
        for end in (1..=segments.len()).rev() {
            let wildcard = format!("{}.*", segments[..end].join("."));
            if self.0.contains(&wildcard) {
                return true;
            }
        }

        false
    }

    /// Returns true if no permissions are granted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
