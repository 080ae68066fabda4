//! Registry of known recipients: display name → contact address.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name → contact mapping that remembers insertion order.
///
/// Lookups do not depend on order; the order only decides which name wins
/// when two names score equally against extracted text. Serialized as a JSON
/// object, and deserialization keeps the object's key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: IndexMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced name keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, contact: impl Into<String>) {
        self.entries.insert(name.into(), contact.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, contact)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }
}

impl<N: Into<String>, C: Into<String>> FromIterator<(N, C)> for Registry {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, contact)| (name.into(), contact.into()))
                .collect(),
        }
    }
}
