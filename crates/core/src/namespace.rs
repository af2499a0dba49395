//! Namespace codes
//!
//! Subjects, predicates and datatypes are stored as `(ns_code, name)`
//! pairs. Each ledger carries a code → IRI-prefix table. A commit may
//! introduce new codes; it never reassigns an existing one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code for the empty prefix (blank/relative IRIs)
pub const EMPTY: u16 = 0;
/// Code for JSON-LD keywords (`@id`, `@type`, ...)
pub const JSON_LD: u16 = 1;
/// Code for XML Schema datatypes
pub const XSD: u16 = 2;
/// Code for RDF
pub const RDF: u16 = 3;
/// Code for RDFS
pub const RDFS: u16 = 4;
/// First code available for user namespaces
pub const FIRST_USER_CODE: u16 = 100;

/// Namespace code → IRI prefix table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceCodes(BTreeMap<u16, String>);

impl Default for NamespaceCodes {
    fn default() -> Self {
        let mut codes = BTreeMap::new();
        codes.insert(EMPTY, String::new());
        codes.insert(JSON_LD, "@".to_string());
        codes.insert(XSD, "http://www.w3.org/2001/XMLSchema#".to_string());
        codes.insert(RDF, "http://www.w3.org/1999/02/22-rdf-syntax-ns#".to_string());
        codes.insert(RDFS, "http://www.w3.org/2000/01/rdf-schema#".to_string());
        NamespaceCodes(codes)
    }
}

impl NamespaceCodes {
    /// Table with only the built-in codes
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with no codes at all
    pub fn empty() -> Self {
        NamespaceCodes(BTreeMap::new())
    }

    /// Prefix for `code`
    pub fn get(&self, code: u16) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    /// Whether `code` is known
    pub fn contains(&self, code: u16) -> bool {
        self.0.contains_key(&code)
    }

    /// Register a code. Existing codes are never overwritten.
    ///
    /// Returns true if the code was new.
    pub fn insert(&mut self, code: u16, prefix: impl Into<String>) -> bool {
        if self.0.contains_key(&code) {
            return false;
        }
        self.0.insert(code, prefix.into());
        true
    }

    /// Code already assigned to `prefix`, if any
    pub fn code_for(&self, prefix: &str) -> Option<u16> {
        self.0
            .iter()
            .find(|(_, p)| p.as_str() == prefix)
            .map(|(code, _)| *code)
    }

    /// Merge another table in. Existing codes keep their prefix.
    ///
    /// Returns the number of codes added.
    pub fn merge(&mut self, delta: &NamespaceCodes) -> usize {
        let mut added = 0;
        for (code, prefix) in &delta.0 {
            if self.insert(*code, prefix.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Codes present here but not in `base`
    pub fn delta_from(&self, base: &NamespaceCodes) -> NamespaceCodes {
        NamespaceCodes(
            self.0
                .iter()
                .filter(|(code, _)| !base.contains(**code))
                .map(|(code, prefix)| (*code, prefix.clone()))
                .collect(),
        )
    }

    /// Number of codes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no codes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(code, prefix)` pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.0.iter().map(|(code, prefix)| (*code, prefix.as_str()))
    }
}
