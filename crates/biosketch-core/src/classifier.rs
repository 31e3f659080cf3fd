//! Offline intent classification: plain substring search over the catalog tables.

use crate::catalog::{Catalog, SymptomEntry};

/// Keyword mode: every table keyword contained in the transcript, in declaration order.
#[derive(Debug, Clone)]
pub struct KeywordClassifier<'a> {
    catalog: &'a Catalog,
}

impl<'a> KeywordClassifier<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Drawing keys for all matches. Duplicate categories are kept once.
    pub fn detect(&self, transcript: &str) -> Vec<String> {
        let lower = transcript.to_lowercase();
        let mut found: Vec<String> = Vec::new();
        for entry in &self.catalog.keywords {
            if lower.contains(entry.keyword.as_str()) && !found.contains(&entry.category) {
                found.push(entry.category.clone());
            }
        }
        found
    }
}

/// Symptom mode: the first entry with any keyword in the transcript, otherwise `general`.
#[derive(Debug, Clone)]
pub struct SymptomClassifier<'a> {
    catalog: &'a Catalog,
}

impl<'a> SymptomClassifier<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn classify(&self, transcript: &str) -> &'a SymptomEntry {
        let lower = transcript.to_lowercase();
        self.catalog
            .symptoms
            .iter()
            .find(|s| s.keywords.iter().any(|k| lower.contains(k.as_str())))
            .unwrap_or(&self.catalog.general)
    }
}
