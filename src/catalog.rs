//! Consumer-side catalog collection
//!
//! Holds the entries of one session in arrival order, computes the
//! visible-id set from category and search filters, and reads/writes the
//! flat JSON array export.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::category::Category;
use crate::decode::locate_records;
use crate::error::IngestError;
use crate::ingest::IngestSink;
use crate::normalize::{CatalogEntry, Normalizer};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

/// Which entries are shown
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// `None` shows every category
    pub categories: Option<BTreeSet<Category>>,
    /// Case-insensitive match on product, name or hex
    pub search: Option<String>,
}

impl Filter {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if let Some(categories) = &self.categories {
            if !categories.contains(&entry.category()) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [entry.product(), entry.name(), entry.hex()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; an id already present is ignored
    pub fn push(&mut self, entry: CatalogEntry) -> bool {
        if self.index.contains_key(entry.id()) {
            return false;
        }
        self.index.insert(entry.id().to_string(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn counts_by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.category()).or_insert(0) += 1;
        }
        counts
    }

    pub fn visible_ids(&self, filter: &Filter) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|e| filter.matches(e))
            .map(|e| e.id().to_string())
            .collect()
    }

    /// Flat JSON array using the canonical field names
    pub fn to_json(&self) -> Result<String, IngestError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<(), IngestError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        tracing::info!("Exported {} entries to {:?}", self.len(), path.as_ref());
        Ok(())
    }

    /// Rebuild from exported JSON. Entries go through the normalizer again.
    pub fn from_json(json: &str, fallback_url: &str) -> Result<Self, IngestError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let records = locate_records(&value)
            .records()
            .filter(|r| !r.is_empty())
            .ok_or(IngestError::EmptyCatalog)?;

        let mut normalizer = Normalizer::new(fallback_url);
        let mut catalog = Catalog::new();
        for raw in &records {
            if let Some(entry) = normalizer.entry(raw) {
                catalog.push(entry);
            }
        }

        if catalog.is_empty() {
            return Err(IngestError::NoValidEntries);
        }
        Ok(catalog)
    }

    pub fn import<P: AsRef<Path>>(path: P, fallback_url: &str) -> Result<Self, IngestError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&content, fallback_url)?;
        tracing::info!("Imported {} entries from {:?}", catalog.len(), path.as_ref());
        Ok(catalog)
    }
}

impl IngestSink for Catalog {
    fn on_entry(&mut self, entry: CatalogEntry) {
        self.push(entry);
    }

    fn on_progress(&mut self, status: &str, count: usize) {
        tracing::info!(count, "{}", status);
    }
}
