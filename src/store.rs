//! Loaded metadata for the active file plus the pending-edit overlay.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::tags;
use crate::value::{MetaValue, RawMetadata};

#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    raw: RawMetadata,
    pending: BTreeMap<String, String>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot wholesale. Pending edits belong to the previous
    /// snapshot and are dropped.
    pub fn load(&mut self, raw: RawMetadata) {
        debug!("Loaded {} metadata entries", raw.len());
        self.raw = raw;
        self.pending.clear();
    }

    /// Record an edit. The key must already be present or be one of the
    /// known addable tags.
    pub fn stage(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let known = self.raw.contains_key(key) || tags::is_addable(key);
        if !tags::is_valid_key(key) || !known {
            return Err(Error::UnknownField(key.to_string()));
        }
        self.pending.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Pending value if one is staged, otherwise the loaded one.
    pub fn effective_value(&self, key: &str) -> Option<MetaValue> {
        match self.pending.get(key) {
            Some(v) => Some(MetaValue::String(v.clone())),
            None => self.raw.get(key).cloned(),
        }
    }

    pub fn has_pending_edits(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &BTreeMap<String, String> {
        &self.pending
    }

    /// Pending edits that a save actually sends.
    pub fn writable_pending(&self) -> BTreeMap<String, String> {
        self.pending
            .iter()
            .filter(|(k, _)| !tags::is_read_only_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn raw(&self) -> &RawMetadata {
        &self.raw
    }

    /// Raw snapshot with pending edits laid over it, for display.
    pub fn effective_metadata(&self) -> RawMetadata {
        let mut merged = self.raw.clone();
        for (k, v) in &self.pending {
            merged.insert(k.clone(), MetaValue::String(v.clone()));
        }
        merged
    }
}
