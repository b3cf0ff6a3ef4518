//! Value cache
//!
//! Holds the last known value and the metadata of every value slot. Each
//! slot is updated on its own; readers see either the old or the new value,
//! never a mix.

use cc_protocol::{Value, ValueId, ValueMetadata, ValueUpdate};
use dashmap::DashMap;

/// Cache key: node plus the slot address within that node
pub type CacheKey = (u16, ValueId);

#[derive(Debug, Default)]
pub struct ValueCache {
    values: DashMap<CacheKey, Value>,
    metadata: DashMap<CacheKey, ValueMetadata>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node_id: u16, id: &ValueId) -> Option<Value> {
        self.values
            .get(&(node_id, id.clone()))
            .map(|v| v.value().clone())
    }

    pub fn set(&self, node_id: u16, id: ValueId, value: Value) {
        self.values.insert((node_id, id), value);
    }

    pub fn apply(&self, node_id: u16, updates: Vec<ValueUpdate>) {
        for update in updates {
            self.set(node_id, update.id, update.value);
        }
    }

    pub fn metadata(&self, node_id: u16, id: &ValueId) -> Option<ValueMetadata> {
        self.metadata
            .get(&(node_id, id.clone()))
            .map(|m| m.value().clone())
    }

    pub fn has_metadata(&self, node_id: u16, id: &ValueId) -> bool {
        self.metadata.contains_key(&(node_id, id.clone()))
    }

    /// Store metadata unless the slot already has some. Returns whether it
    /// was stored.
    pub fn set_metadata_if_absent(&self, node_id: u16, id: ValueId, metadata: ValueMetadata) -> bool {
        match self.metadata.entry((node_id, id)) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(metadata);
                true
            }
        }
    }

    /// All cached values of a node, sorted by slot
    pub fn values_for_node(&self, node_id: u16) -> Vec<(ValueId, Value)> {
        let mut values: Vec<_> = self
            .values
            .iter()
            .filter(|entry| entry.key().0 == node_id)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
