use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::record::{Item, ItemPatch, NewItem};

/// Persistence seam for a resource module.
///
/// Implementations are constructed explicitly and handed to the resource
/// that owns them; there is no process-wide connection.
pub trait ItemStore: Send + Sync {
    fn list(&self) -> Vec<Item>;
    fn insert(&self, new: NewItem) -> Item;
    fn get(&self, id: &str) -> Option<Item>;
    fn update(&self, id: &str, patch: &ItemPatch) -> Option<Item>;
    fn delete(&self, id: &str) -> Option<Item>;
}

/// Store backed by an in-process map. Dropping it discards every record.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: Mutex<BTreeMap<String, Item>>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 24 hex chars: seconds since epoch followed by a per-store sequence.
    fn next_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let secs = Utc::now().timestamp().max(0) as u32;
        format!("{:08x}{:016x}", secs, seq)
    }
}

impl ItemStore for InMemoryStore {
    fn list(&self) -> Vec<Item> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<Item> = items.values().cloned().collect();
        // newest first
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        list
    }

    fn insert(&self, new: NewItem) -> Item {
        let now = Utc::now();
        let item = Item {
            id: self.next_id(),
            name: new.name.trim().to_string(),
            description: new.description,
            price: new.price,
            in_stock: new.in_stock.unwrap_or(true),
            quantity: new.quantity.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.id.clone(), item.clone());
        item
    }

    fn get(&self, id: &str) -> Option<Item> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.to_ascii_lowercase())
            .cloned()
    }

    fn update(&self, id: &str, patch: &ItemPatch) -> Option<Item> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let item = items.get_mut(&id.to_ascii_lowercase())?;
        patch.apply_to(item);
        item.updated_at = Utc::now();
        Some(item.clone())
    }

    fn delete(&self, id: &str) -> Option<Item> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.to_ascii_lowercase())
    }
}
