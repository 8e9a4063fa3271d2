//! The scanned item list, kept in a single storage slot.
//!
//! All records live under one key as a JSON array. Every mutation is a full
//! read followed by a full write of the array.

use tracing::debug;

use super::Storage;
use crate::error::Result;
use crate::item::ScannedItem;

/// Default storage key for the scanned item list.
pub const DEFAULT_STORAGE_KEY: &str = "scanned_items";

/// Ordered list of scanned items backed by one storage slot.
#[derive(Debug)]
pub struct ItemStore {
    storage: Storage,
    key: String,
}

impl ItemStore {
    /// Create an item store over `storage`, using `key` as the slot.
    #[must_use]
    pub fn new(storage: Storage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Get the storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Load every stored item, most recent first-time scan first.
    ///
    /// An absent slot is an empty list. A slot that does not hold a JSON
    /// array of items is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails or the slot is corrupt.
    pub fn get_all(&self) -> Result<Vec<ScannedItem>> {
        match self.storage.get_item(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Save `item`.
    ///
    /// An item whose id is already stored replaces that entry at its current
    /// position. A new id is inserted at the front.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read, parsed or written.
    pub fn save(&self, item: &ScannedItem) -> Result<()> {
        let mut items = self.get_all()?;

        if let Some(existing) = items.iter_mut().find(|i| i.id == item.id) {
            debug!(id = %item.id, "Replacing stored item in place");
            existing.clone_from(item);
        } else {
            debug!(id = %item.id, "Storing new item");
            items.insert(0, item.clone());
        }

        let raw = serde_json::to_string(&items)?;
        self.storage.set_item(&self.key, &raw)
    }

    /// Get the stored item with the given barcode.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read or parsed.
    pub fn get(&self, id: &str) -> Result<Option<ScannedItem>> {
        Ok(self.get_all()?.into_iter().find(|i| i.id == id))
    }

    /// Count stored items.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read or parsed.
    pub fn count(&self) -> Result<usize> {
        Ok(self.get_all()?.len())
    }

    /// Drop the whole slot.
    ///
    /// Returns `true` if there was anything to remove.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<bool> {
        self.storage.remove_item(&self.key)
    }
}
