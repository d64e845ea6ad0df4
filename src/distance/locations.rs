use std::collections::HashMap;

use tracing::warn;

use crate::domain::address::address_key;
use crate::domain::types::LocationId;
use crate::error::{DispatchError, Result};

/// Address keys in matrix order. The first entry is the depot.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    keys: Vec<String>,
    index: HashMap<String, LocationId>,
}

impl LocationTable {
    /// Builds the table from `(street, zipcode)` pairs in import order.
    pub fn from_addresses<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table = Self::default();
        for (street, zipcode) in pairs {
            table.push(address_key(street, zipcode));
        }
        table
    }

    /// Keys are taken as already normalised.
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        let mut table = Self::default();
        for key in keys {
            table.push(key);
        }
        table
    }

    fn push(&mut self, key: String) {
        let id = LocationId(self.keys.len());
        if self.index.contains_key(&key) {
            warn!("Duplicate location {:?} at row {}, keeping the first", key, id.0);
        } else {
            self.index.insert(key.clone(), id);
        }
        self.keys.push(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn resolve(&self, address: &str) -> Result<LocationId> {
        self.index
            .get(address)
            .or_else(|| self.index.get(address.trim().to_uppercase().as_str()))
            .copied()
            .ok_or_else(|| DispatchError::UnknownLocation(address.to_string()))
    }

    pub fn contains(&self, address: &str) -> bool {
        self.resolve(address).is_ok()
    }

    pub fn key(&self, id: LocationId) -> &str {
        &self.keys[id.0]
    }

    pub fn depot(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }
}
