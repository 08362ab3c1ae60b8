use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::ip::RangeTable;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub last_sync: Option<i64>,
    pub csv_hash: Option<String>,
    pub record_count: u64,
}

/// Holds the current range table and its import metadata. Importers build
/// a fresh table and install it atomically; readers take lock-free
/// snapshots and never block each other.
pub struct Catalog {
    table: ArcSwap<RangeTable>,
    meta: ArcSwap<Metadata>,
}

impl Catalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            table: ArcSwap::from_pointee(RangeTable::default()),
            meta: ArcSwap::from_pointee(Metadata::default()),
        })
    }

    pub fn table(&self) -> Arc<RangeTable> {
        self.table.load_full()
    }

    pub fn install(&self, table: RangeTable, meta: Metadata) {
        self.table.store(Arc::new(table));
        self.meta.store(Arc::new(meta));
    }

    pub fn metadata(&self) -> Arc<Metadata> {
        self.meta.load_full()
    }

    pub fn record_count(&self) -> u64 {
        self.meta.load().record_count
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    /// A catalog with no loaded ranges is not ready to serve lookups.
    pub fn is_ready(&self) -> bool {
        !self.is_empty()
    }
}
