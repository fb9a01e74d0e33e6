//! Common types used throughout catalog-sync
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Remote catalog identifier
pub type RemoteId = u64;

/// Natural key -> remote ID lookup for categories
pub type CategoryIds = HashMap<String, RemoteId>;

// ============================================================================
// Entity Kind
// ============================================================================

/// Kind of catalog entity being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Product categories (reconciled first)
    Category,
    /// Products
    Product,
}

impl EntityKind {
    /// Plural label used in logs and summaries
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Category => f.write_str("category"),
            EntityKind::Product => f.write_str("product"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_labels() {
        assert_eq!(EntityKind::Category.to_string(), "category");
        assert_eq!(EntityKind::Product.plural(), "products");
    }
}
