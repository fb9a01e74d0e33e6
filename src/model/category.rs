//! Category hierarchy derived from the feed
//!
//! Each product contributes two levels: its top-level `Category` and its
//! `Product_Type`, which is a child of the former.

use super::source::SourceProduct;
use crate::types::RemoteId;
use std::collections::BTreeMap;

/// A category the remote catalog must contain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryRecord {
    /// Category name (natural key)
    pub name: String,
    /// Remote ID once matched or created
    pub id: Option<RemoteId>,
    /// Name of the parent category, if any
    pub parent_name: Option<String>,
    /// Remote ID of the parent, once resolved
    pub parent_id: Option<RemoteId>,
}

impl CategoryRecord {
    /// A top-level category
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A category nested under `parent`
    pub fn child(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_name: Some(parent.into()),
            ..Self::default()
        }
    }

    /// True when this category has a parent by name
    pub fn has_parent(&self) -> bool {
        self.parent_name.is_some()
    }

    /// True when a declared parent still lacks its remote ID
    pub fn awaiting_parent(&self) -> bool {
        self.has_parent() && self.parent_id.is_none()
    }
}

/// Collect the categories required by `products`, keyed by name.
///
/// A name used as a top-level category anywhere in the feed stays a root even
/// if it also appears as a product type. Blank names are ignored.
pub fn required_categories(products: &[SourceProduct]) -> BTreeMap<String, CategoryRecord> {
    let mut required: BTreeMap<String, CategoryRecord> = BTreeMap::new();

    for product in products {
        let top = product.category.trim();
        if !top.is_empty() {
            required.insert(top.to_string(), CategoryRecord::root(top));
        }
    }

    for product in products {
        let top = product.category.trim();
        let kind = product.product_type.trim();
        if kind.is_empty() || kind == top || required.contains_key(kind) {
            continue;
        }
        let record = if top.is_empty() {
            CategoryRecord::root(kind)
        } else {
            CategoryRecord::child(kind, top)
        };
        required.insert(kind.to_string(), record);
    }

    required
}
