//! Sparse update objects
//!
//! Every field is optional; a patch is empty when all fields are `None`.

use super::remote::{CategoryRef, RemoteImage, RemoteTag};
use crate::types::RemoteId;
use serde::{Deserialize, Serialize};

/// Per-axis dimension changes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DimensionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

impl DimensionsPatch {
    /// True when no axis changes
    pub fn is_empty(&self) -> bool {
        self.length.is_none() && self.width.is_none() && self.height.is_none()
    }
}

/// Fields of a remote product that must change
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<RemoteTag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<RemoteImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<DimensionsPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
}

impl ProductPatch {
    /// True when no field changes
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// `Some(self)` unless empty
    pub fn into_option(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }

    /// Names of the fields this patch touches
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |present: bool, name: &'static str| {
            if present {
                fields.push(name);
            }
        };
        mark(self.sku.is_some(), "sku");
        mark(self.name.is_some(), "name");
        mark(self.description.is_some(), "description");
        mark(self.tags.is_some(), "tags");
        mark(self.categories.is_some(), "categories");
        mark(self.stock_quantity.is_some(), "stock_quantity");
        mark(self.regular_price.is_some(), "regular_price");
        mark(self.images.is_some(), "images");
        mark(self.dimensions.is_some(), "dimensions");
        mark(self.weight.is_some(), "weight");
        fields
    }
}

/// Fields of a remote category that must change
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<RemoteId>,
}

impl CategoryPatch {
    /// True when nothing changes
    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
    }
}
