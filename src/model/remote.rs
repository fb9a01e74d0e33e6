//! Remote catalog records
//!
//! Shapes follow the catalog REST API: numeric IDs assigned remotely,
//! dimensions and weight as strings, term references by ID or by name.
//! Empty fields are omitted when serialised so the same types double as
//! create payloads.

use crate::types::RemoteId;
use serde::{Deserialize, Serialize};

/// Reference to a taxonomy term (tag or category) by ID or by name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slug: String,
}

impl TermRef {
    /// Reference by remote ID
    pub fn by_id(id: RemoteId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Reference by name, resolved server-side
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Product tag
pub type RemoteTag = TermRef;

/// Product category reference
pub type CategoryRef = TermRef;

/// Product image: an existing media asset or a URL for the remote to upload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(rename = "src", skip_serializing_if = "String::is_empty")]
    pub href: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl RemoteImage {
    /// Reference an existing media asset
    pub fn asset(id: RemoteId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Reference a URL to be uploaded remotely
    pub fn url(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}

/// Package dimensions, stored remotely as strings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    pub length: String,
    pub width: String,
    pub height: String,
}

/// A product as stored in the remote catalog
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sku: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<RemoteTag>,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub product_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub regular_price: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<RemoteImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub weight: String,
}

impl RemoteProduct {
    /// Natural key
    pub fn key(&self) -> &str {
        &self.sku
    }
}

/// A product category as stored in the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<RemoteId>,
}

impl RemoteCategory {
    /// Natural key
    pub fn key(&self) -> &str {
        &self.name
    }

    /// Parent ID, treating the root marker `0` as no parent
    pub fn parent_id(&self) -> Option<RemoteId> {
        self.parent.filter(|id| *id != 0)
    }
}
