//! Data model
//!
//! Two heterogeneous schemas meet here: the supplier feed ([`SourceProduct`])
//! and the remote catalog ([`RemoteProduct`], [`RemoteCategory`]). Patches
//! describe the minimal changes that move a remote record towards its source.

mod category;
mod patch;
mod remote;
mod source;

pub use category::{required_categories, CategoryRecord};
pub use patch::{CategoryPatch, DimensionsPatch, ProductPatch};
pub use remote::{
    CategoryRef, Dimensions, RemoteCategory, RemoteImage, RemoteProduct, RemoteTag, TermRef,
};
pub use source::{Price, SourceFeed, SourceProduct};

#[cfg(test)]
mod tests;
