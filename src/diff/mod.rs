//! Schema conversion and diff engine
//!
//! Converts feed records into remote create payloads and computes the
//! minimal [`ProductPatch`](crate::model::ProductPatch) that brings an
//! existing remote product in line with its source. Measures tolerate small
//! float drift; prices compare numerically but keep their original text.

mod compare;
mod convert;

pub use compare::{diff_product, equals, EQUALS_TOLERANCE, PATCH_TOLERANCE};
pub use convert::{
    category_ref, convert_product, format_decimal, required_tags, validate_source,
    ConvertedProduct,
};

#[cfg(test)]
mod tests;
