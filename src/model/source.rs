//! Source feed records
//!
//! Field names follow the supplier feed verbatim; prices keep the exact
//! decimal text they arrived with.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use tracing::warn;

/// Decimal price carried as text.
///
/// On the wire it is a JSON number; the digits are validated as a number and
/// kept verbatim so no float rounding happens in transit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Price(String);

impl Price {
    /// Parse-validate `text` as a number and keep it verbatim
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let trimmed = text.trim();
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self(trimmed.to_string())),
            _ => Err(Error::InvalidNumber {
                value: text,
                message: "price is not a finite number".to_string(),
            }),
        }
    }

    /// The original decimal text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value
    pub fn value(&self) -> f64 {
        self.0.parse().unwrap_or_default()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let text = raw.get();
        if text.starts_with('"') {
            return Err(de::Error::custom(format!(
                "expected a JSON number for price, got {text}"
            )));
        }
        Price::parse(text).map_err(de::Error::custom)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let raw = RawValue::from_string(self.0.clone()).map_err(serde::ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

/// `"yes"`/`"no"` flags
mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let text = Option::<String>::deserialize(d)?;
        Ok(text.is_some_and(|t| t.eq_ignore_ascii_case("yes")))
    }

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "yes" } else { "no" })
    }
}

/// Timestamps without a zone, e.g. `2024-05-01T10:30:00.25`; `null` allowed
mod zoneless {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(text) if text.is_empty() || text == "null" => Ok(None),
            Some(text) => NaiveDateTime::parse_from_str(&text, FORMAT)
                .map(Some)
                .map_err(de::Error::custom),
        }
    }

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => s.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            None => s.serialize_none(),
        }
    }
}

/// A product record from the supplier feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceProduct {
    #[serde(rename = "Product_Number")]
    pub product_number: String,
    #[serde(rename = "Manufacturing_Part_Number")]
    pub part_number: String,
    #[serde(rename = "Short_Advertising_Description")]
    pub short_description: String,
    #[serde(rename = "Product_Description")]
    pub description: String,
    #[serde(rename = "BarCode")]
    pub barcode: String,
    #[serde(rename = "Product_Type")]
    pub product_type: String,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Available_Stock")]
    pub stock: i64,
    #[serde(rename = "Price_ex_Vat")]
    pub price: Price,
    #[serde(rename = "Date_Added", with = "zoneless")]
    pub date_added: Option<NaiveDateTime>,
    #[serde(rename = "Image_URL")]
    pub image_url: String,
    #[serde(rename = "Export_Date", with = "zoneless")]
    pub export_date: Option<NaiveDateTime>,
    #[serde(rename = "Serialized")]
    pub serialized: String,
    #[serde(rename = "ETA_Date", with = "zoneless")]
    pub eta_date: Option<NaiveDateTime>,
    #[serde(rename = "Non_Discount_Price_ex_Vat")]
    pub list_price: Price,
    #[serde(rename = "Discount_Quantity")]
    pub discount_quantity: i64,
    #[serde(rename = "Product_Discounted", with = "yes_no")]
    pub discounted: bool,
    #[serde(rename = "Each_Width")]
    pub width: f64,
    #[serde(rename = "Each_Height")]
    pub height: f64,
    #[serde(rename = "Each_Length")]
    pub length: f64,
    #[serde(rename = "Each_Weight")]
    pub weight: f64,
}

impl SourceProduct {
    /// Natural key
    pub fn key(&self) -> &str {
        &self.product_number
    }

    /// Image URL if one was supplied
    pub fn image(&self) -> Option<&str> {
        let url = self.image_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

/// Top-level feed document.
///
/// Records are decoded one at a time: a record that does not decode is
/// logged, counted in `rejected` and left out, the rest of the feed loads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceFeed {
    /// Products that decoded
    pub products: Vec<SourceProduct>,
    /// Records left out because they did not decode
    #[serde(skip)]
    pub rejected: usize,
}

#[derive(Deserialize)]
struct RawFeed {
    #[serde(default)]
    products: Vec<Box<RawValue>>,
}

impl SourceFeed {
    /// Parse a feed document; only a malformed document as a whole is an error
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawFeed = serde_json::from_slice(bytes)?;
        let mut feed = Self::default();
        for (position, record) in raw.products.iter().enumerate() {
            match serde_json::from_str::<SourceProduct>(record.get()) {
                Ok(product) => feed.products.push(product),
                Err(e) => {
                    let key = record_key(record).unwrap_or_else(|| format!("record #{position}"));
                    warn!(sku = %key, error = %e, "unreadable feed record skipped");
                    feed.rejected += 1;
                }
            }
        }
        Ok(feed)
    }
}

/// Product number of a record that failed to decode, when it has a readable one
pub(super) fn record_key(record: &RawValue) -> Option<String> {
    #[derive(Deserialize)]
    struct Key {
        #[serde(rename = "Product_Number")]
        product_number: String,
    }
    serde_json::from_str::<Key>(record.get())
        .ok()
        .map(|k| k.product_number)
        .filter(|k| !k.trim().is_empty())
}
