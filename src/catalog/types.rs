//! Product record types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::Handle;

/// Display metadata for one product, keyed by [`Handle`].
///
/// Field names follow the catalog export: `Handle`, `Title`, `Vendor`,
/// `Type`, `Variant Price` and `Image Src`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Join key with the index.
    #[serde(rename = "Handle")]
    pub handle: Handle,

    /// Product title.
    #[serde(rename = "Title", default, deserialize_with = "scalar_string")]
    pub title: Option<String>,

    /// Brand or manufacturer.
    #[serde(rename = "Vendor", default, deserialize_with = "scalar_string")]
    pub vendor: Option<String>,

    /// Product type, used as the category filter.
    #[serde(rename = "Type", default, deserialize_with = "scalar_string")]
    pub product_type: Option<String>,

    /// Price of the default variant.
    #[serde(
        rename = "Variant Price",
        default,
        deserialize_with = "price_from_number_or_string"
    )]
    pub price: Option<f64>,

    /// Image URL or path, surrounding whitespace removed.
    #[serde(rename = "Image Src", default, deserialize_with = "trimmed_string")]
    pub image_src: Option<String>,
}

impl ProductRecord {
    /// Creates a record with only a handle set.
    pub fn new(handle: impl Into<Handle>) -> Self {
        Self {
            handle: handle.into(),
            title: None,
            vendor: None,
            product_type: None,
            price: None,
            image_src: None,
        }
    }

    /// Sets the vendor.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Sets the product type.
    pub fn with_product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Catalog row as it appears in the source JSON, before the handle is
/// known to be present.
#[derive(Deserialize)]
pub(super) struct RawRecord {
    #[serde(rename = "Handle", default, deserialize_with = "scalar_string")]
    handle: Option<String>,
    #[serde(rename = "Title", default, deserialize_with = "scalar_string")]
    title: Option<String>,
    #[serde(rename = "Vendor", default, deserialize_with = "scalar_string")]
    vendor: Option<String>,
    #[serde(rename = "Type", default, deserialize_with = "scalar_string")]
    product_type: Option<String>,
    #[serde(
        rename = "Variant Price",
        default,
        deserialize_with = "price_from_number_or_string"
    )]
    price: Option<f64>,
    #[serde(rename = "Image Src", default, deserialize_with = "trimmed_string")]
    image_src: Option<String>,
}

impl RawRecord {
    /// Returns `None` if the handle is missing or empty.
    ///
    /// The handle is kept byte for byte: it must equal the handle the index
    /// was built with.
    pub(super) fn into_record(self) -> Option<ProductRecord> {
        let handle = self.handle.filter(|h| !h.is_empty())?;
        Some(ProductRecord {
            handle: Handle::new(handle),
            title: self.title,
            vendor: self.vendor,
            product_type: self.product_type,
            price: self.price,
            image_src: self.image_src,
        })
    }
}

/// Text form of a JSON scalar: strings as is, numbers and booleans
/// printed. Null, arrays and objects carry no text.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn price_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn trimmed_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).map(|s| s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_accepts_number_and_string() {
        let a: ProductRecord =
            serde_json::from_str(r#"{"Handle": "a", "Variant Price": 12.5}"#).unwrap();
        let b: ProductRecord =
            serde_json::from_str(r#"{"Handle": "b", "Variant Price": " 7.25 "}"#).unwrap();
        let c: ProductRecord =
            serde_json::from_str(r#"{"Handle": "c", "Variant Price": "n/a"}"#).unwrap();
        assert_eq!(a.price, Some(12.5));
        assert_eq!(b.price, Some(7.25));
        assert_eq!(c.price, None);
    }

    #[test]
    fn test_image_src_trimmed() {
        let r: ProductRecord =
            serde_json::from_str(r#"{"Handle": "a", "Image Src": "  https://cdn/x.jpg\n"}"#)
                .unwrap();
        assert_eq!(r.image_src.as_deref(), Some("https://cdn/x.jpg"));
    }

    #[test]
    fn test_missing_fields_default_to_none() {
        let r: ProductRecord = serde_json::from_str(r#"{"Handle": "a"}"#).unwrap();
        assert_eq!(r, ProductRecord::new("a"));
    }

    #[test]
    fn test_serializes_with_catalog_keys() {
        let r = ProductRecord::new("a").with_vendor("Acme");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["Handle"], "a");
        assert_eq!(json["Vendor"], "Acme");
        assert!(json["Type"].is_null());
    }

    #[test]
    fn test_raw_record_without_handle() {
        let raw: RawRecord = serde_json::from_str(r#"{"Title": "Mug"}"#).unwrap();
        assert!(raw.into_record().is_none());

        let raw: RawRecord = serde_json::from_str(r#"{"Handle": ""}"#).unwrap();
        assert!(raw.into_record().is_none());

        let raw: RawRecord = serde_json::from_str(r#"{"Handle": null}"#).unwrap();
        assert!(raw.into_record().is_none());
    }

    #[test]
    fn test_raw_record_keeps_handle_verbatim() {
        let raw: RawRecord = serde_json::from_str(r#"{"Handle": "mug-red "}"#).unwrap();
        let record = raw.into_record().unwrap();
        assert_eq!(record.handle.as_str(), "mug-red ");
    }

    #[test]
    fn test_non_string_scalars_become_text() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"Handle": 1042, "Title": true, "Vendor": 42, "Type": ["Mug"], "Variant Price": false}"#,
        )
        .unwrap();
        let record = raw.into_record().unwrap();
        assert_eq!(record.handle.as_str(), "1042");
        assert_eq!(record.title.as_deref(), Some("true"));
        assert_eq!(record.vendor.as_deref(), Some("42"));
        assert_eq!(record.product_type, None);
        assert_eq!(record.price, None);
    }
}
