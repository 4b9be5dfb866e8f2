//! Record normalizer - heterogeneous raw records to canonical catalog entries
//!
//! Field names in the upstream API have been renamed over time, so every
//! canonical field is resolved from an ordered alias list (first present wins).
//! Records without a usable hex value are dropped without error.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::category::{classify, Category};
use crate::color::{self, Rgb};

pub const ID_FIELDS: &[&str] = &["id", "_id", "sku"];
pub const PRODUCT_FIELDS: &[&str] = &["product", "product_name", "productName", "title", "brand"];
pub const NAME_FIELDS: &[&str] = &["color_name", "colorName", "color", "name"];
pub const CATEGORY_FIELDS: &[&str] = &["material", "filament_type", "type", "category"];
pub const URL_FIELDS: &[&str] = &["url", "product_url", "productUrl", "link", "href"];
pub const HEX_FIELDS: &[&str] = &["hex", "hex_code", "hexCode", "color_hex", "colorHex"];
pub const TD_FIELDS: &[&str] = &["transmission_distance", "td", "transmissionDistance"];

/// One normalized product color. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    id: String,
    product: String,
    name: String,
    category: Category,
    hex: String,
    url: String,
    #[serde(rename = "transmissionDistance")]
    transmission_distance: Option<String>,
}

impl CatalogEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transmission_distance(&self) -> Option<&str> {
        self.transmission_distance.as_deref()
    }

    /// Plottable channels; `None` for hex values that validate but do not parse
    pub fn rgb(&self) -> Option<Rgb> {
        color::parse_hex(&self.hex)
    }
}

/// Why a raw record produced no entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    NotAnObject,
    MissingHex,
    InvalidHex(String),
    Duplicate(String),
}

/// Result of normalizing one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Entry(CatalogEntry),
    Skipped(Skip),
}

/// Stateful normalizer: remembers ids seen during one run.
///
/// Records must be fed in source order for first-occurrence-wins dedup.
pub struct Normalizer {
    seen: HashSet<String>,
    fallback_url: String,
}

impl Normalizer {
    pub fn new(fallback_url: impl Into<String>) -> Self {
        Self {
            seen: HashSet::new(),
            fallback_url: fallback_url.into(),
        }
    }

    /// Number of distinct ids accepted so far
    pub fn accepted(&self) -> usize {
        self.seen.len()
    }

    pub fn normalize(&mut self, raw: &Value) -> Outcome {
        match self.build(raw) {
            Ok(entry) => Outcome::Entry(entry),
            Err(skip) => {
                tracing::trace!("Skipping record: {:?}", skip);
                Outcome::Skipped(skip)
            }
        }
    }

    /// Convenience: drop skips, keep entries
    pub fn entry(&mut self, raw: &Value) -> Option<CatalogEntry> {
        match self.normalize(raw) {
            Outcome::Entry(entry) => Some(entry),
            Outcome::Skipped(_) => None,
        }
    }

    fn build(&mut self, raw: &Value) -> Result<CatalogEntry, Skip> {
        let record = raw.as_object().ok_or(Skip::NotAnObject)?;

        let product = first_text(record, PRODUCT_FIELDS).unwrap_or_default();
        let name = first_text(record, NAME_FIELDS).unwrap_or_default();
        let material = first_text(record, CATEGORY_FIELDS).unwrap_or_default();
        let url = first_text(record, URL_FIELDS).unwrap_or_else(|| self.fallback_url.clone());
        let transmission_distance = transmission_distance(record);

        let raw_hex = first_text(record, HEX_FIELDS).ok_or(Skip::MissingHex)?;
        let hex = normalize_hex(&raw_hex).ok_or(Skip::InvalidHex(raw_hex))?;

        // An anonymous record derives "", so only the first one survives dedup
        let id = match first_text(record, ID_FIELDS) {
            Some(id) => id,
            None => derive_id(&product, &name),
        };
        if !self.seen.insert(id.clone()) {
            return Err(Skip::Duplicate(id));
        }

        let category = classify(&material, &product);

        Ok(CatalogEntry {
            id,
            product,
            name,
            category,
            hex,
            url,
            transmission_distance,
        })
    }
}

/// Text of a scalar field. Empty strings and non-scalars count as absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(record: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| record.get(*f).and_then(text))
}

/// `transmission_distance` if the key carries a value, else `td`.
/// Empty and literal "null" mean absent.
fn transmission_distance(record: &Map<String, Value>) -> Option<String> {
    let value = TD_FIELDS
        .iter()
        .find_map(|f| record.get(*f).filter(|v| !v.is_null()))?;
    text(value).filter(|s| s != "null")
}

/// Trim, add a leading `#` when missing, validate
pub fn normalize_hex(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let hex = if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{}", trimmed)
    };
    color::is_valid_hex(&hex).then_some(hex)
}

/// Lowercased ASCII alphanumerics of product followed by color name.
/// Everything else, accented letters included, is dropped.
pub fn derive_id(product: &str, name: &str) -> String {
    product
        .chars()
        .chain(name.chars())
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
