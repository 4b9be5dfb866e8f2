//! Response decoder - locate the record array inside an arbitrary JSON document
//!
//! The upstream response shape is not stable. The decoder runs an ordered
//! list of probes and stops at the first one that finds records.

use serde_json::{Map, Value};

/// One decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The document itself is an array
    TopLevelArray,
    /// An array-valued property under a conventional key
    Key(&'static str),
    /// An object whose values are product-like objects
    RecordMap,
}

/// Probe order
pub const PROBES: &[Probe] = &[
    Probe::TopLevelArray,
    Probe::Key("data"),
    Probe::Key("products"),
    Probe::Key("items"),
    Probe::RecordMap,
];

/// Keys that mark an object as a product record
pub const PRODUCT_KEYS: &[&str] = &["name", "color", "color_name", "hex", "hex_code", "color_hex"];

/// Outcome of decoding
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    Found { probe: Probe, records: Vec<Value> },
    NotFound,
}

impl Located {
    pub fn records(self) -> Option<Vec<Value>> {
        match self {
            Located::Found { records, .. } => Some(records),
            Located::NotFound => None,
        }
    }
}

impl Probe {
    fn attempt(self, value: &Value) -> Option<Vec<Value>> {
        match self {
            Probe::TopLevelArray => value.as_array().cloned(),
            Probe::Key(key) => value.as_object()?.get(key)?.as_array().cloned(),
            Probe::RecordMap => record_map(value.as_object()?),
        }
    }
}

/// `Some(n)` when `key` is a canonical array index ("0", "17", not "007")
fn array_index(key: &str) -> Option<u32> {
    key.parse::<u32>().ok().filter(|n| n.to_string() == key)
}

/// Values in object-key order: array indices ascending, then the remaining
/// keys in the order they appeared.
fn ordered_values(object: &Map<String, Value>) -> Vec<&Value> {
    let mut indexed: Vec<(u32, &Value)> = object
        .iter()
        .filter_map(|(k, v)| array_index(k).map(|n| (n, v)))
        .collect();
    indexed.sort_by_key(|&(n, _)| n);

    indexed
        .into_iter()
        .map(|(_, v)| v)
        .chain(object.iter().filter(|(k, _)| array_index(k).is_none()).map(|(_, v)| v))
        .collect()
}

fn record_map(object: &Map<String, Value>) -> Option<Vec<Value>> {
    let values = ordered_values(object);
    let first = values.first()?.as_object()?;
    if PRODUCT_KEYS.iter().any(|k| first.contains_key(*k)) {
        Some(values.into_iter().cloned().collect())
    } else {
        None
    }
}

/// Find the raw record list inside `value`
pub fn locate_records(value: &Value) -> Located {
    for &probe in PROBES {
        if let Some(records) = probe.attempt(value) {
            tracing::debug!("Located {} records via {:?}", records.len(), probe);
            return Located::Found { probe, records };
        }
    }
    Located::NotFound
}
