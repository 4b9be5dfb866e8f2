//! Material category classification
//!
//! Rules are tested in order and the first match wins. Order matters:
//! "PC" must come after the more specific polymer names.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "PLA")]
    Pla,
    #[serde(rename = "PETG")]
    Petg,
    #[serde(rename = "ABS")]
    Abs,
    #[serde(rename = "ASA")]
    Asa,
    #[serde(rename = "TPU")]
    Tpu,
    Nylon,
    #[serde(rename = "PC")]
    Pc,
    #[serde(rename = "PVB")]
    Pvb,
    Wood,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Pla,
        Category::Petg,
        Category::Abs,
        Category::Asa,
        Category::Tpu,
        Category::Nylon,
        Category::Pc,
        Category::Pvb,
        Category::Wood,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Pla => "PLA",
            Category::Petg => "PETG",
            Category::Abs => "ABS",
            Category::Asa => "ASA",
            Category::Tpu => "TPU",
            Category::Nylon => "Nylon",
            Category::Pc => "PC",
            Category::Pvb => "PVB",
            Category::Wood => "Wood",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive lookup by display name
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where a needle is searched
#[derive(Clone, Copy)]
enum Field {
    Either,
    Material,
    Name,
}

/// Ordered classification table
const RULES: &[(&str, Field, Category)] = &[
    ("PLA", Field::Either, Category::Pla),
    ("PETG", Field::Either, Category::Petg),
    ("ABS", Field::Either, Category::Abs),
    ("ASA", Field::Either, Category::Asa),
    ("TPU", Field::Either, Category::Tpu),
    ("FLEX", Field::Material, Category::Tpu),
    ("NYLON", Field::Material, Category::Nylon),
    ("PA6", Field::Material, Category::Nylon),
    ("PA12", Field::Material, Category::Nylon),
    ("NYLON", Field::Name, Category::Nylon),
    ("PC", Field::Either, Category::Pc),
    ("PVB", Field::Either, Category::Pvb),
    ("WOOD", Field::Either, Category::Wood),
];

/// Classify a raw material string and product name. Total: defaults to `Other`.
pub fn classify(material: &str, product: &str) -> Category {
    let material = material.to_uppercase();
    let product = product.to_uppercase();

    RULES
        .iter()
        .find(|(needle, field, _)| match field {
            Field::Either => material.contains(needle) || product.contains(needle),
            Field::Material => material.contains(needle),
            Field::Name => product.contains(needle),
        })
        .map(|&(_, _, category)| category)
        .unwrap_or(Category::Other)
}
