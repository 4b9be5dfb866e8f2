//! Filament Atlas
//!
//! Ingests a filament color catalog from an unreliable remote source,
//! normalizes it into canonical entries, and groups entries in RGB space
//! for level-of-detail display.
//!
//! Pipeline: [`acquire`] -> [`decode`] -> [`normalize`] -> [`ingest`] -> [`catalog`].
//! Independently: [`catalog`] + [`lod`] threshold -> [`cluster`].

pub mod acquire;
pub mod catalog;
pub mod category;
pub mod cluster;
pub mod color;
pub mod config;
pub mod decode;
pub mod error;
pub mod ingest;
pub mod lod;
pub mod logging;
pub mod normalize;

pub use catalog::{Catalog, Filter};
pub use category::Category;
pub use cluster::{cluster, Cluster};
pub use config::Config;
pub use error::{AccessError, IngestError};
pub use ingest::{IngestSink, Ingestor};
pub use normalize::CatalogEntry;
