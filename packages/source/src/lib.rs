#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! County parcel data sources.
//!
//! Each county is described entirely by a TOML config (layer URL, external
//! link templates, and candidate attribute fields) embedded at compile time
//! via the [`registry`]. A single ArcGIS REST implementation in [`arcgis`]
//! handles every source; [`normalize`] turns raw features into canonical
//! [`parcel_map_source_models::ParcelRecord`]s.

pub mod arcgis;
pub mod normalize;
pub mod registry;
pub mod source_def;

pub use source_def::{FieldMapping, SourceDefinition};

/// Errors that can occur while querying a parcel source.
///
/// These are the *hard* failures: a request-level network error or an
/// unparseable response body. Soft failures (an explicit ArcGIS error
/// payload) are handled in-band by the fetcher and count query instead of
/// surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (network error, timeout, or non-2xx status).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
