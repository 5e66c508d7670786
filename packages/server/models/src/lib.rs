#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP request and response types for the parcel map server.
//!
//! All viewport parameters arrive as strings: Google Earth substitutes
//! literal placeholders into network link URLs before the first refresh, so
//! typed deserialization would reject requests that must instead degrade to
//! an empty document. Resolution to numbers happens in
//! [`parcel_map_geography::resolve_bbox`].

use parcel_map_geography::{BoundingBox, resolve_bbox};
use serde::{Deserialize, Serialize};

/// Query parameters for the `/kml` endpoint.
///
/// The combined bounding box is accepted under both casings Google Earth
/// emits (`BBOX` from its default `viewFormat`, `bbox` from the menu's
/// custom one); uppercase wins when both are present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmlQueryParams {
    /// Western bound in degrees.
    pub bbox_west: Option<String>,
    /// Southern bound in degrees.
    pub bbox_south: Option<String>,
    /// Eastern bound in degrees.
    pub bbox_east: Option<String>,
    /// Northern bound in degrees.
    pub bbox_north: Option<String>,
    /// Camera altitude in feet.
    pub eye_alt: Option<String>,
    /// Combined `west,south,east,north` fallback, uppercase casing.
    #[serde(rename = "BBOX")]
    pub bbox_upper: Option<String>,
    /// Combined `west,south,east,north` fallback, lowercase casing.
    #[serde(rename = "bbox")]
    pub bbox_lower: Option<String>,
    /// Comma-separated county names to include; all counties when unset.
    pub county: Option<String>,
}

impl KmlQueryParams {
    /// Resolves the viewport bounding box, discrete bounds first with the
    /// combined string as fallback.
    #[must_use]
    pub fn resolved_bbox(&self) -> Option<BoundingBox> {
        resolve_bbox(
            self.bbox_west.as_deref(),
            self.bbox_south.as_deref(),
            self.bbox_east.as_deref(),
            self.bbox_north.as_deref(),
            self.bbox_upper.as_deref().or(self.bbox_lower.as_deref()),
        )
    }

    /// Parses the camera altitude, treating malformed input as unset.
    #[must_use]
    pub fn eye_alt_ft(&self) -> Option<f64> {
        self.eye_alt
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

/// Query parameters for the `/diag` endpoint (no altitude gate; diagnostics
/// run the count gate for any resolvable viewport).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagQueryParams {
    /// Western bound in degrees.
    pub bbox_west: Option<String>,
    /// Southern bound in degrees.
    pub bbox_south: Option<String>,
    /// Eastern bound in degrees.
    pub bbox_east: Option<String>,
    /// Northern bound in degrees.
    pub bbox_north: Option<String>,
    /// Combined `west,south,east,north` fallback, uppercase casing.
    #[serde(rename = "BBOX")]
    pub bbox_upper: Option<String>,
    /// Combined `west,south,east,north` fallback, lowercase casing.
    #[serde(rename = "bbox")]
    pub bbox_lower: Option<String>,
    /// Comma-separated county names to include; all counties when unset.
    pub county: Option<String>,
}

impl DiagQueryParams {
    /// Resolves the viewport bounding box, discrete bounds first with the
    /// combined string as fallback.
    #[must_use]
    pub fn resolved_bbox(&self) -> Option<BoundingBox> {
        resolve_bbox(
            self.bbox_west.as_deref(),
            self.bbox_south.as_deref(),
            self.bbox_east.as_deref(),
            self.bbox_north.as_deref(),
            self.bbox_upper.as_deref().or(self.bbox_lower.as_deref()),
        )
    }
}

/// Query parameters for the `/menu` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuQueryParams {
    /// Base URL to embed in the network links, overriding the server's
    /// configured public address.
    pub base: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
