#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical parcel record types.
//!
//! County layers share no schema — field names for the same logical
//! attribute vary per county, so raw features are probed against ordered
//! candidate-field lists and normalized into these types before rendering.

use serde::{Deserialize, Serialize};

/// A position as `[longitude, latitude]` in WGS84 degrees.
pub type Position = [f64; 2];

/// One polygon of a parcel geometry: an outer ring plus any holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelPolygon {
    /// Outer boundary ring.
    pub outer: Vec<Position>,
    /// Inner boundary rings (holes).
    pub holes: Vec<Vec<Position>>,
}

/// A normalized parcel feature: probed attributes plus polygon geometry.
///
/// Every attribute except the parcel id is optional — counties publish
/// wildly different subsets of the land-information-record fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelRecord {
    /// Parcel identifier as published by the county (serial number,
    /// parcel number, or object id — whichever candidate field hit first).
    pub parcel_id: String,
    /// Situs street address.
    pub address: Option<String>,
    /// Situs city.
    pub city: Option<String>,
    /// Parcel area in acres.
    pub acres: Option<f64>,
    /// Total assessed market value in dollars.
    pub total_value: Option<f64>,
    /// Assessed land value in dollars.
    pub land_value: Option<f64>,
    /// Owner or taxpayer name.
    pub owner: Option<String>,
    /// Zoning label, where the layer publishes one.
    pub zoning: Option<String>,
    /// Parcel polygons (one for `Polygon` features, several for
    /// `MultiPolygon`).
    pub polygons: Vec<ParcelPolygon>,
}

/// Result of a count-only spatial query against one source.
///
/// Count failures are absorbed, not raised: a source that cannot be counted
/// reports zero with a message so the remaining sources still contribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCount {
    /// Number of features intersecting the envelope.
    pub count: u64,
    /// Error message when the count query failed or the service returned
    /// an error payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceCount {
    /// A successful count.
    #[must_use]
    pub const fn ok(count: u64) -> Self {
        Self { count, error: None }
    }

    /// A degraded count: zero features plus the failure description.
    #[must_use]
    pub const fn failed(message: String) -> Self {
        Self {
            count: 0,
            error: Some(message),
        }
    }
}
