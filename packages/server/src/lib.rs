#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the parcel map.
//!
//! Serves live parcel KML for the Google Earth network-link workflow:
//! `/menu` hands out per-county network links, Google Earth re-queries
//! `/kml` with the current viewport whenever the camera stops, and `/diag`
//! exposes the raw count-gate results for a viewport.

pub mod handlers;

use parcel_map_query::ParcelQuery;

/// Shared application state.
pub struct AppState {
    /// The query pipeline plus its read-only source configuration.
    pub query: ParcelQuery,
    /// Public base URL advertised in `/menu` network links.
    pub base_url: String,
}
