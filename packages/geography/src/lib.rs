#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bounding box and ArcGIS envelope types.
//!
//! All coordinates are WGS84 (EPSG:4326) degrees. Google Earth reports the
//! viewport in this reference and the upstream `FeatureServer` layers accept
//! it directly via `inSR`/`outSR`, so nothing is ever reprojected.

use serde::{Deserialize, Serialize};

/// WGS84 well-known id, passed through to ArcGIS as `inSR`/`outSR`.
pub const WGS84_WKID: u32 = 4326;

/// A geographic bounding box in WGS84 degrees.
///
/// No ordering is enforced between west/east or south/north — the upstream
/// service tolerates reversed bounds and span checks use absolute values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// East-west extent in degrees.
    #[must_use]
    pub fn width(&self) -> f64 {
        (self.east - self.west).abs()
    }

    /// North-south extent in degrees.
    #[must_use]
    pub fn height(&self) -> f64 {
        (self.north - self.south).abs()
    }
}

/// An axis-aligned envelope in ArcGIS JSON form, used as the `geometry`
/// parameter of spatial intersection queries.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Envelope {
    /// Minimum x (west).
    pub xmin: f64,
    /// Minimum y (south).
    pub ymin: f64,
    /// Maximum x (east).
    pub xmax: f64,
    /// Maximum y (north).
    pub ymax: f64,
    /// Coordinate reference of the envelope.
    #[serde(rename = "spatialReference")]
    pub spatial_reference: SpatialReference,
}

/// ArcGIS spatial reference wrapper.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SpatialReference {
    /// Well-known id of the coordinate reference system.
    pub wkid: u32,
}

impl From<BoundingBox> for Envelope {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            xmin: bbox.west,
            ymin: bbox.south,
            xmax: bbox.east,
            ymax: bbox.north,
            spatial_reference: SpatialReference { wkid: WGS84_WKID },
        }
    }
}

/// Parses one bound, treating anything that is not a finite number as unset.
///
/// Google Earth substitutes literal placeholder strings (e.g. `"[bboxWest]"`)
/// into network link URLs before the first view refresh, so malformed input
/// is entirely routine here.
fn parse_bound(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parses a combined `"west,south,east,north"` string into a [`BoundingBox`].
///
/// Requires exactly four comma-separated finite numbers; anything else is
/// `None`.
#[must_use]
pub fn parse_combined(s: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.len() == 4 && parts.iter().all(|v| v.is_finite()) {
        Some(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
    } else {
        None
    }
}

/// Resolves a bounding box from four discrete bound fields with a combined
/// `"west,south,east,north"` string as fallback.
///
/// When all four discrete bounds parse, they win regardless of the combined
/// string. If any discrete bound is missing or malformed, the combined
/// string is tried instead. A partially-parseable input never yields a
/// partial box — the result is all four bounds or `None`.
#[must_use]
pub fn resolve_bbox(
    west: Option<&str>,
    south: Option<&str>,
    east: Option<&str>,
    north: Option<&str>,
    combined: Option<&str>,
) -> Option<BoundingBox> {
    let discrete = (
        parse_bound(west),
        parse_bound(south),
        parse_bound(east),
        parse_bound(north),
    );
    if let (Some(w), Some(s), Some(e), Some(n)) = discrete {
        return Some(BoundingBox::new(w, s, e, n));
    }
    combined.and_then(parse_combined)
}
