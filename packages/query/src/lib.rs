#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Viewport-driven parcel query pipeline.
//!
//! [`ParcelQuery::run`] drives one request end to end, short-circuiting at
//! each gate: bounding box resolution, viewport level-of-detail gates, the
//! feature-count guard, then sequential per-source paginated fetching and
//! normalization. Policy rejections (missing bbox, too-wide view, too many
//! features) are successful outcomes with marker payloads, never errors.

use std::time::Duration;

use parcel_map_geography::{BoundingBox, Envelope};
use parcel_map_source::normalize::normalize_feature;
use parcel_map_source::{SourceDefinition, SourceError, arcgis};
use parcel_map_source_models::{ParcelRecord, SourceCount};

/// Fixed, immutable pipeline configuration.
///
/// Passed in at construction so tests can vary thresholds; never mutated
/// afterwards.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Maximum camera altitude in feet. Views from higher up are rejected
    /// before any remote call.
    pub max_eye_alt_ft: f64,
    /// Maximum viewport width/height in degrees (~5-7 km at Utah
    /// latitudes). Wider views are rejected before any remote call.
    pub max_view_span_deg: f64,
    /// Maximum summed feature count per request. Protects both the county
    /// services and the viewer from unbounded payloads.
    pub max_features: u64,
    /// Records per feature-query page.
    pub page_size: u64,
    /// Per-call timeout for count queries.
    pub count_timeout: Duration,
    /// Per-call timeout for feature-page queries.
    pub page_timeout: Duration,
    /// Stable container identifier, so a repeated request replaces the
    /// previously rendered container in the viewer instead of piling up.
    pub container_id: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_eye_alt_ft: 15_000.0,
            max_view_span_deg: 0.065,
            max_features: 5_000,
            page_size: 1_000,
            count_timeout: Duration::from_secs(20),
            page_timeout: Duration::from_secs(30),
            container_id: "active-parcels".to_string(),
        }
    }
}

/// All normalized parcels fetched from one source, in fetch order.
#[derive(Debug, Clone)]
pub struct SourceParcels {
    /// The source the parcels came from (carries display name and link
    /// templates for rendering).
    pub source: SourceDefinition,
    /// Normalized parcel records, preserving upstream order.
    pub records: Vec<ParcelRecord>,
}

/// Terminal outcome of one query pipeline run.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// No bounding box resolved, the viewport gates rejected the view, or
    /// the source filter matched nothing worth fetching. Renders as an
    /// empty, well-formed document.
    Empty,
    /// The summed feature count tripped the guard before any geometry was
    /// fetched.
    TooMany {
        /// Running total at the moment the guard tripped.
        total: u64,
        /// The configured maximum it exceeded.
        max: u64,
    },
    /// Parcels fetched from every selected source, in source-list order.
    Parcels(Vec<SourceParcels>),
}

/// Whether a running feature total has exceeded the cap.
///
/// A total summing to exactly the cap still proceeds; the guard trips on
/// the first feature beyond it.
const fn over_limit(total: u64, max: u64) -> bool {
    total > max
}

/// The per-request pipeline plus its process-wide read-only inputs.
pub struct ParcelQuery {
    config: QueryConfig,
    sources: Vec<SourceDefinition>,
    client: reqwest::Client,
}

impl ParcelQuery {
    /// Creates a pipeline over the given sources.
    #[must_use]
    pub fn new(config: QueryConfig, sources: Vec<SourceDefinition>) -> Self {
        Self {
            config,
            sources,
            client: reqwest::Client::new(),
        }
    }

    /// The pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// All configured sources, in display order.
    #[must_use]
    pub fn sources(&self) -> &[SourceDefinition] {
        &self.sources
    }

    /// Selects the subset of sources named by a comma-separated,
    /// case-insensitive filter; all sources when no filter is given.
    ///
    /// An empty or whitespace-only filter names nothing and counts as no
    /// filter, so `county=` selects every source.
    #[must_use]
    pub fn select_sources(&self, filter: Option<&str>) -> Vec<&SourceDefinition> {
        let wanted: Vec<String> = filter
            .unwrap_or_default()
            .split(',')
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        if wanted.is_empty() {
            return self.sources.iter().collect();
        }
        self.sources
            .iter()
            .filter(|src| wanted.contains(&src.name.to_lowercase()))
            .collect()
    }

    /// Whether the viewport is close and narrow enough to query for.
    ///
    /// Far-away or too-wide views must not trigger spatial queries; they
    /// resolve to [`QueryOutcome::Empty`].
    #[must_use]
    pub fn viewport_allows(&self, bbox: BoundingBox, eye_alt_ft: Option<f64>) -> bool {
        if eye_alt_ft.is_some_and(|alt| alt > self.config.max_eye_alt_ft) {
            return false;
        }
        bbox.width() <= self.config.max_view_span_deg
            && bbox.height() <= self.config.max_view_span_deg
    }

    /// Runs the count gate for the diagnostics endpoint: one count per
    /// selected source, no short-circuit, no geometry.
    pub async fn counts(
        &self,
        bbox: BoundingBox,
        filter: Option<&str>,
    ) -> Vec<(String, SourceCount)> {
        let envelope = Envelope::from(bbox);
        let mut out = Vec::new();
        for src in self.select_sources(filter) {
            let count = arcgis::query_count(
                &self.client,
                &src.layer_url,
                &envelope,
                self.config.count_timeout,
            )
            .await;
            out.push((src.name.clone(), count));
        }
        out
    }

    /// Drives one request through the full pipeline.
    ///
    /// Sources are queried strictly sequentially — counts first across all
    /// selected sources with an incremental short-circuit, then feature
    /// pages — and per-source order is preserved in the result.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on the first hard failure (network error,
    /// timeout, or unparseable body) during feature paging. Count-query
    /// failures never surface here; they degrade to zero counts.
    pub async fn run(
        &self,
        bbox: Option<BoundingBox>,
        eye_alt_ft: Option<f64>,
        filter: Option<&str>,
    ) -> Result<QueryOutcome, SourceError> {
        let Some(bbox) = bbox else {
            log::debug!("no bbox resolved, returning empty document");
            return Ok(QueryOutcome::Empty);
        };
        if !self.viewport_allows(bbox, eye_alt_ft) {
            log::debug!(
                "viewport rejected: span {:.4}x{:.4} deg, eye {eye_alt_ft:?} ft",
                bbox.width(),
                bbox.height()
            );
            return Ok(QueryOutcome::Empty);
        }

        let sources = self.select_sources(filter);
        let envelope = Envelope::from(bbox);

        // Count guard: sum across sources, abort the moment the running
        // total exceeds the cap. Sources after the trip are never queried.
        let mut total: u64 = 0;
        for src in &sources {
            let result = arcgis::query_count(
                &self.client,
                &src.layer_url,
                &envelope,
                self.config.count_timeout,
            )
            .await;
            if let Some(message) = &result.error {
                log::warn!("{}: count query degraded: {message}", src.name);
            }
            total += result.count;
            if over_limit(total, self.config.max_features) {
                log::info!(
                    "count guard tripped at {total} features (max {})",
                    self.config.max_features
                );
                return Ok(QueryOutcome::TooMany {
                    total,
                    max: self.config.max_features,
                });
            }
        }

        let mut out = Vec::with_capacity(sources.len());
        for src in &sources {
            let features = arcgis::fetch_features(
                &self.client,
                &src.name,
                &src.layer_url,
                &envelope,
                self.config.page_size,
                self.config.page_timeout,
            )
            .await?;
            let records: Vec<ParcelRecord> = features
                .iter()
                .filter_map(|f| normalize_feature(f, &src.fields))
                .collect();
            if !records.is_empty() {
                log::info!("{}: {} parcels", src.name, records.len());
            }
            out.push(SourceParcels {
                source: (*src).clone(),
                records,
            });
        }

        Ok(QueryOutcome::Parcels(out))
    }
}
