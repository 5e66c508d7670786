//! Shared ArcGIS REST API fetcher.
//!
//! Handles count-only and paginated feature queries against `FeatureServer`
//! layers with an envelope-intersection spatial filter. One implementation
//! serves every county; everything county-specific lives in the source
//! TOML configs.
//!
//! Failure handling is deliberately asymmetric. An explicit ArcGIS error
//! payload means the server is reachable and told us something is wrong:
//! count queries absorb it into a degraded [`SourceCount`] and feature
//! paging stops for that source while keeping what was already fetched.
//! A network failure, timeout, or unparseable body during feature paging
//! means we could not talk to the server at all and propagates as a
//! [`SourceError`] for the whole request.

use std::future::Future;
use std::time::Duration;

use parcel_map_geography::{Envelope, WGS84_WKID};
use parcel_map_source_models::SourceCount;
use serde_json::Value;

use crate::SourceError;

/// Queries a layer for the number of features intersecting the envelope
/// using `returnCountOnly=true`.
///
/// Never fails: any error (network, timeout, non-JSON body, or an ArcGIS
/// error payload) is reported as a zero count with a message so the
/// remaining sources still contribute to the aggregate.
pub async fn query_count(
    client: &reqwest::Client,
    layer_url: &str,
    envelope: &Envelope,
    timeout: Duration,
) -> SourceCount {
    let geometry = match serde_json::to_string(envelope) {
        Ok(g) => g,
        Err(e) => return SourceCount::failed(e.to_string()),
    };
    let in_sr = WGS84_WKID.to_string();

    let request = client
        .get(format!("{layer_url}/query"))
        .timeout(timeout)
        .query(&[
            ("f", "json"),
            ("where", "1=1"),
            ("geometry", geometry.as_str()),
            ("geometryType", "esriGeometryEnvelope"),
            ("inSR", in_sr.as_str()),
            ("spatialRel", "esriSpatialRelIntersects"),
            ("returnCountOnly", "true"),
        ]);

    let body: Value = match request.send().await {
        Ok(response) => match response.json().await {
            Ok(body) => body,
            Err(e) => return SourceCount::failed(e.to_string()),
        },
        Err(e) => return SourceCount::failed(e.to_string()),
    };

    parse_count_body(&body)
}

/// Interprets a count query response body.
fn parse_count_body(body: &Value) -> SourceCount {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("arcgis error");
        return SourceCount::failed(message.to_string());
    }
    SourceCount::ok(body.get("count").and_then(Value::as_u64).unwrap_or(0))
}

/// One parsed page of a feature query.
enum FeaturePage {
    /// Raw features plus the server's pagination signal.
    Records {
        /// Features in this page.
        batch: Vec<Value>,
        /// Whether more records exist beyond this page.
        exceeded_transfer_limit: bool,
    },
    /// The server returned an explicit error payload.
    ServerError(String),
}

/// Interprets a feature query response body.
///
/// ArcGIS sets `exceededTransferLimit: true` when more records exist beyond
/// this page. This is the canonical pagination signal — inferring "more
/// pages" from a full batch is unreliable because the server silently caps
/// results at its own `maxRecordCount`.
fn parse_feature_page(body: Value) -> FeaturePage {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("arcgis error");
        return FeaturePage::ServerError(message.to_string());
    }

    let exceeded_transfer_limit = body
        .get("exceededTransferLimit")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let batch = match body {
        Value::Object(mut map) => match map.remove("features") {
            Some(Value::Array(features)) => features,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    FeaturePage::Records {
        batch,
        exceeded_transfer_limit,
    }
}

/// Fetches all GeoJSON features intersecting the envelope from one layer,
/// following the `exceededTransferLimit` signal with `resultOffset`
/// pagination.
///
/// The offset advances by the number of records actually received, so short
/// pages are tolerated. An ArcGIS error payload mid-pagination stops this
/// source and returns whatever was already accumulated.
///
/// # Errors
///
/// Returns [`SourceError`] if a request fails at the network level, comes
/// back non-2xx, or the body is not JSON.
pub async fn fetch_features(
    client: &reqwest::Client,
    label: &str,
    layer_url: &str,
    envelope: &Envelope,
    page_size: u64,
    timeout: Duration,
) -> Result<Vec<Value>, SourceError> {
    let query_url = format!("{layer_url}/query");
    let geometry = serde_json::to_string(envelope)?;
    let sr = WGS84_WKID.to_string();
    let page_size = page_size.to_string();

    collect_pages(label, |offset| {
        let client = client.clone();
        let query_url = query_url.clone();
        let geometry = geometry.clone();
        let sr = sr.clone();
        let page_size = page_size.clone();
        async move {
            let offset = offset.to_string();
            let response = client
                .get(&query_url)
                .timeout(timeout)
                .query(&[
                    ("f", "geojson"),
                    ("where", "1=1"),
                    ("outFields", "*"),
                    ("geometry", geometry.as_str()),
                    ("geometryType", "esriGeometryEnvelope"),
                    ("inSR", sr.as_str()),
                    ("spatialRel", "esriSpatialRelIntersects"),
                    ("returnGeometry", "true"),
                    ("outSR", sr.as_str()),
                    ("resultRecordCount", page_size.as_str()),
                    ("resultOffset", offset.as_str()),
                ])
                .send()
                .await?;
            let body: Value = response.error_for_status()?.json().await?;
            Ok(body)
        }
    })
    .await
}

/// Accumulates feature pages from a provider until the server stops
/// signalling more records.
///
/// `next_page` is called with the result offset for each page. The offset
/// advances by the number of records actually received, so short pages are
/// tolerated. A page with an ArcGIS error payload stops accumulation and
/// keeps the earlier pages; a provider error propagates.
async fn collect_pages<F, Fut>(label: &str, mut next_page: F) -> Result<Vec<Value>, SourceError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Value, SourceError>>,
{
    let mut features: Vec<Value> = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let body = next_page(offset).await?;

        match parse_feature_page(body) {
            FeaturePage::ServerError(message) => {
                // Keep what we have; an explicit error payload must not
                // silently discard earlier pages from this source.
                log::warn!("{label}: ArcGIS error at offset {offset}: {message}");
                break;
            }
            FeaturePage::Records {
                mut batch,
                exceeded_transfer_limit,
            } => {
                if batch.is_empty() {
                    break;
                }
                offset += u64::try_from(batch.len()).unwrap_or(u64::MAX);
                features.append(&mut batch);
                if !exceeded_transfer_limit {
                    break;
                }
                log::debug!("{label}: fetched {offset} features, continuing");
            }
        }
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_body_with_count() {
        let count = parse_count_body(&json!({"count": 42}));
        assert_eq!(count, SourceCount::ok(42));
    }

    #[test]
    fn count_body_with_error_payload_degrades() {
        let count = parse_count_body(&json!({
            "error": {"code": 400, "message": "Invalid geometry"}
        }));
        assert_eq!(count.count, 0);
        assert_eq!(count.error.as_deref(), Some("Invalid geometry"));
    }

    #[test]
    fn count_body_with_unstructured_error_degrades() {
        let count = parse_count_body(&json!({"error": {}}));
        assert_eq!(count.error.as_deref(), Some("arcgis error"));
    }

    #[test]
    fn count_body_missing_count_is_zero() {
        assert_eq!(parse_count_body(&json!({})), SourceCount::ok(0));
    }

    #[test]
    fn page_with_error_payload_is_server_error() {
        let page = parse_feature_page(json!({
            "error": {"message": "Database timeout"},
            "features": [{"type": "Feature"}]
        }));
        assert!(matches!(
            page,
            FeaturePage::ServerError(message) if message == "Database timeout"
        ));
    }

    #[test]
    fn full_page_without_transfer_limit_flag_terminates() {
        // A full page alone is not a continuation signal — only the
        // explicit flag is.
        let page = parse_feature_page(json!({
            "features": [{"a": 1}, {"a": 2}, {"a": 3}]
        }));
        match page {
            FeaturePage::Records {
                batch,
                exceeded_transfer_limit,
            } => {
                assert_eq!(batch.len(), 3);
                assert!(!exceeded_transfer_limit);
            }
            FeaturePage::ServerError(message) => panic!("unexpected error: {message}"),
        }
    }

    #[test]
    fn page_with_transfer_limit_flag_continues() {
        let page = parse_feature_page(json!({
            "features": [{"a": 1}],
            "exceededTransferLimit": true
        }));
        match page {
            FeaturePage::Records {
                exceeded_transfer_limit,
                ..
            } => assert!(exceeded_transfer_limit),
            FeaturePage::ServerError(message) => panic!("unexpected error: {message}"),
        }
    }

    #[test]
    fn empty_page_has_no_records() {
        let page = parse_feature_page(json!({"features": []}));
        match page {
            FeaturePage::Records { batch, .. } => assert!(batch.is_empty()),
            FeaturePage::ServerError(message) => panic!("unexpected error: {message}"),
        }
    }

    #[test]
    fn missing_features_key_is_an_empty_page() {
        let page = parse_feature_page(json!({"type": "FeatureCollection"}));
        match page {
            FeaturePage::Records { batch, .. } => assert!(batch.is_empty()),
            FeaturePage::ServerError(message) => panic!("unexpected error: {message}"),
        }
    }

    #[tokio::test]
    async fn single_page_without_flag_issues_one_query() {
        let mut offsets = Vec::new();
        let features = collect_pages("test", |offset| {
            offsets.push(offset);
            let body = json!({"features": [{"a": 1}, {"a": 2}]});
            async move { Ok::<_, SourceError>(body) }
        })
        .await
        .unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(offsets, vec![0]);
    }

    #[tokio::test]
    async fn offset_advances_by_records_received() {
        // The server may return fewer records than requested; the next
        // offset must follow what actually arrived.
        let mut offsets = Vec::new();
        let features = collect_pages("test", |offset| {
            offsets.push(offset);
            let body = match offset {
                0 => json!({
                    "features": [{"a": 1}, {"a": 2}, {"a": 3}],
                    "exceededTransferLimit": true
                }),
                3 => json!({
                    "features": [{"a": 4}, {"a": 5}],
                    "exceededTransferLimit": true
                }),
                _ => json!({"features": []}),
            };
            async move { Ok::<_, SourceError>(body) }
        })
        .await
        .unwrap();
        assert_eq!(features.len(), 5);
        assert_eq!(offsets, vec![0, 3, 5]);
    }

    #[tokio::test]
    async fn error_payload_mid_pagination_keeps_earlier_pages() {
        let mut offsets = Vec::new();
        let features = collect_pages("test", |offset| {
            offsets.push(offset);
            let body = if offset == 0 {
                json!({
                    "features": [{"a": 1}, {"a": 2}],
                    "exceededTransferLimit": true
                })
            } else {
                json!({"error": {"code": 500, "message": "Database timeout"}})
            };
            async move { Ok::<_, SourceError>(body) }
        })
        .await
        .unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(offsets, vec![0, 2]);
    }
}
