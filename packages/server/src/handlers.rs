//! HTTP handler functions for the parcel map server.

use actix_web::{HttpResponse, web};
use parcel_map_kml as kml;
use parcel_map_query::QueryOutcome;
use parcel_map_server_models::{ApiHealth, DiagQueryParams, KmlQueryParams, MenuQueryParams};

use crate::AppState;

/// Wraps a KML body with the content type and no-cache headers.
///
/// The no-cache headers matter: Google Earth re-fetches these URLs on every
/// camera stop, and a cached stale payload would pile old parcels on top of
/// the live view.
fn kml_response(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(kml::MEDIA_TYPE)
        .insert_header(("Cache-Control", "no-store, max-age=0"))
        .insert_header(("Pragma", "no-cache"))
        .insert_header(("Expires", "0"))
        .body(body)
}

/// `GET /kml`
///
/// The live overlay. Malformed or missing viewport parameters degrade to a
/// well-formed empty document; only an unreachable county service produces
/// an error response.
pub async fn kml(state: web::Data<AppState>, params: web::Query<KmlQueryParams>) -> HttpResponse {
    let bbox = params.resolved_bbox();
    let outcome = state
        .query
        .run(bbox, params.eye_alt_ft(), params.county.as_deref())
        .await;

    match outcome {
        Ok(QueryOutcome::Empty) => kml_response(kml::empty_document()),
        Ok(QueryOutcome::TooMany { total, max }) => {
            kml_response(kml::too_many_parcels(total, max))
        }
        Ok(QueryOutcome::Parcels(sources)) => {
            kml_response(kml::document(&state.query.config().container_id, &sources))
        }
        Err(e) => {
            log::error!("Parcel query failed: {e}");
            HttpResponse::BadGateway().json(serde_json::json!({
                "error": "upstream parcel query failed"
            }))
        }
    }
}

/// `GET /menu`
///
/// A static KML document with one refreshable network link per county.
pub async fn menu(state: web::Data<AppState>, params: web::Query<MenuQueryParams>) -> HttpResponse {
    let base = params.base.as_deref().unwrap_or(&state.base_url);
    kml_response(kml::menu(base, state.query.sources()))
}

/// `GET /diag`
///
/// Runs the count gate for a viewport and returns the raw per-county
/// results, independent of rendering and the viewport gates.
pub async fn diag(state: web::Data<AppState>, params: web::Query<DiagQueryParams>) -> HttpResponse {
    let Some(bbox) = params.resolved_bbox() else {
        return HttpResponse::Ok().json(serde_json::json!({
            "ok": false,
            "reason": "no bbox parsed"
        }));
    };

    let mut counts = serde_json::Map::new();
    for (name, count) in state.query.counts(bbox, params.county.as_deref()).await {
        counts.insert(name, serde_json::to_value(count).unwrap_or_default());
    }

    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "bbox": [bbox.west, bbox.south, bbox.east, bbox.north],
        "spanDeg": {"x": bbox.width(), "y": bbox.height()},
        "counts": counts,
    }))
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
