#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel map server binary.

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use parcel_map_query::{ParcelQuery, QueryConfig};
use parcel_map_server::{AppState, handlers};
use parcel_map_source::registry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let sources = registry::all_sources();
    log::info!("Loaded {} county sources", sources.len());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let base_url = std::env::var("PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://127.0.0.1:{port}"));

    let state = web::Data::new(AppState {
        query: ParcelQuery::new(QueryConfig::default(), sources),
        base_url,
    });

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .route("/kml", web::get().to(handlers::kml))
            .route("/menu", web::get().to(handlers::menu))
            .route("/diag", web::get().to(handlers::diag))
            .service(web::scope("/api").route("/health", web::get().to(handlers::health)))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
