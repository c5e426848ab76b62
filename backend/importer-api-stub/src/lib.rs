//! Development stand-in for the importer API
//!
//! Echoes every command it receives so the importer can be run end to end
//! without the real search indexer.

use actix_web::{error, web, HttpRequest, HttpResponse, Responder};
use serde_json::Value;
use tracing::{info, warn};

pub const IMPORTER_PATH: &str = "/Werbemittel/api/Importer";
pub const NOT_FOUND_BODY: &str = "Flask 404 here, but not the page you requested.";

async fn import(body: web::Json<Value>) -> impl Responder {
    let command = body.into_inner();
    info!("received: {}", command);
    HttpResponse::Ok().json(command)
}

async fn not_found(req: HttpRequest) -> HttpResponse {
    warn!(path = %req.path(), "No route");
    HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body(NOT_FOUND_BODY)
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected request body: {}", err);
    let response = HttpResponse::InternalServerError()
        .content_type("text/plain; charset=utf-8")
        .body(format!("500 error: {}", err));
    error::InternalError::from_response(err, response).into()
}

/// Routes of the stub, shared by the binary and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route(IMPORTER_PATH, web::post().to(import))
        .default_service(web::to(not_found));
}
