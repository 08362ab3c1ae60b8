use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::preserialized::{batch_size_error, health_response};
use super::LookupMetrics;
use crate::db::Catalog;
use crate::ip::{lookup_ip, lookup_ips_batch, RangeError};
use crate::metrics;

const MAX_BATCH_SIZE: usize = 1000;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<RangeError> for ErrorResponse {
    fn from(err: RangeError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct BatchIpRequest {
    ips: Vec<String>,
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    health_response(state.catalog.is_ready())
}

#[get("/metrics")]
pub async fn metrics_endpoint() -> impl Responder {
    let body = metrics::gather_metrics();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(body)
}

#[get("/v1/ip/{ip}")]
pub async fn get_ip(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let lookup_metrics = LookupMetrics::start_rest();
    let ip_str = path.into_inner();

    match lookup_ip(&state.catalog, &ip_str) {
        Ok(result) => {
            lookup_metrics.record(&result);
            HttpResponse::Ok().json(result)
        }
        Err(e) => HttpResponse::BadRequest().json(ErrorResponse::from(e)),
    }
}

#[post("/v1/ip/batch")]
pub async fn batch_get_ip(
    state: web::Data<AppState>,
    body: web::Json<BatchIpRequest>,
) -> HttpResponse {
    if body.ips.len() > MAX_BATCH_SIZE {
        return batch_size_error().into();
    }

    let lookup_metrics = LookupMetrics::start_rest();
    let ip_strs: Vec<&str> = body.ips.iter().map(String::as_str).collect();

    match lookup_ips_batch(&state.catalog, &ip_strs) {
        Ok(results) => {
            let any_found = results.iter().any(|r| r.found);
            lookup_metrics.record_batch(any_found);
            HttpResponse::Ok().json(results)
        }
        Err(e) => HttpResponse::BadRequest().json(ErrorResponse::from(e)),
    }
}

#[get("/v1/stats")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let table = state.catalog.table();
    HttpResponse::Ok().json(table.rank_by_size())
}

#[get("/v1/metadata")]
pub async fn get_metadata(state: web::Data<AppState>) -> impl Responder {
    let meta = state.catalog.metadata();
    HttpResponse::Ok().json(&*meta)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(metrics_endpoint)
        .service(get_ip)
        .service(batch_get_ip)
        .service(get_stats)
        .service(get_metadata);
}
