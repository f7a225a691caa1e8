use actix_web::{get, web::Data, HttpResponse, Responder, Result};
use serde_json::json;

use crate::bindings::BindingService;

#[get("/info")]
pub async fn info(service: Data<BindingService>) -> Result<impl Responder> {
    Ok(HttpResponse::Ok().json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "activeJobs": service.active_jobs(),
    })))
}
