use actix_web::{delete, get, post, web, web::Data, HttpResponse};
use serde::Deserialize;

use crate::bindings::{BindingService, BindingSpec, DeviceIdentity};
use crate::error::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBindingBody {
    pub student_id: String,
    pub device_token: String,
    pub campus: String,
    pub building: String,
    pub room: String,
    pub schedule_hour: i32,
    pub schedule_minute: i32,
    pub channel: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBindingsBody {
    pub student_id: String,
    pub device_token: String,
    pub bindings: Vec<BindingSpec>,
}

#[post("")]
#[tracing::instrument(skip(body, service))]
pub async fn create_binding(
    body: web::Json<CreateBindingBody>,
    service: Data<BindingService>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();

    let device = DeviceIdentity {
        student_id: body.student_id,
        device_token: body.device_token,
    };
    let spec = BindingSpec {
        campus: body.campus,
        building: body.building,
        room: body.room,
        schedule_hour: body.schedule_hour,
        schedule_minute: body.schedule_minute,
        channel: body.channel,
    };

    let binding = service.create(device, spec).await?;

    Ok(HttpResponse::Created().json(binding))
}

#[post("/sync")]
#[tracing::instrument(skip(body, service))]
pub async fn sync_bindings(
    body: web::Json<SyncBindingsBody>,
    service: Data<BindingService>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();

    let device = DeviceIdentity {
        student_id: body.student_id,
        device_token: body.device_token,
    };

    let bindings = service.sync(device, body.bindings).await?;

    Ok(HttpResponse::Ok().json(bindings))
}

#[get("/{device_token}")]
#[tracing::instrument(skip(service))]
pub async fn list_bindings(
    path: web::Path<String>,
    service: Data<BindingService>,
) -> Result<HttpResponse, Error> {
    let device_token = path.into_inner();
    let bindings = service.list(device_token).await?;

    Ok(HttpResponse::Ok().json(bindings))
}

#[get("/{device_token}/{id}")]
#[tracing::instrument(skip(service))]
pub async fn get_binding(
    path: web::Path<(String, i32)>,
    service: Data<BindingService>,
) -> Result<HttpResponse, Error> {
    let (device_token, id) = path.into_inner();
    let binding = service.get(device_token, id).await?;

    Ok(HttpResponse::Ok().json(binding))
}

#[delete("/{device_token}")]
#[tracing::instrument(skip(service))]
pub async fn delete_bindings(
    path: web::Path<String>,
    service: Data<BindingService>,
) -> Result<HttpResponse, Error> {
    let device_token = path.into_inner();
    let remaining = service.delete_all(device_token).await?;

    Ok(HttpResponse::Ok().json(remaining))
}

#[delete("/{device_token}/{id}")]
#[tracing::instrument(skip(service))]
pub async fn delete_binding(
    path: web::Path<(String, i32)>,
    service: Data<BindingService>,
) -> Result<HttpResponse, Error> {
    let (device_token, id) = path.into_inner();
    let remaining = service.delete(device_token, id).await?;

    Ok(HttpResponse::Ok().json(remaining))
}

pub fn binding_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_binding)
        .service(sync_bindings)
        .service(list_bindings)
        .service(get_binding)
        .service(delete_bindings)
        .service(delete_binding);
}
