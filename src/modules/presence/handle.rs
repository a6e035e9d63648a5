use actix_web::{get, post, web, HttpRequest};

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::presence::{model::PresenceResponse, service::PresenceService},
    utils::normalize_identity,
};

#[post("/heartbeat")]
pub async fn heartbeat(
    presence_service: web::Data<PresenceService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let identity = get_claims(&req)?.sub;
    presence_service.heartbeat(&identity).await?;
    Ok(success::Success::ok(None).no_store())
}

#[get("/{identity}")]
pub async fn get_presence(
    presence_service: web::Data<PresenceService>,
    identity: web::Path<String>,
) -> Result<success::Success<PresenceResponse>, error::Error> {
    let status = presence_service.status(&normalize_identity(&identity)).await?;
    Ok(success::Success::ok(Some(status)).no_store())
}
