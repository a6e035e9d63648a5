use actix_web::{get, post, web, HttpRequest};

use crate::{
    api::{error, success},
    constants::CALL_HISTORY_LIMIT,
    middlewares::get_claims,
    modules::call::{
        model::{CallHistoryEntry, CallHistoryQuery, CallRecordResponse, LogCallModel, PeerEndpoint},
        service::CallService,
    },
    utils::{ValidatedJson, ValidatedQuery},
};

#[get("/peer/{identity}")]
pub async fn get_peer_endpoint(
    call_service: web::Data<CallService>,
    identity: web::Path<String>,
) -> Result<success::Success<PeerEndpoint>, error::Error> {
    let endpoint = call_service.peer_endpoint(&identity).await?;
    Ok(success::Success::ok(Some(endpoint)))
}

#[post("")]
pub async fn log_call(
    call_service: web::Data<CallService>,
    body: ValidatedJson<LogCallModel>,
    req: HttpRequest,
) -> Result<success::Success<CallRecordResponse>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let record = call_service.log_call(&identity, body.0).await?;
    Ok(success::Success::created(Some(CallRecordResponse {
        id: record.id,
        duration: record.duration,
        created_at: record.created_at,
    }))
    .message("Call logged"))
}

#[get("")]
pub async fn get_history(
    call_service: web::Data<CallService>,
    query: ValidatedQuery<CallHistoryQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<CallHistoryEntry>>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let limit = query.0.limit.unwrap_or(CALL_HISTORY_LIMIT);
    let history = call_service.history(&identity, limit).await?;
    Ok(success::Success::ok(Some(history)).no_store())
}
