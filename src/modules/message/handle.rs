use actix_web::{delete, get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::message::{
        model::{
            MessageStatus, ReactionModel, ReactionSummary, SendMessageModel, SentMessageResponse,
            ThreadSnapshot,
        },
        service::MessageService,
    },
    utils::ValidatedJson,
};

#[get("")]
pub async fn get_messages(
    message_service: web::Data<MessageService>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ThreadSnapshot>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let snapshot = message_service.read(&conversation_id, &identity).await?;
    Ok(success::Success::ok(Some(snapshot)).no_store())
}

#[post("")]
pub async fn send_message(
    message_service: web::Data<MessageService>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<SendMessageModel>,
    req: HttpRequest,
) -> Result<success::Success<SentMessageResponse>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let body = body.0;
    let message =
        message_service.append(&conversation_id, &identity, &body.text, body.attachment).await?;

    Ok(success::Success::created(Some(SentMessageResponse {
        id: message.id,
        seq: message.seq,
        created_at: message.created_at,
        status: MessageStatus::Sent,
    }))
    .message("Message sent"))
}

#[delete("/{message_id}")]
pub async fn delete_message(
    message_service: web::Data<MessageService>,
    path: web::Path<(Uuid, Uuid)>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let (conversation_id, message_id) = path.into_inner();
    message_service.delete(&conversation_id, &message_id, &identity).await?;
    Ok(success::Success::ok(None).message("Message deleted"))
}

#[post("/{message_id}/reactions")]
pub async fn add_reaction(
    message_service: web::Data<MessageService>,
    path: web::Path<(Uuid, Uuid)>,
    body: ValidatedJson<ReactionModel>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ReactionSummary>>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let (conversation_id, message_id) = path.into_inner();
    let reactions = message_service
        .add_reaction(&conversation_id, &message_id, &identity, &body.0.emoji)
        .await?;
    Ok(success::Success::ok(Some(reactions)))
}

#[delete("/{message_id}/reactions")]
pub async fn remove_reaction(
    message_service: web::Data<MessageService>,
    path: web::Path<(Uuid, Uuid)>,
    body: ValidatedJson<ReactionModel>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ReactionSummary>>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let (conversation_id, message_id) = path.into_inner();
    let reactions = message_service
        .remove_reaction(&conversation_id, &message_id, &identity, &body.0.emoji)
        .await?;
    Ok(success::Success::ok(Some(reactions)))
}
