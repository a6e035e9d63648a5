use actix_web::{get, post, put, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::conversation::{
        model::{
            AddMemberModel, ConversationSummary, CreateDirectModel, CreateGroupModel,
            DirectConversationResponse, TypingModel,
        },
        service::ConversationService,
    },
    utils::ValidatedJson,
};

#[get("")]
pub async fn get_conversations(
    conversation_service: web::Data<ConversationService>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConversationSummary>>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let conversations = conversation_service.list_for_user(&identity).await?;
    Ok(success::Success::ok(Some(conversations)).no_store())
}

#[post("/group")]
pub async fn create_group(
    conversation_service: web::Data<ConversationService>,
    body: ValidatedJson<CreateGroupModel>,
    req: HttpRequest,
) -> Result<success::Success<ConversationSummary>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let conversation = conversation_service.create_group(&identity, &body.0.name).await?;
    Ok(success::Success::created(Some(conversation)).message("Successfully created group"))
}

#[post("/direct")]
pub async fn create_direct(
    conversation_service: web::Data<ConversationService>,
    body: ValidatedJson<CreateDirectModel>,
    req: HttpRequest,
) -> Result<success::Success<DirectConversationResponse>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let res = conversation_service.create_direct(&identity, &body.0.identity).await?;
    let response = if res.created {
        success::Success::created(Some(res))
    } else {
        success::Success::ok(Some(res))
    };
    Ok(response.message("Successfully opened conversation"))
}

#[post("/{conversation_id}/members")]
pub async fn add_member(
    conversation_service: web::Data<ConversationService>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<AddMemberModel>,
    req: HttpRequest,
) -> Result<success::Success<ConversationSummary>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let conversation =
        conversation_service.add_member(&conversation_id, &identity, &body.0.identity).await?;
    Ok(success::Success::ok(Some(conversation)).message("Successfully added member"))
}

#[put("/{conversation_id}/typing")]
pub async fn set_typing(
    conversation_service: web::Data<ConversationService>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<TypingModel>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let identity = get_claims(&req)?.sub;
    conversation_service.set_typing(&conversation_id, &identity, body.0.is_typing).await?;
    Ok(success::Success::ok(None).no_store())
}
