use actix_web::{get, patch, post, web, HttpRequest};

use crate::modules::presence::service::PresenceService;
use crate::modules::user::{model, service::UserService};
use crate::{
    api::{error, success},
    middlewares::get_claims,
    utils::ValidatedJson,
};

#[get("/profile")]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let user = user_service.get_by_identity(&identity).await?;
    Ok(success::Success::ok(Some(user)).message("Profile retrieved successfully"))
}

#[patch("/profile")]
pub async fn update_profile(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::UpdateProfileModel>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let identity = get_claims(&req)?.sub;
    let user = user_service.update_profile(&identity, user_data.0).await?;
    Ok(success::Success::ok(Some(user)).message("Profile updated successfully"))
}

#[post("/signup")]
pub async fn sign_up(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignUpModel>,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let user = user_service.sign_up(user_data.0).await?;
    Ok(success::Success::created(Some(user)).message("Signup successful"))
}

#[post("/signin")]
pub async fn sign_in(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignInModel>,
) -> Result<success::Success<model::SignInResponse>, error::Error> {
    let response = user_service.sign_in(user_data.0).await?;
    Ok(success::Success::ok(Some(response)).message("Signin successful"))
}

#[post("/signout")]
pub async fn sign_out(
    presence_service: web::Data<PresenceService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let identity = get_claims(&req)?.sub;
    presence_service.sign_out(&identity).await?;
    Ok(success::Success::ok(None).message("Signout successful"))
}
