use log::info;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error;
use crate::modules::user::model::{
    SignInModel, SignInResponse, SignUpModel, UpdateProfileModel, UpdateUser, UserResponse,
};
use crate::modules::user::schema::{DisplayInfo, UserEntity};
use crate::modules::user::{model::InsertUser, repository::UserRepository};
use crate::utils::{
    hash_password, normalize_identity, random_avatar_color, verify_password, Claims, Clock,
    TokenConfig,
};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
    tokens: TokenConfig,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
        tokens: TokenConfig,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, clock, tokens }
    }

    pub async fn get_by_identity(&self, identity: &str) -> Result<UserResponse, error::SystemError> {
        self.repo
            .find_by_email(identity)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    pub async fn sign_up(&self, user: SignUpModel) -> Result<UserResponse, error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            email: normalize_identity(&user.email),
            hash_password,
            display_name: user.name.trim().to_string(),
            avatar_color: random_avatar_color(),
            created_at: self.clock.now(),
        };

        let entity = self.repo.create(&new_user).await?;
        info!("User {} signed up", entity.email);
        Ok(UserResponse::from(entity))
    }

    pub async fn sign_in(&self, user: SignInModel) -> Result<SignInResponse, error::SystemError> {
        let user_entity = self
            .repo
            .find_by_email(&normalize_identity(&user.email))
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid email or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid email or password"));
        }

        let access_token = Claims::new(&user_entity.email, self.tokens.access_token_expiration)
            .encode(self.tokens.secret.as_bytes())?;

        Ok(SignInResponse { access_token, user: UserResponse::from(user_entity) })
    }

    pub async fn update_profile(
        &self,
        identity: &str,
        profile: UpdateProfileModel,
    ) -> Result<UserResponse, error::SystemError> {
        let update = UpdateUser {
            display_name: profile.name.trim().to_string(),
            avatar_color: profile.avatar_color,
            avatar_url: profile.avatar_url,
            updated_at: self.clock.now(),
        };

        self.repo
            .update_profile(identity, &update)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }
}

/// Resolve identities to their live user rows in one lookup.
pub async fn load_user_map(
    repo: &(dyn UserRepository + Send + Sync),
    identities: &[String],
) -> Result<HashMap<String, UserEntity>, error::SystemError> {
    let users = repo.find_by_emails(identities).await?;
    Ok(users.into_iter().map(|u| (u.email.clone(), u)).collect())
}

pub fn display_info(users: &HashMap<String, UserEntity>, identity: &str) -> DisplayInfo {
    users.get(identity).map(DisplayInfo::from).unwrap_or_else(|| DisplayInfo::unknown(identity))
}
