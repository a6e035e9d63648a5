use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::user::schema::UserEntity;

#[derive(Deserialize, Validate)]
pub struct SignUpModel {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct SignInModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileModel {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(equal = 7, message = "Avatar color must be a #rrggbb hex string"))]
    pub avatar_color: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct InsertUser {
    pub email: String,
    pub hash_password: String,
    pub display_name: String,
    pub avatar_color: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct UpdateUser {
    pub display_name: String,
    pub avatar_color: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub display_name: String,
    pub avatar_color: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            avatar_color: entity.avatar_color,
            avatar_url: entity.avatar_url,
        }
    }
}
