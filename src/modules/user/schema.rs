use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub hash_password: String,
    pub display_name: String,
    pub avatar_color: Option<String>,
    pub avatar_url: Option<String>,
    pub last_active_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Live display metadata of an identity, resolved at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub name: String,
    pub avatar_url: Option<String>,
    pub avatar_color: Option<String>,
}

impl DisplayInfo {
    /// Fallback for identities with no user row.
    pub fn unknown(identity: &str) -> Self {
        Self { name: identity.to_string(), avatar_url: None, avatar_color: None }
    }
}

impl From<&UserEntity> for DisplayInfo {
    fn from(user: &UserEntity) -> Self {
        Self {
            name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            avatar_color: user.avatar_color.clone(),
        }
    }
}
